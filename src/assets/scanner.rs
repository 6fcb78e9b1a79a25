//! Asset Scanner (§4.3): recursively discovers driver/update manifest
//! files, parses them, and orders the result.

use super::manifest::{DriverManifest, RawDriverManifest, RawUpdateManifest, UpdateManifest};
use std::path::{Path, PathBuf};

/// Recursively collects every `*.json` file under `root`, in the manual
/// walk style the teacher's `build_file_map` uses (no extra crate needed).
fn find_json_files(root: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if !root.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            find_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            out.push(path);
        }
    }
    Ok(())
}

/// Scans `driver_root` for driver manifests. Parse failures are logged and
/// the file is skipped -- non-fatal, per the AssetError policy.
pub fn scan_drivers(driver_root: &Path) -> Vec<DriverManifest> {
    let mut files = Vec::new();
    if let Err(e) = find_json_files(driver_root, &mut files) {
        log::warn!("failed to walk driver root {}: {e}", driver_root.display());
        return Vec::new();
    }

    let mut manifests: Vec<DriverManifest> = files
        .into_iter()
        .filter_map(|path| match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawDriverManifest>(&contents) {
                Ok(raw) => Some(DriverManifest::enrich(raw, path)),
                Err(e) => {
                    log::warn!("skipping unparsable driver manifest {}: {e}", path.display());
                    None
                }
            },
            Err(e) => {
                log::warn!("failed to read driver manifest {}: {e}", path.display());
                None
            }
        })
        .collect();

    // Installation order: (order asc, SourcePath asc), stable.
    manifests.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.source_path.cmp(&b.source_path)));
    manifests
}

/// Scans `update_root` for update manifests. Same non-fatal parse-skip
/// policy as [`scan_drivers`].
pub fn scan_updates(update_root: &Path) -> Vec<UpdateManifest> {
    let mut files = Vec::new();
    if let Err(e) = find_json_files(update_root, &mut files) {
        log::warn!("failed to walk update root {}: {e}", update_root.display());
        return Vec::new();
    }

    let mut manifests: Vec<UpdateManifest> = files
        .into_iter()
        .filter_map(|path| match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawUpdateManifest>(&contents) {
                Ok(raw) => Some(UpdateManifest::enrich(raw, path)),
                Err(e) => {
                    log::warn!("skipping unparsable update manifest {}: {e}", path.display());
                    None
                }
            },
            Err(e) => {
                log::warn!("failed to read update manifest {}: {e}", path.display());
                None
            }
        })
        .collect();

    manifests.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.source_path.cmp(&b.source_path)));
    manifests
}

/// Recursively finds every file under `dir` matching `extension`
/// (case-insensitive), used by the Driver Engine's APPX/EXE staging dispatch.
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut all = Vec::new();
    collect_by_extension(dir, extension, &mut all);
    all
}

fn collect_by_extension(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_by_extension(&path, extension, out);
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension)) {
            out.push(path);
        }
    }
}
