//! Driver Engine (§4.4): installs compatible drivers in order, dispatching
//! by `DriverType`. Incompatible manifests count as Skipped rather than
//! being filtered out of the input set, so `stats.total` reflects every
//! scanned manifest (§8 invariant 5).

use crate::assets::{driver_is_compatible, find_files_with_extension, DriverManifest, DriverType};
use crate::servicer::Servicer;
use crate::staging;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct DriverStats {
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
    pub skipped: u32,
}

pub struct DriverEngineResult {
    pub stats: DriverStats,
    pub processed: Vec<DriverManifest>,
    pub failed: Vec<DriverManifest>,
}

/// Friendly-name lookup at `<root>/Engine/IDs/driverFamilyId.json`, used
/// only to make the coverage WARNING readable; absence is non-fatal.
fn load_family_names(root: &Path) -> HashMap<String, String> {
    let path = root.join("Engine").join("IDs").join("driverFamilyId.json");
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return HashMap::new();
    };

    #[derive(serde::Deserialize)]
    struct Entry {
        id: String,
        #[serde(alias = "friendlyName", alias = "systemName", alias = "name")]
        label: Option<String>,
    }

    match serde_json::from_str::<Vec<Entry>>(&contents) {
        Ok(entries) => entries.into_iter().map(|e| (e.id.clone(), e.label.unwrap_or(e.id))).collect(),
        Err(e) => {
            log::warn!("failed to parse driver family catalog {}: {e}", path.display());
            HashMap::new()
        }
    }
}

fn install_one(manifest: &DriverManifest, servicer: &dyn Servicer, mount_point: &Path, dry_run: bool) -> bool {
    match manifest.driver_type {
        DriverType::Inf => {
            if dry_run {
                log::info!("[dry-run] would AddDriver {}", manifest.source_directory.display());
                return true;
            }
            match servicer.add_driver(&manifest.source_directory, mount_point) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("AddDriver failed for {}: {e}", manifest.driver_name);
                    false
                }
            }
        }
        DriverType::Appx | DriverType::Exe => {
            let ext = if manifest.driver_type == DriverType::Appx { "appx" } else { "exe" };
            let payloads = find_files_with_extension(&manifest.source_directory, ext);
            if payloads.is_empty() {
                log::warn!("no .{ext} files found under {}", manifest.source_directory.display());
                return false;
            }

            if dry_run {
                log::info!("[dry-run] would stage {} payload(s) from {}", payloads.len(), manifest.source_directory.display());
                return true;
            }

            let mut all_ok = true;
            for payload in &payloads {
                let Some(parent) = payload.parent() else { continue };
                let Some(dir_name) = parent.file_name().and_then(|n| n.to_str()) else { continue };
                if let Err(e) = staging::stage_directory(parent, mount_point, dir_name) {
                    log::error!("failed staging {}: {e}", parent.display());
                    all_ok = false;
                }
            }
            all_ok
        }
    }
}

/// Runs the full driver install loop over every scanned manifest.
/// `device_family_ids` is the hardware identifier set for the selected
/// device (§4.3 condition 1); `device_driver_family_ids` is
/// `profile.driverFamilyIds` (§4.3 condition 3, and the coverage check).
pub fn run(
    manifests: Vec<DriverManifest>,
    device_family_ids: &HashSet<String>,
    device_driver_family_ids: &HashSet<String>,
    os_id: u32,
    skip_validation: bool,
    servicer: &dyn Servicer,
    mount_point: &Path,
    root: &Path,
    dry_run: bool,
) -> DriverEngineResult {
    let mut stats = DriverStats { total: manifests.len() as u32, ..Default::default() };
    let mut processed = Vec::new();
    let mut failed = Vec::new();

    for manifest in manifests {
        let compatible = skip_validation || driver_is_compatible(&manifest, device_family_ids, os_id, device_driver_family_ids);
        if !compatible {
            stats.skipped += 1;
            continue;
        }

        if install_one(&manifest, servicer, mount_point, dry_run) {
            stats.processed += 1;
            processed.push(manifest);
        } else {
            stats.failed += 1;
            failed.push(manifest);
        }
    }

    let covered: HashSet<&str> = processed.iter().map(|d| d.driver_family_id.as_str()).collect();
    let missing: Vec<&String> = device_driver_family_ids.iter().filter(|id| !covered.contains(id.as_str())).collect();
    if !missing.is_empty() {
        let names = load_family_names(root);
        for family_id in missing {
            let label = names.get(family_id).cloned().unwrap_or_else(|| family_id.clone());
            log::warn!("no compatible driver installed for family {label}");
        }
    }

    DriverEngineResult { stats, processed, failed }
}
