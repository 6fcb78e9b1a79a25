//! Update Engine (§4.5): same shape as the Driver Engine, dispatched by
//! `UpdateType`, with retry for servicer-backed installs. Incompatible
//! manifests count as Skipped rather than being filtered out beforehand, so
//! `stats.total` reflects every scanned manifest (§8 invariant 5).

use crate::assets::{update_is_compatible, UpdateManifest, UpdateType};
use crate::error::ServicerError;
use crate::servicer::Servicer;
use crate::staging;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateStats {
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
    pub skipped: u32,
}

pub struct UpdateEngineResult {
    pub stats: UpdateStats,
    pub processed: Vec<UpdateManifest>,
    pub failed: Vec<UpdateManifest>,
}

/// Retries `Servicer::add_package` up to `max_retries` additional times
/// (so `max_retries + 1` total attempts), linear backoff of `backoff`
/// between attempts. Retriable on any `ServicerError`.
fn retry_add_package(
    servicer: &dyn Servicer,
    package: &Path,
    mount_point: &Path,
    max_retries: u32,
    backoff: Duration,
) -> Result<(), ServicerError> {
    let mut attempt = 0;
    loop {
        match servicer.add_package(package, mount_point) {
            Ok(()) => return Ok(()),
            Err(e) => {
                if attempt >= max_retries {
                    return Err(e);
                }
                log::warn!("AddPackage attempt {} failed for {}: {e}, retrying", attempt + 1, package.display());
                std::thread::sleep(backoff);
                attempt += 1;
            }
        }
    }
}

fn install_one(manifest: &UpdateManifest, servicer: &dyn Servicer, mount_point: &Path, max_retries: u32, backoff: Duration, dry_run: bool) -> bool {
    match manifest.update_type {
        UpdateType::Msu | UpdateType::Cab => {
            let Some(payload) = &manifest.validated_file_path else {
                log::error!("update {} has no validated payload path", manifest.update_name);
                return false;
            };

            if dry_run {
                log::info!("[dry-run] would AddPackage {}", payload.display());
                return true;
            }

            match retry_add_package(servicer, payload, mount_point, max_retries, backoff) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("AddPackage failed for {}: {e}", manifest.update_name);
                    false
                }
            }
        }
        UpdateType::Exe | UpdateType::Msi => {
            if dry_run {
                log::info!("[dry-run] would stage {}", manifest.source_directory.display());
                return true;
            }

            let stem = Path::new(&manifest.download_file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&manifest.update_name)
                .to_string();

            match staging::stage_directory(&manifest.source_directory, mount_point, &stem) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("failed staging update {}: {e}", manifest.update_name);
                    false
                }
            }
        }
    }
}

pub fn run(
    manifests: Vec<UpdateManifest>,
    os_id: u32,
    skip_validation: bool,
    servicer: &dyn Servicer,
    mount_point: &Path,
    max_retries: u32,
    dry_run: bool,
) -> UpdateEngineResult {
    run_with_backoff(manifests, os_id, skip_validation, servicer, mount_point, max_retries, Duration::from_secs(2), dry_run)
}

#[allow(clippy::too_many_arguments)]
fn run_with_backoff(
    manifests: Vec<UpdateManifest>,
    os_id: u32,
    skip_validation: bool,
    servicer: &dyn Servicer,
    mount_point: &Path,
    max_retries: u32,
    backoff: Duration,
    dry_run: bool,
) -> UpdateEngineResult {
    let mut stats = UpdateStats { total: manifests.len() as u32, ..Default::default() };
    let mut processed = Vec::new();
    let mut failed = Vec::new();

    for mut manifest in manifests {
        let compatible = if skip_validation {
            manifest.validated_file_path = Some(manifest.expected_payload_path());
            true
        } else {
            update_is_compatible(&mut manifest, os_id)
        };

        if !compatible {
            stats.skipped += 1;
            continue;
        }

        if install_one(&manifest, servicer, mount_point, max_retries, backoff, dry_run) {
            stats.processed += 1;
            processed.push(manifest);
        } else {
            stats.failed += 1;
            failed.push(manifest);
        }
    }

    UpdateEngineResult { stats, processed, failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::RawUpdateManifest;
    use crate::servicer::fake::FakeServicer;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn msu_manifest(dir: &Path, file_name: &str) -> UpdateManifest {
        UpdateManifest::enrich(
            RawUpdateManifest {
                update_name: "patch".to_string(),
                update_version: "1.0.0".to_string(),
                update_type: UpdateType::Msu,
                supported_operating_systems: [10].into_iter().collect(),
                download_file_name: file_name.to_string(),
                order: 9999,
            },
            dir.join("manifest.json"),
        )
    }

    #[test]
    fn retries_up_to_max_retries_then_succeeds() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("patch.msu"), b"x").unwrap();

        let servicer = FakeServicer {
            add_package_results: Mutex::new(vec![
                Err(ServicerError { operation: "AddPackage", exit_code: Some(1), stderr: "e".to_string() }),
                Err(ServicerError { operation: "AddPackage", exit_code: Some(1), stderr: "e".to_string() }),
                Ok(()),
            ]),
            ..Default::default()
        };

        let manifests = vec![msu_manifest(dir.path(), "patch.msu")];
        let result = run_with_backoff(manifests, 10, false, &servicer, dir.path(), 2, Duration::from_millis(1), false);
        assert_eq!(result.stats.processed, 1);
        assert_eq!(servicer.invocations.lock().unwrap().len(), 3);
    }

    #[test]
    fn exhausting_retries_counts_as_failed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("patch.msu"), b"x").unwrap();

        let servicer = FakeServicer {
            add_package_results: Mutex::new(vec![
                Err(ServicerError { operation: "AddPackage", exit_code: Some(1), stderr: "e".to_string() }),
                Err(ServicerError { operation: "AddPackage", exit_code: Some(1), stderr: "e".to_string() }),
                Err(ServicerError { operation: "AddPackage", exit_code: Some(1), stderr: "e".to_string() }),
            ]),
            ..Default::default()
        };

        let manifests = vec![msu_manifest(dir.path(), "patch.msu")];
        let result = run_with_backoff(manifests, 10, false, &servicer, dir.path(), 2, Duration::from_millis(1), false);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(servicer.invocations.lock().unwrap().len(), 3);
    }

    #[test]
    fn missing_payload_counts_as_skipped_not_failed() {
        let dir = tempdir().unwrap();
        // No patch.msu written, so compatibility check fails on existence.
        let servicer = FakeServicer::default();
        let manifests = vec![msu_manifest(dir.path(), "patch.msu")];
        let result = run_with_backoff(manifests, 10, false, &servicer, dir.path(), 2, Duration::from_millis(1), false);
        assert_eq!(result.stats.skipped, 1);
        assert_eq!(result.stats.processed, 0);
        assert!(servicer.invocations.lock().unwrap().is_empty());
    }

    #[test]
    fn dry_run_skips_servicer_entirely() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("patch.msu"), b"x").unwrap();
        let servicer = FakeServicer::default();
        let manifests = vec![msu_manifest(dir.path(), "patch.msu")];
        let result = run_with_backoff(manifests, 10, false, &servicer, dir.path(), 2, Duration::from_millis(1), true);
        assert_eq!(result.stats.processed, 1);
        assert!(servicer.invocations.lock().unwrap().is_empty());
    }
}
