//! Build Orchestrator (§4.7): nine stages from device selection through
//! cleanup, with rollback on any unhandled error in stages 3-8.

use crate::config::{self, BuildConfig, DeviceProfile, ResolvedConfig};
use crate::drivers;
use crate::error::{EngineError, EngineResult, IntegrityError};
use crate::progress::{self, ProgressEvent};
use crate::servicer::Servicer;
use crate::staging::StagingManager;
use crate::updates;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

pub struct OrchestratorOptions {
    pub root: PathBuf,
    pub device_file: Option<String>,
    pub os_id: u32,
    pub no_cleanup: bool,
    pub skip_drivers: bool,
    pub skip_updates: bool,
    pub skip_validation: bool,
    pub dry_run: bool,
    pub max_retries: u32,
}

pub struct RunReport {
    pub device_id: String,
    pub output_path: PathBuf,
    pub driver_stats: drivers::DriverStats,
    pub update_stats: updates::UpdateStats,
}

/// Tracks rollback-relevant state as the pipeline progresses: the mount
/// flag and every temp path that needs cleanup if a later stage fails.
#[derive(Default)]
struct ExecutionState {
    is_mounted: bool,
    mount_point: Option<PathBuf>,
    temp_files: Vec<PathBuf>,
}

fn validate_integrity(servicer: &dyn Servicer, wim: &Path) -> Result<(), IntegrityError> {
    servicer.get_image_info(wim).map_err(|e| IntegrityError { wim_path: wim.to_path_buf(), reason: e.stderr })
}

fn rollback(servicer: &dyn Servicer, state: &ExecutionState, no_cleanup: bool) {
    if state.is_mounted
        && let Some(mount_point) = &state.mount_point
        && let Err(e) = servicer.unmount(mount_point, false)
    {
        log::warn!("rollback: failed to discard mount at {}: {e}", mount_point.display());
    }

    if !no_cleanup {
        for path in &state.temp_files {
            if let Err(e) = std::fs::remove_file(path).or_else(|_| std::fs::remove_dir_all(path)) {
                log::warn!("rollback: failed to remove {}: {e}", path.display());
            }
        }
    }
}

/// Resolves a device file name when `--device` was not given, by
/// enumerating `<root>/DeviceConfig/*.json` and delegating the prompt to
/// the caller-supplied selector (the interactive module in production).
pub fn select_device_file(root: &Path, explicit: Option<String>, select: impl FnOnce(&[String]) -> EngineResult<String>) -> EngineResult<String> {
    if let Some(name) = explicit {
        return Ok(name);
    }

    let dir = root.join("DeviceConfig");
    let mut names = Vec::new();
    if let Ok(entries) = std::fs::read_dir(&dir) {
        for entry in entries.flatten() {
            if entry.path().extension().is_some_and(|e| e.eq_ignore_ascii_case("json"))
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    select(&names)
}

pub fn run(
    options: OrchestratorOptions,
    device_file: String,
    servicer: &dyn Servicer,
    progress_sender: Option<&Sender<ProgressEvent>>,
) -> EngineResult<RunReport> {
    let mut state = ExecutionState::default();

    // Stage 2: Load Configuration.
    let resolved = config::resolve(&options.root, &device_file, options.os_id)?;
    progress::publish(progress_sender, "Load Configuration", 2);

    let result = run_pipeline(&options, &resolved, servicer, progress_sender, &mut state);

    if result.is_err() {
        rollback(servicer, &state, options.no_cleanup);
    }

    result
}

fn run_pipeline(
    options: &OrchestratorOptions,
    resolved: &ResolvedConfig,
    servicer: &dyn Servicer,
    progress_sender: Option<&Sender<ProgressEvent>>,
    state: &mut ExecutionState,
) -> EngineResult<RunReport> {
    let device_profile: &DeviceProfile = &resolved.device_profile;
    let build_config: &BuildConfig = &resolved.build_config;

    let source_wim = build_config.source_wim.as_ref().ok_or_else(|| {
        EngineError::Integrity(IntegrityError { wim_path: PathBuf::new(), reason: "no source wim resolved".to_string() })
    })?;
    let source_wim = PathBuf::from(source_wim);

    // Stage 3: Copy WIM.
    validate_integrity(servicer, &source_wim)?;
    let temp_path = PathBuf::from(&build_config.temp_path);
    std::fs::create_dir_all(&temp_path)?;
    let copy_destination = temp_path.join(source_wim.file_name().unwrap_or_default());
    std::fs::copy(&source_wim, &copy_destination)?;
    validate_integrity(servicer, &copy_destination)?;
    state.temp_files.push(copy_destination.clone());
    progress::publish(progress_sender, "Copy WIM", 3);

    // Stage 4: Mount.
    let mount_point = PathBuf::from(&build_config.mount_point);
    std::fs::create_dir_all(&mount_point)?;
    servicer.mount(&copy_destination, &mount_point)?;
    state.is_mounted = true;
    state.mount_point = Some(mount_point.clone());
    if !mount_point.join("Windows").exists() {
        return Err(EngineError::Integrity(IntegrityError {
            wim_path: copy_destination.clone(),
            reason: "mounted image has no Windows directory".to_string(),
        }));
    }
    progress::publish(progress_sender, "Mount", 4);

    let mut staging_manager = StagingManager::new();
    let yunona_source = PathBuf::from(&build_config.yunona_path);

    // Stage 5: Update Integration.
    let update_stats = if options.skip_updates {
        updates::UpdateStats::default()
    } else {
        staging_manager.ensure_staging_payload(&yunona_source, &mount_point)?;
        let manifests = crate::assets::scan_updates(Path::new(&build_config.update_root));
        let result = updates::run(
            manifests,
            options.os_id,
            options.skip_validation,
            servicer,
            &mount_point,
            options.max_retries,
            options.dry_run,
        );
        result.stats
    };
    progress::publish(progress_sender, "Update Integration", 5);

    // Stage 6: Driver Integration. Failure here is fatal, not skipped.
    let driver_stats = if options.skip_drivers {
        drivers::DriverStats::default()
    } else {
        staging_manager.ensure_staging_payload(&yunona_source, &mount_point)?;
        let manifests = crate::assets::scan_drivers(Path::new(&build_config.driver_root));
        let device_identifiers = config::device_family_identifiers(&options.root, &device_profile.device_id);
        let result = drivers::run(
            manifests,
            &device_identifiers,
            &device_profile.driver_family_ids,
            options.os_id,
            options.skip_validation,
            servicer,
            &mount_point,
            &options.root,
            options.dry_run,
        );
        result.stats
    };
    progress::publish(progress_sender, "Driver Integration", 6);

    // Stage 7: Unmount-Commit.
    servicer.unmount(&mount_point, true)?;
    state.is_mounted = false;
    validate_integrity(servicer, &copy_destination)?;
    progress::publish(progress_sender, "Unmount-Commit", 7);

    // Stage 8: Export.
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H%M%S");
    let export_name = format!("{}_{}_{}.wim", options.os_id, device_profile.device_id, timestamp);
    let export_path = PathBuf::from(&build_config.export_path);
    std::fs::create_dir_all(&export_path)?;
    let output_path = export_path.join(export_name);
    servicer.export(&copy_destination, &output_path)?;
    validate_integrity(servicer, &output_path)?;
    progress::publish(progress_sender, "Export", 8);

    // Stage 9: Cleanup.
    if !options.no_cleanup {
        for path in &state.temp_files {
            let _ = std::fs::remove_file(path).or_else(|_| std::fs::remove_dir_all(path));
        }
    }
    progress::publish(progress_sender, "Cleanup", 9);

    Ok(RunReport { device_id: device_profile.device_id.clone(), output_path, driver_stats, update_stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servicer::fake::FakeServicer;
    use tempfile::tempdir;

    fn write_inputs(root: &Path, os_id: u32) {
        std::fs::create_dir_all(root.join("DeviceConfig")).unwrap();
        std::fs::write(
            root.join("DeviceConfig").join("RW-528A.json"),
            r#"{"deviceId":"RW-528A","supportedOS":[10,11],"driverFamilyIds":["net"]}"#,
        )
        .unwrap();

        std::fs::create_dir_all(root.join("Engine")).unwrap();
        let wim_path = root.join("source.wim");
        std::fs::write(&wim_path, b"fake-wim").unwrap();

        std::fs::write(
            root.join("Engine").join("BuildConfig.json"),
            serde_json::json!({
                "name": "test-build",
                "mountPoint": root.join("Mount").to_string_lossy(),
                "exportPath": root.join("Export").to_string_lossy(),
                "tempPath": root.join("Temp").to_string_lossy(),
                "driverRoot": root.join("Drivers").to_string_lossy(),
                "updateRoot": root.join("Updates").to_string_lossy(),
                "yunonaPath": root.join("Yunona").to_string_lossy(),
                "osWimMap": { os_id.to_string(): wim_path.to_string_lossy() },
            })
            .to_string(),
        )
        .unwrap();

        std::fs::create_dir_all(root.join("Drivers")).unwrap();
        std::fs::create_dir_all(root.join("Updates")).unwrap();
        std::fs::create_dir_all(root.join("Yunona")).unwrap();
    }

    fn options(root: &Path, os_id: u32) -> OrchestratorOptions {
        OrchestratorOptions {
            root: root.to_path_buf(),
            device_file: Some("RW-528A.json".to_string()),
            os_id,
            no_cleanup: false,
            skip_drivers: false,
            skip_updates: false,
            skip_validation: true,
            dry_run: false,
            max_retries: 2,
        }
    }

    #[test]
    fn happy_path_produces_export_and_cleans_up_temp_files() {
        let root = tempdir().unwrap();
        write_inputs(root.path(), 10);
        let servicer = FakeServicer::default();

        // FakeServicer's mount doesn't create a Windows dir on disk, so we
        // create the mount point structure that its default success path expects.
        std::fs::create_dir_all(root.path().join("Mount").join("Windows")).unwrap();

        let report = run(options(root.path(), 10), "RW-528A.json".to_string(), &servicer, None).unwrap();
        assert_eq!(report.device_id, "RW-528A");
        assert!(root.path().join("Temp").read_dir().unwrap().next().is_none());
    }

    #[test]
    fn mount_failure_triggers_rollback_and_leaves_no_mount() {
        let root = tempdir().unwrap();
        write_inputs(root.path(), 10);
        let servicer = FakeServicer {
            mount_result: Box::new(|| Err(crate::error::ServicerError { operation: "Mount", exit_code: Some(1), stderr: "e".to_string() })),
            ..Default::default()
        };

        let err = run(options(root.path(), 10), "RW-528A.json".to_string(), &servicer, None);
        assert!(err.is_err());
        assert!(matches!(err.unwrap_err(), EngineError::Servicer(_)));

        let invocations = servicer.invocations.lock().unwrap();
        assert!(!invocations.iter().any(|i| matches!(i, crate::servicer::fake::Invocation::Unmount(_, true))));
    }

    #[test]
    fn unsupported_os_fails_before_any_temp_file_is_created() {
        let root = tempdir().unwrap();
        write_inputs(root.path(), 10);
        let servicer = FakeServicer::default();

        let err = run(options(root.path(), 42), "RW-528A.json".to_string(), &servicer, None);
        assert!(matches!(err.unwrap_err(), EngineError::Config(_)));
        assert!(!root.path().join("Temp").exists());
    }
}
