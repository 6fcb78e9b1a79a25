//! Staging Manager ("Yunona", §4.6): copies the versioned post-deployment
//! payload tree into the mounted image, once per run.

use std::path::{Path, PathBuf};

#[derive(Debug, serde::Deserialize)]
struct StagingVersionFile {
    version: Option<String>,
}

fn read_version(config_path: &Path) -> Option<semver::Version> {
    let contents = std::fs::read_to_string(config_path).ok()?;
    let parsed: StagingVersionFile = serde_json::from_str(&contents).ok()?;
    let raw = parsed.version?;
    semver::Version::parse(&raw).ok()
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

/// One entry point per run: `ensure(source, mount_point)` is a no-op on
/// re-entry (guarded by `self.done`) and a no-op across runs when the
/// target payload's version is already >= the source's.
pub struct StagingManager {
    done: bool,
}

impl StagingManager {
    pub fn new() -> Self {
        StagingManager { done: false }
    }

    /// `yunona_source` is the versioned payload tree to copy from;
    /// `mount_point` is the mounted image root, so the target directory is
    /// `<mount_point>/Users/Public/Yunona`.
    pub fn ensure_staging_payload(&mut self, yunona_source: &Path, mount_point: &Path) -> Result<(), crate::error::StagingError> {
        if self.done {
            return Ok(());
        }
        self.done = true;

        let target = mount_point.join("Users").join("Public").join("Yunona");
        let source_version = read_version(&yunona_source.join("config.json"));
        let target_version = read_version(&target.join("config.json"));

        if let (Some(target_v), Some(source_v)) = (&target_version, &source_version)
            && target_v >= source_v
        {
            log::debug!("staging payload already at {target_v}, skipping copy");
            return Ok(());
        }

        copy_tree(yunona_source, &target).map_err(|e| crate::error::StagingError {
            source: yunona_source.to_path_buf(),
            destination: target.clone(),
            reason: e.to_string(),
        })
    }
}

impl Default for StagingManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `source_dir`'s entire contents (used by the APPX/EXE driver/update
/// dispatch) into `<mount_point>/Users/Public/Yunona/<name>`.
pub fn stage_directory(source_dir: &Path, mount_point: &Path, name: &str) -> Result<(), crate::error::StagingError> {
    let target = mount_point.join("Users").join("Public").join("Yunona").join(name);
    copy_tree(source_dir, &target)
        .map_err(|e| crate::error::StagingError { source: source_dir.to_path_buf(), destination: target, reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_version(dir: &Path, version: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("config.json"), format!(r#"{{"version":"{version}"}}"#)).unwrap();
    }

    #[test]
    fn reentry_is_a_no_op() {
        let source = tempdir().unwrap();
        let mount = tempdir().unwrap();
        write_version(source.path(), "1.2.0");
        std::fs::write(source.path().join("payload.txt"), b"hi").unwrap();

        let mut manager = StagingManager::new();
        manager.ensure_staging_payload(source.path(), mount.path()).unwrap();
        assert!(mount.path().join("Users/Public/Yunona/payload.txt").exists());

        std::fs::remove_file(mount.path().join("Users/Public/Yunona/payload.txt")).unwrap();
        manager.ensure_staging_payload(source.path(), mount.path()).unwrap();
        assert!(!mount.path().join("Users/Public/Yunona/payload.txt").exists());
    }

    #[test]
    fn skips_copy_when_target_version_is_newer_or_equal() {
        let source = tempdir().unwrap();
        let mount = tempdir().unwrap();
        write_version(source.path(), "1.0.0");
        std::fs::write(source.path().join("payload.txt"), b"new").unwrap();

        let target = mount.path().join("Users/Public/Yunona");
        write_version(&target, "2.0.0");

        let mut manager = StagingManager::new();
        manager.ensure_staging_payload(source.path(), mount.path()).unwrap();
        assert!(!target.join("payload.txt").exists());
    }

    #[test]
    fn unparsable_target_version_is_treated_as_missing_and_forces_copy() {
        let source = tempdir().unwrap();
        let mount = tempdir().unwrap();
        write_version(source.path(), "1.0.0");
        std::fs::write(source.path().join("payload.txt"), b"new").unwrap();

        let target = mount.path().join("Users/Public/Yunona");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("config.json"), "{not json").unwrap();

        let mut manager = StagingManager::new();
        manager.ensure_staging_payload(source.path(), mount.path()).unwrap();
        assert!(target.join("payload.txt").exists());
    }
}
