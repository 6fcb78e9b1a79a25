//! Content-hash cache for resolved configuration (§4.1). A cache hit
//! bypasses all other resolver work; a corrupt cache file is deleted and
//! treated as a miss.

use super::model::ResolvedConfig;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

fn mtime_nanos(path: &Path) -> std::io::Result<u64> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata.modified()?;
    Ok(modified.duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0))
}

/// Key = hash of (deviceFile | osId | mtime(deviceFile) | mtime(buildConfig)).
pub(super) fn cache_key(device_file: &Path, os_id: u32, build_config_file: &Path) -> std::io::Result<String> {
    let device_mtime = mtime_nanos(device_file)?;
    let build_mtime = mtime_nanos(build_config_file)?;

    let mut hasher = Sha256::new();
    hasher.update(device_file.to_string_lossy().as_bytes());
    hasher.update(b"|");
    hasher.update(os_id.to_le_bytes());
    hasher.update(b"|");
    hasher.update(device_mtime.to_le_bytes());
    hasher.update(b"|");
    hasher.update(build_mtime.to_le_bytes());

    Ok(format!("{:x}", hasher.finalize()))
}

fn cache_path(root: &Path, key: &str) -> PathBuf {
    root.join("Runtime").join("Cache").join(format!("{key}.json"))
}

/// Looks up a cached `ResolvedConfig`. Returns `None` on a miss *or* on a
/// corrupt cache file -- in the corrupt case the file is deleted so the
/// miss is permanent rather than repeatedly re-triggering a parse error.
pub(super) fn lookup(root: &Path, device_file: &Path, os_id: u32, build_config_file: &Path) -> Option<ResolvedConfig> {
    let key = cache_key(device_file, os_id, build_config_file).ok()?;
    let path = cache_path(root, &key);
    let contents = std::fs::read_to_string(&path).ok()?;

    match serde_json::from_str(&contents) {
        Ok(resolved) => Some(resolved),
        Err(_) => {
            log::warn!("corrupt config cache entry at {}, discarding", path.display());
            let _ = std::fs::remove_file(&path);
            None
        }
    }
}

pub(super) fn store(root: &Path, device_file: &Path, os_id: u32, build_config_file: &Path, resolved: &ResolvedConfig) {
    let Ok(key) = cache_key(device_file, os_id, build_config_file) else {
        return;
    };
    let path = cache_path(root, &key);
    if let Some(parent) = path.parent()
        && std::fs::create_dir_all(parent).is_ok()
        && let Ok(json) = serde_json::to_string_pretty(resolved)
    {
        let _ = std::fs::write(path, json);
    }
}
