//! Config Resolver (§4.1): schema-validated, cache-keyed loading and merging
//! of device and build configuration with `${root}` placeholder expansion.

mod cache;
mod model;
mod placeholder;
mod resolver;
mod schema;

pub use model::{BuildConfig, DeviceFamilyEntry, DeviceFamilyMapping, DeviceProfile, Metadata, ResolvedConfig};
pub use resolver::resolve;

use std::collections::HashSet;
use std::path::Path;

/// Loads `<root>/Engine/DeviceFamilyMapping.json` and returns the hardware
/// identifier set for `device_id`'s family entry. Missing file or missing
/// entry both yield an empty set (non-fatal; the driver compatibility
/// check then simply matches nothing on condition 1).
pub fn device_family_identifiers(root: &Path, device_id: &str) -> HashSet<String> {
    let path = root.join("Engine").join("DeviceFamilyMapping.json");
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => {
            log::warn!("device family mapping not found at {}", path.display());
            return HashSet::new();
        }
    };

    let mapping: DeviceFamilyMapping = match serde_json::from_str(&contents) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("failed to parse device family mapping {}: {e}", path.display());
            return HashSet::new();
        }
    };

    match mapping.family_mapping.get(device_id) {
        Some(entry) => entry.device_ids.iter().cloned().collect(),
        None => {
            log::warn!("no device family mapping entry for {device_id}");
            HashSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_device_profile(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
        let device_dir = dir.join("DeviceConfig");
        fs::create_dir_all(&device_dir).unwrap();
        let path = device_dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn write_build_config(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
        let engine_dir = dir.join("Engine");
        fs::create_dir_all(&engine_dir).unwrap();
        let path = engine_dir.join("BuildConfig.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn resolve_happy_path_substitutes_placeholder_and_caches() {
        let root = tempdir().unwrap();
        write_device_profile(
            root.path(),
            "RW-528A.json",
            r#"{"deviceId":"RW-528A","supportedOS":[10,11],"driverFamilyIds":["net","gpu"]}"#,
        );
        write_build_config(
            root.path(),
            r#"{
                "name": "test",
                "mountPoint": "${root}/Mount",
                "exportPath": "${root}/Export",
                "tempPath": "${root}/Temp",
                "driverRoot": "${root}/Drivers",
                "updateRoot": "${root}/Updates",
                "yunonaPath": "${root}/Yunona",
                "osWimMap": {"10": "C:/images/w10.wim"}
            }"#,
        );

        let resolved = resolve(root.path(), "RW-528A.json", 10).expect("resolve should succeed");
        assert_eq!(resolved.device_profile.device_id, "RW-528A");
        assert_eq!(resolved.device_profile.selected_os_id, Some(10));
        assert_eq!(resolved.build_config.source_wim.as_deref(), Some("C:/images/w10.wim"));
        assert!(resolved.build_config.mount_point.ends_with("Mount"));
        assert!(!resolved.build_config.mount_point.contains("${root}"));

        // Second resolve with unchanged inputs must hit the cache and be
        // structurally identical (round-trip / idempotence, §8).
        let resolved_again = resolve(root.path(), "RW-528A.json", 10).expect("cached resolve should succeed");
        assert_eq!(resolved.device_profile.device_id, resolved_again.device_profile.device_id);
        assert_eq!(resolved.build_config.source_wim, resolved_again.build_config.source_wim);
    }

    #[test]
    fn resolve_rejects_unsupported_os_before_any_side_effect() {
        let root = tempdir().unwrap();
        write_device_profile(
            root.path(),
            "RW-528A.json",
            r#"{"deviceId":"RW-528A","supportedOS":[10,11],"driverFamilyIds":[]}"#,
        );
        write_build_config(
            root.path(),
            r#"{"name":"t","mountPoint":"${root}/m","exportPath":"${root}/e","tempPath":"${root}/t",
                "driverRoot":"${root}/d","updateRoot":"${root}/u","yunonaPath":"${root}/y",
                "osWimMap":{"10":"C:/w10.wim"}}"#,
        );

        let err = resolve(root.path(), "RW-528A.json", 42).unwrap_err();
        assert!(matches!(err, crate::error::ConfigError::OSIncompatible { os_id: 42, .. }));
        assert!(!root.path().join("Runtime/Cache").exists() || fs::read_dir(root.path().join("Runtime/Cache")).unwrap().count() == 0);
    }

    #[test]
    fn resolve_reports_missing_wim_mapping() {
        let root = tempdir().unwrap();
        write_device_profile(
            root.path(),
            "RW-528A.json",
            r#"{"deviceId":"RW-528A","supportedOS":[10],"driverFamilyIds":[]}"#,
        );
        write_build_config(
            root.path(),
            r#"{"name":"t","mountPoint":"${root}/m","exportPath":"${root}/e","tempPath":"${root}/t",
                "driverRoot":"${root}/d","updateRoot":"${root}/u","yunonaPath":"${root}/y",
                "osWimMap":{"11":"C:/w11.wim"}}"#,
        );

        let err = resolve(root.path(), "RW-528A.json", 10).unwrap_err();
        assert!(matches!(err, crate::error::ConfigError::WimMappingMissing { os_id: 10, .. }));
    }

    #[test]
    fn resolve_aggregates_all_schema_violations() {
        let root = tempdir().unwrap();
        write_device_profile(root.path(), "bad.json", r#"{"deviceId":null}"#);
        write_build_config(
            root.path(),
            r#"{"name":"t","mountPoint":"${root}/m","exportPath":"${root}/e","tempPath":"${root}/t",
                "driverRoot":"${root}/d","updateRoot":"${root}/u","yunonaPath":"${root}/y",
                "osWimMap":{}}"#,
        );

        let err = resolve(root.path(), "bad.json", 10).unwrap_err();
        match err {
            crate::error::ConfigError::SchemaViolation(violations) => {
                assert!(violations.len() >= 2, "expected multiple aggregated violations, got {violations:?}");
            }
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }

    #[test]
    fn device_family_identifiers_reads_the_matching_entry() {
        let root = tempdir().unwrap();
        let engine_dir = root.path().join("Engine");
        fs::create_dir_all(&engine_dir).unwrap();
        fs::write(
            engine_dir.join("DeviceFamilyMapping.json"),
            r#"{"familyMapping":{"RW-528A":{"deviceIds":["PCI\\VEN_1","PCI\\VEN_2"]}}}"#,
        )
        .unwrap();

        let ids = device_family_identifiers(root.path(), "RW-528A");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("PCI\\VEN_1"));
    }

    #[test]
    fn device_family_identifiers_is_empty_when_file_or_entry_is_missing() {
        let root = tempdir().unwrap();
        assert!(device_family_identifiers(root.path(), "RW-528A").is_empty());

        let engine_dir = root.path().join("Engine");
        fs::create_dir_all(&engine_dir).unwrap();
        fs::write(engine_dir.join("DeviceFamilyMapping.json"), r#"{"familyMapping":{}}"#).unwrap();
        assert!(device_family_identifiers(root.path(), "RW-528A").is_empty());
    }

    #[test]
    fn corrupt_cache_file_is_deleted_and_treated_as_miss() {
        let root = tempdir().unwrap();
        write_device_profile(
            root.path(),
            "RW-528A.json",
            r#"{"deviceId":"RW-528A","supportedOS":[10],"driverFamilyIds":[]}"#,
        );
        write_build_config(
            root.path(),
            r#"{"name":"t","mountPoint":"${root}/m","exportPath":"${root}/e","tempPath":"${root}/t",
                "driverRoot":"${root}/d","updateRoot":"${root}/u","yunonaPath":"${root}/y",
                "osWimMap":{"10":"C:/w10.wim"}}"#,
        );

        let cache_dir = root.path().join("Runtime").join("Cache");
        fs::create_dir_all(&cache_dir).unwrap();
        let key = cache::cache_key(&root.path().join("DeviceConfig/RW-528A.json"), 10, &root.path().join("Engine/BuildConfig.json"))
            .expect("cache key computation should succeed");
        fs::write(cache_dir.join(format!("{key}.json")), "{not valid json").unwrap();

        let resolved = resolve(root.path(), "RW-528A.json", 10).expect("should recover from corrupt cache");
        assert_eq!(resolved.device_profile.device_id, "RW-528A");
    }
}
