//! `Resolve(deviceFile, osId) -> ResolvedConfig | ConfigError` (§4.1).

use super::cache;
use super::model::{BuildConfig, DeviceProfile, Metadata, ResolvedConfig};
use super::placeholder;
use super::schema::{self, BUILD_CONFIG_SCHEMA, DEVICE_PROFILE_SCHEMA};
use crate::error::ConfigError;
use std::path::Path;

fn load_validated<T: serde::de::DeserializeOwned>(
    path: &Path,
    schema: &schema::Schema,
) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigMissing(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::ConfigMissing(path.to_path_buf()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|source| ConfigError::ConfigParseError { path: path.to_path_buf(), source })?;

    let violations = schema::validate(&value, schema);
    if !violations.is_empty() {
        return Err(ConfigError::SchemaViolation(violations));
    }

    serde_json::from_value(value).map_err(|source| ConfigError::ConfigParseError { path: path.to_path_buf(), source })
}

/// Resolves a device profile + build config pair for one target OS id.
///
/// Pipeline: load device profile JSON from `<root>/DeviceConfig/<deviceFile>`;
/// load build config JSON from `<root>/Engine/BuildConfig.json`; schema-validate
/// each; check `osId ∈ supportedOS`; look up `osWimMap[str(osId)]`; deep-copy;
/// resolve `${root}` placeholders. A cache hit bypasses all of this.
pub fn resolve(root: &Path, device_file: &str, os_id: u32) -> Result<ResolvedConfig, ConfigError> {
    let device_path = root.join("DeviceConfig").join(device_file);
    let build_config_path = root.join("Engine").join("BuildConfig.json");

    if let Some(cached) = cache::lookup(root, &device_path, os_id, &build_config_path) {
        log::debug!("config cache hit for {device_file} os={os_id}");
        return Ok(cached);
    }

    let mut device_profile: DeviceProfile = load_validated(&device_path, &DEVICE_PROFILE_SCHEMA)?;
    let mut build_config: BuildConfig = load_validated(&build_config_path, &BUILD_CONFIG_SCHEMA)?;

    if !device_profile.supported_os.contains(&os_id) {
        let mut supported: Vec<u32> = device_profile.supported_os.iter().copied().collect();
        supported.sort_unstable();
        return Err(ConfigError::OSIncompatible { os_id, supported });
    }

    let source_wim = build_config.os_wim_map.get(&os_id.to_string()).cloned().ok_or_else(|| {
        let mut available: Vec<u32> = build_config.os_wim_map.keys().filter_map(|k| k.parse().ok()).collect();
        available.sort_unstable();
        ConfigError::WimMappingMissing { os_id, available }
    })?;

    // Explicit structural copy (not a JSON round-trip, per the §9 redesign
    // note) before mutating the augmented fields.
    device_profile.selected_os_id = Some(os_id);
    build_config.selected_os_id = Some(os_id);
    build_config.source_wim = Some(source_wim);

    placeholder::resolve_build_config(&mut build_config, root);

    let resolved = ResolvedConfig {
        device_profile,
        build_config,
        metadata: Metadata {
            loaded_at: chrono::Local::now().to_rfc3339(),
            device_file: device_file.to_string(),
            os_id,
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    cache::store(root, &device_path, os_id, &build_config_path, &resolved);

    Ok(resolved)
}
