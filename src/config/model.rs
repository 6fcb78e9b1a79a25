//! Data model (§3): DeviceProfile, BuildConfig, DeviceFamilyMapping,
//! ResolvedConfig.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Identity and compatibility declaration for one device family.
///
/// Immutable after load except for `selected_os_id`, attached by the
/// resolver once an os id has been validated against `supported_os`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "supportedOS")]
    pub supported_os: HashSet<u32>,
    #[serde(rename = "driverFamilyIds")]
    pub driver_family_ids: HashSet<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(skip)]
    pub selected_os_id: Option<u32>,
}

/// Named path set plus the OS → WIM map. Augmented with `source_wim` and
/// `selected_os_id` once resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub name: String,
    #[serde(rename = "mountPoint")]
    pub mount_point: String,
    #[serde(rename = "exportPath")]
    pub export_path: String,
    #[serde(rename = "tempPath")]
    pub temp_path: String,
    #[serde(rename = "driverRoot")]
    pub driver_root: String,
    #[serde(rename = "updateRoot")]
    pub update_root: String,
    #[serde(rename = "yunonaPath")]
    pub yunona_path: String,
    #[serde(rename = "osWimMap")]
    pub os_wim_map: HashMap<String, String>,
    #[serde(default)]
    pub source_wim: Option<String>,
    #[serde(default)]
    pub selected_os_id: Option<u32>,
}

/// One entry of a device family mapping: a family key expands to a set of
/// hardware identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFamilyEntry {
    #[serde(rename = "deviceIds")]
    pub device_ids: Vec<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFamilyMapping {
    #[serde(rename = "familyMapping")]
    pub family_mapping: HashMap<String, DeviceFamilyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub loaded_at: String,
    pub device_file: String,
    pub os_id: u32,
    pub version: String,
}

/// Root entity the orchestrator consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub device_profile: DeviceProfile,
    pub build_config: BuildConfig,
    pub metadata: Metadata,
}
