//! Manifest types (§3). Raw forms are exactly what `serde_json` produces;
//! enriched forms add the fields the scanner injects at load time, per the
//! §9 redesign note ("dynamic property augmentation -> distinct record
//! types").

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn default_order() -> i64 {
    9999
}

/// `driverType`/`updateType` are declared case-insensitive (§3), so both
/// enums deserialize from a lowercased copy of the input string instead of
/// relying on serde's exact-match `rename_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverType {
    Inf,
    Appx,
    Exe,
}

impl<'de> Deserialize<'de> for DriverType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "inf" => Ok(DriverType::Inf),
            "appx" => Ok(DriverType::Appx),
            "exe" => Ok(DriverType::Exe),
            other => Err(D::Error::custom(format!("unknown driverType `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Msu,
    Cab,
    Exe,
    Msi,
}

impl<'de> Deserialize<'de> for UpdateType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "msu" => Ok(UpdateType::Msu),
            "cab" => Ok(UpdateType::Cab),
            "exe" => Ok(UpdateType::Exe),
            "msi" => Ok(UpdateType::Msi),
            other => Err(D::Error::custom(format!("unknown updateType `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDriverManifest {
    #[serde(rename = "driverName")]
    pub driver_name: String,
    #[serde(rename = "driverType")]
    pub driver_type: DriverType,
    #[serde(rename = "driverFamilyId")]
    pub driver_family_id: String,
    #[serde(rename = "supportedDevices")]
    pub supported_devices: HashSet<String>,
    #[serde(rename = "supportedOperatingSystems")]
    pub supported_operating_systems: HashSet<u32>,
    #[serde(default = "default_order")]
    pub order: i64,
}

/// Enriched driver manifest: the raw form plus the directory it was found
/// in and the full manifest path, injected by the scanner.
#[derive(Debug, Clone)]
pub struct DriverManifest {
    pub driver_name: String,
    pub driver_type: DriverType,
    pub driver_family_id: String,
    pub supported_devices: HashSet<String>,
    pub supported_operating_systems: HashSet<u32>,
    pub order: i64,
    pub source_directory: PathBuf,
    pub source_path: PathBuf,
}

impl DriverManifest {
    pub fn enrich(raw: RawDriverManifest, source_path: PathBuf) -> Self {
        let source_directory = source_path.parent().map(Path::to_path_buf).unwrap_or_else(|| source_path.clone());
        DriverManifest {
            driver_name: raw.driver_name,
            driver_type: raw.driver_type,
            driver_family_id: raw.driver_family_id,
            supported_devices: raw.supported_devices,
            supported_operating_systems: raw.supported_operating_systems,
            order: raw.order,
            source_directory,
            source_path,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUpdateManifest {
    #[serde(rename = "updateName")]
    pub update_name: String,
    #[serde(rename = "updateVersion")]
    pub update_version: String,
    #[serde(rename = "updateType")]
    pub update_type: UpdateType,
    #[serde(rename = "supportedOperatingSystems")]
    pub supported_operating_systems: HashSet<u32>,
    #[serde(rename = "downloadFileName")]
    pub download_file_name: String,
    #[serde(default = "default_order")]
    pub order: i64,
}

/// Enriched update manifest. `validated_file_path` is filled in by the
/// compatibility filter once the payload file's existence has been checked;
/// it is `None` until then.
#[derive(Debug, Clone)]
pub struct UpdateManifest {
    pub update_name: String,
    pub update_version: String,
    pub update_type: UpdateType,
    pub supported_operating_systems: HashSet<u32>,
    pub download_file_name: String,
    pub order: i64,
    pub source_directory: PathBuf,
    pub source_path: PathBuf,
    pub validated_file_path: Option<PathBuf>,
}

impl UpdateManifest {
    pub fn enrich(raw: RawUpdateManifest, source_path: PathBuf) -> Self {
        let source_directory = source_path.parent().map(Path::to_path_buf).unwrap_or_else(|| source_path.clone());
        UpdateManifest {
            update_name: raw.update_name,
            update_version: raw.update_version,
            update_type: raw.update_type,
            supported_operating_systems: raw.supported_operating_systems,
            download_file_name: raw.download_file_name,
            order: raw.order,
            source_directory,
            source_path,
            validated_file_path: None,
        }
    }

    pub fn expected_payload_path(&self) -> PathBuf {
        self.source_directory.join(&self.download_file_name)
    }
}
