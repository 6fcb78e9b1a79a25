//! Compatibility Filter (§4.3): decides which scanned manifests actually
//! apply to the selected device/OS for this build.

use super::manifest::{DriverManifest, UpdateManifest};
use std::collections::HashSet;

/// A driver manifest is compatible when ALL of: the device's family id set
/// intersects `supportedDevices`, the selected OS id is in
/// `supportedOperatingSystems`, and the driver's own `driverFamilyId` is
/// among the device's `driverFamilyIds`.
pub fn driver_is_compatible(
    manifest: &DriverManifest,
    device_family_ids: &HashSet<String>,
    os_id: u32,
    device_driver_family_ids: &HashSet<String>,
) -> bool {
    let device_matches = manifest.supported_devices.iter().any(|id| device_family_ids.contains(id));
    let os_matches = manifest.supported_operating_systems.contains(&os_id);
    let family_matches = device_driver_family_ids.contains(&manifest.driver_family_id);

    device_matches && os_matches && family_matches
}

/// An update manifest is compatible when the selected OS id is supported
/// AND its payload file exists and is non-empty on disk.
pub fn update_is_compatible(manifest: &mut UpdateManifest, os_id: u32) -> bool {
    if !manifest.supported_operating_systems.contains(&os_id) {
        return false;
    }

    let payload_path = manifest.expected_payload_path();
    match std::fs::metadata(&payload_path) {
        Ok(metadata) if metadata.len() > 0 => {
            manifest.validated_file_path = Some(payload_path);
            true
        }
        Ok(_) => {
            log::warn!("update payload {} is empty, skipping {}", payload_path.display(), manifest.update_name);
            false
        }
        Err(_) => {
            log::warn!("update payload {} missing, skipping {}", payload_path.display(), manifest.update_name);
            false
        }
    }
}
