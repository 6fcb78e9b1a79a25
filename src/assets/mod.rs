//! Asset discovery and compatibility filtering (§4.3).

mod compat;
mod manifest;
mod scanner;

pub use compat::{driver_is_compatible, update_is_compatible};
pub use manifest::{DriverManifest, DriverType, RawDriverManifest, RawUpdateManifest, UpdateManifest, UpdateType};
pub use scanner::{find_files_with_extension, scan_drivers, scan_updates};
