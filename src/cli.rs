//! Command-line surface (§6, §6.1).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version)]
#[clap(propagate_version = false)]
#[command(disable_version_flag = false)]
pub struct App {
    /// Target operating system id; must be in the selected device's supportedOS set
    #[clap(long)]
    pub os_id: u32,

    /// Device profile file name under DeviceConfig/; omit to select interactively
    #[clap(long)]
    pub device: Option<String>,

    /// Engine root directory [default: executable's directory]
    #[clap(long)]
    pub root: Option<PathBuf>,

    /// Skip the stage 9 temp file cleanup, on both success and rollback
    #[clap(long)]
    pub no_cleanup: bool,

    /// Skip the driver integration stage entirely
    #[clap(long)]
    pub skip_drivers: bool,

    /// Skip the update integration stage entirely
    #[clap(long)]
    pub skip_updates: bool,

    /// Bypass driver/update compatibility filtering
    #[clap(long)]
    pub skip_validation: bool,

    /// Log planned operations without invoking the servicer or staging copier
    #[clap(long)]
    pub dry_run: bool,

    /// Additional AddPackage attempts after the first failure
    #[clap(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Debug-level logging
    #[clap(long)]
    pub debug: bool,

    /// Buffer size in bytes for file hashing and copy operations [default: 65536]
    #[clap(long)]
    pub buffer_size: Option<usize>,
}
