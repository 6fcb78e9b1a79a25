//! Servicer Adapter (§4.2, §4.8): typed operations over the external
//! image-servicing CLI, behind a `Servicer` trait so the orchestrator and
//! engines are testable without a real DISM binary.

use crate::error::ServicerError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

static INVOCATION_COUNTER: AtomicU64 = AtomicU64::new(0);

pub trait Servicer {
    fn get_image_info(&self, wim: &Path) -> Result<(), ServicerError>;
    fn mount(&self, wim: &Path, mount_dir: &Path) -> Result<(), ServicerError>;
    fn add_driver(&self, driver_dir: &Path, mount_dir: &Path) -> Result<(), ServicerError>;
    fn add_package(&self, package: &Path, mount_dir: &Path) -> Result<(), ServicerError>;
    fn unmount(&self, mount_dir: &Path, commit: bool) -> Result<(), ServicerError>;
    fn export(&self, source: &Path, destination: &Path) -> Result<(), ServicerError>;
}

/// Holds the per-invocation stdout/stderr temp files the child is redirected
/// into, and removes both unconditionally when dropped, regardless of which
/// exit path `ProcessServicer::run` took.
struct CapturedOutput {
    stdout_path: PathBuf,
    stderr_path: PathBuf,
}

impl CapturedOutput {
    fn new() -> std::io::Result<Self> {
        let pid = std::process::id();
        let seq = INVOCATION_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir();
        Ok(CapturedOutput {
            stdout_path: dir.join(format!("servicer-{pid}-{seq}.out.log")),
            stderr_path: dir.join(format!("servicer-{pid}-{seq}.err.log")),
        })
    }
}

impl Drop for CapturedOutput {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.stdout_path);
        let _ = std::fs::remove_file(&self.stderr_path);
    }
}

/// Shells out to a DISM-compatible CLI discoverable on `PATH`.
pub struct ProcessServicer {
    binary: String,
}

impl ProcessServicer {
    pub fn new() -> Self {
        ProcessServicer { binary: "dism".to_string() }
    }

    fn run(&self, operation: &'static str, args: &[String]) -> Result<(String, bool), ServicerError> {
        let capture = CapturedOutput::new().map_err(|e| ServicerError {
            operation,
            exit_code: None,
            stderr: format!("failed to allocate capture file: {e}"),
        })?;

        let stdout_file = std::fs::File::create(&capture.stdout_path).map_err(|e| ServicerError {
            operation,
            exit_code: None,
            stderr: format!("failed to open stdout capture file: {e}"),
        })?;
        let stderr_file = std::fs::File::create(&capture.stderr_path).map_err(|e| ServicerError {
            operation,
            exit_code: None,
            stderr: format!("failed to open stderr capture file: {e}"),
        })?;

        let status = Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .status()
            .map_err(|e| ServicerError { operation, exit_code: None, stderr: format!("failed to launch servicer: {e}") })?;

        let stdout = std::fs::read_to_string(&capture.stdout_path).unwrap_or_default();
        let stderr = std::fs::read_to_string(&capture.stderr_path).unwrap_or_default();

        if !status.success() {
            return Err(ServicerError { operation, exit_code: status.code(), stderr });
        }

        Ok((stdout, true))
    }
}

impl Default for ProcessServicer {
    fn default() -> Self {
        Self::new()
    }
}

impl Servicer for ProcessServicer {
    fn get_image_info(&self, wim: &Path) -> Result<(), ServicerError> {
        let (stdout, _) = self.run("GetImageInfo", &[format!("/get-wim-info"), format!("/WimFile:{}", wim.display())])?;
        if !stdout.contains("Index : 1") {
            return Err(ServicerError { operation: "GetImageInfo", exit_code: Some(0), stderr: stdout });
        }
        Ok(())
    }

    fn mount(&self, wim: &Path, mount_dir: &Path) -> Result<(), ServicerError> {
        self.run(
            "Mount",
            &[
                "/Mount-Wim".to_string(),
                format!("/WimFile:{}", wim.display()),
                "/Index:1".to_string(),
                format!("/MountDir:{}", mount_dir.display()),
            ],
        )?;
        if !mount_dir.join("Windows").exists() {
            return Err(ServicerError {
                operation: "Mount",
                exit_code: Some(0),
                stderr: format!("{}/Windows does not exist after mount", mount_dir.display()),
            });
        }
        Ok(())
    }

    fn add_driver(&self, driver_dir: &Path, mount_dir: &Path) -> Result<(), ServicerError> {
        self.run(
            "AddDriver",
            &[
                "/Add-Driver".to_string(),
                format!("/Image:{}", mount_dir.display()),
                format!("/Driver:{}", driver_dir.display()),
                "/Recurse".to_string(),
            ],
        )?;
        Ok(())
    }

    fn add_package(&self, package: &Path, mount_dir: &Path) -> Result<(), ServicerError> {
        self.run(
            "AddPackage",
            &[
                "/Add-Package".to_string(),
                format!("/Image:{}", mount_dir.display()),
                format!("/PackagePath:{}", package.display()),
            ],
        )?;
        Ok(())
    }

    fn unmount(&self, mount_dir: &Path, commit: bool) -> Result<(), ServicerError> {
        let flag = if commit { "/Commit" } else { "/Discard" };
        self.run(
            "Unmount",
            &["/Unmount-Wim".to_string(), format!("/MountDir:{}", mount_dir.display()), flag.to_string()],
        )?;
        Ok(())
    }

    fn export(&self, source: &Path, destination: &Path) -> Result<(), ServicerError> {
        self.run(
            "Export",
            &[
                "/Export-Image".to_string(),
                format!("/SourceImageFile:{}", source.display()),
                "/SourceIndex:1".to_string(),
                format!("/DestinationImageFile:{}", destination.display()),
                "/Compress:max".to_string(),
            ],
        )?;
        self.get_image_info(destination).map_err(|_| ServicerError {
            operation: "Export",
            exit_code: Some(0),
            stderr: format!("exported image {} failed integrity check", destination.display()),
        })
    }
}
