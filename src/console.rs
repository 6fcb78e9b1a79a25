//! Leveled, colorized console output.
//!
//! Presentation only -- mirrors the teacher's `write_console`/`ConsoleType`
//! shape, generalized into a `log::Log` sink so the rest of the engine emits
//! through the standard `log` macros instead of calling this directly.

use console::style;
use log::{Level, Log, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct ConsoleLogger {
    mirror: Option<Mutex<std::fs::File>>,
}

impl ConsoleLogger {
    /// Installs the logger as the global `log` sink. `mirror_path`, when
    /// given, is the textual log file under `<root>/Logs/` that every
    /// record is additionally appended to (per §6).
    pub fn init(level: Level, mirror_path: Option<PathBuf>) -> anyhow::Result<()> {
        let mirror = match mirror_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Some(Mutex::new(OpenOptions::new().create(true).append(true).open(path)?))
            }
            None => None,
        };

        let logger = ConsoleLogger { mirror };
        log::set_max_level(level.to_level_filter());
        log::set_boxed_logger(Box::new(logger)).map_err(|e| anyhow::anyhow!("logger already installed: {e}"))?;
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let label = match record.level() {
            Level::Error => style(" ERROR ").red().bold(),
            Level::Warn => style("WARNING").yellow().bold(),
            Level::Info => style("  INFO ").cyan(),
            Level::Debug => style(" DEBUG ").magenta(),
            Level::Trace => style(" TRACE ").dim(),
        };
        println!("  {}      {}", label, record.args());

        if let Some(mirror) = &self.mirror
            && let Ok(mut file) = mirror.lock()
        {
            let now = chrono::Local::now();
            let _ = writeln!(file, "[{}] [{}] {}", now.format("%Y-%m-%d %H:%M:%S"), record.level(), record.args());
        }
    }

    fn flush(&self) {
        if let Some(mirror) = &self.mirror
            && let Ok(mut file) = mirror.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Prints the success/failure completion banner described in §7: device id,
/// output path, and total duration on success.
pub fn print_completion_banner(device_id: &str, output: &std::path::Path, duration: std::time::Duration) {
    println!();
    println!("  {}", style("deployment complete").green().bold());
    println!("    device:   {device_id}");
    println!("    output:   {}", output.display());
    println!("    duration: {:.1}s", duration.as_secs_f64());
}
