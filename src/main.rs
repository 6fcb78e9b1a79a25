use crate::cli::App;
use crate::console::{print_completion_banner, ConsoleLogger};
use crate::interactive::select_device;
use crate::servicer::ProcessServicer;
use clap::Parser;
use log::Level;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;

mod assets;
mod cli;
mod config;
mod console;
mod drivers;
mod error;
mod orchestrator;
mod progress;
mod servicer;
mod staging;
mod updates;
mod utils;
mod interactive;

pub static BUFFER_SIZE: AtomicUsize = AtomicUsize::new(65536);

fn engine_root(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn main() -> process::ExitCode {
    let cli = App::parse();

    if let Some(size) = cli.buffer_size {
        BUFFER_SIZE.store(size, Ordering::Relaxed);
    }

    let root = engine_root(cli.root.clone());

    let level = if cli.debug { Level::Debug } else { Level::Info };
    let mirror_path = root.join("Logs").join(format!("LOG_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S")));
    if let Err(e) = ConsoleLogger::init(level, Some(mirror_path)) {
        eprintln!("failed to initialize logger: {e}");
        return process::ExitCode::FAILURE;
    }

    let scratch_path = root.join("Runtime").join("Scratch");
    {
        let scratch_path = scratch_path.clone();
        ctrlc::set_handler(move || {
            let _ = std::fs::remove_dir_all(&scratch_path);
            process::exit(1);
        })
        .expect("failed to install Ctrl-C handler");
    }

    let start = Instant::now();

    let device_file = match orchestrator::select_device_file(&root, cli.device.clone(), |names| {
        select_device(names).map_err(error::EngineError::from)
    }) {
        Ok(name) => name,
        Err(e) => {
            log::error!("{e}");
            return process::ExitCode::FAILURE;
        }
    };

    let (progress_tx, progress_rx) = mpsc::channel();
    let progress_thread = std::thread::spawn(move || {
        let bar = indicatif::ProgressBar::new(progress::TOTAL_STAGES as u64);
        bar.set_style(
            indicatif::ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
        );
        for event in progress_rx {
            bar.set_position(event.step_number as u64);
            bar.set_message(event.stage_name);
        }
        bar.finish_and_clear();
    });

    let options = orchestrator::OrchestratorOptions {
        root: root.clone(),
        device_file: Some(device_file.clone()),
        os_id: cli.os_id,
        no_cleanup: cli.no_cleanup,
        skip_drivers: cli.skip_drivers,
        skip_updates: cli.skip_updates,
        skip_validation: cli.skip_validation,
        dry_run: cli.dry_run,
        max_retries: cli.max_retries,
    };

    let servicer = ProcessServicer::new();
    let result = orchestrator::run(options, device_file, &servicer, Some(&progress_tx));
    drop(progress_tx);
    let _ = progress_thread.join();

    match result {
        Ok(report) => {
            log::info!(
                "drivers: processed={} failed={} skipped={} | updates: processed={} failed={} skipped={}",
                report.driver_stats.processed,
                report.driver_stats.failed,
                report.driver_stats.skipped,
                report.update_stats.processed,
                report.update_stats.failed,
                report.update_stats.skipped,
            );
            print_completion_banner(&report.device_id, &report.output_path, start.elapsed());
            process::ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("pipeline failed: {e}");
            process::ExitCode::FAILURE
        }
    }
}
