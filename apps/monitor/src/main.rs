#![warn(clippy::all, clippy::pedantic)]

use chrono::Utc;
use clap::Parser;
use pingwatch::report::{fmt_hms, text};
use pingwatch::{Monitor, MonitorConfig, RunSummary};
use tracing::warn;

mod cli;
mod config;
mod display;
mod duration;
mod error;
mod signal;

use cli::Args;
use config::Config;
use error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    logger::init_tracing_with(args.verbose);

    let mut monitor_config = load_config(&args)?;
    args.apply(&mut monitor_config);

    if args.show_config {
        print!("{}", config::Effective(&monitor_config));
        return Ok(());
    }

    let monitor = Monitor::new(monitor_config)?;
    print_banner(&monitor);

    let _signals = signal::install(monitor.cancel_handle())?;
    let progress = display::spawn(monitor.subscribe_progress());

    let summary = monitor.run().await?;
    // The progress channel closes with the run; wait for the last status line
    let _ = progress.await;

    print_summary(&summary);
    if summary.is_complete() { Ok(()) } else { Err(AppError::IncompleteOutput) }
}

/// File config, falling back to built-in defaults when there is no home
/// directory to keep one in
fn load_config(args: &Args) -> Result<MonitorConfig, AppError> {
    let file = match Config::from_config(args.config.as_deref()) {
        Ok(file) => file,
        Err(config::Error::ConfigPathUnavailable) if args.config.is_none() => {
            warn!("No config directory available, using built-in defaults");
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };
    Ok(file.to_monitor_config()?)
}

fn print_banner(monitor: &Monitor) {
    let config = monitor.config();
    println!("Ping monitor started at {}", config.time_basis.timestamp(Utc::now()));
    println!("Target:   {} ({})", config.target_address, config.method);
    println!("Interval: {:?}", config.probe_interval);
    match config.max_duration {
        Some(max) => println!("Duration: {}", fmt_hms(max)),
        None => println!("Duration: until interrupted"),
    }
    println!("Drop log: {}", config.log_path.display());
    println!("Report:   {}", config.report_path.display());
    println!("Run:      {}", monitor.run_id());
    println!("Press Ctrl+C to stop and write the report");
    println!("{}", "-".repeat(50));
}

fn print_summary(summary: &RunSummary) {
    println!();
    print!("{}", text::render(&summary.report));
    println!();
    println!("Drop log written to {}", summary.log_path.display());
    if summary.report_written {
        println!("Report written to {}", summary.report_path.display());
    }
}
