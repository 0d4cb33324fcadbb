//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `dnscrypt_refresh` library that handles:
//! - Environment variable loading (.env file)
//! - Command-line argument parsing and validation
//! - Logger initialization
//! - Running once or on a fixed schedule
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use dnscrypt_refresh::app::wait_for_next_run;
use dnscrypt_refresh::initialization::init_logger_with;
use dnscrypt_refresh::{run_refresh, Config, PublishStatus, RefreshReport};

fn print_report(report: &RefreshReport) {
    println!(
        "Refreshed {} server{} ({} succeeded, {} from cache, {} failed) in {:.1}s",
        report.total_servers,
        if report.total_servers == 1 { "" } else { "s" },
        report.successful,
        report.from_cache,
        report.failed,
        report.elapsed_seconds
    );
    println!("Rewrote {} list line(s)", report.lines_rewritten);
    match &report.publish {
        PublishStatus::Disabled => {}
        PublishStatus::NothingToPublish => println!("Nothing to publish"),
        PublishStatus::Published(sha) => println!("Published commit {}", sha),
        PublishStatus::Failed(reason) => eprintln!("Publishing failed: {}", reason),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env in the working directory first, then next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = Config::parse();
    if let Err(e) = config.validate() {
        eprintln!("dnscrypt_refresh: {}", e);
        process::exit(2);
    }

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format)
        .context("Failed to initialize logger")?;

    let Some(hours) = config.repeat_hours else {
        match run_refresh(&config).await {
            Ok(report) => {
                print_report(&report);
                if matches!(report.publish, PublishStatus::Failed(_)) {
                    process::exit(1);
                }
                return Ok(());
            }
            Err(e) => {
                eprintln!("dnscrypt_refresh error: {:#}", e);
                process::exit(1);
            }
        }
    };

    let interval = Duration::from_secs(hours.saturating_mul(3600));
    loop {
        match run_refresh(&config).await {
            Ok(report) => print_report(&report),
            // A failed run is retried at the next interval
            Err(e) => log::error!("Refresh failed: {:#}", e),
        }
        if !wait_for_next_run(interval).await {
            return Ok(());
        }
    }
}
