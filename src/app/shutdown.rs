//! Waiting between scheduled runs.

use std::time::Duration;

/// Sleeps until the next scheduled run or until Ctrl-C.
///
/// # Returns
///
/// `true` when the interval elapsed and another run should start, `false`
/// when a shutdown was requested.
pub async fn wait_for_next_run(interval: Duration) -> bool {
    log::info!(
        "Next refresh in {:.1} hours (Ctrl-C to stop)",
        interval.as_secs_f64() / 3600.0
    );
    tokio::select! {
        _ = tokio::time::sleep(interval) => true,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                log::warn!("Failed to listen for Ctrl-C: {}", e);
            }
            log::info!("Shutdown requested, stopping");
            false
        }
    }
}
