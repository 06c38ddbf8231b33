// src/pipeline/schedule.rs

//! Periodic scanning.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::process::AdProcessor;
use super::scan::{ScanStats, run_scan};
use crate::error::Result;
use crate::models::Config;
use crate::services::ListingSource;
use crate::storage::ScanLog;

/// Scan now and then every `interval_secs` until Ctrl-C.
pub async fn run_scheduler(
    config: &Config,
    source: &dyn ListingSource,
    processor: &AdProcessor,
    scan_log: &dyn ScanLog,
) -> Result<usize> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    Ok(run_scheduler_until(config, source, processor, scan_log, shutdown).await)
}

/// Scan repeatedly until `shutdown` completes, returning the number of passes.
///
/// A pass in progress when `shutdown` fires is abandoned.
pub async fn run_scheduler_until(
    config: &Config,
    source: &dyn ListingSource,
    processor: &AdProcessor,
    scan_log: &dyn ScanLog,
    shutdown: impl Future<Output = ()>,
) -> usize {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut passes = 0;
    log::info!(
        "Watching {} searches every {}s",
        config.urls.len(),
        config.interval_secs
    );

    loop {
        let scan_no = passes + 1;
        let pass = async {
            ticker.tick().await;
            log::info!("Scan #{} starting", scan_no);
            run_scan(config, source, processor, scan_log).await
        };

        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutting down after {} scans", passes);
                return passes;
            }
            stats = pass => {
                passes += 1;
                log_pass(&stats);
            }
        }
    }
}

fn log_pass(stats: &ScanStats) {
    stats.log_summary();
    if stats.searches > 0 && stats.search_failures == stats.searches {
        log::warn!("Every search failed in this pass");
    }
}
