//! Batch orchestrator — owns the browser session and runs the trip pipeline
//! over the full record sequence, strictly sequentially.
//!
//! The open form is session-scoped mutable state on the target page, so
//! trips are never overlapped: one producer of browser commands at any
//! instant. Per-trip failures are absorbed (cooldown, then the next trip);
//! only batch-level faults — data loading, browser launch — surface to the
//! caller.

use crate::config::Config;
use crate::ledger::Ledger;
use crate::locators::LocatorRegistry;
use crate::pipeline::TripPipeline;
use crate::record::{TripField, TripRecord};
use crate::scope::settle;
use crate::{Error, Result};
use std::path::PathBuf;
use thirtyfour::prelude::*;
use tracing::{debug, info, warn};

/// Receives operator-facing status text and a 0–100 progress value during a
/// run. This is the operator-console boundary; the engine never talks to a
/// UI directly.
pub trait StatusSink: Send + Sync {
    fn status(&self, text: &str);
    fn progress(&self, percent: f64);
}

/// Default sink that forwards status to the tracing log.
pub struct LogSink;

impl StatusSink for LogSink {
    fn status(&self, text: &str) {
        info!("{text}");
    }

    fn progress(&self, percent: f64) {
        debug!("progress: {percent:.0}%");
    }
}

/// Final tally of one batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub submitted: usize,
    pub total: usize,
    pub ledger_path: PathBuf,
}

/// Runs the trip pipeline over a record sequence with a single browser
/// session.
pub struct Orchestrator {
    config: Config,
    registry: LocatorRegistry,
}

impl Orchestrator {
    pub fn new(config: Config, registry: LocatorRegistry) -> Self {
        Self { config, registry }
    }

    /// Run the whole batch. The browser session is owned here for the
    /// duration of the run and closed regardless of outcome.
    pub async fn run(&self, records: &[TripRecord], sink: &dyn StatusSink) -> Result<BatchSummary> {
        if records.is_empty() {
            return Err(Error::Data("input file contains no trip records".into()));
        }

        sink.status("opening browser session");
        let caps = DesiredCapabilities::chrome();
        let driver = WebDriver::new(&self.config.webdriver.url, caps).await?;
        if let Err(e) = driver.maximize_window().await {
            debug!("window maximize failed: {e}");
        }

        let result = self.run_batch(&driver, records, sink).await;

        // Guaranteed release of the session whatever happened above.
        if let Err(e) = driver.quit().await {
            warn!("browser shutdown failed: {e}");
        }
        result
    }

    async fn run_batch(
        &self,
        driver: &WebDriver,
        records: &[TripRecord],
        sink: &dyn StatusSink,
    ) -> Result<BatchSummary> {
        driver.goto(&self.config.target.url).await?;
        settle(self.config.timings.page_load_ms).await;

        let ledger = Ledger::new(&self.config.ledger);
        let pipeline = TripPipeline::new(driver, &self.registry, &self.config, &ledger);

        let total = records.len();
        let mut submitted = 0;

        for (index, record) in records.iter().enumerate() {
            sink.status(&format!(
                "processing trip {}/{} (date: {}, driver: {})",
                index + 1,
                total,
                record.get(TripField::Date),
                record.get(TripField::Driver),
            ));
            sink.progress(index as f64 / total as f64 * 100.0);

            if pipeline.run(record, is_last(index, total)).await {
                submitted += 1;
            } else {
                // Give the target page room to settle before the next trip.
                settle(self.config.timings.failure_cooldown_ms).await;
            }

            sink.progress((index + 1) as f64 / total as f64 * 100.0);
        }

        let summary = BatchSummary {
            submitted,
            total,
            ledger_path: PathBuf::from(&self.config.ledger),
        };
        sink.status(&format!(
            "complete: {}/{} trips submitted, ledger at {}",
            summary.submitted,
            summary.total,
            summary.ledger_path.display()
        ));
        Ok(summary)
    }
}

/// Whether the trip at `index` is the batch's final one. The reset-for-next
/// step is skipped exactly when this is true.
fn is_last(index: usize, total: usize) -> bool {
    index + 1 == total
}

/// OS username, used only for operator display and the allow-list check.
pub fn os_username() -> String {
    std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "operator".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_count_is_n_minus_one() {
        for total in 1..=5 {
            let resets = (0..total).filter(|&i| !is_last(i, total)).count();
            assert_eq!(resets, total - 1);
        }
    }

    #[test]
    fn test_single_trip_never_resets() {
        assert!(is_last(0, 1));
    }
}
