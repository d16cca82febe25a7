//! Trip pipeline — runs one trip through locate → fill → submit → confirm →
//! reset, with full fault containment.
//!
//! State machine: START → FORM_LOCATED → FILLED → SUBMITTED → {CONFIRMED,
//! FAILED} → RESET_FOR_NEXT (unless the trip is the batch's last) → DONE.
//! Every terminal transition appends exactly one ledger row; no fault
//! escapes to the caller — the batch orchestrator only ever sees a boolean.

use crate::config::{Config, ConfirmPolicy};
use crate::filler::{FillOutcome, FormFiller};
use crate::ledger::{Ledger, LedgerEntry};
use crate::locators::LocatorRegistry;
use crate::record::{TripField, TripRecord};
use crate::scope::{self, settle, SearchScope};
use crate::submit::SubmitController;
use std::time::Duration;
use thirtyfour::prelude::*;
use tracing::{debug, error, info, warn};

/// Runs single trips to a terminal state.
pub struct TripPipeline<'a> {
    driver: &'a WebDriver,
    registry: &'a LocatorRegistry,
    config: &'a Config,
    ledger: &'a Ledger,
}

impl<'a> TripPipeline<'a> {
    pub fn new(
        driver: &'a WebDriver,
        registry: &'a LocatorRegistry,
        config: &'a Config,
        ledger: &'a Ledger,
    ) -> Self {
        Self {
            driver,
            registry,
            config,
            ledger,
        }
    }

    /// Run one trip to completion. Returns whether the trip was submitted.
    ///
    /// One ledger row is appended on every path, and failures are absorbed:
    /// after a fault the browser is returned to the entry page so the next
    /// trip starts from a known state.
    pub async fn run(&self, record: &TripRecord, is_last: bool) -> bool {
        let (success, error_message, outcome) = match self.attempt(record, is_last).await {
            Ok(outcome) => (true, String::new(), outcome),
            Err((message, partial)) => {
                error!("trip failed: {message}");
                self.recover().await;
                (false, message, partial)
            }
        };

        let entry = LedgerEntry::new(record, &outcome, success, &error_message);
        if let Err(e) = self.ledger.append(&entry) {
            warn!("ledger append failed: {e}");
        }
        success
    }

    /// The attempt body. Errors carry the fault message plus whatever fill
    /// outcome existed at the time, so the ledger row is never empty-handed.
    async fn attempt(
        &self,
        record: &TripRecord,
        is_last: bool,
    ) -> std::result::Result<FillOutcome, (String, FillOutcome)> {
        // START → FORM_LOCATED
        if !self.locate_form().await {
            return Err(("could not locate form fields".into(), FillOutcome::default()));
        }

        // FORM_LOCATED → FILLED
        info!("filling form fields");
        let filler = FormFiller::new(self.driver, self.registry, &self.config.timings);
        let outcome = filler.fill(record).await.map_err(|abort| {
            (
                format!("fill aborted at {}: {}", abort.field, abort.reason),
                abort.partial,
            )
        })?;

        // Deliberate operator-visible pause before submission.
        info!("form filled, pausing for visual verification");
        settle(self.config.timings.visual_verify_ms).await;

        // FILLED → SUBMITTED
        info!("submitting form");
        let submitter = SubmitController::new(self.driver, self.registry, &self.config.timings);
        let confirmation = submitter
            .submit()
            .await
            .map_err(|e| (e.to_string(), outcome.clone()))?;

        // SUBMITTED → CONFIRMED / FAILED
        if self.config.confirm == ConfirmPolicy::RequireIndicator && !confirmation.indicator_seen {
            return Err((
                "success indicator not found after submit".into(),
                outcome,
            ));
        }
        info!("trip submitted");

        // CONFIRMED → RESET_FOR_NEXT, skipped for the batch's final trip.
        if !is_last {
            settle(self.config.timings.submit_settle_ms).await;
            self.reset_for_next().await;
        }

        Ok(outcome)
    }

    /// START → FORM_LOCATED: the form's signature field (plate) must be
    /// present in the main page or some embedded frame.
    async fn locate_form(&self) -> bool {
        let by = self.registry.field(TripField::Plate).by();
        let main_timeout = Duration::from_millis(self.config.timings.connection_field_timeout_ms);
        let frame_timeout = Duration::from_millis(self.config.timings.simple_field_timeout_ms);
        let poll = Duration::from_millis(self.config.timings.poll_interval_ms);

        match scope::find_across_scopes(self.driver, by, main_timeout, frame_timeout, poll).await {
            Ok(Some((_, found_scope))) => {
                debug!("form located in {found_scope}");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("form location failed: {e}");
                false
            }
        }
    }

    /// Return the browser to the known entry page after a fault.
    async fn recover(&self) {
        if let Err(e) = scope::enter(self.driver, SearchScope::MainPage).await {
            debug!("recovery frame switch failed: {e}");
        }
        if let Err(e) = self.driver.goto(&self.config.target.url).await {
            warn!("recovery navigation failed: {e}");
        }
        settle(self.config.timings.page_load_ms).await;
    }

    /// Prepare the page for the next entry: click an in-page reload /
    /// new-entry control if one exists in any scope, otherwise navigate to
    /// the entry URL.
    async fn reset_for_next(&self) {
        if self.click_reset_control().await {
            settle(self.config.timings.reset_settle_ms).await;
            info!("form reloaded for next entry");
            return;
        }

        info!("no reload control found, navigating to entry page");
        if let Err(e) = scope::enter(self.driver, SearchScope::MainPage).await {
            debug!("frame switch before navigation failed: {e}");
        }
        if let Err(e) = self.driver.goto(&self.config.target.url).await {
            warn!("navigation to entry page failed: {e}");
        }
        settle(self.config.timings.page_load_ms).await;
    }

    /// Find and click a displayed reload/new-entry control in the main page
    /// or any iframe. Returns whether one was clicked.
    async fn click_reset_control(&self) -> bool {
        if scope::enter(self.driver, SearchScope::MainPage).await.is_err() {
            return false;
        }
        if self.click_reset_here().await {
            return true;
        }

        let frames = match scope::frame_count(self.driver).await {
            Ok(n) => n,
            Err(_) => return false,
        };
        for index in 0..frames {
            if scope::enter(self.driver, SearchScope::Frame(index)).await.is_err() {
                continue;
            }
            if self.click_reset_here().await {
                debug!("reload control found in iframe {index}");
                return true;
            }
        }
        false
    }

    async fn click_reset_here(&self) -> bool {
        for locator in &self.registry.reset {
            let candidates = match self.driver.find_all(locator.by()).await {
                Ok(elements) => elements,
                Err(_) => continue,
            };
            for candidate in candidates {
                if !candidate.is_displayed().await.unwrap_or(false) {
                    continue;
                }
                let text = candidate.text().await.unwrap_or_default().to_lowercase();
                if !(text.contains("reload") || text.contains("new") || text.contains("another")) {
                    continue;
                }
                if scope::scroll_into_view(self.driver, &candidate).await.is_err() {
                    continue;
                }
                settle(self.config.timings.scroll_settle_ms).await;
                if scope::robust_click(self.driver, &candidate).await.is_ok() {
                    return true;
                }
            }
        }
        false
    }
}
