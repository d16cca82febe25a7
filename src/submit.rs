//! Submission controller — triggers form submission and checks for the
//! success indicator.

use crate::config::Timings;
use crate::locators::LocatorRegistry;
use crate::scope::{self, robust_click, settle, wait_for, SearchScope};
use crate::{Error, Result};
use std::time::Duration;
use thirtyfour::prelude::*;
use tracing::{debug, info, warn};

/// What the controller observed after triggering the submit control.
///
/// A missing indicator is a soft signal: the trigger itself worked, but
/// whether the entry landed is uncertain. The pipeline decides what to make
/// of it per [`crate::ConfirmPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct Confirmation {
    pub indicator_seen: bool,
}

/// Locates and triggers the submit control, then probes for the success
/// indicator.
pub struct SubmitController<'a> {
    driver: &'a WebDriver,
    registry: &'a LocatorRegistry,
    timings: &'a Timings,
}

impl<'a> SubmitController<'a> {
    pub fn new(driver: &'a WebDriver, registry: &'a LocatorRegistry, timings: &'a Timings) -> Self {
        Self {
            driver,
            registry,
            timings,
        }
    }

    /// Trigger submission and report what was observed. Errors only when no
    /// submit control exists anywhere — that is unrecoverable for this trip.
    pub async fn submit(&self) -> Result<Confirmation> {
        let button = self
            .find_submit()
            .await?
            .ok_or_else(|| Error::Submission("no submit control found in any scope".into()))?;

        robust_click(self.driver, &button).await?;
        settle(self.timings.submit_settle_ms).await;

        let indicator_seen = self.confirm().await?;
        if indicator_seen {
            info!("success indicator present after submit");
        } else {
            warn!("success indicator not found after submit");
        }
        Ok(Confirmation { indicator_seen })
    }

    /// Try each submit locator in the current scope, then repeat the probe
    /// inside every iframe. Leaves the session in the scope that matched;
    /// on a miss the session is restored to the main page.
    async fn find_submit(&self) -> Result<Option<WebElement>> {
        // Current scope first: the fill stage may already have the session
        // focused inside the form's frame.
        if let Some(button) = self.find_submit_here().await {
            return Ok(Some(button));
        }

        let frames = scope::frame_count(self.driver).await?;
        for index in 0..frames {
            if scope::enter(self.driver, SearchScope::Frame(index)).await.is_err() {
                continue;
            }
            if let Some(button) = self.find_submit_here().await {
                debug!("submit control found in iframe {index}");
                return Ok(Some(button));
            }
        }

        scope::enter(self.driver, SearchScope::MainPage).await?;
        Ok(None)
    }

    async fn find_submit_here(&self) -> Option<WebElement> {
        let timeout = Duration::from_millis(self.timings.submit_probe_timeout_ms);
        let poll = Duration::from_millis(self.timings.poll_interval_ms);
        for locator in &self.registry.submit {
            if let Ok(button) = wait_for(self.driver, locator.by(), timeout, poll).await {
                return Some(button);
            }
        }
        None
    }

    /// Probe for the success indicator in the current scope, then in every
    /// iframe. On a miss the session is restored to the main page.
    async fn confirm(&self) -> Result<bool> {
        let timeout = Duration::from_millis(self.timings.confirm_probe_timeout_ms);
        let poll = Duration::from_millis(self.timings.poll_interval_ms);
        let by = || self.registry.success.by();

        if wait_for(self.driver, by(), timeout, poll).await.is_ok() {
            return Ok(true);
        }

        let frames = scope::frame_count(self.driver).await?;
        for index in 0..frames {
            if scope::enter(self.driver, SearchScope::Frame(index)).await.is_err() {
                continue;
            }
            if wait_for(self.driver, by(), timeout, poll).await.is_ok() {
                return Ok(true);
            }
        }

        scope::enter(self.driver, SearchScope::MainPage).await?;
        Ok(false)
    }
}
