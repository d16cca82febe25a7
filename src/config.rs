//! Engine configuration — target URL, timing knobs, confirmation policy.
//!
//! Everything the engine treats as tunable lives here and is injected at
//! startup; nothing in the engine reads global state.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level engine config.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Target form entry page.
    pub target: TargetUrl,

    /// WebDriver endpoint to attach to.
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Path of the append-only submission ledger.
    #[serde(default = "default_ledger_path")]
    pub ledger: String,

    /// What to do when the success indicator is absent after submit.
    #[serde(default)]
    pub confirm: ConfirmPolicy,

    /// Operator allow-list. Empty means no gate.
    #[serde(default)]
    pub operators: Vec<String>,

    /// Timeouts and settling periods.
    #[serde(default)]
    pub timings: Timings,
}

impl Config {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse config from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Whether the named operator may start a batch. An empty allow-list
    /// disables the gate entirely.
    pub fn is_authorized(&self, user: &str) -> bool {
        self.operators.is_empty() || self.operators.iter().any(|u| u == user)
    }

    fn validate(&self) -> Result<()> {
        if self.target.url.is_empty() {
            return Err(Error::Config("target.url is required".into()));
        }
        if self.webdriver.url.is_empty() {
            return Err(Error::Config("webdriver.url must not be empty".into()));
        }
        if self.ledger.is_empty() {
            return Err(Error::Config("ledger path must not be empty".into()));
        }
        if self.timings.poll_interval_ms == 0 {
            return Err(Error::Config("timings.poll_interval_ms must be at least 1".into()));
        }
        Ok(())
    }
}

/// Target URL configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetUrl {
    /// Entry URL of the form page.
    pub url: String,
}

/// WebDriver endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebDriverConfig {
    /// URL of the WebDriver server (e.g. a local chromedriver).
    #[serde(default = "default_webdriver_url")]
    pub url: String,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}

fn default_ledger_path() -> String {
    "submission_log.csv".into()
}

/// Policy for a missing success indicator after submission.
///
/// The target page's success banner is slow and sometimes absent even when
/// the entry went through, so treating absence as failure produces false
/// negatives — but assuming success can produce false positives. Pick per
/// deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPolicy {
    /// Proceed as submitted; log the missing indicator.
    #[default]
    AssumeSuccess,
    /// Fail the trip when the indicator cannot be found.
    RequireIndicator,
}

/// Timeouts and settling periods, all in milliseconds.
///
/// Settling periods exist because the target page renders asynchronously
/// after UI-mutating actions and exposes no observable completion signal.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Bounded wait for a plain input field to appear.
    pub simple_field_timeout_ms: u64,
    /// Bounded wait for a connection field container; these widgets take
    /// longer to become interactive than plain inputs.
    pub connection_field_timeout_ms: u64,
    /// Polling interval for all bounded waits.
    pub poll_interval_ms: u64,
    /// After scrolling a container into view.
    pub scroll_settle_ms: u64,
    /// After clicking a dropdown toggle, before querying its search input.
    pub dropdown_open_ms: u64,
    /// After typing a query, before reading the filtered option list.
    pub filter_settle_ms: u64,
    /// After clicking an option.
    pub option_click_settle_ms: u64,
    /// Between keystrokes in the keyboard-navigation fallback.
    pub keyboard_nav_ms: u64,
    /// After selecting a department, before touching dependent fields.
    pub department_cascade_ms: u64,
    /// Extra wait before the driver field when the department was just set;
    /// the eligible-driver list populates asynchronously.
    pub driver_populate_ms: u64,
    /// Operator-visible pause between fill and submit.
    pub visual_verify_ms: u64,
    /// After triggering the submit control.
    pub submit_settle_ms: u64,
    /// Per-locator wait when probing for the submit control.
    pub submit_probe_timeout_ms: u64,
    /// Per-scope wait when probing for the success indicator.
    pub confirm_probe_timeout_ms: u64,
    /// After clicking a reload/new-entry control.
    pub reset_settle_ms: u64,
    /// After a full page navigation.
    pub page_load_ms: u64,
    /// Pause before the next trip after a failed one.
    pub failure_cooldown_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            simple_field_timeout_ms: 3000,
            connection_field_timeout_ms: 10_000,
            poll_interval_ms: 250,
            scroll_settle_ms: 200,
            dropdown_open_ms: 200,
            filter_settle_ms: 1200,
            option_click_settle_ms: 700,
            keyboard_nav_ms: 300,
            department_cascade_ms: 1500,
            driver_populate_ms: 3000,
            visual_verify_ms: 3000,
            submit_settle_ms: 1000,
            submit_probe_timeout_ms: 5000,
            confirm_probe_timeout_ms: 3000,
            reset_settle_ms: 2000,
            page_load_ms: 3000,
            failure_cooldown_ms: 2000,
        }
    }
}
