//! # triplog
//!
//! Batch uploader for vehicle trip logs. Reads trip records from a CSV file,
//! drives a WebDriver session to fill a remote travel-log form — including
//! searchable "connection" dropdowns whose option sets depend on prior
//! selections — submits each record, and appends one audit row per attempt
//! comparing the input values against what was actually selected on the page.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use triplog::{Config, LocatorRegistry, LogSink, Orchestrator};
//!
//! # #[tokio::main]
//! # async fn main() -> triplog::Result<()> {
//! let config = Config::load("triplog.yaml")?;
//! let records = triplog::load_records("trips.csv")?;
//! let orchestrator = Orchestrator::new(config, LocatorRegistry::knack());
//! let summary = orchestrator.run(&records, &LogSink).await?;
//! println!("Submitted: {}/{}", summary.submitted, summary.total);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod filler;
pub mod ledger;
pub mod locators;
pub mod orchestrator;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod scope;
pub mod submit;

pub use config::{Config, ConfirmPolicy, Timings};
pub use filler::{FillOutcome, FillValue, FormFiller};
pub use ledger::{Ledger, LedgerEntry};
pub use locators::{Locator, LocatorRegistry, Strategy};
pub use orchestrator::{BatchSummary, LogSink, Orchestrator, StatusSink};
pub use record::{load_records, TripField, TripRecord};
pub use resolver::{MatchKind, Selection};
pub use scope::SearchScope;

/// Result type for triplog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading or a batch run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Data(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("webdriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("locator failed: {0}")]
    Locator(String),

    #[error("resolution failed: {0}")]
    Resolution(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("operator '{0}' is not authorized")]
    Unauthorized(String),
}
