//! Form filler — populates every field of one trip record and produces the
//! fill outcome used for audit comparison.

use crate::config::Timings;
use crate::locators::LocatorRegistry;
use crate::record::{TripField, TripRecord};
use crate::resolver::{ConnectionResolver, MatchKind};
use crate::scope::{scripted_set_value, settle, wait_for};
use std::collections::BTreeMap;
use std::time::Duration;
use thirtyfour::prelude::*;
use tracing::{debug, info, warn};

/// The fill result for one logical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillValue {
    /// Literal value written into a plain input.
    Written(String),
    /// Connection field: what was asked for vs. what was actually selected.
    Selected {
        requested: String,
        actual: String,
        kind: MatchKind,
    },
    /// Input value was empty; the field was left untouched.
    Skipped,
    /// The field could not be filled; carries the original input and why.
    Failed { input: String, reason: String },
}

/// Map from every logical field to its fill result. On a completed fill the
/// map has exactly one entry per field; on an abort it covers the fields
/// attempted so far, with the failing one marked [`FillValue::Failed`].
#[derive(Debug, Clone, Default)]
pub struct FillOutcome {
    values: BTreeMap<TripField, FillValue>,
}

impl FillOutcome {
    pub fn get(&self, field: TripField) -> Option<&FillValue> {
        self.values.get(&field)
    }

    pub fn insert(&mut self, field: TripField, value: FillValue) {
        self.values.insert(field, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every logical field has an entry.
    pub fn is_complete(&self) -> bool {
        TripField::ALL.iter().all(|f| self.values.contains_key(f))
    }

    /// The ledger's "actual" text for a field, given its input value.
    /// Fields the fill never reached default to the input.
    pub fn actual_for(&self, field: TripField, input: &str) -> String {
        match self.values.get(&field) {
            Some(FillValue::Written(value)) => value.clone(),
            Some(FillValue::Selected { actual, .. }) => actual.clone(),
            Some(FillValue::Skipped) => "N/A (skipped)".to_string(),
            Some(FillValue::Failed { input, .. }) => {
                format!("FAILED: used input '{input}'")
            }
            None => input.to_string(),
        }
    }
}

/// A fill that aborted partway. A partially filled form must never be
/// submitted, so the caller treats this as trip failure; the partial
/// outcome still feeds the ledger.
#[derive(Debug)]
pub struct FillAbort {
    pub field: TripField,
    pub reason: String,
    pub partial: FillOutcome,
}

/// Fills one trip record into the live form.
pub struct FormFiller<'a> {
    driver: &'a WebDriver,
    registry: &'a LocatorRegistry,
    timings: &'a Timings,
}

impl<'a> FormFiller<'a> {
    pub fn new(driver: &'a WebDriver, registry: &'a LocatorRegistry, timings: &'a Timings) -> Self {
        Self {
            driver,
            registry,
            timings,
        }
    }

    /// Fill every field of the record, in the fixed field order. Empty
    /// values are skipped, not failed. Any locate timeout or resolution
    /// failure aborts the whole fill.
    pub async fn fill(&self, record: &TripRecord) -> std::result::Result<FillOutcome, FillAbort> {
        let resolver = ConnectionResolver::new(self.driver, self.timings);
        let poll = Duration::from_millis(self.timings.poll_interval_ms);
        let mut outcome = FillOutcome::default();
        let mut department_filled = false;

        for field in TripField::ALL {
            let value = record.get(field).trim().to_string();
            if value.is_empty() {
                debug!("{field}: no value provided, skipping");
                outcome.insert(field, FillValue::Skipped);
                continue;
            }

            // The eligible-driver list populates asynchronously after the
            // department selection event.
            if field == TripField::Driver && department_filled {
                info!("waiting for driver options to populate after department selection");
                settle(self.timings.driver_populate_ms).await;
            }

            let timeout = Duration::from_millis(if field.is_connection() {
                self.timings.connection_field_timeout_ms
            } else {
                self.timings.simple_field_timeout_ms
            });

            let element = match wait_for(self.driver, self.registry.field(field).by(), timeout, poll)
                .await
            {
                Ok(element) => element,
                Err(e) => {
                    let reason = format!("could not locate {field} on the page: {e}");
                    warn!("{reason}");
                    outcome.insert(
                        field,
                        FillValue::Failed {
                            input: value,
                            reason: reason.clone(),
                        },
                    );
                    return Err(FillAbort {
                        field,
                        reason,
                        partial: outcome,
                    });
                }
            };

            if field.is_connection() {
                match resolver.resolve(&element, &value, field).await {
                    Ok(selection) => {
                        outcome.insert(
                            field,
                            FillValue::Selected {
                                requested: value,
                                actual: selection.text,
                                kind: selection.kind,
                            },
                        );
                        if field == TripField::Department {
                            department_filled = true;
                            settle(self.timings.department_cascade_ms).await;
                        }
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        warn!("{field}: {reason}");
                        outcome.insert(
                            field,
                            FillValue::Failed {
                                input: value,
                                reason: reason.clone(),
                            },
                        );
                        return Err(FillAbort {
                            field,
                            reason,
                            partial: outcome,
                        });
                    }
                }
            } else {
                if let Err(e) = self.write_simple(&element, &value).await {
                    let reason = format!("could not write {field}: {e}");
                    warn!("{reason}");
                    outcome.insert(
                        field,
                        FillValue::Failed {
                            input: value,
                            reason: reason.clone(),
                        },
                    );
                    return Err(FillAbort {
                        field,
                        reason,
                        partial: outcome,
                    });
                }
                debug!("{field}: wrote '{value}'");
                outcome.insert(field, FillValue::Written(value));
            }
        }

        Ok(outcome)
    }

    /// Native clear-and-type, falling back to a scripted value assignment
    /// when the widget rejects direct input.
    async fn write_simple(&self, element: &WebElement, value: &str) -> crate::Result<()> {
        let native = async {
            element.clear().await?;
            element.send_keys(value).await
        };
        if native.await.is_ok() {
            return Ok(());
        }
        scripted_set_value(self.driver, element, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_completeness() {
        let mut outcome = FillOutcome::default();
        assert!(!outcome.is_complete());
        for field in TripField::ALL {
            outcome.insert(field, FillValue::Skipped);
        }
        assert!(outcome.is_complete());
        assert_eq!(outcome.len(), TripField::ALL.len());
    }

    #[test]
    fn test_actual_for_selected() {
        let mut outcome = FillOutcome::default();
        outcome.insert(
            TripField::Plate,
            FillValue::Selected {
                requested: "F-150".into(),
                actual: "Ford F-150".into(),
                kind: MatchKind::Partial,
            },
        );
        assert_eq!(outcome.actual_for(TripField::Plate, "F-150"), "Ford F-150");
    }

    #[test]
    fn test_actual_for_unreached_field_defaults_to_input() {
        let outcome = FillOutcome::default();
        assert_eq!(outcome.actual_for(TripField::Driver, "Jane Roe"), "Jane Roe");
    }

    #[test]
    fn test_actual_for_failed_field_carries_input() {
        let mut outcome = FillOutcome::default();
        outcome.insert(
            TripField::Driver,
            FillValue::Failed {
                input: "Jane Roe".into(),
                reason: "no options".into(),
            },
        );
        let actual = outcome.actual_for(TripField::Driver, "Jane Roe");
        assert!(actual.contains("FAILED"));
        assert!(actual.contains("Jane Roe"));
    }

    #[test]
    fn test_actual_for_skipped() {
        let mut outcome = FillOutcome::default();
        outcome.insert(TripField::Destination, FillValue::Skipped);
        assert!(outcome
            .actual_for(TripField::Destination, "")
            .contains("skipped"));
    }
}
