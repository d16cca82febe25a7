//! Field locator registry — maps logical fields to locator strategies.
//!
//! The target form exposes no stable IDs; fields are found by label
//! proximity and CSS-class heuristics. Brittle by nature, accepted as a
//! constraint of the target page. The registry is plain data, injected into
//! the engine so tests can substitute their own table.

use crate::record::TripField;
use std::collections::BTreeMap;
use thirtyfour::By;

/// How a selector expression is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Css,
    XPath,
}

/// One locator: a strategy plus a selector expression.
#[derive(Debug, Clone)]
pub struct Locator {
    pub strategy: Strategy,
    pub expr: String,
}

impl Locator {
    pub fn css(expr: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Css,
            expr: expr.into(),
        }
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::XPath,
            expr: expr.into(),
        }
    }

    /// The thirtyfour selector for this locator.
    pub fn by(&self) -> By {
        match self.strategy {
            Strategy::Css => By::Css(&self.expr),
            Strategy::XPath => By::XPath(&self.expr),
        }
    }
}

/// Locator table for the target page: one entry per logical field, plus the
/// operational locators (submit control with fallbacks, success indicator,
/// reset controls). Never mutated at runtime.
#[derive(Debug, Clone)]
pub struct LocatorRegistry {
    fields: BTreeMap<TripField, Locator>,
    /// Submit control candidates, tried in order.
    pub submit: Vec<Locator>,
    /// Success indicator shown after a completed submission.
    pub success: Locator,
    /// Reset/new-entry control candidates, tried in order across scopes.
    pub reset: Vec<Locator>,
}

impl LocatorRegistry {
    /// The locator table for the Knack travel-log form.
    pub fn knack() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            TripField::Department,
            Locator::xpath(
                "//label[contains(., 'Department')]/ancestor::div[contains(@class,'kn-input-connection')][1]",
            ),
        );
        fields.insert(
            TripField::Plate,
            Locator::xpath(
                "//label[contains(., 'Plate') or contains(., 'Vehicle Plate') or contains(., 'Vehicle Plate - Make - Model') or contains(., 'Vehicle')]/ancestor::div[contains(@class,'kn-input-connection')][1]",
            ),
        );
        fields.insert(
            TripField::Date,
            Locator::xpath("//label[contains(., 'Date')]/following::input[1]"),
        );
        fields.insert(
            TripField::StartTime,
            Locator::xpath("//label[contains(., 'Start Time')]/following::input[1]"),
        );
        fields.insert(
            TripField::StartOdometer,
            Locator::xpath("//label[contains(., 'Odometer Start')]/following::input[1]"),
        );
        fields.insert(
            TripField::EndTime,
            Locator::xpath("//label[contains(., 'End Time')]/following::input[1]"),
        );
        fields.insert(
            TripField::EndOdometer,
            Locator::xpath("//label[contains(., 'Odometer End')]/following::input[1]"),
        );
        fields.insert(
            TripField::Destination,
            Locator::xpath("//label[contains(., 'Destination')]/following::input[1]"),
        );
        fields.insert(
            TripField::Driver,
            Locator::xpath(
                "//label[contains(., 'Driver')]/ancestor::div[contains(@class,'kn-input-connection')][1]",
            ),
        );

        Self {
            fields,
            submit: vec![
                Locator::css("button.kn-button.is-primary"),
                Locator::xpath("//button[contains(., 'Submit')]"),
                Locator::xpath("//span[contains(., 'Submit')]/ancestor::button[1]"),
            ],
            success: Locator::css(".kn-message.success"),
            reset: vec![
                Locator::xpath(
                    "//button[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'reload')]",
                ),
                Locator::xpath(
                    "//a[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'reload')]",
                ),
                Locator::xpath(
                    "//button[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'new entry')]",
                ),
                Locator::xpath(
                    "//button[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'submit another')]",
                ),
            ],
        }
    }

    /// Locator for a logical field. Deterministic; every field has exactly
    /// one entry (a missing entry is a configuration bug, hence the panic).
    pub fn field(&self, field: TripField) -> &Locator {
        self.fields
            .get(&field)
            .unwrap_or_else(|| panic!("no locator registered for field {field}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_registered() {
        let registry = LocatorRegistry::knack();
        for field in TripField::ALL {
            let locator = registry.field(field);
            assert!(!locator.expr.is_empty());
        }
    }

    #[test]
    fn test_connection_fields_use_container_xpath() {
        let registry = LocatorRegistry::knack();
        for field in TripField::ALL.iter().filter(|f| f.is_connection()) {
            let locator = registry.field(*field);
            assert_eq!(locator.strategy, Strategy::XPath);
            assert!(locator.expr.contains("kn-input-connection"));
        }
    }

    #[test]
    fn test_operational_locators() {
        let registry = LocatorRegistry::knack();
        assert_eq!(registry.submit.len(), 3);
        assert_eq!(registry.submit[0].strategy, Strategy::Css);
        assert_eq!(registry.success.strategy, Strategy::Css);
        assert!(!registry.reset.is_empty());
    }
}
