//! Connection-field resolver.
//!
//! A connection field is a searchable dropdown whose valid options are
//! fetched from the server based on a related field's prior selection (e.g.
//! eligible drivers depend on the chosen department). Resolving one means
//! opening the widget, typing the requested value, and picking the best
//! match from the filtered option list — always scoped to this field's own
//! container, never a page-global search input, so two connection fields on
//! the same page cannot contaminate each other.

use crate::config::Timings;
use crate::record::TripField;
use crate::scope::{robust_click, scripted_set_value, scroll_into_view, settle};
use crate::{Error, Result};
use thirtyfour::prelude::*;
use thirtyfour::Key;
use tracing::{debug, info, warn};

/// How the chosen option related to the requested text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Case-insensitive exact match on the option text.
    Exact,
    /// First case-insensitive substring match; no exact match existed.
    Partial,
    /// Neither exact nor partial matched; the first option was taken so the
    /// batch keeps moving. Audit the ledger row.
    FirstAvailable,
    /// Keyboard-only fallback path: the widget never showed an option list,
    /// so the actually-selected text could not be observed and the requested
    /// text is reported as an assumption. The ledger row may be wrong.
    KeyboardAssumed,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Partial => "partial",
            MatchKind::FirstAvailable => "first-available",
            MatchKind::KeyboardAssumed => "keyboard-assumed",
        }
    }
}

/// The option actually chosen in the dropdown, as distinct from the text
/// requested.
#[derive(Debug, Clone)]
pub struct Selection {
    pub text: String,
    pub kind: MatchKind,
}

/// Pick the option to select for a requested value.
///
/// Priority: exact match wins immediately; otherwise the first substring
/// match seen while scanning; otherwise the first option. Exact-match
/// priority keeps "Ford F-150" from landing on "Ford F-150 (Spare)".
/// Returns `None` only when there are no options at all.
pub fn pick_option(requested: &str, options: &[String]) -> Option<(usize, MatchKind)> {
    let wanted = requested.trim().to_lowercase();
    let mut partial = None;
    for (index, text) in options.iter().enumerate() {
        let candidate = text.trim().to_lowercase();
        if candidate == wanted {
            return Some((index, MatchKind::Exact));
        }
        if partial.is_none() && candidate.contains(&wanted) {
            partial = Some(index);
        }
    }
    if let Some(index) = partial {
        return Some((index, MatchKind::Partial));
    }
    if options.is_empty() {
        None
    } else {
        Some((0, MatchKind::FirstAvailable))
    }
}

fn key(k: Key) -> String {
    char::from(k).to_string()
}

/// Resolves connection fields against the live page.
pub struct ConnectionResolver<'a> {
    driver: &'a WebDriver,
    timings: &'a Timings,
}

impl<'a> ConnectionResolver<'a> {
    pub fn new(driver: &'a WebDriver, timings: &'a Timings) -> Self {
        Self { driver, timings }
    }

    /// Resolve one connection field to an actual on-page selection.
    ///
    /// Returns the displayed text of the chosen option, or an error when no
    /// viable option path succeeded (no search input, or a visible option
    /// list with nothing in it).
    pub async fn resolve(
        &self,
        container: &WebElement,
        requested: &str,
        field: TripField,
    ) -> Result<Selection> {
        let requested = requested.trim();
        debug!("resolving {field}: '{requested}'");

        self.activate(container).await;
        let input = self.search_input(container, field).await?;
        self.clear_input(&input).await;

        input.send_keys(requested).await?;
        settle(self.timings.filter_settle_ms).await;

        match self.visible_options(container).await? {
            Some((items, texts)) => {
                if texts.is_empty() {
                    return Err(Error::Resolution(format!(
                        "no options offered for '{requested}' in {field}"
                    )));
                }
                let (index, kind) = pick_option(requested, &texts).ok_or_else(|| {
                    Error::Resolution(format!("no selectable option for '{requested}' in {field}"))
                })?;
                let item = &items[index];
                self.driver
                    .execute(
                        "arguments[0].scrollIntoView({block: 'nearest'});",
                        vec![item.to_json()?],
                    )
                    .await?;
                settle(self.timings.scroll_settle_ms).await;
                robust_click(self.driver, item).await?;
                settle(self.timings.option_click_settle_ms).await;

                info!(
                    "{field}: selected '{}' ({} match for '{requested}')",
                    texts[index],
                    kind.as_str()
                );
                Ok(Selection {
                    text: texts[index].clone(),
                    kind,
                })
            }
            None => {
                // No option list rendered at all; drive the widget blind.
                // The selected text cannot be observed on this path.
                warn!("{field}: no visible option list, falling back to keyboard navigation");
                input.send_keys(key(Key::Down)).await?;
                settle(self.timings.keyboard_nav_ms).await;
                input.send_keys(key(Key::Enter)).await?;
                settle(self.timings.option_click_settle_ms).await;
                Ok(Selection {
                    text: requested.to_string(),
                    kind: MatchKind::KeyboardAssumed,
                })
            }
        }
    }

    /// Scroll the container into view and activate it. Best-effort: a
    /// failed activation is not fatal, the search-input lookup decides.
    async fn activate(&self, container: &WebElement) {
        if let Err(e) = scroll_into_view(self.driver, container).await {
            debug!("scroll into view failed: {e}");
        }
        settle(self.timings.scroll_settle_ms).await;
        if let Err(e) = robust_click(self.driver, container).await {
            debug!("container activation failed: {e}");
        }
        settle(self.timings.scroll_settle_ms).await;
    }

    /// Open the dropdown and return the search input belonging to this
    /// field's container only.
    async fn search_input(&self, container: &WebElement, field: TripField) -> Result<WebElement> {
        // Plain inputs are used directly.
        if let Ok(tag) = container.tag_name().await {
            if tag.eq_ignore_ascii_case("input") {
                return Ok(container.clone());
            }
        }

        // Open the dropdown toggle. Tolerate its absence: the dropdown may
        // already be open.
        match container.find(By::Css("a.chzn-single")).await {
            Ok(toggle) => {
                if let Err(e) = robust_click(self.driver, &toggle).await {
                    debug!("{field}: toggle click failed: {e}");
                }
                settle(self.timings.dropdown_open_ms).await;
            }
            Err(_) => debug!("{field}: no dropdown toggle found, container may already be open"),
        }

        if let Ok(input) = container.find(By::Css("div.chzn-search input")).await {
            return Ok(input);
        }
        if let Ok(input) = container.find(By::XPath(".//input")).await {
            return Ok(input);
        }
        Err(Error::Resolution(format!(
            "no search input inside the {field} container"
        )))
    }

    /// Clear any existing text with three layered strategies; the widget
    /// library is inconsistent about which one takes.
    async fn clear_input(&self, input: &WebElement) {
        let select_all = format!("{}a", char::from(Key::Control));
        if input.click().await.is_ok() {
            let _ = input.send_keys(select_all).await;
            let _ = input.send_keys(key(Key::Delete)).await;
        }
        let _ = input.clear().await;
        let _ = scripted_set_value(self.driver, input, "").await;
    }

    /// The filtered options of the first *visible* results list inside the
    /// container. `None` when no list is visible at all (distinct from a
    /// visible but empty list).
    async fn visible_options(
        &self,
        container: &WebElement,
    ) -> Result<Option<(Vec<WebElement>, Vec<String>)>> {
        let lists = container.find_all(By::Css("ul.chzn-results")).await?;
        for list in lists {
            if !list.is_displayed().await.unwrap_or(false) {
                continue;
            }
            let items = list.find_all(By::Css("li.active-result")).await?;
            let mut texts = Vec::with_capacity(items.len());
            for item in &items {
                texts.push(item.text().await?.trim().to_string());
            }
            debug!("{} option(s) offered", texts.len());
            return Ok(Some((items, texts)));
        }
        Ok(None)
    }
}
