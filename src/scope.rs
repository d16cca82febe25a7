//! Search scopes and low-level element helpers.
//!
//! A lookup is always constrained to an explicit [`SearchScope`] — the main
//! page or one embedded frame — rather than whatever frame the session
//! happens to be focused on. Components that need an element "anywhere"
//! iterate scopes explicitly, so no component depends on ambient frame state
//! left behind by another.

use crate::{Error, Result};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thirtyfour::prelude::*;

/// The subtree of the page an element lookup is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    MainPage,
    /// The nth `<iframe>` of the main page, in document order.
    Frame(usize),
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchScope::MainPage => write!(f, "main page"),
            SearchScope::Frame(i) => write!(f, "iframe {i}"),
        }
    }
}

/// Switch the session to the given scope. Frames are re-enumerated on every
/// switch so stale handles from a previous page state are never reused.
pub async fn enter(driver: &WebDriver, scope: SearchScope) -> Result<()> {
    driver.enter_default_frame().await?;
    if let SearchScope::Frame(index) = scope {
        let frames = driver.find_all(By::Tag("iframe")).await?;
        let frame = frames
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::Locator(format!("iframe {index} no longer present")))?;
        frame.enter_frame().await?;
    }
    Ok(())
}

/// Number of iframes in the main page. Switches the session to the main
/// page as a side effect.
pub async fn frame_count(driver: &WebDriver) -> Result<usize> {
    driver.enter_default_frame().await?;
    Ok(driver.find_all(By::Tag("iframe")).await?.len())
}

/// Bounded polling wait for an element in the current scope.
pub async fn wait_for(
    driver: &WebDriver,
    by: By,
    timeout: Duration,
    poll: Duration,
) -> Result<WebElement> {
    driver
        .query(by.clone())
        .wait(timeout, poll)
        .first()
        .await
        .map_err(|_| Error::Locator(format!("no element for {by:?} within {timeout:?}")))
}

/// Like [`wait_for`], but tries the main page first and then every iframe in
/// turn. Returns the element together with the scope that held it, leaving
/// the session switched to that scope. `Ok(None)` means not found anywhere;
/// the session is back on the main page.
pub async fn find_across_scopes(
    driver: &WebDriver,
    by: By,
    main_timeout: Duration,
    frame_timeout: Duration,
    poll: Duration,
) -> Result<Option<(WebElement, SearchScope)>> {
    enter(driver, SearchScope::MainPage).await?;
    if let Ok(element) = wait_for(driver, by.clone(), main_timeout, poll).await {
        return Ok(Some((element, SearchScope::MainPage)));
    }

    let frames = frame_count(driver).await?;
    for index in 0..frames {
        if enter(driver, SearchScope::Frame(index)).await.is_err() {
            continue;
        }
        if let Ok(element) = wait_for(driver, by.clone(), frame_timeout, poll).await {
            return Ok(Some((element, SearchScope::Frame(index))));
        }
    }

    enter(driver, SearchScope::MainPage).await?;
    Ok(None)
}

/// Native click, falling back to a scripted click when the native one fails
/// or is intercepted by an overlay.
pub async fn robust_click(driver: &WebDriver, element: &WebElement) -> Result<()> {
    if element.click().await.is_ok() {
        return Ok(());
    }
    driver
        .execute("arguments[0].click();", vec![element.to_json()?])
        .await?;
    Ok(())
}

/// Scroll an element to the vertical center of the viewport.
pub async fn scroll_into_view(driver: &WebDriver, element: &WebElement) -> Result<()> {
    driver
        .execute(
            "arguments[0].scrollIntoView({block: 'center'});",
            vec![element.to_json()?],
        )
        .await?;
    Ok(())
}

/// Assign a value directly, for widgets that reject native key input.
pub async fn scripted_set_value(
    driver: &WebDriver,
    element: &WebElement,
    value: &str,
) -> Result<()> {
    driver
        .execute(
            "arguments[0].value = arguments[1];",
            vec![element.to_json()?, json!(value)],
        )
        .await?;
    Ok(())
}

/// Fixed settling period after a UI-mutating action; the target page's own
/// rendering is not observable, so a bounded pause is the only option.
pub async fn settle(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
