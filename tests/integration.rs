//! Integration tests for triplog.
//!
//! These tests require a running WebDriver endpoint (e.g. chromedriver) on
//! localhost:9515. Run with: cargo test --test integration -- --ignored

use thirtyfour::prelude::*;
use triplog::config::{Config, ConfirmPolicy, TargetUrl, Timings, WebDriverConfig};
use triplog::record::{TripField, TripRecord};
use triplog::resolver::{ConnectionResolver, MatchKind};
use triplog::submit::SubmitController;
use triplog::{LocatorRegistry, LogSink, Orchestrator, SearchScope};

const WEBDRIVER_URL: &str = "http://localhost:9515";

async fn connect() -> Option<WebDriver> {
    let caps = DesiredCapabilities::chrome();
    match WebDriver::new(WEBDRIVER_URL, caps).await {
        Ok(driver) => Some(driver),
        Err(_) => {
            eprintln!("WebDriver endpoint not available, skipping test");
            None
        }
    }
}

fn fast_timings() -> Timings {
    Timings {
        filter_settle_ms: 100,
        dropdown_open_ms: 50,
        option_click_settle_ms: 50,
        scroll_settle_ms: 20,
        submit_settle_ms: 100,
        submit_probe_timeout_ms: 2000,
        confirm_probe_timeout_ms: 2000,
        ..Timings::default()
    }
}

#[tokio::test]
#[ignore = "requires a WebDriver endpoint"]
async fn test_resolver_selects_exact_match_on_live_page() {
    let Some(driver) = connect().await else { return };

    driver
        .goto(
            r##"data:text/html,
        <div class="kn-input-connection" id="dept">
            <label>Department</label>
            <a class="chzn-single">choose...</a>
            <div class="chzn-search"><input type="text"></div>
            <ul class="chzn-results">
                <li class="active-result">Acme East</li>
                <li class="active-result">Acme East Annex</li>
                <li class="active-result">Beta Co</li>
            </ul>
        </div>
    "##,
        )
        .await
        .expect("failed to navigate");

    let container = driver
        .find(By::Css("div.kn-input-connection"))
        .await
        .expect("container not found");

    let timings = fast_timings();
    let resolver = ConnectionResolver::new(&driver, &timings);
    let selection = resolver
        .resolve(&container, "Acme East", TripField::Department)
        .await
        .expect("resolve failed");

    assert_eq!(selection.text, "Acme East");
    assert_eq!(selection.kind, MatchKind::Exact);

    driver.quit().await.expect("failed to close browser");
}

#[tokio::test]
#[ignore = "requires a WebDriver endpoint"]
async fn test_submit_controller_finds_button_and_indicator() {
    let Some(driver) = connect().await else { return };

    // Clicking submit reveals the success banner, like the target form does.
    driver
        .goto(
            r##"data:text/html,
        <div class="kn-message success" id="banner" hidden>Form submitted.</div>
        <button class="kn-button is-primary"
                onclick="document.getElementById('banner').hidden = false">
            Submit
        </button>
    "##,
        )
        .await
        .expect("failed to navigate");

    let registry = LocatorRegistry::knack();
    let timings = fast_timings();
    let controller = SubmitController::new(&driver, &registry, &timings);
    let confirmation = controller.submit().await.expect("submit failed");

    assert!(confirmation.indicator_seen);

    driver.quit().await.expect("failed to close browser");
}

#[tokio::test]
#[ignore = "requires a WebDriver endpoint"]
async fn test_submit_miss_restores_main_page_scope() {
    let Some(driver) = connect().await else { return };

    // No submit control anywhere; the probe walks the iframe and must come
    // back to the main page.
    driver
        .goto(
            r##"data:text/html,
        <p id="marker">main</p>
        <iframe srcdoc='<p>inner</p>'></iframe>
    "##,
        )
        .await
        .expect("failed to navigate");

    let registry = LocatorRegistry::knack();
    let timings = Timings {
        submit_probe_timeout_ms: 300,
        confirm_probe_timeout_ms: 300,
        poll_interval_ms: 100,
        submit_settle_ms: 50,
        ..Timings::default()
    };
    let controller = SubmitController::new(&driver, &registry, &timings);
    assert!(controller.submit().await.is_err());

    let marker = driver
        .find(By::Css("p#marker"))
        .await
        .expect("session not on the main page after submit-control miss");
    assert_eq!(marker.text().await.unwrap(), "main");

    // With a submit control but no success banner, the indicator probe also
    // walks every frame and must land back on the main page.
    driver
        .goto(
            r##"data:text/html,
        <p id="marker">main</p>
        <button class="kn-button is-primary">Submit</button>
        <iframe srcdoc='<p>inner</p>'></iframe>
    "##,
        )
        .await
        .expect("failed to navigate");

    let confirmation = controller.submit().await.expect("submit failed");
    assert!(!confirmation.indicator_seen);

    let marker = driver
        .find(By::Css("p#marker"))
        .await
        .expect("session not on the main page after indicator miss");
    assert_eq!(marker.text().await.unwrap(), "main");

    driver.quit().await.expect("failed to close browser");
}

fn batch_timings() -> Timings {
    Timings {
        simple_field_timeout_ms: 500,
        connection_field_timeout_ms: 800,
        poll_interval_ms: 100,
        filter_settle_ms: 200,
        dropdown_open_ms: 50,
        option_click_settle_ms: 50,
        scroll_settle_ms: 20,
        department_cascade_ms: 0,
        driver_populate_ms: 0,
        visual_verify_ms: 0,
        submit_settle_ms: 100,
        submit_probe_timeout_ms: 1000,
        confirm_probe_timeout_ms: 300,
        reset_settle_ms: 100,
        page_load_ms: 200,
        failure_cooldown_ms: 0,
        ..Timings::default()
    }
}

#[tokio::test]
#[ignore = "requires a WebDriver endpoint"]
async fn test_batch_writes_one_ledger_row_per_trip() {
    // The orchestrator opens its own session; probe availability first.
    let Some(probe) = connect().await else { return };
    probe.quit().await.expect("failed to close probe session");

    let dir = tempfile::tempdir().expect("tempdir");
    let ledger_path = dir.path().join("ledger.csv");

    // A minimal form: a plate connection widget and a submit button. There
    // is deliberately no Department widget, so any trip that asks for a
    // department fails during fill.
    let form_url = r##"data:text/html,
        <div class="kn-input-connection">
            <label>Plate</label>
            <a class="chzn-single">choose...</a>
            <div class="chzn-search"><input type="text"></div>
            <ul class="chzn-results">
                <li class="active-result">ABC-123</li>
            </ul>
        </div>
        <button class="kn-button is-primary">Submit</button>
    "##;

    let config = Config {
        target: TargetUrl {
            url: form_url.to_string(),
        },
        webdriver: WebDriverConfig {
            url: WEBDRIVER_URL.to_string(),
        },
        ledger: ledger_path.to_string_lossy().into_owned(),
        confirm: ConfirmPolicy::AssumeSuccess,
        operators: Vec::new(),
        timings: batch_timings(),
    };

    let records = vec![
        TripRecord::from_pairs([(TripField::Plate, "ABC-123".to_string())]),
        TripRecord::from_pairs([
            (TripField::Department, "Facilities".to_string()),
            (TripField::Plate, "ABC-123".to_string()),
        ]),
    ];

    let orchestrator = Orchestrator::new(config, LocatorRegistry::knack());
    let summary = orchestrator
        .run(&records, &LogSink)
        .await
        .expect("batch run failed");

    // The failed trip is absorbed, not skipped: both trips are processed.
    assert_eq!(summary.total, 2);
    assert_eq!(summary.submitted, 1);

    let content = std::fs::read_to_string(&ledger_path).expect("ledger not written");
    let lines: Vec<&str> = content.lines().collect();
    // header plus exactly one row per attempt
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Timestamp,Status"));

    let failed: Vec<&&str> = lines[1..].iter().filter(|l| l.contains("FAILED")).collect();
    assert_eq!(failed.len(), 1);
    // the failed row names the field that could not be filled
    assert!(failed[0].contains("Department"));
    assert!(lines[1..].iter().any(|l| l.contains("SUCCESS")));
}

#[tokio::test]
#[ignore = "requires a WebDriver endpoint"]
async fn test_scope_switching_roundtrip() {
    let Some(driver) = connect().await else { return };

    driver
        .goto("data:text/html,<p>main</p><iframe srcdoc='<p>inner</p>'></iframe>")
        .await
        .expect("failed to navigate");

    triplog::scope::enter(&driver, SearchScope::Frame(0))
        .await
        .expect("frame switch failed");
    let inner = driver.find(By::Tag("p")).await.expect("not in frame");
    assert_eq!(inner.text().await.unwrap(), "inner");

    triplog::scope::enter(&driver, SearchScope::MainPage)
        .await
        .expect("switch back failed");
    let outer = driver.find(By::Tag("p")).await.expect("not in main page");
    assert_eq!(outer.text().await.unwrap(), "main");

    driver.quit().await.expect("failed to close browser");
}
