//! End-to-end report runs against canned NOAA, Open-Meteo and recipient responses.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use super::stub::StubTransport;
use crate::config::{Config, ConfigError, RecipientUrls};
use crate::fetcher::{FetchError, ResilientFetcher, Verification};
use crate::orchestrator::{ReportError, ReportOrchestrator, RunOptions, RunOutcome};
use crate::recipients::RecipientError;
use crate::wind::WindError;

const NOAA: &str = "https://noaa.test/datagetter";
const WIND: &str = "https://wind.test/v1/forecast";
const MAIN_LIST: &str = "https://lists.test/main.txt";
const OFFSEASON_LIST: &str = "https://lists.test/offseason.txt";
const TEST_LIST: &str = "https://lists.test/test.txt";

const TIDES: &str = r#"{"predictions": [
    {"t": "2024-07-01 01:00", "v": "3.2", "type": "H"},
    {"t": "2024-07-01 07:00", "v": "0.5", "type": "L"}
]}"#;

const WATER: &str = r#"{"data": [{"t": "2024-07-01 06:54", "v": "72.5"}]}"#;

const WIND_FORECAST: &str = r#"{"hourly": {
    "time": ["2024-06-30T08:00", "2024-07-01T08:00", "2024-07-01T12:00", "2024-07-01T15:00", "2024-07-01T18:00", "2024-07-01T21:00"],
    "wind_speed_10m": [30.0, 10.0, 20.9, 5.0, 15.0, 8.0],
    "wind_direction_10m": [0.0, 140.0, 320.0, 230.0, 90.0, 0.0]
}}"#;

fn july_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.noaa.api_url = NOAA.to_string();
    config.wind.api_url = WIND.to_string();
    config.email.sender = "reports@example.com".to_string();
    config.email.recipient_urls = RecipientUrls {
        main: Some(MAIN_LIST.to_string()),
        offseason: Some(OFFSEASON_LIST.to_string()),
        test: Some(TEST_LIST.to_string()),
    };
    config
}

fn healthy_feeds() -> StubTransport {
    StubTransport::new()
        .respond_product(NOAA, "predictions", TIDES)
        .respond_product(NOAA, "water_temperature", WATER)
        .respond(WIND, WIND_FORECAST)
        .respond(MAIN_LIST, "Surfer@X.com, swimmer@x.com\n")
        .respond(TEST_LIST, "tester@x.com")
}

fn fetcher(stub: &Arc<StubTransport>) -> ResilientFetcher {
    ResilientFetcher::new(stub.clone(), Duration::from_secs(10))
}

fn dry_run() -> RunOptions {
    RunOptions {
        send: false,
        test_mode: false,
        today: Some(july_first()),
    }
}

async fn printed(config: &Config, stub: &Arc<StubTransport>, options: RunOptions) -> String {
    match ReportOrchestrator::new(config, fetcher(stub))
        .run(options)
        .await
        .unwrap()
    {
        RunOutcome::Printed(message) => message,
        other => panic!("expected a dry run, got {other:?}"),
    }
}

/// A full dry run prints headers and every section in order.
#[tokio::test]
async fn dry_run_prints_complete_report() {
    let config = test_config();
    let stub = Arc::new(healthy_feeds());
    let message = printed(&config, &stub, dry_run()).await;

    assert!(message.contains("Bcc: surfer@x.com, swimmer@x.com\n"));
    assert!(message.contains("From: reports@example.com\n"));
    assert!(message.contains("Subject: 🌊 Daily Water Report: 2024-07-01\n"));
    assert!(message.contains("Daily Water Report – Monday, July 01, 2024"));

    let water = message.find("🌡️ Water Temperature: 72.5 °F").unwrap();
    let tides = message.find("🌊 Tides:").unwrap();
    let wind = message.find("🌬️ Wind Forecast:").unwrap();
    assert!(water < tides && tides < wind);
}

/// Only the 07:00 tide falls inside the 06:00–20:30 window.
#[tokio::test]
async fn tides_are_restricted_to_daylight() {
    let config = test_config();
    let stub = Arc::new(healthy_feeds());
    let message = printed(&config, &stub, dry_run()).await;

    assert!(message.contains("Low Tide at 7:00 AM — 0.5 ft"));
    assert!(!message.contains("1:00 AM"));
}

/// Four key times today; yesterday's 08:00 and today's 21:00 are dropped.
#[tokio::test]
async fn wind_lists_todays_key_times_only() {
    let config = test_config();
    let stub = Arc::new(healthy_feeds());
    let message = printed(&config, &stub, dry_run()).await;

    let wind_lines: Vec<&str> = message.lines().filter(|l| l.contains(" mph ")).collect();
    assert_eq!(wind_lines.len(), 4);
    assert_eq!(wind_lines[0], "-  8 AM:  6.2 mph SE  (140°) → Onshore");
    assert!(wind_lines.iter().all(|l| !l.contains("9 PM")));
}

/// Tide and temperature failures leave the report sendable.
#[tokio::test]
async fn optional_sections_degrade() {
    let config = test_config();
    let stub = Arc::new(
        StubTransport::new()
            .fail_product(NOAA, "predictions", FetchError::Timeout("10s".into()))
            .respond_product(NOAA, "water_temperature", r#"{"error": {"message": "No data"}}"#)
            .respond(WIND, WIND_FORECAST)
            .respond(MAIN_LIST, "surfer@x.com"),
    );
    let message = printed(&config, &stub, dry_run()).await;

    assert!(message.contains("🌡️ Water Temperature: unavailable"));
    assert!(message.contains("🌊 Tides:\nunavailable"));
    assert!(message.contains("🌬️ Wind Forecast:"));
}

#[tokio::test]
async fn wind_failure_aborts_run() {
    let config = test_config();
    let stub = Arc::new(
        StubTransport::new()
            .respond_product(NOAA, "predictions", TIDES)
            .respond_product(NOAA, "water_temperature", WATER)
            .fail(WIND, FetchError::Connect("refused".into()))
            .respond(MAIN_LIST, "surfer@x.com"),
    );
    let err = ReportOrchestrator::new(&config, fetcher(&stub))
        .run(dry_run())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Wind(WindError::Fetch(_))));
}

/// A missing list URL stops the run before any feed is fetched.
#[tokio::test]
async fn recipient_failure_aborts_run() {
    let mut config = test_config();
    config.email.recipient_urls.main = None;
    let stub = Arc::new(healthy_feeds());

    let err = ReportOrchestrator::new(&config, fetcher(&stub))
        .run(dry_run())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReportError::Recipients(RecipientError::MissingUrl("main"))
    ));
    assert!(stub.calls().is_empty());
}

/// Test mode switches lists and marks the subject.
#[tokio::test]
async fn test_mode_uses_test_list() {
    let config = test_config();
    let stub = Arc::new(healthy_feeds());
    let options = RunOptions {
        test_mode: true,
        ..dry_run()
    };
    let message = printed(&config, &stub, options).await;

    assert!(message.contains("Bcc: tester@x.com\n"));
    assert!(message.contains("Subject: TEST: 🌊 Daily Water Report: 2024-07-01"));
    assert!(stub.calls_to(MAIN_LIST).is_empty());
}

#[tokio::test]
async fn offseason_uses_offseason_list() {
    let config = test_config();
    let stub = Arc::new(
        StubTransport::new()
            .respond_product(NOAA, "predictions", r#"{"predictions": []}"#)
            .respond_product(NOAA, "water_temperature", WATER)
            .respond(
                WIND,
                r#"{"hourly": {"time": [], "wind_speed_10m": [], "wind_direction_10m": []}}"#,
            )
            .respond(OFFSEASON_LIST, "winter@x.com"),
    );
    let options = RunOptions {
        today: NaiveDate::from_ymd_opt(2024, 12, 2),
        ..dry_run()
    };
    let message = printed(&config, &stub, options).await;

    assert!(message.contains("Bcc: winter@x.com\n"));
    assert!(message.contains("No wind forecast for today's key times"));
}

/// Send mode checks credentials before any fetch is made.
#[tokio::test]
async fn send_without_password_fails_before_io() {
    let config = test_config();
    let stub = Arc::new(healthy_feeds());
    let options = RunOptions {
        send: true,
        ..dry_run()
    };

    let err = ReportOrchestrator::new(&config, fetcher(&stub))
        .run(options)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReportError::Config(ConfigError::MissingSetting("email.password"))
    ));
    assert!(stub.calls().is_empty());
}

/// A certificate failure on one feed is retried unverified; the others are untouched.
#[tokio::test]
async fn certificate_fallback_inside_pipeline() {
    let config = test_config();
    let stub = Arc::new(
        StubTransport::new()
            .respond_product(NOAA, "predictions", TIDES)
            .respond_product(NOAA, "water_temperature", WATER)
            .respond(WIND, WIND_FORECAST)
            .fail(MAIN_LIST, FetchError::Certificate("UnknownIssuer".into()))
            .respond(MAIN_LIST, "late@x.com"),
    );
    let message = printed(&config, &stub, dry_run()).await;
    assert!(message.contains("Bcc: late@x.com\n"));

    let list_calls: Vec<Verification> = stub
        .calls_to(MAIN_LIST)
        .iter()
        .map(|c| c.verification)
        .collect();
    assert_eq!(list_calls, vec![Verification::Strict, Verification::Disabled]);
    assert_eq!(stub.calls_to(WIND).len(), 1);
}

/// One bad line in the list does not keep the others from receiving the report.
#[tokio::test]
async fn malformed_list_entries_are_skipped_on_send() {
    let config = test_config();
    let stub = Arc::new(
        StubTransport::new()
            .respond_product(NOAA, "predictions", TIDES)
            .respond_product(NOAA, "water_temperature", WATER)
            .respond(WIND, WIND_FORECAST)
            .respond(MAIN_LIST, "surfer@x.com\nsee you at the beach\nswimmer@x.com"),
    );

    let email = ReportOrchestrator::new(&config, fetcher(&stub))
        .build_email(july_first(), false)
        .await
        .unwrap();
    assert_eq!(email.bcc.len(), 3);

    let message = email.to_message().unwrap();
    let envelope: Vec<String> = message
        .envelope()
        .to()
        .iter()
        .map(|a| a.to_string())
        .collect();
    assert_eq!(envelope, vec!["surfer@x.com", "swimmer@x.com"]);
}
