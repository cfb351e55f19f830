//! End-to-end runs of the sync job against a mock backend.
//!
//! Each test gets its own temp directory for the cache and feed files.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{TimeZone, Utc};
use shiftfeed_core::{ApiConfig, Config};
use shiftfeed_schedule::sync::sync;
use shiftfeed_schedule::{RunContext, RunLock, ScheduleClient, ScheduleError, Shift, Storage};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(dir: &Path) -> Config {
    Config {
        api: ApiConfig {
            host: "api.example.com".to_string(),
            api_key: "anon-key".to_string(),
            username: "worker@example.com".to_string(),
            password: "hunter2".to_string(),
        },
        cache_path: dir.join("scheduleData.json"),
        ics_path: dir.join("schedule.ics"),
        timezone: "America/Toronto".to_string(),
    }
}

/// Run instant: 2024-07-01 12:00 UTC
fn run_context() -> RunContext {
    let instant = Utc
        .with_ymd_and_hms(2024, 7, 1, 12, 0, 0)
        .unwrap()
        .timestamp_millis();
    RunContext::new(instant, "America/Toronto").unwrap()
}

fn raw_shift(start: &str, end: &str, status: i64) -> serde_json::Value {
    let work_date = &start[..10];
    serde_json::json!({
        "startTime": start,
        "endTime": end,
        "role": "Clerk",
        "store": "Kanata",
        "department": "Deli",
        "workDate": work_date,
        "id": 77,
        "duration": 7.5,
        "status": status,
        "updated_at": "2024-06-20T10:00:00"
    })
}

fn cached_shift(start_ms: i64, store: &str) -> Shift {
    Shift {
        start_time: start_ms,
        end_time: start_ms + 4 * 3_600_000,
        updated_time: start_ms - 86_400_000,
        store: store.to_string(),
        department: "Deli".to_string(),
        role: "Clerk".to_string(),
        paid_hours: 4.0,
        status: 0,
    }
}

async fn mount_login(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": token
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_schedule(server: &MockServer, token: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/schedules"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn setup() -> (MockServer, TempDir, Config, ScheduleClient) {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let client = ScheduleClient::with_base_url(&config.api, &server.uri()).unwrap();
    (server, dir, config, client)
}

#[tokio::test]
async fn test_first_run_writes_cache_and_feed() {
    let (server, _dir, config, client) = setup().await;

    mount_login(&server, "session-1", 1).await;
    mount_schedule(
        &server,
        "session-1",
        serde_json::json!([
            raw_shift("2024-07-15T09:00:00", "2024-07-15T17:00:00", 0),
            raw_shift("2024-07-16T09:00:00", "2024-07-16T17:00:00", 2),
        ]),
    )
    .await;

    let report = sync(&client, &config, &run_context()).await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.upcoming, 1);
    assert_eq!(report.retained, 0);
    assert_eq!(report.total, 1);
    assert!(report.fresh_login);

    let storage = Storage::load(&config.cache_path);
    assert_eq!(storage.token.as_deref(), Some("session-1"));
    assert_eq!(storage.shifts.len(), 1);
    assert_eq!(
        storage.shifts[0].start_time,
        Utc.with_ymd_and_hms(2024, 7, 15, 13, 0, 0).unwrap().timestamp_millis()
    );

    let ics = fs::read_to_string(&config.ics_path).unwrap();
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
    assert!(ics.contains("DTSTART:20240715T130000Z\n"));
    assert!(ics.contains("DTEND:20240715T210000Z\n"));
    assert!(ics.contains("SUMMARY:Farm Boy (8 hour shift)\n"));
    assert!(ics.contains("DESCRIPTION:Paid hours: 7.5\n"));
    assert!(ics.ends_with("END:VCALENDAR\n"));
}

#[tokio::test]
async fn test_cached_history_is_kept_and_future_replaced() {
    let (server, _dir, config, client) = setup().await;
    let ctx = run_context();

    let past = cached_shift(ctx.run_instant - 3 * 86_400_000, "past");
    let stale_future = cached_shift(ctx.run_instant + 5 * 86_400_000, "stale");
    Storage {
        token: Some("cached-token".to_string()),
        shifts: vec![past.clone(), stale_future],
    }
    .save(&config.cache_path)
    .unwrap();

    mount_login(&server, "unused", 0).await;
    mount_schedule(
        &server,
        "cached-token",
        serde_json::json!([raw_shift("2024-07-10T12:00:00", "2024-07-10T16:00:00", 1)]),
    )
    .await;

    let report = sync(&client, &config, &ctx).await.unwrap();
    assert!(!report.fresh_login);
    assert_eq!(report.retained, 1);

    let storage = Storage::load(&config.cache_path);
    assert_eq!(storage.token.as_deref(), Some("cached-token"));
    assert_eq!(storage.shifts.len(), 2);
    assert_eq!(storage.shifts[0], past);
    assert_eq!(storage.shifts[1].status, 1);
    assert!(storage.shifts.iter().all(|s| s.store != "stale"));

    let ics = fs::read_to_string(&config.ics_path).unwrap();
    assert!(ics.contains("SEQUENCE:2\n"));
    assert!(ics.contains("SUMMARY:Farm Boy (4 hour shift) Updated\n"));
}

#[tokio::test]
async fn test_stale_token_is_replaced() {
    let (server, _dir, config, client) = setup().await;

    Storage {
        token: Some("stale".to_string()),
        shifts: Vec::new(),
    }
    .save(&config.cache_path)
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedules"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, "fresh", 1).await;
    mount_schedule(&server, "fresh", serde_json::json!([])).await;

    let report = sync(&client, &config, &run_context()).await.unwrap();

    assert!(report.fresh_login);
    assert_eq!(report.total, 0);
    assert_eq!(
        Storage::load(&config.cache_path).token.as_deref(),
        Some("fresh")
    );
}

#[tokio::test]
async fn test_failed_normalization_leaves_files_untouched() {
    let (server, _dir, config, client) = setup().await;

    let previous = Storage {
        token: Some("cached-token".to_string()),
        shifts: vec![cached_shift(1_600_000_000_000, "history")],
    };
    previous.save(&config.cache_path).unwrap();
    fs::write(&config.ics_path, "previous feed").unwrap();

    mount_schedule(
        &server,
        "cached-token",
        serde_json::json!([raw_shift("2024-07-15T09:00:00", "whenever", 0)]),
    )
    .await;

    let err = sync(&client, &config, &run_context()).await.unwrap_err();

    assert!(err.is_normalization());
    assert_eq!(Storage::load(&config.cache_path), previous);
    assert_eq!(fs::read_to_string(&config.ics_path).unwrap(), "previous feed");
}

#[tokio::test]
async fn test_concurrent_run_is_refused() {
    let (_server, _dir, config, client) = setup().await;

    let _held = RunLock::acquire(&config.cache_path).unwrap();
    let result = sync(&client, &config, &run_context()).await;

    assert!(matches!(result, Err(ScheduleError::Locked(_))));
    assert!(!config.ics_path.exists());
}
