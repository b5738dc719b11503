use std::collections::HashMap;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tempfile::TempDir;

use codemetal_stationflow::{build_station, routes, Config, StorageBackend};

#[derive(Debug, Deserialize)]
struct Latest {
    location: String,
    location_name: String,
    time: String,
    temperature: f64,
    humidity: i64,
    windspeed: f64,
    winddir: f64,
    windcard: String,
    pressure: f64,
    daily_mm: f64,
    trend: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RainDay {
    day: i64,
    ts: i64,
    daily_mm: f64,
}

/// Start the full router on an ephemeral port, backed by a throw-away
/// SQLite database. The `TempDir` must outlive the test.
async fn spawn_app() -> Result<(String, TempDir)> {
    // ---
    let dir = tempfile::tempdir()?;
    let cfg = Config {
        location: "8FHJVFRR+3W".into(),
        web_port: 0,
        storage: StorageBackend::Sqlite,
        db_url: format!("sqlite://{}", dir.path().join("data/ecowitt.db").display()),
        db_pool_max: 4,
        retention_days: 30,
        prune_interval_secs: 6 * 3600,
        geocode_enabled: false,
        geocode_timeout_secs: 1,
        geocode_cache_secs: 60,
        mqtt: None,
    };

    let app = routes::router(build_station(&cfg).await?);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok((format!("http://{addr}"), dir))
}

async fn upload(client: &Client, base: &str, fields: &[(&str, &str)]) -> Result<StatusCode> {
    let resp = client
        .post(format!("{base}/ecowitt"))
        .form(fields)
        .send()
        .await?;
    Ok(resp.status())
}

#[tokio::test]
async fn upload_is_normalized_into_latest() -> Result<()> {
    // ---
    let (base, _dir) = spawn_app().await?;
    let client = Client::new();

    let status = upload(
        &client,
        &base,
        &[
            ("PASSKEY", "ABCDEF"),
            ("tempf", "68"),
            ("humidity", "55"),
            ("windspeedmph", "5"),
            ("winddir", "180"),
            ("baromrelin", "29.92"),
            ("dailyrainin", "0.2"),
            ("uv", "not-a-number"),
        ],
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let latest: Latest = client
        .get(format!("{base}/api/latest"))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(latest.location, "8FHJVFRR+3W");
    assert_eq!(latest.location_name, "Unknown place");
    assert_ne!(latest.time, "--:--:--");
    assert!((latest.temperature - 20.0).abs() < 0.01);
    assert_eq!(latest.humidity, 55);
    assert!((latest.windspeed - 8.05).abs() < 0.01);
    assert_eq!(latest.winddir, 180.0);
    assert_eq!(latest.windcard, "S");
    assert!((latest.pressure - 1013.21).abs() < 0.01);
    assert!((latest.daily_mm - 5.08).abs() < 1e-9);

    // first observation ever: every trend is flat
    assert_eq!(latest.trend.len(), 8);
    assert!(latest.trend.values().all(|t| t == "same"));

    Ok(())
}

#[tokio::test]
async fn trend_reflects_previous_upload() -> Result<()> {
    // ---
    let (base, _dir) = spawn_app().await?;
    let client = Client::new();

    upload(&client, &base, &[("tempf", "60"), ("humidity", "40")]).await?;
    upload(&client, &base, &[("tempf", "65"), ("humidity", "30")]).await?;

    let latest: Latest = client
        .get(format!("{base}/api/latest"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(latest.trend["temperature"], "up");
    assert_eq!(latest.trend["humidity"], "down");
    assert_eq!(latest.trend["pressure"], "same");

    Ok(())
}

#[tokio::test]
async fn empty_or_malformed_upload_is_rejected() -> Result<()> {
    // ---
    let (base, _dir) = spawn_app().await?;
    let client = Client::new();

    let empty: [(&str, &str); 0] = [];
    assert_eq!(upload(&client, &base, &empty).await?, StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{base}/ecowitt"))
        .json(&serde_json::json!({"tempf": 68}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await?, "NO DATA");

    Ok(())
}

#[tokio::test]
async fn history_averages_uploads() -> Result<()> {
    // ---
    let (base, _dir) = spawn_app().await?;
    let client = Client::new();

    upload(&client, &base, &[("tempf", "68")]).await?;
    upload(&client, &base, &[("tempf", "86")]).await?;

    // unparseable hours falls back to the default window
    let history: HashMap<String, Vec<(i64, f64)>> = client
        .get(format!("{base}/api/history?hours=abc"))
        .send()
        .await?
        .json()
        .await?;

    for key in ["temperature", "humidity", "pressure", "rainrate_mm", "yearly_mm"] {
        assert!(history.contains_key(key), "missing series {key}");
    }

    // the two uploads land in one minute bucket, or straddle two
    let temps = &history["temperature"];
    match temps.as_slice() {
        [(t, avg)] => {
            assert_eq!(t % 60, 0);
            assert!((avg - 25.0).abs() < 1e-9);
        }
        [(t0, a), (t1, b)] => {
            assert_eq!(t1 - t0, 60);
            assert!((a - 20.0).abs() < 1e-9 && (b - 30.0).abs() < 1e-9);
        }
        other => panic!("unexpected buckets: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn history_with_no_data_is_empty() -> Result<()> {
    // ---
    let (base, _dir) = spawn_app().await?;
    let history: HashMap<String, Vec<(i64, f64)>> = Client::new()
        .get(format!("{base}/api/history?hours=0"))
        .send()
        .await?
        .json()
        .await?;

    assert!(!history.is_empty());
    assert!(history.values().all(Vec::is_empty));
    Ok(())
}

#[tokio::test]
async fn rain_rollup_keeps_one_row_per_day() -> Result<()> {
    // ---
    let (base, _dir) = spawn_app().await?;
    let client = Client::new();

    upload(&client, &base, &[("dailyrainin", "0.1")]).await?;
    upload(&client, &base, &[("dailyrainin", "0.2")]).await?;

    let days: Vec<RainDay> = client
        .get(format!("{base}/api/rain/daily?days=7"))
        .send()
        .await?
        .json()
        .await?;

    // Two uploads a few milliseconds apart only split across days at midnight
    let latest = &days[0];
    assert!(latest.day > 20_000_000);
    assert!(latest.ts > 0);
    assert!((latest.daily_mm - 5.08).abs() < 1e-9);
    assert!(days.len() <= 2);

    Ok(())
}

#[tokio::test]
async fn health_reports_ok() -> Result<()> {
    // ---
    let (base, _dir) = spawn_app().await?;
    let body: serde_json::Value = Client::new()
        .get(format!("{base}/health"))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["location"], "8FHJVFRR+3W");
    Ok(())
}
