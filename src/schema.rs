//! Database schema management for `codemetal-stationflow`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::SqlitePool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the append-only `readings` log and the `rain_rollup_daily` table
/// (one row per local day, never pruned). Safe to call on every startup;
/// no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Time-series log, one row per ingested reading
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS readings (
            ts             INTEGER NOT NULL,
            location       TEXT    NOT NULL DEFAULT '',
            temperature    REAL    NOT NULL,
            humidity       INTEGER NOT NULL,
            windspeed      REAL    NOT NULL,
            winddir        REAL    NOT NULL,
            pressure       REAL    NOT NULL,
            solarradiation REAL    NOT NULL,
            uv             REAL    NOT NULL,
            rainrate_mm    REAL    NOT NULL,
            event_mm       REAL    NOT NULL,
            hourly_mm      REAL    NOT NULL,
            last24h_mm     REAL    NOT NULL,
            daily_mm       REAL    NOT NULL,
            weekly_mm      REAL    NOT NULL,
            monthly_mm     REAL    NOT NULL,
            yearly_mm      REAL    NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_readings_ts
            ON readings (ts);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Long-term rain record, keyed by YYYYMMDD
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rain_rollup_daily (
            day         INTEGER PRIMARY KEY,
            ts          INTEGER NOT NULL,
            rainrate_mm REAL    NOT NULL,
            event_mm    REAL    NOT NULL,
            hourly_mm   REAL    NOT NULL,
            last24h_mm  REAL    NOT NULL,
            daily_mm    REAL    NOT NULL,
            weekly_mm   REAL    NOT NULL,
            monthly_mm  REAL    NOT NULL,
            yearly_mm   REAL    NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
