//! Database schema management for `codemetal-airwatch`.
//!
//! Ensures required tables and indexes exist and seeds the monitored cities.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Cities seeded on first start: (name, state, latitude, longitude).
pub const SEED_CITIES: &[(&str, &str, f64, f64)] = &[
    ("Delhi", "Delhi", 28.6139, 77.2090),
    ("Mumbai", "Maharashtra", 19.0760, 72.8777),
    ("Kolkata", "West Bengal", 22.5726, 88.3639),
    ("Chennai", "Tamil Nadu", 13.0827, 80.2707),
    ("Bangalore", "Karnataka", 12.9716, 77.5946),
    ("Hyderabad", "Telangana", 17.3850, 78.4867),
    ("Pune", "Maharashtra", 18.5204, 73.8567),
    ("Ahmedabad", "Gujarat", 23.0225, 72.5714),
];

/// Create or update the database schema (idempotent).
///
/// Creates `cities`, `air_quality`, `weather` and `alerts`, then inserts any
/// missing seed city. Safe to call on every startup.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cities (
            city_id    SERIAL PRIMARY KEY,
            city_name  TEXT UNIQUE NOT NULL,
            state      TEXT,
            latitude   DOUBLE PRECISION,
            longitude  DOUBLE PRECISION,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // One air-quality reading per (city, instant)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS air_quality (
            measurement_id SERIAL PRIMARY KEY,
            city_id        INTEGER NOT NULL REFERENCES cities(city_id),
            recorded_at    TIMESTAMPTZ NOT NULL,
            aqi            INTEGER NOT NULL,
            pm25           DOUBLE PRECISION NOT NULL,
            pm10           DOUBLE PRECISION NOT NULL,
            no2            DOUBLE PRECISION NOT NULL,
            so2            DOUBLE PRECISION NOT NULL,
            co             DOUBLE PRECISION NOT NULL,
            o3             DOUBLE PRECISION NOT NULL,
            created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (city_id, recorded_at)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Weather pairing with air quality is not enforced here
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather (
            weather_id  SERIAL PRIMARY KEY,
            city_id     INTEGER NOT NULL REFERENCES cities(city_id),
            recorded_at TIMESTAMPTZ NOT NULL,
            temperature DOUBLE PRECISION NOT NULL,
            humidity    DOUBLE PRECISION NOT NULL,
            wind_speed  DOUBLE PRECISION NOT NULL,
            pressure    DOUBLE PRECISION NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            alert_id   SERIAL PRIMARY KEY,
            city_id    INTEGER NOT NULL REFERENCES cities(city_id),
            alert_type TEXT NOT NULL,
            severity   TEXT NOT NULL,
            aqi_value  INTEGER NOT NULL,
            message    TEXT NOT NULL,
            sent_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_city_recorded
            ON weather (city_id, recorded_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_alerts_city_sent
            ON alerts (city_id, sent_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    for (name, state, latitude, longitude) in SEED_CITIES {
        sqlx::query(
            r#"
            INSERT INTO cities (city_name, state, latitude, longitude)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (city_name) DO NOTHING
            "#,
        )
        .bind(*name)
        .bind(*state)
        .bind(*latitude)
        .bind(*longitude)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
