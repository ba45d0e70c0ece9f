use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::TimeSeriesStore;
use crate::error::StoreError;
use crate::models::{Alert, AirQualityReading, City, Sample, WeatherReading};

// ---

/// Most recent samples for one city, oldest first. The lateral subquery
/// picks the first weather row written in the reading's second, so repeated
/// weather rows never duplicate a sample.
const SAMPLE_WINDOW_SQL: &str = r#"
    SELECT * FROM (
        SELECT c.city_name AS city, aq.recorded_at AS "timestamp",
               aq.aqi, aq.pm25, aq.pm10, aq.no2, aq.so2, aq.co, aq.o3,
               w.temperature, w.humidity, w.wind_speed, w.pressure
        FROM air_quality aq
        JOIN cities c ON c.city_id = aq.city_id
        JOIN LATERAL (
            SELECT temperature, humidity, wind_speed, pressure
            FROM weather
            WHERE weather.city_id = aq.city_id
              AND date_trunc('second', weather.recorded_at) = date_trunc('second', aq.recorded_at)
            ORDER BY weather.weather_id
            LIMIT 1
        ) w ON TRUE
        WHERE c.city_name = $1
        ORDER BY aq.recorded_at DESC
        LIMIT $2
    ) recent
    ORDER BY recent."timestamp" ASC
"#;

/// [`TimeSeriesStore`] backed by the tables created in [`crate::schema`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Alert row as stored; type and severity are text columns.
#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    city: String,
    alert_type: String,
    severity: String,
    aqi_value: i32,
    message: String,
    sent_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        // ---
        let alert_type = row
            .alert_type
            .parse()
            .map_err(|reason| StoreError::InvalidRow { reason })?;
        let severity = row
            .severity
            .parse()
            .map_err(|reason| StoreError::InvalidRow { reason })?;

        Ok(Alert {
            city: row.city,
            alert_type,
            severity,
            aqi_value: row.aqi_value,
            message: row.message,
            sent_at: row.sent_at,
        })
    }
}

impl PgStore {
    // ---
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn city_id(&self, city: &str) -> Result<i32, StoreError> {
        // ---
        sqlx::query_scalar::<_, i32>("SELECT city_id FROM cities WHERE city_name = $1")
            .bind(city)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::UnknownCity {
                city: city.to_string(),
            })
    }
}

#[async_trait]
impl TimeSeriesStore for PgStore {
    // ---
    async fn all_cities(&self) -> Result<Vec<City>, StoreError> {
        // ---
        let cities = sqlx::query_as::<_, City>(
            r#"
            SELECT city_name AS name, state, latitude, longitude
            FROM cities
            ORDER BY city_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(cities)
    }

    async fn latest_reading(&self, city: &str) -> Result<Option<AirQualityReading>, StoreError> {
        // ---
        let reading = sqlx::query_as::<_, AirQualityReading>(
            r#"
            SELECT c.city_name AS city, aq.recorded_at AS "timestamp",
                   aq.aqi, aq.pm25, aq.pm10, aq.no2, aq.so2, aq.co, aq.o3
            FROM air_quality aq
            JOIN cities c ON c.city_id = aq.city_id
            WHERE c.city_name = $1
            ORDER BY aq.recorded_at DESC
            LIMIT 1
            "#,
        )
        .bind(city)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reading)
    }

    async fn latest_weather(&self, city: &str) -> Result<Option<WeatherReading>, StoreError> {
        // ---
        let reading = sqlx::query_as::<_, WeatherReading>(
            r#"
            SELECT c.city_name AS city, w.recorded_at AS "timestamp",
                   w.temperature, w.humidity, w.wind_speed, w.pressure
            FROM weather w
            JOIN cities c ON c.city_id = w.city_id
            WHERE c.city_name = $1
            ORDER BY w.recorded_at DESC, w.weather_id DESC
            LIMIT 1
            "#,
        )
        .bind(city)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reading)
    }

    async fn sample_window(
        &self,
        city: &str,
        max_count: usize,
    ) -> Result<Vec<Sample>, StoreError> {
        // ---
        let samples = sqlx::query_as::<_, Sample>(SAMPLE_WINDOW_SQL)
        .bind(city)
        .bind(max_count as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(samples)
    }

    async fn append_air_quality(&self, reading: &AirQualityReading) -> Result<bool, StoreError> {
        // ---
        let city_id = self.city_id(&reading.city).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO air_quality
                (city_id, recorded_at, aqi, pm25, pm10, no2, so2, co, o3)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (city_id, recorded_at) DO NOTHING
            "#,
        )
        .bind(city_id)
        .bind(reading.timestamp)
        .bind(reading.aqi)
        .bind(reading.pm25)
        .bind(reading.pm10)
        .bind(reading.no2)
        .bind(reading.so2)
        .bind(reading.co)
        .bind(reading.o3)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn append_weather(&self, reading: &WeatherReading) -> Result<(), StoreError> {
        // ---
        let city_id = self.city_id(&reading.city).await?;

        sqlx::query(
            r#"
            INSERT INTO weather
                (city_id, recorded_at, temperature, humidity, wind_speed, pressure)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(city_id)
        .bind(reading.timestamp)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.wind_speed)
        .bind(reading.pressure)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        // ---
        let result = sqlx::query(
            r#"
            INSERT INTO alerts (city_id, alert_type, severity, aqi_value, message, sent_at)
            SELECT city_id, $2, $3, $4, $5, $6
            FROM cities
            WHERE city_name = $1
            "#,
        )
        .bind(&alert.city)
        .bind(alert.alert_type.label())
        .bind(alert.severity.as_str())
        .bind(alert.aqi_value)
        .bind(&alert.message)
        .bind(alert.sent_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownCity {
                city: alert.city.clone(),
            });
        }
        Ok(())
    }

    async fn recent_alerts(
        &self,
        city: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError> {
        // ---
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT c.city_name AS city, a.alert_type, a.severity,
                   a.aqi_value, a.message, a.sent_at
            FROM alerts a
            JOIN cities c ON c.city_id = a.city_id
            WHERE ($1::TEXT IS NULL OR c.city_name = $1)
            ORDER BY a.sent_at DESC, a.alert_id DESC
            LIMIT $2
            "#,
        )
        .bind(city)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Alert::try_from).collect()
    }
}
