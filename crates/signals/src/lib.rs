//! Read-only accessors over operational signals: the current weather, the
//! fault state of equipment units, and rolling energy consumption.
//!
//! Readers are external collaborators of the recommendation engine. They're
//! expressed as traits so the engine can be exercised against fixed
//! snapshots, with thin production implementations in `weather` (Open-Meteo)
//! and `equipment` (Postgres).
mod equipment;
mod weather;

pub use equipment::PgEquipment;
pub use weather::{describe_weather_code, OpenMeteo, OpenMeteoConfig};

use chrono::{DateTime, Utc};

/// Weather is a current outdoor reading, in degrees Celsius.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub temperature: f64,
    pub feels_like: f64,
    /// WMO weather interpretation code, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

/// FaultyUnit is an equipment unit whose most recent status within the
/// fault window is the fault status.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultyUnit {
    pub unit_id: models::Id,
    pub name: String,
    pub zone_name: String,
    pub hours_since_last_fault: i64,
}

/// ConsumptionWindow compares recent consumption against a trailing baseline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionWindow {
    /// Summed consumption over the recent window (normally the last 24h).
    pub last_24h: f64,
    /// Average daily consumption over the baseline window which precedes
    /// (and excludes) the recent window.
    pub avg_daily_30d: f64,
}

pub trait WeatherReader: Send + Sync {
    fn current_weather<'s>(
        &'s self,
    ) -> impl std::future::Future<Output = anyhow::Result<Weather>> + Send + 's;
}

pub trait EquipmentReader: Send + Sync {
    /// Units whose latest status record in `[now - window, now]` has the
    /// given status slug.
    fn faulty_units_since<'s>(
        &'s self,
        now: DateTime<Utc>,
        window: std::time::Duration,
        status_slug: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<FaultyUnit>>> + Send + 's;

    /// Consumption over `[now - recent, now)` and the average daily
    /// consumption over the `baseline` which ends at `now - recent`.
    fn consumption_window<'s>(
        &'s self,
        now: DateTime<Utc>,
        recent: std::time::Duration,
        baseline: std::time::Duration,
    ) -> impl std::future::Future<Output = anyhow::Result<ConsumptionWindow>> + Send + 's;

    /// Number of units located in zones whose name contains `category`.
    fn units_in_category<'s>(
        &'s self,
        category: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<usize>> + Send + 's;
}
