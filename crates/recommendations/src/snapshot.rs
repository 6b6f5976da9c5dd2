use crate::EvaluatorConfig;
use chrono::{DateTime, Utc};
use signals::{ConsumptionWindow, EquipmentReader, FaultyUnit, Weather, WeatherReader};

/// SignalError is the failure to read one signal of a Snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{signal} signal is unavailable: {reason}")]
pub struct SignalError {
    pub signal: &'static str,
    pub reason: String,
}

impl SignalError {
    fn from_anyhow(signal: &'static str, err: anyhow::Error) -> Self {
        Self {
            signal,
            reason: format!("{err:#}"),
        }
    }
}

pub type Signal<T> = Result<T, SignalError>;

/// Snapshot is every signal value read for a single evaluation cycle.
/// Each signal is read independently, and a failed read only affects
/// the rules which depend on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub weather: Signal<Weather>,
    pub faulty_units: Signal<Vec<FaultyUnit>>,
    pub consumption: Signal<ConsumptionWindow>,
    /// Number of units in zones of the configured night-use category.
    pub night_category_units: Signal<usize>,
}

impl Snapshot {
    #[tracing::instrument(skip_all, fields(%now))]
    pub async fn collect<W, E>(
        weather: &W,
        equipment: &E,
        config: &EvaluatorConfig,
        now: DateTime<Utc>,
    ) -> Self
    where
        W: WeatherReader,
        E: EquipmentReader,
    {
        let weather = weather
            .current_weather()
            .await
            .map_err(|err| SignalError::from_anyhow("weather", err));

        let faulty_units = equipment
            .faulty_units_since(now, config.faults.window, &config.faults.status_slug)
            .await
            .map_err(|err| SignalError::from_anyhow("faulty units", err));

        let consumption = equipment
            .consumption_window(now, config.consumption.recent, config.consumption.baseline)
            .await
            .map_err(|err| SignalError::from_anyhow("consumption", err));

        let night_category_units = equipment
            .units_in_category(&config.time_of_day.night_category)
            .await
            .map_err(|err| SignalError::from_anyhow("night category units", err));

        for err in [
            weather.as_ref().err(),
            faulty_units.as_ref().err(),
            consumption.as_ref().err(),
            night_category_units.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        {
            tracing::warn!(signal = err.signal, reason = %err.reason, "failed to read signal");
        }

        Self {
            weather,
            faulty_units,
            consumption,
            night_category_units,
        }
    }
}
