use std::time::Duration;

/// EvaluatorConfig holds every threshold and window used by the rules.
/// All fields have defaults, so a partial document only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvaluatorConfig {
    pub weather: WeatherRuleConfig,
    pub time_of_day: TimeOfDayRuleConfig,
    pub faults: FaultRuleConfig,
    pub consumption: ConsumptionRuleConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeatherRuleConfig {
    /// Outdoor temperature (°C) at or above which heating should drop by `mild_reduction`.
    pub mild_threshold: f64,
    pub mild_reduction: u32,
    /// Outdoor temperature (°C) at or above which heating should drop by `moderate_reduction`.
    pub moderate_threshold: f64,
    pub moderate_reduction: u32,
    /// Feels-like excess (°C) over the temperature which indicates solar gain.
    pub solar_gain_delta: f64,
}

impl Default for WeatherRuleConfig {
    fn default() -> Self {
        Self {
            mild_threshold: 15.0,
            mild_reduction: 2,
            moderate_threshold: 12.0,
            moderate_reduction: 1,
            solar_gain_delta: 2.0,
        }
    }
}

/// HourWindow is a range of hours `[start, end)` of the local day.
/// A window with `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start > self.end {
            hour >= self.start || hour < self.end
        } else {
            hour >= self.start && hour < self.end
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeOfDayRuleConfig {
    /// Offset of the site's local time from UTC, in minutes.
    pub utc_offset_minutes: i32,
    pub night_window: HourWindow,
    /// Zone-name fragment of equipment which is idle at night.
    pub night_category: String,
    pub off_peak_window: HourWindow,
}

impl Default for TimeOfDayRuleConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 60,
            night_window: HourWindow { start: 23, end: 6 },
            night_category: "Restaurant".to_string(),
            off_peak_window: HourWindow { start: 22, end: 6 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaultRuleConfig {
    /// Trailing window within which a unit's latest status is inspected.
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Slug of the status which marks a unit as faulty.
    pub status_slug: String,
}

impl Default for FaultRuleConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(24 * 3600),
            status_slug: "en-panne".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsumptionRuleConfig {
    #[serde(with = "humantime_serde")]
    pub recent: Duration,
    #[serde(with = "humantime_serde")]
    pub baseline: Duration,
    /// Multiple of the baseline above which recent consumption is excessive.
    pub factor: f64,
}

impl Default for ConsumptionRuleConfig {
    fn default() -> Self {
        Self {
            recent: Duration::from_secs(24 * 3600),
            baseline: Duration::from_secs(30 * 24 * 3600),
            factor: 1.2,
        }
    }
}

impl EvaluatorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let Self {
            weather,
            time_of_day,
            faults,
            consumption,
        } = self;

        if weather.moderate_threshold > weather.mild_threshold {
            anyhow::bail!(
                "weather.moderateThreshold ({}) must not exceed weather.mildThreshold ({})",
                weather.moderate_threshold,
                weather.mild_threshold
            );
        }
        for (name, window) in [
            ("nightWindow", time_of_day.night_window),
            ("offPeakWindow", time_of_day.off_peak_window),
        ] {
            if window.start > 23 || window.end > 24 {
                anyhow::bail!("timeOfDay.{name} hours must be within the day, got {window:?}");
            }
        }
        if time_of_day.utc_offset_minutes.abs() >= 24 * 60 {
            anyhow::bail!("timeOfDay.utcOffsetMinutes must be less than a day");
        }
        if faults.window.is_zero() {
            anyhow::bail!("faults.window must be positive");
        }
        if consumption.recent.is_zero() || consumption.baseline.is_zero() {
            anyhow::bail!("consumption windows must be positive");
        }
        if !(consumption.factor > 0.0) {
            anyhow::bail!("consumption.factor must be positive");
        }
        Ok(())
    }
}
