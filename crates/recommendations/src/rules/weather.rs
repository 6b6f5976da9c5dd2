use super::{signal, Rule};
use crate::{config::WeatherRuleConfig, Snapshot};
use chrono::{DateTime, Utc};
use models::{NotificationType, Priority, Recommendation};

/// Weather suggests heating reductions when it's mild outside,
/// and notes when sunshine provides a free solar gain.
pub struct Weather {
    pub config: WeatherRuleConfig,
}

impl Rule for Weather {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn evaluate(
        &self,
        _now: DateTime<Utc>,
        snapshot: &Snapshot,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let WeatherRuleConfig {
            mild_threshold,
            mild_reduction,
            moderate_threshold,
            moderate_reduction,
            solar_gain_delta,
        } = &self.config;

        let weather = signal(&snapshot.weather)?;
        let (temperature, feels_like) = (weather.temperature, weather.feels_like);
        let conditions = format!(
            "Current conditions: {}, {temperature}°C.",
            weather
                .code
                .map(signals::describe_weather_code)
                .unwrap_or("undetermined conditions"),
        );

        let mut out = Vec::new();

        if temperature >= *mild_threshold {
            out.push(Recommendation {
                key: "weather.mild".to_string(),
                title: "Mild weather".to_string(),
                message: format!(
                    "The outdoor temperature is mild ({temperature}°C). \
                     Lower the heating by {mild_reduction}°C or switch it off. {conditions}"
                ),
                type_: NotificationType::Info,
                priority: Priority::High,
            });
        } else if temperature >= *moderate_threshold {
            out.push(Recommendation {
                key: "weather.moderate".to_string(),
                title: "Moderate temperature".to_string(),
                message: format!(
                    "The outdoor temperature is moderate ({temperature}°C). \
                     Lower the heating by {moderate_reduction}°C. {conditions}"
                ),
                type_: NotificationType::Info,
                priority: Priority::Medium,
            });
        }

        if feels_like > temperature + solar_gain_delta {
            out.push(Recommendation {
                key: "weather.solar_gain".to_string(),
                title: "Solar gain".to_string(),
                message: format!(
                    "Strong sunshine: it feels like {feels_like}°C outside. \
                     Take advantage of the free solar gain and reduce heating. {conditions}"
                ),
                type_: NotificationType::Info,
                priority: Priority::Medium,
            });
        }

        Ok(out)
    }
}
