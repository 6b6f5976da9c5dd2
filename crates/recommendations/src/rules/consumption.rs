use super::{signal, Rule};
use crate::{config::ConsumptionRuleConfig, Snapshot};
use chrono::{DateTime, Utc};
use models::{NotificationType, Priority, Recommendation};

/// OverConsumption warns when recent consumption exceeds
/// the daily baseline by more than the configured factor.
pub struct OverConsumption {
    pub config: ConsumptionRuleConfig,
}

impl Rule for OverConsumption {
    fn name(&self) -> &'static str {
        "consumption"
    }

    fn evaluate(
        &self,
        _now: DateTime<Utc>,
        snapshot: &Snapshot,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let window = signal(&snapshot.consumption)?;
        let (recent, baseline) = (window.last_24h, window.avg_daily_30d);

        // Without a baseline there's nothing to compare against.
        if !(baseline > 0.0) || recent <= baseline * self.config.factor {
            return Ok(Vec::new());
        }
        let increase = ((recent - baseline) / baseline * 1000.0).round() / 10.0;

        Ok(vec![Recommendation {
            key: "consumption.over".to_string(),
            title: "Over-consumption detected".to_string(),
            message: format!(
                "Consumption over the recent period is {increase}% above normal \
                 ({recent} vs. a daily average of {baseline}). \
                 Check equipment and temperature set points."
            ),
            type_: NotificationType::Warning,
            priority: Priority::High,
        }])
    }
}
