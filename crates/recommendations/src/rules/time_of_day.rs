use super::{signal, Rule};
use crate::{config::TimeOfDayRuleConfig, Snapshot};
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use models::{NotificationType, Priority, Recommendation};

fn local_hour(config: &TimeOfDayRuleConfig, now: DateTime<Utc>) -> anyhow::Result<u32> {
    let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
        anyhow::anyhow!("invalid UTC offset of {} minutes", config.utc_offset_minutes)
    })?;
    Ok(now.with_timezone(&offset).hour())
}

/// Night recommends lowering the heating of night-idle zones
/// while the local hour is within the night window.
pub struct Night {
    pub config: TimeOfDayRuleConfig,
}

impl Rule for Night {
    fn name(&self) -> &'static str {
        "time_of_day.night"
    }

    fn evaluate(
        &self,
        now: DateTime<Utc>,
        snapshot: &Snapshot,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let hour = local_hour(&self.config, now)?;
        if !self.config.night_window.contains(hour) {
            return Ok(Vec::new());
        }
        let units = *signal(&snapshot.night_category_units)?;
        if units == 0 {
            return Ok(Vec::new());
        }
        let category = &self.config.night_category;

        Ok(vec![Recommendation {
            key: "time_of_day.night".to_string(),
            title: "Night period".to_string(),
            message: format!(
                "It is {hour}h. Lower or switch off the heating of the {units} unit(s) \
                 in {category} zones, which are closed at night."
            ),
            type_: NotificationType::Info,
            priority: Priority::Medium,
        }])
    }
}

/// OffPeak notes off-peak electricity hours, regardless of equipment state.
pub struct OffPeak {
    pub config: TimeOfDayRuleConfig,
}

impl Rule for OffPeak {
    fn name(&self) -> &'static str {
        "time_of_day.off_peak"
    }

    fn evaluate(
        &self,
        now: DateTime<Utc>,
        _snapshot: &Snapshot,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let hour = local_hour(&self.config, now)?;
        if !self.config.off_peak_window.contains(hour) {
            return Ok(Vec::new());
        }

        Ok(vec![Recommendation {
            key: "time_of_day.off_peak".to_string(),
            title: "Off-peak hours".to_string(),
            message: format!(
                "It is {hour}h and off-peak rates apply. \
                 This is the ideal time for non-urgent, energy-intensive operations."
            ),
            type_: NotificationType::Info,
            priority: Priority::Low,
        }])
    }
}
