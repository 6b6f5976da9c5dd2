use super::{signal, Rule};
use crate::Snapshot;
use chrono::{DateTime, Utc};
use models::{NotificationType, Priority, Recommendation};

/// Faults raises one critical Recommendation per faulty unit.
pub struct Faults;

impl Rule for Faults {
    fn name(&self) -> &'static str {
        "faults"
    }

    fn evaluate(
        &self,
        _now: DateTime<Utc>,
        snapshot: &Snapshot,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let units = signal(&snapshot.faulty_units)?;

        Ok(units
            .iter()
            .map(|unit| Recommendation {
                key: format!("fault.{}", unit.unit_id),
                title: "Equipment fault".to_string(),
                message: format!(
                    "Unit \"{}\" in zone \"{}\" has been reported faulty for {}h. \
                     Maintenance is required.",
                    unit.name, unit.zone_name, unit.hours_since_last_fault
                ),
                type_: NotificationType::Error,
                priority: Priority::Critical,
            })
            .collect())
    }
}
