use crate::Snapshot;
use chrono::{DateTime, Utc};
use models::Recommendation;

mod consumption;
mod faults;
mod time_of_day;
mod weather;

pub use consumption::OverConsumption;
pub use faults::Faults;
pub use time_of_day::{Night, OffPeak};
pub use weather::Weather;

/// Rule maps a Snapshot of signals into zero or more Recommendations.
/// Rules are pure: they never read the clock and never perform I/O.
pub trait Rule: Send + Sync {
    /// Stable name of the rule, used in logs and failure reports.
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        now: DateTime<Utc>,
        snapshot: &Snapshot,
    ) -> anyhow::Result<Vec<Recommendation>>;
}

/// Borrow a signal of the snapshot, or fail the rule if it's unavailable.
fn signal<T>(signal: &crate::Signal<T>) -> anyhow::Result<&T> {
    signal.as_ref().map_err(|err| anyhow::anyhow!(err.clone()))
}
