use chrono::{DateTime, Utc};
use notifications::{Directory, DispatchSummary, Dispatcher, EmailSender, NotificationStore};
use pubsub::Publish;
use recommendations::{Evaluation, Evaluator, Snapshot};
use signals::{EquipmentReader, WeatherReader};

/// CycleOutcome is the result of one evaluation cycle.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CycleOutcome {
    pub evaluation: Evaluation,
    /// Tally of dispatched Recommendations, or None if the cycle was a dry run.
    pub dispatch: Option<DispatchSummary>,
}

impl CycleOutcome {
    /// A cycle fails if any of its Recommendations could not be dispatched.
    /// Failed rules and unavailable signals are logged, and aren't failures.
    pub fn is_success(&self) -> bool {
        self.dispatch
            .as_ref()
            .map(|summary| summary.failed == 0)
            .unwrap_or(true)
    }
}

/// Collect a Snapshot of signals and evaluate it, without dispatching.
pub async fn evaluate<W, Q>(
    weather: &W,
    equipment: &Q,
    evaluator: &Evaluator,
    now: DateTime<Utc>,
) -> Evaluation
where
    W: WeatherReader,
    Q: EquipmentReader,
{
    let snapshot = Snapshot::collect(weather, equipment, evaluator.config(), now).await;
    evaluator.evaluate(now, &snapshot)
}

/// Run one full cycle: collect, evaluate, and dispatch every Recommendation.
#[tracing::instrument(skip_all, fields(%now))]
pub async fn run_cycle<W, Q, S, E, P>(
    weather: &W,
    equipment: &Q,
    evaluator: &Evaluator,
    dispatcher: &Dispatcher<S, E, P>,
    now: DateTime<Utc>,
) -> CycleOutcome
where
    W: WeatherReader,
    Q: EquipmentReader,
    S: NotificationStore + Directory,
    E: EmailSender,
    P: Publish,
{
    let evaluation = evaluate(weather, equipment, evaluator, now).await;
    let dispatch = dispatcher
        .dispatch_all(&evaluation.recommendations, now)
        .await;

    tracing::info!(
        recommendations = dispatch.recommendations,
        notifications = dispatch.notifications,
        suppressed = dispatch.suppressed,
        failed = dispatch.failed,
        failed_rules = evaluation.failures.len(),
        "completed evaluation cycle"
    );

    CycleOutcome {
        evaluation,
        dispatch: Some(dispatch),
    }
}

/// NoEquipment is an EquipmentReader for deployments without an equipment
/// database. Its signals are always unavailable, and the rules which need
/// them are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEquipment;

impl EquipmentReader for NoEquipment {
    async fn faulty_units_since<'s>(
        &'s self,
        _now: DateTime<Utc>,
        _window: std::time::Duration,
        _status_slug: &'s str,
    ) -> anyhow::Result<Vec<signals::FaultyUnit>> {
        anyhow::bail!("no equipment database is configured")
    }

    async fn consumption_window<'s>(
        &'s self,
        _now: DateTime<Utc>,
        _recent: std::time::Duration,
        _baseline: std::time::Duration,
    ) -> anyhow::Result<signals::ConsumptionWindow> {
        anyhow::bail!("no equipment database is configured")
    }

    async fn units_in_category<'s>(&'s self, _category: &'s str) -> anyhow::Result<usize> {
        anyhow::bail!("no equipment database is configured")
    }
}
