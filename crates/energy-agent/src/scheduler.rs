use crate::cycle::run_cycle;
use notifications::{Directory, Dispatcher, EmailSender, NotificationStore};
use pubsub::Publish;
use rand::Rng;
use recommendations::Evaluator;
use signals::{EquipmentReader, WeatherReader};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Interval between evaluation cycles.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Each cycle is delayed or advanced by a uniform random offset of up
    /// to this amount.
    #[serde(with = "humantime_serde")]
    pub jitter: Duration,
    /// Interval between sweeps of read Notifications.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Run a first cycle immediately, rather than after one interval.
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            jitter: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(86_400),
            run_on_start: false,
        }
    }
}

/// Returns `interval` offset by a uniform random amount in `[-jitter, +jitter]`.
pub fn jittered<R: Rng>(interval: Duration, jitter: Duration, rng: &mut R) -> Duration {
    if jitter.is_zero() {
        return interval;
    }
    let jitter = jitter.as_millis() as i64;
    let offset = rng.gen_range(-jitter..=jitter);
    let millis = (interval.as_millis() as i64 + offset).max(0);

    Duration::from_millis(millis as u64)
}

/// Scheduler periodically runs evaluation cycles and retention sweeps.
///
/// Cycles are strictly sequential within a Scheduler. Nothing coordinates
/// the Schedulers of separate agent processes.
pub struct Scheduler<W, Q, S, E, P> {
    pub config: SchedulerConfig,
    pub weather: W,
    pub equipment: Q,
    pub evaluator: Evaluator,
    pub dispatcher: Arc<Dispatcher<S, E, P>>,
}

impl<W, Q, S, E, P> Scheduler<W, Q, S, E, P>
where
    W: WeatherReader,
    Q: EquipmentReader,
    S: NotificationStore + Directory,
    E: EmailSender,
    P: Publish,
{
    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let SchedulerConfig {
            interval,
            jitter,
            sweep_interval,
            run_on_start,
        } = self.config.clone();

        let first = if run_on_start {
            Duration::ZERO
        } else {
            jittered(interval, jitter, &mut rand::thread_rng())
        };
        let mut next_cycle = tokio::time::Instant::now() + first;
        let mut next_sweep = tokio::time::Instant::now() + sweep_interval;

        tracing::info!(?interval, ?jitter, ?sweep_interval, "starting scheduler");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep_until(next_cycle) => {
                    let outcome = run_cycle(
                        &self.weather,
                        &self.equipment,
                        &self.evaluator,
                        &*self.dispatcher,
                        chrono::Utc::now(),
                    )
                    .await;

                    if !outcome.is_success() {
                        tracing::warn!(dispatch = ?outcome.dispatch, "evaluation cycle had failures");
                    }
                    next_cycle = tokio::time::Instant::now()
                        + jittered(interval, jitter, &mut rand::thread_rng());
                }
                _ = tokio::time::sleep_until(next_sweep) => {
                    let retention = self.dispatcher.config().retention;

                    if let Err(err) = self
                        .dispatcher
                        .sweep_read_notifications(chrono::Utc::now(), retention)
                        .await
                    {
                        tracing::error!(error = ?err, "failed to sweep read notifications");
                    }
                    next_sweep = tokio::time::Instant::now() + sweep_interval;
                }
            }
        }
        tracing::info!("scheduler stopped");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        let interval = Duration::from_secs(3600);
        let jitter = Duration::from_secs(30);

        let samples: Vec<_> = (0..1000)
            .map(|_| jittered(interval, jitter, &mut rng))
            .collect();

        assert!(samples
            .iter()
            .all(|d| *d >= interval - jitter && *d <= interval + jitter));
        assert!(samples.iter().any(|d| *d < interval));
        assert!(samples.iter().any(|d| *d > interval));
    }

    #[test]
    fn test_jitter_edge_cases() {
        let mut rng = SmallRng::seed_from_u64(7);
        let interval = Duration::from_millis(10);

        assert_eq!(jittered(interval, Duration::ZERO, &mut rng), interval);
        for _ in 0..100 {
            // Never negative, even if jitter exceeds the interval.
            assert!(jittered(interval, Duration::from_secs(1), &mut rng) <= Duration::from_millis(1010));
        }
    }
}
