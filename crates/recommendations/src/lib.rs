//! The condition evaluator: a fixed set of rules over a Snapshot of
//! operational signals, which produces the Recommendations of a cycle.
//!
//! Reading signals (`Snapshot::collect`) is separated from evaluating them
//! (`Evaluator::evaluate`), which is a pure function of its inputs.
mod config;
pub mod rules;
mod snapshot;

pub use config::{
    ConsumptionRuleConfig, EvaluatorConfig, FaultRuleConfig, HourWindow, TimeOfDayRuleConfig,
    WeatherRuleConfig,
};
pub use snapshot::{Signal, SignalError, Snapshot};

use chrono::{DateTime, Utc};
use models::Recommendation;
use rules::Rule;

/// RuleFailure records a rule which failed to evaluate and was skipped.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RuleFailure {
    pub rule: &'static str,
    pub error: String,
}

/// Evaluation is the outcome of evaluating all rules against a Snapshot.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Evaluation {
    /// Recommendations in rule order, then in the order each rule produced them.
    pub recommendations: Vec<Recommendation>,
    pub failures: Vec<RuleFailure>,
}

pub struct Evaluator {
    config: EvaluatorConfig,
    rules: Vec<Box<dyn Rule>>,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(rules::Weather {
                config: config.weather.clone(),
            }),
            Box::new(rules::Night {
                config: config.time_of_day.clone(),
            }),
            Box::new(rules::OffPeak {
                config: config.time_of_day.clone(),
            }),
            Box::new(rules::Faults),
            Box::new(rules::OverConsumption {
                config: config.consumption.clone(),
            }),
        ];

        Ok(Self { config, rules })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate every rule against `snapshot`. A rule which fails or panics
    /// contributes nothing, and is reported in `Evaluation::failures`.
    pub fn evaluate(&self, now: DateTime<Utc>, snapshot: &Snapshot) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for rule in &self.rules {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                rule.evaluate(now, snapshot)
            }))
            .unwrap_or_else(|_| Err(anyhow::anyhow!("rule panicked")));

            match outcome {
                Ok(mut out) => {
                    tracing::debug!(rule = rule.name(), count = out.len(), "evaluated rule");
                    evaluation.recommendations.append(&mut out);
                }
                Err(err) => {
                    tracing::warn!(rule = rule.name(), error = ?err, "rule evaluation failed");
                    evaluation.failures.push(RuleFailure {
                        rule: rule.name(),
                        error: format!("{err:#}"),
                    });
                }
            }
        }
        evaluation
    }
}
