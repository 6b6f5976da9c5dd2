use crate::SchedulerConfig;
use anyhow::Context;
use notifications::{DispatcherConfig, EmailConfig};
use recommendations::EvaluatorConfig;
use reconciler::SubscriptionConfig;
use signals::OpenMeteoConfig;
use std::time::Duration;

/// Settings of the agent, read from an optional YAML file.
/// Every section and field is optional and has a default.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub evaluator: EvaluatorConfig,
    pub dispatcher: DispatcherConfig,
    pub scheduler: SchedulerConfig,
    pub email: EmailConfig,
    pub weather: OpenMeteoConfig,
    pub subscription: SubscriptionConfig,
    pub http: HttpConfig,
    /// Users of the in-memory store, used by `serve --in-memory`.
    pub dev_users: Vec<models::User>,
}

/// Timeouts of outbound HTTP calls: Resend, Open-Meteo, remote hubs,
/// and the agent API used by `watch`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    /// Bound of a complete request and response.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl HttpConfig {
    /// Client of request/response calls, each bounded by `timeout`.
    pub fn client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .context("building HTTP client")
    }

    /// Client of long-lived event streams. Only connecting is bounded,
    /// and requests set their own timeouts.
    pub fn streaming_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .context("building streaming HTTP client")
    }
}

impl Settings {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let settings: Settings = serde_yaml::from_str(content).context("parsing settings")?;
        settings.evaluator.validate()?;
        Ok(settings)
    }

    /// Load Settings from `path`, or use defaults if there's no path.
    pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("loading settings file {}", path.display()))
    }
}
