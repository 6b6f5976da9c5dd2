use crate::NotificationType;

/// Priority of a Recommendation. Priorities are totally ordered,
/// such that `Low < Medium < High < Critical`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation is an ephemeral output of a single evaluation cycle.
/// It's never persisted: dispatching it produces per-recipient Notifications.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recommendation {
    /// Stable name of the condition which produced this Recommendation,
    /// such as `weather.mild` or `fault.42`. The same condition observed in
    /// two cycles has the same key.
    pub key: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub type_: NotificationType,
    pub priority: Priority,
}

#[cfg(test)]
mod test {
    use super::Priority;

    #[test]
    fn test_priority_ordering() {
        let mut all = vec![
            Priority::Critical,
            Priority::Low,
            Priority::High,
            Priority::Medium,
        ];
        all.sort();

        assert_eq!(
            all,
            vec![
                Priority::Low,
                Priority::Medium,
                Priority::High,
                Priority::Critical
            ]
        );
        assert_eq!(
            serde_json::from_str::<Priority>(r#""critical""#).unwrap(),
            Priority::Critical
        );
    }
}
