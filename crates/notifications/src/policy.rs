use models::Priority;

/// AudiencePolicy decides who receives a Recommendation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudiencePolicy {
    /// Recommendations of at least this priority go to administrators only.
    /// When unset, every Recommendation goes to all users.
    pub admins_only_from: Option<Priority>,
}

impl Default for AudiencePolicy {
    fn default() -> Self {
        Self {
            admins_only_from: Some(Priority::High),
        }
    }
}

impl AudiencePolicy {
    pub fn admins_only(&self, priority: Priority) -> bool {
        self.admins_only_from.is_some_and(|from| priority >= from)
    }
}

/// ChannelPolicy decides which channels, beyond in-app, carry a Recommendation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelPolicy {
    /// Recommendations of at least this priority are also emailed.
    /// When unset, nothing is emailed.
    pub email_from: Option<Priority>,
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        Self {
            email_from: Some(Priority::High),
        }
    }
}

impl ChannelPolicy {
    pub fn send_email(&self, priority: Priority) -> bool {
        self.email_from.is_some_and(|from| priority >= from)
    }
}

/// DeliveryPolicy pairs independently-tuned audience and channel policies.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeliveryPolicy {
    pub audience: AudiencePolicy,
    pub channels: ChannelPolicy,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let policy = DeliveryPolicy::default();

        for (priority, expect) in [
            (Priority::Low, false),
            (Priority::Medium, false),
            (Priority::High, true),
            (Priority::Critical, true),
        ] {
            assert_eq!(policy.audience.admins_only(priority), expect);
            assert_eq!(policy.channels.send_email(priority), expect);
        }
    }

    #[test]
    fn test_policies_are_independent() {
        let policy: DeliveryPolicy = serde_yaml::from_str(
            r#"
            audience:
              adminsOnlyFrom: critical
            channels:
              emailFrom: null
            "#,
        )
        .unwrap();

        assert!(!policy.audience.admins_only(Priority::High));
        assert!(policy.audience.admins_only(Priority::Critical));
        assert!(!policy.channels.send_email(Priority::Critical));

        // Omitted policies keep their defaults.
        let policy: DeliveryPolicy = serde_yaml::from_str("channels:\n  emailFrom: medium\n").unwrap();
        assert_eq!(policy.audience, AudiencePolicy::default());
        assert!(policy.channels.send_email(Priority::Medium));
    }
}
