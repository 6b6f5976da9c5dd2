use crate::{Id, Resource};
use chrono::{DateTime, Utc};

/// NotificationType is the display category of a Notification.
///
/// Rules only ever produce `info`, `warning` and `error`, but rows written
/// by other parts of the platform may carry the remaining types. Any other
/// string is read as `Unknown` rather than failing the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Info,
    Warning,
    Error,
    Maintenance,
    System,
    Module,
    #[serde(other)]
    Unknown,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Maintenance => "maintenance",
            Self::System => "system",
            Self::Module => "module",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from the stored column value. Never fails.
    pub fn parse(s: &str) -> Self {
        match s {
            "info" => Self::Info,
            "warning" => Self::Warning,
            "error" => Self::Error,
            "maintenance" => Self::Maintenance,
            "system" => Self::System,
            "module" => Self::Module,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification is a persisted message delivered to exactly one recipient.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Id,
    pub recipient_id: Id,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub type_: NotificationType,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Mark this Notification as read, returning whether it changed.
    /// There is intentionally no way to mark a Notification as unread.
    pub fn mark_read(&mut self) -> bool {
        let changed = !self.is_read;
        self.is_read = true;
        changed
    }
}

impl Resource for Notification {
    const COLLECTION: &'static str = "/api/notifications";

    fn id(&self) -> Id {
        self.id
    }
}

/// NewNotification is a Notification which has not yet been persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: Id,
    pub title: String,
    pub message: String,
    pub type_: NotificationType,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> Notification {
        Notification {
            id: Id(5),
            recipient_id: Id(1),
            title: "Fault detected".to_string(),
            message: "Boiler B2 is faulty".to_string(),
            type_: NotificationType::Error,
            is_read: false,
            created_at: "2024-03-01T10:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_wire_shape() {
        insta::assert_json_snapshot!(fixture(), @r###"
        {
          "id": 5,
          "recipientId": 1,
          "title": "Fault detected",
          "message": "Boiler B2 is faulty",
          "type": "error",
          "isRead": false,
          "createdAt": "2024-03-01T10:00:00Z"
        }
        "###);
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let mut doc = serde_json::to_value(fixture()).unwrap();
        doc["type"] = serde_json::json!("holiday");

        let parsed: Notification = serde_json::from_value(doc).unwrap();
        assert_eq!(parsed.type_, NotificationType::Unknown);
        assert_eq!(NotificationType::parse("holiday"), NotificationType::Unknown);
        assert_eq!(NotificationType::parse("warning"), NotificationType::Warning);
    }

    #[test]
    fn test_mark_read_never_reverts() {
        let mut n = fixture();
        assert!(n.mark_read());
        assert!(n.is_read);
        assert!(!n.mark_read());
        assert!(n.is_read);
    }
}
