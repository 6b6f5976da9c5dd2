use crate::Id;

/// Resource is implemented by every entity type which is published
/// through the pub/sub hub. Each type maps to exactly one collection.
pub trait Resource {
    /// Canonical path of the resource's collection, which is also its Topic.
    const COLLECTION: &'static str;

    fn id(&self) -> Id;
}

/// Topic identifies a pub/sub channel. There is one Topic per resource
/// collection, equal to the collection's canonical path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    /// The Topic of resource type `R`.
    pub fn of<R: Resource>() -> Self {
        Self(R::COLLECTION.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::Topic;
    use crate::Notification;

    #[test]
    fn test_notification_topic() {
        assert_eq!(Topic::of::<Notification>().as_str(), "/api/notifications");
        assert_eq!(Topic::of::<Notification>(), Topic::new("/api/notifications"));
    }
}
