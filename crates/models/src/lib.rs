mod envelope;
mod notification;
mod recommendation;
mod topic;
mod user;

pub use envelope::{Envelope, EnvelopeType};
pub use notification::{NewNotification, Notification, NotificationType};
pub use recommendation::{Priority, Recommendation};
pub use topic::{Resource, Topic};
pub use user::{User, ROLE_ADMIN};

/// Id is the database identifier of a persisted row.
/// It's serialized as a bare JSON integer.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Id(pub i64);

impl Id {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::str::FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod test {
    use super::Id;

    #[test]
    fn test_id_text_forms() {
        let id: Id = "42".parse().unwrap();
        assert_eq!(id, Id(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert!("4x2".parse::<Id>().is_err());
    }
}
