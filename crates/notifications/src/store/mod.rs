use chrono::{DateTime, Utc};
use models::{Id, NewNotification, Notification, User};
use std::future::Future;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Sort order of listed Notifications, by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub recipient: Option<Id>,
    pub order: Order,
    pub limit: usize,
}

/// NotificationStore is the source of truth for Notifications, and for the
/// ledger of when each Recommendation key was last dispatched.
pub trait NotificationStore: Send + Sync {
    fn insert<'s>(
        &'s self,
        notification: NewNotification,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = anyhow::Result<Notification>> + Send + 's;

    fn fetch<'s>(
        &'s self,
        id: Id,
    ) -> impl Future<Output = anyhow::Result<Option<Notification>>> + Send + 's;

    fn list<'s>(
        &'s self,
        query: ListQuery,
    ) -> impl Future<Output = anyhow::Result<Vec<Notification>>> + Send + 's;

    /// Mark a Notification as read, returning it, or None if it doesn't exist.
    fn mark_read<'s>(
        &'s self,
        id: Id,
    ) -> impl Future<Output = anyhow::Result<Option<Notification>>> + Send + 's;

    /// Delete read Notifications created before `cutoff`, returning them.
    fn delete_read_before<'s>(
        &'s self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = anyhow::Result<Vec<Notification>>> + Send + 's;

    fn last_dispatched<'s>(
        &'s self,
        key: &'s str,
    ) -> impl Future<Output = anyhow::Result<Option<DateTime<Utc>>>> + Send + 's;

    fn record_dispatch<'s>(
        &'s self,
        key: &'s str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send + 's;
}

/// Directory resolves the users who may receive Notifications.
pub trait Directory: Send + Sync {
    fn all_users<'s>(&'s self) -> impl Future<Output = anyhow::Result<Vec<User>>> + Send + 's;

    fn users_with_role<'s>(
        &'s self,
        role: &'s str,
    ) -> impl Future<Output = anyhow::Result<Vec<User>>> + Send + 's;
}
