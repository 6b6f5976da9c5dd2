use super::{Directory, ListQuery, NotificationStore, Order};
use chrono::{DateTime, Utc};
use models::{Id, NewNotification, Notification, User};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// MemoryStore keeps Notifications and users in process memory.
/// It backs tests and the agent's `--in-memory` development mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<Mutex<MemoryInner>>);

#[derive(Debug, Default)]
struct MemoryInner {
    users: Vec<User>,
    notifications: BTreeMap<Id, Notification>,
    next_id: i64,
    ledger: HashMap<String, DateTime<Utc>>,
    failing_recipients: HashSet<Id>,
}

impl MemoryStore {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::default();
        store.lock().users.extend(users);
        store
    }

    pub fn add_user(&self, user: User) {
        self.lock().users.push(user);
    }

    /// Fail every future insert of a Notification for `recipient`.
    pub fn fail_inserts_for(&self, recipient: Id) {
        self.lock().failing_recipients.insert(recipient);
    }

    /// All stored Notifications, in ascending id order.
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationStore for MemoryStore {
    async fn insert<'s>(
        &'s self,
        notification: NewNotification,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<Notification> {
        let mut inner = self.lock();

        if inner.failing_recipients.contains(&notification.recipient_id) {
            anyhow::bail!(
                "insert of notification for recipient {} failed",
                notification.recipient_id
            );
        }
        inner.next_id += 1;

        let NewNotification {
            recipient_id,
            title,
            message,
            type_,
        } = notification;

        let notification = Notification {
            id: Id(inner.next_id),
            recipient_id,
            title,
            message,
            type_,
            is_read: false,
            created_at,
        };
        inner
            .notifications
            .insert(notification.id, notification.clone());

        Ok(notification)
    }

    async fn fetch<'s>(&'s self, id: Id) -> anyhow::Result<Option<Notification>> {
        Ok(self.lock().notifications.get(&id).cloned())
    }

    async fn list<'s>(&'s self, query: ListQuery) -> anyhow::Result<Vec<Notification>> {
        let ListQuery {
            recipient,
            order,
            limit,
        } = query;

        let mut out: Vec<Notification> = self
            .lock()
            .notifications
            .values()
            .filter(|n| recipient.map_or(true, |id| n.recipient_id == id))
            .cloned()
            .collect();

        out.sort_by(|l, r| (l.created_at, l.id).cmp(&(r.created_at, r.id)));
        if order == Order::Desc {
            out.reverse();
        }
        out.truncate(limit);

        Ok(out)
    }

    async fn mark_read<'s>(&'s self, id: Id) -> anyhow::Result<Option<Notification>> {
        Ok(self.lock().notifications.get_mut(&id).map(|n| {
            n.mark_read();
            n.clone()
        }))
    }

    async fn delete_read_before<'s>(
        &'s self,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>> {
        let mut inner = self.lock();

        let expired: Vec<Id> = inner
            .notifications
            .values()
            .filter(|n| n.is_read && n.created_at < cutoff)
            .map(|n| n.id)
            .collect();

        Ok(expired
            .into_iter()
            .filter_map(|id| inner.notifications.remove(&id))
            .collect())
    }

    async fn last_dispatched<'s>(&'s self, key: &'s str) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.lock().ledger.get(key).copied())
    }

    async fn record_dispatch<'s>(&'s self, key: &'s str, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.lock().ledger.insert(key.to_string(), at);
        Ok(())
    }
}

impl Directory for MemoryStore {
    async fn all_users<'s>(&'s self) -> anyhow::Result<Vec<User>> {
        Ok(self.lock().users.clone())
    }

    async fn users_with_role<'s>(&'s self, role: &'s str) -> anyhow::Result<Vec<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|user| user.has_role(role))
            .cloned()
            .collect())
    }
}
