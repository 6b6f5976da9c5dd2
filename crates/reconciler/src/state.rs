use crate::Alert;
use models::{Envelope, Id, Notification};

/// Reconciler is a client's local view of its Notifications: newest first,
/// with each id appearing at most once.
///
/// It's seeded from an authoritative fetch and then kept current by
/// applying pushed Envelopes. A Reconciler scoped to a recipient ignores
/// pushed Notifications of other users, and one with a limit keeps only
/// that many of the newest Notifications, as its fetch does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciler {
    notifications: Vec<Notification>,
    recipient: Option<Id>,
    limit: Option<usize>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipient(mut self, recipient: Option<Id>) -> Self {
        self.recipient = recipient;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Replace the local view with an authoritative, newest-first listing.
    pub fn seed(&mut self, notifications: Vec<Notification>) {
        let mut seen = std::collections::HashSet::new();
        self.notifications = notifications
            .into_iter()
            .filter(|n| seen.insert(n.id))
            .collect();
    }

    /// Apply a pushed Envelope, returning an Alert if it announced
    /// a Notification which wasn't already present.
    pub fn apply(&mut self, envelope: Envelope<Notification>) -> Option<Alert> {
        match envelope {
            Envelope::New(incoming) | Envelope::Update(incoming)
                if self.recipient.is_some_and(|r| r != incoming.recipient_id) =>
            {
                tracing::debug!(
                    id = %incoming.id,
                    recipient_id = %incoming.recipient_id,
                    "ignoring notification of another recipient"
                );
                None
            }
            Envelope::New(incoming) => {
                if self.position(incoming.id).is_some() {
                    tracing::debug!(id = %incoming.id, "ignoring duplicate NEW");
                    return None;
                }
                let alert = Alert::for_notification(&incoming);
                self.notifications.insert(0, incoming);
                if let Some(limit) = self.limit {
                    self.notifications.truncate(limit);
                }
                Some(alert)
            }
            Envelope::Update(incoming) => {
                // Updates of Notifications we've never seen are ignored:
                // they're older than our listing, or not ours to show.
                let Some(index) = self.position(incoming.id) else {
                    tracing::debug!(id = %incoming.id, "ignoring UPDATE of unseen notification");
                    return None;
                };
                let current = &mut self.notifications[index];
                let is_read = current.is_read || incoming.is_read;
                *current = Notification {
                    is_read,
                    ..incoming
                };
                None
            }
            Envelope::Delete(incoming) => {
                if let Some(index) = self.position(incoming.id) {
                    self.notifications.remove(index);
                }
                None
            }
        }
    }

    /// Optimistically mark a Notification as read,
    /// returning whether it changed.
    pub fn mark_read_locally(&mut self, id: Id) -> bool {
        match self.position(id) {
            Some(index) => self.notifications[index].mark_read(),
            None => false,
        }
    }

    /// Undo an optimistic `mark_read_locally` whose remote update failed.
    pub fn rollback_read(&mut self, id: Id) {
        if let Some(index) = self.position(id) {
            self.notifications[index].is_read = false;
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    fn position(&self, id: Id) -> Option<usize> {
        self.notifications.iter().position(|n| n.id == id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Severity;
    use chrono::TimeZone;
    use models::NotificationType;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn notification(id: i64, type_: NotificationType, is_read: bool) -> Notification {
        for_recipient(id, 1, type_, is_read)
    }

    fn for_recipient(id: i64, recipient: i64, type_: NotificationType, is_read: bool) -> Notification {
        Notification {
            id: Id(id),
            recipient_id: Id(recipient),
            title: format!("title {id}"),
            message: format!("message {id}"),
            type_,
            is_read,
            created_at: chrono::Utc
                .with_ymd_and_hms(2024, 3, 1, 10, 0, 0)
                .unwrap()
                + chrono::Duration::minutes(id),
        }
    }

    fn ids(r: &Reconciler) -> Vec<i64> {
        r.notifications().iter().map(|n| n.id.get()).collect()
    }

    #[test]
    fn test_duplicate_new_is_applied_once() {
        let mut r = Reconciler::new();
        r.seed(Vec::new());

        let first = r.apply(Envelope::New(notification(5, NotificationType::Error, false)));
        let second = r.apply(Envelope::New(notification(5, NotificationType::Error, false)));

        assert_eq!(ids(&r), vec![5]);
        let alert = first.unwrap();
        assert_eq!(
            (alert.severity, alert.duration),
            (Severity::Error, Duration::from_secs(30))
        );
        assert_eq!(second, None);
    }

    #[test]
    fn test_update_of_unseen_id_is_ignored() {
        let mut r = Reconciler::new();
        r.seed(Vec::new());

        assert_eq!(
            r.apply(Envelope::Update(notification(99, NotificationType::Info, true))),
            None
        );
        assert!(r.notifications().is_empty());
    }

    #[test]
    fn test_new_prepends_and_alerts_by_type() {
        let mut r = Reconciler::new();
        r.seed(vec![
            notification(2, NotificationType::Info, false),
            notification(1, NotificationType::Info, true),
        ]);

        let alert = r
            .apply(Envelope::New(notification(3, NotificationType::Warning, false)))
            .unwrap();
        assert_eq!(
            (alert.severity, alert.duration),
            (Severity::Warning, Duration::from_secs(7))
        );
        let alert = r
            .apply(Envelope::New(notification(4, NotificationType::Maintenance, false)))
            .unwrap();
        assert_eq!(
            (alert.severity, alert.duration),
            (Severity::Info, Duration::from_secs(5))
        );

        assert_eq!(ids(&r), vec![4, 3, 2, 1]);
        assert_eq!(r.unread_count(), 3);
    }

    #[test]
    fn test_update_keeps_read_state_monotonic() {
        let mut r = Reconciler::new();
        r.seed(vec![
            notification(2, NotificationType::Info, true),
            notification(1, NotificationType::Info, false),
        ]);

        // A stale update can't un-read a notification.
        let mut stale = notification(2, NotificationType::Info, false);
        stale.title = "renamed".to_string();
        r.apply(Envelope::Update(stale));
        r.apply(Envelope::Update(notification(1, NotificationType::Info, true)));

        assert_eq!(r.notifications()[0].title, "renamed");
        assert!(r.notifications().iter().all(|n| n.is_read));
        assert_eq!(ids(&r), vec![2, 1]);
    }

    #[test]
    fn test_delete_removes_if_present() {
        let mut r = Reconciler::new();
        r.seed(vec![
            notification(2, NotificationType::Info, true),
            notification(1, NotificationType::Info, false),
        ]);

        r.apply(Envelope::Delete(notification(2, NotificationType::Info, true)));
        r.apply(Envelope::Delete(notification(7, NotificationType::Info, true)));
        assert_eq!(ids(&r), vec![1]);
    }

    #[test]
    fn test_seed_replaces_and_deduplicates() {
        let mut r = Reconciler::new();
        r.apply(Envelope::New(notification(9, NotificationType::Info, false)));

        r.seed(vec![
            notification(3, NotificationType::Info, false),
            notification(3, NotificationType::Info, false),
            notification(2, NotificationType::Info, false),
        ]);
        assert_eq!(ids(&r), vec![3, 2]);
    }

    #[test]
    fn test_optimistic_read_and_rollback() {
        let mut r = Reconciler::new();
        r.seed(vec![notification(1, NotificationType::Info, false)]);

        assert!(r.mark_read_locally(Id(1)));
        assert!(!r.mark_read_locally(Id(1)));
        assert!(!r.mark_read_locally(Id(404)));
        assert_eq!(r.unread_count(), 0);

        r.rollback_read(Id(1));
        assert_eq!(r.unread_count(), 1);
    }

    #[test]
    fn test_no_duplicate_ids_under_any_sequence() {
        let mut r = Reconciler::new();
        r.seed(vec![notification(1, NotificationType::Info, false)]);

        for step in 0..60i64 {
            let id = step % 4;
            let n = notification(id, NotificationType::Info, step % 3 == 0);
            match step % 5 {
                0 | 1 => r.apply(Envelope::New(n)),
                2 => r.apply(Envelope::Update(n)),
                3 => r.apply(Envelope::Delete(n)),
                _ => {
                    r.mark_read_locally(Id(id));
                    None
                }
            };
            let mut all = ids(&r);
            let len = all.len();
            all.sort();
            all.dedup();
            assert_eq!(all.len(), len, "duplicate ids after step {step}");
        }
    }

    #[test]
    fn test_scoped_reconciler_ignores_other_recipients() {
        let listing = vec![for_recipient(1, 1, NotificationType::Info, false)];
        let mut r = Reconciler::new().with_recipient(Some(Id(1)));
        r.seed(listing.clone());

        // An admin-only fault of another user is pushed on the shared topic.
        assert_eq!(
            r.apply(Envelope::New(for_recipient(2, 2, NotificationType::Error, false))),
            None
        );
        r.apply(Envelope::Update(for_recipient(1, 2, NotificationType::Info, true)));

        // Pushed state is what a fetch of the recipient's notifications gives.
        let mut fetched = Reconciler::new();
        fetched.seed(listing);
        assert_eq!(r.notifications(), fetched.notifications());

        assert!(r
            .apply(Envelope::New(for_recipient(3, 1, NotificationType::Info, false)))
            .is_some());
        assert_eq!(ids(&r), vec![3, 1]);

        // An unscoped reconciler takes in everyone's notifications.
        let mut unscoped = Reconciler::new();
        unscoped.apply(Envelope::New(for_recipient(2, 2, NotificationType::Error, false)));
        assert_eq!(ids(&unscoped), vec![2]);
    }

    #[test]
    fn test_new_keeps_list_within_limit() {
        let mut r = Reconciler::new().with_limit(3);
        r.seed(vec![
            notification(2, NotificationType::Info, false),
            notification(1, NotificationType::Info, false),
        ]);

        for id in 3..=6 {
            r.apply(Envelope::New(notification(id, NotificationType::Info, false)));
        }
        assert_eq!(ids(&r), vec![6, 5, 4]);
    }
}
