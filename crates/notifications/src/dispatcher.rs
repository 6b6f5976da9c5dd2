use crate::{DeliveryPolicy, Directory, EmailSender, NotificationStore, Recipient, Renderer};
use anyhow::Context;
use chrono::{DateTime, Utc};
use models::{
    Envelope, Id, NewNotification, Notification, NotificationType, Recommendation, User,
    ROLE_ADMIN,
};
use pubsub::{publish_envelope, Publish};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DispatcherConfig {
    pub policy: DeliveryPolicy,
    /// When set, a Recommendation is suppressed if its key was dispatched
    /// less than this long ago. When unset, every cycle dispatches afresh.
    #[serde(with = "humantime_serde")]
    pub cooldown: Option<Duration>,
    /// Age after which read Notifications are swept.
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            policy: DeliveryPolicy::default(),
            cooldown: None,
            retention: Duration::from_secs(30 * 86_400),
        }
    }
}

/// Dispatched is the outcome of dispatching one Recommendation.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Sent {
        notifications: Vec<Notification>,
        admins_only: bool,
        emailed: bool,
    },
    /// The Recommendation's key is within its cooldown.
    Suppressed { last_dispatched_at: DateTime<Utc> },
}

/// DispatchSummary tallies the dispatch of a cycle's Recommendations.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchSummary {
    pub recommendations: usize,
    pub notifications: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// Dispatcher fans Recommendations out into per-recipient Notifications:
/// persisting each, publishing it, and optionally emailing it.
pub struct Dispatcher<S, E, P> {
    store: S,
    email: E,
    publisher: P,
    renderer: Renderer,
    config: DispatcherConfig,
}

impl<S, E, P> Dispatcher<S, E, P>
where
    S: NotificationStore + Directory,
    E: EmailSender,
    P: Publish,
{
    pub fn new(
        store: S,
        email: E,
        publisher: P,
        renderer: Renderer,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            email,
            publisher,
            renderer,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Send a Notification to every user, or only to administrators.
    /// A recipient which fails is logged and skipped. This fails only if
    /// recipients cannot be resolved.
    pub async fn send_to_all(
        &self,
        title: &str,
        message: &str,
        type_: NotificationType,
        send_email: bool,
        only_admins: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>> {
        let users = match only_admins {
            true => self.store.users_with_role(ROLE_ADMIN).await,
            false => self.store.all_users().await,
        };
        let users = users.context("resolving notification recipients")?;

        let mut out = Vec::with_capacity(users.len());

        for user in &users {
            match self
                .send_to_user(user, title, message, type_, send_email, now)
                .await
            {
                Ok(notification) => out.push(notification),
                Err(err) => {
                    tracing::warn!(user_id = %user.id, error = ?err, "failed to notify user");
                }
            }
        }

        tracing::debug!(
            recipients = users.len(),
            sent = out.len(),
            only_admins,
            "sent notification to users"
        );
        Ok(out)
    }

    /// Persist a Notification for `user` and publish it. Publish and email
    /// failures are logged, and don't undo the persisted Notification.
    pub async fn send_to_user(
        &self,
        user: &User,
        title: &str,
        message: &str,
        type_: NotificationType,
        send_email: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Notification> {
        let notification = self
            .store
            .insert(
                NewNotification {
                    recipient_id: user.id,
                    title: title.to_string(),
                    message: message.to_string(),
                    type_,
                },
                now,
            )
            .await?;

        let envelope = Envelope::New(notification);
        publish_envelope(&self.publisher, &envelope).await;
        let notification = envelope.into_data();

        if send_email {
            self.email_user(user, &notification).await;
        }
        Ok(notification)
    }

    async fn email_user(&self, user: &User, notification: &Notification) {
        let Some(email) = user.email.clone().filter(|email| !email.is_empty()) else {
            tracing::warn!(user_id = %user.id, "user has no email address, skipping email");
            return;
        };
        let recipient = Recipient {
            email,
            full_name: user.full_name.clone(),
        };

        let result = match self.renderer.render_email(recipient, notification) {
            Ok(email) => self.email.send(email).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            tracing::warn!(
                user_id = %user.id,
                notification_id = %notification.id,
                error = ?err,
                "failed to email notification"
            );
        }
    }

    /// Mark a Notification as read, publishing the change.
    /// Returns None if no such Notification exists.
    pub async fn mark_as_read(&self, id: Id) -> anyhow::Result<Option<Notification>> {
        let Some(current) = self.store.fetch(id).await? else {
            return Ok(None);
        };
        if current.is_read {
            return Ok(Some(current));
        }
        let Some(notification) = self.store.mark_read(id).await? else {
            return Ok(None);
        };

        let envelope = Envelope::Update(notification);
        publish_envelope(&self.publisher, &envelope).await;
        Ok(Some(envelope.into_data()))
    }

    /// Dispatch one Recommendation under the configured delivery policy.
    #[tracing::instrument(skip_all, fields(key = %recommendation.key, priority = %recommendation.priority))]
    pub async fn dispatch(
        &self,
        recommendation: &Recommendation,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Dispatched> {
        let Recommendation {
            key,
            title,
            message,
            type_,
            priority,
        } = recommendation;

        if let Some(cooldown) = self.config.cooldown {
            let last = self
                .store
                .last_dispatched(key)
                .await
                .context("fetching last dispatch of recommendation")?;

            if let Some(last_dispatched_at) = last {
                let cooldown = chrono::Duration::from_std(cooldown)
                    .context("cooldown is out of range")?;

                let until = last_dispatched_at
                    .checked_add_signed(cooldown)
                    .context("cooldown is out of range")?;

                if now < until {
                    tracing::info!(%last_dispatched_at, "suppressing recommendation within cooldown");
                    return Ok(Dispatched::Suppressed { last_dispatched_at });
                }
            }
        }

        let admins_only = self.config.policy.audience.admins_only(*priority);
        let emailed = self.config.policy.channels.send_email(*priority);

        let notifications = self
            .send_to_all(title, message, *type_, emailed, admins_only, now)
            .await?;

        if self.config.cooldown.is_some() {
            self.store
                .record_dispatch(key, now)
                .await
                .context("recording dispatch of recommendation")?;
        }

        tracing::info!(
            recipients = notifications.len(),
            admins_only,
            emailed,
            "dispatched recommendation"
        );
        Ok(Dispatched::Sent {
            notifications,
            admins_only,
            emailed,
        })
    }

    /// Dispatch every Recommendation of a cycle, continuing past failures.
    pub async fn dispatch_all(
        &self,
        recommendations: &[Recommendation],
        now: DateTime<Utc>,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary {
            recommendations: recommendations.len(),
            ..Default::default()
        };

        for recommendation in recommendations {
            match self.dispatch(recommendation, now).await {
                Ok(Dispatched::Sent { notifications, .. }) => {
                    summary.notifications += notifications.len()
                }
                Ok(Dispatched::Suppressed { .. }) => summary.suppressed += 1,
                Err(err) => {
                    tracing::error!(key = %recommendation.key, error = ?err, "failed to dispatch recommendation");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Delete read Notifications older than `retention`, publishing a
    /// deletion for each. Returns the number deleted.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_read_notifications(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> anyhow::Result<usize> {
        let cutoff = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
            .with_context(|| format!("retention {retention:?} is out of range"))?;

        let deleted = self
            .store
            .delete_read_before(cutoff)
            .await
            .context("deleting read notifications")?;

        for notification in &deleted {
            publish_envelope(&self.publisher, &Envelope::Delete(notification.clone())).await;
        }

        tracing::info!(deleted = deleted.len(), %cutoff, "swept read notifications");
        Ok(deleted.len())
    }
}
