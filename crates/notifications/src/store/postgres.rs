use super::{Directory, ListQuery, NotificationStore, Order};
use anyhow::Context;
use chrono::{DateTime, Utc};
use models::{Id, NewNotification, Notification, NotificationType, User};

/// PgStore is a NotificationStore and Directory backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    recipient_id: i64,
    title: String,
    message: String,
    notification_type: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let NotificationRow {
            id,
            recipient_id,
            title,
            message,
            notification_type,
            is_read,
            created_at,
        } = row;

        Notification {
            id: Id(id),
            recipient_id: Id(recipient_id),
            title,
            message,
            type_: NotificationType::parse(&notification_type),
            is_read,
            created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: Option<String>,
    full_name: Option<String>,
    roles: Vec<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: Id(row.id),
            email: row.email,
            full_name: row.full_name,
            roles: row.roles,
        }
    }
}

impl NotificationStore for PgStore {
    async fn insert<'s>(
        &'s self,
        notification: NewNotification,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<Notification> {
        let row: NotificationRow = sqlx::query_as(
            r#"
            INSERT INTO notifications (recipient_id, title, message, notification_type, is_read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, recipient_id, title, message, notification_type, is_read, created_at
            "#,
        )
        .bind(notification.recipient_id.get())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.type_.as_str())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .context("inserting notification")?;

        Ok(row.into())
    }

    async fn fetch<'s>(&'s self, id: Id) -> anyhow::Result<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, recipient_id, title, message, notification_type, is_read, created_at
            FROM notifications
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .context("fetching notification")?;

        Ok(row.map(Into::into))
    }

    async fn list<'s>(&'s self, query: ListQuery) -> anyhow::Result<Vec<Notification>> {
        let sql = match query.order {
            Order::Desc => {
                r#"
                SELECT id, recipient_id, title, message, notification_type, is_read, created_at
                FROM notifications
                WHERE $1::BIGINT IS NULL OR recipient_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
                "#
            }
            Order::Asc => {
                r#"
                SELECT id, recipient_id, title, message, notification_type, is_read, created_at
                FROM notifications
                WHERE $1::BIGINT IS NULL OR recipient_id = $1
                ORDER BY created_at ASC, id ASC
                LIMIT $2
                "#
            }
        };

        let rows: Vec<NotificationRow> = sqlx::query_as(sql)
            .bind(query.recipient.map(|id| id.get()))
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("listing notifications")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_read<'s>(&'s self, id: Id) -> anyhow::Result<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1
            RETURNING id, recipient_id, title, message, notification_type, is_read, created_at
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .context("marking notification as read")?;

        Ok(row.map(Into::into))
    }

    async fn delete_read_before<'s>(
        &'s self,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            DELETE FROM notifications
            WHERE is_read AND created_at < $1
            RETURNING id, recipient_id, title, message, notification_type, is_read, created_at
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .context("deleting read notifications")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn last_dispatched<'s>(&'s self, key: &'s str) -> anyhow::Result<Option<DateTime<Utc>>> {
        sqlx::query_scalar(
            "SELECT last_dispatched_at FROM recommendation_ledger WHERE recommendation_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("fetching recommendation ledger")
    }

    async fn record_dispatch<'s>(&'s self, key: &'s str, at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recommendation_ledger (recommendation_key, last_dispatched_at)
            VALUES ($1, $2)
            ON CONFLICT (recommendation_key) DO UPDATE SET last_dispatched_at = EXCLUDED.last_dispatched_at
            "#,
        )
        .bind(key)
        .bind(at)
        .execute(&self.pool)
        .await
        .context("updating recommendation ledger")?;

        Ok(())
    }
}

impl Directory for PgStore {
    async fn all_users<'s>(&'s self) -> anyhow::Result<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, email, full_name, roles FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .context("listing users")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn users_with_role<'s>(&'s self, role: &'s str) -> anyhow::Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, email, full_name, roles FROM users WHERE $1 = ANY(roles) ORDER BY id",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await
        .context("listing users with role")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
