use super::{ApiError, App};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use models::{Id, Notification};
use notifications::{Directory, EmailSender, ListQuery, NotificationStore, Order};
use pubsub::Publish;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 30;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, serde::Deserialize)]
pub struct ListParams {
    #[serde(rename = "order[createdAt]", default)]
    order: Order,
    #[serde(rename = "itemsPerPage")]
    items_per_page: Option<usize>,
    recipient: Option<Id>,
}

/// Body of a Notification update. Only the read state may change.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotification {
    is_read: Option<bool>,
}

pub async fn list<S, E, P>(
    State(app): State<Arc<App<S, E, P>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Notification>>, ApiError>
where
    S: NotificationStore + Directory + 'static,
    E: EmailSender,
    P: Publish + 'static,
{
    let ListParams {
        order,
        items_per_page,
        recipient,
    } = params;

    let query = ListQuery {
        recipient,
        order,
        limit: items_per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE),
    };
    let notifications = app.dispatcher.store().list(query).await?;

    Ok(Json(notifications))
}

pub async fn fetch<S, E, P>(
    State(app): State<Arc<App<S, E, P>>>,
    Path(id): Path<Id>,
) -> Result<Json<Notification>, ApiError>
where
    S: NotificationStore + Directory + 'static,
    E: EmailSender,
    P: Publish + 'static,
{
    match app.dispatcher.store().fetch(id).await? {
        Some(notification) => Ok(Json(notification)),
        None => Err(ApiError::not_found(format!("notification {id}"))),
    }
}

#[tracing::instrument(skip_all, fields(%id))]
pub async fn update<S, E, P>(
    State(app): State<Arc<App<S, E, P>>>,
    Path(id): Path<Id>,
    Json(update): Json<UpdateNotification>,
) -> Result<Json<Notification>, ApiError>
where
    S: NotificationStore + Directory + 'static,
    E: EmailSender,
    P: Publish + 'static,
{
    let updated = match update.is_read {
        Some(false) => {
            return Err(ApiError::unprocessable(anyhow::anyhow!(
                "a read notification cannot be marked as unread"
            )))
        }
        Some(true) => app.dispatcher.mark_as_read(id).await?,
        None => app.dispatcher.store().fetch(id).await?,
    };

    match updated {
        Some(notification) => Ok(Json(notification)),
        None => Err(ApiError::not_found(format!("notification {id}"))),
    }
}
