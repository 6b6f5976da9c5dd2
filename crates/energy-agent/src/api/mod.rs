use notifications::{Directory, Dispatcher, EmailSender, NotificationStore};
use pubsub::{Hub, Publish};
use std::sync::Arc;

mod error;
mod notification;

pub use error::ApiError;
pub use notification::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// App is the shared state of API handlers.
pub struct App<S, E, P> {
    pub dispatcher: Arc<Dispatcher<S, E, P>>,
}

/// Build the agent's API router, which also serves the hub of `hub`.
pub fn build_router<S, E, P>(
    dispatcher: Arc<Dispatcher<S, E, P>>,
    hub: Hub,
    publish_token: Option<String>,
) -> axum::Router<()>
where
    S: NotificationStore + Directory + 'static,
    E: EmailSender,
    P: Publish + 'static,
{
    use axum::routing::get;

    let app = Arc::new(App { dispatcher });

    axum::Router::new()
        .route(
            "/api/notifications",
            get(notification::list::<S, E, P>),
        )
        .route(
            "/api/notifications/{id}",
            get(notification::fetch::<S, E, P>).patch(notification::update::<S, E, P>),
        )
        .with_state(app)
        .route("/health", get(health))
        .merge(pubsub::http::router(hub, publish_token))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok"}))
}
