use crate::{Delivery, Hub, PublishRequest, PublishResponse};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use models::Topic;
use std::sync::Arc;

/// Path of the subscribe and publish endpoints.
pub const HUB_PATH: &str = "/.well-known/mercure";

/// Event name of the frame which tells a subscriber that it missed payloads
/// and must re-fetch.
pub const RESYNC_EVENT: &str = "resync";

struct HubState {
    hub: Hub,
    publish_token: Option<String>,
}

/// Router serving the hub's SSE subscribe endpoint and its publish endpoint.
/// When `publish_token` is set, publishers must present it as a bearer token.
pub fn router(hub: Hub, publish_token: Option<String>) -> axum::Router {
    axum::Router::new()
        .route(
            HUB_PATH,
            axum::routing::get(handle_subscribe).post(handle_publish),
        )
        .with_state(Arc::new(HubState { hub, publish_token }))
}

#[derive(Debug, serde::Deserialize)]
struct SubscribeQuery {
    topic: Topic,
}

async fn handle_subscribe(
    State(state): State<Arc<HubState>>,
    Query(SubscribeQuery { topic }): Query<SubscribeQuery>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    tracing::info!(%topic, "opened event stream");

    let stream = state
        .hub
        .subscribe(&topic)
        .into_stream()
        .map(|delivery| {
            Ok(match delivery {
                Delivery::Message(payload) => Event::default().data(payload.as_ref()),
                Delivery::Lagged(missed) => Event::default()
                    .event(RESYNC_EVENT)
                    .data(missed.to_string()),
            })
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn handle_publish(
    State(state): State<Arc<HubState>>,
    headers: HeaderMap,
    Json(PublishRequest { topic, data }): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, (StatusCode, &'static str)> {
    if let Some(expect) = &state.publish_token {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        if presented != Some(expect.as_str()) {
            tracing::warn!(%topic, "rejected unauthorized publish");
            return Err((StatusCode::UNAUTHORIZED, "missing or invalid publish token"));
        }
    }

    let delivered = state.hub.publish(&topic, data);
    Ok(Json(PublishResponse { delivered }))
}
