use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use models::{Envelope, Id, NewNotification, Notification, NotificationType, Topic, User};
use notifications::{Dispatcher, DispatcherConfig, MemoryStore, NotificationStore, Renderer, Sender};
use pretty_assertions::assert_eq;
use pubsub::{Delivery, Hub, LocalPublisher, Publisher};
use std::sync::Arc;
use tower::ServiceExt;

struct Harness {
    app: axum::Router,
    store: MemoryStore,
    hub: Hub,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

async fn harness() -> Harness {
    let store = MemoryStore::new([
        User {
            id: Id(1),
            email: Some("admin@example.com".to_string()),
            full_name: None,
            roles: vec![models::ROLE_ADMIN.to_string()],
        },
        User {
            id: Id(2),
            email: None,
            full_name: None,
            roles: Vec::new(),
        },
    ]);

    // Notifications 1..=3 are for user 1, and 4 is for user 2.
    for (recipient, minutes) in [(1, 0), (1, 10), (1, 20), (2, 30)] {
        store
            .insert(
                NewNotification {
                    recipient_id: Id(recipient),
                    title: format!("Notification at +{minutes}m"),
                    message: "Lower the heating".to_string(),
                    type_: NotificationType::Info,
                },
                t0() + Duration::minutes(minutes),
            )
            .await
            .unwrap();
    }

    let hub = Hub::new(16);
    let dispatcher = Dispatcher::new(
        store.clone(),
        Sender::Disabled,
        Publisher::Local(LocalPublisher::new(hub.clone())),
        Renderer::try_new("Sobri'Up", None).unwrap(),
        DispatcherConfig::default(),
    );
    let app = energy_agent::api::build_router(Arc::new(dispatcher), hub.clone(), None);

    Harness { app, store, hub }
}

async fn call(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn patch(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::PATCH)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/merge-patch+json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn ids(doc: &serde_json::Value) -> Vec<i64> {
    serde_json::from_value::<Vec<Notification>>(doc.clone())
        .unwrap()
        .into_iter()
        .map(|n| n.id.get())
        .collect()
}

#[tokio::test]
async fn test_list_orders_limits_and_filters() {
    let Harness { app, .. } = harness().await;

    let (status, doc) = call(&app, get("/api/notifications")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&doc), vec![4, 3, 2, 1]);

    let (_, doc) = call(
        &app,
        get("/api/notifications?order%5BcreatedAt%5D=desc&itemsPerPage=2&recipient=1"),
    )
    .await;
    assert_eq!(ids(&doc), vec![3, 2]);

    let (_, doc) = call(&app, get("/api/notifications?order%5BcreatedAt%5D=asc&recipient=1")).await;
    assert_eq!(ids(&doc), vec![1, 2, 3]);

    // Page sizes are clamped.
    let (_, doc) = call(&app, get("/api/notifications?itemsPerPage=0")).await;
    assert_eq!(ids(&doc), vec![4]);
}

#[tokio::test]
async fn test_fetch_wire_shape_and_missing() {
    let Harness { app, .. } = harness().await;

    let (status, doc) = call(&app, get("/api/notifications/2")).await;
    assert_eq!(status, StatusCode::OK);
    insta::assert_json_snapshot!(doc, @r###"
    {
      "createdAt": "2024-03-01T10:10:00Z",
      "id": 2,
      "isRead": false,
      "message": "Lower the heating",
      "recipientId": 1,
      "title": "Notification at +10m",
      "type": "info"
    }
    "###);

    let (status, doc) = call(&app, get("/api/notifications/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(doc["status"], 404);
    assert_eq!(doc["error"], "notification 99 was not found");
}

#[tokio::test]
async fn test_mark_read_publishes_update_once() {
    let Harness { app, store, hub } = harness().await;
    let mut events = hub.subscribe(&Topic::of::<Notification>());

    let (status, doc) = call(&app, patch("/api/notifications/3", serde_json::json!({"isRead": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["isRead"], true);
    assert!(store.fetch(Id(3)).await.unwrap().unwrap().is_read);

    let Some(Delivery::Message(payload)) = events.recv().await else {
        panic!("expected a published envelope");
    };
    let envelope: Envelope<Notification> = serde_json::from_str(&payload).unwrap();
    assert!(matches!(&envelope, Envelope::Update(n) if n.id == Id(3) && n.is_read));

    // Marking again is a no-op which publishes nothing.
    let (status, doc) = call(&app, patch("/api/notifications/3", serde_json::json!({"isRead": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["isRead"], true);

    // An empty update returns the current state.
    let (status, doc) = call(&app, patch("/api/notifications/1", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["isRead"], false);

    assert_eq!(hub.publish(&Topic::of::<Notification>(), "marker"), 1);
    let Some(Delivery::Message(payload)) = events.recv().await else {
        panic!("expected the marker");
    };
    assert_eq!(&*payload, "marker");
}

#[tokio::test]
async fn test_read_state_never_reverts() {
    let Harness { app, store, .. } = harness().await;
    store.mark_read(Id(2)).await.unwrap();

    let (status, doc) = call(&app, patch("/api/notifications/2", serde_json::json!({"isRead": false}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(doc["status"], 422);
    assert!(store.fetch(Id(2)).await.unwrap().unwrap().is_read);

    let (status, _) = call(&app, patch("/api/notifications/99", serde_json::json!({"isRead": true}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_hub_routes() {
    let Harness { app, .. } = harness().await;

    let (status, doc) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc, serde_json::json!({"status": "ok"}));

    // The hub's publish endpoint is served alongside the API.
    let request = Request::post(pubsub::http::HUB_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"topic": "/api/notifications", "data": "{}"}).to_string(),
        ))
        .unwrap();
    let (status, doc) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc, serde_json::json!({"delivered": 0}));
}
