use crate::Hub;
use anyhow::Context;
use models::{Envelope, Resource, Topic};
use std::time::Duration;

/// Publish delivers a serialized payload to the subscribers of a Topic.
pub trait Publish: Send + Sync {
    /// Publish `payload`, returning the number of subscribers reached
    /// (when known).
    fn publish<'s>(
        &'s self,
        topic: &'s Topic,
        payload: String,
    ) -> impl std::future::Future<Output = anyhow::Result<usize>> + Send + 's;
}

/// LocalPublisher publishes into a Hub of the current process.
#[derive(Debug, Clone)]
pub struct LocalPublisher {
    hub: Hub,
}

impl LocalPublisher {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }
}

impl Publish for LocalPublisher {
    async fn publish<'s>(&'s self, topic: &'s Topic, payload: String) -> anyhow::Result<usize> {
        Ok(self.hub.publish(topic, payload))
    }
}

/// PublishRequest is the body of a remote publish.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PublishRequest {
    pub topic: Topic,
    /// Payload which is delivered verbatim to subscribers.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PublishResponse {
    pub delivered: usize,
}

/// RemotePublisher publishes through the hub of a running agent,
/// by POSTing to its publish endpoint.
#[derive(Debug, Clone)]
pub struct RemotePublisher {
    endpoint: url::Url,
    token: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl RemotePublisher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(endpoint: url::Url, token: Option<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint,
            token,
            timeout: Self::DEFAULT_TIMEOUT,
            http,
        }
    }

    /// Bound each publish request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Publish for RemotePublisher {
    #[tracing::instrument(skip_all, fields(endpoint = %self.endpoint, %topic))]
    async fn publish<'s>(&'s self, topic: &'s Topic, payload: String) -> anyhow::Result<usize> {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(&PublishRequest {
                topic: topic.clone(),
                data: payload,
            });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let PublishResponse { delivered } = request
            .send()
            .await
            .context("sending publish request")?
            .error_for_status()
            .context("publish request failed")?
            .json()
            .await
            .context("decoding publish response")?;

        Ok(delivered)
    }
}

/// Publisher selects how (and whether) envelopes are published.
#[derive(Debug, Clone)]
pub enum Publisher {
    Disabled,
    Local(LocalPublisher),
    Remote(RemotePublisher),
}

impl Publish for Publisher {
    async fn publish<'s>(&'s self, topic: &'s Topic, payload: String) -> anyhow::Result<usize> {
        match self {
            Publisher::Disabled => {
                tracing::debug!(%topic, "skipping publish (disabled)");
                Ok(0)
            }
            Publisher::Local(local) => local.publish(topic, payload).await,
            Publisher::Remote(remote) => remote.publish(topic, payload).await,
        }
    }
}

/// Publish `envelope` to the Topic of its resource type.
///
/// Publishing is best-effort: subscribers which miss a change recover by
/// re-fetching. A failure is logged and reported as zero deliveries.
pub async fn publish_envelope<P, R>(publisher: &P, envelope: &Envelope<R>) -> usize
where
    P: Publish,
    R: Resource + serde::Serialize,
{
    let topic = Topic::of::<R>();
    let id = envelope.data().id();
    let type_ = envelope.type_();

    let payload = match serde_json::to_string(envelope) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(%topic, %id, ?type_, ?err, "failed to serialize envelope");
            return 0;
        }
    };

    match publisher.publish(&topic, payload).await {
        Ok(delivered) => {
            tracing::debug!(%topic, %id, ?type_, delivered, "published envelope");
            delivered
        }
        Err(err) => {
            tracing::warn!(%topic, %id, ?type_, error = ?err, "failed to publish envelope");
            0
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Delivery;
    use chrono::TimeZone;
    use models::{Id, Notification, NotificationType};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_envelopes_go_to_their_resource_topic() {
        let hub = Hub::new(8);
        let mut sub = hub.subscribe(&Topic::new("/api/notifications"));
        let publisher = Publisher::Local(LocalPublisher::new(hub.clone()));

        let notification = Notification {
            id: Id(5),
            recipient_id: Id(1),
            title: "Equipment fault".to_string(),
            message: "Boiler B2".to_string(),
            type_: NotificationType::Error,
            is_read: false,
            created_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        };
        assert_eq!(
            publish_envelope(&publisher, &Envelope::New(notification.clone())).await,
            1
        );

        let Some(Delivery::Message(payload)) = sub.recv().await else {
            panic!("expected a message");
        };
        let parsed: Envelope<Notification> = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed, Envelope::New(notification.clone()));

        assert_eq!(
            publish_envelope(&Publisher::Disabled, &Envelope::Delete(notification)).await,
            0
        );
    }

    #[tokio::test]
    async fn test_remote_publish_failure_is_swallowed() {
        // Nothing listens on the discard port.
        let publisher = Publisher::Remote(RemotePublisher::new(
            "http://127.0.0.1:9/.well-known/mercure".parse().unwrap(),
            None,
            reqwest::Client::new(),
        ));
        let notification = Notification {
            id: Id(1),
            recipient_id: Id(1),
            title: String::new(),
            message: String::new(),
            type_: NotificationType::Info,
            is_read: true,
            created_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        };

        assert_eq!(
            publish_envelope(&publisher, &Envelope::Update(notification)).await,
            0
        );
    }

    #[tokio::test]
    async fn test_remote_publish_to_unresponsive_hub_times_out() {
        // Accept connections, and never answer them.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _held = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let publisher = Publisher::Remote(
            RemotePublisher::new(
                format!("http://{addr}/.well-known/mercure").parse().unwrap(),
                None,
                reqwest::Client::new(),
            )
            .with_timeout(std::time::Duration::from_millis(100)),
        );
        let notification = Notification {
            id: Id(2),
            recipient_id: Id(1),
            title: String::new(),
            message: String::new(),
            type_: NotificationType::Info,
            is_read: false,
            created_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        };

        let delivered = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            publish_envelope(&publisher, &Envelope::New(notification)),
        )
        .await
        .expect("publishing must not wait on an unresponsive hub");
        assert_eq!(delivered, 0);
    }
}
