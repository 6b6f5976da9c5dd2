use anyhow::Context;
use bytes::Bytes;
use futures::{stream::BoxStream, Future, StreamExt, TryStreamExt};
use models::{Id, Notification, Resource, Topic};
use std::time::Duration;

/// NotificationApi is the server surface used by a Subscription.
pub trait NotificationApi: Send + Sync + 'static {
    /// Open the event stream of the Notification topic.
    fn open_stream<'s>(
        &'s self,
    ) -> impl Future<Output = anyhow::Result<BoxStream<'static, anyhow::Result<Bytes>>>> + Send + 's;

    /// Fetch the newest `limit` Notifications, newest first.
    fn list_recent<'s>(
        &'s self,
        limit: usize,
    ) -> impl Future<Output = anyhow::Result<Vec<Notification>>> + Send + 's;

    fn mark_read<'s>(&'s self, id: Id) -> impl Future<Output = anyhow::Result<()>> + Send + 's;

    /// Recipient whose Notifications are listed, if the API is scoped to one.
    fn recipient(&self) -> Option<Id> {
        None
    }
}

/// ApiClient is a NotificationApi over HTTP.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: url::Url,
    recipient: Option<Id>,
    token: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: url::Url, http: reqwest::Client) -> Self {
        Self {
            base_url,
            recipient: None,
            token: None,
            timeout: Duration::from_secs(10),
            http,
        }
    }

    /// Bound listing and update requests by `timeout`.
    /// The event stream is long-lived, and isn't bounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Only list Notifications of `recipient`.
    pub fn with_recipient(mut self, recipient: Id) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> anyhow::Result<reqwest::RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("building URL of {path}"))?;

        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }
}

impl NotificationApi for ApiClient {
    async fn open_stream<'s>(&'s self) -> anyhow::Result<BoxStream<'static, anyhow::Result<Bytes>>> {
        let response = self
            .request(reqwest::Method::GET, pubsub::http::HUB_PATH)?
            .query(&[("topic", Topic::of::<Notification>().as_str())])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .context("opening event stream")?
            .error_for_status()
            .context("event stream request failed")?;

        Ok(response
            .bytes_stream()
            .map_err(|err| anyhow::Error::new(err).context("reading event stream"))
            .boxed())
    }

    async fn list_recent<'s>(&'s self, limit: usize) -> anyhow::Result<Vec<Notification>> {
        let mut query = vec![
            ("order[createdAt]", "desc".to_string()),
            ("itemsPerPage", limit.to_string()),
        ];
        if let Some(recipient) = self.recipient {
            query.push(("recipient", recipient.to_string()));
        }

        self.request(reqwest::Method::GET, Notification::COLLECTION)?
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await
            .context("listing notifications")?
            .error_for_status()
            .context("listing notifications failed")?
            .json()
            .await
            .context("decoding notifications")
    }

    async fn mark_read<'s>(&'s self, id: Id) -> anyhow::Result<()> {
        self.request(
            reqwest::Method::PATCH,
            &format!("{}/{id}", Notification::COLLECTION),
        )?
        .json(&serde_json::json!({"isRead": true}))
        .timeout(self.timeout)
        .send()
        .await
        .context("updating notification")?
        .error_for_status()
        .context("updating notification failed")?;

        Ok(())
    }

    fn recipient(&self) -> Option<Id> {
        self.recipient
    }
}
