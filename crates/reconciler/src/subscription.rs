use crate::{
    sse::{self, Incoming, SseDecoder, SseEvent},
    AlertSink, NotificationApi, Reconciler,
};
use anyhow::Context;
use futures::StreamExt;
use models::{Id, Notification};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriptionConfig {
    /// Number of Notifications fetched when seeding.
    pub page_size: usize,
    /// Bounds of the backoff between reconnection attempts.
    #[serde(with = "humantime_serde")]
    pub min_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            min_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

enum Command {
    MarkRead {
        id: Id,
        done: oneshot::Sender<anyhow::Result<bool>>,
    },
}

/// Subscription is an owned, live view of the user's Notifications.
///
/// A background task keeps the view current: it opens the event stream,
/// seeds from an authoritative fetch, applies pushed changes, and on any
/// failure reconnects with backoff and re-seeds. The task ends when the
/// Subscription is closed or dropped.
pub struct Subscription {
    state: watch::Receiver<Vec<Notification>>,
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Subscription {
    pub fn spawn<A, K>(api: A, alerts: K, config: SubscriptionConfig) -> Self
    where
        A: NotificationApi,
        K: AlertSink,
    {
        let (state_tx, state_rx) = watch::channel(Vec::new());
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let reconciler = Reconciler::new()
            .with_recipient(api.recipient())
            .with_limit(config.page_size);

        let worker = Worker {
            api,
            alerts,
            config,
            reconciler,
            state: state_tx,
            commands: commands_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());

        Self {
            state: state_rx,
            commands: commands_tx,
            cancel,
            task: Some(task),
        }
    }

    /// Current Notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.borrow().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state.borrow().iter().filter(|n| !n.is_read).count()
    }

    /// Wait for the next change of the view, and return it.
    pub async fn changed(&mut self) -> anyhow::Result<Vec<Notification>> {
        self.state
            .changed()
            .await
            .context("subscription has stopped")?;
        Ok(self.state.borrow_and_update().clone())
    }

    /// Mark a Notification as read. The view is updated immediately,
    /// and reverted if the server rejects the update.
    /// Returns whether the Notification was unread.
    pub async fn mark_as_read(&self, id: Id) -> anyhow::Result<bool> {
        let (done, done_rx) = oneshot::channel();

        self.commands
            .send(Command::MarkRead { id, done })
            .await
            .map_err(|_| anyhow::anyhow!("subscription has stopped"))?;

        done_rx
            .await
            .map_err(|_| anyhow::anyhow!("subscription has stopped"))?
    }

    /// Stop the background task and wait for it to exit.
    pub async fn close(mut self) {
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::error!(?err, "notification subscription task failed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum Exit {
    Cancelled,
    StreamEnded,
}

struct Worker<A, K> {
    api: A,
    alerts: K,
    config: SubscriptionConfig,
    reconciler: Reconciler,
    state: watch::Sender<Vec<Notification>>,
    commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
}

impl<A: NotificationApi, K: AlertSink> Worker<A, K> {
    async fn run(mut self) {
        let backoff = exponential_backoff::Backoff::new(
            u32::MAX,
            self.config.min_backoff,
            Some(self.config.max_backoff),
        );
        let cancel = self.cancel.clone();
        let mut attempt = 0;

        loop {
            match self.connect(&mut attempt).await {
                Ok(Exit::Cancelled) => return,
                Ok(Exit::StreamEnded) => tracing::info!("notification event stream ended"),
                Err(err) => tracing::warn!(error = ?err, attempt, "notification event stream failed"),
            }
            attempt += 1;

            let delay = backoff.next(attempt).unwrap_or(self.config.max_backoff);
            tracing::debug!(?delay, attempt, "reconnecting to notification event stream");

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = &mut sleep => break,
                    command = self.commands.recv() => match command {
                        Some(command) => self.handle(command).await,
                        None => return,
                    },
                }
            }
        }
    }

    async fn connect(&mut self, attempt: &mut u32) -> anyhow::Result<Exit> {
        let cancel = self.cancel.clone();

        // Open the stream before seeding, so that changes made
        // between the fetch and the subscription aren't lost.
        let mut stream = tokio::select! {
            _ = cancel.cancelled() => return Ok(Exit::Cancelled),
            stream = self.api.open_stream() => stream?,
        };
        self.seed().await?;
        *attempt = 0;

        let mut decoder = SseDecoder::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(Exit::Cancelled),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => return Ok(Exit::Cancelled),
                },
                chunk = stream.next() => match chunk {
                    Some(chunk) => {
                        for event in decoder.feed(&chunk?) {
                            self.on_event(event).await?;
                        }
                    }
                    None => return Ok(Exit::StreamEnded),
                },
            }
        }
    }

    async fn seed(&mut self) -> anyhow::Result<()> {
        let listing = self
            .api
            .list_recent(self.config.page_size)
            .await
            .context("seeding notifications")?;

        tracing::debug!(count = listing.len(), "seeded notifications");
        self.reconciler.seed(listing);
        self.publish();
        Ok(())
    }

    async fn on_event(&mut self, event: SseEvent) -> anyhow::Result<()> {
        match sse::decode(&event) {
            Ok(Incoming::Envelope(envelope)) => {
                if let Some(alert) = self.reconciler.apply(envelope) {
                    self.alerts.raise(alert);
                }
                self.publish();
            }
            Ok(Incoming::Resync) => {
                tracing::info!(missed = %event.data, "notification stream lagged, re-seeding");
                self.seed().await?;
            }
            Err(err) => {
                tracing::warn!(error = ?err, data = %event.data, "discarding malformed notification event");
            }
        }
        Ok(())
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::MarkRead { id, done } => {
                if !self.reconciler.mark_read_locally(id) {
                    let _ = done.send(Ok(false));
                    return;
                }
                self.publish();

                let result = match self.api.mark_read(id).await {
                    Ok(()) => Ok(true),
                    Err(err) => {
                        tracing::warn!(%id, error = ?err, "failed to mark notification as read, reverting");
                        self.reconciler.rollback_read(id);
                        self.publish();
                        Err(err)
                    }
                };
                // The caller may have stopped waiting.
                let _ = done.send(result);
            }
        }
    }

    fn publish(&self) {
        self.state
            .send_replace(self.reconciler.notifications().to_vec());
    }
}
