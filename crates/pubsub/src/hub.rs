use futures::{Stream, StreamExt};
use models::Topic;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

/// Hub fans out published payloads to the current subscribers of a Topic.
///
/// Delivery is fire-and-forget: nothing is retained, so a subscriber
/// only observes payloads published after it subscribed. Each Topic is a
/// bounded broadcast channel, and a subscriber which falls behind by more
/// than its capacity skips ahead and is told how many payloads it missed.
#[derive(Debug, Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

#[derive(Debug)]
struct HubInner {
    capacity: usize,
    channels: Mutex<HashMap<Topic, broadcast::Sender<Arc<str>>>>,
}

/// Delivery is a single item observed by a Subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Message(Arc<str>),
    /// The subscriber fell behind and missed this many payloads.
    Lagged(u64),
}

/// Subscription receives the payloads published to one Topic.
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    topic: Topic,
    rx: broadcast::Receiver<Arc<str>>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                capacity: capacity.max(1),
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self, topic: &Topic) -> Subscription {
        let mut channels = self.lock();

        let rx = match channels.get(topic) {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(self.inner.capacity);
                channels.insert(topic.clone(), tx);
                rx
            }
        };
        tracing::debug!(%topic, "added hub subscriber");

        Subscription {
            topic: topic.clone(),
            rx,
        }
    }

    /// Publish `payload` to current subscribers of `topic`,
    /// returning the number of subscribers it was delivered to.
    pub fn publish(&self, topic: &Topic, payload: impl Into<Arc<str>>) -> usize {
        let mut channels = self.lock();

        // Prune channels whose subscribers have all gone away.
        channels.retain(|_, tx| tx.receiver_count() != 0);

        let Some(tx) = channels.get(topic) else {
            tracing::debug!(%topic, "published to topic without subscribers");
            return 0;
        };
        // A send only fails if there are no receivers, which we just verified.
        let reached = tx.send(payload.into()).unwrap_or(0);

        tracing::debug!(%topic, reached, "published to topic");
        reached
    }

    /// Number of current subscribers of `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.lock()
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Topic, broadcast::Sender<Arc<str>>>> {
        // The map is never left in an inconsistent state, so recover from poisoning.
        self.inner
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Subscription {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Receive the next Delivery, or None if the Hub has been dropped.
    pub async fn recv(&mut self) -> Option<Delivery> {
        match self.rx.recv().await {
            Ok(payload) => Some(Delivery::Message(payload)),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(topic = %self.topic, missed, "hub subscriber lagged");
                Some(Delivery::Lagged(missed))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Delivery> + Send + 'static {
        let Self { topic, rx } = self;

        BroadcastStream::new(rx).map(move |item| match item {
            Ok(payload) => Delivery::Message(payload),
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                tracing::warn!(%topic, missed, "hub subscriber lagged");
                Delivery::Lagged(missed)
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn message(s: &str) -> Option<Delivery> {
        Some(Delivery::Message(Arc::from(s)))
    }

    #[tokio::test]
    async fn test_fan_out_without_cross_topic_leakage() {
        let hub = Hub::new(16);
        let notifications = Topic::new("/api/notifications");
        let modules = Topic::new("/api/modules");

        assert_eq!(hub.publish(&notifications, "dropped"), 0);

        let mut one = hub.subscribe(&notifications);
        let mut two = hub.subscribe(&notifications);
        let mut other = hub.subscribe(&modules);

        assert_eq!(hub.publish(&notifications, "first"), 2);
        assert_eq!(hub.publish(&modules, "module"), 1);
        assert_eq!(hub.publish(&notifications, "second"), 2);

        for sub in [&mut one, &mut two] {
            assert_eq!(sub.recv().await, message("first"));
            assert_eq!(sub.recv().await, message("second"));
        }
        assert_eq!(other.recv().await, message("module"));
        assert!(other.rx.is_empty());

        // Topics are matched exactly.
        assert_eq!(hub.publish(&Topic::new("/api/notifications/1"), "nope"), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_is_told_what_it_missed() {
        let hub = Hub::new(2);
        let topic = Topic::new("/api/notifications");

        let mut slow = hub.subscribe(&topic);
        for i in 0..5 {
            assert_eq!(hub.publish(&topic, format!("{i}")), 1);
        }

        assert_eq!(slow.recv().await, Some(Delivery::Lagged(3)));
        assert_eq!(slow.recv().await, message("3"));
        assert_eq!(slow.recv().await, message("4"));
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let hub = Hub::new(4);
        let topic = Topic::new("/api/notifications");

        let sub = hub.subscribe(&topic);
        assert_eq!(hub.subscriber_count(&topic), 1);
        drop(sub);

        assert_eq!(hub.publish(&topic, "gone"), 0);
        assert!(hub.lock().is_empty());

        let mut sub = hub.subscribe(&topic);
        assert_eq!(hub.publish(&topic, "back"), 1);
        assert_eq!(sub.recv().await, message("back"));
    }

    #[tokio::test]
    async fn test_stream_reports_lag() {
        let hub = Hub::new(1);
        let topic = Topic::new("/api/notifications");

        let stream = hub.subscribe(&topic).into_stream();
        hub.publish(&topic, "a");
        hub.publish(&topic, "b");
        drop(hub);

        let items: Vec<Delivery> = stream.collect().await;
        assert_eq!(
            items,
            vec![Delivery::Lagged(1), Delivery::Message(Arc::from("b"))]
        );
    }
}
