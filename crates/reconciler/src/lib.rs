//! Client-side reconciliation of a user's Notifications: an authoritative
//! fetch, followed by pushed changes, converging on the server's state.
mod alert;
mod client;
mod sse;
mod state;
mod subscription;

pub use alert::{Alert, AlertSink, Severity, TracingAlerts};
pub use client::{ApiClient, NotificationApi};
pub use sse::{decode, DecodeError, Incoming, SseDecoder, SseEvent};
pub use state::Reconciler;
pub use subscription::{Subscription, SubscriptionConfig};
