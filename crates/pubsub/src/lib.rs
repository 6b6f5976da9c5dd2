//! Topic-scoped publish/subscribe with best-effort delivery to
//! currently-connected subscribers, served over Server-Sent Events.
mod hub;
mod publisher;

pub mod http;

pub use hub::{Delivery, Hub, Subscription};
pub use publisher::{
    publish_envelope, LocalPublisher, Publish, PublishRequest, PublishResponse, Publisher,
    RemotePublisher,
};
