mod dispatcher;
mod email;
mod policy;
mod render;
mod store;

pub use dispatcher::{DispatchSummary, Dispatched, Dispatcher, DispatcherConfig};
pub use email::{EmailConfig, EmailSender, NotificationEmail, Recipient, ResendSender, Sender};
pub use policy::{AudiencePolicy, ChannelPolicy, DeliveryPolicy};
pub use render::Renderer;
pub use store::{Directory, ListQuery, MemoryStore, NotificationStore, Order, PgStore};
