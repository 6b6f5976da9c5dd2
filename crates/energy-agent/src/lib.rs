//! The energy agent detects operational conditions on a schedule, and fans
//! the resulting Recommendations out to users as Notifications which are
//! pushed to connected clients.
pub mod api;
mod cycle;
mod scheduler;
mod settings;

pub use cycle::{evaluate, run_cycle, CycleOutcome, NoEquipment};
pub use scheduler::{jittered, Scheduler, SchedulerConfig};
pub use settings::{HttpConfig, Settings};

/// Embedded migrations of the agent's database schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
