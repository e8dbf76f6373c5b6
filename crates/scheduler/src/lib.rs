//! The Scheduler Core: converts the Catalog Store's active websites into a
//! live set of timed jobs, persists its own state across restarts, and
//! enforces that at most one instance runs per data directory (spec §4.2).

mod core;
mod lock;
mod state;

pub use core::{SchedulerCore, SchedulerStatus};
pub use lock::SchedulerLock;
pub use state::{PersistedState, ScheduledWebsiteInfo};
