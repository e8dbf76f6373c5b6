//! Shared types for the website-monitor workspace: configuration, the
//! domain model (`Website`, `QueueItem`, `CheckRecord`), the closed
//! `CheckType` enumeration, and the error type every other crate returns.

pub mod check_record;
pub mod check_type;
pub mod config;
pub mod error;
pub mod queue;
pub mod slug;
pub mod website;

pub use check_record::*;
pub use check_type::*;
pub use config::Config;
pub use error::{Error, Result};
pub use queue::*;
pub use website::*;
