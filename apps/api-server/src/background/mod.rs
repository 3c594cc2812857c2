//! Background processing.

#[cfg(feature = "scheduler")]
mod scheduler;

#[cfg(feature = "scheduler")]
pub use scheduler::{SESSION_CLEANUP_SCHEDULE, Scheduler};
