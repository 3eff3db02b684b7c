//! Execution Tracking Module
//!
//! Correlates start and terminal signals of the same task execution.
//!
//! # Components
//!
//! - [`identity`]: Stable task fingerprints
//! - [`store`]: TTL-bounded map of in-flight start times

pub mod identity;
pub mod store;

pub use identity::{identify, TaskId};
pub use store::{ExecutionStore, DEFAULT_START_TTL};
