//! Task Lifecycle Module
//!
//! Receives scheduler signals and turns terminal ones into reports.
//!
//! - [`signal`]: Task references and lifecycle signals
//! - [`dispatcher`]: Signal handling and duration computation

pub mod dispatcher;
pub mod signal;

pub use dispatcher::LifecycleDispatcher;
pub use signal::{TaskRef, TaskSignal, UNLABELED_TASK};
