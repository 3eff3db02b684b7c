//! cronwatch - Scheduled Task Lifecycle Monitor
//!
//! Attaches to a job scheduler, observes start/finish/fail transitions of
//! periodic tasks, measures each execution, attaches host resource
//! metrics and forwards a structured event to a monitoring endpoint.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`lifecycle`]: Entry point for scheduler signals
//! - [`tracking`]: Task identities and in-flight start times
//! - [`monitoring`]: Memory, load and CPU snapshots
//! - [`reporting`]: Event payloads and best-effort delivery
//! - [`config`]: Monitor settings
//! - [`status`]: Job overview used by the CLI
//!
//! Monitoring never interferes with the scheduler: every failure
//! degrades to an omitted field or a log line.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use cronwatch::{LifecycleDispatcher, MonitorConfig, TaskRef, TaskSignal};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MonitorConfig::load(Some(Path::new("cronwatch.yaml")))?;
//!     let dispatcher = LifecycleDispatcher::from_config(config)?;
//!
//!     let task = TaskRef::with_command("php artisan jobs:sync");
//!     dispatcher.handle(&TaskSignal::Starting(task.clone()));
//!     dispatcher.handle(&TaskSignal::Failed {
//!         task,
//!         error: "disk full".to_string(),
//!     });
//!
//!     dispatcher.reporter().shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod lifecycle;
pub mod monitoring;
pub mod reporting;
pub mod status;
pub mod tracking;

// Re-export commonly used types
pub use config::MonitorConfig;
pub use lifecycle::{LifecycleDispatcher, TaskRef, TaskSignal};
pub use monitoring::{Metrics, MetricsCollector};
pub use reporting::{EventReporter, MonitoringEvent};
pub use tracking::{identify, ExecutionStore, TaskId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "cronwatch";
