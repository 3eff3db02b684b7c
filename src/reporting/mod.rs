//! Reporting Module
//!
//! Builds monitoring events and delivers them to the remote sink.
//!
//! # Components
//!
//! - [`event`]: Event and wire payload types
//! - [`transport`]: HTTP delivery
//! - [`reporter`]: Best-effort delivery with an optional worker thread
//! - [`alert`]: Long-running job notifications

pub mod alert;
pub mod event;
pub mod reporter;
pub mod transport;

pub use alert::{long_running_alert, AlertMessage};
pub use event::{MonitoringEvent, ReportPayload, TaskStatus};
pub use reporter::EventReporter;
pub use transport::{HttpTransport, ReportError, Transport, API_TOKEN_HEADER};
