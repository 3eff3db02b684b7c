//! Job Status Module
//!
//! Read-only view of the jobs known to the monitoring server, used by
//! the `cronwatch status` command.

pub mod client;
pub mod table;

pub use client::{fetch_status, JobStatus, StatusError};
pub use table::render_table;
