//! Monitoring Events
//!
//! The record sent to the monitoring endpoint for every terminal
//! lifecycle signal, and the wire payload that adds host metrics.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::monitoring::{round_to, Metrics};
use crate::tracking::TaskId;

/// Outcome of a task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Finished,
    Failed,
}

/// A completed task execution, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringEvent {
    pub status: TaskStatus,
    /// Command text, or description when the task has no command
    pub command: String,
    pub application: String,
    /// When the terminal signal was handled (RFC 3339, UTC)
    pub timestamp: DateTime<Utc>,
    pub task_id: TaskId,
    /// Measured duration, 3 decimals
    pub duration_seconds: f64,
    /// Measured duration in milliseconds, 2 decimals
    pub duration_ms: f64,
    /// Scheduler-reported runtime in seconds (finished only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<f64>,
    /// Error message (failed only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    /// Epoch seconds at which the task ended
    pub end_time: f64,
}

impl MonitoringEvent {
    /// Builds the event for a successful execution.
    pub fn finished(
        command: impl Into<String>,
        application: impl Into<String>,
        task_id: TaskId,
        duration: Duration,
        runtime: Duration,
        ended_at: SystemTime,
    ) -> Self {
        let mut event = Self::base(TaskStatus::Finished, command, application, task_id, duration, ended_at);
        event.runtime = Some(runtime.as_secs_f64());
        event
    }

    /// Builds the event for a failed execution.
    pub fn failed(
        command: impl Into<String>,
        application: impl Into<String>,
        task_id: TaskId,
        duration: Duration,
        error: impl Into<String>,
        ended_at: SystemTime,
    ) -> Self {
        let mut event = Self::base(TaskStatus::Failed, command, application, task_id, duration, ended_at);
        event.exception = Some(error.into());
        event
    }

    fn base(
        status: TaskStatus,
        command: impl Into<String>,
        application: impl Into<String>,
        task_id: TaskId,
        duration: Duration,
        ended_at: SystemTime,
    ) -> Self {
        let seconds = duration.as_secs_f64();

        Self {
            status,
            command: command.into(),
            application: application.into(),
            timestamp: DateTime::<Utc>::from(ended_at),
            task_id,
            duration_seconds: round_to(seconds, 3),
            duration_ms: round_to(seconds * 1000.0, 2),
            runtime: None,
            exception: None,
            end_time: ended_at
                .duration_since(UNIX_EPOCH)
                .map(|since_epoch| since_epoch.as_secs_f64())
                .unwrap_or(0.0),
        }
    }
}

/// JSON body of a report: the event plus a metrics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
    #[serde(flatten)]
    pub event: MonitoringEvent,
    #[serde(flatten)]
    pub metrics: Metrics,
}
