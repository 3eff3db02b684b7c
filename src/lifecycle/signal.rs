//! Scheduler Signals
//!
//! The shapes in which a host scheduler announces task transitions.

use std::fmt;
use std::time::Duration;

/// Label used when a task has neither command nor description.
pub const UNLABELED_TASK: &str = "(unlabeled task)";

/// The scheduler's view of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRef {
    /// Command line, if the task runs one
    pub command: Option<String>,
    /// Human-readable description
    pub description: String,
}

impl TaskRef {
    /// A task that runs a command.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            description: String::new(),
        }
    }

    /// A task known only by its description (e.g. a closure job).
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            command: None,
            description: description.into(),
        }
    }

    /// Command text if present, else the description.
    pub fn label(&self) -> &str {
        match &self.command {
            Some(command) => command,
            None if !self.description.is_empty() => &self.description,
            None => UNLABELED_TASK,
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A lifecycle transition reported by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskSignal {
    /// The task is about to run
    Starting(TaskRef),
    /// The task completed; `runtime` is the scheduler's own measurement
    Finished { task: TaskRef, runtime: Duration },
    /// The task raised an error
    Failed { task: TaskRef, error: String },
}

impl TaskSignal {
    /// Builds a failure signal from any displayable error.
    pub fn failed(task: TaskRef, error: &dyn fmt::Display) -> Self {
        TaskSignal::Failed {
            task,
            error: error.to_string(),
        }
    }

    /// The task the signal refers to.
    pub fn task(&self) -> &TaskRef {
        match self {
            TaskSignal::Starting(task) => task,
            TaskSignal::Finished { task, .. } => task,
            TaskSignal::Failed { task, .. } => task,
        }
    }
}
