//! Lifecycle Dispatcher
//!
//! Entry point for scheduler signals. Correlates starts with terminal
//! signals, computes durations and hands events to the reporter.
//!
//! Handling never fails: a missing start record selects a fallback
//! duration, and delivery problems stay inside the reporter.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use log::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::reporting::{long_running_alert, EventReporter, MonitoringEvent, ReportError};
use crate::tracking::{identify, ExecutionStore, TaskId};

use super::signal::{TaskRef, TaskSignal};

/// Routes scheduler signals through tracking and reporting.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use cronwatch::config::MonitorConfig;
/// use cronwatch::lifecycle::{LifecycleDispatcher, TaskRef, TaskSignal};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let dispatcher = LifecycleDispatcher::from_config(MonitorConfig::load(None)?)?;
///     let task = TaskRef::with_command("php artisan jobs:sync");
///
///     dispatcher.handle(&TaskSignal::Starting(task.clone()));
///     // ... the scheduler runs the task ...
///     dispatcher.handle(&TaskSignal::Finished { task, runtime: Duration::from_millis(10) });
///     Ok(())
/// }
/// ```
pub struct LifecycleDispatcher {
    config: MonitorConfig,
    store: Arc<ExecutionStore>,
    reporter: Arc<EventReporter>,
}

impl LifecycleDispatcher {
    /// Builds a dispatcher with its own store and HTTP reporter.
    pub fn from_config(config: MonitorConfig) -> Result<Self, ReportError> {
        let store = Arc::new(ExecutionStore::with_ttl(config.start_ttl()));
        let reporter = Arc::new(EventReporter::from_config(&config)?);

        info!(
            "Monitoring scheduled tasks of '{}' (endpoint: {}, delivery: {:?})",
            config.app_name, config.central_log_url, config.delivery
        );
        Ok(Self::new(config, store, reporter))
    }

    /// Builds a dispatcher from injected collaborators.
    pub fn new(config: MonitorConfig, store: Arc<ExecutionStore>, reporter: Arc<EventReporter>) -> Self {
        if config.api_key.is_empty() {
            warn!("No API key configured; reports will be sent unauthenticated");
        }

        Self {
            config,
            store,
            reporter,
        }
    }

    /// The store holding in-flight start times.
    pub fn store(&self) -> &ExecutionStore {
        &self.store
    }

    /// The reporter used for delivery.
    pub fn reporter(&self) -> &EventReporter {
        &self.reporter
    }

    /// Identity of `task` within this application.
    pub fn task_id(&self, task: &TaskRef) -> TaskId {
        identify(task.label(), &self.config.app_name)
    }

    /// Handles one signal. Returns the event dispatched for terminal signals.
    pub fn handle(&self, signal: &TaskSignal) -> Option<MonitoringEvent> {
        match signal {
            TaskSignal::Starting(task) => {
                self.task_starting(task);
                None
            }
            TaskSignal::Finished { task, runtime } => Some(self.task_finished(task, *runtime)),
            TaskSignal::Failed { task, error } => Some(self.task_failed(task, error)),
        }
    }

    /// Records the start of `task`. Nothing is reported.
    pub fn task_starting(&self, task: &TaskRef) {
        let task_id = self.task_id(task);
        debug!("Task '{}' starting ({})", task, task_id);
        self.store.record_start(&task_id, Instant::now());
    }

    /// Reports a successful execution.
    ///
    /// Without a matching start, the scheduler's `runtime` is used as the
    /// duration.
    pub fn task_finished(&self, task: &TaskRef, runtime: Duration) -> MonitoringEvent {
        let task_id = self.task_id(task);
        let duration = match self.store.take_start(&task_id) {
            Some(started) => started.elapsed(),
            None => {
                debug!("No start recorded for '{}', using scheduler runtime", task);
                runtime
            }
        };

        let event = MonitoringEvent::finished(
            task.label(),
            self.config.app_name.as_str(),
            task_id,
            duration,
            runtime,
            SystemTime::now(),
        );
        info!("Task '{}' finished in {:.3}s", task, event.duration_seconds);

        if let Some(alert) = long_running_alert(&self.config, &event) {
            warn!("{}", alert.text);
            self.reporter.alert(alert);
        }

        self.reporter.report(event.clone());
        event
    }

    /// Reports a failed execution.
    ///
    /// Without a matching start, the duration is zero.
    pub fn task_failed(&self, task: &TaskRef, error: &str) -> MonitoringEvent {
        let task_id = self.task_id(task);
        let duration = match self.store.take_start(&task_id) {
            Some(started) => started.elapsed(),
            None => {
                debug!("No start recorded for failed task '{}'", task);
                Duration::ZERO
            }
        };

        let event = MonitoringEvent::failed(
            task.label(),
            self.config.app_name.as_str(),
            task_id,
            duration,
            error,
            SystemTime::now(),
        );
        warn!("Task '{}' failed after {:.3}s: {}", task, event.duration_seconds, error);

        self.reporter.report(event.clone());
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeliveryMode;
    use crate::reporting::reporter::tests::{quiet_collector, test_config, RecordingTransport};
    use crate::reporting::TaskStatus;
    use crate::tracking::identify;
    use std::sync::Barrier;
    use std::thread;

    fn dispatcher_with(
        config: MonitorConfig,
        transport: Arc<RecordingTransport>,
    ) -> LifecycleDispatcher {
        let reporter = EventReporter::new(&config, transport, quiet_collector());
        LifecycleDispatcher::new(config, Arc::new(ExecutionStore::new()), Arc::new(reporter))
    }

    fn inline_dispatcher() -> (LifecycleDispatcher, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher_with(test_config(DeliveryMode::Inline), transport.clone());
        (dispatcher, transport)
    }

    #[test]
    fn test_starting_records_without_reporting() {
        let (dispatcher, transport) = inline_dispatcher();
        let task = TaskRef::with_command("jobs:sync");

        assert!(dispatcher.handle(&TaskSignal::Starting(task.clone())).is_none());

        assert!(dispatcher.store().contains(&identify("jobs:sync", "demo")));
        assert!(transport.bodies().is_empty());
    }

    #[test]
    fn test_start_then_finish_measures_duration() {
        let (dispatcher, transport) = inline_dispatcher();
        let task = TaskRef::with_command("jobs:sync");

        dispatcher.handle(&TaskSignal::Starting(task.clone()));
        thread::sleep(Duration::from_millis(50));
        let event = dispatcher
            .handle(&TaskSignal::Finished {
                task,
                runtime: Duration::from_millis(10),
            })
            .unwrap();

        assert_eq!(event.status, TaskStatus::Finished);
        assert!(event.duration_seconds >= 0.05, "{}", event.duration_seconds);
        assert!(event.duration_seconds < 1.0);
        assert_eq!(event.runtime, Some(0.01));
        assert_eq!(event.task_id, identify("jobs:sync", "demo"));
        assert!(!dispatcher.store().contains(&event.task_id));
        assert!(dispatcher.store().is_empty());

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["status"], "finished");
        assert_eq!(bodies[0]["command"], "jobs:sync");
        assert_eq!(bodies[0]["application"], "demo");
        assert_eq!(bodies[0]["runtime"], 0.01);
    }

    #[test]
    fn test_finish_without_start_uses_scheduler_runtime() {
        let (dispatcher, _) = inline_dispatcher();

        let event = dispatcher.task_finished(
            &TaskRef::with_command("jobs:sync"),
            Duration::from_millis(2500),
        );

        assert_eq!(event.duration_seconds, 2.5);
        assert_eq!(event.duration_ms, 2500.0);
        assert_eq!(event.runtime, Some(2.5));
    }

    #[test]
    fn test_fail_without_start_has_zero_duration() {
        let (dispatcher, transport) = inline_dispatcher();

        let event = dispatcher
            .handle(&TaskSignal::Failed {
                task: TaskRef::with_command("jobs:sync"),
                error: "disk full".to_string(),
            })
            .unwrap();

        assert_eq!(event.status, TaskStatus::Failed);
        assert_eq!(event.duration_seconds, 0.0);
        assert_eq!(event.duration_ms, 0.0);
        assert_eq!(event.exception.as_deref(), Some("disk full"));

        let bodies = transport.bodies();
        assert_eq!(bodies[0]["status"], "failed");
        assert_eq!(bodies[0]["duration_seconds"], 0.0);
        assert_eq!(bodies[0]["exception"], "disk full");
        assert!(bodies[0].get("runtime").is_none());
    }

    #[test]
    fn test_fail_after_start_cleans_up() {
        let (dispatcher, _) = inline_dispatcher();
        let task = TaskRef::with_command("jobs:sync");

        dispatcher.task_starting(&task);
        thread::sleep(Duration::from_millis(20));
        let event = dispatcher.task_failed(&task, "boom");

        assert!(event.duration_seconds >= 0.02);
        assert!(dispatcher.store().is_empty());
    }

    #[test]
    fn test_second_terminal_signal_falls_back() {
        let (dispatcher, _) = inline_dispatcher();
        let task = TaskRef::with_command("jobs:sync");

        dispatcher.task_starting(&task);
        dispatcher.task_finished(&task, Duration::from_millis(1));
        let event = dispatcher.task_failed(&task, "late failure");

        assert_eq!(event.duration_seconds, 0.0);
    }

    #[test]
    fn test_description_used_when_command_missing() {
        let (dispatcher, transport) = inline_dispatcher();
        let task = TaskRef::with_description("Prune stale sessions");

        dispatcher.task_starting(&task);
        let event = dispatcher.task_finished(&task, Duration::ZERO);

        assert_eq!(event.command, "Prune stale sessions");
        assert_eq!(event.task_id, identify("Prune stale sessions", "demo"));
        assert_eq!(transport.bodies()[0]["command"], "Prune stale sessions");
    }

    #[test]
    fn test_payload_metrics_are_numeric_or_absent() {
        let (dispatcher, transport) = inline_dispatcher();
        dispatcher.task_finished(&TaskRef::with_command("jobs:sync"), Duration::ZERO);

        let body = &transport.bodies()[0];
        assert!(body["memory_peak_mb"].is_number());
        assert!(body["memory_current_mb"].is_number());
        for key in ["system_load", "cpu_usage"] {
            match body.get(key) {
                None => {}
                Some(value) => assert!(value.is_number(), "{} = {}", key, value),
            }
        }
    }

    #[test]
    fn test_transport_failure_returns_normally() {
        let transport = Arc::new(RecordingTransport::failing());
        let dispatcher = dispatcher_with(test_config(DeliveryMode::Inline), transport.clone());

        let event = dispatcher.handle(&TaskSignal::Failed {
            task: TaskRef::with_command("jobs:sync"),
            error: "disk full".to_string(),
        });

        assert!(event.is_some());
        assert_eq!(transport.bodies().len(), 1);
    }

    #[test]
    fn test_long_running_finish_sends_alert() {
        let transport = Arc::new(RecordingTransport::default());
        let mut config = test_config(DeliveryMode::Inline);
        config.alerts.slack_webhook = "http://hooks.test/slack".to_string();
        config.alerts.long_running_secs = Some(60);
        let dispatcher = dispatcher_with(config, transport.clone());

        dispatcher.task_finished(&TaskRef::with_command("reports:build"), Duration::from_secs(120));

        let posts = transport.posts.lock().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].0, "http://hooks.test/slack");
        assert_eq!(
            posts[0].2["text"],
            "Long Running Cron Job: reports:build took 2 minutes in demo"
        );
        assert_eq!(posts[1].2["status"], "finished");
    }

    #[test]
    fn test_concurrent_tasks_do_not_share_start_times() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Arc::new(dispatcher_with(
            test_config(DeliveryMode::Background),
            transport.clone(),
        ));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let dispatcher = Arc::clone(&dispatcher);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let task = TaskRef::with_command(format!("jobs:shard-{}", i));
                    barrier.wait();
                    dispatcher.task_starting(&task);
                    thread::sleep(Duration::from_millis(20 * (i + 1)));
                    let event = dispatcher.task_finished(&task, Duration::ZERO);
                    (i, event)
                })
            })
            .collect();

        for handle in handles {
            let (i, event) = handle.join().unwrap();
            assert_eq!(event.command, format!("jobs:shard-{}", i));
            assert_eq!(event.task_id, identify(&format!("jobs:shard-{}", i), "demo"));
            assert!(event.duration_ms >= (20 * (i + 1)) as f64);
        }

        assert!(dispatcher.store().is_empty());
        dispatcher.reporter().shutdown();
        assert_eq!(transport.bodies().len(), 4);
    }
}
