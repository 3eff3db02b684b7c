//! Event Reporter
//!
//! Delivers monitoring events and alerts on a best-effort basis.
//!
//! In background mode a dedicated worker thread drains a bounded queue,
//! so the scheduler never waits on metrics sampling or the network.
//! Delivery failures are logged with the full payload and never
//! returned to the caller.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error, warn};

use crate::config::{DeliveryMode, MonitorConfig};
use crate::monitoring::MetricsCollector;

use super::alert::AlertMessage;
use super::event::{MonitoringEvent, ReportPayload};
use super::transport::{HttpTransport, ReportError, Transport};

/// Unit of work for the delivery worker.
enum Job {
    Report(MonitoringEvent),
    Alert(AlertMessage),
}

impl Job {
    fn describe(&self) -> String {
        match self {
            Job::Report(event) => format!("{:?} report for '{}'", event.status, event.command),
            Job::Alert(_) => "long-running alert".to_string(),
        }
    }
}

/// Performs the actual delivery, on whichever thread runs it.
struct Courier {
    endpoint: String,
    api_key: String,
    transport: Arc<dyn Transport>,
    collector: MetricsCollector,
}

impl Courier {
    fn deliver(&self, job: Job) {
        match job {
            Job::Report(event) => self.send_report(event),
            Job::Alert(alert) => self.send_alert(alert),
        }
    }

    fn send_report(&self, event: MonitoringEvent) {
        let payload = ReportPayload {
            event,
            metrics: self.collector.collect(),
        };

        let body = match serde_json::to_value(&payload) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to report to monitoring: {} (payload: {:?})", e, payload);
                return;
            }
        };

        match self.transport.post_json(&self.endpoint, Some(&self.api_key), &body) {
            Ok(()) => debug!(
                "Reported {:?} for task {}",
                payload.event.status, payload.event.task_id
            ),
            Err(e) => error!("Failed to report to monitoring: {} (payload: {})", e, body),
        }
    }

    fn send_alert(&self, alert: AlertMessage) {
        let body = alert.body();
        if let Err(e) = self.transport.post_json(&alert.webhook_url, None, &body) {
            error!("Failed to send long-running alert: {} (payload: {})", e, body);
        }
    }
}

/// Best-effort reporter for monitoring events.
///
/// # Example
///
/// ```rust,no_run
/// use cronwatch::config::MonitorConfig;
/// use cronwatch::reporting::EventReporter;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = MonitorConfig::load(None)?;
///     let reporter = EventReporter::from_config(&config)?;
///     // hand `reporter` to a LifecycleDispatcher ...
///     reporter.shutdown();
///     Ok(())
/// }
/// ```
pub struct EventReporter {
    courier: Arc<Courier>,
    queue: Mutex<Option<SyncSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventReporter {
    /// Creates a reporter delivering over HTTP with the configured timeout.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, ReportError> {
        let transport = HttpTransport::new(config.report_timeout())?;
        Ok(Self::new(config, Arc::new(transport), MetricsCollector::new()))
    }

    /// Creates a reporter with an explicit transport and collector.
    pub fn new(
        config: &MonitorConfig,
        transport: Arc<dyn Transport>,
        collector: MetricsCollector,
    ) -> Self {
        let courier = Arc::new(Courier {
            endpoint: config.central_log_url.clone(),
            api_key: config.api_key.clone(),
            transport,
            collector,
        });

        let (queue, worker) = match config.delivery {
            DeliveryMode::Inline => (None, None),
            DeliveryMode::Background => {
                match spawn_worker(Arc::clone(&courier), config.queue_capacity.max(1)) {
                    Ok((sender, handle)) => (Some(sender), Some(handle)),
                    Err(e) => {
                        warn!("Could not start report worker, delivering inline: {}", e);
                        (None, None)
                    }
                }
            }
        };

        Self {
            courier,
            queue: Mutex::new(queue),
            worker: Mutex::new(worker),
        }
    }

    /// Submits an event for delivery. Never fails.
    pub fn report(&self, event: MonitoringEvent) {
        self.submit(Job::Report(event));
    }

    /// Submits an alert for delivery. Never fails.
    pub fn alert(&self, alert: AlertMessage) {
        self.submit(Job::Alert(alert));
    }

    /// Returns true while a background worker accepts jobs.
    pub fn is_background(&self) -> bool {
        lock(&self.queue).is_some()
    }

    /// Stops accepting background jobs and waits for queued ones to finish.
    ///
    /// Later submissions are delivered inline.
    pub fn shutdown(&self) {
        drop(lock(&self.queue).take());

        if let Some(handle) = lock(&self.worker).take() {
            if handle.join().is_err() {
                error!("Report worker panicked");
            }
        }
    }

    fn submit(&self, job: Job) {
        let queue = lock(&self.queue);
        let Some(sender) = queue.as_ref() else {
            drop(queue);
            self.courier.deliver(job);
            return;
        };

        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                warn!("Report queue full, dropping {}", job.describe());
            }
            Err(TrySendError::Disconnected(job)) => {
                drop(queue);
                warn!("Report worker stopped, delivering {} inline", job.describe());
                self.courier.deliver(job);
            }
        }
    }
}

impl Drop for EventReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    courier: Arc<Courier>,
    capacity: usize,
) -> std::io::Result<(SyncSender<Job>, JoinHandle<()>)> {
    let (sender, receiver): (SyncSender<Job>, Receiver<Job>) = sync_channel(capacity);

    let handle = thread::Builder::new()
        .name("cronwatch-reporter".to_string())
        .spawn(move || {
            for job in receiver {
                courier.deliver(job);
            }
            debug!("Report worker exiting");
        })?;

    Ok((sender, handle))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::monitoring::CpuProbe;
    use crate::tracking::identify;
    use std::time::{Duration, SystemTime};

    /// Transport that records every delivery instead of sending it.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) posts: Mutex<Vec<(String, Option<String>, serde_json::Value)>>,
        pub(crate) fail: bool,
        pub(crate) delay: Option<Duration>,
    }

    impl RecordingTransport {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) fn bodies(&self) -> Vec<serde_json::Value> {
            lock(&self.posts).iter().map(|(_, _, body)| body.clone()).collect()
        }
    }

    impl Transport for RecordingTransport {
        fn post_json(
            &self,
            url: &str,
            token: Option<&str>,
            body: &serde_json::Value,
        ) -> Result<(), ReportError> {
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            lock(&self.posts).push((url.to_string(), token.map(str::to_string), body.clone()));

            if self.fail {
                return Err(ReportError::Status {
                    status: 500,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    pub(crate) fn quiet_collector() -> MetricsCollector {
        MetricsCollector::new().with_cpu_probe(CpuProbe::default())
    }

    pub(crate) fn test_config(delivery: DeliveryMode) -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.app_name = "demo".to_string();
        config.central_log_url = "http://monitor.test/api/cron-logs".to_string();
        config.api_key = "secret".to_string();
        config.delivery = delivery;
        config
    }

    fn sample_event(command: &str) -> MonitoringEvent {
        MonitoringEvent::finished(
            command,
            "demo",
            identify(command, "demo"),
            Duration::from_millis(50),
            Duration::from_millis(10),
            SystemTime::now(),
        )
    }

    #[test]
    fn test_inline_report_posts_payload_with_token() {
        let transport = Arc::new(RecordingTransport::default());
        let reporter = EventReporter::new(
            &test_config(DeliveryMode::Inline),
            transport.clone(),
            quiet_collector(),
        );
        assert!(!reporter.is_background());

        reporter.report(sample_event("jobs:sync"));

        let posts = lock(&transport.posts);
        assert_eq!(posts.len(), 1);
        let (url, token, body) = &posts[0];
        assert_eq!(url, "http://monitor.test/api/cron-logs");
        assert_eq!(token.as_deref(), Some("secret"));
        assert_eq!(body["status"], "finished");
        assert!(body["memory_peak_mb"].is_number());
        assert!(body["memory_current_mb"].is_number());
    }

    #[test]
    fn test_transport_failure_does_not_propagate() {
        let transport = Arc::new(RecordingTransport::failing());
        let reporter = EventReporter::new(
            &test_config(DeliveryMode::Inline),
            transport.clone(),
            quiet_collector(),
        );

        reporter.report(sample_event("jobs:sync"));

        assert_eq!(transport.bodies().len(), 1);
    }

    #[test]
    fn test_background_reports_drain_on_shutdown() {
        let transport = Arc::new(RecordingTransport::default());
        let reporter = EventReporter::new(
            &test_config(DeliveryMode::Background),
            transport.clone(),
            quiet_collector(),
        );
        assert!(reporter.is_background());

        for i in 0..5 {
            reporter.report(sample_event(&format!("job-{}", i)));
        }
        reporter.shutdown();

        assert!(!reporter.is_background());
        assert_eq!(transport.bodies().len(), 5);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let transport = Arc::new(RecordingTransport {
            delay: Some(Duration::from_millis(200)),
            ..RecordingTransport::default()
        });
        let mut config = test_config(DeliveryMode::Background);
        config.queue_capacity = 1;
        let reporter = EventReporter::new(&config, transport.clone(), quiet_collector());

        let started = std::time::Instant::now();
        for i in 0..10 {
            reporter.report(sample_event(&format!("job-{}", i)));
        }
        assert!(started.elapsed() < Duration::from_millis(200));

        reporter.shutdown();
        let delivered = transport.bodies().len();
        assert!(delivered >= 1 && delivered < 10);
    }

    #[test]
    fn test_report_after_shutdown_is_inline() {
        let transport = Arc::new(RecordingTransport::default());
        let reporter = EventReporter::new(
            &test_config(DeliveryMode::Background),
            transport.clone(),
            quiet_collector(),
        );

        reporter.shutdown();
        reporter.report(sample_event("late"));

        assert_eq!(transport.bodies().len(), 1);
    }

    #[test]
    fn test_alert_posts_text_without_token() {
        let transport = Arc::new(RecordingTransport::default());
        let reporter = EventReporter::new(
            &test_config(DeliveryMode::Inline),
            transport.clone(),
            quiet_collector(),
        );

        reporter.alert(AlertMessage {
            webhook_url: "http://hooks.test/slack".to_string(),
            text: "Long Running Cron Job: x took 2 minutes in demo".to_string(),
        });

        let posts = lock(&transport.posts);
        let (url, token, body) = &posts[0];
        assert_eq!(url, "http://hooks.test/slack");
        assert!(token.is_none());
        assert_eq!(body["text"], "Long Running Cron Job: x took 2 minutes in demo");
    }

    #[test]
    fn test_drop_joins_worker() {
        let transport = Arc::new(RecordingTransport::default());
        {
            let reporter = EventReporter::new(
                &test_config(DeliveryMode::Background),
                transport.clone(),
                quiet_collector(),
            );
            reporter.report(sample_event("jobs:sync"));
        }
        assert_eq!(transport.bodies().len(), 1);
    }
}
