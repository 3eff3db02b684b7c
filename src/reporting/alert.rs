//! Long-Running Job Alerts
//!
//! Produces a chat webhook message when a finished task ran longer
//! than its configured threshold.

use crate::config::MonitorConfig;
use crate::monitoring::round_to;

use super::event::{MonitoringEvent, TaskStatus};

/// A message destined for an incoming chat webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub webhook_url: String,
    pub text: String,
}

impl AlertMessage {
    /// JSON body understood by Slack-compatible webhooks.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "text": self.text })
    }
}

/// Returns an alert if `event` finished above its runtime threshold.
///
/// No alert is produced for failures, when no threshold applies to the
/// task, or when no webhook is configured.
pub fn long_running_alert(config: &MonitorConfig, event: &MonitoringEvent) -> Option<AlertMessage> {
    if event.status != TaskStatus::Finished || config.alerts.slack_webhook.is_empty() {
        return None;
    }

    let threshold = config.long_running_threshold(&event.command)?;
    if event.duration_seconds <= threshold.as_secs_f64() {
        return None;
    }

    let minutes = round_to(event.duration_seconds / 60.0, 1);
    Some(AlertMessage {
        webhook_url: config.alerts.slack_webhook.clone(),
        text: format!(
            "Long Running Cron Job: {} took {} minutes in {}",
            event.command, minutes, event.application
        ),
    })
}
