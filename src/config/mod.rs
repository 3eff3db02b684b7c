//! Configuration Module
//!
//! Settings for the monitor: endpoint, credentials, delivery mode and
//! long-running job alerts.

pub mod settings;

pub use settings::{AlertConfig, ConfigError, DeliveryMode, MonitorConfig, MonitoredJob};
