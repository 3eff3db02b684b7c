//! Status Query Client
//!
//! Fetches the job overview kept by the monitoring server.

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::MonitorConfig;

/// Errors raised while querying job status.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("status request returned HTTP {status}")]
    Status { status: u16 },
}

/// One job as reported by the monitoring server. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct JobStatus {
    pub name: Option<String>,
    pub status: Option<String>,
    pub last_run: Option<String>,
    pub next_run: Option<String>,
    /// Seconds, sent either as a number or a string
    pub runtime: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusResponse {
    jobs: Vec<JobStatus>,
}

/// Retrieves all jobs from `<central_log_url>/status`.
pub fn fetch_status(config: &MonitorConfig) -> Result<Vec<JobStatus>, StatusError> {
    let url = config.status_url();
    debug!("Querying job status from {}", url);

    let client = Client::builder().timeout(config.report_timeout()).build()?;
    let response = client.get(&url).bearer_auth(&config.api_key).send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(StatusError::Status {
            status: status.as_u16(),
        });
    }

    let body: StatusResponse = response.json()?;
    Ok(body.jobs)
}
