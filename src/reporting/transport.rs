//! HTTP Delivery
//!
//! Posts JSON bodies to the monitoring endpoint and alert webhooks.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use thiserror::Error;

/// Header carrying the monitoring API token.
pub const API_TOKEN_HEADER: &str = "X-API-Token";

/// Errors raised while delivering a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Something that can deliver a JSON body to a URL.
pub trait Transport: Send + Sync {
    /// Posts `body` to `url`, attaching `token` as the API token header.
    fn post_json(
        &self,
        url: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<(), ReportError>;
}

/// Blocking HTTP transport with a fixed request timeout.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cronwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<(), ReportError> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = token {
            request = request.header(API_TOKEN_HEADER, token);
        }

        let response = request.send()?;
        let status = response.status();

        if status.is_success() {
            debug!("POST {} -> {}", url, status);
            return Ok(());
        }

        Err(ReportError::Status {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        })
    }
}
