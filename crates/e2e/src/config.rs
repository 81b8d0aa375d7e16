//! Target server configuration

use std::time::Duration;

use reqwest::Url;

use crate::error::{E2eError, E2eResult};

/// Requests that produce no response within this window fail with a timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the server under test lives and how long to wait for it
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name or address of the server under test
    pub host: String,

    /// TCP port of the server under test
    pub port: u16,

    /// Per-request deadline
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Root URL that request paths are resolved against
    pub fn base_url(&self) -> E2eResult<Url> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        Url::parse(&format!("http://{}:{}/", host, self.port))
            .map_err(|e| E2eError::Config(format!("invalid target {}:{}: {}", self.host, self.port, e)))
    }
}

/// Parse a per-request timeout given in whole seconds; zero is rejected
pub fn parse_timeout_secs(raw: &str) -> E2eResult<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(E2eError::Config(format!(
            "E2E_TIMEOUT_SECS '{}' must be a positive number of seconds",
            raw
        ))),
    }
}
