//! Explicit logging capability
//!
//! Nothing in this crate installs a global subscriber. A [`Logger`] carries
//! its own `tracing` dispatcher and is handed to whatever needs to log, so a
//! client or runner can be observed (or silenced) in isolation.

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone)]
pub struct Logger {
    dispatch: Dispatch,
    component: &'static str,
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            component: "e2e",
        }
    }

    /// Discards every event
    pub fn disabled() -> Self {
        Self::new(Dispatch::none())
    }

    /// Human-readable output on stderr, filtered by `EnvFilter` directives
    pub fn from_filter(directives: &str) -> E2eResult<Self> {
        let filter = EnvFilter::try_new(directives)
            .map_err(|e| E2eError::Config(format!("invalid log filter '{}': {}", directives, e)))?;

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        Ok(Self::new(Dispatch::new(subscriber)))
    }

    /// Filter from `RUST_LOG`, falling back to `info`
    pub fn from_env() -> E2eResult<Self> {
        let directives = std::env::var("RUST_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        Self::from_filter(&directives)
    }

    /// Same sink, different component label
    pub fn named(&self, component: &'static str) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            component,
        }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Run `f` with this logger's dispatcher active
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, || {
            let span = tracing::info_span!("e2e", component = self.component);
            span.in_scope(f)
        })
    }
}
