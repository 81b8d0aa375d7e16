//! Command-line arguments of the scenario binary
//!
//! Every target setting has a flag and an environment fallback, so the suite
//! can be pointed at a server either way.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{parse_timeout_secs, ClientConfig};

#[derive(Parser, Debug)]
#[command(name = "account-e2e")]
#[command(about = "Account lifecycle E2E scenarios")]
pub struct CliArgs {
    /// Host of the server under test
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port of the server under test
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Per-request timeout in seconds
    #[arg(
        long = "timeout-secs",
        env = "E2E_TIMEOUT_SECS",
        default_value = "30",
        value_parser = parse_timeout_secs
    )]
    pub timeout: Duration,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    pub output: PathBuf,

    /// Run only scenarios whose name contains this text
    pub filter: Option<String>,
}

impl CliArgs {
    /// Target configuration, or `None` when no server was named
    pub fn client_config(&self) -> Option<ClientConfig> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let port = self.port?;
        Some(ClientConfig::new(host, port).with_timeout(self.timeout))
    }
}
