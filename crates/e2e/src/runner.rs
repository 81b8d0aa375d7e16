//! Suite runner that executes scenarios and records their results

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::{E2eError, E2eResult};
use crate::logging::Logger;
use crate::scenarios::{Scenario, ScenarioContext};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the suite runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Server under test
    pub client: ClientConfig,

    /// Output directory for results
    pub output_dir: PathBuf,
}

impl RunnerConfig {
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Runs scenarios one after another against one server
pub struct SuiteRunner {
    config: RunnerConfig,
    log: Logger,
}

impl SuiteRunner {
    pub fn new(config: RunnerConfig, log: Logger) -> Self {
        Self {
            config,
            log: log.named("runner"),
        }
    }

    /// Run every scenario in order
    pub async fn run_all(&self, scenarios: &[Scenario]) -> SuiteResult {
        let start = Instant::now();
        self.log.scope(|| info!("Running {} scenario(s)...", scenarios.len()));

        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let result = self.run_scenario(scenario).await;
            self.log.scope(|| {
                if result.success {
                    info!("✓ {} ({} ms)", result.name, result.duration_ms);
                } else {
                    error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
                }
            });
            results.push(result);
        }

        let suite = SuiteResult::from_results(results, start.elapsed().as_millis() as u64);
        self.log.scope(|| {
            info!(
                "Scenario results: {} passed, {} failed ({} ms)",
                suite.passed, suite.failed, suite.duration_ms
            )
        });
        suite
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&self, scenarios: &[Scenario], tag: &str) -> SuiteResult {
        let filtered: Vec<Scenario> = scenarios.iter().filter(|s| s.has_tag(tag)).cloned().collect();
        self.run_all(&filtered).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&self, scenarios: &[Scenario], name: &str) -> E2eResult<ScenarioResult> {
        let scenario = scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::Config(format!("Scenario not found: {}", name)))?;

        Ok(self.run_scenario(scenario).await)
    }

    /// Run a single scenario on a fresh context
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        self.log.scope(|| debug!("Running scenario: {}", scenario.name));

        let ctx = ScenarioContext {
            config: self.config.client.clone(),
            log: self.log.named("scenario"),
        };
        let outcome = (scenario.run)(ctx).await;

        ScenarioResult {
            name: scenario.name.to_string(),
            success: outcome.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        self.log.scope(|| info!("Results written to: {}", path.display()));
        Ok(path)
    }
}
