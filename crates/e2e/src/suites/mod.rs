//! Scripted check sequences

use clap::ValueEnum;
use tracing::info;

use crate::config::HarnessConfig;
use crate::error::E2eResult;
use crate::report::SuiteSummary;
use crate::runner::Harness;

pub mod auth;
pub mod full;
pub mod regression;
pub mod scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    /// Every endpoint, in dependency order
    Full,
    /// Quick critical-path run
    Regression,
    /// Doctor and patient end-to-end booking flow
    Scenario,
    /// Protected endpoints without a session
    Auth,
}

impl Suite {
    pub fn name(&self) -> &'static str {
        match self {
            Suite::Full => "full",
            Suite::Regression => "regression",
            Suite::Scenario => "scenario",
            Suite::Auth => "auth",
        }
    }

    /// Checks whose failure fails the run; `None` means every check counts
    pub fn critical_checks(&self) -> Option<&'static [&'static str]> {
        match self {
            Suite::Regression => Some(regression::CRITICAL_CHECKS),
            _ => None,
        }
    }

    pub async fn run(&self, harness: &mut Harness) {
        match self {
            Suite::Full => full::run(harness).await,
            Suite::Regression => regression::run(harness).await,
            Suite::Scenario => scenario::run(harness).await,
            Suite::Auth => auth::run(harness).await,
        }
    }
}

/// Summary plus the pass/fail verdict for a suite run
#[derive(Debug, Clone)]
pub struct SuiteOutcome {
    pub summary: SuiteSummary,
    pub passed: bool,
}

impl SuiteOutcome {
    pub fn new(suite: Suite, summary: SuiteSummary) -> Self {
        let passed = match suite.critical_checks() {
            Some(critical) => {
                let critical_passed = summary.passed_among(critical);
                info!(
                    "Critical Tests: {}/{} passed",
                    critical_passed,
                    critical.len()
                );
                critical_passed == critical.len()
            }
            None => summary.all_passed(),
        };
        Self { summary, passed }
    }
}

/// Run `suite` against the configured deployment
pub async fn run_suite(suite: Suite, config: HarnessConfig) -> E2eResult<SuiteOutcome> {
    info!("Starting {} suite against {}", suite.name(), config.base_url);

    let mut harness = Harness::new(config)?;
    suite.run(&mut harness).await;

    Ok(SuiteOutcome::new(suite, harness.finish(suite.name())))
}
