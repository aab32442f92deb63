//! Result collection and summaries

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult, FailureKind};

/// Outcome of one check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<serde_json::Value>,
    pub duration_ms: u64,
}

/// Append-only log of check outcomes, in execution order
#[derive(Debug, Default)]
pub struct ResultLog {
    results: Vec<TestResult>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pass(&mut self, name: impl Into<String>, message: impl Into<String>, duration_ms: u64) {
        self.push(TestResult {
            name: name.into(),
            success: true,
            message: message.into(),
            failure: None,
            response_data: None,
            duration_ms,
        });
    }

    pub fn fail(&mut self, name: impl Into<String>, message: impl Into<String>, duration_ms: u64) {
        self.push(TestResult {
            name: name.into(),
            success: false,
            message: message.into(),
            failure: Some(FailureKind::Assertion),
            response_data: None,
            duration_ms,
        });
    }

    /// Record a failure with its classification and the response it was judged on
    pub fn error(&mut self, name: impl Into<String>, err: &E2eError, duration_ms: u64) {
        let message = match err.kind() {
            FailureKind::Transport => format!("Exception: {}", err),
            FailureKind::Assertion => err.to_string(),
        };
        self.push(TestResult {
            name: name.into(),
            success: false,
            message,
            failure: Some(err.kind()),
            response_data: err.response_data().cloned(),
            duration_ms,
        });
    }

    pub fn push(&mut self, result: TestResult) {
        if result.success {
            info!("✓ {}: {}", result.name, result.message);
        } else {
            warn!("✗ {}: {}", result.name, result.message);
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<TestResult> {
        self.results
    }
}

/// Result of running a suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub suite: String,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl SuiteSummary {
    pub fn new(suite: &str, base_url: &str, results: Vec<TestResult>, duration_ms: u64) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.success).count();
        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };
        Self {
            suite: suite.to_string(),
            base_url: base_url.to_string(),
            total,
            passed,
            failed: total - passed,
            success_rate,
            duration_ms,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.total > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Count of `names` that were recorded as passing
    pub fn passed_among(&self, names: &[&str]) -> usize {
        names
            .iter()
            .filter(|n| self.results.iter().any(|r| r.name == **n && r.success))
            .count()
    }

    /// Write the summary as pretty JSON into `output_dir`
    pub fn write_json(&self, output_dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join(format!("{}-results.json", self.suite));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    /// Render the summary in the requested format
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default(),
            OutputFormat::Table => self.render_table(),
            OutputFormat::Plain => self.render_plain(),
        }
    }

    fn render_plain(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = format!(
            "{rule}\nTEST RESULTS SUMMARY ({})\n{rule}\nTotal Tests: {}\nPassed: {}\nFailed: {}\nSuccess Rate: {:.1}%\n",
            self.suite, self.total, self.passed, self.failed, self.success_rate
        );
        if self.failed > 0 {
            out.push_str("\nFAILED TESTS:\n");
            for r in self.failures() {
                out.push_str(&format!("  - {}: {}\n", r.name, r.message));
            }
        }
        out.push_str(&rule);
        out
    }

    fn render_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Check", "Result", "Message", "ms"]);
        for r in &self.results {
            table.add_row(vec![
                r.name.clone(),
                if r.success { "PASS" } else { "FAIL" }.to_string(),
                r.message.clone(),
                r.duration_ms.to_string(),
            ]);
        }

        format!(
            "{table}\n{} passed, {} failed of {} ({:.1}%) in {} ms against {}",
            self.passed, self.failed, self.total, self.success_rate, self.duration_ms, self.base_url
        )
    }
}

/// Summary output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> ResultLog {
        let mut log = ResultLog::new();
        log.pass("Doctor Registration", "Doctor registered: Dr. John Smith", 12);
        log.fail("Book Appointment", "No available slots to book", 3);
        log.pass("Logout", "User logged out successfully", 4);
        log
    }

    #[test]
    fn test_summary_counts() {
        let summary = SuiteSummary::new("full", "http://localhost", sample_log().into_results(), 19);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert!((summary.success_rate - 66.666).abs() < 0.01);
        assert!(!summary.all_passed());
        assert_eq!(
            summary.passed_among(&["Doctor Registration", "Book Appointment", "Missing"]),
            1
        );
    }

    #[test]
    fn test_empty_summary_is_not_a_pass() {
        let summary = SuiteSummary::new("auth", "http://localhost", vec![], 0);
        assert_eq!(summary.success_rate, 0.0);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_transport_errors_are_classified() {
        let mut log = ResultLog::new();
        let err = E2eError::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        log.error("Auth Me", &err, 0);
        let r = &log.results()[0];
        assert!(!r.success);
        assert_eq!(r.failure, Some(FailureKind::Transport));
        assert!(r.message.starts_with("Exception: "));
        assert!(r.response_data.is_none());
    }

    #[test]
    fn test_assertion_errors_keep_response() {
        let mut log = ResultLog::new();
        let err = E2eError::UnexpectedStatus {
            expected: 401,
            actual: 200,
            body: r#"{"success":true}"#.to_string(),
            response: serde_json::json!({"status": 200, "body": {"success": true}}),
        };
        log.error("Auth Me Unauthorized", &err, 2);

        let r = &log.results()[0];
        assert_eq!(r.failure, Some(FailureKind::Assertion));
        assert_eq!(r.message, r#"Expected HTTP 401, got 200: {"success":true}"#);
        let data = r.response_data.as_ref().unwrap();
        assert_eq!(data["status"], 200);
        assert_eq!(data["body"]["success"], true);
    }

    #[test]
    fn test_plain_render_lists_failures() {
        let summary = SuiteSummary::new("full", "http://localhost", sample_log().into_results(), 19);
        let text = summary.render(OutputFormat::Plain);
        assert!(text.contains("Success Rate: 66.7%"));
        assert!(text.contains("  - Book Appointment: No available slots to book"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let summary = SuiteSummary::new("regression", "http://localhost", sample_log().into_results(), 19);
        let path = summary.write_json(dir.path()).unwrap();
        assert!(path.ends_with("regression-results.json"));

        let parsed: SuiteSummary =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.failed, 1);
        assert_eq!(parsed.results[1].failure, Some(FailureKind::Assertion));
    }
}
