//! Suites run against an in-process booking service

mod support;

use std::time::Duration;

use medmeet_e2e::{run_suite, FailureKind, HarnessConfig, Suite, SuiteOutcome};
use support::Mode;
use test_case::test_case;

fn failures(outcome: &SuiteOutcome) -> Vec<String> {
    outcome
        .summary
        .failures()
        .map(|r| format!("{}: {}", r.name, r.message))
        .collect()
}

#[test_case(Suite::Full ; "full")]
#[test_case(Suite::Regression ; "regression")]
#[test_case(Suite::Scenario ; "scenario")]
#[test_case(Suite::Auth ; "auth")]
#[tokio::test]
async fn suite_passes_against_conforming_service(suite: Suite) {
    let mock = support::spawn(Mode::Conforming).await;
    let outcome = run_suite(suite, mock.config()).await.unwrap();

    assert!(outcome.passed, "{:?}", failures(&outcome));
    assert_eq!(outcome.summary.failed, 0, "{:?}", failures(&outcome));
    assert_eq!(outcome.summary.suite, suite.name());
}

#[tokio::test]
async fn full_suite_records_checks_in_order() {
    let mock = support::spawn(Mode::Conforming).await;
    let outcome = run_suite(Suite::Full, mock.config()).await.unwrap();
    let names: Vec<_> = outcome.summary.results.iter().map(|r| r.name.as_str()).collect();

    assert_eq!(names[0], "Doctor Registration");
    assert_eq!(names[1], "Patient Registration");
    assert_eq!(names[2], "Duplicate Registration");
    assert_eq!(names.last(), Some(&"Logout"));

    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert!(position("Delete Time Slot") < position("Book Appointment"));
    assert!(position("Book Appointment") < position("Update Appointment Status"));
    assert!(position("Get Patient Notifications") < position("Mark Notification Read"));

    // Three standard slots are created and each is recorded on its own.
    assert_eq!(
        names.iter().filter(|n| n.starts_with("Create Time Slot 2")).count(),
        3
    );
}

#[tokio::test]
async fn auth_suite_fails_when_routes_are_open() {
    let mock = support::spawn(Mode::OpenRoutes).await;
    let outcome = run_suite(Suite::Auth, mock.config()).await.unwrap();

    assert!(!outcome.passed);
    assert_eq!(outcome.summary.total, 7);
    assert_eq!(outcome.summary.failed, 7);
    for result in &outcome.summary.results {
        assert_eq!(result.failure, Some(FailureKind::Assertion), "{}", result.name);
        assert!(result.message.contains("Expected HTTP 401, got 200"), "{}", result.message);

        let observed = result.response_data.as_ref().unwrap();
        assert_eq!(observed["status"], 200);
        assert_eq!(observed["body"]["success"], true);
    }
}

#[test_case(Suite::Full ; "full")]
#[test_case(Suite::Scenario ; "scenario")]
#[tokio::test]
async fn suite_fails_when_passwords_are_ignored(suite: Suite) {
    let mock = support::spawn(Mode::AnyPassword).await;
    let outcome = run_suite(suite, mock.config()).await.unwrap();

    assert!(!outcome.passed);
    let failed: Vec<_> = outcome.summary.failures().map(|r| r.name.as_str()).collect();
    assert_eq!(failed, vec!["Wrong Password Login"]);

    let result = outcome
        .summary
        .results
        .iter()
        .find(|r| r.name == "Wrong Password Login")
        .unwrap();
    assert_eq!(result.failure, Some(FailureKind::Assertion));
    assert_eq!(result.response_data.as_ref().unwrap()["status"], 200);
}

#[tokio::test]
async fn unreachable_service_records_transport_failures() {
    let mut config = HarnessConfig::for_base_url(&support::unreachable_base_url()).unwrap();
    config.request_timeout = Duration::from_secs(2);

    let outcome = run_suite(Suite::Full, config).await.unwrap();
    let summary = &outcome.summary;

    assert!(!outcome.passed);
    assert_eq!(summary.passed, 0);
    assert!(summary.total >= 20, "sequence stopped after {} checks", summary.total);

    let first = &summary.results[0];
    assert_eq!(first.name, "Doctor Registration");
    assert_eq!(first.failure, Some(FailureKind::Transport));
    assert!(first.message.starts_with("Exception: "));

    // Checks that depend on a session explain what is missing instead.
    let me = summary.results.iter().find(|r| r.name == "Auth Me").unwrap();
    assert_eq!(me.failure, Some(FailureKind::Assertion));
    assert_eq!(me.message, "No doctor session available");
}

#[tokio::test]
async fn unreachable_service_stops_regression_early() {
    let config = HarnessConfig::for_base_url(&support::unreachable_base_url()).unwrap();
    let outcome = run_suite(Suite::Regression, config).await.unwrap();

    assert!(!outcome.passed);
    assert_eq!(outcome.summary.total, 1);
    assert_eq!(outcome.summary.results[0].name, "Doctor Registration");
}

#[tokio::test]
async fn results_file_is_written() {
    let mock = support::spawn(Mode::Conforming).await;
    let dir = tempfile::tempdir().unwrap();

    let outcome = run_suite(Suite::Regression, mock.config()).await.unwrap();
    let path = outcome.summary.write_json(dir.path()).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["suite"], "regression");
    assert_eq!(written["base_url"], mock.base_url());
    assert_eq!(written["failed"], 0);
    assert!(written["results"].as_array().unwrap().len() >= 8);
}
