//! MedMeet API conformance harness
//!
//! This crate drives a deployed MedMeet appointment-booking service over
//! HTTP and classifies each call as pass or fail:
//! - Registers a doctor and a patient and keeps one session per actor
//! - Exercises auth, time slots, doctors, appointments and notifications
//! - Records every check in an append-only result log and summarises it
//! - Runs declarative YAML probes against arbitrary endpoints
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Conformance Harness (Rust)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Suite (full | regression | scenario | auth)                │
//! │    └── Harness                                              │
//! │          ├── doctor: Actor { session, user }                │
//! │          ├── patient: Actor { session, user }               │
//! │          ├── register(), book_slot(), ...  (one TestResult) │
//! │          └── finish() -> SuiteSummary                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ApiClient                                                  │
//! │    ├── execute(ApiRequest) -> ApiResponse                   │
//! │    └── Expectation::check(response) -> JSON body            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checks run strictly one after another. A failed check never stops the
//! run; later checks that need its output report the missing dependency.

pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod fixtures;
pub mod probe;
pub mod report;
pub mod runner;
pub mod session;
pub mod suites;

pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult, FailureKind};
pub use report::{OutputFormat, SuiteSummary, TestResult};
pub use runner::Harness;
pub use session::{Actor, Role, Session};
pub use suites::{run_suite, Suite, SuiteOutcome};
