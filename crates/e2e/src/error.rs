//! Error types for the conformance harness

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Expected HTTP {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        body: String,
        /// Observed status and body
        response: Value,
    },

    #[error("Invalid response format, missing `{field}`: {body}")]
    MissingField {
        field: String,
        body: String,
        response: Value,
    },

    #[error("Wrong error message: {body}")]
    WrongErrorMessage {
        expected: String,
        body: String,
        response: Value,
    },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("{0}")]
    MissingDependency(String),

    #[error("Probe spec parse error: {0}")]
    SpecParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// How a failed check is classified in the result log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A response arrived but did not satisfy the contract
    Assertion,
    /// The request never produced a usable response
    Transport,
}

impl E2eError {
    pub fn kind(&self) -> FailureKind {
        match self {
            E2eError::Http(_) | E2eError::Json(_) | E2eError::Io(_) => FailureKind::Transport,
            _ => FailureKind::Assertion,
        }
    }

    /// The response an assertion failure was judged on, if any
    pub fn response_data(&self) -> Option<&Value> {
        match self {
            E2eError::UnexpectedStatus { response, .. }
            | E2eError::MissingField { response, .. }
            | E2eError::WrongErrorMessage { response, .. } => Some(response),
            _ => None,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
