//! Response contracts
//!
//! An [`Expectation`] describes what a call must return: a status code and,
//! optionally, fields that must be present or truthy and a fragment the
//! `error` message must contain. Checking a response yields the parsed JSON
//! body on success so the caller can pull ids out of it.

use serde_json::Value;

use crate::client::ApiResponse;
use crate::error::{E2eError, E2eResult};

/// Longest body excerpt carried in an error message
const BODY_EXCERPT: usize = 300;

#[derive(Debug, Clone)]
pub struct Expectation {
    pub status: u16,
    pub present: Vec<&'static str>,
    pub truthy: Vec<&'static str>,
    pub error_contains: Option<String>,
}

impl Expectation {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            present: Vec::new(),
            truthy: Vec::new(),
            error_contains: None,
        }
    }

    pub fn ok() -> Self {
        Self::status(200)
    }

    pub fn unauthorized() -> Self {
        Self::status(401)
    }

    /// Require `field` to exist in the body (any value)
    pub fn field(mut self, field: &'static str) -> Self {
        self.present.push(field);
        self
    }

    /// Require `field` to exist and be truthy (`success: true`, non-empty `user`)
    pub fn truthy(mut self, field: &'static str) -> Self {
        self.truthy.push(field);
        self
    }

    /// Require the body's `error` string to contain `fragment`, ignoring case
    pub fn error_contains(mut self, fragment: &str) -> Self {
        self.error_contains = Some(fragment.to_lowercase());
        self
    }

    fn needs_body(&self) -> bool {
        !self.present.is_empty() || !self.truthy.is_empty() || self.error_contains.is_some()
    }

    /// Check a response, returning its JSON body (or `Null` for status-only checks)
    pub fn check(&self, response: &ApiResponse) -> E2eResult<Value> {
        if response.status != self.status {
            return Err(E2eError::UnexpectedStatus {
                expected: self.status,
                actual: response.status,
                body: response.snippet(BODY_EXCERPT),
                response: response.observed(),
            });
        }
        if !self.needs_body() {
            return Ok(response.json().unwrap_or(Value::Null));
        }

        let body = response.json()?;

        if let Some(fragment) = &self.error_contains {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();
            if !message.contains(fragment.as_str()) {
                return Err(E2eError::WrongErrorMessage {
                    expected: fragment.clone(),
                    body: excerpt(&body),
                    response: response.observed(),
                });
            }
        }

        for field in &self.present {
            if body.get(*field).is_none() {
                return Err(missing(field, &body, response));
            }
        }
        for field in &self.truthy {
            if !body.get(*field).map(is_truthy).unwrap_or(false) {
                return Err(missing(field, &body, response));
            }
        }

        Ok(body)
    }
}

fn excerpt(body: &Value) -> String {
    let mut text = body.to_string();
    if let Some((idx, _)) = text.char_indices().nth(BODY_EXCERPT) {
        text.truncate(idx);
        text.push_str("...");
    }
    text
}

fn missing(field: &str, body: &Value, response: &ApiResponse) -> E2eError {
    E2eError::MissingField {
        field: field.to_string(),
        body: excerpt(body),
        response: response.observed(),
    }
}

/// Loose truthiness: null, false, zero, empty strings and empty containers are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Borrow an array field, treating absence as empty
pub fn array<'a>(body: &'a Value, field: &str) -> &'a [Value] {
    body.get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// String field of a JSON object
pub fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

/// Slots whose `is_available` flag is truthy
pub fn available_slots(body: &Value) -> Vec<&Value> {
    array(body, "slots")
        .iter()
        .filter(|s| s.get("is_available").map(is_truthy).unwrap_or(false))
        .collect()
}
