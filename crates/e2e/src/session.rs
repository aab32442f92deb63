//! Per-actor sessions and cookie handling
//!
//! The booking service authenticates with a single `userId` cookie set on
//! register/login. Each actor owns its own [`Session`]; nothing is shared
//! through a global jar, so an unauthenticated call is simply one made
//! without a session.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the cookie the service issues
pub const SESSION_COOKIE: &str = "userId";

/// Client-held credential presented on authenticated calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Extract the session from a response's `Set-Cookie` headers.
    ///
    /// A cookie that is cleared (empty value or `Max-Age=0`) yields `None`.
    pub fn from_set_cookie<'a, I>(headers: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        headers.into_iter().find_map(|header| {
            let mut attrs = header.split(';').map(str::trim);
            let (name, value) = attrs.next()?.split_once('=')?;
            if name != SESSION_COOKIE || value.is_empty() {
                return None;
            }
            let expired = attrs.any(|a| a.eq_ignore_ascii_case("max-age=0"));
            if expired {
                return None;
            }
            Some(Self::new(value))
        })
    }

    /// Value for the request `Cookie` header
    pub fn cookie_header(&self) -> String {
        format!("{}={}", SESSION_COOKIE, self.user_id)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cookie_header())
    }
}

/// Parse a request `Cookie` header the way the service splits it.
///
/// Pairs are separated by `"; "`; a part without `=` is skipped and only the
/// first `=` separates key from value.
pub fn parse_cookie_header(header: Option<&str>) -> HashMap<String, String> {
    let header = header.unwrap_or_default();
    if header.is_empty() {
        return HashMap::new();
    }

    header
        .split("; ")
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The user id a `Cookie` header authenticates as, if any
pub fn user_id_from_cookie_header(header: Option<&str>) -> Option<String> {
    parse_cookie_header(header)
        .remove(SESSION_COOKIE)
        .filter(|v| !v.is_empty())
}

/// Which side of a booking an actor plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    /// Capitalised label used in check names
    pub fn label(&self) -> &'static str {
        match self {
            Role::Doctor => "Doctor",
            Role::Patient => "Patient",
        }
    }
}

/// An identity driven by the harness
#[derive(Debug, Clone)]
pub struct Actor {
    pub role: Role,
    pub email: String,
    pub password: String,
    pub session: Option<Session>,
    /// User object returned by register/login
    pub user: Option<serde_json::Value>,
}

impl Actor {
    pub fn new(role: Role, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            role,
            email: email.into(),
            password: password.into(),
            session: None,
            user: None,
        }
    }

    /// Server-assigned id, once registered
    pub fn id(&self) -> Option<&str> {
        self.user.as_ref()?.get("id")?.as_str()
    }

    pub fn name(&self) -> Option<&str> {
        self.user.as_ref()?.get("name")?.as_str()
    }

    pub fn is_registered(&self) -> bool {
        self.user.is_some()
    }
}
