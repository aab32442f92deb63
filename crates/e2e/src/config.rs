//! Harness configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{E2eError, E2eResult};

/// Environment variable selecting the deployment under test
pub const BASE_URL_ENV: &str = "MEDMEET_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// Configuration for a harness run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Deployment root, without trailing slash
    pub base_url: String,

    /// Prefix every API path is mounted under
    pub api_prefix: String,

    /// Transport timeout applied to every request
    pub request_timeout: Duration,

    /// Where result files are written
    pub output_dir: PathBuf,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: "/api".to_string(),
            request_timeout: Duration::from_secs(30),
            output_dir: PathBuf::from("test-results"),
            user_agent: format!("medmeet-e2e/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HarnessConfig {
    /// Build a config for the given deployment, validating the URL
    pub fn for_base_url(base_url: &str) -> E2eResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            ..Default::default()
        })
    }

    /// Read the base URL from `MEDMEET_BASE_URL`, falling back to the default
    pub fn from_env() -> E2eResult<Self> {
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::for_base_url(&base_url)
    }

    /// Absolute URL for an API path such as `/auth/me`
    pub fn api_url(&self, path: &str) -> String {
        let path = path.strip_prefix(&self.api_prefix).unwrap_or(path);
        if path.starts_with('/') {
            format!("{}{}{}", self.base_url, self.api_prefix, path)
        } else {
            format!("{}{}/{}", self.base_url, self.api_prefix, path)
        }
    }

    /// Absolute URL for a path relative to the deployment root
    pub fn root_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn normalize_base_url(raw: &str) -> E2eResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| E2eError::InvalidConfig(format!("base URL {:?}: {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(E2eError::InvalidConfig(format!(
                "base URL {:?}: unsupported scheme {}",
                raw, other
            )))
        }
    }
    if parsed.host_str().is_none() {
        return Err(E2eError::InvalidConfig(format!("base URL {:?} has no host", raw)));
    }

    Ok(trimmed.to_string())
}
