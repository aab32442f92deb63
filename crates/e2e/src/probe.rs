//! Declarative and diagnostic probes
//!
//! Probes are single unauthenticated requests. A probe file lists them in
//! YAML; a probe with `expect_status` is a check, one without only records
//! what the service answered.

use std::path::Path;
use std::time::Instant;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{E2eError, E2eResult};
use crate::report::{ResultLog, SuiteSummary};
use crate::session::user_id_from_cookie_header;

/// Body excerpt recorded by diagnostic probes
const DIAGNOSTIC_EXCERPT: usize = 200;

/// A probe file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub probes: Vec<Probe>,
}

/// A single request and the status it should produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    /// Label in the result log; defaults to `METHOD path`
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_method")]
    pub method: String,

    /// API path, with or without the `/api` prefix
    pub path: String,

    #[serde(default)]
    pub body: Option<Value>,

    #[serde(default)]
    pub expect_status: Option<u16>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Probe {
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method.to_uppercase(), self.path))
    }

    fn request(&self) -> E2eResult<ApiRequest> {
        let method = Method::from_bytes(self.method.to_uppercase().as_bytes())
            .map_err(|_| E2eError::SpecParse(format!("unknown HTTP method {:?}", self.method)))?;
        let mut request = ApiRequest::new(method, self.path.clone());
        request.body = self.body.clone();
        Ok(request)
    }
}

impl ProbeSpec {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.probes.is_empty() {
            return Err(E2eError::SpecParse(format!("{}: no probes", spec.name)));
        }
        Ok(spec)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load every `.yaml`/`.yml` file under `dir`, in path order
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// Load a single file, or every probe file in a directory
    pub fn load(path: &Path) -> E2eResult<Vec<Self>> {
        if path.is_dir() {
            Self::load_all(path)
        } else {
            Ok(vec![Self::from_file(path)?])
        }
    }
}

/// Run probe specs without a session
pub async fn run_probes(client: &ApiClient, specs: &[ProbeSpec]) -> SuiteSummary {
    let started = Instant::now();
    let mut log = ResultLog::new();

    for spec in specs {
        info!("Running probe spec {} ({} probes)", spec.name, spec.probes.len());
        for probe in &spec.probes {
            let start = Instant::now();
            let outcome = run_probe(client, probe).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            match outcome {
                Ok(message) => log.pass(probe.label(), message, duration_ms),
                Err(err) => log.error(probe.label(), &err, duration_ms),
            }
        }
    }

    let base_url = &client.config().base_url;
    SuiteSummary::new(
        "probe",
        base_url,
        log.into_results(),
        started.elapsed().as_millis() as u64,
    )
}

async fn run_probe(client: &ApiClient, probe: &Probe) -> E2eResult<String> {
    let response = client.execute(probe.request()?).await?;
    debug!("{} -> {}", probe.label(), response.status);

    match probe.expect_status {
        Some(expected) if expected != response.status => Err(E2eError::UnexpectedStatus {
            expected,
            actual: response.status,
            body: response.snippet(DIAGNOSTIC_EXCERPT),
            response: response.observed(),
        }),
        Some(expected) => Ok(format!("Responded {} as expected", expected)),
        None => Ok(format!(
            "HTTP {}: {}",
            response.status,
            response.snippet(DIAGNOSTIC_EXCERPT)
        )),
    }
}

/// Paths the path probe hits when none are given
pub const DEFAULT_PATHS: &[&str] = &[
    "/api/auth/me",
    "/api/appointments",
    "/api/notifications",
    "/api/doctors",
    "/api/time-slots",
    "/api/nonexistent",
];

/// GET each path relative to the deployment root and record what came back
pub async fn probe_paths(client: &ApiClient, paths: &[String]) -> SuiteSummary {
    let started = Instant::now();
    let mut log = ResultLog::new();

    for path in paths {
        let start = Instant::now();
        let outcome = client.execute_raw(ApiRequest::get(path.clone())).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(response) => log.pass(
                format!("GET {}", path),
                format!(
                    "HTTP {}: {}",
                    response.status,
                    response.snippet(DIAGNOSTIC_EXCERPT)
                ),
                duration_ms,
            ),
            Err(err) => log.error(format!("GET {}", path), &err, duration_ms),
        }
    }

    SuiteSummary::new(
        "paths",
        &client.config().base_url,
        log.into_results(),
        started.elapsed().as_millis() as u64,
    )
}

/// One cookie header and the user it authenticates as
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieCase {
    pub header: Option<String>,
    pub user_id: Option<String>,
}

/// Cookie headers the service is known to receive, including malformed ones
pub const COOKIE_CASES: &[Option<&str>] = &[
    Some(""),
    None,
    Some("userId=user123"),
    Some("userId=user123; sessionId=abc"),
    Some("invalidcookie"),
    Some("; ; ;"),
];

/// Parse each known cookie header case locally
pub fn cookie_probe() -> Vec<CookieCase> {
    COOKIE_CASES
        .iter()
        .map(|header| CookieCase {
            header: header.map(str::to_string),
            user_id: user_id_from_cookie_header(*header),
        })
        .collect()
}
