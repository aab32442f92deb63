//! HTTP client for the booking API

use std::time::Instant;

use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::fixtures::{Booking, Credentials, ProfileUpdate, Registration, SlotQuery, SlotRequest, StatusUpdate};
use crate::session::Session;

/// A single request against the API
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
    pub session: Option<Session>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            session: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> E2eResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, pairs: Vec<(&'static str, String)>) -> Self {
        self.query = pairs;
        self
    }

    /// Attach a session; `None` leaves the request unauthenticated
    pub fn session(mut self, session: Option<&Session>) -> Self {
        self.session = session.cloned();
        self
    }
}

/// What came back from the service
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub text: String,
    /// Session issued through `Set-Cookie`, if any
    pub session: Option<Session>,
    pub duration_ms: u64,
}

impl ApiResponse {
    /// Parse the body as JSON; a malformed body is a transport failure
    pub fn json(&self) -> E2eResult<Value> {
        serde_json::from_str(&self.text).map_err(E2eError::from)
    }

    /// Status and body as recorded against a failed check
    pub fn observed(&self) -> Value {
        let body = serde_json::from_str(&self.text)
            .unwrap_or_else(|_| Value::String(self.text.clone()));
        json!({ "status": self.status, "body": body })
    }

    /// Body truncated for log lines
    pub fn snippet(&self, max: usize) -> String {
        match self.text.char_indices().nth(max) {
            Some((idx, _)) => format!("{}...", &self.text[..idx]),
            None => self.text.clone(),
        }
    }
}

/// Client for the booking service. Holds no cookies of its own.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: HarnessConfig,
}

impl ApiClient {
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Send a request to an API path
    pub async fn execute(&self, request: ApiRequest) -> E2eResult<ApiResponse> {
        let url = self.config.api_url(&request.path);
        self.send(url, request).await
    }

    /// Send a request to a path relative to the deployment root
    pub async fn execute_raw(&self, request: ApiRequest) -> E2eResult<ApiResponse> {
        let url = self.config.root_url(&request.path);
        self.send(url, request).await
    }

    async fn send(&self, url: String, request: ApiRequest) -> E2eResult<ApiResponse> {
        let start = Instant::now();
        debug!(
            "{} {} (authenticated: {})",
            request.method,
            url,
            request.session.is_some()
        );

        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(session) = &request.session {
            builder = builder.header(COOKIE, session.cookie_header());
        }
        builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder.header(CONTENT_TYPE, "application/json"),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let session = Session::from_set_cookie(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let text = response.text().await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!("{} {} -> {} ({} ms)", request.method, url, status, duration_ms);

        Ok(ApiResponse {
            status,
            text,
            session,
            duration_ms,
        })
    }

    // Auth

    pub async fn register(&self, registration: &Registration) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::post("/auth/register").json(registration)?)
            .await
    }

    pub async fn login(&self, credentials: &Credentials) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::post("/auth/login").json(credentials)?)
            .await
    }

    pub async fn me(&self, session: Option<&Session>) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::get("/auth/me").session(session)).await
    }

    pub async fn logout(&self, session: Option<&Session>) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::post("/auth/logout").session(session))
            .await
    }

    // Time slots

    pub async fn create_slot(
        &self,
        slot: &SlotRequest,
        session: Option<&Session>,
    ) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::post("/time-slots").json(slot)?.session(session))
            .await
    }

    pub async fn list_slots(
        &self,
        query: &SlotQuery,
        session: Option<&Session>,
    ) -> E2eResult<ApiResponse> {
        self.execute(
            ApiRequest::get("/time-slots")
                .query(query.to_pairs())
                .session(session),
        )
        .await
    }

    pub async fn delete_slot(&self, id: &str, session: Option<&Session>) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::new(Method::DELETE, format!("/time-slots/{}", id)).session(session))
            .await
    }

    // Doctors

    pub async fn list_doctors(&self) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::get("/doctors")).await
    }

    pub async fn update_doctor_profile(
        &self,
        profile: &ProfileUpdate,
        session: Option<&Session>,
    ) -> E2eResult<ApiResponse> {
        self.execute(
            ApiRequest::post("/doctor/profile")
                .json(profile)?
                .session(session),
        )
        .await
    }

    // Appointments

    pub async fn book_appointment(
        &self,
        booking: &Booking,
        session: Option<&Session>,
    ) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::post("/appointments").json(booking)?.session(session))
            .await
    }

    pub async fn list_appointments(&self, session: Option<&Session>) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::get("/appointments").session(session))
            .await
    }

    pub async fn update_appointment_status(
        &self,
        id: &str,
        status: &str,
        session: Option<&Session>,
    ) -> E2eResult<ApiResponse> {
        let update = StatusUpdate {
            status: status.to_string(),
        };
        self.execute(
            ApiRequest::post(format!("/appointments/{}/status", id))
                .json(&update)?
                .session(session),
        )
        .await
    }

    // Notifications

    pub async fn list_notifications(&self, session: Option<&Session>) -> E2eResult<ApiResponse> {
        self.execute(ApiRequest::get("/notifications").session(session))
            .await
    }

    pub async fn mark_notification_read(
        &self,
        id: &str,
        session: Option<&Session>,
    ) -> E2eResult<ApiResponse> {
        self.execute(
            ApiRequest::new(Method::PATCH, format!("/notifications/{}", id)).session(session),
        )
        .await
    }
}
