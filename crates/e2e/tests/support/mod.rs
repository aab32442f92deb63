//! In-process stand-in for the MedMeet booking API
//!
//! Speaks the same wire format as the real service: camelCase request
//! bodies, snake_case response fields and a `userId` session cookie.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use medmeet_e2e::session::user_id_from_cookie_header;
use medmeet_e2e::HarnessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Behaves like a correct deployment
    Conforming,
    /// Protected routes answer 200 to requests without a session
    OpenRoutes,
    /// Login succeeds for a registered email whatever the password
    AnyPassword,
}

#[derive(Debug, Clone)]
struct User {
    id: String,
    email: String,
    password: String,
    name: String,
    role: String,
    phone: String,
}

impl User {
    fn public(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "name": self.name,
            "role": self.role,
            "phone": self.phone,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct Slot {
    id: String,
    doctor_id: String,
    date: String,
    start_time: String,
    end_time: String,
    is_available: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Appointment {
    id: String,
    slot_id: String,
    doctor_id: String,
    patient_id: String,
    date: String,
    start_time: String,
    end_time: String,
    status: String,
    notes: String,
}

#[derive(Debug, Clone, Serialize)]
struct Notification {
    id: String,
    user_id: String,
    message: String,
    read: bool,
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    users: Vec<User>,
    profiles: HashMap<String, Value>,
    slots: Vec<Slot>,
    appointments: Vec<Appointment>,
    notifications: Vec<Notification>,
}

impl Store {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

struct MockState {
    mode: Mode,
    store: RwLock<Store>,
}

type Shared = State<Arc<MockState>>;

/// A running mock bound to an ephemeral local port
pub struct MockService {
    pub addr: SocketAddr,
}

impl MockService {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::for_base_url(&self.base_url()).unwrap();
        config.request_timeout = Duration::from_secs(5);
        config
    }
}

pub async fn spawn(mode: Mode) -> MockService {
    let state = Arc::new(MockState {
        mode,
        store: RwLock::new(Store::default()),
    });

    let app = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/time-slots", get(list_slots).post(create_slot))
        .route("/api/time-slots/:id", delete(delete_slot))
        .route("/api/doctors", get(list_doctors))
        .route("/api/doctor/profile", post(update_profile))
        .route(
            "/api/appointments",
            get(list_appointments).post(book_appointment),
        )
        .route("/api/appointments/:id/status", post(update_status))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/:id", patch(mark_read))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockService { addr }
}

/// Base URL of a local port nothing listens on
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn with_session(user_id: &str, body: Value) -> Response {
    let cookie = format!(
        "userId={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800",
        user_id
    );
    ([(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

async fn authenticate(state: &MockState, headers: &HeaderMap) -> Result<User, Response> {
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let user = match user_id_from_cookie_header(cookie) {
        Some(id) => state.store.read().await.user(&id).cloned(),
        None => None,
    };

    match (user, state.mode) {
        (Some(user), _) => Ok(user),
        (None, Mode::OpenRoutes) => Err(Json(json!({ "success": true })).into_response()),
        (None, _) => Err(error(StatusCode::UNAUTHORIZED, "Unauthorized")),
    }
}

macro_rules! require_user {
    ($state:expr, $headers:expr) => {
        match authenticate(&$state, &$headers).await {
            Ok(user) => user,
            Err(response) => return response,
        }
    };
    ($state:expr, $headers:expr, $role:expr) => {{
        let user = require_user!($state, $headers);
        if user.role != $role {
            return error(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
        user
    }};
}

fn text(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// Auth

async fn register(State(state): Shared, Json(body): Json<Value>) -> Response {
    let mut store = state.store.write().await;
    let email = text(&body, "email");
    if store.users.iter().any(|u| u.email == email) {
        return error(StatusCode::BAD_REQUEST, "Email already registered");
    }

    let user = User {
        id: store.next_id("user"),
        email,
        password: text(&body, "password"),
        name: text(&body, "name"),
        role: text(&body, "role"),
        phone: text(&body, "phone"),
    };
    if user.role == "doctor" {
        store.profiles.insert(
            user.id.clone(),
            json!({
                "user_id": user.id,
                "specialization": body.get("specialization").cloned().unwrap_or(Value::Null),
                "bio": body.get("bio").cloned().unwrap_or(Value::Null),
                "experience": body.get("experience").cloned().unwrap_or(Value::Null),
            }),
        );
    }
    store.users.push(user.clone());

    with_session(&user.id, json!({ "success": true, "user": user.public() }))
}

async fn login(State(state): Shared, Json(body): Json<Value>) -> Response {
    let store = state.store.read().await;
    let email = text(&body, "email");
    let password = text(&body, "password");
    let any_password = state.mode == Mode::AnyPassword;
    match store
        .users
        .iter()
        .find(|u| u.email == email && (any_password || u.password == password))
    {
        Some(user) => with_session(&user.id, json!({ "success": true, "user": user.public() })),
        None => error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    let user = require_user!(state, headers);
    let store = state.store.read().await;
    let profile = store.profiles.get(&user.id).cloned().unwrap_or(Value::Null);
    Json(json!({ "user": user.public(), "profile": profile })).into_response()
}

async fn logout() -> Response {
    (
        [(header::SET_COOKIE, "userId=; Path=/; Max-Age=0")],
        Json(json!({ "success": true })),
    )
        .into_response()
}

// Time slots

async fn create_slot(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user = require_user!(state, headers, "doctor");
    let mut store = state.store.write().await;
    let slot = Slot {
        id: store.next_id("slot"),
        doctor_id: user.id,
        date: text(&body, "date"),
        start_time: text(&body, "startTime"),
        end_time: text(&body, "endTime"),
        is_available: true,
    };
    store.slots.push(slot.clone());
    Json(json!({ "success": true, "slot": slot })).into_response()
}

async fn list_slots(
    State(state): Shared,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = state.store.read().await;
    let only_available = params.get("available").map(String::as_str) == Some("true");
    let mut slots: Vec<&Slot> = store
        .slots
        .iter()
        .filter(|s| params.get("doctorId").map_or(true, |d| &s.doctor_id == d))
        .filter(|s| params.get("date").map_or(true, |d| &s.date == d))
        .filter(|s| !only_available || s.is_available)
        .collect();
    slots.sort_by(|a, b| (&a.date, &a.start_time).cmp(&(&b.date, &b.start_time)));
    Json(json!({ "slots": slots })).into_response()
}

async fn delete_slot(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let user = require_user!(state, headers, "doctor");
    let mut store = state.store.write().await;
    match store
        .slots
        .iter()
        .position(|s| s.id == id && s.doctor_id == user.id)
    {
        Some(idx) => {
            store.slots.remove(idx);
            Json(json!({ "success": true })).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Slot not found"),
    }
}

// Doctors

async fn list_doctors(State(state): Shared) -> Response {
    let store = state.store.read().await;
    let doctors: Vec<Value> = store
        .users
        .iter()
        .filter(|u| u.role == "doctor")
        .map(|u| {
            let mut doctor = u.public();
            doctor["profile"] = store.profiles.get(&u.id).cloned().unwrap_or(Value::Null);
            doctor
        })
        .collect();
    Json(json!({ "doctors": doctors })).into_response()
}

async fn update_profile(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user = require_user!(state, headers, "doctor");
    let mut store = state.store.write().await;
    let profile = store
        .profiles
        .entry(user.id.clone())
        .or_insert_with(|| json!({ "user_id": user.id }));
    if let (Some(profile), Some(update)) = (profile.as_object_mut(), body.as_object()) {
        for (k, v) in update {
            profile.insert(k.clone(), v.clone());
        }
    }
    let profile = profile.clone();
    Json(json!({ "success": true, "profile": profile })).into_response()
}

// Appointments

async fn book_appointment(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let patient = require_user!(state, headers, "patient");
    let mut store = state.store.write().await;
    let slot_id = text(&body, "slotId");

    let Some(slot) = store.slots.iter().find(|s| s.id == slot_id).cloned() else {
        return error(StatusCode::NOT_FOUND, "Slot not found");
    };
    if !slot.is_available {
        return error(StatusCode::BAD_REQUEST, "Slot not available");
    }
    let doctor_name = store
        .user(&slot.doctor_id)
        .map(|d| d.name.clone())
        .unwrap_or_default();

    let appointment = Appointment {
        id: store.next_id("appt"),
        slot_id: slot.id.clone(),
        doctor_id: slot.doctor_id.clone(),
        patient_id: patient.id.clone(),
        date: slot.date.clone(),
        start_time: slot.start_time.clone(),
        end_time: slot.end_time.clone(),
        status: "scheduled".to_string(),
        notes: text(&body, "notes"),
    };
    if let Some(s) = store.slots.iter_mut().find(|s| s.id == slot.id) {
        s.is_available = false;
    }

    let patient_note = Notification {
        id: store.next_id("notif"),
        user_id: patient.id.clone(),
        message: format!(
            "Appointment confirmed with {} on {} at {}",
            doctor_name, slot.date, slot.start_time
        ),
        read: false,
    };
    let doctor_note = Notification {
        id: store.next_id("notif"),
        user_id: slot.doctor_id.clone(),
        message: format!(
            "New appointment booked with {} on {} at {}",
            patient.name, slot.date, slot.start_time
        ),
        read: false,
    };
    store.notifications.push(patient_note);
    store.notifications.push(doctor_note);
    store.appointments.push(appointment.clone());

    Json(json!({ "success": true, "appointment": appointment })).into_response()
}

async fn list_appointments(State(state): Shared, headers: HeaderMap) -> Response {
    let user = require_user!(state, headers);
    let store = state.store.read().await;
    let appointments: Vec<&Appointment> = store
        .appointments
        .iter()
        .filter(|a| a.doctor_id == user.id || a.patient_id == user.id)
        .collect();
    Json(json!({ "appointments": appointments })).into_response()
}

async fn update_status(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let user = require_user!(state, headers);
    let mut store = state.store.write().await;
    let Some(appointment) = store
        .appointments
        .iter_mut()
        .find(|a| a.id == id && (a.doctor_id == user.id || a.patient_id == user.id))
    else {
        return error(StatusCode::NOT_FOUND, "Appointment not found");
    };
    appointment.status = text(&body, "status");
    let appointment = appointment.clone();
    Json(json!({ "success": true, "appointment": appointment })).into_response()
}

// Notifications

async fn list_notifications(State(state): Shared, headers: HeaderMap) -> Response {
    let user = require_user!(state, headers);
    let store = state.store.read().await;
    let notifications: Vec<&Notification> = store
        .notifications
        .iter()
        .filter(|n| n.user_id == user.id)
        .collect();
    Json(json!({ "notifications": notifications })).into_response()
}

async fn mark_read(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let user = require_user!(state, headers);
    let mut store = state.store.write().await;
    if let Some(n) = store
        .notifications
        .iter_mut()
        .find(|n| n.id == id && n.user_id == user.id)
    {
        n.read = true;
    }
    Json(json!({ "success": true })).into_response()
}
