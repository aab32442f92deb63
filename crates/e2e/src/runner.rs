//! The harness: one method per conformance check
//!
//! Every public check records exactly one [`TestResult`](crate::report::TestResult)
//! (the slot batch records one per slot) and returns whether it passed. Checks
//! never return errors: transport and assertion failures both land in the
//! result log and the caller moves on to the next check.
//!
//! Checks that depend on earlier state re-read it from the service instead of
//! trusting what a previous call returned, so a partial run degrades into
//! explanatory failures rather than panics.

use std::time::Instant;

use serde_json::Value;
use tracing::info;

use crate::client::{ApiClient, ApiRequest};
use crate::config::HarnessConfig;
use crate::contract::{array, available_slots, is_truthy, str_field, Expectation};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::{self, Booking, Credentials, SlotQuery, SlotRequest};
use crate::report::{ResultLog, SuiteSummary};
use crate::session::{Actor, Role, Session};

/// Drives the booking API on behalf of a doctor and a patient
pub struct Harness {
    client: ApiClient,
    log: ResultLog,
    doctor: Actor,
    patient: Actor,
    tag: String,
    started: Instant,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        Ok(Self::with_client(ApiClient::new(config)?))
    }

    pub fn with_client(client: ApiClient) -> Self {
        let tag = fixtures::run_tag();
        let doctor = fixtures::doctor_registration(&tag);
        let patient = fixtures::patient_registration(&tag);
        Self {
            client,
            log: ResultLog::new(),
            doctor: Actor::new(Role::Doctor, doctor.email, doctor.password),
            patient: Actor::new(Role::Patient, patient.email, patient.password),
            tag,
            started: Instant::now(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn actor(&self, role: Role) -> &Actor {
        match role {
            Role::Doctor => &self.doctor,
            Role::Patient => &self.patient,
        }
    }

    fn actor_mut(&mut self, role: Role) -> &mut Actor {
        match role {
            Role::Doctor => &mut self.doctor,
            Role::Patient => &mut self.patient,
        }
    }

    /// Session of `role`, if it has one
    pub fn session(&self, role: Role) -> Option<&Session> {
        self.actor(role).session.as_ref()
    }

    /// Record the outcome of a check that started at `start`
    pub fn record(&mut self, name: &str, outcome: E2eResult<String>, start: Instant) -> bool {
        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(message) => {
                self.log.pass(name, message, duration_ms);
                true
            }
            Err(err) => {
                self.log.error(name, &err, duration_ms);
                false
            }
        }
    }

    /// Close the run and summarise it
    pub fn finish(self, suite: &str) -> SuiteSummary {
        let duration_ms = self.started.elapsed().as_millis() as u64;
        let base_url = self.client.config().base_url.clone();
        let summary = SuiteSummary::new(suite, &base_url, self.log.into_results(), duration_ms);
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            summary.passed, summary.failed, summary.duration_ms
        );
        summary
    }

    // Shared reads. These fetch state fresh for dependent checks.

    fn require_session(&self, role: Role) -> E2eResult<&Session> {
        self.session(role).ok_or_else(|| {
            E2eError::MissingDependency(format!("No {} session available", role.as_str()))
        })
    }

    fn require_id(&self, role: Role) -> E2eResult<&str> {
        self.actor(role).id().ok_or_else(|| {
            E2eError::MissingDependency(format!("No {} user available", role.as_str()))
        })
    }

    pub async fn fetch_slots(&self, query: &SlotQuery, session: Option<&Session>) -> E2eResult<Value> {
        let response = self.client.list_slots(query, session).await?;
        Expectation::ok().field("slots").check(&response)
    }

    pub async fn fetch_appointments(&self, role: Role) -> E2eResult<Vec<Value>> {
        let session = self.require_session(role)?;
        let response = self.client.list_appointments(Some(session)).await?;
        let body = Expectation::ok().field("appointments").check(&response)?;
        Ok(array(&body, "appointments").to_vec())
    }

    pub async fn fetch_notifications(&self, role: Role) -> E2eResult<Vec<Value>> {
        let session = self.require_session(role)?;
        let response = self.client.list_notifications(Some(session)).await?;
        let body = Expectation::ok().field("notifications").check(&response)?;
        Ok(array(&body, "notifications").to_vec())
    }

    // Auth checks

    /// Register `role` and capture its session
    pub async fn register(&mut self, role: Role) -> bool {
        let start = Instant::now();
        let name = format!("{} Registration", role.label());
        let registration = match role {
            Role::Doctor => fixtures::doctor_registration(&self.tag),
            Role::Patient => fixtures::patient_registration(&self.tag),
        };

        let outcome = async {
            let response = self.client.register(&registration).await?;
            let body = Expectation::ok().truthy("success").truthy("user").check(&response)?;
            Ok::<_, E2eError>((response.session, body["user"].clone()))
        }
        .await;

        let outcome = outcome.map(|(session, user)| {
            let actor = self.actor_mut(role);
            actor.email = registration.email.clone();
            actor.password = registration.password.clone();
            actor.session = session;
            actor.user = Some(user);
            format!(
                "{} registered: {}",
                role.label(),
                actor.name().unwrap_or(&registration.name)
            )
        });
        self.record(&name, outcome, start)
    }

    /// Registering the doctor's email again must fail with "already registered"
    pub async fn duplicate_registration(&mut self) -> bool {
        let start = Instant::now();
        let outcome = async {
            if !self.doctor.is_registered() {
                return Err(E2eError::MissingDependency(
                    "No doctor user to test with".to_string(),
                ));
            }
            let duplicate = fixtures::duplicate_registration(&self.doctor.email);
            let response = self.client.register(&duplicate).await?;
            Expectation::status(400)
                .error_contains("already registered")
                .check(&response)?;
            Ok::<_, E2eError>("Correctly rejected duplicate email".to_string())
        }
        .await;
        self.record("Duplicate Registration", outcome, start)
    }

    /// Log `role` in again and refresh its session
    pub async fn login(&mut self, role: Role) -> bool {
        let start = Instant::now();
        let name = format!("{} Login", role.label());

        let outcome = async {
            let actor = self.actor(role);
            if !actor.is_registered() {
                return Err(E2eError::MissingDependency(format!(
                    "No {} user to test with",
                    role.as_str()
                )));
            }
            let credentials = Credentials {
                email: actor.email.clone(),
                password: actor.password.clone(),
            };
            let response = self.client.login(&credentials).await?;
            let body = Expectation::ok().truthy("success").truthy("user").check(&response)?;
            Ok::<_, E2eError>((response.session, body["user"].clone()))
        }
        .await;

        let outcome = outcome.map(|(session, user)| {
            let actor = self.actor_mut(role);
            if session.is_some() {
                actor.session = session;
            }
            let name = str_field(&user, "name").unwrap_or_default().to_string();
            actor.user = Some(user);
            format!("{} logged in: {}", role.label(), name)
        });
        self.record(&name, outcome, start)
    }

    /// Unknown credentials must be rejected with 401 "invalid credentials"
    pub async fn invalid_login(&mut self) -> bool {
        let start = Instant::now();
        let outcome = async {
            let response = self.client.login(&fixtures::unknown_credentials()).await?;
            Expectation::unauthorized()
                .error_contains("invalid credentials")
                .check(&response)?;
            Ok::<_, E2eError>("Correctly rejected invalid credentials".to_string())
        }
        .await;
        self.record("Invalid Login", outcome, start)
    }

    /// The doctor's email with a bad password must be rejected like an unknown user
    pub async fn wrong_password_login(&mut self) -> bool {
        let start = Instant::now();
        let outcome = async {
            if !self.doctor.is_registered() {
                return Err(E2eError::MissingDependency(
                    "No doctor user to test with".to_string(),
                ));
            }
            let credentials = fixtures::wrong_password(&self.doctor.email);
            let response = self.client.login(&credentials).await?;
            Expectation::unauthorized()
                .error_contains("invalid credentials")
                .check(&response)?;
            Ok::<_, E2eError>("Correctly rejected wrong password".to_string())
        }
        .await;
        self.record("Wrong Password Login", outcome, start)
    }

    /// `GET /auth/me` with `role`'s session must return that user
    pub async fn current_user(&mut self, name: &str, role: Role) -> bool {
        let start = Instant::now();
        let outcome = async {
            let session = self.require_session(role)?;
            let response = self.client.me(Some(session)).await?;
            let body = Expectation::ok().truthy("user").check(&response)?;
            let user = &body["user"];
            if str_field(user, "role") != Some(role.as_str()) {
                return Err(E2eError::AssertionFailed(format!("Invalid user data: {}", body)));
            }
            Ok::<_, E2eError>(format!(
                "Retrieved user info: {}",
                str_field(user, "name").unwrap_or_default()
            ))
        }
        .await;
        self.record(name, outcome, start)
    }

    /// Send `request` without a session and expect 401
    pub async fn expect_unauthorized(&mut self, name: &str, request: E2eResult<ApiRequest>) -> bool {
        let start = Instant::now();
        let outcome = async {
            let response = self.client.execute(request?.session(None)).await?;
            Expectation::unauthorized().check(&response)?;
            Ok::<_, E2eError>("Correctly rejected unauthorized request".to_string())
        }
        .await;
        self.record(name, outcome, start)
    }

    /// Log `role` out and drop its session
    pub async fn logout(&mut self, role: Role) -> bool {
        let start = Instant::now();
        let outcome = async {
            let response = self.client.logout(self.session(role)).await?;
            Expectation::ok().truthy("success").check(&response)?;
            Ok::<_, E2eError>("User logged out successfully".to_string())
        }
        .await;
        if outcome.is_ok() {
            self.actor_mut(role).session = None;
        }
        self.record("Logout", outcome, start)
    }

    // Time slot checks

    /// Create one slot as the doctor, returning its id
    pub async fn create_slot(&mut self, name: &str, slot: &SlotRequest) -> Option<String> {
        let start = Instant::now();
        let outcome = async {
            let session = self.require_session(Role::Doctor)?;
            let response = self.client.create_slot(slot, Some(session)).await?;
            let body = Expectation::ok().truthy("success").truthy("slot").check(&response)?;
            Ok::<_, E2eError>(str_field(&body["slot"], "id").map(str::to_string))
        }
        .await;

        let id = outcome.as_ref().ok().cloned().flatten();
        let outcome = outcome.map(|id| match id {
            Some(id) => format!("Slot {} created successfully", id),
            None => "Slot created successfully".to_string(),
        });
        self.record(name, outcome, start);
        id
    }

    /// Create the standard three slots; passes if at least one was created
    pub async fn create_standard_slots(&mut self) -> bool {
        if self.session(Role::Doctor).is_none() {
            let start = Instant::now();
            let outcome = self.require_session(Role::Doctor).map(|_| String::new());
            return self.record("Create Time Slots", outcome, start);
        }

        let mut created = 0;
        for slot in fixtures::standard_slots() {
            let name = format!("Create Time Slot {} {}", slot.date, slot.start_time);
            let start = Instant::now();
            let outcome = async {
                let session = self.require_session(Role::Doctor)?;
                let response = self.client.create_slot(&slot, Some(session)).await?;
                Expectation::ok().truthy("success").truthy("slot").check(&response)?;
                Ok::<_, E2eError>("Slot created successfully".to_string())
            }
            .await;
            if self.record(&name, outcome, start) {
                created += 1;
            }
        }
        created > 0
    }

    /// All of the doctor's slots are listable
    pub async fn doctor_slots(&mut self) -> bool {
        let start = Instant::now();
        let outcome = async {
            let doctor_id = self.require_id(Role::Doctor)?;
            let body = self.fetch_slots(&SlotQuery::for_doctor(doctor_id), None).await?;
            Ok::<_, E2eError>(format!("Retrieved {} time slots", array(&body, "slots").len()))
        }
        .await;
        self.record("Get Doctor Time Slots", outcome, start)
    }

    /// The doctor has at least one available slot tomorrow
    pub async fn available_slots_tomorrow(&mut self) -> bool {
        let start = Instant::now();
        let tomorrow = fixtures::tomorrow();
        let outcome = async {
            let doctor_id = self.require_id(Role::Doctor)?;
            let query = SlotQuery::for_doctor(doctor_id).on(&tomorrow).available_only();
            let body = self.fetch_slots(&query, None).await?;
            let available = available_slots(&body).len();
            if available == 0 {
                return Err(E2eError::AssertionFailed(format!(
                    "Retrieved 0 available slots for {}",
                    tomorrow
                )));
            }
            Ok::<_, E2eError>(format!("Retrieved {} available slots for {}", available, tomorrow))
        }
        .await;
        self.record("Get Available Slots", outcome, start)
    }

    /// The unfiltered `available=true` listing responds with a `slots` array
    pub async fn any_available_slots(&mut self, name: &str) -> bool {
        let start = Instant::now();
        let outcome = async {
            let body = self
                .fetch_slots(&SlotQuery::default().available_only(), None)
                .await?;
            Ok::<_, E2eError>(format!("Retrieved {} available slots", array(&body, "slots").len()))
        }
        .await;
        self.record(name, outcome, start)
    }

    /// Delete the doctor's first available slot
    pub async fn delete_available_slot(&mut self) -> bool {
        let start = Instant::now();
        let outcome = async {
            let session = self.require_session(Role::Doctor)?;
            let doctor_id = self.require_id(Role::Doctor)?;
            let body = self.fetch_slots(&SlotQuery::for_doctor(doctor_id), None).await?;
            let slot_id = available_slots(&body)
                .into_iter()
                .find_map(|s| str_field(s, "id"))
                .ok_or_else(|| {
                    E2eError::MissingDependency("No available slots to delete".to_string())
                })?
                .to_string();

            let response = self.client.delete_slot(&slot_id, Some(session)).await?;
            Expectation::ok().truthy("success").check(&response)?;
            Ok::<_, E2eError>(format!("Time slot {} deleted successfully", slot_id))
        }
        .await;
        self.record("Delete Time Slot", outcome, start)
    }

    // Doctor checks

    /// The public doctor directory responds; reports whether our doctor is listed
    pub async fn doctors_list(&mut self, name: &str) -> bool {
        let start = Instant::now();
        let outcome = async {
            let response = self.client.list_doctors().await?;
            let body = Expectation::ok().field("doctors").check(&response)?;
            let doctors = array(&body, "doctors");
            let found = self
                .doctor
                .id()
                .map(|id| doctors.iter().any(|d| str_field(d, "id") == Some(id)))
                .unwrap_or(false);
            Ok::<_, E2eError>(format!(
                "Retrieved {} doctors, test doctor found: {}",
                doctors.len(),
                found
            ))
        }
        .await;
        self.record(name, outcome, start)
    }

    pub async fn update_profile(&mut self) -> bool {
        let start = Instant::now();
        let outcome = async {
            let session = self.require_session(Role::Doctor)?;
            let response = self
                .client
                .update_doctor_profile(&fixtures::profile_update(), Some(session))
                .await?;
            let body = Expectation::ok().truthy("success").truthy("profile").check(&response)?;
            Ok::<_, E2eError>(format!(
                "Profile updated: {}",
                str_field(&body["profile"], "specialization").unwrap_or_default()
            ))
        }
        .await;
        self.record("Update Doctor Profile", outcome, start)
    }

    // Appointment checks

    /// Book `slot_id` as the patient, returning the appointment id
    pub async fn book_slot(&mut self, slot_id: Option<&str>) -> Option<String> {
        let start = Instant::now();
        let outcome = async {
            let session = self.require_session(Role::Patient)?;
            let slot_id = slot_id.ok_or_else(|| {
                E2eError::MissingDependency("No slot available to book".to_string())
            })?;
            self.book(slot_id, session, "Regular checkup appointment").await
        }
        .await;
        self.record_booking(outcome, start)
    }

    /// Book the doctor's first available slot tomorrow, found by a fresh listing
    pub async fn book_first_available(&mut self) -> Option<String> {
        let start = Instant::now();
        let outcome = async {
            let session = self.require_session(Role::Patient)?;
            let doctor_id = self.require_id(Role::Doctor)?;
            let query = SlotQuery::for_doctor(doctor_id)
                .on(&fixtures::tomorrow())
                .available_only();
            let body = self.fetch_slots(&query, None).await?;
            let slot_id = available_slots(&body)
                .into_iter()
                .find_map(|s| str_field(s, "id"))
                .ok_or_else(|| E2eError::MissingDependency("No available slots to book".to_string()))?
                .to_string();
            self.book(&slot_id, session, "Regular checkup appointment").await
        }
        .await;
        self.record_booking(outcome, start)
    }

    async fn book(&self, slot_id: &str, session: &Session, notes: &str) -> E2eResult<String> {
        let booking = Booking {
            slot_id: slot_id.to_string(),
            notes: notes.to_string(),
        };
        let response = self.client.book_appointment(&booking, Some(session)).await?;
        let body = Expectation::ok()
            .truthy("success")
            .truthy("appointment")
            .check(&response)?;
        str_field(&body["appointment"], "id")
            .map(str::to_string)
            .ok_or_else(|| E2eError::MissingField {
                field: "appointment.id".to_string(),
                body: body.to_string(),
                response: response.observed(),
            })
    }

    fn record_booking(&mut self, outcome: E2eResult<String>, start: Instant) -> Option<String> {
        let id = outcome.as_ref().ok().cloned();
        let outcome = outcome.map(|id| format!("Appointment booked successfully: {}", id));
        self.record("Book Appointment", outcome, start);
        id
    }

    /// `role` can list its appointments
    pub async fn list_appointments(&mut self, name: &str, role: Role) -> bool {
        let start = Instant::now();
        let outcome = self.fetch_appointments(role).await.map(|appointments| {
            format!("Retrieved {} {} appointments", appointments.len(), role.as_str())
        });
        self.record(name, outcome, start)
    }

    /// Mark the doctor's first appointment completed
    pub async fn complete_first_appointment(&mut self) -> bool {
        let start = Instant::now();
        let outcome = async {
            let session = self.require_session(Role::Doctor)?;
            let appointments = self.fetch_appointments(Role::Doctor).await?;
            let id = appointments
                .iter()
                .find_map(|a| str_field(a, "id"))
                .ok_or_else(|| E2eError::MissingDependency("No appointments to update".to_string()))?;

            let response = self
                .client
                .update_appointment_status(id, "completed", Some(session))
                .await?;
            Expectation::ok().truthy("success").check(&response)?;
            Ok::<_, E2eError>(format!("Appointment {} marked as completed", id))
        }
        .await;
        self.record("Update Appointment Status", outcome, start)
    }

    // Notification checks

    pub async fn list_notifications(&mut self, role: Role) -> bool {
        let start = Instant::now();
        let name = format!("Get {} Notifications", role.label());
        let outcome = self.fetch_notifications(role).await.map(|notifications| {
            format!("Retrieved {} {} notifications", notifications.len(), role.as_str())
        });
        self.record(&name, outcome, start)
    }

    /// Mark the patient's first notification read
    pub async fn mark_first_notification_read(&mut self) -> bool {
        let start = Instant::now();
        let outcome = async {
            let session = self.require_session(Role::Patient)?;
            let notifications = self.fetch_notifications(Role::Patient).await?;
            let id = notifications
                .iter()
                .find_map(|n| str_field(n, "id"))
                .ok_or_else(|| {
                    E2eError::MissingDependency("No notifications to mark as read".to_string())
                })?;

            let response = self.client.mark_notification_read(id, Some(session)).await?;
            Expectation::ok().truthy("success").check(&response)?;
            Ok::<_, E2eError>(format!("Notification {} marked as read", id))
        }
        .await;
        self.record("Mark Notification Read", outcome, start)
    }
}

/// Whether a notification's `read` flag is set
pub fn is_read(notification: &Value) -> bool {
    notification.get("read").map(is_truthy).unwrap_or(false)
}
