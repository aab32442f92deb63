//! End-to-end booking flow
//!
//! After both accounts exist and a bad password is refused for the doctor,
//! the doctor publishes a slot for tomorrow morning, a patient books it, the
//! doctor completes the appointment and the patient is notified. Along the
//! way the run checks that the slot moves out of the available listing once
//! booked, that both parties see the appointment, and that marking a
//! notification read twice is harmless.

use std::time::Instant;

use crate::contract::{array, str_field, Expectation};
use crate::error::E2eError;
use crate::fixtures::{self, SlotQuery, SlotRequest};
use crate::runner::{is_read, Harness};
use crate::session::Role;

pub async fn run(h: &mut Harness) {
    if !h.register(Role::Doctor).await || !h.register(Role::Patient).await {
        return;
    }
    h.wrong_password_login().await;

    let slot = fixtures::half_hour_slot(&fixtures::tomorrow(), "09:00");
    let slot_id = h.create_slot("Create Scenario Slot", &slot).await;
    let slot_id = slot_id.as_deref();

    slot_listing(h, "Slot Listed For Doctor", slot_id, &slot, Listing::AllForDoctor, true).await;
    slot_listing(h, "Slot Listed As Available", slot_id, &slot, Listing::AvailableOnDate, true).await;

    let appointment_id = h.book_slot(slot_id).await;
    let appointment_id = appointment_id.as_deref();

    slot_listing(
        h,
        "Booked Slot No Longer Available",
        slot_id,
        &slot,
        Listing::AvailableOnDate,
        false,
    )
    .await;
    appointment_visible(h, "Doctor Sees Appointment", Role::Doctor, appointment_id, Some("scheduled")).await;
    appointment_visible(h, "Patient Sees Appointment", Role::Patient, appointment_id, None).await;

    complete_appointment(h, appointment_id).await;
    appointment_visible(h, "Appointment Marked Completed", Role::Doctor, appointment_id, Some("completed")).await;

    let notification_id = patient_notified(h, &slot).await;
    mark_read_twice(h, notification_id.as_deref()).await;

    h.logout(Role::Patient).await;
}

#[derive(Debug, Clone, Copy)]
enum Listing {
    AllForDoctor,
    AvailableOnDate,
}

async fn slot_listing(
    h: &mut Harness,
    name: &str,
    slot_id: Option<&str>,
    slot: &SlotRequest,
    listing: Listing,
    expect_listed: bool,
) -> bool {
    let start = Instant::now();
    let outcome = async {
        let slot_id = slot_id.ok_or_else(|| {
            E2eError::MissingDependency("No scenario slot was created".to_string())
        })?;
        let doctor_id = h.actor(Role::Doctor).id().ok_or_else(|| {
            E2eError::MissingDependency("No doctor user available".to_string())
        })?;

        let query = match listing {
            Listing::AllForDoctor => SlotQuery::for_doctor(doctor_id),
            Listing::AvailableOnDate => SlotQuery::for_doctor(doctor_id)
                .on(&slot.date)
                .available_only(),
        };
        let body = h.fetch_slots(&query, h.session(Role::Patient)).await?;
        let slots = array(&body, "slots");
        let listed = slots.iter().any(|s| str_field(s, "id") == Some(slot_id));

        match (listed, expect_listed) {
            (true, true) => Ok::<_, E2eError>(format!(
                "Slot {} listed among {} slots",
                slot_id,
                slots.len()
            )),
            (false, false) => Ok(format!("Slot {} absent from listing", slot_id)),
            (false, true) => Err(E2eError::AssertionFailed(format!(
                "Slot {} missing from listing of {} slots",
                slot_id,
                slots.len()
            ))),
            (true, false) => Err(E2eError::AssertionFailed(format!(
                "Slot {} still listed after booking",
                slot_id
            ))),
        }
    }
    .await;
    h.record(name, outcome, start)
}

async fn appointment_visible(
    h: &mut Harness,
    name: &str,
    role: Role,
    appointment_id: Option<&str>,
    expected_status: Option<&str>,
) -> bool {
    let start = Instant::now();
    let outcome = async {
        let id = appointment_id.ok_or_else(|| {
            E2eError::MissingDependency("No appointment was booked".to_string())
        })?;
        let appointments = h.fetch_appointments(role).await?;
        let appointment = appointments
            .iter()
            .find(|a| str_field(a, "id") == Some(id))
            .ok_or_else(|| {
                E2eError::AssertionFailed(format!(
                    "Appointment {} not among {} {} appointments",
                    id,
                    appointments.len(),
                    role.as_str()
                ))
            })?;

        let status = str_field(appointment, "status").unwrap_or_default();
        if let Some(expected) = expected_status {
            if status != expected {
                return Err(E2eError::AssertionFailed(format!(
                    "Appointment {} has status {:?}, expected {:?}",
                    id, status, expected
                )));
            }
        }
        Ok::<_, E2eError>(format!("Appointment {} visible to {} ({})", id, role.as_str(), status))
    }
    .await;
    h.record(name, outcome, start)
}

async fn complete_appointment(h: &mut Harness, appointment_id: Option<&str>) -> bool {
    let start = Instant::now();
    let outcome = async {
        let id = appointment_id.ok_or_else(|| {
            E2eError::MissingDependency("No appointment was booked".to_string())
        })?;
        let session = h.session(Role::Doctor).ok_or_else(|| {
            E2eError::MissingDependency("No doctor session available".to_string())
        })?;
        let response = h
            .client()
            .update_appointment_status(id, "completed", Some(session))
            .await?;
        Expectation::ok().truthy("success").check(&response)?;
        Ok::<_, E2eError>(format!("Appointment {} marked as completed", id))
    }
    .await;
    h.record("Complete Appointment", outcome, start)
}

/// The patient holds a notification naming the booked slot; returns its id
async fn patient_notified(h: &mut Harness, slot: &SlotRequest) -> Option<String> {
    let start = Instant::now();
    let outcome = async {
        let notifications = h.fetch_notifications(Role::Patient).await?;
        let found = notifications.iter().find(|n| {
            let message = str_field(n, "message").unwrap_or_default();
            message.contains(&slot.date) && message.contains(&slot.start_time)
        });
        match found.and_then(|n| str_field(n, "id")) {
            Some(id) => Ok::<_, E2eError>(id.to_string()),
            None => Err(E2eError::AssertionFailed(format!(
                "None of {} notifications references the appointment on {} at {}",
                notifications.len(),
                slot.date,
                slot.start_time
            ))),
        }
    }
    .await;

    let id = outcome.as_ref().ok().cloned();
    let outcome = outcome.map(|id| format!("Notification {} references the appointment", id));
    h.record("Patient Notified", outcome, start);
    id
}

async fn mark_read_twice(h: &mut Harness, notification_id: Option<&str>) -> bool {
    let start = Instant::now();
    let outcome = async {
        let id = notification_id.ok_or_else(|| {
            E2eError::MissingDependency("No notifications to mark as read".to_string())
        })?;
        let session = h.session(Role::Patient).ok_or_else(|| {
            E2eError::MissingDependency("No patient session available".to_string())
        })?;

        for _ in 0..2 {
            let response = h.client().mark_notification_read(id, Some(session)).await?;
            Expectation::ok().truthy("success").check(&response)?;
        }

        let notifications = h.fetch_notifications(Role::Patient).await?;
        let notification = notifications
            .iter()
            .find(|n| str_field(n, "id") == Some(id))
            .ok_or_else(|| {
                E2eError::AssertionFailed(format!("Notification {} vanished after marking", id))
            })?;
        if !is_read(notification) {
            return Err(E2eError::AssertionFailed(format!(
                "Notification {} not read after marking twice",
                id
            )));
        }
        Ok::<_, E2eError>(format!("Notification {} marked read twice and stays read", id))
    }
    .await;
    h.record("Mark Notification Read Idempotent", outcome, start)
}
