//! Comprehensive run over every endpoint

use reqwest::Method;

use crate::client::ApiRequest;
use crate::fixtures::{self, Booking};
use crate::runner::Harness;
use crate::session::Role;

pub async fn run(h: &mut Harness) {
    // Authentication
    h.register(Role::Doctor).await;
    h.register(Role::Patient).await;
    h.duplicate_registration().await;
    if h.login(Role::Doctor).await {
        h.login(Role::Patient).await;
    }
    h.invalid_login().await;
    h.wrong_password_login().await;
    h.current_user("Auth Me", Role::Doctor).await;
    h.expect_unauthorized("Auth Me Unauthorized", Ok(ApiRequest::get("/auth/me")))
        .await;

    // Time slots
    h.create_standard_slots().await;
    let slot = fixtures::half_hour_slot(&fixtures::tomorrow(), "11:00");
    h.expect_unauthorized(
        "Create Time Slot Unauthorized",
        ApiRequest::post("/time-slots").json(&slot),
    )
    .await;
    h.doctor_slots().await;
    h.available_slots_tomorrow().await;

    // Doctor operations
    h.doctors_list("Get Doctors List").await;
    h.update_profile().await;
    h.delete_available_slot().await;
    h.expect_unauthorized(
        "Delete Time Slot Unauthorized",
        Ok(ApiRequest::new(Method::DELETE, "/time-slots/fake_slot_id")),
    )
    .await;

    // Appointments
    h.book_first_available().await;
    let booking = Booking {
        slot_id: "fake_slot_id".to_string(),
        notes: "Test appointment".to_string(),
    };
    h.expect_unauthorized(
        "Book Appointment Unauthorized",
        ApiRequest::post("/appointments").json(&booking),
    )
    .await;
    h.list_appointments("Get Doctor Appointments", Role::Doctor)
        .await;
    h.list_appointments("Get Patient Appointments", Role::Patient)
        .await;
    h.expect_unauthorized(
        "Get Appointments Unauthorized",
        Ok(ApiRequest::get("/appointments")),
    )
    .await;
    h.complete_first_appointment().await;

    // Notifications
    h.list_notifications(Role::Doctor).await;
    h.list_notifications(Role::Patient).await;
    h.expect_unauthorized(
        "Get Notifications Unauthorized",
        Ok(ApiRequest::get("/notifications")),
    )
    .await;
    h.mark_first_notification_read().await;

    h.logout(Role::Patient).await;
}
