//! Quick critical-path regression run

use crate::fixtures;
use crate::runner::Harness;
use crate::session::Role;

/// The run passes only when every one of these passed
pub const CRITICAL_CHECKS: &[&str] = &[
    "Doctor Registration",
    "Patient Registration",
    "Doctor Login",
    "Session Check",
    "Create Time Slot",
    "Get Time Slots",
    "Book Appointment",
    "Get Appointments",
];

pub async fn run(h: &mut Harness) {
    // Nothing downstream is meaningful without both accounts.
    if !h.register(Role::Doctor).await || !h.register(Role::Patient).await {
        return;
    }

    h.login(Role::Doctor).await;
    h.current_user("Session Check", Role::Doctor).await;

    let slot = fixtures::half_hour_slot(&fixtures::tomorrow(), "10:00");
    let slot_id = h.create_slot("Create Time Slot", &slot).await;
    h.any_available_slots("Get Time Slots").await;

    h.login(Role::Patient).await;
    h.book_slot(slot_id.as_deref()).await;
    h.list_appointments("Get Appointments", Role::Patient).await;

    h.doctors_list("Get Doctors").await;
    h.logout(Role::Patient).await;
}
