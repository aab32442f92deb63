//! Protected endpoints must refuse requests that carry no session

use reqwest::Method;

use crate::client::ApiRequest;
use crate::error::E2eResult;
use crate::fixtures::{self, Booking};
use crate::runner::Harness;

/// Every protected call, paired with the check name it is recorded under
pub fn protected_requests() -> Vec<(&'static str, E2eResult<ApiRequest>)> {
    let slot = fixtures::half_hour_slot("2025-11-25", "09:00");
    let booking = Booking {
        slot_id: "fake_slot".to_string(),
        notes: "test".to_string(),
    };

    vec![
        ("Auth Me Unauthorized", Ok(ApiRequest::get("/auth/me"))),
        ("Get Appointments Unauthorized", Ok(ApiRequest::get("/appointments"))),
        ("Get Notifications Unauthorized", Ok(ApiRequest::get("/notifications"))),
        (
            "Create Time Slot Unauthorized",
            ApiRequest::post("/time-slots").json(&slot),
        ),
        (
            "Delete Time Slot Unauthorized",
            Ok(ApiRequest::new(Method::DELETE, "/time-slots/fake_id")),
        ),
        (
            "Mark Notification Read Unauthorized",
            Ok(ApiRequest::new(Method::PATCH, "/notifications/fake_id")),
        ),
        (
            "Book Appointment Unauthorized",
            ApiRequest::post("/appointments").json(&booking),
        ),
    ]
}

pub async fn run(h: &mut Harness) {
    for (name, request) in protected_requests() {
        h.expect_unauthorized(name, request).await;
    }
}
