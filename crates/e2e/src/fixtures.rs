//! Request payloads sent to the booking service

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::Role;

pub const DEFAULT_PASSWORD: &str = "SecurePass123!";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub slot_id: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub specialization: String,
    pub bio: String,
    pub experience: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Query for `GET /time-slots`
#[derive(Debug, Clone, Default)]
pub struct SlotQuery {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    pub available: bool,
}

impl SlotQuery {
    pub fn for_doctor(doctor_id: &str) -> Self {
        Self {
            doctor_id: Some(doctor_id.to_string()),
            ..Default::default()
        }
    }

    pub fn on(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    pub fn available_only(mut self) -> Self {
        self.available = true;
        self
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = &self.doctor_id {
            pairs.push(("doctorId", id.clone()));
        }
        if let Some(date) = &self.date {
            pairs.push(("date", date.clone()));
        }
        if self.available {
            pairs.push(("available", "true".to_string()));
        }
        pairs
    }
}

/// Unique tag mixed into generated emails so reruns never collide
pub fn run_tag() -> String {
    Local::now().timestamp_millis().to_string()
}

/// Calendar date `days` from today, formatted `YYYY-MM-DD`
pub fn date_from_today(days: u64) -> String {
    format_date(Local::now().date_naive() + Days::new(days))
}

pub fn tomorrow() -> String {
    date_from_today(1)
}

pub fn day_after_tomorrow() -> String {
    date_from_today(2)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn doctor_registration(tag: &str) -> Registration {
    Registration {
        email: format!("doctor.smith.{}@medmeet.com", tag),
        password: DEFAULT_PASSWORD.to_string(),
        name: "Dr. John Smith".to_string(),
        role: Role::Doctor,
        phone: "+1234567890".to_string(),
        specialization: Some("Cardiology".to_string()),
        bio: Some("Experienced cardiologist with 15 years of practice".to_string()),
        experience: Some(15),
    }
}

pub fn patient_registration(tag: &str) -> Registration {
    Registration {
        email: format!("patient.doe.{}@medmeet.com", tag),
        password: DEFAULT_PASSWORD.to_string(),
        name: "Jane Doe".to_string(),
        role: Role::Patient,
        phone: "+1987654321".to_string(),
        specialization: None,
        bio: None,
        experience: None,
    }
}

/// Second registration reusing an existing email
pub fn duplicate_registration(email: &str) -> Registration {
    Registration {
        email: email.to_string(),
        password: "AnotherPass123!".to_string(),
        name: "Another Doctor".to_string(),
        role: Role::Doctor,
        phone: "+1111111111".to_string(),
        specialization: None,
        bio: None,
        experience: None,
    }
}

pub fn unknown_credentials() -> Credentials {
    Credentials {
        email: "nonexistent@medmeet.com".to_string(),
        password: "wrongpassword".to_string(),
    }
}

/// A registered email paired with a password that is not its own
pub fn wrong_password(email: &str) -> Credentials {
    Credentials {
        email: email.to_string(),
        password: format!("not-{}", DEFAULT_PASSWORD),
    }
}

/// Thirty-minute slot starting at `start` (`HH:MM`)
pub fn half_hour_slot(date: &str, start: &str) -> SlotRequest {
    SlotRequest {
        date: date.to_string(),
        start_time: start.to_string(),
        end_time: add_minutes(start, 30),
        duration: Some(30),
    }
}

/// The three slots the full suite creates
pub fn standard_slots() -> Vec<SlotRequest> {
    let tomorrow = tomorrow();
    vec![
        half_hour_slot(&tomorrow, "09:00"),
        half_hour_slot(&tomorrow, "10:00"),
        half_hour_slot(&day_after_tomorrow(), "14:00"),
    ]
}

pub fn profile_update() -> ProfileUpdate {
    ProfileUpdate {
        specialization: "Interventional Cardiology".to_string(),
        bio: "Updated bio: Specialized in interventional cardiology with 15+ years experience"
            .to_string(),
        experience: 16,
    }
}

fn add_minutes(hhmm: &str, minutes: u32) -> String {
    let parsed = hhmm
        .split_once(':')
        .and_then(|(h, m)| Some((h.parse::<u32>().ok()?, m.parse::<u32>().ok()?)));
    match parsed {
        Some((h, m)) => {
            let total = (h * 60 + m + minutes) % (24 * 60);
            format!("{:02}:{:02}", total / 60, total % 60)
        }
        None => hhmm.to_string(),
    }
}
