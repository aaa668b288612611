// models/src/medical/appointment.rs
use std::fmt;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Serialize, Deserialize};

use crate::errors::{ValidationError, ValidationResult};

/// A scheduled visit, owned by exactly one doctor for exactly one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i32,
    pub doctor_id: i32,
    pub patient_id: i32,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical appointment lifecycle. Historical rows may carry the legacy
/// lowercase values (`scheduled`, `completed`, `cancelled`, `no-show`), so
/// `parse` accepts both spellings; `no-show` folds into `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::InProgress => "In Progress",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> ValidationResult<Self> {
        match s {
            "Scheduled" | "scheduled" => Ok(AppointmentStatus::Scheduled),
            "In Progress" => Ok(AppointmentStatus::InProgress),
            "Completed" | "completed" => Ok(AppointmentStatus::Completed),
            "Cancelled" | "cancelled" | "no-show" => Ok(AppointmentStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling input. `doctor_id` is never part of this struct: the owner is
/// always taken from the authenticated context at insert time.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i32,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.patient_id <= 0 {
            return Err(ValidationError::missing("patient_id"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentUpdate {
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
}

impl AppointmentUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.reason.trim().is_empty() {
            return Err(ValidationError::missing("reason"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_legacy_status_values() {
        assert_eq!(AppointmentStatus::parse("Scheduled").unwrap(), AppointmentStatus::Scheduled);
        assert_eq!(AppointmentStatus::parse("scheduled").unwrap(), AppointmentStatus::Scheduled);
        assert_eq!(AppointmentStatus::parse("In Progress").unwrap(), AppointmentStatus::InProgress);
        assert_eq!(AppointmentStatus::parse("no-show").unwrap(), AppointmentStatus::Cancelled);
        assert!(AppointmentStatus::parse("rescheduled").is_err());
    }

    #[test]
    fn default_status_is_scheduled() {
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Scheduled);
    }

    #[test]
    fn update_requires_a_reason() {
        let update = AppointmentUpdate {
            appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            status: AppointmentStatus::Scheduled,
            reason: "  ".to_string(),
            notes: None,
        };
        assert_eq!(update.validate().unwrap_err(), ValidationError::missing("reason"));
    }
}
