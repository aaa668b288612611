// models/src/medical/prescription.rs
use std::fmt;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Deserialize};

use crate::errors::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i32,
    pub doctor_id: i32,
    pub patient_id: i32,
    pub prescription_date: NaiveDate,
    pub medication: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
}

impl Default for PrescriptionStatus {
    fn default() -> Self {
        PrescriptionStatus::Active
    }
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "Active",
            PrescriptionStatus::Completed => "Completed",
            PrescriptionStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> ValidationResult<Self> {
        match s {
            "Active" => Ok(PrescriptionStatus::Active),
            "Completed" => Ok(PrescriptionStatus::Completed),
            "Cancelled" => Ok(PrescriptionStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrescription {
    pub patient_id: i32,
    pub prescription_date: NaiveDate,
    pub medication: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

impl NewPrescription {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.patient_id <= 0 {
            return Err(ValidationError::missing("patient_id"));
        }
        if self.medication.trim().is_empty() {
            return Err(ValidationError::missing("medication"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_reject_prescription_without_medication() {
        let rx = NewPrescription {
            patient_id: 1,
            prescription_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            medication: "".to_string(),
            dosage: None,
            frequency: None,
            duration: None,
            instructions: None,
        };
        assert_eq!(rx.validate().unwrap_err(), ValidationError::missing("medication"));
    }
}
