// models/src/medical/medical_record.rs
use std::fmt;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Deserialize};

use crate::errors::{ValidationError, ValidationResult};

/// A diagnosis/treatment entry for a visit, owned by the writing doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: i32,
    pub doctor_id: i32,
    pub patient_id: i32,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: Option<String>,
    pub record_date: NaiveDate,
    pub follow_up_date: Option<NaiveDate>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Active,
    Archived,
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Active
    }
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "Active",
            RecordStatus::Archived => "Archived",
        }
    }

    pub fn parse(s: &str) -> ValidationResult<Self> {
        match s {
            "Active" => Ok(RecordStatus::Active),
            "Archived" => Ok(RecordStatus::Archived),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMedicalRecord {
    pub patient_id: i32,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: Option<String>,
    pub record_date: NaiveDate,
    pub follow_up_date: Option<NaiveDate>,
}

impl NewMedicalRecord {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.patient_id <= 0 {
            return Err(ValidationError::missing("patient_id"));
        }
        if self.diagnosis.trim().is_empty() {
            return Err(ValidationError::missing("diagnosis"));
        }
        if self.treatment.trim().is_empty() {
            return Err(ValidationError::missing("treatment"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicalRecordUpdate {
    pub diagnosis: String,
    pub treatment: String,
    pub notes: Option<String>,
    pub record_date: NaiveDate,
    pub follow_up_date: Option<NaiveDate>,
    pub status: RecordStatus,
}

impl MedicalRecordUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.diagnosis.trim().is_empty() {
            return Err(ValidationError::missing("diagnosis"));
        }
        if self.treatment.trim().is_empty() {
            return Err(ValidationError::missing("treatment"));
        }
        Ok(())
    }
}
