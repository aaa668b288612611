// models/src/medical/lab_result.rs
use std::fmt;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Deserialize};

use crate::errors::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabResult {
    pub id: i32,
    pub doctor_id: i32,
    pub patient_id: i32,
    pub test_name: String,
    pub test_date: NaiveDate,
    pub results: Option<String>,
    pub notes: Option<String>,
    pub status: LabStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabStatus {
    Pending,
    Completed,
    Cancelled,
}

impl Default for LabStatus {
    fn default() -> Self {
        LabStatus::Pending
    }
}

impl LabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabStatus::Pending => "Pending",
            LabStatus::Completed => "Completed",
            LabStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> ValidationResult<Self> {
        match s {
            "Pending" => Ok(LabStatus::Pending),
            "Completed" => Ok(LabStatus::Completed),
            "Cancelled" => Ok(LabStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for LabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLabResult {
    pub patient_id: i32,
    pub test_name: String,
    pub test_date: NaiveDate,
    pub results: Option<String>,
    pub notes: Option<String>,
}

impl NewLabResult {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.patient_id <= 0 {
            return Err(ValidationError::missing("patient_id"));
        }
        if self.test_name.trim().is_empty() {
            return Err(ValidationError::missing("test_name"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabResultUpdate {
    pub test_name: String,
    pub test_date: NaiveDate,
    pub results: Option<String>,
    pub notes: Option<String>,
    pub status: LabStatus,
}

impl LabResultUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.test_name.trim().is_empty() {
            return Err(ValidationError::missing("test_name"));
        }
        Ok(())
    }
}
