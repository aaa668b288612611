// models/src/medical/patient.rs
use std::fmt;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Deserialize};

use crate::errors::{ValidationError, ValidationResult};

/// A clinic-wide demographic and medical-history record. Patients are not
/// owned by any one doctor: every authenticated doctor may create, read,
/// update, or delete any patient. That asymmetry against the per-doctor
/// clinical records is deliberate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(s: &str) -> ValidationResult<Self> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(ValidationError::InvalidValue(format!("gender: {}", other))),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

impl NewPatient {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::missing("first_name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::missing("last_name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::missing("email"));
        }
        Ok(())
    }
}

/// Editable subset of a patient row.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

impl PatientUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::missing("first_name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::missing("last_name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::missing("email"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_reject_patient_without_name() {
        let patient = NewPatient {
            first_name: "".to_string(),
            last_name: "Doe".to_string(),
            email: "jane.doe@example.com".to_string(),
            phone: None,
            date_of_birth: None,
            gender: None,
            address: None,
            medical_history: None,
            allergies: None,
        };
        assert_eq!(
            patient.validate().unwrap_err(),
            ValidationError::missing("first_name")
        );
    }

    #[test]
    fn gender_round_trips_through_parse() {
        for g in [Gender::Male, Gender::Female, Gender::Other] {
            assert_eq!(Gender::parse(g.as_str()).unwrap(), g);
        }
    }
}
