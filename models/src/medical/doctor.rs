// models/src/medical/doctor.rs
use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::errors::{ValidationError, ValidationResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// The single authenticated actor in the system. Owns all clinical records
/// it creates; never hard-deleted by any application flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Salted digest, never the raw password.
    pub password_hash: String,
    pub clinic_name: Option<String>,
    pub clinic_type: Option<ClinicType>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub remember_token: Option<String>,
    pub token_expires: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub status: DoctorStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoctorStatus {
    Active,
    Inactive,
    Suspended,
}

impl Default for DoctorStatus {
    fn default() -> Self {
        DoctorStatus::Active
    }
}

impl DoctorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoctorStatus::Active => "active",
            DoctorStatus::Inactive => "inactive",
            DoctorStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> ValidationResult<Self> {
        match s {
            "active" => Ok(DoctorStatus::Active),
            "inactive" => Ok(DoctorStatus::Inactive),
            "suspended" => Ok(DoctorStatus::Suspended),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for DoctorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClinicType {
    General,
    Specialist,
    Dental,
    Pediatric,
    Other,
}

impl ClinicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicType::General => "general",
            ClinicType::Specialist => "specialist",
            ClinicType::Dental => "dental",
            ClinicType::Pediatric => "pediatric",
            ClinicType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> ValidationResult<Self> {
        match s {
            "general" => Ok(ClinicType::General),
            "specialist" => Ok(ClinicType::Specialist),
            "dental" => Ok(ClinicType::Dental),
            "pediatric" => Ok(ClinicType::Pediatric),
            "other" => Ok(ClinicType::Other),
            other => Err(ValidationError::InvalidValue(format!("clinic_type: {}", other))),
        }
    }
}

impl fmt::Display for ClinicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration input. `password` is the raw submitted password; hashing
/// happens in the auth service, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDoctor {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub clinic_name: Option<String>,
    pub clinic_type: Option<ClinicType>,
}

impl NewDoctor {
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
        if !self.email.contains('@') {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
        }
        if self.password != self.password_confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

/// Fields a doctor may change from the profile page.
#[derive(Debug, Clone, Deserialize)]
pub struct DoctorProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub clinic_name: Option<String>,
    pub clinic_type: Option<ClinicType>,
}

impl DoctorProfileUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::missing("first_name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::missing("last_name"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_registration() -> NewDoctor {
        NewDoctor {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john.smith@clinic.test".to_string(),
            password: "admin123".to_string(),
            password_confirm: "admin123".to_string(),
            phone: None,
            specialization: Some("General Medicine".to_string()),
            clinic_name: None,
            clinic_type: None,
        }
    }

    #[test]
    fn should_accept_valid_registration() {
        assert!(valid_registration().validate().is_ok());
    }

    #[test]
    fn should_reject_short_password() {
        let mut reg = valid_registration();
        reg.password = "abc".to_string();
        reg.password_confirm = "abc".to_string();
        assert_eq!(
            reg.validate().unwrap_err(),
            ValidationError::PasswordTooShort(MIN_PASSWORD_LEN)
        );
    }

    #[test]
    fn should_reject_mismatched_confirmation() {
        let mut reg = valid_registration();
        reg.password_confirm = "different".to_string();
        assert_eq!(reg.validate().unwrap_err(), ValidationError::PasswordMismatch);
    }

    #[test]
    fn should_reject_mail_without_at_sign() {
        let mut reg = valid_registration();
        reg.email = "not-an-email".to_string();
        assert!(matches!(reg.validate().unwrap_err(), ValidationError::InvalidEmail(_)));
    }
}
