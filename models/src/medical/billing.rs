// models/src/medical/billing.rs
use std::fmt;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Deserialize};

use crate::errors::{ValidationError, ValidationResult};

/// A charge raised by a doctor against a patient, optionally tied to the
/// appointment it was billed for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Billing {
    pub id: i32,
    pub doctor_id: i32,
    pub patient_id: i32,
    pub appointment_id: Option<i32>,
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> ValidationResult<Self> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a user-submitted amount. Rejects anything that is not a finite,
/// strictly positive number; 0.01 is the smallest accepted charge.
pub fn parse_amount(raw: &str) -> ValidationResult<f64> {
    let amount: f64 = raw.trim().parse().map_err(|_| ValidationError::InvalidAmount)?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(amount)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBilling {
    pub patient_id: i32,
    pub appointment_id: Option<i32>,
    pub amount: f64,
    pub payment_method: String,
    pub notes: Option<String>,
}

impl NewBilling {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.patient_id <= 0 {
            return Err(ValidationError::missing("patient_id"));
        }
        if self.payment_method.trim().is_empty() {
            return Err(ValidationError::missing("payment_method"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::InvalidAmount);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingUpdate {
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl BillingUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.payment_method.trim().is_empty() {
            return Err(ValidationError::missing("payment_method"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::InvalidAmount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge(amount: f64) -> NewBilling {
        NewBilling {
            patient_id: 1,
            appointment_id: None,
            amount,
            payment_method: "Cash".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_amount_must_be_strictly_positive() {
        assert_eq!(charge(0.0).validate().unwrap_err(), ValidationError::InvalidAmount);
        assert_eq!(charge(-5.0).validate().unwrap_err(), ValidationError::InvalidAmount);
        assert!(charge(0.01).validate().is_ok());
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("inf").is_err());
        assert_eq!(parse_amount(" 12.50 ").unwrap(), 12.50);
    }

    #[test]
    fn test_payment_method_is_required() {
        let mut bill = charge(10.0);
        bill.payment_method = " ".to_string();
        assert_eq!(bill.validate().unwrap_err(), ValidationError::missing("payment_method"));
    }
}
