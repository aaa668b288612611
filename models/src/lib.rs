// models/src/lib.rs

pub mod errors;
pub mod medical;

// Re-export the types that other crates use constantly, so callers can
// write `models::Patient` instead of spelling the full path.
pub use errors::{ClinicError, ClinicResult, ValidationError, ValidationResult};
pub use medical::appointment::{Appointment, AppointmentStatus, NewAppointment, AppointmentUpdate};
pub use medical::billing::{Billing, BillingUpdate, NewBilling, PaymentStatus};
pub use medical::doctor::{ClinicType, Doctor, DoctorStatus, NewDoctor, DoctorProfileUpdate};
pub use medical::lab_result::{LabResult, LabStatus, LabResultUpdate, NewLabResult};
pub use medical::medical_record::{MedicalRecord, MedicalRecordUpdate, NewMedicalRecord, RecordStatus};
pub use medical::patient::{Gender, NewPatient, Patient, PatientUpdate};
pub use medical::prescription::{NewPrescription, Prescription, PrescriptionStatus};
