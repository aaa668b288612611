// lib/src/storage/mod.rs
//! Storage abstraction for the clinic's relational data. The `ClinicStore`
//! trait is the single place the ownership predicate lives: every owned
//! entity's read and mutation takes the authenticated context, and the
//! backend carries `doctor_id = ctx.doctor_id` in the query itself, so a
//! miss never reveals whether the row exists under another doctor.

pub mod memory_store;
pub mod postgres_store;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Serialize, Deserialize};

use models::errors::ClinicResult;
use models::{
    Appointment, AppointmentUpdate, Billing, BillingUpdate, Doctor, DoctorProfileUpdate,
    LabResult, LabResultUpdate, MedicalRecord, MedicalRecordUpdate, NewAppointment, NewBilling,
    NewDoctor, NewLabResult, NewMedicalRecord, NewPatient, NewPrescription, Patient,
    PatientUpdate, Prescription,
};

use crate::auth::AuthContext;

pub use memory_store::MemoryStore;
pub use postgres_store::PostgresStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngineKind {
    Postgres,
    Memory,
}

/// List/detail projection of an appointment joined with its patient.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentRow {
    pub appointment: Appointment,
    pub patient_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionRow {
    pub prescription: Prescription,
    pub patient_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabResultRow {
    pub lab_result: LabResult,
    pub patient_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicalRecordRow {
    pub record: MedicalRecord,
    pub patient_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingRow {
    pub billing: Billing,
    pub patient_name: String,
    pub appointment_time: Option<NaiveTime>,
}

/// Row counts removed by a patient cascade, reported after commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeSummary {
    pub prescriptions: u64,
    pub lab_results: u64,
    pub medical_records: u64,
    pub appointments: u64,
    pub billing: u64,
}

impl CascadeSummary {
    pub fn total(&self) -> u64 {
        self.prescriptions + self.lab_results + self.medical_records + self.appointments + self.billing
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub today_appointments: i64,
    pub total_patients: i64,
    pub active_prescriptions: i64,
    pub lab_results: i64,
    pub recent_appointments: Vec<AppointmentRow>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BillingSummary {
    pub total_revenue: f64,
    pub pending_amount: f64,
    pub today_collections: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub total_appointments: i64,
    pub distinct_patients: i64,
    pub total_prescriptions: i64,
    pub recent_prescriptions: Vec<PrescriptionRow>,
}

/// The clinic's datastore contract. Reads of owned entities return
/// `NotFoundOrForeign` for rows that are missing *or* belong to another
/// doctor; mutations of owned entities carry the same predicate in their
/// own WHERE clause, so a zero-row result maps to the same error.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    /// Creates tables and indexes if they do not exist yet.
    async fn init_schema(&self) -> ClinicResult<()>;

    /// Removes every row from every table, dependents first. Dev/test reset.
    async fn wipe(&self) -> ClinicResult<()>;

    // ------------------------------------------------------------------
    // Doctors
    // ------------------------------------------------------------------
    async fn insert_doctor(&self, new: &NewDoctor, password_hash: &str) -> ClinicResult<i32>;
    async fn find_doctor(&self, id: i32) -> ClinicResult<Option<Doctor>>;
    async fn find_doctor_by_email(&self, email: &str) -> ClinicResult<Option<Doctor>>;
    async fn update_doctor_profile(&self, id: i32, update: &DoctorProfileUpdate) -> ClinicResult<()>;
    async fn touch_last_login(&self, id: i32) -> ClinicResult<()>;
    async fn set_remember_token(
        &self,
        id: i32,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> ClinicResult<()>;
    async fn find_doctor_by_remember_token(&self, token_hash: &str) -> ClinicResult<Option<Doctor>>;
    async fn clear_remember_token(&self, id: i32) -> ClinicResult<()>;

    // ------------------------------------------------------------------
    // Patients (clinic-wide, not ownership-scoped)
    // ------------------------------------------------------------------
    async fn insert_patient(&self, new: &NewPatient) -> ClinicResult<i32>;
    async fn list_patients(&self) -> ClinicResult<Vec<Patient>>;
    async fn find_patient(&self, id: i32) -> ClinicResult<Patient>;
    async fn update_patient(&self, id: i32, update: &PatientUpdate) -> ClinicResult<()>;
    /// Deletes a patient and every dependent row in one transaction.
    /// Either everything goes or nothing does.
    async fn delete_patient_cascade(&self, id: i32) -> ClinicResult<CascadeSummary>;

    // ------------------------------------------------------------------
    // Appointments (owned)
    // ------------------------------------------------------------------
    async fn insert_appointment(&self, ctx: &AuthContext, new: &NewAppointment) -> ClinicResult<i32>;
    async fn list_appointments(&self, ctx: &AuthContext) -> ClinicResult<Vec<AppointmentRow>>;
    async fn find_appointment(&self, ctx: &AuthContext, id: i32) -> ClinicResult<AppointmentRow>;
    async fn update_appointment(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &AppointmentUpdate,
    ) -> ClinicResult<()>;
    async fn delete_appointment(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()>;

    // ------------------------------------------------------------------
    // Prescriptions (owned; created and deleted, never edited)
    // ------------------------------------------------------------------
    async fn insert_prescription(&self, ctx: &AuthContext, new: &NewPrescription) -> ClinicResult<i32>;
    async fn list_prescriptions(&self, ctx: &AuthContext) -> ClinicResult<Vec<PrescriptionRow>>;
    async fn find_prescription(&self, ctx: &AuthContext, id: i32) -> ClinicResult<PrescriptionRow>;
    async fn delete_prescription(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()>;

    // ------------------------------------------------------------------
    // Lab results (owned)
    // ------------------------------------------------------------------
    async fn insert_lab_result(&self, ctx: &AuthContext, new: &NewLabResult) -> ClinicResult<i32>;
    async fn list_lab_results(&self, ctx: &AuthContext) -> ClinicResult<Vec<LabResultRow>>;
    async fn find_lab_result(&self, ctx: &AuthContext, id: i32) -> ClinicResult<LabResultRow>;
    async fn update_lab_result(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &LabResultUpdate,
    ) -> ClinicResult<()>;
    async fn delete_lab_result(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()>;

    // ------------------------------------------------------------------
    // Medical records (owned)
    // ------------------------------------------------------------------
    async fn insert_medical_record(
        &self,
        ctx: &AuthContext,
        new: &NewMedicalRecord,
    ) -> ClinicResult<i32>;
    async fn list_medical_records(&self, ctx: &AuthContext) -> ClinicResult<Vec<MedicalRecordRow>>;
    async fn find_medical_record(&self, ctx: &AuthContext, id: i32) -> ClinicResult<MedicalRecordRow>;
    async fn update_medical_record(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &MedicalRecordUpdate,
    ) -> ClinicResult<()>;
    async fn delete_medical_record(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()>;

    // ------------------------------------------------------------------
    // Billing (owned)
    // ------------------------------------------------------------------
    async fn insert_billing(&self, ctx: &AuthContext, new: &NewBilling) -> ClinicResult<i32>;
    async fn list_billing(&self, ctx: &AuthContext) -> ClinicResult<Vec<BillingRow>>;
    async fn find_billing(&self, ctx: &AuthContext, id: i32) -> ClinicResult<BillingRow>;
    async fn update_billing(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &BillingUpdate,
    ) -> ClinicResult<()>;
    async fn delete_billing(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()>;

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------
    async fn dashboard_summary(&self, ctx: &AuthContext) -> ClinicResult<DashboardSummary>;
    async fn billing_summary(&self, ctx: &AuthContext) -> ClinicResult<BillingSummary>;
    async fn profile_stats(&self, ctx: &AuthContext) -> ClinicResult<ProfileStats>;
}
