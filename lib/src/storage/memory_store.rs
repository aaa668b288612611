// lib/src/storage/memory_store.rs
//! In-memory backend. Serves demo runs without a database and acts as the
//! datastore double for the test suite. All tables live behind one RwLock,
//! which is what makes the patient cascade naturally atomic here: the write
//! guard is held for the whole sequence and nothing is applied until every
//! step has succeeded.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use tokio::sync::RwLock;

use models::errors::{ClinicError, ClinicResult};
use models::{
    Appointment, AppointmentUpdate, Billing, BillingUpdate, Doctor, DoctorProfileUpdate,
    DoctorStatus, LabResult, LabResultUpdate, LabStatus, MedicalRecord, MedicalRecordUpdate,
    NewAppointment, NewBilling, NewDoctor, NewLabResult, NewMedicalRecord, NewPatient,
    NewPrescription, Patient, PatientUpdate, PaymentStatus, Prescription, PrescriptionStatus,
    RecordStatus,
};

use crate::auth::AuthContext;
use crate::storage::{
    AppointmentRow, BillingRow, BillingSummary, CascadeSummary, ClinicStore, DashboardSummary,
    LabResultRow, MedicalRecordRow, PrescriptionRow, ProfileStats,
};

#[derive(Default)]
struct Tables {
    doctors: BTreeMap<i32, Doctor>,
    patients: BTreeMap<i32, Patient>,
    appointments: BTreeMap<i32, Appointment>,
    prescriptions: BTreeMap<i32, Prescription>,
    lab_results: BTreeMap<i32, LabResult>,
    medical_records: BTreeMap<i32, MedicalRecord>,
    billing: BTreeMap<i32, Billing>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn patient_name(&self, patient_id: i32) -> Option<String> {
        self.patients.get(&patient_id).map(|p| p.display_name())
    }
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_cascade: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            tables: RwLock::new(Tables::default()),
            fail_cascade: AtomicBool::new(false),
        }
    }

    /// Arms a one-shot failure inside the next cascade delete. Used to
    /// exercise the all-or-nothing guarantee.
    pub fn inject_cascade_failure(&self) {
        self.fail_cascade.store(true, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn init_schema(&self) -> ClinicResult<()> {
        Ok(())
    }

    async fn wipe(&self) -> ClinicResult<()> {
        let mut tables = self.tables.write().await;
        *tables = Tables::default();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Doctors
    // ------------------------------------------------------------------

    async fn insert_doctor(&self, new: &NewDoctor, password_hash: &str) -> ClinicResult<i32> {
        let mut tables = self.tables.write().await;
        if tables.doctors.values().any(|d| d.email == new.email) {
            return Err(ClinicError::Conflict(format!(
                "an account with email {} already exists",
                new.email
            )));
        }
        let id = tables.next_id();
        let ts = now();
        tables.doctors.insert(id, Doctor {
            id,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            password_hash: password_hash.to_string(),
            clinic_name: new.clinic_name.clone(),
            clinic_type: new.clinic_type,
            phone: new.phone.clone(),
            specialization: new.specialization.clone(),
            remember_token: None,
            token_expires: None,
            last_login: None,
            status: DoctorStatus::Active,
            created_at: ts,
            updated_at: ts,
        });
        Ok(id)
    }

    async fn find_doctor(&self, id: i32) -> ClinicResult<Option<Doctor>> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn find_doctor_by_email(&self, email: &str) -> ClinicResult<Option<Doctor>> {
        Ok(self
            .tables
            .read()
            .await
            .doctors
            .values()
            .find(|d| d.email == email)
            .cloned())
    }

    async fn update_doctor_profile(&self, id: i32, update: &DoctorProfileUpdate) -> ClinicResult<()> {
        let mut tables = self.tables.write().await;
        let doctor = tables.doctors.get_mut(&id).ok_or(ClinicError::NotFoundOrForeign)?;
        doctor.first_name = update.first_name.clone();
        doctor.last_name = update.last_name.clone();
        doctor.phone = update.phone.clone();
        doctor.specialization = update.specialization.clone();
        doctor.clinic_name = update.clinic_name.clone();
        doctor.clinic_type = update.clinic_type;
        doctor.updated_at = now();
        Ok(())
    }

    async fn touch_last_login(&self, id: i32) -> ClinicResult<()> {
        if let Some(doctor) = self.tables.write().await.doctors.get_mut(&id) {
            doctor.last_login = Some(now());
        }
        Ok(())
    }

    async fn set_remember_token(
        &self,
        id: i32,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> ClinicResult<()> {
        if let Some(doctor) = self.tables.write().await.doctors.get_mut(&id) {
            doctor.remember_token = Some(token_hash.to_string());
            doctor.token_expires = Some(expires);
        }
        Ok(())
    }

    async fn find_doctor_by_remember_token(&self, token_hash: &str) -> ClinicResult<Option<Doctor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .doctors
            .values()
            .find(|d| {
                d.remember_token.as_deref() == Some(token_hash)
                    && d.token_expires.map(|t| t > now()).unwrap_or(false)
            })
            .cloned())
    }

    async fn clear_remember_token(&self, id: i32) -> ClinicResult<()> {
        if let Some(doctor) = self.tables.write().await.doctors.get_mut(&id) {
            doctor.remember_token = None;
            doctor.token_expires = None;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    async fn insert_patient(&self, new: &NewPatient) -> ClinicResult<i32> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let ts = now();
        tables.patients.insert(id, Patient {
            id,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            date_of_birth: new.date_of_birth,
            gender: new.gender,
            address: new.address.clone(),
            medical_history: new.medical_history.clone(),
            allergies: new.allergies.clone(),
            created_at: ts,
            updated_at: ts,
        });
        Ok(id)
    }

    async fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        let tables = self.tables.read().await;
        let mut patients: Vec<Patient> = tables.patients.values().cloned().collect();
        patients.sort_by(|a, b| {
            (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name))
        });
        Ok(patients)
    }

    async fn find_patient(&self, id: i32) -> ClinicResult<Patient> {
        self.tables
            .read()
            .await
            .patients
            .get(&id)
            .cloned()
            .ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_patient(&self, id: i32, update: &PatientUpdate) -> ClinicResult<()> {
        update.validate()?;
        let mut tables = self.tables.write().await;
        let patient = tables.patients.get_mut(&id).ok_or(ClinicError::NotFoundOrForeign)?;
        patient.first_name = update.first_name.clone();
        patient.last_name = update.last_name.clone();
        patient.email = update.email.clone();
        patient.phone = update.phone.clone();
        patient.date_of_birth = update.date_of_birth;
        patient.gender = update.gender;
        patient.address = update.address.clone();
        patient.medical_history = update.medical_history.clone();
        patient.allergies = update.allergies.clone();
        patient.updated_at = now();
        Ok(())
    }

    async fn delete_patient_cascade(&self, id: i32) -> ClinicResult<CascadeSummary> {
        let mut tables = self.tables.write().await;
        if !tables.patients.contains_key(&id) {
            return Err(ClinicError::NotFoundOrForeign);
        }
        // The guard is held for the whole cascade; a failure here must leave
        // every table untouched, so nothing is removed before this check.
        if self.fail_cascade.swap(false, Ordering::SeqCst) {
            return Err(ClinicError::Storage(
                "storage failure during patient cascade".to_string(),
            ));
        }

        let mut summary = CascadeSummary::default();
        let before = tables.prescriptions.len();
        tables.prescriptions.retain(|_, r| r.patient_id != id);
        summary.prescriptions = (before - tables.prescriptions.len()) as u64;

        let before = tables.lab_results.len();
        tables.lab_results.retain(|_, r| r.patient_id != id);
        summary.lab_results = (before - tables.lab_results.len()) as u64;

        let before = tables.medical_records.len();
        tables.medical_records.retain(|_, r| r.patient_id != id);
        summary.medical_records = (before - tables.medical_records.len()) as u64;

        let before = tables.appointments.len();
        tables.appointments.retain(|_, r| r.patient_id != id);
        summary.appointments = (before - tables.appointments.len()) as u64;

        let before = tables.billing.len();
        tables.billing.retain(|_, r| r.patient_id != id);
        summary.billing = (before - tables.billing.len()) as u64;

        tables.patients.remove(&id);
        info!("Deleted patient {} and {} dependent rows", id, summary.total());
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Appointments
    // ------------------------------------------------------------------

    async fn insert_appointment(&self, ctx: &AuthContext, new: &NewAppointment) -> ClinicResult<i32> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let ts = now();
        tables.appointments.insert(id, Appointment {
            id,
            doctor_id: ctx.doctor_id,
            patient_id: new.patient_id,
            appointment_date: new.appointment_date,
            appointment_time: new.appointment_time,
            status: new.status,
            reason: new.reason.clone(),
            notes: new.notes.clone(),
            created_at: ts,
            updated_at: ts,
        });
        Ok(id)
    }

    async fn list_appointments(&self, ctx: &AuthContext) -> ClinicResult<Vec<AppointmentRow>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<AppointmentRow> = tables
            .appointments
            .values()
            .filter(|a| a.doctor_id == ctx.doctor_id)
            .filter_map(|a| {
                tables.patient_name(a.patient_id).map(|patient_name| AppointmentRow {
                    appointment: a.clone(),
                    patient_name,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.appointment.appointment_date, b.appointment.appointment_time)
                .cmp(&(a.appointment.appointment_date, a.appointment.appointment_time))
        });
        Ok(rows)
    }

    async fn find_appointment(&self, ctx: &AuthContext, id: i32) -> ClinicResult<AppointmentRow> {
        let tables = self.tables.read().await;
        tables
            .appointments
            .get(&id)
            .filter(|a| a.doctor_id == ctx.doctor_id)
            .and_then(|a| {
                tables.patient_name(a.patient_id).map(|patient_name| AppointmentRow {
                    appointment: a.clone(),
                    patient_name,
                })
            })
            .ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_appointment(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &AppointmentUpdate,
    ) -> ClinicResult<()> {
        update.validate()?;
        let mut tables = self.tables.write().await;
        let appointment = tables
            .appointments
            .get_mut(&id)
            .filter(|a| a.doctor_id == ctx.doctor_id)
            .ok_or(ClinicError::NotFoundOrForeign)?;
        appointment.appointment_date = update.appointment_date;
        appointment.appointment_time = update.appointment_time;
        appointment.status = update.status;
        appointment.reason = Some(update.reason.clone());
        appointment.notes = update.notes.clone();
        appointment.updated_at = now();
        Ok(())
    }

    async fn delete_appointment(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .appointments
            .get(&id)
            .map_or(false, |a| a.doctor_id == ctx.doctor_id);
        if !owned {
            return Err(ClinicError::NotFoundOrForeign);
        }
        tables.appointments.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Prescriptions
    // ------------------------------------------------------------------

    async fn insert_prescription(&self, ctx: &AuthContext, new: &NewPrescription) -> ClinicResult<i32> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let ts = now();
        tables.prescriptions.insert(id, Prescription {
            id,
            doctor_id: ctx.doctor_id,
            patient_id: new.patient_id,
            prescription_date: new.prescription_date,
            medication: new.medication.clone(),
            dosage: new.dosage.clone(),
            frequency: new.frequency.clone(),
            duration: new.duration.clone(),
            instructions: new.instructions.clone(),
            status: PrescriptionStatus::Active,
            created_at: ts,
            updated_at: ts,
        });
        Ok(id)
    }

    async fn list_prescriptions(&self, ctx: &AuthContext) -> ClinicResult<Vec<PrescriptionRow>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PrescriptionRow> = tables
            .prescriptions
            .values()
            .filter(|r| r.doctor_id == ctx.doctor_id)
            .filter_map(|r| {
                tables.patient_name(r.patient_id).map(|patient_name| PrescriptionRow {
                    prescription: r.clone(),
                    patient_name,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.prescription.prescription_date, b.prescription.id)
                .cmp(&(a.prescription.prescription_date, a.prescription.id))
        });
        Ok(rows)
    }

    async fn find_prescription(&self, ctx: &AuthContext, id: i32) -> ClinicResult<PrescriptionRow> {
        let tables = self.tables.read().await;
        tables
            .prescriptions
            .get(&id)
            .filter(|r| r.doctor_id == ctx.doctor_id)
            .and_then(|r| {
                tables.patient_name(r.patient_id).map(|patient_name| PrescriptionRow {
                    prescription: r.clone(),
                    patient_name,
                })
            })
            .ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn delete_prescription(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .prescriptions
            .get(&id)
            .map_or(false, |r| r.doctor_id == ctx.doctor_id);
        if !owned {
            return Err(ClinicError::NotFoundOrForeign);
        }
        tables.prescriptions.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lab results
    // ------------------------------------------------------------------

    async fn insert_lab_result(&self, ctx: &AuthContext, new: &NewLabResult) -> ClinicResult<i32> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let ts = now();
        tables.lab_results.insert(id, LabResult {
            id,
            doctor_id: ctx.doctor_id,
            patient_id: new.patient_id,
            test_name: new.test_name.clone(),
            test_date: new.test_date,
            results: new.results.clone(),
            notes: new.notes.clone(),
            status: LabStatus::Pending,
            created_at: ts,
            updated_at: ts,
        });
        Ok(id)
    }

    async fn list_lab_results(&self, ctx: &AuthContext) -> ClinicResult<Vec<LabResultRow>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<LabResultRow> = tables
            .lab_results
            .values()
            .filter(|l| l.doctor_id == ctx.doctor_id)
            .filter_map(|l| {
                tables.patient_name(l.patient_id).map(|patient_name| LabResultRow {
                    lab_result: l.clone(),
                    patient_name,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.lab_result.test_date, b.lab_result.id).cmp(&(a.lab_result.test_date, a.lab_result.id))
        });
        Ok(rows)
    }

    async fn find_lab_result(&self, ctx: &AuthContext, id: i32) -> ClinicResult<LabResultRow> {
        let tables = self.tables.read().await;
        tables
            .lab_results
            .get(&id)
            .filter(|l| l.doctor_id == ctx.doctor_id)
            .and_then(|l| {
                tables.patient_name(l.patient_id).map(|patient_name| LabResultRow {
                    lab_result: l.clone(),
                    patient_name,
                })
            })
            .ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_lab_result(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &LabResultUpdate,
    ) -> ClinicResult<()> {
        update.validate()?;
        let mut tables = self.tables.write().await;
        let lab = tables
            .lab_results
            .get_mut(&id)
            .filter(|l| l.doctor_id == ctx.doctor_id)
            .ok_or(ClinicError::NotFoundOrForeign)?;
        lab.test_name = update.test_name.clone();
        lab.test_date = update.test_date;
        lab.results = update.results.clone();
        lab.notes = update.notes.clone();
        lab.status = update.status;
        lab.updated_at = now();
        Ok(())
    }

    async fn delete_lab_result(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .lab_results
            .get(&id)
            .map_or(false, |l| l.doctor_id == ctx.doctor_id);
        if !owned {
            return Err(ClinicError::NotFoundOrForeign);
        }
        tables.lab_results.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Medical records
    // ------------------------------------------------------------------

    async fn insert_medical_record(
        &self,
        ctx: &AuthContext,
        new: &NewMedicalRecord,
    ) -> ClinicResult<i32> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let ts = now();
        tables.medical_records.insert(id, MedicalRecord {
            id,
            doctor_id: ctx.doctor_id,
            patient_id: new.patient_id,
            diagnosis: new.diagnosis.clone(),
            treatment: new.treatment.clone(),
            notes: new.notes.clone(),
            record_date: new.record_date,
            follow_up_date: new.follow_up_date,
            status: RecordStatus::Active,
            created_at: ts,
            updated_at: ts,
        });
        Ok(id)
    }

    async fn list_medical_records(&self, ctx: &AuthContext) -> ClinicResult<Vec<MedicalRecordRow>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<MedicalRecordRow> = tables
            .medical_records
            .values()
            .filter(|m| m.doctor_id == ctx.doctor_id)
            .filter_map(|m| {
                tables.patient_name(m.patient_id).map(|patient_name| MedicalRecordRow {
                    record: m.clone(),
                    patient_name,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.record.record_date, b.record.id).cmp(&(a.record.record_date, a.record.id))
        });
        Ok(rows)
    }

    async fn find_medical_record(&self, ctx: &AuthContext, id: i32) -> ClinicResult<MedicalRecordRow> {
        let tables = self.tables.read().await;
        tables
            .medical_records
            .get(&id)
            .filter(|m| m.doctor_id == ctx.doctor_id)
            .and_then(|m| {
                tables.patient_name(m.patient_id).map(|patient_name| MedicalRecordRow {
                    record: m.clone(),
                    patient_name,
                })
            })
            .ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_medical_record(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &MedicalRecordUpdate,
    ) -> ClinicResult<()> {
        update.validate()?;
        let mut tables = self.tables.write().await;
        let record = tables
            .medical_records
            .get_mut(&id)
            .filter(|m| m.doctor_id == ctx.doctor_id)
            .ok_or(ClinicError::NotFoundOrForeign)?;
        record.diagnosis = update.diagnosis.clone();
        record.treatment = update.treatment.clone();
        record.notes = update.notes.clone();
        record.record_date = update.record_date;
        record.follow_up_date = update.follow_up_date;
        record.status = update.status;
        record.updated_at = now();
        Ok(())
    }

    async fn delete_medical_record(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .medical_records
            .get(&id)
            .map_or(false, |m| m.doctor_id == ctx.doctor_id);
        if !owned {
            return Err(ClinicError::NotFoundOrForeign);
        }
        tables.medical_records.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Billing
    // ------------------------------------------------------------------

    async fn insert_billing(&self, ctx: &AuthContext, new: &NewBilling) -> ClinicResult<i32> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let ts = now();
        tables.billing.insert(id, Billing {
            id,
            doctor_id: ctx.doctor_id,
            patient_id: new.patient_id,
            appointment_id: new.appointment_id,
            amount: new.amount,
            payment_method: new.payment_method.clone(),
            payment_status: PaymentStatus::Pending,
            payment_date: None,
            notes: new.notes.clone(),
            created_at: ts,
            updated_at: ts,
        });
        Ok(id)
    }

    async fn list_billing(&self, ctx: &AuthContext) -> ClinicResult<Vec<BillingRow>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<BillingRow> = tables
            .billing
            .values()
            .filter(|b| b.doctor_id == ctx.doctor_id)
            .filter_map(|b| {
                tables.patient_name(b.patient_id).map(|patient_name| BillingRow {
                    billing: b.clone(),
                    patient_name,
                    appointment_time: b
                        .appointment_id
                        .and_then(|aid| tables.appointments.get(&aid))
                        .map(|a| a.appointment_time),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.billing.created_at.cmp(&a.billing.created_at));
        Ok(rows)
    }

    async fn find_billing(&self, ctx: &AuthContext, id: i32) -> ClinicResult<BillingRow> {
        let tables = self.tables.read().await;
        tables
            .billing
            .get(&id)
            .filter(|b| b.doctor_id == ctx.doctor_id)
            .and_then(|b| {
                tables.patient_name(b.patient_id).map(|patient_name| BillingRow {
                    billing: b.clone(),
                    patient_name,
                    appointment_time: b
                        .appointment_id
                        .and_then(|aid| tables.appointments.get(&aid))
                        .map(|a| a.appointment_time),
                })
            })
            .ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_billing(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &BillingUpdate,
    ) -> ClinicResult<()> {
        update.validate()?;
        let mut tables = self.tables.write().await;
        let bill = tables
            .billing
            .get_mut(&id)
            .filter(|b| b.doctor_id == ctx.doctor_id)
            .ok_or(ClinicError::NotFoundOrForeign)?;
        bill.amount = update.amount;
        bill.payment_method = update.payment_method.clone();
        bill.payment_status = update.payment_status;
        bill.payment_date = update.payment_date;
        bill.notes = update.notes.clone();
        bill.updated_at = now();
        Ok(())
    }

    async fn delete_billing(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .billing
            .get(&id)
            .map_or(false, |b| b.doctor_id == ctx.doctor_id);
        if !owned {
            return Err(ClinicError::NotFoundOrForeign);
        }
        tables.billing.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    async fn dashboard_summary(&self, ctx: &AuthContext) -> ClinicResult<DashboardSummary> {
        let today = now().date_naive();
        let recent = {
            let mut rows = self.list_appointments(ctx).await?;
            rows.truncate(5);
            rows
        };
        let tables = self.tables.read().await;
        Ok(DashboardSummary {
            today_appointments: tables
                .appointments
                .values()
                .filter(|a| a.doctor_id == ctx.doctor_id && a.appointment_date == today)
                .count() as i64,
            total_patients: tables.patients.len() as i64,
            active_prescriptions: tables
                .prescriptions
                .values()
                .filter(|r| r.doctor_id == ctx.doctor_id && r.status == PrescriptionStatus::Active)
                .count() as i64,
            lab_results: tables
                .lab_results
                .values()
                .filter(|l| l.doctor_id == ctx.doctor_id)
                .count() as i64,
            recent_appointments: recent,
        })
    }

    async fn billing_summary(&self, ctx: &AuthContext) -> ClinicResult<BillingSummary> {
        let today = now().date_naive();
        let tables = self.tables.read().await;
        let mut summary = BillingSummary::default();
        for bill in tables.billing.values().filter(|b| b.doctor_id == ctx.doctor_id) {
            summary.total_revenue += bill.amount;
            match bill.payment_status {
                PaymentStatus::Pending => summary.pending_amount += bill.amount,
                PaymentStatus::Paid => {
                    let collected_today = match bill.payment_date {
                        Some(date) => date == today,
                        None => bill.created_at.date_naive() == today,
                    };
                    if collected_today {
                        summary.today_collections += bill.amount;
                    }
                }
                PaymentStatus::Cancelled => {}
            }
        }
        Ok(summary)
    }

    async fn profile_stats(&self, ctx: &AuthContext) -> ClinicResult<ProfileStats> {
        let recent = {
            let mut rows = self.list_prescriptions(ctx).await?;
            rows.truncate(5);
            rows
        };
        let tables = self.tables.read().await;
        let distinct: std::collections::HashSet<i32> = tables
            .appointments
            .values()
            .filter(|a| a.doctor_id == ctx.doctor_id)
            .map(|a| a.patient_id)
            .collect();
        Ok(ProfileStats {
            total_appointments: tables
                .appointments
                .values()
                .filter(|a| a.doctor_id == ctx.doctor_id)
                .count() as i64,
            distinct_patients: distinct.len() as i64,
            total_prescriptions: tables
                .prescriptions
                .values()
                .filter(|r| r.doctor_id == ctx.doctor_id)
                .count() as i64,
            recent_prescriptions: recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use models::AppointmentStatus;

    fn ctx(doctor_id: i32) -> AuthContext {
        AuthContext::for_doctor(doctor_id)
    }

    fn patient(first: &str, last: &str, email: &str) -> NewPatient {
        NewPatient {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
            phone: None,
            date_of_birth: None,
            gender: None,
            address: None,
            medical_history: None,
            allergies: None,
        }
    }

    fn appointment(patient_id: i32, date: &str, time: &str) -> NewAppointment {
        NewAppointment {
            patient_id,
            appointment_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            appointment_time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            status: AppointmentStatus::default(),
            reason: Some("Regular Checkup".to_string()),
            notes: None,
        }
    }

    fn prescription(patient_id: i32) -> NewPrescription {
        NewPrescription {
            patient_id,
            prescription_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            medication: "Amoxicillin".to_string(),
            dosage: Some("500mg".to_string()),
            frequency: Some("3x daily".to_string()),
            duration: Some("7 days".to_string()),
            instructions: None,
        }
    }

    fn lab(patient_id: i32) -> NewLabResult {
        NewLabResult {
            patient_id,
            test_name: "CBC".to_string(),
            test_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            results: None,
            notes: None,
        }
    }

    fn record(patient_id: i32) -> NewMedicalRecord {
        NewMedicalRecord {
            patient_id,
            diagnosis: "Hypertension".to_string(),
            treatment: "Lifestyle changes".to_string(),
            notes: None,
            record_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            follow_up_date: None,
        }
    }

    fn bill(patient_id: i32, amount: f64) -> NewBilling {
        NewBilling {
            patient_id,
            appointment_id: None,
            amount,
            payment_method: "Cash".to_string(),
            notes: None,
        }
    }

    async fn table_counts(store: &MemoryStore) -> (usize, usize, usize, usize, usize, usize) {
        let tables = store.tables.read().await;
        (
            tables.patients.len(),
            tables.appointments.len(),
            tables.prescriptions.len(),
            tables.lab_results.len(),
            tables.medical_records.len(),
            tables.billing.len(),
        )
    }

    #[tokio::test]
    async fn owned_records_are_invisible_across_doctors() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let d2 = ctx(2);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();

        let aid = store.insert_appointment(&d1, &appointment(pid, "2024-06-01", "09:00")).await.unwrap();
        let rid = store.insert_prescription(&d1, &prescription(pid)).await.unwrap();
        let lid = store.insert_lab_result(&d1, &lab(pid)).await.unwrap();
        let mid = store.insert_medical_record(&d1, &record(pid)).await.unwrap();
        let bid = store.insert_billing(&d1, &bill(pid, 50.0)).await.unwrap();

        // Doctor 2 cannot read any of doctor 1's records.
        assert_eq!(store.find_appointment(&d2, aid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(store.find_prescription(&d2, rid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(store.find_lab_result(&d2, lid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(store.find_medical_record(&d2, mid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(store.find_billing(&d2, bid).await.unwrap_err(), ClinicError::NotFoundOrForeign);

        // Nor update or delete them.
        let update = AppointmentUpdate {
            appointment_date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            status: AppointmentStatus::Completed,
            reason: "Follow up".to_string(),
            notes: None,
        };
        assert_eq!(store.update_appointment(&d2, aid, &update).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(store.delete_appointment(&d2, aid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(store.delete_billing(&d2, bid).await.unwrap_err(), ClinicError::NotFoundOrForeign);

        // Doctor 2's listings stay empty; doctor 1 still sees everything.
        assert!(store.list_appointments(&d2).await.unwrap().is_empty());
        assert_eq!(store.list_appointments(&d1).await.unwrap().len(), 1);
        assert_eq!(store.find_appointment(&d1, aid).await.unwrap().patient_name, "Jane Doe");
    }

    #[tokio::test]
    async fn deleting_a_missing_row_never_reports_success() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();
        let aid = store.insert_appointment(&d1, &appointment(pid, "2024-06-01", "09:00")).await.unwrap();

        store.delete_appointment(&d1, aid).await.unwrap();
        let counts = table_counts(&store).await;

        // A second delete of the same id fails and changes nothing.
        assert_eq!(store.delete_appointment(&d1, aid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(table_counts(&store).await, counts);
    }

    #[tokio::test]
    async fn cascade_removes_every_dependent_row() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let d2 = ctx(2);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();
        let other = store.insert_patient(&patient("Bob", "Johnson", "bob@example.com")).await.unwrap();

        let aid = store.insert_appointment(&d1, &appointment(pid, "2024-06-01", "09:00")).await.unwrap();
        store.insert_prescription(&d1, &prescription(pid)).await.unwrap();
        store.insert_lab_result(&d2, &lab(pid)).await.unwrap();
        store.insert_medical_record(&d1, &record(pid)).await.unwrap();
        store.insert_billing(&d2, &bill(pid, 75.0)).await.unwrap();
        // A record for a different patient must survive.
        store.insert_appointment(&d1, &appointment(other, "2024-06-02", "10:00")).await.unwrap();

        let summary = store.delete_patient_cascade(pid).await.unwrap();
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.appointments, 1);
        assert_eq!(summary.billing, 1);

        // Dependents are gone regardless of which doctor owned them.
        assert_eq!(store.find_appointment(&d1, aid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(store.find_patient(pid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(table_counts(&store).await, (1, 1, 0, 0, 0, 0));

        // Deleting the same patient again is a reported failure.
        assert_eq!(store.delete_patient_cascade(pid).await.unwrap_err(), ClinicError::NotFoundOrForeign);
    }

    #[tokio::test]
    async fn failed_cascade_leaves_every_row_in_place() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();
        store.insert_appointment(&d1, &appointment(pid, "2024-06-01", "09:00")).await.unwrap();
        store.insert_prescription(&d1, &prescription(pid)).await.unwrap();
        store.insert_lab_result(&d1, &lab(pid)).await.unwrap();
        store.insert_medical_record(&d1, &record(pid)).await.unwrap();
        store.insert_billing(&d1, &bill(pid, 75.0)).await.unwrap();
        let before = table_counts(&store).await;

        store.inject_cascade_failure();
        let err = store.delete_patient_cascade(pid).await.unwrap_err();
        assert!(matches!(err, ClinicError::Storage(_)));

        // No partial state: everything survives, and the next attempt works.
        assert_eq!(table_counts(&store).await, before);
        let summary = store.delete_patient_cascade(pid).await.unwrap();
        assert_eq!(summary.total(), 5);
    }

    #[tokio::test]
    async fn invalid_billing_amount_writes_nothing() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();

        for amount in [0.0, -5.0, f64::NAN] {
            let err = store.insert_billing(&d1, &bill(pid, amount)).await.unwrap_err();
            assert!(matches!(err, ClinicError::Validation(_)));
        }
        assert!(store.list_billing(&d1).await.unwrap().is_empty());

        store.insert_billing(&d1, &bill(pid, 0.01)).await.unwrap();
        assert_eq!(store.list_billing(&d1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listings_are_most_recent_first() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();

        store.insert_appointment(&d1, &appointment(pid, "2024-06-01", "09:00")).await.unwrap();
        store.insert_appointment(&d1, &appointment(pid, "2024-06-03", "11:30")).await.unwrap();
        store.insert_appointment(&d1, &appointment(pid, "2024-06-03", "08:00")).await.unwrap();

        let rows = store.list_appointments(&d1).await.unwrap();
        let dates: Vec<String> = rows
            .iter()
            .map(|r| format!("{} {}", r.appointment.appointment_date, r.appointment.appointment_time))
            .collect();
        assert_eq!(dates, vec![
            "2024-06-03 11:30:00".to_string(),
            "2024-06-03 08:00:00".to_string(),
            "2024-06-01 09:00:00".to_string(),
        ]);
    }

    #[tokio::test]
    async fn dashboard_and_profile_aggregates_are_owner_scoped() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let d2 = ctx(2);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();

        store.insert_prescription(&d1, &prescription(pid)).await.unwrap();
        store.insert_prescription(&d2, &prescription(pid)).await.unwrap();
        store.insert_lab_result(&d1, &lab(pid)).await.unwrap();
        store.insert_appointment(&d1, &appointment(pid, "2024-06-01", "09:00")).await.unwrap();

        let summary = store.dashboard_summary(&d1).await.unwrap();
        assert_eq!(summary.active_prescriptions, 1);
        assert_eq!(summary.lab_results, 1);
        assert_eq!(summary.total_patients, 1);
        assert_eq!(summary.recent_appointments.len(), 1);

        let stats = store.profile_stats(&d1).await.unwrap();
        assert_eq!(stats.total_appointments, 1);
        assert_eq!(stats.distinct_patients, 1);
        assert_eq!(stats.total_prescriptions, 1);

        let stats2 = store.profile_stats(&d2).await.unwrap();
        assert_eq!(stats2.total_appointments, 0);
        assert_eq!(stats2.total_prescriptions, 1);
    }

    #[tokio::test]
    async fn billing_summary_buckets_by_payment_status() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();

        let paid = store.insert_billing(&d1, &bill(pid, 100.0)).await.unwrap();
        store.insert_billing(&d1, &bill(pid, 40.0)).await.unwrap();
        let cancelled = store.insert_billing(&d1, &bill(pid, 25.0)).await.unwrap();

        let update = BillingUpdate {
            amount: 100.0,
            payment_method: "Cash".to_string(),
            payment_status: PaymentStatus::Paid,
            payment_date: Some(now().date_naive()),
            notes: None,
        };
        store.update_billing(&d1, paid, &update).await.unwrap();
        let update = BillingUpdate {
            amount: 25.0,
            payment_method: "Cash".to_string(),
            payment_status: PaymentStatus::Cancelled,
            payment_date: None,
            notes: None,
        };
        store.update_billing(&d1, cancelled, &update).await.unwrap();

        let summary = store.billing_summary(&d1).await.unwrap();
        assert_eq!(summary.total_revenue, 165.0);
        assert_eq!(summary.pending_amount, 40.0);
        assert_eq!(summary.today_collections, 100.0);
    }

    #[tokio::test]
    async fn wipe_clears_every_table() {
        let store = MemoryStore::new();
        let d1 = ctx(1);
        let pid = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();
        store.insert_appointment(&d1, &appointment(pid, "2024-06-01", "09:00")).await.unwrap();
        store.insert_billing(&d1, &bill(pid, 10.0)).await.unwrap();

        store.wipe().await.unwrap();
        assert_eq!(table_counts(&store).await, (0, 0, 0, 0, 0, 0));
    }

    #[tokio::test]
    async fn two_doctor_scenario_end_to_end() {
        // Doctor A creates a patient and an appointment; doctor B cannot
        // touch it; after the cascade nothing is left, even for doctor A.
        let store = MemoryStore::new();
        let doctor_a = ctx(1);
        let doctor_b = ctx(2);

        let jane = store.insert_patient(&patient("Jane", "Doe", "jane@example.com")).await.unwrap();
        let aid = store
            .insert_appointment(&doctor_a, &appointment(jane, "2024-06-01", "09:00"))
            .await
            .unwrap();
        assert_eq!(
            store.find_appointment(&doctor_a, aid).await.unwrap().appointment.status,
            AppointmentStatus::Scheduled
        );

        assert_eq!(
            store.find_appointment(&doctor_b, aid).await.unwrap_err(),
            ClinicError::NotFoundOrForeign
        );

        store.insert_billing(&doctor_a, &bill(jane, 120.0)).await.unwrap();
        store.insert_lab_result(&doctor_a, &lab(jane)).await.unwrap();
        store.insert_prescription(&doctor_a, &prescription(jane)).await.unwrap();

        store.delete_patient_cascade(jane).await.unwrap();
        assert_eq!(
            store.find_appointment(&doctor_a, aid).await.unwrap_err(),
            ClinicError::NotFoundOrForeign
        );
        assert!(store.list_billing(&doctor_a).await.unwrap().is_empty());
        assert!(store.list_lab_results(&doctor_a).await.unwrap().is_empty());
        assert!(store.list_prescriptions(&doctor_a).await.unwrap().is_empty());
    }
}
