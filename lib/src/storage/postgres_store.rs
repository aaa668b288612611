// lib/src/storage/postgres_store.rs
//! PostgreSQL backend. Every statement is parameterized; every owned-entity
//! statement carries the ownership predicate in its own WHERE clause. The
//! patient cascade is the one multi-statement transaction in the system.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row};

use models::errors::{ClinicError, ClinicResult};
use models::{
    Appointment, AppointmentStatus, AppointmentUpdate, Billing, BillingUpdate, ClinicType, Doctor,
    DoctorProfileUpdate, DoctorStatus, Gender, LabResult, LabResultUpdate, LabStatus,
    MedicalRecord, MedicalRecordUpdate, NewAppointment, NewBilling, NewDoctor, NewLabResult,
    NewMedicalRecord, NewPatient, NewPrescription, Patient, PatientUpdate, PaymentStatus,
    Prescription, PrescriptionStatus, RecordStatus,
};

use crate::auth::AuthContext;
use crate::storage::{
    AppointmentRow, BillingRow, BillingSummary, CascadeSummary, ClinicStore, DashboardSummary,
    LabResultRow, MedicalRecordRow, PrescriptionRow, ProfileStats,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS doctors (
    id              SERIAL PRIMARY KEY,
    first_name      VARCHAR(100) NOT NULL,
    last_name       VARCHAR(100) NOT NULL,
    email           VARCHAR(255) NOT NULL UNIQUE,
    password_hash   VARCHAR(255) NOT NULL,
    clinic_name     VARCHAR(255),
    clinic_type     VARCHAR(20),
    phone           VARCHAR(20),
    specialization  VARCHAR(100),
    remember_token  VARCHAR(100),
    token_expires   TIMESTAMPTZ,
    last_login      TIMESTAMPTZ,
    status          VARCHAR(20) NOT NULL DEFAULT 'active',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS patients (
    id              SERIAL PRIMARY KEY,
    first_name      VARCHAR(100) NOT NULL,
    last_name       VARCHAR(100) NOT NULL,
    email           VARCHAR(255) NOT NULL UNIQUE,
    phone           VARCHAR(20),
    date_of_birth   DATE,
    gender          VARCHAR(10),
    address         TEXT,
    medical_history TEXT,
    allergies       TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS appointments (
    id               SERIAL PRIMARY KEY,
    doctor_id        INT NOT NULL REFERENCES doctors(id),
    patient_id       INT NOT NULL REFERENCES patients(id),
    appointment_date DATE NOT NULL,
    appointment_time TIME NOT NULL,
    status           VARCHAR(20) NOT NULL DEFAULT 'Scheduled',
    reason           TEXT,
    notes            TEXT,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS prescriptions (
    id                SERIAL PRIMARY KEY,
    doctor_id         INT NOT NULL REFERENCES doctors(id),
    patient_id        INT NOT NULL REFERENCES patients(id),
    prescription_date DATE NOT NULL,
    medication        TEXT NOT NULL,
    dosage            VARCHAR(100),
    frequency         VARCHAR(100),
    duration          VARCHAR(100),
    instructions      TEXT,
    status            VARCHAR(20) NOT NULL DEFAULT 'Active',
    created_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at        TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS lab_results (
    id         SERIAL PRIMARY KEY,
    doctor_id  INT NOT NULL REFERENCES doctors(id),
    patient_id INT NOT NULL REFERENCES patients(id),
    test_name  VARCHAR(100) NOT NULL,
    test_date  DATE NOT NULL,
    results    TEXT,
    notes      TEXT,
    status     VARCHAR(20) NOT NULL DEFAULT 'Pending',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS medical_records (
    id             SERIAL PRIMARY KEY,
    doctor_id      INT NOT NULL REFERENCES doctors(id),
    patient_id     INT NOT NULL REFERENCES patients(id),
    diagnosis      TEXT NOT NULL,
    treatment      TEXT NOT NULL,
    notes          TEXT,
    record_date    DATE NOT NULL,
    follow_up_date DATE,
    status         VARCHAR(20) NOT NULL DEFAULT 'Active',
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS billing (
    id             SERIAL PRIMARY KEY,
    doctor_id      INT NOT NULL REFERENCES doctors(id),
    patient_id     INT NOT NULL REFERENCES patients(id),
    appointment_id INT REFERENCES appointments(id) ON DELETE SET NULL,
    amount         DOUBLE PRECISION NOT NULL,
    payment_method VARCHAR(50) NOT NULL,
    payment_status VARCHAR(20) NOT NULL DEFAULT 'Pending',
    payment_date   DATE,
    notes          TEXT,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_doctors_email ON doctors(email);
CREATE INDEX IF NOT EXISTS idx_patients_email ON patients(email);
CREATE INDEX IF NOT EXISTS idx_appointments_owner ON appointments(doctor_id, appointment_date);
CREATE INDEX IF NOT EXISTS idx_prescriptions_owner ON prescriptions(doctor_id, prescription_date);
CREATE INDEX IF NOT EXISTS idx_lab_results_owner ON lab_results(doctor_id, test_date);
CREATE INDEX IF NOT EXISTS idx_medical_records_owner ON medical_records(doctor_id, record_date);
CREATE INDEX IF NOT EXISTS idx_billing_owner ON billing(doctor_id, created_at);
";

pub struct PostgresStore {
    client: Arc<Mutex<Client>>,
}

impl PostgresStore {
    pub async fn connect(connection_string: &str) -> ClinicResult<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| ClinicError::Storage(format!("failed to connect to Postgres: {}", e)))?;
        // The connection object drives the socket; it runs until the client
        // is dropped.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Postgres connection error: {}", e);
            }
        });
        info!("Connected to Postgres");
        Ok(PostgresStore { client: Arc::new(Mutex::new(client)) })
    }
}

fn storage_err(e: tokio_postgres::Error) -> ClinicError {
    ClinicError::Storage(e.to_string())
}

fn column<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, idx: usize) -> ClinicResult<T> {
    row.try_get(idx).map_err(storage_err)
}

const DOCTOR_COLUMNS: &str = "id, first_name, last_name, email, password_hash, clinic_name, \
     clinic_type, phone, specialization, remember_token, token_expires, last_login, status, \
     created_at, updated_at";

fn doctor_from_row(row: &Row) -> ClinicResult<Doctor> {
    let clinic_type: Option<String> = column(row, 6)?;
    let status: String = column(row, 12)?;
    Ok(Doctor {
        id: column(row, 0)?,
        first_name: column(row, 1)?,
        last_name: column(row, 2)?,
        email: column(row, 3)?,
        password_hash: column(row, 4)?,
        clinic_name: column(row, 5)?,
        clinic_type: clinic_type
            .map(|t| ClinicType::parse(&t))
            .transpose()
            .map_err(|e| ClinicError::Storage(e.to_string()))?,
        phone: column(row, 7)?,
        specialization: column(row, 8)?,
        remember_token: column(row, 9)?,
        token_expires: column(row, 10)?,
        last_login: column(row, 11)?,
        status: DoctorStatus::parse(&status).map_err(|e| ClinicError::Storage(e.to_string()))?,
        created_at: column(row, 13)?,
        updated_at: column(row, 14)?,
    })
}

fn patient_from_row(row: &Row) -> ClinicResult<Patient> {
    let gender: Option<String> = column(row, 6)?;
    Ok(Patient {
        id: column(row, 0)?,
        first_name: column(row, 1)?,
        last_name: column(row, 2)?,
        email: column(row, 3)?,
        phone: column(row, 4)?,
        date_of_birth: column(row, 5)?,
        gender: gender
            .map(|g| Gender::parse(&g))
            .transpose()
            .map_err(|e| ClinicError::Storage(e.to_string()))?,
        address: column(row, 7)?,
        medical_history: column(row, 8)?,
        allergies: column(row, 9)?,
        created_at: column(row, 10)?,
        updated_at: column(row, 11)?,
    })
}

// Shared by list/find/dashboard queries; the two trailing columns are the
// joined patient name.
const APPOINTMENT_SELECT: &str = "SELECT a.id, a.doctor_id, a.patient_id, a.appointment_date, \
     a.appointment_time, a.status, a.reason, a.notes, a.created_at, a.updated_at, \
     p.first_name, p.last_name \
     FROM appointments a JOIN patients p ON a.patient_id = p.id";

fn appointment_row(row: &Row) -> ClinicResult<AppointmentRow> {
    let status: String = column(row, 5)?;
    let first: String = column(row, 10)?;
    let last: String = column(row, 11)?;
    Ok(AppointmentRow {
        appointment: Appointment {
            id: column(row, 0)?,
            doctor_id: column(row, 1)?,
            patient_id: column(row, 2)?,
            appointment_date: column(row, 3)?,
            appointment_time: column(row, 4)?,
            status: AppointmentStatus::parse(&status)
                .map_err(|e| ClinicError::Storage(e.to_string()))?,
            reason: column(row, 6)?,
            notes: column(row, 7)?,
            created_at: column(row, 8)?,
            updated_at: column(row, 9)?,
        },
        patient_name: format!("{} {}", first, last),
    })
}

const PRESCRIPTION_SELECT: &str = "SELECT r.id, r.doctor_id, r.patient_id, r.prescription_date, \
     r.medication, r.dosage, r.frequency, r.duration, r.instructions, r.status, r.created_at, \
     r.updated_at, p.first_name, p.last_name \
     FROM prescriptions r JOIN patients p ON r.patient_id = p.id";

fn prescription_row(row: &Row) -> ClinicResult<PrescriptionRow> {
    let status: String = column(row, 9)?;
    let first: String = column(row, 12)?;
    let last: String = column(row, 13)?;
    Ok(PrescriptionRow {
        prescription: Prescription {
            id: column(row, 0)?,
            doctor_id: column(row, 1)?,
            patient_id: column(row, 2)?,
            prescription_date: column(row, 3)?,
            medication: column(row, 4)?,
            dosage: column(row, 5)?,
            frequency: column(row, 6)?,
            duration: column(row, 7)?,
            instructions: column(row, 8)?,
            status: PrescriptionStatus::parse(&status)
                .map_err(|e| ClinicError::Storage(e.to_string()))?,
            created_at: column(row, 10)?,
            updated_at: column(row, 11)?,
        },
        patient_name: format!("{} {}", first, last),
    })
}

const LAB_RESULT_SELECT: &str = "SELECT l.id, l.doctor_id, l.patient_id, l.test_name, \
     l.test_date, l.results, l.notes, l.status, l.created_at, l.updated_at, \
     p.first_name, p.last_name \
     FROM lab_results l JOIN patients p ON l.patient_id = p.id";

fn lab_result_row(row: &Row) -> ClinicResult<LabResultRow> {
    let status: String = column(row, 7)?;
    let first: String = column(row, 10)?;
    let last: String = column(row, 11)?;
    Ok(LabResultRow {
        lab_result: LabResult {
            id: column(row, 0)?,
            doctor_id: column(row, 1)?,
            patient_id: column(row, 2)?,
            test_name: column(row, 3)?,
            test_date: column(row, 4)?,
            results: column(row, 5)?,
            notes: column(row, 6)?,
            status: LabStatus::parse(&status).map_err(|e| ClinicError::Storage(e.to_string()))?,
            created_at: column(row, 8)?,
            updated_at: column(row, 9)?,
        },
        patient_name: format!("{} {}", first, last),
    })
}

const MEDICAL_RECORD_SELECT: &str = "SELECT m.id, m.doctor_id, m.patient_id, m.diagnosis, \
     m.treatment, m.notes, m.record_date, m.follow_up_date, m.status, m.created_at, m.updated_at, \
     p.first_name, p.last_name \
     FROM medical_records m JOIN patients p ON m.patient_id = p.id";

fn medical_record_row(row: &Row) -> ClinicResult<MedicalRecordRow> {
    let status: String = column(row, 8)?;
    let first: String = column(row, 11)?;
    let last: String = column(row, 12)?;
    Ok(MedicalRecordRow {
        record: MedicalRecord {
            id: column(row, 0)?,
            doctor_id: column(row, 1)?,
            patient_id: column(row, 2)?,
            diagnosis: column(row, 3)?,
            treatment: column(row, 4)?,
            notes: column(row, 5)?,
            record_date: column(row, 6)?,
            follow_up_date: column(row, 7)?,
            status: RecordStatus::parse(&status).map_err(|e| ClinicError::Storage(e.to_string()))?,
            created_at: column(row, 9)?,
            updated_at: column(row, 10)?,
        },
        patient_name: format!("{} {}", first, last),
    })
}

const BILLING_SELECT: &str = "SELECT b.id, b.doctor_id, b.patient_id, b.appointment_id, \
     b.amount, b.payment_method, b.payment_status, b.payment_date, b.notes, b.created_at, \
     b.updated_at, p.first_name, p.last_name, a.appointment_time \
     FROM billing b JOIN patients p ON b.patient_id = p.id \
     LEFT JOIN appointments a ON b.appointment_id = a.id";

fn billing_row(row: &Row) -> ClinicResult<BillingRow> {
    let status: String = column(row, 6)?;
    let first: String = column(row, 11)?;
    let last: String = column(row, 12)?;
    Ok(BillingRow {
        billing: Billing {
            id: column(row, 0)?,
            doctor_id: column(row, 1)?,
            patient_id: column(row, 2)?,
            appointment_id: column(row, 3)?,
            amount: column(row, 4)?,
            payment_method: column(row, 5)?,
            payment_status: PaymentStatus::parse(&status)
                .map_err(|e| ClinicError::Storage(e.to_string()))?,
            payment_date: column(row, 7)?,
            notes: column(row, 8)?,
            created_at: column(row, 9)?,
            updated_at: column(row, 10)?,
        },
        patient_name: format!("{} {}", first, last),
        appointment_time: column(row, 13)?,
    })
}

#[async_trait]
impl ClinicStore for PostgresStore {
    async fn init_schema(&self) -> ClinicResult<()> {
        let client = self.client.lock().await;
        client.batch_execute(SCHEMA).await.map_err(storage_err)?;
        info!("Schema initialized");
        Ok(())
    }

    async fn wipe(&self) -> ClinicResult<()> {
        let client = self.client.lock().await;
        // Dependents before the tables they reference.
        client
            .batch_execute(
                "DELETE FROM billing; DELETE FROM appointments; DELETE FROM lab_results; \
                 DELETE FROM medical_records; DELETE FROM prescriptions; \
                 DELETE FROM patients; DELETE FROM doctors;",
            )
            .await
            .map_err(storage_err)?;
        info!("All tables wiped");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Doctors
    // ------------------------------------------------------------------

    async fn insert_doctor(&self, new: &NewDoctor, password_hash: &str) -> ClinicResult<i32> {
        let client = self.client.lock().await;
        let clinic_type = new.clinic_type.map(|t| t.as_str());
        let row = client
            .query_one(
                "INSERT INTO doctors (first_name, last_name, email, password_hash, phone, \
                 specialization, clinic_name, clinic_type) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
                &[
                    &new.first_name,
                    &new.last_name,
                    &new.email,
                    &password_hash,
                    &new.phone,
                    &new.specialization,
                    &new.clinic_name,
                    &clinic_type,
                ],
            )
            .await
            .map_err(storage_err)?;
        column(&row, 0)
    }

    async fn find_doctor(&self, id: i32) -> ClinicResult<Option<Doctor>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("SELECT {} FROM doctors WHERE id = $1", DOCTOR_COLUMNS),
                &[&id],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(doctor_from_row).transpose()
    }

    async fn find_doctor_by_email(&self, email: &str) -> ClinicResult<Option<Doctor>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("SELECT {} FROM doctors WHERE email = $1", DOCTOR_COLUMNS),
                &[&email],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(doctor_from_row).transpose()
    }

    async fn update_doctor_profile(&self, id: i32, update: &DoctorProfileUpdate) -> ClinicResult<()> {
        let client = self.client.lock().await;
        let clinic_type = update.clinic_type.map(|t| t.as_str());
        let affected = client
            .execute(
                "UPDATE doctors SET first_name = $1, last_name = $2, phone = $3, \
                 specialization = $4, clinic_name = $5, clinic_type = $6, updated_at = now() \
                 WHERE id = $7",
                &[
                    &update.first_name,
                    &update.last_name,
                    &update.phone,
                    &update.specialization,
                    &update.clinic_name,
                    &clinic_type,
                    &id,
                ],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: i32) -> ClinicResult<()> {
        let client = self.client.lock().await;
        client
            .execute("UPDATE doctors SET last_login = now() WHERE id = $1", &[&id])
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn set_remember_token(
        &self,
        id: i32,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> ClinicResult<()> {
        let client = self.client.lock().await;
        client
            .execute(
                "UPDATE doctors SET remember_token = $1, token_expires = $2 WHERE id = $3",
                &[&token_hash, &expires, &id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn find_doctor_by_remember_token(&self, token_hash: &str) -> ClinicResult<Option<Doctor>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM doctors WHERE remember_token = $1 AND token_expires > now()",
                    DOCTOR_COLUMNS
                ),
                &[&token_hash],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(doctor_from_row).transpose()
    }

    async fn clear_remember_token(&self, id: i32) -> ClinicResult<()> {
        let client = self.client.lock().await;
        client
            .execute(
                "UPDATE doctors SET remember_token = NULL, token_expires = NULL WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    async fn insert_patient(&self, new: &NewPatient) -> ClinicResult<i32> {
        let client = self.client.lock().await;
        let gender = new.gender.map(|g| g.as_str());
        let row = client
            .query_one(
                "INSERT INTO patients (first_name, last_name, email, phone, date_of_birth, \
                 gender, address, medical_history, allergies) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
                &[
                    &new.first_name,
                    &new.last_name,
                    &new.email,
                    &new.phone,
                    &new.date_of_birth,
                    &gender,
                    &new.address,
                    &new.medical_history,
                    &new.allergies,
                ],
            )
            .await
            .map_err(storage_err)?;
        column(&row, 0)
    }

    async fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT id, first_name, last_name, email, phone, date_of_birth, gender, address, \
                 medical_history, allergies, created_at, updated_at \
                 FROM patients ORDER BY first_name, last_name",
                &[],
            )
            .await
            .map_err(storage_err)?;
        rows.iter().map(patient_from_row).collect()
    }

    async fn find_patient(&self, id: i32) -> ClinicResult<Patient> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT id, first_name, last_name, email, phone, date_of_birth, gender, address, \
                 medical_history, allergies, created_at, updated_at \
                 FROM patients WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(patient_from_row).transpose()?.ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_patient(&self, id: i32, update: &PatientUpdate) -> ClinicResult<()> {
        let client = self.client.lock().await;
        let gender = update.gender.map(|g| g.as_str());
        let affected = client
            .execute(
                "UPDATE patients SET first_name = $1, last_name = $2, email = $3, phone = $4, \
                 date_of_birth = $5, gender = $6, address = $7, medical_history = $8, \
                 allergies = $9, updated_at = now() WHERE id = $10",
                &[
                    &update.first_name,
                    &update.last_name,
                    &update.email,
                    &update.phone,
                    &update.date_of_birth,
                    &gender,
                    &update.address,
                    &update.medical_history,
                    &update.allergies,
                    &id,
                ],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    async fn delete_patient_cascade(&self, id: i32) -> ClinicResult<CascadeSummary> {
        let mut client = self.client.lock().await;
        // Dropping the transaction without commit rolls everything back, so
        // any early return below leaves the store untouched.
        let tx = client.transaction().await.map_err(storage_err)?;

        let mut summary = CascadeSummary::default();
        summary.prescriptions = tx
            .execute("DELETE FROM prescriptions WHERE patient_id = $1", &[&id])
            .await
            .map_err(storage_err)?;
        summary.lab_results = tx
            .execute("DELETE FROM lab_results WHERE patient_id = $1", &[&id])
            .await
            .map_err(storage_err)?;
        summary.medical_records = tx
            .execute("DELETE FROM medical_records WHERE patient_id = $1", &[&id])
            .await
            .map_err(storage_err)?;
        summary.billing = tx
            .execute("DELETE FROM billing WHERE patient_id = $1", &[&id])
            .await
            .map_err(storage_err)?;
        summary.appointments = tx
            .execute("DELETE FROM appointments WHERE patient_id = $1", &[&id])
            .await
            .map_err(storage_err)?;

        let patients = tx
            .execute("DELETE FROM patients WHERE id = $1", &[&id])
            .await
            .map_err(storage_err)?;
        if patients == 0 {
            tx.rollback().await.map_err(storage_err)?;
            return Err(ClinicError::NotFoundOrForeign);
        }

        tx.commit().await.map_err(storage_err)?;
        info!("Deleted patient {} and {} dependent rows", id, summary.total());
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Appointments
    // ------------------------------------------------------------------

    async fn insert_appointment(&self, ctx: &AuthContext, new: &NewAppointment) -> ClinicResult<i32> {
        new.validate()?;
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO appointments (doctor_id, patient_id, appointment_date, \
                 appointment_time, status, reason, notes) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
                &[
                    &ctx.doctor_id,
                    &new.patient_id,
                    &new.appointment_date,
                    &new.appointment_time,
                    &new.status.as_str(),
                    &new.reason,
                    &new.notes,
                ],
            )
            .await
            .map_err(storage_err)?;
        column(&row, 0)
    }

    async fn list_appointments(&self, ctx: &AuthContext) -> ClinicResult<Vec<AppointmentRow>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!(
                    "{} WHERE a.doctor_id = $1 \
                     ORDER BY a.appointment_date DESC, a.appointment_time DESC",
                    APPOINTMENT_SELECT
                ),
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.iter().map(appointment_row).collect()
    }

    async fn find_appointment(&self, ctx: &AuthContext, id: i32) -> ClinicResult<AppointmentRow> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("{} WHERE a.id = $1 AND a.doctor_id = $2", APPOINTMENT_SELECT),
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(appointment_row).transpose()?.ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_appointment(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &AppointmentUpdate,
    ) -> ClinicResult<()> {
        update.validate()?;
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "UPDATE appointments SET appointment_date = $1, appointment_time = $2, \
                 status = $3, reason = $4, notes = $5, updated_at = now() \
                 WHERE id = $6 AND doctor_id = $7",
                &[
                    &update.appointment_date,
                    &update.appointment_time,
                    &update.status.as_str(),
                    &update.reason,
                    &update.notes,
                    &id,
                    &ctx.doctor_id,
                ],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    async fn delete_appointment(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "DELETE FROM appointments WHERE id = $1 AND doctor_id = $2",
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Prescriptions
    // ------------------------------------------------------------------

    async fn insert_prescription(&self, ctx: &AuthContext, new: &NewPrescription) -> ClinicResult<i32> {
        new.validate()?;
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO prescriptions (doctor_id, patient_id, prescription_date, medication, \
                 dosage, frequency, duration, instructions, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Active') RETURNING id",
                &[
                    &ctx.doctor_id,
                    &new.patient_id,
                    &new.prescription_date,
                    &new.medication,
                    &new.dosage,
                    &new.frequency,
                    &new.duration,
                    &new.instructions,
                ],
            )
            .await
            .map_err(storage_err)?;
        column(&row, 0)
    }

    async fn list_prescriptions(&self, ctx: &AuthContext) -> ClinicResult<Vec<PrescriptionRow>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!(
                    "{} WHERE r.doctor_id = $1 ORDER BY r.prescription_date DESC, r.id DESC",
                    PRESCRIPTION_SELECT
                ),
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.iter().map(prescription_row).collect()
    }

    async fn find_prescription(&self, ctx: &AuthContext, id: i32) -> ClinicResult<PrescriptionRow> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("{} WHERE r.id = $1 AND r.doctor_id = $2", PRESCRIPTION_SELECT),
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(prescription_row).transpose()?.ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn delete_prescription(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "DELETE FROM prescriptions WHERE id = $1 AND doctor_id = $2",
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lab results
    // ------------------------------------------------------------------

    async fn insert_lab_result(&self, ctx: &AuthContext, new: &NewLabResult) -> ClinicResult<i32> {
        new.validate()?;
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO lab_results (doctor_id, patient_id, test_name, test_date, results, \
                 notes, status) VALUES ($1, $2, $3, $4, $5, $6, 'Pending') RETURNING id",
                &[
                    &ctx.doctor_id,
                    &new.patient_id,
                    &new.test_name,
                    &new.test_date,
                    &new.results,
                    &new.notes,
                ],
            )
            .await
            .map_err(storage_err)?;
        column(&row, 0)
    }

    async fn list_lab_results(&self, ctx: &AuthContext) -> ClinicResult<Vec<LabResultRow>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!(
                    "{} WHERE l.doctor_id = $1 ORDER BY l.test_date DESC, l.id DESC",
                    LAB_RESULT_SELECT
                ),
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.iter().map(lab_result_row).collect()
    }

    async fn find_lab_result(&self, ctx: &AuthContext, id: i32) -> ClinicResult<LabResultRow> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("{} WHERE l.id = $1 AND l.doctor_id = $2", LAB_RESULT_SELECT),
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(lab_result_row).transpose()?.ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_lab_result(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &LabResultUpdate,
    ) -> ClinicResult<()> {
        update.validate()?;
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "UPDATE lab_results SET test_name = $1, test_date = $2, results = $3, notes = $4, \
                 status = $5, updated_at = now() WHERE id = $6 AND doctor_id = $7",
                &[
                    &update.test_name,
                    &update.test_date,
                    &update.results,
                    &update.notes,
                    &update.status.as_str(),
                    &id,
                    &ctx.doctor_id,
                ],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    async fn delete_lab_result(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "DELETE FROM lab_results WHERE id = $1 AND doctor_id = $2",
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
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
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO medical_records (doctor_id, patient_id, diagnosis, treatment, notes, \
                 record_date, follow_up_date, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, 'Active') RETURNING id",
                &[
                    &ctx.doctor_id,
                    &new.patient_id,
                    &new.diagnosis,
                    &new.treatment,
                    &new.notes,
                    &new.record_date,
                    &new.follow_up_date,
                ],
            )
            .await
            .map_err(storage_err)?;
        column(&row, 0)
    }

    async fn list_medical_records(&self, ctx: &AuthContext) -> ClinicResult<Vec<MedicalRecordRow>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!(
                    "{} WHERE m.doctor_id = $1 ORDER BY m.record_date DESC, m.id DESC",
                    MEDICAL_RECORD_SELECT
                ),
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.iter().map(medical_record_row).collect()
    }

    async fn find_medical_record(&self, ctx: &AuthContext, id: i32) -> ClinicResult<MedicalRecordRow> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("{} WHERE m.id = $1 AND m.doctor_id = $2", MEDICAL_RECORD_SELECT),
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(medical_record_row).transpose()?.ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_medical_record(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &MedicalRecordUpdate,
    ) -> ClinicResult<()> {
        update.validate()?;
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "UPDATE medical_records SET diagnosis = $1, treatment = $2, notes = $3, \
                 record_date = $4, follow_up_date = $5, status = $6, updated_at = now() \
                 WHERE id = $7 AND doctor_id = $8",
                &[
                    &update.diagnosis,
                    &update.treatment,
                    &update.notes,
                    &update.record_date,
                    &update.follow_up_date,
                    &update.status.as_str(),
                    &id,
                    &ctx.doctor_id,
                ],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    async fn delete_medical_record(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "DELETE FROM medical_records WHERE id = $1 AND doctor_id = $2",
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Billing
    // ------------------------------------------------------------------

    async fn insert_billing(&self, ctx: &AuthContext, new: &NewBilling) -> ClinicResult<i32> {
        new.validate()?;
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO billing (doctor_id, patient_id, appointment_id, amount, \
                 payment_method, payment_status, notes) \
                 VALUES ($1, $2, $3, $4, $5, 'Pending', $6) RETURNING id",
                &[
                    &ctx.doctor_id,
                    &new.patient_id,
                    &new.appointment_id,
                    &new.amount,
                    &new.payment_method,
                    &new.notes,
                ],
            )
            .await
            .map_err(storage_err)?;
        column(&row, 0)
    }

    async fn list_billing(&self, ctx: &AuthContext) -> ClinicResult<Vec<BillingRow>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("{} WHERE b.doctor_id = $1 ORDER BY b.created_at DESC", BILLING_SELECT),
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.iter().map(billing_row).collect()
    }

    async fn find_billing(&self, ctx: &AuthContext, id: i32) -> ClinicResult<BillingRow> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("{} WHERE b.id = $1 AND b.doctor_id = $2", BILLING_SELECT),
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        rows.first().map(billing_row).transpose()?.ok_or(ClinicError::NotFoundOrForeign)
    }

    async fn update_billing(
        &self,
        ctx: &AuthContext,
        id: i32,
        update: &BillingUpdate,
    ) -> ClinicResult<()> {
        update.validate()?;
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "UPDATE billing SET amount = $1, payment_method = $2, payment_status = $3, \
                 payment_date = $4, notes = $5, updated_at = now() \
                 WHERE id = $6 AND doctor_id = $7",
                &[
                    &update.amount,
                    &update.payment_method,
                    &update.payment_status.as_str(),
                    &update.payment_date,
                    &update.notes,
                    &id,
                    &ctx.doctor_id,
                ],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    async fn delete_billing(&self, ctx: &AuthContext, id: i32) -> ClinicResult<()> {
        let client = self.client.lock().await;
        let affected = client
            .execute(
                "DELETE FROM billing WHERE id = $1 AND doctor_id = $2",
                &[&id, &ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        if affected == 0 {
            return Err(ClinicError::NotFoundOrForeign);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    async fn dashboard_summary(&self, ctx: &AuthContext) -> ClinicResult<DashboardSummary> {
        let client = self.client.lock().await;

        let today: i64 = column(
            &client
                .query_one(
                    "SELECT COUNT(*) FROM appointments \
                     WHERE doctor_id = $1 AND appointment_date = CURRENT_DATE",
                    &[&ctx.doctor_id],
                )
                .await
                .map_err(storage_err)?,
            0,
        )?;
        let patients: i64 = column(
            &client
                .query_one("SELECT COUNT(*) FROM patients", &[])
                .await
                .map_err(storage_err)?,
            0,
        )?;
        let active_rx: i64 = column(
            &client
                .query_one(
                    "SELECT COUNT(*) FROM prescriptions WHERE doctor_id = $1 AND status = 'Active'",
                    &[&ctx.doctor_id],
                )
                .await
                .map_err(storage_err)?,
            0,
        )?;
        let labs: i64 = column(
            &client
                .query_one(
                    "SELECT COUNT(*) FROM lab_results WHERE doctor_id = $1",
                    &[&ctx.doctor_id],
                )
                .await
                .map_err(storage_err)?,
            0,
        )?;
        let recent = client
            .query(
                &format!(
                    "{} WHERE a.doctor_id = $1 \
                     ORDER BY a.appointment_date DESC, a.appointment_time DESC LIMIT 5",
                    APPOINTMENT_SELECT
                ),
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?
            .iter()
            .map(appointment_row)
            .collect::<ClinicResult<Vec<_>>>()?;

        Ok(DashboardSummary {
            today_appointments: today,
            total_patients: patients,
            active_prescriptions: active_rx,
            lab_results: labs,
            recent_appointments: recent,
        })
    }

    async fn billing_summary(&self, ctx: &AuthContext) -> ClinicResult<BillingSummary> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "SELECT COALESCE(SUM(amount), 0)::float8, \
                 COALESCE(SUM(CASE WHEN payment_status = 'Pending' THEN amount ELSE 0 END), 0)::float8, \
                 COALESCE(SUM(CASE WHEN payment_status = 'Paid' AND ( \
                     payment_date = CURRENT_DATE OR \
                     (payment_date IS NULL AND created_at::date = CURRENT_DATE) \
                 ) THEN amount ELSE 0 END), 0)::float8 \
                 FROM billing WHERE doctor_id = $1",
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(BillingSummary {
            total_revenue: column(&row, 0)?,
            pending_amount: column(&row, 1)?,
            today_collections: column(&row, 2)?,
        })
    }

    async fn profile_stats(&self, ctx: &AuthContext) -> ClinicResult<ProfileStats> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "SELECT \
                 (SELECT COUNT(*) FROM appointments WHERE doctor_id = $1), \
                 (SELECT COUNT(DISTINCT patient_id) FROM appointments WHERE doctor_id = $1), \
                 (SELECT COUNT(*) FROM prescriptions WHERE doctor_id = $1)",
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?;
        let recent = client
            .query(
                &format!(
                    "{} WHERE r.doctor_id = $1 ORDER BY r.prescription_date DESC, r.id DESC LIMIT 5",
                    PRESCRIPTION_SELECT
                ),
                &[&ctx.doctor_id],
            )
            .await
            .map_err(storage_err)?
            .iter()
            .map(prescription_row)
            .collect::<ClinicResult<Vec<_>>>()?;

        Ok(ProfileStats {
            total_appointments: column(&row, 0)?,
            distinct_patients: column(&row, 1)?,
            total_prescriptions: column(&row, 2)?,
            recent_prescriptions: recent,
        })
    }
}
