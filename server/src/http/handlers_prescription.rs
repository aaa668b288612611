// server/src/http/handlers_prescription.rs
//! Prescriptions: created, viewed, and deleted. Edits are not part of the
//! clinical workflow; a wrong prescription is cancelled and rewritten.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::NaiveDate;
use serde::Deserialize;

use clinic::session::Flash;
use clinic::storage::{ClinicStore, PrescriptionRow};
use models::errors::{ValidationError, ValidationResult};
use models::NewPrescription;

use crate::http::render::{esc, page};
use crate::http::{
    error_redirect, flash_redirect, parse_id, require_login, user_message, SharedState,
};

#[derive(Debug, Deserialize)]
pub struct PrescriptionForm {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub prescription_date: String,
    #[serde(default)]
    pub medication: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl PrescriptionForm {
    fn into_new(self) -> ValidationResult<NewPrescription> {
        let prescription = NewPrescription {
            patient_id: self
                .patient_id
                .trim()
                .parse()
                .map_err(|_| ValidationError::missing("patient_id"))?,
            prescription_date: NaiveDate::parse_from_str(self.prescription_date.trim(), "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidDateFormat(self.prescription_date.clone()))?,
            medication: self.medication.trim().to_string(),
            dosage: non_empty(self.dosage),
            frequency: non_empty(self.frequency),
            duration: non_empty(self.duration),
            instructions: non_empty(self.instructions),
        };
        prescription.validate()?;
        Ok(prescription)
    }
}

const ADD_FORM: &str = "<h3>Write prescription</h3>\n\
<form method=\"post\" action=\"/prescriptions\">\n\
<label>Patient ID <input name=\"patient_id\"></label>\n\
<label>Date <input type=\"date\" name=\"prescription_date\"></label>\n\
<label>Medication <input name=\"medication\"></label>\n\
<label>Dosage <input name=\"dosage\"></label>\n\
<label>Frequency <input name=\"frequency\"></label>\n\
<label>Duration <input name=\"duration\"></label>\n\
<label>Instructions <textarea name=\"instructions\"></textarea></label>\n\
<button type=\"submit\">Add Prescription</button>\n</form>\n";

fn table(rows: &[PrescriptionRow]) -> String {
    let mut out = String::from(
        "<table>\n<tr><th>Date</th><th>Patient</th><th>Medication</th><th>Dosage</th>\
         <th>Status</th><th></th></tr>\n",
    );
    for row in rows {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/prescriptions/{}\">View</a> \
             <form method=\"post\" action=\"/prescriptions/{}/delete\">\
             <button type=\"submit\">Delete</button></form></td></tr>\n",
            row.prescription.prescription_date,
            esc(&row.patient_name),
            esc(&row.prescription.medication),
            esc(row.prescription.dosage.as_deref().unwrap_or("")),
            row.prescription.status,
            row.prescription.id,
            row.prescription.id,
        ));
    }
    out.push_str("</table>\n");
    out
}

pub async fn list(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let rows = match state.store.list_prescriptions(&ctx).await {
        Ok(rows) => rows,
        Err(err) => return error_redirect(&state, &ctx, err, "/dashboard").await,
    };
    let body = format!("<h2>Prescriptions</h2>\n{}{}", table(&rows), ADD_FORM);
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Prescriptions", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<PrescriptionForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let new_prescription = match form.into_new() {
        Ok(new_prescription) => new_prescription,
        Err(err) => {
            return flash_redirect(
                &state,
                &ctx,
                Flash::error(user_message(&err.into())),
                "/prescriptions",
            )
            .await
        }
    };
    match state.store.insert_prescription(&ctx, &new_prescription).await {
        Ok(_) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Prescription added successfully."),
                "/prescriptions",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/prescriptions").await,
    }
}

pub async fn detail(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let row = match parse_id(&id) {
        Ok(id) => match state.store.find_prescription(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/prescriptions").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/prescriptions").await,
    };
    let body = format!(
        "<h2>Prescription</h2>\n<ul>\n\
         <li>Patient: {}</li>\n<li>Date: {}</li>\n<li>Medication: {}</li>\n\
         <li>Dosage: {}</li>\n<li>Frequency: {}</li>\n<li>Duration: {}</li>\n\
         <li>Instructions: {}</li>\n<li>Status: {}</li>\n</ul>\n",
        esc(&row.patient_name),
        row.prescription.prescription_date,
        esc(&row.prescription.medication),
        esc(row.prescription.dosage.as_deref().unwrap_or("")),
        esc(row.prescription.frequency.as_deref().unwrap_or("")),
        esc(row.prescription.duration.as_deref().unwrap_or("")),
        esc(row.prescription.instructions.as_deref().unwrap_or("")),
        row.prescription.status,
    );
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Prescription", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

pub async fn delete(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_redirect(&state, &ctx, err, "/prescriptions").await,
    };
    match state.store.delete_prescription(&ctx, id).await {
        Ok(()) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Prescription deleted successfully."),
                "/prescriptions",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/prescriptions").await,
    }
}
