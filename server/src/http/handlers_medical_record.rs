// server/src/http/handlers_medical_record.rs
//! Medical records: diagnosis/treatment entries per visit, owner-scoped.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::NaiveDate;
use serde::Deserialize;

use clinic::session::Flash;
use clinic::storage::{ClinicStore, MedicalRecordRow};
use models::errors::{ValidationError, ValidationResult};
use models::{MedicalRecordUpdate, NewMedicalRecord, RecordStatus};

use crate::http::render::{esc, page};
use crate::http::{
    error_redirect, flash_redirect, parse_id, require_login, user_message, SharedState,
};

#[derive(Debug, Deserialize)]
pub struct MedicalRecordForm {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub record_date: String,
    pub follow_up_date: Option<String>,
    pub status: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_date(raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateFormat(raw.to_string()))
}

impl MedicalRecordForm {
    fn into_new(self) -> ValidationResult<NewMedicalRecord> {
        let record = NewMedicalRecord {
            patient_id: self
                .patient_id
                .trim()
                .parse()
                .map_err(|_| ValidationError::missing("patient_id"))?,
            diagnosis: self.diagnosis.trim().to_string(),
            treatment: self.treatment.trim().to_string(),
            notes: non_empty(self.notes),
            record_date: parse_date(self.record_date.trim())?,
            follow_up_date: non_empty(self.follow_up_date).map(|d| parse_date(&d)).transpose()?,
        };
        record.validate()?;
        Ok(record)
    }

    fn into_update(self) -> ValidationResult<MedicalRecordUpdate> {
        let status = match non_empty(self.status) {
            Some(s) => RecordStatus::parse(&s)?,
            None => RecordStatus::default(),
        };
        let update = MedicalRecordUpdate {
            diagnosis: self.diagnosis.trim().to_string(),
            treatment: self.treatment.trim().to_string(),
            notes: non_empty(self.notes),
            record_date: parse_date(self.record_date.trim())?,
            follow_up_date: non_empty(self.follow_up_date).map(|d| parse_date(&d)).transpose()?,
            status,
        };
        update.validate()?;
        Ok(update)
    }
}

const ADD_FORM: &str = "<h3>Add medical record</h3>\n\
<form method=\"post\" action=\"/medical-records\">\n\
<label>Patient ID <input name=\"patient_id\"></label>\n\
<label>Diagnosis <textarea name=\"diagnosis\"></textarea></label>\n\
<label>Treatment <textarea name=\"treatment\"></textarea></label>\n\
<label>Notes <textarea name=\"notes\"></textarea></label>\n\
<label>Record date <input type=\"date\" name=\"record_date\"></label>\n\
<label>Follow-up date <input type=\"date\" name=\"follow_up_date\"></label>\n\
<button type=\"submit\">Add Record</button>\n</form>\n";

fn table(rows: &[MedicalRecordRow]) -> String {
    let mut out = String::from(
        "<table>\n<tr><th>Date</th><th>Patient</th><th>Diagnosis</th><th>Status</th><th></th></tr>\n",
    );
    for row in rows {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/medical-records/{}\">View</a> \
             <a href=\"/medical-records/{}/edit\">Edit</a> \
             <form method=\"post\" action=\"/medical-records/{}/delete\">\
             <button type=\"submit\">Delete</button></form></td></tr>\n",
            row.record.record_date,
            esc(&row.patient_name),
            esc(&row.record.diagnosis),
            row.record.status,
            row.record.id,
            row.record.id,
            row.record.id,
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
    let rows = match state.store.list_medical_records(&ctx).await {
        Ok(rows) => rows,
        Err(err) => return error_redirect(&state, &ctx, err, "/dashboard").await,
    };
    let body = format!("<h2>Medical Records</h2>\n{}{}", table(&rows), ADD_FORM);
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Medical Records", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<MedicalRecordForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let new_record = match form.into_new() {
        Ok(new_record) => new_record,
        Err(err) => {
            return flash_redirect(
                &state,
                &ctx,
                Flash::error(user_message(&err.into())),
                "/medical-records",
            )
            .await
        }
    };
    match state.store.insert_medical_record(&ctx, &new_record).await {
        Ok(_) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Medical record added successfully!"),
                "/medical-records",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/medical-records").await,
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
        Ok(id) => match state.store.find_medical_record(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/medical-records").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/medical-records").await,
    };
    let body = format!(
        "<h2>Medical Record</h2>\n<ul>\n\
         <li>Patient: {}</li>\n<li>Date: {}</li>\n<li>Diagnosis: {}</li>\n\
         <li>Treatment: {}</li>\n<li>Notes: {}</li>\n<li>Follow-up: {}</li>\n\
         <li>Status: {}</li>\n</ul>\n\
         <p><a href=\"/medical-records/{}/edit\">Edit</a></p>\n",
        esc(&row.patient_name),
        row.record.record_date,
        esc(&row.record.diagnosis),
        esc(&row.record.treatment),
        esc(row.record.notes.as_deref().unwrap_or("")),
        row.record.follow_up_date.map(|d| d.to_string()).unwrap_or_default(),
        row.record.status,
        row.record.id,
    );
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Medical Record", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

fn edit_body(row: &MedicalRecordRow, error: Option<&str>) -> String {
    let banner = error
        .map(|e| format!("<p class=\"flash error\">{}</p>\n", esc(e)))
        .unwrap_or_default();
    let mut options = String::new();
    for status in [RecordStatus::Active, RecordStatus::Archived] {
        let selected = if status == row.record.status { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            status, selected, status
        ));
    }
    format!(
        "<h2>Edit medical record for {}</h2>\n{}\
         <form method=\"post\" action=\"/medical-records/{}/edit\">\n\
         <label>Diagnosis <textarea name=\"diagnosis\">{}</textarea></label>\n\
         <label>Treatment <textarea name=\"treatment\">{}</textarea></label>\n\
         <label>Notes <textarea name=\"notes\">{}</textarea></label>\n\
         <label>Record date <input type=\"date\" name=\"record_date\" value=\"{}\"></label>\n\
         <label>Follow-up date <input type=\"date\" name=\"follow_up_date\" value=\"{}\"></label>\n\
         <label>Status <select name=\"status\">{}</select></label>\n\
         <button type=\"submit\">Save</button>\n</form>\n",
        esc(&row.patient_name),
        banner,
        row.record.id,
        esc(&row.record.diagnosis),
        esc(&row.record.treatment),
        esc(row.record.notes.as_deref().unwrap_or("")),
        row.record.record_date,
        row.record.follow_up_date.map(|d| d.to_string()).unwrap_or_default(),
        options,
    )
}

pub async fn edit_form(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let row = match parse_id(&id) {
        Ok(id) => match state.store.find_medical_record(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/medical-records").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/medical-records").await,
    };
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Edit Medical Record", &ctx.doctor_name, flash.as_ref(), &edit_body(&row, None))
        .into_response()
}

pub async fn edit_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<MedicalRecordForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_redirect(&state, &ctx, err, "/medical-records").await,
    };
    let update = match form.into_update() {
        Ok(update) => update,
        Err(err) => {
            return match state.store.find_medical_record(&ctx, id).await {
                Ok(row) => page(
                    "Edit Medical Record",
                    &ctx.doctor_name,
                    None,
                    &edit_body(&row, Some(&user_message(&err.into()))),
                )
                .into_response(),
                Err(err) => error_redirect(&state, &ctx, err, "/medical-records").await,
            };
        }
    };
    match state.store.update_medical_record(&ctx, id, &update).await {
        Ok(()) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Medical record updated successfully."),
                "/medical-records",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/medical-records").await,
    }
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
        Err(err) => return error_redirect(&state, &ctx, err, "/medical-records").await,
    };
    match state.store.delete_medical_record(&ctx, id).await {
        Ok(()) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Medical record deleted successfully."),
                "/medical-records",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/medical-records").await,
    }
}
