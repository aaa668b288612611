// server/src/http/handlers_patient.rs
//! Patient directory. Patients are clinic-wide: every authenticated doctor
//! can manage every patient. Deleting one runs the transactional cascade
//! over all five dependent tables.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::NaiveDate;
use serde::Deserialize;

use clinic::session::Flash;
use clinic::storage::ClinicStore;
use models::errors::{ValidationError, ValidationResult};
use models::{Gender, NewPatient, PatientUpdate};

use crate::http::render::{esc, opt, page};
use crate::http::{
    error_redirect, flash_redirect, parse_id, require_login, user_message, SharedState,
};

#[derive(Debug, Deserialize)]
pub struct PatientForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_date(raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateFormat(raw.to_string()))
}

impl PatientForm {
    fn into_new(self) -> ValidationResult<NewPatient> {
        let patient = NewPatient {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: non_empty(self.phone),
            date_of_birth: non_empty(self.date_of_birth)
                .map(|d| parse_date(&d))
                .transpose()?,
            gender: non_empty(self.gender).map(|g| Gender::parse(&g)).transpose()?,
            address: non_empty(self.address),
            medical_history: non_empty(self.medical_history),
            allergies: non_empty(self.allergies),
        };
        patient.validate()?;
        Ok(patient)
    }

    fn into_update(self) -> ValidationResult<PatientUpdate> {
        let update = PatientUpdate {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: non_empty(self.phone),
            date_of_birth: non_empty(self.date_of_birth)
                .map(|d| parse_date(&d))
                .transpose()?,
            gender: non_empty(self.gender).map(|g| Gender::parse(&g)).transpose()?,
            address: non_empty(self.address),
            medical_history: non_empty(self.medical_history),
            allergies: non_empty(self.allergies),
        };
        update.validate()?;
        Ok(update)
    }
}

const ADD_FORM: &str = "<h3>Add patient</h3>\n\
<form method=\"post\" action=\"/patients\">\n\
<label>First name <input name=\"first_name\"></label>\n\
<label>Last name <input name=\"last_name\"></label>\n\
<label>Email <input type=\"email\" name=\"email\"></label>\n\
<label>Phone <input name=\"phone\"></label>\n\
<label>Date of birth <input type=\"date\" name=\"date_of_birth\"></label>\n\
<label>Gender <select name=\"gender\"><option value=\"\"></option>\
<option value=\"male\">Male</option><option value=\"female\">Female</option>\
<option value=\"other\">Other</option></select></label>\n\
<label>Address <textarea name=\"address\"></textarea></label>\n\
<label>Medical history <textarea name=\"medical_history\"></textarea></label>\n\
<label>Allergies <textarea name=\"allergies\"></textarea></label>\n\
<button type=\"submit\">Add Patient</button>\n</form>\n";

pub async fn list(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let patients = match state.store.list_patients().await {
        Ok(patients) => patients,
        Err(err) => return error_redirect(&state, &ctx, err, "/dashboard").await,
    };

    let mut rows = String::new();
    for p in &patients {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/patients/{}/edit\">Edit</a> \
             <form method=\"post\" action=\"/patients/{}/delete\">\
             <button type=\"submit\">Delete</button></form></td></tr>\n",
            esc(&p.display_name()),
            esc(&p.email),
            opt(&p.phone),
            p.date_of_birth.map(|d| d.to_string()).unwrap_or_default(),
            p.id,
            p.id,
        ));
    }

    let body = format!(
        "<h2>Patients</h2>\n\
         <table>\n<tr><th>Name</th><th>Email</th><th>Phone</th><th>Date of birth</th><th></th></tr>\n\
         {}</table>\n{}",
        rows, ADD_FORM
    );
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Patients", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<PatientForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let new_patient = match form.into_new() {
        Ok(new_patient) => new_patient,
        Err(err) => {
            return flash_redirect(&state, &ctx, Flash::error(user_message(&err.into())), "/patients")
                .await
        }
    };
    match state.store.insert_patient(&new_patient).await {
        Ok(_) => {
            flash_redirect(&state, &ctx, Flash::success("Patient added successfully."), "/patients")
                .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/patients").await,
    }
}

fn edit_body(patient: &models::Patient, error: Option<&str>) -> String {
    let banner = error
        .map(|e| format!("<p class=\"flash error\">{}</p>\n", esc(e)))
        .unwrap_or_default();
    format!(
        "<h2>Edit patient</h2>\n{}\
         <form method=\"post\" action=\"/patients/{}/edit\">\n\
         <label>First name <input name=\"first_name\" value=\"{}\"></label>\n\
         <label>Last name <input name=\"last_name\" value=\"{}\"></label>\n\
         <label>Email <input type=\"email\" name=\"email\" value=\"{}\"></label>\n\
         <label>Phone <input name=\"phone\" value=\"{}\"></label>\n\
         <label>Date of birth <input type=\"date\" name=\"date_of_birth\" value=\"{}\"></label>\n\
         <label>Gender <input name=\"gender\" value=\"{}\"></label>\n\
         <label>Address <textarea name=\"address\">{}</textarea></label>\n\
         <label>Medical history <textarea name=\"medical_history\">{}</textarea></label>\n\
         <label>Allergies <textarea name=\"allergies\">{}</textarea></label>\n\
         <button type=\"submit\">Save</button>\n</form>\n",
        banner,
        patient.id,
        esc(&patient.first_name),
        esc(&patient.last_name),
        esc(&patient.email),
        opt(&patient.phone),
        patient.date_of_birth.map(|d| d.to_string()).unwrap_or_default(),
        patient.gender.map(|g| g.as_str()).unwrap_or(""),
        opt(&patient.address),
        opt(&patient.medical_history),
        opt(&patient.allergies),
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
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_redirect(&state, &ctx, err, "/patients").await,
    };
    let patient = match state.store.find_patient(id).await {
        Ok(patient) => patient,
        Err(err) => return error_redirect(&state, &ctx, err, "/patients").await,
    };
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Edit Patient", &ctx.doctor_name, flash.as_ref(), &edit_body(&patient, None))
        .into_response()
}

pub async fn edit_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<PatientForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_redirect(&state, &ctx, err, "/patients").await,
    };
    let update = match form.into_update() {
        Ok(update) => update,
        Err(err) => {
            // Inline error: re-render the form with the stored record.
            return match state.store.find_patient(id).await {
                Ok(patient) => page(
                    "Edit Patient",
                    &ctx.doctor_name,
                    None,
                    &edit_body(&patient, Some(&user_message(&err.into()))),
                )
                .into_response(),
                Err(err) => error_redirect(&state, &ctx, err, "/patients").await,
            };
        }
    };
    match state.store.update_patient(id, &update).await {
        Ok(()) => {
            flash_redirect(&state, &ctx, Flash::success("Patient updated successfully."), "/patients")
                .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/patients").await,
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
        Err(err) => return error_redirect(&state, &ctx, err, "/patients").await,
    };
    match state.store.delete_patient_cascade(id).await {
        Ok(_) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Patient and all related records have been successfully deleted."),
                "/patients",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/patients").await,
    }
}
