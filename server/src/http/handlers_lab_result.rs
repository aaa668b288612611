// server/src/http/handlers_lab_result.rs
//! Lab results: full CRUD, owner-scoped.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::NaiveDate;
use serde::Deserialize;

use clinic::session::Flash;
use clinic::storage::{ClinicStore, LabResultRow};
use models::errors::{ValidationError, ValidationResult};
use models::{LabResultUpdate, LabStatus, NewLabResult};

use crate::http::render::{esc, page};
use crate::http::{
    error_redirect, flash_redirect, parse_id, require_login, user_message, SharedState,
};

#[derive(Debug, Deserialize)]
pub struct LabResultForm {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub test_name: String,
    #[serde(default)]
    pub test_date: String,
    pub results: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_date(raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateFormat(raw.to_string()))
}

impl LabResultForm {
    fn into_new(self) -> ValidationResult<NewLabResult> {
        let lab = NewLabResult {
            patient_id: self
                .patient_id
                .trim()
                .parse()
                .map_err(|_| ValidationError::missing("patient_id"))?,
            test_name: self.test_name.trim().to_string(),
            test_date: parse_date(self.test_date.trim())?,
            results: non_empty(self.results),
            notes: non_empty(self.notes),
        };
        lab.validate()?;
        Ok(lab)
    }

    fn into_update(self) -> ValidationResult<LabResultUpdate> {
        let status = match non_empty(self.status) {
            Some(s) => LabStatus::parse(&s)?,
            None => LabStatus::default(),
        };
        let update = LabResultUpdate {
            test_name: self.test_name.trim().to_string(),
            test_date: parse_date(self.test_date.trim())?,
            results: non_empty(self.results),
            notes: non_empty(self.notes),
            status,
        };
        update.validate()?;
        Ok(update)
    }
}

const ADD_FORM: &str = "<h3>Add lab result</h3>\n\
<form method=\"post\" action=\"/lab-results\">\n\
<label>Patient ID <input name=\"patient_id\"></label>\n\
<label>Test name <input name=\"test_name\"></label>\n\
<label>Test date <input type=\"date\" name=\"test_date\"></label>\n\
<label>Results <textarea name=\"results\"></textarea></label>\n\
<label>Notes <textarea name=\"notes\"></textarea></label>\n\
<button type=\"submit\">Add Lab Result</button>\n</form>\n";

fn table(rows: &[LabResultRow]) -> String {
    let mut out = String::from(
        "<table>\n<tr><th>Test date</th><th>Patient</th><th>Test</th><th>Status</th><th></th></tr>\n",
    );
    for row in rows {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/lab-results/{}\">View</a> \
             <a href=\"/lab-results/{}/edit\">Edit</a> \
             <form method=\"post\" action=\"/lab-results/{}/delete\">\
             <button type=\"submit\">Delete</button></form></td></tr>\n",
            row.lab_result.test_date,
            esc(&row.patient_name),
            esc(&row.lab_result.test_name),
            row.lab_result.status,
            row.lab_result.id,
            row.lab_result.id,
            row.lab_result.id,
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
    let rows = match state.store.list_lab_results(&ctx).await {
        Ok(rows) => rows,
        Err(err) => return error_redirect(&state, &ctx, err, "/dashboard").await,
    };
    let body = format!("<h2>Lab Results</h2>\n{}{}", table(&rows), ADD_FORM);
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Lab Results", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<LabResultForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let new_lab = match form.into_new() {
        Ok(new_lab) => new_lab,
        Err(err) => {
            return flash_redirect(
                &state,
                &ctx,
                Flash::error(user_message(&err.into())),
                "/lab-results",
            )
            .await
        }
    };
    match state.store.insert_lab_result(&ctx, &new_lab).await {
        Ok(_) => {
            flash_redirect(&state, &ctx, Flash::success("Lab result added successfully!"), "/lab-results")
                .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/lab-results").await,
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
        Ok(id) => match state.store.find_lab_result(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/lab-results").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/lab-results").await,
    };
    let body = format!(
        "<h2>Lab Result</h2>\n<ul>\n\
         <li>Patient: {}</li>\n<li>Test: {}</li>\n<li>Date: {}</li>\n\
         <li>Results: {}</li>\n<li>Notes: {}</li>\n<li>Status: {}</li>\n</ul>\n\
         <p><a href=\"/lab-results/{}/edit\">Edit</a></p>\n",
        esc(&row.patient_name),
        esc(&row.lab_result.test_name),
        row.lab_result.test_date,
        esc(row.lab_result.results.as_deref().unwrap_or("")),
        esc(row.lab_result.notes.as_deref().unwrap_or("")),
        row.lab_result.status,
        row.lab_result.id,
    );
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Lab Result", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

fn edit_body(row: &LabResultRow, error: Option<&str>) -> String {
    let banner = error
        .map(|e| format!("<p class=\"flash error\">{}</p>\n", esc(e)))
        .unwrap_or_default();
    let mut options = String::new();
    for status in [LabStatus::Pending, LabStatus::Completed, LabStatus::Cancelled] {
        let selected = if status == row.lab_result.status { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            status, selected, status
        ));
    }
    format!(
        "<h2>Edit lab result for {}</h2>\n{}\
         <form method=\"post\" action=\"/lab-results/{}/edit\">\n\
         <label>Test name <input name=\"test_name\" value=\"{}\"></label>\n\
         <label>Test date <input type=\"date\" name=\"test_date\" value=\"{}\"></label>\n\
         <label>Status <select name=\"status\">{}</select></label>\n\
         <label>Results <textarea name=\"results\">{}</textarea></label>\n\
         <label>Notes <textarea name=\"notes\">{}</textarea></label>\n\
         <button type=\"submit\">Save</button>\n</form>\n",
        esc(&row.patient_name),
        banner,
        row.lab_result.id,
        esc(&row.lab_result.test_name),
        row.lab_result.test_date,
        options,
        esc(row.lab_result.results.as_deref().unwrap_or("")),
        esc(row.lab_result.notes.as_deref().unwrap_or("")),
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
        Ok(id) => match state.store.find_lab_result(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/lab-results").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/lab-results").await,
    };
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Edit Lab Result", &ctx.doctor_name, flash.as_ref(), &edit_body(&row, None))
        .into_response()
}

pub async fn edit_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<LabResultForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_redirect(&state, &ctx, err, "/lab-results").await,
    };
    let update = match form.into_update() {
        Ok(update) => update,
        Err(err) => {
            return match state.store.find_lab_result(&ctx, id).await {
                Ok(row) => page(
                    "Edit Lab Result",
                    &ctx.doctor_name,
                    None,
                    &edit_body(&row, Some(&user_message(&err.into()))),
                )
                .into_response(),
                Err(err) => error_redirect(&state, &ctx, err, "/lab-results").await,
            };
        }
    };
    match state.store.update_lab_result(&ctx, id, &update).await {
        Ok(()) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Lab result updated successfully."),
                "/lab-results",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/lab-results").await,
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
        Err(err) => return error_redirect(&state, &ctx, err, "/lab-results").await,
    };
    match state.store.delete_lab_result(&ctx, id).await {
        Ok(()) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Lab result deleted successfully."),
                "/lab-results",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/lab-results").await,
    }
}
