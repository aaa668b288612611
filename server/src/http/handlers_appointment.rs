// server/src/http/handlers_appointment.rs
//! Appointment scheduling. Owned by the acting doctor; every store call
//! below carries the authenticated context.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use clinic::session::Flash;
use clinic::storage::{ClinicStore, AppointmentRow};
use models::errors::{ValidationError, ValidationResult};
use models::{AppointmentStatus, AppointmentUpdate, NewAppointment};

use crate::http::render::{esc, page};
use crate::http::{
    error_redirect, flash_redirect, parse_id, require_login, user_message, SharedState,
};

#[derive(Debug, Deserialize)]
pub struct AppointmentForm {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub appointment_date: String,
    #[serde(default)]
    pub appointment_time: String,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

fn parse_date(raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateFormat(raw.to_string()))
}

fn parse_time(raw: &str) -> ValidationResult<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTimeFormat(raw.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_status(raw: Option<String>) -> ValidationResult<AppointmentStatus> {
    match non_empty(raw) {
        Some(s) => AppointmentStatus::parse(&s),
        None => Ok(AppointmentStatus::default()),
    }
}

impl AppointmentForm {
    fn into_new(self) -> ValidationResult<NewAppointment> {
        let appointment = NewAppointment {
            patient_id: self
                .patient_id
                .trim()
                .parse()
                .map_err(|_| ValidationError::missing("patient_id"))?,
            appointment_date: parse_date(self.appointment_date.trim())?,
            appointment_time: parse_time(self.appointment_time.trim())?,
            status: parse_status(self.status)?,
            reason: non_empty(self.reason),
            notes: non_empty(self.notes),
        };
        appointment.validate()?;
        Ok(appointment)
    }

    fn into_update(self) -> ValidationResult<AppointmentUpdate> {
        let update = AppointmentUpdate {
            appointment_date: parse_date(self.appointment_date.trim())?,
            appointment_time: parse_time(self.appointment_time.trim())?,
            status: parse_status(self.status)?,
            reason: self.reason.map(|r| r.trim().to_string()).unwrap_or_default(),
            notes: non_empty(self.notes),
        };
        update.validate()?;
        Ok(update)
    }
}

const ADD_FORM: &str = "<h3>Schedule appointment</h3>\n\
<form method=\"post\" action=\"/appointments\">\n\
<label>Patient ID <input name=\"patient_id\"></label>\n\
<label>Date <input type=\"date\" name=\"appointment_date\"></label>\n\
<label>Time <input type=\"time\" name=\"appointment_time\"></label>\n\
<label>Reason <input name=\"reason\"></label>\n\
<label>Notes <textarea name=\"notes\"></textarea></label>\n\
<button type=\"submit\">Schedule</button>\n</form>\n";

fn table(rows: &[AppointmentRow]) -> String {
    let mut out = String::from(
        "<table>\n<tr><th>Date</th><th>Time</th><th>Patient</th><th>Reason</th>\
         <th>Status</th><th></th></tr>\n",
    );
    for row in rows {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/appointments/{}\">View</a> \
             <a href=\"/appointments/{}/edit\">Edit</a> \
             <form method=\"post\" action=\"/appointments/{}/delete\">\
             <button type=\"submit\">Delete</button></form></td></tr>\n",
            row.appointment.appointment_date,
            row.appointment.appointment_time,
            esc(&row.patient_name),
            esc(row.appointment.reason.as_deref().unwrap_or("")),
            row.appointment.status,
            row.appointment.id,
            row.appointment.id,
            row.appointment.id,
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
    let rows = match state.store.list_appointments(&ctx).await {
        Ok(rows) => rows,
        Err(err) => return error_redirect(&state, &ctx, err, "/dashboard").await,
    };
    let body = format!("<h2>Appointments</h2>\n{}{}", table(&rows), ADD_FORM);
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Appointments", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<AppointmentForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let new_appointment = match form.into_new() {
        Ok(new_appointment) => new_appointment,
        Err(err) => {
            return flash_redirect(
                &state,
                &ctx,
                Flash::error(user_message(&err.into())),
                "/appointments",
            )
            .await
        }
    };
    match state.store.insert_appointment(&ctx, &new_appointment).await {
        Ok(_) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Appointment scheduled successfully!"),
                "/appointments",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/appointments").await,
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
        Ok(id) => match state.store.find_appointment(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/appointments").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/appointments").await,
    };
    let body = format!(
        "<h2>Appointment</h2>\n<ul>\n\
         <li>Patient: {}</li>\n<li>Date: {}</li>\n<li>Time: {}</li>\n\
         <li>Status: {}</li>\n<li>Reason: {}</li>\n<li>Notes: {}</li>\n</ul>\n\
         <p><a href=\"/appointments/{}/edit\">Edit</a></p>\n",
        esc(&row.patient_name),
        row.appointment.appointment_date,
        row.appointment.appointment_time,
        row.appointment.status,
        esc(row.appointment.reason.as_deref().unwrap_or("")),
        esc(row.appointment.notes.as_deref().unwrap_or("")),
        row.appointment.id,
    );
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Appointment", &ctx.doctor_name, flash.as_ref(), &body).into_response()
}

fn edit_body(row: &AppointmentRow, error: Option<&str>) -> String {
    let banner = error
        .map(|e| format!("<p class=\"flash error\">{}</p>\n", esc(e)))
        .unwrap_or_default();
    let mut options = String::new();
    for status in [
        AppointmentStatus::Scheduled,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ] {
        let selected = if status == row.appointment.status { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            status, selected, status
        ));
    }
    format!(
        "<h2>Edit appointment for {}</h2>\n{}\
         <form method=\"post\" action=\"/appointments/{}/edit\">\n\
         <label>Date <input type=\"date\" name=\"appointment_date\" value=\"{}\"></label>\n\
         <label>Time <input type=\"time\" name=\"appointment_time\" value=\"{}\"></label>\n\
         <label>Status <select name=\"status\">{}</select></label>\n\
         <label>Reason <input name=\"reason\" value=\"{}\"></label>\n\
         <label>Notes <textarea name=\"notes\">{}</textarea></label>\n\
         <button type=\"submit\">Save</button>\n</form>\n",
        esc(&row.patient_name),
        banner,
        row.appointment.id,
        row.appointment.appointment_date,
        row.appointment.appointment_time.format("%H:%M"),
        options,
        esc(row.appointment.reason.as_deref().unwrap_or("")),
        esc(row.appointment.notes.as_deref().unwrap_or("")),
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
        Ok(id) => match state.store.find_appointment(&ctx, id).await {
            Ok(row) => row,
            Err(err) => return error_redirect(&state, &ctx, err, "/appointments").await,
        },
        Err(err) => return error_redirect(&state, &ctx, err, "/appointments").await,
    };
    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Edit Appointment", &ctx.doctor_name, flash.as_ref(), &edit_body(&row, None))
        .into_response()
}

pub async fn edit_submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<AppointmentForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => return error_redirect(&state, &ctx, err, "/appointments").await,
    };
    let update = match form.into_update() {
        Ok(update) => update,
        Err(err) => {
            // Inline error: the message stays request-scoped.
            return match state.store.find_appointment(&ctx, id).await {
                Ok(row) => page(
                    "Edit Appointment",
                    &ctx.doctor_name,
                    None,
                    &edit_body(&row, Some(&user_message(&err.into()))),
                )
                .into_response(),
                Err(err) => error_redirect(&state, &ctx, err, "/appointments").await,
            };
        }
    };
    match state.store.update_appointment(&ctx, id, &update).await {
        Ok(()) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Appointment updated successfully."),
                "/appointments",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/appointments").await,
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
        Err(err) => return error_redirect(&state, &ctx, err, "/appointments").await,
    };
    match state.store.delete_appointment(&ctx, id).await {
        Ok(()) => {
            flash_redirect(
                &state,
                &ctx,
                Flash::success("Appointment deleted successfully."),
                "/appointments",
            )
            .await
        }
        Err(err) => error_redirect(&state, &ctx, err, "/appointments").await,
    }
}
