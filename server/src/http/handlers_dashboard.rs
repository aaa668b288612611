// server/src/http/handlers_dashboard.rs
//! Dashboard and doctor profile pages. These are the pages that fetch the
//! doctor row itself, so they are where a stale session gets detected and
//! destroyed.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use clinic::session::Flash;
use clinic::storage::ClinicStore;
use models::errors::ClinicError;
use models::DoctorProfileUpdate;

use crate::http::render::{esc, opt, page};
use crate::http::{
    flash_redirect, require_login, stale_session_redirect, user_message, SharedState,
};

pub async fn dashboard(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let doctor = match state.auth.load_profile(&ctx).await {
        Ok(doctor) => doctor,
        Err(ClinicError::StaleSession) => return stale_session_redirect(),
        Err(err) => {
            // Render inline rather than redirecting; the dashboard is where
            // error redirects land, so bouncing from here could loop.
            let flash = Flash::error(user_message(&err));
            return page("Dashboard", &ctx.doctor_name, Some(&flash), "").into_response();
        }
    };

    let summary = match state.store.dashboard_summary(&ctx).await {
        Ok(summary) => summary,
        Err(err) => {
            let flash = Flash::error(user_message(&err));
            return page("Dashboard", &doctor.display_name(), Some(&flash), "").into_response();
        }
    };

    let mut rows = String::new();
    for row in &summary.recent_appointments {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            row.appointment.appointment_date,
            row.appointment.appointment_time,
            esc(&row.patient_name),
            esc(row.appointment.reason.as_deref().unwrap_or("Regular Checkup")),
            row.appointment.status,
        ));
    }

    let body = format!(
        "<h2>Dashboard</h2>\n\
         <ul>\n\
         <li>Today's appointments: {}</li>\n\
         <li>Total patients: {}</li>\n\
         <li>Active prescriptions: {}</li>\n\
         <li>Lab results: {}</li>\n\
         </ul>\n\
         <h3>Recent appointments</h3>\n\
         <table>\n<tr><th>Date</th><th>Time</th><th>Patient</th><th>Reason</th><th>Status</th></tr>\n\
         {}</table>\n",
        summary.today_appointments,
        summary.total_patients,
        summary.active_prescriptions,
        summary.lab_results,
        rows
    );

    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Dashboard", &doctor.display_name(), flash.as_ref(), &body).into_response()
}

pub async fn profile(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let doctor = match state.auth.load_profile(&ctx).await {
        Ok(doctor) => doctor,
        Err(ClinicError::StaleSession) => return stale_session_redirect(),
        Err(err) => return crate::http::error_redirect(&state, &ctx, err, "/dashboard").await,
    };
    let stats = match state.store.profile_stats(&ctx).await {
        Ok(stats) => stats,
        Err(err) => return crate::http::error_redirect(&state, &ctx, err, "/dashboard").await,
    };

    let mut recent = String::new();
    for row in &stats.recent_prescriptions {
        recent.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            row.prescription.prescription_date,
            esc(&row.patient_name),
            esc(&row.prescription.medication),
            row.prescription.status,
        ));
    }

    let body = format!(
        "<h2>Profile</h2>\n\
         <p>{} ({})</p>\n\
         <ul>\n\
         <li>Total appointments: {}</li>\n\
         <li>Patients seen: {}</li>\n\
         <li>Prescriptions written: {}</li>\n\
         </ul>\n\
         <form method=\"post\" action=\"/profile\">\n\
         <label>First name <input name=\"first_name\" value=\"{}\"></label>\n\
         <label>Last name <input name=\"last_name\" value=\"{}\"></label>\n\
         <label>Phone <input name=\"phone\" value=\"{}\"></label>\n\
         <label>Specialization <input name=\"specialization\" value=\"{}\"></label>\n\
         <label>Clinic name <input name=\"clinic_name\" value=\"{}\"></label>\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n\
         <h3>Recent prescriptions</h3>\n\
         <table>\n<tr><th>Date</th><th>Patient</th><th>Medication</th><th>Status</th></tr>\n\
         {}</table>\n",
        esc(&doctor.display_name()),
        esc(&doctor.email),
        stats.total_appointments,
        stats.distinct_patients,
        stats.total_prescriptions,
        esc(&doctor.first_name),
        esc(&doctor.last_name),
        opt(&doctor.phone),
        opt(&doctor.specialization),
        opt(&doctor.clinic_name),
        recent
    );

    let flash = state.auth.sessions().take_flash(ctx.session_id).await;
    page("Profile", &doctor.display_name(), flash.as_ref(), &body).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub clinic_name: Option<String>,
}

pub async fn profile_update(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<ProfileForm>,
) -> Response {
    let ctx = match require_login(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(redirect) => return redirect,
    };
    let doctor = match state.auth.load_profile(&ctx).await {
        Ok(doctor) => doctor,
        Err(ClinicError::StaleSession) => return stale_session_redirect(),
        Err(err) => return crate::http::error_redirect(&state, &ctx, err, "/dashboard").await,
    };

    let update = DoctorProfileUpdate {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        phone: form.phone.filter(|p| !p.trim().is_empty()),
        specialization: form.specialization.filter(|s| !s.trim().is_empty()),
        clinic_name: form.clinic_name.filter(|c| !c.trim().is_empty()),
        clinic_type: doctor.clinic_type,
    };
    if let Err(err) = update.validate() {
        return flash_redirect(&state, &ctx, Flash::error(user_message(&err.into())), "/profile").await;
    }

    match state.store.update_doctor_profile(ctx.doctor_id, &update).await {
        Ok(()) => {
            flash_redirect(&state, &ctx, Flash::success("Profile updated successfully."), "/profile").await
        }
        Err(err) => crate::http::error_redirect(&state, &ctx, err, "/profile").await,
    }
}
