// server/src/http/mod.rs
//! Shared HTTP plumbing: application state, the router, cookie handling,
//! the session guard, and the flash-redirect helpers every handler uses.

pub mod handlers_appointment;
pub mod handlers_auth;
pub mod handlers_billing;
pub mod handlers_dashboard;
pub mod handlers_lab_result;
pub mod handlers_medical_record;
pub mod handlers_patient;
pub mod handlers_prescription;
pub mod render;

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use log::error;
use uuid::Uuid;

use clinic::auth::{AuthContext, AuthService};
use clinic::session::Flash;
use clinic::storage::ClinicStore;
use models::errors::ClinicError;

pub const SESSION_COOKIE: &str = "clinic_session";
pub const REMEMBER_COOKIE: &str = "remember_token";

pub struct AppState {
    pub store: Arc<dyn ClinicStore>,
    pub auth: AuthService,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handlers_auth::index))
        .route("/login", get(handlers_auth::login_form).post(handlers_auth::login_submit))
        .route("/register", get(handlers_auth::register_form).post(handlers_auth::register_submit))
        .route("/logout", get(handlers_auth::logout))
        .route("/dashboard", get(handlers_dashboard::dashboard))
        .route("/profile", get(handlers_dashboard::profile).post(handlers_dashboard::profile_update))
        .route("/patients", get(handlers_patient::list).post(handlers_patient::create))
        .route("/patients/:id/edit", get(handlers_patient::edit_form).post(handlers_patient::edit_submit))
        .route("/patients/:id/delete", post(handlers_patient::delete))
        .route("/appointments", get(handlers_appointment::list).post(handlers_appointment::create))
        .route("/appointments/:id", get(handlers_appointment::detail))
        .route("/appointments/:id/edit", get(handlers_appointment::edit_form).post(handlers_appointment::edit_submit))
        .route("/appointments/:id/delete", post(handlers_appointment::delete))
        .route("/prescriptions", get(handlers_prescription::list).post(handlers_prescription::create))
        .route("/prescriptions/:id", get(handlers_prescription::detail))
        .route("/prescriptions/:id/delete", post(handlers_prescription::delete))
        .route("/lab-results", get(handlers_lab_result::list).post(handlers_lab_result::create))
        .route("/lab-results/:id", get(handlers_lab_result::detail))
        .route("/lab-results/:id/edit", get(handlers_lab_result::edit_form).post(handlers_lab_result::edit_submit))
        .route("/lab-results/:id/delete", post(handlers_lab_result::delete))
        .route("/medical-records", get(handlers_medical_record::list).post(handlers_medical_record::create))
        .route("/medical-records/:id", get(handlers_medical_record::detail))
        .route("/medical-records/:id/edit", get(handlers_medical_record::edit_form).post(handlers_medical_record::edit_submit))
        .route("/medical-records/:id/delete", post(handlers_medical_record::delete))
        .route("/billing", get(handlers_billing::list).post(handlers_billing::create))
        .route("/billing/:id", get(handlers_billing::detail))
        .route("/billing/:id/edit", get(handlers_billing::edit_form).post(handlers_billing::edit_submit))
        .route("/billing/:id/delete", post(handlers_billing::delete))
        .with_state(state)
}

// ----------------------------------------------------------------------
// Cookies
// ----------------------------------------------------------------------

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').map(str::trim).find_map(|pair| {
        pair.split_once('=')
            .and_then(|(k, v)| (k == name).then(|| v.to_string()))
    })
}

pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    cookie_value(headers, SESSION_COOKIE).and_then(|v| Uuid::parse_str(&v).ok())
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

pub fn remember_cookie(token: &str, expires: DateTime<Utc>) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Expires={}",
        REMEMBER_COOKIE,
        token,
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", name)
}

/// A redirect that also sets one or more cookies.
pub fn redirect_with_cookies(location: &str, cookies: &[String]) -> Response {
    let mut response = Redirect::to(location).into_response();
    for cookie in cookies {
        if let Ok(value) = cookie.parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

// ----------------------------------------------------------------------
// Guard and error reporting
// ----------------------------------------------------------------------

/// The auth guard. Fails closed: without a live session the caller gets a
/// redirect to the login page and must do no further work.
pub async fn require_login(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, Response> {
    state
        .auth
        .authenticate(session_id(headers))
        .await
        .map_err(|_| Redirect::to("/login").into_response())
}

/// Stores a flash in the session and redirects; the next render consumes it.
pub async fn flash_redirect(
    state: &AppState,
    ctx: &AuthContext,
    flash: Flash,
    location: &str,
) -> Response {
    state.auth.sessions().set_flash(ctx.session_id, flash).await;
    Redirect::to(location).into_response()
}

/// Maps an operation error to a flash message and a redirect back to the
/// entity's list page. Storage details are logged, never shown.
pub async fn error_redirect(
    state: &AppState,
    ctx: &AuthContext,
    err: ClinicError,
    location: &str,
) -> Response {
    let text = user_message(&err);
    flash_redirect(state, ctx, Flash::error(text), location).await
}

/// The user-visible form of an error. `NotFoundOrForeign` is deliberately
/// uniform and storage failures are reduced to a generic sentence.
pub fn user_message(err: &ClinicError) -> String {
    match err {
        ClinicError::Storage(detail) => {
            error!("storage failure: {}", detail);
            "An unexpected error occurred. Please try again.".to_string()
        }
        ClinicError::StaleSession | ClinicError::AuthenticationRequired => {
            "Please log in to continue.".to_string()
        }
        other => other.to_string(),
    }
}

/// Session destroyed out from under us: clear cookies and start over.
pub fn stale_session_redirect() -> Response {
    redirect_with_cookies(
        "/login",
        &[clear_cookie(SESSION_COOKIE), clear_cookie(REMEMBER_COOKIE)],
    )
}

/// Parses a URL id segment. Anything non-numeric behaves exactly like a
/// record that does not exist.
pub fn parse_id(raw: &str) -> Result<i32, ClinicError> {
    raw.parse::<i32>().map_err(|_| ClinicError::NotFoundOrForeign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_parsing_finds_the_right_pair() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; clinic_session=not-a-uuid; other=1"),
        );
        assert_eq!(cookie_value(&headers, "theme").as_deref(), Some("dark"));
        assert_eq!(cookie_value(&headers, "missing"), None);
        // A malformed session id is treated as no session at all.
        assert!(session_id(&headers).is_none());
    }

    #[test]
    fn session_cookie_round_trips() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        let cookie = session_cookie(id);
        let pair = cookie.split(';').next().unwrap().to_string();
        headers.insert(header::COOKIE, HeaderValue::from_str(&pair).unwrap());
        assert_eq!(session_id(&headers), Some(id));
    }

    #[test]
    fn non_numeric_ids_read_as_not_found() {
        assert!(parse_id("17").is_ok());
        assert_eq!(parse_id("17abc").unwrap_err(), ClinicError::NotFoundOrForeign);
        assert_eq!(parse_id("").unwrap_err(), ClinicError::NotFoundOrForeign);
    }
}
