// server/src/http/handlers_auth.rs
//! Login, registration, remember-me resume, and logout.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use clinic::session::Flash;
use models::errors::ClinicError;
use models::NewDoctor;

use crate::http::render::{esc, public_page};
use crate::http::{
    clear_cookie, cookie_value, redirect_with_cookies, remember_cookie, session_cookie,
    session_id, user_message, SharedState, REMEMBER_COOKIE, SESSION_COOKIE,
};

pub async fn index(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if state.auth.authenticate(session_id(&headers)).await.is_ok() {
        Redirect::to("/dashboard").into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub registered: Option<String>,
}

fn login_body(email: &str) -> String {
    format!(
        "<h2>Login</h2>\n<form method=\"post\" action=\"/login\">\n\
         <label>Email <input type=\"email\" name=\"email\" value=\"{}\"></label>\n\
         <label>Password <input type=\"password\" name=\"password\"></label>\n\
         <label><input type=\"checkbox\" name=\"remember_me\"> Remember me</label>\n\
         <button type=\"submit\">Login</button>\n</form>\n\
         <p><a href=\"/register\">Register a new account</a></p>\n",
        esc(email)
    )
}

pub async fn login_form(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    // Already logged in: straight to the dashboard.
    if state.auth.authenticate(session_id(&headers)).await.is_ok() {
        return Redirect::to("/dashboard").into_response();
    }

    // A valid remember-me cookie re-establishes the session without a form.
    if let Some(token) = cookie_value(&headers, REMEMBER_COOKIE) {
        if let Ok(new_session) = state.auth.resume(&token).await {
            return redirect_with_cookies("/dashboard", &[session_cookie(new_session)]);
        }
    }

    let flash = query
        .registered
        .map(|_| Flash::success("Registration successful! Please login to continue."));
    public_page("Login", flash.as_ref(), &login_body("")).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub remember_me: Option<String>,
}

pub async fn login_submit(
    State(state): State<SharedState>,
    Form(form): Form<LoginForm>,
) -> Response {
    // Validation failures re-render the form inline; the message never
    // touches the session.
    if form.email.is_empty() || form.password.is_empty() {
        let flash = Flash::error("Email and password are required.");
        return public_page("Login", Some(&flash), &login_body(&form.email)).into_response();
    }

    match state.auth.login(&form.email, &form.password, form.remember_me.is_some()).await {
        Ok(outcome) => {
            let mut cookies = vec![session_cookie(outcome.session_id)];
            if let Some(remember) = outcome.remember {
                cookies.push(remember_cookie(&remember.token, remember.expires));
            }
            redirect_with_cookies("/dashboard", &cookies)
        }
        Err(ClinicError::AuthenticationRequired) => {
            let flash = Flash::error("Invalid email or password.");
            public_page("Login", Some(&flash), &login_body(&form.email)).into_response()
        }
        Err(err) => {
            let flash = Flash::error(user_message(&err));
            public_page("Login", Some(&flash), &login_body(&form.email)).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
}

fn register_body(form: &RegisterForm) -> String {
    format!(
        "<h2>Register</h2>\n<form method=\"post\" action=\"/register\">\n\
         <label>First name <input name=\"first_name\" value=\"{}\"></label>\n\
         <label>Last name <input name=\"last_name\" value=\"{}\"></label>\n\
         <label>Email <input type=\"email\" name=\"email\" value=\"{}\"></label>\n\
         <label>Password <input type=\"password\" name=\"password\"></label>\n\
         <label>Confirm password <input type=\"password\" name=\"confirm_password\"></label>\n\
         <label>Phone <input name=\"phone\" value=\"{}\"></label>\n\
         <label>Specialization <input name=\"specialization\" value=\"{}\"></label>\n\
         <button type=\"submit\">Register</button>\n</form>\n\
         <p><a href=\"/login\">Back to login</a></p>\n",
        esc(&form.first_name),
        esc(&form.last_name),
        esc(&form.email),
        esc(form.phone.as_deref().unwrap_or("")),
        esc(form.specialization.as_deref().unwrap_or("")),
    )
}

pub async fn register_form(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if state.auth.authenticate(session_id(&headers)).await.is_ok() {
        return Redirect::to("/dashboard").into_response();
    }
    public_page("Register", None, &register_body(&RegisterForm::default())).into_response()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub async fn register_submit(
    State(state): State<SharedState>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let new_doctor = NewDoctor {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password.clone(),
        password_confirm: form.confirm_password.clone(),
        phone: non_empty(&form.phone),
        specialization: non_empty(&form.specialization),
        clinic_name: None,
        clinic_type: None,
    };

    match state.auth.register(&new_doctor).await {
        Ok(_) => Redirect::to("/login?registered=1").into_response(),
        Err(err) => {
            let flash = Flash::error(user_message(&err));
            public_page("Register", Some(&flash), &register_body(&form)).into_response()
        }
    }
}

pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Ok(ctx) = state.auth.authenticate(session_id(&headers)).await {
        if let Err(err) = state.auth.logout(&ctx).await {
            log::warn!("logout cleanup failed: {}", err);
        }
    }
    redirect_with_cookies("/", &[clear_cookie(SESSION_COOKIE), clear_cookie(REMEMBER_COOKIE)])
}
