// lib/src/auth/mod.rs
//! Authentication: credential verification, password hashing, remember-me
//! tokens, and the session guard every protected request runs first.

use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{info, warn};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use models::errors::{ClinicError, ClinicResult};
use models::{Doctor, NewDoctor};

use crate::session::SessionStore;
use crate::storage::ClinicStore;

const SALT_LEN: usize = 16;
const REMEMBER_TOKEN_LEN: usize = 32;

/// Request-scoped authenticated identity. Passed explicitly into every
/// operation; there is no ambient "current doctor" anywhere.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session_id: Uuid,
    pub doctor_id: i32,
    pub doctor_name: String,
}

#[cfg(test)]
impl AuthContext {
    /// Bare context for exercising store operations without a login flow.
    pub fn for_doctor(doctor_id: i32) -> Self {
        AuthContext {
            session_id: Uuid::new_v4(),
            doctor_id,
            doctor_name: format!("Doctor {}", doctor_id),
        }
    }
}

/// Salted SHA-256 digest in the form `salt$digest`, both hex.
pub fn hash_password(raw: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{}${}", hex::encode(salt), digest_with_salt(&salt, raw))
}

pub fn verify_password(raw: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    digest_with_salt(&salt, raw) == digest_hex
}

fn digest_with_salt(salt: &[u8], raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Remember-me tokens are stored hashed; only the cookie carries the raw
/// value.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Raw remember-me token handed back to the HTTP layer for the cookie.
#[derive(Debug, Clone)]
pub struct RememberToken {
    pub token: String,
    pub expires: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_id: Uuid,
    pub remember: Option<RememberToken>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn ClinicStore>,
    sessions: SessionStore,
    remember_days: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn ClinicStore>, sessions: SessionStore, remember_days: i64) -> Self {
        AuthService { store, sessions, remember_days }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Registers a new doctor. Validation happens before any write; a
    /// duplicate email is a `Conflict`.
    pub async fn register(&self, new: &NewDoctor) -> ClinicResult<i32> {
        new.validate()?;
        if self.store.find_doctor_by_email(&new.email).await?.is_some() {
            return Err(ClinicError::Conflict(format!(
                "an account with email {} already exists",
                new.email
            )));
        }
        let password_hash = hash_password(&new.password);
        let id = self.store.insert_doctor(new, &password_hash).await?;
        info!("Registered doctor {} ({})", id, new.email);
        Ok(id)
    }

    /// Verifies credentials and opens a session. The failure message never
    /// says which of email or password was wrong.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> ClinicResult<LoginOutcome> {
        let doctor = match self.store.find_doctor_by_email(email).await? {
            Some(doctor) if verify_password(password, &doctor.password_hash) => doctor,
            _ => {
                warn!("Failed login attempt for {}", email);
                return Err(ClinicError::AuthenticationRequired);
            }
        };

        let session_id = self.sessions.create(doctor.id, &doctor.display_name()).await;
        self.store.touch_last_login(doctor.id).await?;

        let remember = if remember_me {
            Some(self.issue_remember_token(doctor.id).await?)
        } else {
            None
        };

        info!("Doctor {} logged in", doctor.id);
        Ok(LoginOutcome { session_id, remember })
    }

    async fn issue_remember_token(&self, doctor_id: i32) -> ClinicResult<RememberToken> {
        let mut bytes = [0u8; REMEMBER_TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let expires = Utc::now() + Duration::days(self.remember_days);
        self.store
            .set_remember_token(doctor_id, &hash_token(&token), expires)
            .await?;
        Ok(RememberToken { token, expires })
    }

    /// Re-establishes a session from an unexpired remember-me cookie.
    pub async fn resume(&self, raw_token: &str) -> ClinicResult<Uuid> {
        let doctor = self
            .store
            .find_doctor_by_remember_token(&hash_token(raw_token))
            .await?
            .ok_or(ClinicError::AuthenticationRequired)?;
        let session_id = self.sessions.create(doctor.id, &doctor.display_name()).await;
        self.store.touch_last_login(doctor.id).await?;
        Ok(session_id)
    }

    /// The auth guard. Resolves a session cookie into an `AuthContext`, or
    /// fails closed with `AuthenticationRequired` before any datastore work.
    pub async fn authenticate(&self, session_id: Option<Uuid>) -> ClinicResult<AuthContext> {
        let id = session_id.ok_or(ClinicError::AuthenticationRequired)?;
        let session = self
            .sessions
            .get(id)
            .await
            .ok_or(ClinicError::AuthenticationRequired)?;
        Ok(AuthContext {
            session_id: session.id,
            doctor_id: session.doctor_id,
            doctor_name: session.doctor_name,
        })
    }

    /// Fetches the doctor behind a context. A session whose doctor has been
    /// deleted out-of-band is destroyed and reported as stale; a page must
    /// never render with a null doctor identity.
    pub async fn load_profile(&self, ctx: &AuthContext) -> ClinicResult<Doctor> {
        match self.store.find_doctor(ctx.doctor_id).await? {
            Some(doctor) => Ok(doctor),
            None => {
                warn!("Session {} references missing doctor {}", ctx.session_id, ctx.doctor_id);
                self.sessions.destroy(ctx.session_id).await;
                Err(ClinicError::StaleSession)
            }
        }
    }

    pub async fn logout(&self, ctx: &AuthContext) -> ClinicResult<()> {
        self.sessions.destroy(ctx.session_id).await;
        self.store.clear_remember_token(ctx.doctor_id).await?;
        info!("Doctor {} logged out", ctx.doctor_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn registration(email: &str) -> NewDoctor {
        NewDoctor {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: email.to_string(),
            password: "admin123".to_string(),
            password_confirm: "admin123".to_string(),
            phone: None,
            specialization: Some("General Medicine".to_string()),
            clinic_name: None,
            clinic_type: None,
        }
    }

    fn service() -> AuthService {
        let store: Arc<dyn ClinicStore> = Arc::new(MemoryStore::new());
        AuthService::new(store, SessionStore::new(60), 30)
    }

    #[test]
    fn password_hash_round_trip() {
        let stored = hash_password("admin123");
        assert!(verify_password("admin123", &stored));
        assert!(!verify_password("admin124", &stored));
        assert!(!verify_password("admin123", "garbage-without-separator"));
    }

    #[test]
    fn same_password_hashes_differently_per_salt() {
        assert_ne!(hash_password("admin123"), hash_password("admin123"));
    }

    #[tokio::test]
    async fn register_then_login() {
        let auth = service();
        auth.register(&registration("a@clinic.test")).await.unwrap();

        let outcome = auth.login("a@clinic.test", "admin123", false).await.unwrap();
        let ctx = auth.authenticate(Some(outcome.session_id)).await.unwrap();
        assert_eq!(ctx.doctor_name, "John Smith");
        assert!(outcome.remember.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let auth = service();
        auth.register(&registration("a@clinic.test")).await.unwrap();
        let err = auth.register(&registration("a@clinic.test")).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_uniform_failure() {
        let auth = service();
        auth.register(&registration("a@clinic.test")).await.unwrap();
        let err = auth.login("a@clinic.test", "wrong", false).await.unwrap_err();
        assert_eq!(err, ClinicError::AuthenticationRequired);
        let err = auth.login("nobody@clinic.test", "admin123", false).await.unwrap_err();
        assert_eq!(err, ClinicError::AuthenticationRequired);
    }

    #[tokio::test]
    async fn guard_rejects_missing_and_unknown_sessions() {
        let auth = service();
        assert_eq!(
            auth.authenticate(None).await.unwrap_err(),
            ClinicError::AuthenticationRequired
        );
        assert_eq!(
            auth.authenticate(Some(Uuid::new_v4())).await.unwrap_err(),
            ClinicError::AuthenticationRequired
        );
    }

    #[tokio::test]
    async fn remember_token_resumes_a_session() {
        let auth = service();
        auth.register(&registration("a@clinic.test")).await.unwrap();
        let outcome = auth.login("a@clinic.test", "admin123", true).await.unwrap();
        let remember = outcome.remember.unwrap();

        let session_id = auth.resume(&remember.token).await.unwrap();
        let ctx = auth.authenticate(Some(session_id)).await.unwrap();
        assert_eq!(ctx.doctor_name, "John Smith");

        // A tampered token does not resume anything.
        assert!(auth.resume("deadbeef").await.is_err());
    }

    #[tokio::test]
    async fn logout_destroys_session_and_token() {
        let auth = service();
        auth.register(&registration("a@clinic.test")).await.unwrap();
        let outcome = auth.login("a@clinic.test", "admin123", true).await.unwrap();
        let remember = outcome.remember.unwrap();
        let ctx = auth.authenticate(Some(outcome.session_id)).await.unwrap();

        auth.logout(&ctx).await.unwrap();
        assert!(auth.authenticate(Some(outcome.session_id)).await.is_err());
        assert!(auth.resume(&remember.token).await.is_err());
    }

    #[tokio::test]
    async fn stale_session_is_destroyed_on_profile_load() {
        // A context pointing at a doctor id that never existed.
        let auth = service();
        let session_id = auth.sessions().create(999, "Ghost Doctor").await;
        let ctx = auth.authenticate(Some(session_id)).await.unwrap();

        let err = auth.load_profile(&ctx).await.unwrap_err();
        assert_eq!(err, ClinicError::StaleSession);
        assert!(auth.authenticate(Some(session_id)).await.is_err());
    }
}
