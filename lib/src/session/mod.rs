// lib/src/session/mod.rs
//! In-process session store. Holds the authenticated doctor's identity for
//! the life of a browser session plus the one-shot flash slot delivered
//! across a single redirect.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Deserialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashKind {
    Success,
    Error,
}

/// A one-shot status message. Set by a mutating request before its
/// redirect, consumed (and unconditionally cleared) by the next render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Flash { kind: FlashKind::Success, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Flash { kind: FlashKind::Error, text: text.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub doctor_id: i32,
    pub doctor_name: String,
    flash: Option<Flash>,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        SessionStore {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Creates a session for a freshly authenticated doctor and returns its id.
    pub async fn create(&self, doctor_id: i32, doctor_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let session = Session {
            id,
            doctor_id,
            doctor_name: doctor_name.to_string(),
            flash: None,
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(id, session);
        id
    }

    /// Resolves a session id. Expired sessions are dropped on access and
    /// treated as absent.
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        let expired = {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                Some(session) if session.expires_at > Utc::now() => return Some(session.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.sessions.write().await.remove(&id);
        }
        None
    }

    pub async fn destroy(&self, id: Uuid) {
        self.sessions.write().await.remove(&id);
    }

    /// Stores the flash for delivery on the next render, replacing any
    /// message an earlier operation left behind.
    pub async fn set_flash(&self, id: Uuid, flash: Flash) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.flash = Some(flash);
        }
    }

    /// Takes the flash out of the session. The slot is cleared even when
    /// the caller discards the value, so a message can never be shown twice.
    pub async fn take_flash(&self, id: Uuid) -> Option<Flash> {
        self.sessions.write().await.get_mut(&id).and_then(|s| s.flash.take())
    }

    /// Drops every expired session. Callers decide the sweep cadence.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_round_trip() {
        let store = SessionStore::new(60);
        let id = store.create(1, "John Smith").await;
        let session = store.get(id).await.unwrap();
        assert_eq!(session.doctor_id, 1);
        assert_eq!(session.doctor_name, "John Smith");

        store.destroy(id).await;
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn unknown_session_is_absent() {
        let store = SessionStore::new(60);
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn expired_session_is_dropped_on_access() {
        let store = SessionStore::new(-1); // already expired at creation
        let id = store.create(1, "John Smith").await;
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn flash_is_delivered_exactly_once() {
        let store = SessionStore::new(60);
        let id = store.create(1, "John Smith").await;

        store.set_flash(id, Flash::success("Patient added successfully.")).await;
        let flash = store.take_flash(id).await.unwrap();
        assert_eq!(flash.kind, FlashKind::Success);
        assert_eq!(flash.text, "Patient added successfully.");

        // The very next read sees nothing.
        assert!(store.take_flash(id).await.is_none());
    }

    #[tokio::test]
    async fn newer_flash_replaces_older_one() {
        let store = SessionStore::new(60);
        let id = store.create(1, "John Smith").await;

        store.set_flash(id, Flash::success("first")).await;
        store.set_flash(id, Flash::error("second")).await;
        let flash = store.take_flash(id).await.unwrap();
        assert_eq!(flash, Flash::error("second"));
        assert!(store.take_flash(id).await.is_none());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_sessions() {
        let live = SessionStore::new(60);
        let id = live.create(1, "John Smith").await;
        assert_eq!(live.purge_expired().await, 0);
        assert!(live.get(id).await.is_some());
    }
}
