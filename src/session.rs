use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Closed,
}

/// One approved check-in. `Open -> Closed` is the only transition; a closed
/// session is never reopened.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub name: String,
    pub class: String,
    pub roll: String,
    pub code: String,
    pub started_at: DateTime<Utc>,
    pub confidence: f32,
    pub state: SessionState,
}

/// Registry of check-in sessions. Closed sessions are retained so a repeat
/// close reports `AlreadyClosed` rather than `NotFound`.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for an approved identity. Any prior open session for
    /// the same name is closed first, so an identity has at most one open
    /// session.
    pub fn open(&self, identity: &Identity, confidence: f32) -> Result<Session> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| Error::Internal("session registry poisoned".into()))?;

        for session in inner.values_mut() {
            if session.name == identity.name && session.state == SessionState::Open {
                session.state = SessionState::Closed;
            }
        }

        let session = Session {
            session_id: uuid::Uuid::new_v4().simple().to_string(),
            name: identity.name.clone(),
            class: identity.class.clone(),
            roll: identity.roll.clone(),
            code: identity.code.clone(),
            started_at: Utc::now(),
            confidence,
            state: SessionState::Open,
        };
        inner.insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    pub fn close(&self, session_id: &str) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| Error::Internal("session registry poisoned".into()))?;
        let session = inner
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(format!("session '{session_id}'")))?;
        if session.state == SessionState::Closed {
            return Err(Error::AlreadyClosed);
        }
        session.state = SessionState::Closed;
        Ok(())
    }

    pub fn lookup(&self, session_id: &str) -> Option<Session> {
        self.inner.lock().ok()?.get(session_id).cloned()
    }
}
