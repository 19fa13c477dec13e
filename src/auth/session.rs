use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub const SESSION_TTL_HOURS: i64 = 8;

/// A bearer session minted at login. Expiry is fixed at creation time; there
/// is no renewal.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub employee_id: String,
    pub employee_name: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is dead at its exact expiry instant, not one tick later.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-lifetime token -> session map. Expired entries are evicted lazily
/// on resolve; there is no background sweep.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, employee_id: &str, employee_name: &str) -> Session {
        let session = Session {
            token: Uuid::new_v4().to_string(),
            employee_id: employee_id.to_string(),
            employee_name: employee_name.to_string(),
            expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
        };

        self.sessions
            .write()
            .unwrap()
            .insert(session.token.clone(), session.clone());

        session
    }

    pub fn resolve(&self, token: &str) -> Option<Session> {
        self.resolve_at(token, Utc::now())
    }

    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap();

        match sessions.get(token) {
            Some(session) if session.is_expired_at(now) => {
                sessions.remove(token);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.write().unwrap().remove(token);
    }

    #[cfg(test)]
    pub fn insert(&self, session: Session) {
        self.sessions
            .write()
            .unwrap()
            .insert(session.token.clone(), session);
    }
}
