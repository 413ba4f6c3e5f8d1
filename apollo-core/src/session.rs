use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    started_at: Option<DateTime<Utc>>,
}

/// Per-user session state: the API bearer token and the failed-login
/// counter. Created once and handed to whatever needs it; `start` at login,
/// `clear` at logout.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: RwLock<SessionState>,
    failed_logins: AtomicU32,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an authenticated session. Resets the failed-login counter.
    pub fn start(&self, token: impl Into<String>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.token = Some(token.into());
        state.started_at = Some(Utc::now());
        self.failed_logins.store(0, Ordering::SeqCst);
        tracing::debug!("Session started");
    }

    pub fn token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .token
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).started_at
    }

    /// Returns the new count.
    pub fn record_failed_login(&self) -> u32 {
        self.failed_logins.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn failed_logins(&self) -> u32 {
        self.failed_logins.load(Ordering::SeqCst)
    }

    pub fn reset_failed_logins(&self) {
        self.failed_logins.store(0, Ordering::SeqCst);
    }

    /// Logout: drop the token and every counter.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = SessionState::default();
        self.failed_logins.store(0, Ordering::SeqCst);
        tracing::debug!("Session cleared");
    }
}
