//! Mock Session Resolver Implementation
//!
//! In-memory resolver for tests and local development. Knows a fixed set of
//! tokens and credentials and counts every call it receives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::SessionResolver;
use crate::error::AuthError;
use crate::types::SessionUser;

/// Mock session resolver for testing
#[derive(Debug, Clone, Default)]
pub struct MockSessionResolver {
    sessions: HashMap<String, SessionUser>,
    credentials: HashMap<(String, String), SessionUser>,
    calls: Arc<AtomicUsize>,
}

impl MockSessionResolver {
    /// Create a resolver that knows no users
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user reachable by `session_token`
    pub fn with_session(mut self, session_token: &str, user: SessionUser) -> Self {
        let user = user.with_session_token(session_token);
        self.sessions.insert(session_token.to_string(), user);
        self
    }

    /// Register credentials that log in as `user` (which must carry a token)
    pub fn with_credentials(mut self, username: &str, password: &str, user: SessionUser) -> Self {
        self.credentials
            .insert((username.to_string(), password.to_string()), user);
        self
    }

    /// Number of resolver calls so far, shared across clones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionResolver for MockSessionResolver {
    async fn become_user(&self, session_token: &str) -> Result<SessionUser, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Mock resolver resolving session token");

        self.sessions
            .get(session_token)
            .cloned()
            .ok_or_else(|| AuthError::Rejected {
                code: 211,
                message: "Could not find user.".to_string(),
            })
    }

    async fn log_in(&self, username: &str, password: &str) -> Result<SessionUser, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.credentials
            .get(&(username.to_string(), password.to_string()))
            .cloned()
            .ok_or_else(|| AuthError::Rejected {
                code: 210,
                message: "The username and password mismatch.".to_string(),
            })
    }
}
