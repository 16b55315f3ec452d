//! Per-request authentication context
//!
//! One `RequestContext` is created per request and travels in the request
//! extensions. Clones share state, so a user attached by one layer is seen by
//! every later layer and handler, and a login performed by a handler is seen
//! by the cookie session layer on the way out.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::Extensions;

use crate::types::SessionUser;

/// Cookie session state for the current request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub session_token: Option<String>,
    pub user_id: Option<String>,
    /// Set when a handler logged in or out during this request
    pub changed: bool,
}

impl SessionState {
    pub fn is_established(&self) -> bool {
        self.session_token.is_some()
    }
}

#[derive(Debug, Default)]
struct ContextState {
    user: Option<SessionUser>,
    session: SessionState,
}

/// Shared handle to the request's authentication state
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    inner: Arc<Mutex<ContextState>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context restored from an existing cookie session
    pub fn with_session(session_token: String, user_id: Option<String>) -> Self {
        let context = Self::new();
        {
            let mut state = context.lock();
            state.session.session_token = Some(session_token);
            state.session.user_id = user_id;
        }
        context
    }

    /// The request's context, inserting a fresh one if no layer created it yet
    pub fn get_or_insert(extensions: &mut Extensions) -> Self {
        if let Some(context) = extensions.get::<RequestContext>() {
            return context.clone();
        }
        let context = Self::new();
        extensions.insert(context.clone());
        context
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.lock().user.clone()
    }

    pub fn has_user(&self) -> bool {
        self.lock().user.is_some()
    }

    /// Attach a resolved user without touching the cookie session
    pub fn set_user(&self, user: SessionUser) {
        self.lock().user = Some(user);
    }

    pub fn session(&self) -> SessionState {
        self.lock().session.clone()
    }

    /// Start a cookie session for `user`
    pub fn log_in(&self, user: SessionUser) {
        let mut state = self.lock();
        state.session = SessionState {
            session_token: user.session_token.clone(),
            user_id: Some(user.object_id.clone()),
            changed: true,
        };
        state.user = Some(user);
    }

    /// End the cookie session and forget the user
    pub fn log_out(&self) {
        let mut state = self.lock();
        state.user = None;
        state.session = SessionState {
            changed: true,
            ..SessionState::default()
        };
    }
}
