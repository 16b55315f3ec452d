//! Authentication backend
//!
//! Wraps the `SessionResolver` that turns session tokens and credentials into
//! users. Domain states expose it via `FromRef`:
//! ```ignore
//! impl FromRef<AppState> for AuthBackend {
//!     fn from_ref(state: &AppState) -> Self {
//!         state.auth.clone()
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::error::AuthError;
use crate::types::SessionUser;

/// Resolves session tokens and credentials against the user store
#[async_trait::async_trait]
pub trait SessionResolver: Send + Sync {
    /// Resolve an existing session token to its user
    async fn become_user(&self, session_token: &str) -> Result<SessionUser, AuthError>;

    /// Authenticate credentials, returning the user with a fresh session token
    async fn log_in(&self, username: &str, password: &str) -> Result<SessionUser, AuthError>;
}

/// Cloneable handle to the configured `SessionResolver`.
#[derive(Clone)]
pub struct AuthBackend {
    resolver: Arc<dyn SessionResolver>,
}

impl AuthBackend {
    pub fn new(resolver: Arc<dyn SessionResolver>) -> Self {
        Self { resolver }
    }

    pub fn from_resolver(resolver: impl SessionResolver + 'static) -> Self {
        Self::new(Arc::new(resolver))
    }

    pub async fn become_user(&self, session_token: &str) -> Result<SessionUser, AuthError> {
        self.resolver.become_user(session_token).await
    }

    pub async fn log_in(&self, username: &str, password: &str) -> Result<SessionUser, AuthError> {
        self.resolver.log_in(username, password).await
    }
}

impl std::fmt::Debug for AuthBackend {
    #[mutants::skip] // Debug output only
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthBackend").finish_non_exhaustive()
    }
}
