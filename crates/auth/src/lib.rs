//! Session authentication for Leanweb
//!
//! Provides the session-token authenticator, signed cookie sessions, and the
//! per-request context they populate. Session tokens are resolved to users by
//! a `SessionResolver`, reachable from any state implementing `FromRef<S>`
//! for `AuthBackend`.

mod backend;
mod config;
mod context;
mod error;
mod extractors;
pub mod leancloud;
mod middleware;
pub mod mock;
mod session;
mod types;

pub use backend::{AuthBackend, SessionResolver};
pub use config::AuthConfig;
pub use context::{RequestContext, SessionState};
pub use error::AuthError;
pub use extractors::CurrentUser;
pub use leancloud::LeanCloudResolver;
pub use middleware::{authenticate_session_token, SESSION_TOKEN_HEADER};
pub use mock::MockSessionResolver;
pub use session::{cookie_session, CookieSession, SESSION_COOKIE, SIGNATURE_COOKIE};
pub use types::SessionUser;
