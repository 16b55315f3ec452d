//! Authentication errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use leanweb_common::{Error, ErrorObject};

/// Authentication error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The BaaS refused the token or credentials (e.g. code 211, unknown user)
    #[error("{message}")]
    Rejected { code: i64, message: String },

    #[error("Session resolver request failed: {0}")]
    Request(String),

    #[error("Invalid session resolver response: {0}")]
    Response(String),

    #[error("Authentication required")]
    Unauthenticated,
}

/// BaaS rejections keep their upstream shape (code + message, no status) so
/// they render exactly as the BaaS reported them.
impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected { code, message } => Error::Structured(
                ErrorObject::new().with_code(code).with_message(message),
            ),
            AuthError::Unauthenticated => Error::status(StatusCode::UNAUTHORIZED, "Unauthorized"),
            other => Error::internal(&other),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        Error::from(self).into_response()
    }
}
