//! HTTP routes

use axum::{
    extract::{Form, FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    routing::{get, post},
    Json, Router,
};
use leanweb_auth::{AuthBackend, CurrentUser, RequestContext, SessionUser};
use leanweb_common::Error;
use serde::Deserialize;

use crate::middleware::FormFields;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "Leanweb v0.0.1-SNAPSHOT" }))
        .route("/health", get(health_check))
        .route("/api/login", post(log_in))
        .route("/api/logout", post(log_out))
        .route("/api/users/me", get(current_user))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> Error {
    Error::status(StatusCode::NOT_FOUND, "Not Found")
}

async fn method_not_allowed() -> Error {
    Error::status(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Login credentials, accepted as JSON, urlencoded or multipart fields
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl<S> FromRequest<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(fields) = req.extensions().get::<FormFields>() {
            return match (fields.get("username"), fields.get("password")) {
                (Some(username), Some(password)) => Ok(Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
                _ => Err(Error::message("username and password are required")),
            };
        }

        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            Json::<Credentials>::from_request(req, state)
                .await
                .map(|Json(c)| c)
                .map_err(|e| Error::status(e.status(), e.body_text()))
        } else {
            Form::<Credentials>::from_request(req, state)
                .await
                .map(|Form(c)| c)
                .map_err(|e| Error::status(e.status(), e.body_text()))
        }
    }
}

/// Log in against the BaaS and start a cookie session
async fn log_in(
    State(backend): State<AuthBackend>,
    context: RequestContext,
    credentials: Credentials,
) -> Result<Json<SessionUser>, Error> {
    let user = backend
        .log_in(&credentials.username, &credentials.password)
        .await?;

    tracing::debug!(user_id = %user.object_id, "Starting cookie session");
    context.log_in(user.clone());

    Ok(Json(user))
}

async fn log_out(context: RequestContext) -> StatusCode {
    if let Some(user) = context.user() {
        tracing::info!(user_id = %user.object_id, "User logged out");
    }
    context.log_out();
    StatusCode::NO_CONTENT
}

async fn current_user(CurrentUser(user): CurrentUser) -> Json<SessionUser> {
    Json(user.without_session_token())
}
