//! Leanweb application composition root
//!
//! Wires the session layers, the error normalizer and the routes into a
//! single router. Layer order, outermost first:
//!
//! 1. error rendering
//! 2. request tracing
//! 3. HTTPS redirect
//! 4. cookie session
//! 5. session-token authentication
//! 6. multipart parsing
//! 7. panic recovery

pub mod middleware;
pub mod routes;
pub mod views;

use std::sync::Arc;

use axum::{extract::FromRef, Router};
use leanweb_auth::{authenticate_session_token, cookie_session, AuthBackend, CookieSession};
use leanweb_common::{Config, LogFormat};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::middleware::{
    panic_to_error, parse_multipart_fields, redirect_to_https, render_errors, ErrorRenderer,
    HttpsPolicy,
};
use crate::views::{TemplateViews, ViewError, ViewRenderer};

/// Router state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthBackend,
}

impl FromRef<AppState> for AuthBackend {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Create the main application router with all routes and middleware
pub fn create_app(config: &Config, backend: AuthBackend, views: Arc<dyn ViewRenderer>) -> Router {
    let state = AppState {
        auth: backend.clone(),
    };

    with_middleware(routes::routes().with_state(state), config, backend, views)
}

/// Wrap `router` in the full middleware chain
pub fn with_middleware(
    router: Router,
    config: &Config,
    backend: AuthBackend,
    views: Arc<dyn ViewRenderer>,
) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                ErrorRenderer::new(views),
                render_errors,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(axum::middleware::from_fn_with_state(
                HttpsPolicy::from_config(config),
                redirect_to_https,
            ))
            .layer(axum::middleware::from_fn_with_state(
                CookieSession::from_config(config, backend.clone()),
                cookie_session,
            ))
            .layer(axum::middleware::from_fn_with_state(
                backend,
                authenticate_session_token,
            ))
            .layer(axum::middleware::from_fn(parse_multipart_fields))
            .layer(CatchPanicLayer::custom(panic_to_error)),
    )
}

/// Views from `VIEWS_DIR`, or the built-in templates when unset
pub fn build_views(config: &Config) -> Result<Arc<dyn ViewRenderer>, ViewError> {
    let views = match &config.views_dir {
        Some(dir) => TemplateViews::load(dir)?,
        None => TemplateViews::builtin(),
    };
    Ok(Arc::new(views))
}

/// Install the global tracing subscriber
#[mutants::skip] // Global side effect only
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.rust_log.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}
