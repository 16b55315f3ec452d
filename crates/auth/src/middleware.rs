//! Session-token authentication middleware
//!
//! Clients that cannot hold the session cookie send their session token in
//! the `x-lc-session` header. The token is resolved to a user once per
//! request, before any route handler runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use leanweb_common::Error;

use crate::backend::AuthBackend;
use crate::context::RequestContext;

/// Header carrying the opaque session token
pub const SESSION_TOKEN_HEADER: &str = "x-lc-session";

/// Resolve the `x-lc-session` header into the request's user.
///
/// Passes straight through when the header is absent or a user is already
/// attached (e.g. from the cookie session). A resolver failure short-circuits
/// the chain and is rendered by the error layer.
pub async fn authenticate_session_token(
    State(backend): State<AuthBackend>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let context = RequestContext::get_or_insert(request.extensions_mut());

    let session_token = request
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
        .map(str::to_owned);

    let has_user = context.has_user();

    let session_token = match session_token {
        Some(token) if !has_user => token,
        _ => return Ok(next.run(request).await),
    };

    // Never log the token itself
    tracing::debug!(has_user, has_session_token = true, "Resolving session token");

    let user = backend.become_user(&session_token).await?;
    context.set_user(user);

    Ok(next.run(request).await)
}
