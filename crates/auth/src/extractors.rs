//! Axum extractors for authentication
//!
//! Both extractors read the `RequestContext` populated by the session layers,
//! so they work with any router state.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::context::RequestContext;
use crate::error::AuthError;
use crate::types::SessionUser;

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(RequestContext::get_or_insert(&mut parts.extensions))
    }
}

/// Authenticated user extractor.
///
/// Rejects with 401 when neither the cookie session nor the session-token
/// header produced a user.
#[derive(Debug)]
pub struct CurrentUser(pub SessionUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        RequestContext::get_or_insert(&mut parts.extensions)
            .user()
            .map(CurrentUser)
            .ok_or(AuthError::Unauthenticated)
    }
}
