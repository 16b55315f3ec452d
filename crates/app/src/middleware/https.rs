//! HTTPS enforcement for staging and production

use axum::{
    extract::{Request, State},
    http::{
        header::{HOST, LOCATION},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use leanweb_common::Config;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// State for [`redirect_to_https`]
#[derive(Debug, Clone, Copy)]
pub struct HttpsPolicy {
    enforce: bool,
    trust_proxy: bool,
}

impl HttpsPolicy {
    pub fn new(enforce: bool, trust_proxy: bool) -> Self {
        Self {
            enforce,
            trust_proxy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.env.enforces_https(), config.trust_proxy)
    }

    fn is_secure(&self, request: &Request) -> bool {
        if request.uri().scheme_str() == Some("https") {
            return true;
        }
        if !self.trust_proxy {
            return false;
        }
        request
            .headers()
            .get(FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
    }
}

/// Redirect plain-HTTP requests to the same URL over HTTPS (302).
///
/// A request without a `Host` header cannot be redirected and is served as is.
pub async fn redirect_to_https(
    State(policy): State<HttpsPolicy>,
    request: Request,
    next: Next,
) -> Response {
    if !policy.enforce || policy.is_secure(&request) {
        return next.run(request).await;
    }

    let host = match request.headers().get(HOST).and_then(|v| v.to_str().ok()) {
        Some(host) => host.to_string(),
        None => return next.run(request).await,
    };
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let location = format!("https://{}{}", host, path);
    tracing::debug!(location = %location, "Redirecting to HTTPS");

    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}
