//! Signed cookie sessions
//!
//! The session cookie holds a base64url JSON payload with the session token;
//! a companion `.sig` cookie holds its HMAC-SHA256 signature. Cookies that
//! fail verification are ignored and cleared on the way out.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use leanweb_common::{sign_cookie, verify_cookie_signature, Config};
use serde::{Deserialize, Serialize};

use crate::backend::AuthBackend;
use crate::context::{RequestContext, SessionState};

pub const SESSION_COOKIE: &str = "leanweb.sess";
pub const SIGNATURE_COOKIE: &str = "leanweb.sess.sig";

/// Cookie payload
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
    session_token: String,
}

/// What the incoming cookies carried
#[derive(Debug)]
enum LoadedSession {
    Absent,
    Invalid,
    Valid(SessionPayload),
}

/// Cookie session settings, shared by every request
#[derive(Clone, Debug)]
pub struct CookieSession {
    secret: String,
    max_age: Duration,
    fetch_user: bool,
    secure: bool,
    backend: AuthBackend,
}

impl CookieSession {
    pub fn new(secret: impl Into<String>, max_age: Duration, backend: AuthBackend) -> Self {
        Self {
            secret: secret.into(),
            max_age,
            fetch_user: true,
            secure: false,
            backend,
        }
    }

    /// Session settings from app configuration: 5-day cookies, users fetched
    /// eagerly, `Secure` cookies outside development
    pub fn from_config(config: &Config, backend: AuthBackend) -> Self {
        Self::new(config.secret.clone(), config.session_max_age, backend)
            .with_secure(config.env.enforces_https())
    }

    /// Resolve the session's user on every request
    pub fn with_fetch_user(mut self, fetch_user: bool) -> Self {
        self.fetch_user = fetch_user;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    fn load(&self, headers: &HeaderMap) -> LoadedSession {
        let value = match find_cookie(headers, SESSION_COOKIE) {
            Some(value) => value,
            None => return LoadedSession::Absent,
        };

        let signature = match find_cookie(headers, SIGNATURE_COOKIE) {
            Some(signature) => signature,
            None => return LoadedSession::Invalid,
        };

        if !verify_cookie_signature(&self.secret, SESSION_COOKIE, &value, &signature) {
            tracing::debug!("Session cookie signature mismatch");
            return LoadedSession::Invalid;
        }

        URL_SAFE_NO_PAD
            .decode(value.as_bytes())
            .ok()
            .and_then(|bytes| serde_json::from_slice::<SessionPayload>(&bytes).ok())
            .map(LoadedSession::Valid)
            .unwrap_or(LoadedSession::Invalid)
    }

    /// `Set-Cookie` values for the session state after the request
    fn set_cookies(&self, session: &SessionState) -> Vec<Cookie<'static>> {
        let payload = match &session.session_token {
            Some(session_token) => SessionPayload {
                uid: session.user_id.clone(),
                session_token: session_token.clone(),
            },
            None => return self.clear_cookies(),
        };

        let json = match serde_json::to_vec(&payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode session cookie");
                return self.clear_cookies();
            }
        };
        let value = URL_SAFE_NO_PAD.encode(json);
        let signature = match sign_cookie(&self.secret, SESSION_COOKIE, &value) {
            Some(signature) => signature,
            None => {
                tracing::error!("Failed to sign session cookie");
                return self.clear_cookies();
            }
        };

        let max_age = CookieDuration::seconds(self.max_age.as_secs() as i64);
        vec![
            self.cookie(SESSION_COOKIE, value, max_age),
            self.cookie(SIGNATURE_COOKIE, signature, max_age),
        ]
    }

    fn clear_cookies(&self) -> Vec<Cookie<'static>> {
        vec![
            self.cookie(SESSION_COOKIE, String::new(), CookieDuration::ZERO),
            self.cookie(SIGNATURE_COOKIE, String::new(), CookieDuration::ZERO),
        ]
    }

    fn cookie(&self, name: &'static str, value: String, max_age: CookieDuration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .max_age(max_age)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

/// Restore the cookie session into the request context, and write the
/// session cookies back when a handler logged in or out.
pub async fn cookie_session(
    State(session): State<CookieSession>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut clear_stale = false;

    let context = match session.load(request.headers()) {
        LoadedSession::Absent => RequestContext::new(),
        LoadedSession::Invalid => {
            clear_stale = true;
            RequestContext::new()
        }
        LoadedSession::Valid(payload) => {
            if session.fetch_user {
                match session.backend.become_user(&payload.session_token).await {
                    Ok(user) => {
                        let context =
                            RequestContext::with_session(payload.session_token, payload.uid);
                        context.set_user(user);
                        context
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping session with unresolvable token");
                        clear_stale = true;
                        RequestContext::new()
                    }
                }
            } else {
                RequestContext::with_session(payload.session_token, payload.uid)
            }
        }
    };

    request.extensions_mut().insert(context.clone());

    let mut response = next.run(request).await;

    let state = context.session();
    let cookies = if state.changed {
        session.set_cookies(&state)
    } else if clear_stale {
        session.clear_cookies()
    } else {
        Vec::new()
    };

    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Invalid Set-Cookie header value"),
        }
    }

    response
}

/// Find a cookie value across all `Cookie` headers
fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
