//! Error normalization
//!
//! Handlers and inner layers fail with [`Error`], whose `IntoResponse` only
//! produces a provisional response and parks the error in the response
//! extensions. This layer sits outermost, picks the error back up and renders
//! the final response: plain text or JSON for XHR clients, the `error` view
//! for everyone else. Server faults (500) are logged with their stack, and
//! the stack never reaches the client.

use std::sync::Arc;

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    middleware::Next,
    response::{Html, IntoResponse, Json, Response},
};
use leanweb_common::{is_xhr, Error, Resolved};
use serde_json::json;

use crate::views::ViewRenderer;

/// State for [`render_errors`]
#[derive(Clone)]
pub struct ErrorRenderer {
    views: Arc<dyn ViewRenderer>,
}

impl ErrorRenderer {
    pub fn new(views: Arc<dyn ViewRenderer>) -> Self {
        Self { views }
    }

    /// Render the final response for `error`
    pub fn render(&self, mut error: Error, xhr: bool) -> Response {
        let Resolved { status, message } = error.resolve();

        if error.is_server_fault() {
            tracing::error!("{}", error.fault_report());
        }
        error.sanitize();

        if xhr {
            return match error {
                Error::Message(_) => (
                    status,
                    [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                    message,
                )
                    .into_response(),
                other => (status, Json(other.to_json())).into_response(),
            };
        }

        let context = json!({ "message": message, "error": {} });
        match self.views.render("error", &context) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error view");
                (status, message).into_response()
            }
        }
    }
}

impl std::fmt::Debug for ErrorRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorRenderer").finish_non_exhaustive()
    }
}

/// A 4xx/5xx the framework produced on its own, with nothing in the body
fn is_bare_failure(response: &Response) -> bool {
    let status = response.status();
    (status.is_client_error() || status.is_server_error())
        && response.body().size_hint().exact() == Some(0)
}

/// Re-render any error raised further down the chain.
///
/// Bodiless 4xx/5xx responses from the framework are treated as
/// `Error::Code(status)`. Headers set on the provisional response (cookies
/// in particular) are carried over; the body and its content headers are
/// replaced.
pub async fn render_errors(
    State(renderer): State<ErrorRenderer>,
    request: Request,
    next: Next,
) -> Response {
    let xhr = is_xhr(request.headers());

    let mut response = next.run(request).await;
    let error = match response.extensions_mut().remove::<Error>() {
        Some(error) => error,
        None if is_bare_failure(&response) => Error::Code(response.status().as_u16()),
        None => return response,
    };

    let (parts, _body) = response.into_parts();
    let mut rendered = renderer.render(error, xhr);

    for (name, value) in parts.headers.iter() {
        if name == CONTENT_TYPE || name == CONTENT_LENGTH {
            continue;
        }
        rendered.headers_mut().append(name.clone(), value.clone());
    }

    rendered
}
