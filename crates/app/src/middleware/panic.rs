//! Panic recovery
//!
//! A panicking handler becomes a server fault like any other, so the error
//! layer logs it and renders the usual 500.

use std::any::Any;

use axum::response::{IntoResponse, Response};
use leanweb_common::{Error, ErrorObject};

/// Handler for `CatchPanicLayer::custom`
pub fn panic_to_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    Error::Structured(
        ErrorObject::new()
            .with_message(message.clone())
            .with_stack(format!("panic: {}", message)),
    )
    .into_response()
}
