//! Multipart form parsing
//!
//! `multipart/form-data` bodies are parsed up front into [`FormFields`] so
//! handlers read text fields the same way regardless of encoding. File parts
//! are not accepted anywhere.

use axum::{
    body::Body,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        request::Parts,
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};
use leanweb_common::{Error, ErrorObject};

/// Text fields of a multipart body, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields(pub Vec<(String, String)>);

impl FormFields {
    /// First value submitted for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parsed fields, or empty when the request was not multipart
impl<S> FromRequestParts<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<FormFields>().cloned().unwrap_or_default())
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn malformed(message: impl Into<String>) -> Error {
    Error::Structured(
        ErrorObject::new()
            .with_status(400)
            .with_message(message),
    )
}

fn unexpected_file(field: &str) -> Error {
    Error::Structured(
        ErrorObject::new()
            .with_status(400)
            .with_code("LIMIT_UNEXPECTED_FILE")
            .with_message("Unexpected field")
            .with_field("field", field),
    )
}

/// Consume a multipart body into [`FormFields`]; the downstream request gets
/// an empty body.
pub async fn parse_multipart_fields(request: Request, next: Next) -> Result<Response, Error> {
    if !is_multipart(request.headers()) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();

    let mut inner = Request::new(body);
    if let Some(content_type) = parts.headers.get(CONTENT_TYPE) {
        inner
            .headers_mut()
            .insert(CONTENT_TYPE, content_type.clone());
    }

    let mut multipart = Multipart::from_request(inner, &())
        .await
        .map_err(|e| malformed(e.body_text()))?;

    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| malformed(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if field.file_name().is_some() {
            tracing::debug!(field = %name, "Rejecting file upload");
            return Err(unexpected_file(&name));
        }
        let value = field.text().await.map_err(|e| malformed(e.body_text()))?;
        fields.push((name, value));
    }

    parts.headers.remove(CONTENT_LENGTH);
    parts.extensions.insert(FormFields(fields));

    Ok(next.run(Request::from_parts(parts, Body::empty())).await)
}
