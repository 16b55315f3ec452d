//! Application-level middleware

pub mod errors;
pub mod https;
pub mod multipart;
pub mod panic;

pub use errors::{render_errors, ErrorRenderer};
pub use https::{redirect_to_https, HttpsPolicy};
pub use multipart::{parse_multipart_fields, FormFields};
pub use panic::panic_to_error;
