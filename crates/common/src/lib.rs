//! Shared utilities, configuration, and error handling for Leanweb
//!
//! This crate provides common functionality used across the Leanweb application:
//! - Configuration management following 12-factor principles
//! - The normalized error type every layer and handler reports through
//! - Cookie signing for the session cookie

pub mod config;
pub mod crypto;
pub mod error;

pub use config::{Config, Environment, LogFormat, SESSION_MAX_AGE};
pub use crypto::{sign_cookie, verify_cookie_signature};
pub use error::{is_xhr, Error, ErrorObject, Resolved, Result, GENERIC_CODE_MESSAGE};
