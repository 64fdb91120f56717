//! Small helpers shared across modules.
//!
//! - **URL validation**: scheme and shape checks for feed endpoints
//! - **Text processing**: character-budget truncation and control-char stripping

mod text;
mod url_validator;

pub use text::{strip_control_chars, truncate_chars};
pub use url_validator::{validate_url, UrlValidationError};
