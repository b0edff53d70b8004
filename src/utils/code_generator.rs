//! Short code generation and validation utilities.
//!
//! Provides cryptographically secure random code generation and validation
//! for custom user-provided codes.

use crate::error::AppError;
use base64::Engine as _;
use serde_json::json;

/// Length of random bytes before base64 encoding.
const CODE_LENGTH_BYTES: usize = 9;

/// Maximum length of a custom short code.
const MAX_CUSTOM_CODE_LEN: usize = 64;

/// Reserved codes that cannot be used as short links.
///
/// These are the first path segments of fixed routes.
pub const RESERVED_CODES: &[&str] = &["health", "track", "destination", "api", "static"];

/// Generates a cryptographically secure random short code.
///
/// Uses `getrandom` for entropy and encodes the result as URL-safe base64
/// without padding, producing a 12-character code.
///
/// # Panics
///
/// Panics if the system random number generator fails (extremely rare).
///
/// # Examples
///
/// ```ignore
/// let code = generate_code();
/// assert_eq!(code.len(), 12);
/// assert!(code.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_'));
/// ```
pub fn generate_code() -> String {
    let mut buffer = [0u8; CODE_LENGTH_BYTES];

    getrandom::fill(&mut buffer).expect("Failed to generate random bytes");

    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer)
}

/// Validates a user-provided custom short code.
///
/// # Rules
///
/// - Length: 1-64 characters
/// - No `/` and no whitespace, so the code stays a single path segment
/// - No `?` or `#`
/// - Cannot be a reserved route segment (compared case-insensitively)
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any validation rule is violated.
///
/// # Examples
///
/// ```ignore
/// assert!(validate_custom_code("Promo_2025").is_ok());
/// assert!(validate_custom_code("a").is_ok());
///
/// assert!(validate_custom_code("").is_err());            // Empty
/// assert!(validate_custom_code("a/b").is_err());         // Slash
/// assert!(validate_custom_code("track").is_err());       // Reserved
/// ```
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    let length = code.chars().count();
    if length == 0 || length > MAX_CUSTOM_CODE_LEN {
        return Err(AppError::bad_request(
            format!("Custom code must be 1-{MAX_CUSTOM_CODE_LEN} characters"),
            json!({ "provided_length": length }),
        ));
    }

    if code
        .chars()
        .any(|c| c == '/' || c == '?' || c == '#' || c.is_whitespace() || c.is_control())
    {
        return Err(AppError::bad_request(
            "Custom code cannot contain '/', '?', '#' or whitespace",
            json!({ "code": code }),
        ));
    }

    if RESERVED_CODES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(code))
    {
        return Err(AppError::bad_request(
            "This code is reserved",
            json!({ "code": code }),
        ));
    }

    Ok(())
}
