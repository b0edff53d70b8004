//! Utility functions for short-code generation and destination handling.
//!
//! - [`code_generator`] - Short code generation and validation
//! - [`url_normalizer`] - Destination normalization and validation

pub mod code_generator;
pub mod url_normalizer;
