//! Helpers shared by the module handlers.

pub mod extract;
pub mod openapi;
pub mod upload;
pub mod validation;

pub use extract::{FormOrJson, ValidJson};
pub use validation::{slugify, Validator};

/// Trim a string; `None` when nothing is left.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
