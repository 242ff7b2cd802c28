//! Error taxonomy shared by the pure core.

use thiserror::Error;

/// Failures surfaced by core operations.
///
/// Absence of a tag block is not an error: [`crate::core::tag::extract_tag`]
/// reports it as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A referenced document or story does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Tag name does not match `[A-Za-z_][A-Za-z0-9_-]*`.
    #[error("invalid tag name: {0}")]
    InvalidTag(String),

    /// Malformed document shape or unparsable value.
    #[error("{0}")]
    InvalidInput(String),

    /// Text was empty after trimming.
    #[error("{0}")]
    Empty(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
