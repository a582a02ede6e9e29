//! # AppError
//!
//! Centralized error handling for the Rusty-Forum ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all rf-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Node, User, parent of a reply)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Every violated content/title/registration rule, reported together.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A reply would be nested deeper than the configured ceiling.
    #[error("maximum nesting depth reached: depth {depth} exceeds ceiling {ceiling}")]
    DepthExceeded { depth: u32, ceiling: u32 },

    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but neither the author nor an admin
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists (e.g., duplicate root title, taken username)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failure (e.g., constraint violation, DB unreachable)
    #[error("storage error: {0}")]
    Storage(String),

    /// Infrastructure failure outside storage (e.g., token signing)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    /// Wraps a single rule violation in the batch form.
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }
}

/// A specialized Result type for Rusty-Forum logic.
pub type Result<T> = std::result::Result<T, AppError>;
