//! # ForumError
//!
//! Typed failures for the alumni forum crates. Repository ports return
//! `anyhow::Result` so adapters can bubble up driver errors; everything that
//! needs to be matched on lands here.

use thiserror::Error;

/// The primary error type for af-core operations.
#[derive(Error, Debug)]
pub enum ForumError {
    /// Resource not found (e.g., Thread, Category)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed input (e.g., an unparsable route)
    #[error("validation error: {0}")]
    Validation(String),
}

/// A specialized Result type for alumni forum logic.
pub type Result<T> = std::result::Result<T, ForumError>;
