//! # AppError
//!
//! Centralized error handling for the Rusty-Reviews ecosystem.
//! Maps domain-specific failures to actionable error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field path, e.g. `rating` or `tags[2]`
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn describe(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The primary error type for all rr-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input rejected, with one entry per offending field
    #[error("validation error: {}", describe(.0))]
    ValidationFailed(Vec<FieldError>),

    /// The user already reviewed this product
    #[error("a review of product {product_id} by user {user_id} already exists")]
    DuplicateReview { user_id: Uuid, product_id: Uuid },

    /// Resource not found (e.g., Product, Review)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, Uuid),

    /// Caller may not touch the resource
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Persistence failure. The detail is for logs only.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AppError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ValidationFailed(vec![FieldError::new(field, message)])
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

/// A specialized Result type for Rusty-Reviews logic.
pub type Result<T> = std::result::Result<T, AppError>;
