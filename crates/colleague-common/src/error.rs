//! Error types shared across the Colleague crates

use thiserror::Error;

/// Result type alias for domain validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Validation failures on client-supplied domain records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Attachment name must not exceed {0} characters")]
    NameLength(usize),

    #[error("Attachment size cannot be negative: {0}")]
    NegativeSize(i64),

    #[error("At least one search criterion is required")]
    CriteriaRequired,
}
