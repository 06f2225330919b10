//! Colleague Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, validation, and logging for the Colleague API workspace.
//!
//! - **Types**: attachment metadata, encryption side-channel, search criteria
//! - **Errors**: validation failures on client-supplied records
//! - **Logging**: one place to configure `tracing` for every binary

pub mod error;
pub mod logging;
pub mod types;

pub use error::{ValidationError, ValidationResult};
pub use types::{Attachment, AttachmentEncryption, AttachmentSearchCriteria};
