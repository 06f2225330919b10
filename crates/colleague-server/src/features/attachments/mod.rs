//! Attachment ingestion and retrieval
//!
//! Routes for creating attachments (multipart with content, or JSON metadata
//! only), listing and searching them, streaming their content back out, and
//! updating or deleting them. Persistence is delegated to an
//! [`AttachmentService`].

pub mod commands;
pub mod encryption;
pub mod multipart;
pub mod queries;
pub mod routes;
pub mod temp_files;

use std::sync::Arc;

use crate::services::AttachmentService;

pub use commands::UploadLimits;
pub use routes::attachments_routes;

#[derive(Clone)]
pub struct AttachmentsState {
    pub service: Arc<dyn AttachmentService>,
    pub limits: UploadLimits,
}
