//! Attachment service
//!
//! The HTTP layer never touches the database or object storage directly. It
//! hands validated requests to an [`AttachmentService`], which owns
//! persistence, access control and content storage.

use async_trait::async_trait;
use colleague_common::{Attachment, AttachmentEncryption, AttachmentSearchCriteria};
use std::{path::PathBuf, pin::Pin};
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::principal::Principal;

pub mod attachments;

pub use attachments::PgAttachmentService;

/// Readable attachment content, streamed out to the client as-is.
pub type ContentReader = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Uploaded content staged on local disk.
///
/// `size` is the number of bytes in the file, which is authoritative over any
/// size the client declared in the metadata.
#[derive(Debug)]
pub struct AttachmentContent {
    pub file: tokio::fs::File,
    pub size: u64,
}

/// An attachment's stored content with the metadata needed to serve it
pub struct AttachmentDownload {
    pub attachment: Attachment,
    pub encryption: Option<AttachmentEncryption>,
    pub content: ContentReader,
}

impl std::fmt::Debug for AttachmentDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentDownload")
            .field("attachment", &self.attachment)
            .field("encryption", &self.encryption)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait AttachmentService: Send + Sync {
    /// Attachments visible to `principal`, narrowed by any filter given.
    async fn get_attachments(
        &self,
        principal: &Principal,
        owner: Option<&str>,
        collection_id: Option<&str>,
        tag_one: Option<&str>,
    ) -> ServiceResult<Vec<Attachment>>;

    async fn query_attachments(
        &self,
        principal: &Principal,
        criteria: &AttachmentSearchCriteria,
    ) -> ServiceResult<Vec<Attachment>>;

    async fn get_attachment_content(
        &self,
        principal: &Principal,
        id: &str,
    ) -> ServiceResult<AttachmentDownload>;

    /// Create an attachment record with no content.
    async fn create_attachment(
        &self,
        principal: &Principal,
        metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
    ) -> ServiceResult<Attachment>;

    /// Create an attachment and store its content.
    ///
    /// Implementations must not retain `content.file` past the call; the
    /// caller deletes the backing file as soon as this returns.
    async fn create_attachment_with_content(
        &self,
        principal: &Principal,
        metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
        content: AttachmentContent,
    ) -> ServiceResult<Attachment>;

    async fn update_attachment(
        &self,
        principal: &Principal,
        id: &str,
        metadata: Attachment,
    ) -> ServiceResult<Attachment>;

    async fn delete_attachment(&self, principal: &Principal, id: &str) -> ServiceResult<()>;

    /// Directory where request handlers stage uploaded content.
    fn temp_file_directory(&self) -> PathBuf;
}

// ============================================================================
// Access rules
// ============================================================================

/// Owned attachments are visible only to their owner; ownerless ones to anyone.
pub fn can_access(principal: &Principal, attachment: &Attachment) -> bool {
    match attachment.owner.as_deref() {
        None => true,
        Some(owner) => principal.is(owner),
    }
}

pub fn ensure_can_access(principal: &Principal, attachment: &Attachment) -> ServiceResult<()> {
    if can_access(principal, attachment) {
        Ok(())
    } else {
        Err(ServiceError::PermissionDenied(format!(
            "Not permitted to access attachment {}",
            attachment.id.as_deref().unwrap_or_default()
        )))
    }
}

/// A listing filtered by owner may only name the caller.
pub fn ensure_can_list_owner(principal: &Principal, owner: Option<&str>) -> ServiceResult<()> {
    match owner {
        Some(owner) if !principal.is(owner) => Err(ServiceError::PermissionDenied(format!(
            "Not permitted to view attachments owned by {}",
            owner
        ))),
        _ => Ok(()),
    }
}

/// Owner for a new attachment: the requested one if it is the caller,
/// otherwise the caller.
pub fn resolve_new_owner(
    principal: &Principal,
    requested: Option<String>,
) -> ServiceResult<Option<String>> {
    match requested {
        None => Ok(principal.user_id.clone()),
        Some(owner) if principal.is(&owner) => Ok(Some(owner)),
        Some(owner) => Err(ServiceError::PermissionDenied(format!(
            "Not permitted to create attachments owned by {}",
            owner
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned_by(owner: Option<&str>) -> Attachment {
        Attachment {
            id: Some("a1".to_string()),
            name: "scan.pdf".to_string(),
            owner: owner.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_ownerless_attachment_visible_to_everyone() {
        let attachment = owned_by(None);
        assert!(can_access(&Principal::anonymous(), &attachment));
        assert!(can_access(&Principal::user("42"), &attachment));
    }

    #[test]
    fn test_owned_attachment_visible_only_to_owner() {
        let attachment = owned_by(Some("42"));
        assert!(can_access(&Principal::user("42"), &attachment));
        assert!(!can_access(&Principal::user("7"), &attachment));
        assert!(matches!(
            ensure_can_access(&Principal::anonymous(), &attachment),
            Err(ServiceError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_owner_filter_must_be_caller() {
        assert!(ensure_can_list_owner(&Principal::user("42"), Some("42")).is_ok());
        assert!(ensure_can_list_owner(&Principal::user("42"), None).is_ok());
        assert!(ensure_can_list_owner(&Principal::user("42"), Some("7")).is_err());
    }

    #[test]
    fn test_new_owner_defaults_to_caller() {
        let owner = resolve_new_owner(&Principal::user("42"), None).unwrap();
        assert_eq!(owner.as_deref(), Some("42"));

        let owner = resolve_new_owner(&Principal::anonymous(), None).unwrap();
        assert_eq!(owner, None);
    }

    #[test]
    fn test_new_owner_cannot_be_someone_else() {
        let result = resolve_new_owner(&Principal::user("42"), Some("7".to_string()));
        assert!(matches!(result, Err(ServiceError::PermissionDenied(_))));

        let result = resolve_new_owner(&Principal::anonymous(), Some("7".to_string()));
        assert!(result.is_err());
    }
}
