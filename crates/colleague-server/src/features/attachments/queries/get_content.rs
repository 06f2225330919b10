use crate::principal::Principal;
use crate::services::{AttachmentDownload, AttachmentService, ServiceError};

#[derive(Debug, Clone)]
pub struct GetAttachmentContentQuery {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetAttachmentContentError {
    #[error("Attachment id is required and cannot be empty")]
    IdRequired,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl GetAttachmentContentQuery {
    pub fn validate(&self) -> Result<(), GetAttachmentContentError> {
        if self.id.trim().is_empty() {
            return Err(GetAttachmentContentError::IdRequired);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(service))]
pub async fn handle(
    service: &dyn AttachmentService,
    principal: &Principal,
    query: GetAttachmentContentQuery,
) -> Result<AttachmentDownload, GetAttachmentContentError> {
    query.validate()?;
    Ok(service.get_attachment_content(principal, &query.id).await?)
}
