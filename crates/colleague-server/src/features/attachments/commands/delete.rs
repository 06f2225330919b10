use crate::principal::Principal;
use crate::services::{AttachmentService, ServiceError};

#[derive(Debug, Clone)]
pub struct DeleteAttachmentCommand {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteAttachmentError {
    #[error("Attachment id is required and cannot be empty")]
    IdRequired,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl DeleteAttachmentCommand {
    pub fn validate(&self) -> Result<(), DeleteAttachmentError> {
        if self.id.trim().is_empty() {
            return Err(DeleteAttachmentError::IdRequired);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(service))]
pub async fn handle(
    service: &dyn AttachmentService,
    principal: &Principal,
    command: DeleteAttachmentCommand,
) -> Result<(), DeleteAttachmentError> {
    command.validate()?;
    service.delete_attachment(principal, &command.id).await?;
    Ok(())
}
