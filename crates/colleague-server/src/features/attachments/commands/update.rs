use colleague_common::{Attachment, ValidationError};

use crate::principal::Principal;
use crate::services::{AttachmentService, ServiceError};

#[derive(Debug, Clone)]
pub struct UpdateAttachmentCommand {
    pub id: String,
    pub attachment: Attachment,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateAttachmentError {
    #[error("Attachment id is required and cannot be empty")]
    IdRequired,
    #[error("Attachment id '{body}' does not match '{path}'")]
    IdMismatch { path: String, body: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl UpdateAttachmentCommand {
    pub fn validate(&self) -> Result<(), UpdateAttachmentError> {
        if self.id.trim().is_empty() {
            return Err(UpdateAttachmentError::IdRequired);
        }
        if let Some(body_id) = &self.attachment.id {
            if body_id != &self.id {
                return Err(UpdateAttachmentError::IdMismatch {
                    path: self.id.clone(),
                    body: body_id.clone(),
                });
            }
        }
        self.attachment.validate()?;
        Ok(())
    }
}

#[tracing::instrument(skip(service, command), fields(id = %command.id))]
pub async fn handle(
    service: &dyn AttachmentService,
    principal: &Principal,
    command: UpdateAttachmentCommand,
) -> Result<Attachment, UpdateAttachmentError> {
    command.validate()?;

    let updated = service
        .update_attachment(principal, &command.id, command.attachment)
        .await?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(id: &str, body_id: Option<&str>) -> UpdateAttachmentCommand {
        UpdateAttachmentCommand {
            id: id.to_string(),
            attachment: Attachment {
                id: body_id.map(str::to_string),
                name: "renamed.pdf".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(command("a1", None).validate().is_ok());
        assert!(command("a1", Some("a1")).validate().is_ok());
    }

    #[test]
    fn test_validation_empty_id() {
        assert!(matches!(
            command(" ", None).validate(),
            Err(UpdateAttachmentError::IdRequired)
        ));
    }

    #[test]
    fn test_validation_id_mismatch() {
        assert!(matches!(
            command("a1", Some("a2")).validate(),
            Err(UpdateAttachmentError::IdMismatch { .. })
        ));
    }
}
