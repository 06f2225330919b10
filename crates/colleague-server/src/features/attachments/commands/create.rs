//! Metadata-only attachment creation from a JSON body

use colleague_common::{Attachment, AttachmentEncryption, ValidationError};

use crate::principal::Principal;
use crate::services::{AttachmentService, ServiceError};

#[derive(Debug, Clone)]
pub struct CreateAttachmentCommand {
    pub attachment: Attachment,
    pub encryption: Option<AttachmentEncryption>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateAttachmentError {
    #[error("Request body is required and cannot be empty")]
    BodyRequired,
    #[error("Failed to read request body: {0}")]
    ReadBody(String),
    #[error("Request body is not valid UTF-8")]
    InvalidUtf8,
    #[error("Attachment metadata is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl CreateAttachmentCommand {
    /// Decode a UTF-8 JSON attachment document.
    pub fn from_body(
        body: &[u8],
        encryption: Option<AttachmentEncryption>,
    ) -> Result<Self, CreateAttachmentError> {
        let text = std::str::from_utf8(body).map_err(|_| CreateAttachmentError::InvalidUtf8)?;
        if text.trim().is_empty() {
            return Err(CreateAttachmentError::BodyRequired);
        }

        Ok(Self {
            attachment: serde_json::from_str(text)?,
            encryption,
        })
    }

    pub fn validate(&self) -> Result<(), CreateAttachmentError> {
        self.attachment.validate()?;
        Ok(())
    }
}

#[tracing::instrument(skip(service, command))]
pub async fn handle(
    service: &dyn AttachmentService,
    principal: &Principal,
    command: CreateAttachmentCommand,
) -> Result<Attachment, CreateAttachmentError> {
    command.validate()?;

    let created = service
        .create_attachment(principal, command.attachment, command.encryption)
        .await?;

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_parses_pascal_case() {
        let cmd = CreateAttachmentCommand::from_body(
            br#"{"Name":"notes.txt","ContentType":"text/plain","TagOne":"advising"}"#,
            None,
        )
        .unwrap();
        assert_eq!(cmd.attachment.name, "notes.txt");
        assert_eq!(cmd.attachment.tag_one.as_deref(), Some("advising"));
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_from_body_empty() {
        assert!(matches!(
            CreateAttachmentCommand::from_body(b"  \r\n", None),
            Err(CreateAttachmentError::BodyRequired)
        ));
    }

    #[test]
    fn test_from_body_invalid_json() {
        assert!(matches!(
            CreateAttachmentCommand::from_body(b"{\"Name\":", None),
            Err(CreateAttachmentError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_from_body_invalid_utf8() {
        assert!(matches!(
            CreateAttachmentCommand::from_body(&[0xff, 0xfe], None),
            Err(CreateAttachmentError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_validation_accepts_metadata_without_name() {
        let cmd = CreateAttachmentCommand::from_body(br#"{"ContentType":"text/plain"}"#, None).unwrap();
        assert!(cmd.attachment.name.is_empty());
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_negative_size() {
        let cmd = CreateAttachmentCommand::from_body(br#"{"Name":"a.txt","Size":-3}"#, None).unwrap();
        assert!(matches!(
            cmd.validate(),
            Err(CreateAttachmentError::Validation(ValidationError::NegativeSize(-3)))
        ));
    }
}
