//! Attachment domain types shared by the server and its collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Maximum length of an attachment display name.
pub const MAX_ATTACHMENT_NAME_LENGTH: usize = 255;

/// Attachment metadata record.
///
/// Field names serialize in PascalCase so existing Colleague clients can post
/// and read the same documents they always have.
///
/// # Examples
///
/// ```rust
/// use colleague_common::types::Attachment;
///
/// let attachment: Attachment = serde_json::from_str(
///     r#"{"Name": "transcript.pdf", "ContentType": "application/pdf", "Owner": "0001234"}"#,
/// ).unwrap();
/// assert_eq!(attachment.name, "transcript.pdf");
/// assert!(attachment.size.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    /// Identifier assigned by the attachment service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name, usually the original file name
    #[serde(default)]
    pub name: String,

    /// MIME type of the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Content length in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,

    /// Person or entity that owns the attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Attachment collection the attachment belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,

    /// Free-form tag used for lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_one: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Attachment {
    /// Validate client-supplied metadata. Every field is optional; a name,
    /// when given, is bounded and a size must not be negative.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.name.chars().count() > MAX_ATTACHMENT_NAME_LENGTH {
            return Err(ValidationError::NameLength(MAX_ATTACHMENT_NAME_LENGTH));
        }
        if let Some(size) = self.size {
            if size < 0 {
                return Err(ValidationError::NegativeSize(size));
            }
        }
        Ok(())
    }
}

/// Client-side encryption parameters travelling alongside an attachment.
///
/// The server never encrypts or decrypts content; it stores these values and
/// hands them back on download so the client can decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentEncryption {
    /// Identifier of the key that wrapped the content key
    pub encr_key_id: String,
    /// Encryption algorithm, e.g. `AES256`
    pub encr_type: Option<String>,
    /// Wrapped content key
    pub encr_content_key: Vec<u8>,
    /// Initialization vector
    pub encr_iv: Vec<u8>,
}

/// Criteria for `POST /qapi/attachments`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachmentSearchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_one_values: Vec<String>,
}

impl AttachmentSearchCriteria {
    /// A query with no criteria would return every attachment
    pub fn validate(&self) -> ValidationResult<()> {
        if self.owner.is_none() && self.collection_ids.is_empty() && self.tag_one_values.is_empty()
        {
            return Err(ValidationError::CriteriaRequired);
        }
        Ok(())
    }

    /// Whether the attachment satisfies every supplied criterion
    pub fn matches(&self, attachment: &Attachment) -> bool {
        if let Some(owner) = &self.owner {
            if attachment.owner.as_deref() != Some(owner.as_str()) {
                return false;
            }
        }
        if !self.collection_ids.is_empty() {
            match &attachment.collection_id {
                Some(id) if self.collection_ids.contains(id) => {},
                _ => return false,
            }
        }
        if !self.tag_one_values.is_empty() {
            match &attachment.tag_one {
                Some(tag) if self.tag_one_values.contains(tag) => {},
                _ => return false,
            }
        }
        true
    }
}
