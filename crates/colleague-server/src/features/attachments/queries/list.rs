use colleague_common::Attachment;
use serde::Deserialize;

use crate::principal::Principal;
use crate::services::{AttachmentService, ServiceError};

/// Filters accepted by `GET /attachments`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAttachmentsQuery {
    pub owner: Option<String>,
    #[serde(rename = "collectionid")]
    pub collection_id: Option<String>,
    #[serde(rename = "tagone")]
    pub tag_one: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListAttachmentsError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ListAttachmentsQuery {
    /// Blank filter values are treated as absent.
    fn normalized(self) -> Self {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        Self {
            owner: present(self.owner),
            collection_id: present(self.collection_id),
            tag_one: present(self.tag_one),
        }
    }
}

#[tracing::instrument(skip(service))]
pub async fn handle(
    service: &dyn AttachmentService,
    principal: &Principal,
    query: ListAttachmentsQuery,
) -> Result<Vec<Attachment>, ListAttachmentsError> {
    let query = query.normalized();

    let attachments = service
        .get_attachments(
            principal,
            query.owner.as_deref(),
            query.collection_id.as_deref(),
            query.tag_one.as_deref(),
        )
        .await?;

    Ok(attachments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_names() {
        let query: ListAttachmentsQuery =
            serde_json::from_str(r#"{"owner":"42","collectionid":"C1","tagone":"advising"}"#).unwrap();
        assert_eq!(query.owner.as_deref(), Some("42"));
        assert_eq!(query.collection_id.as_deref(), Some("C1"));
        assert_eq!(query.tag_one.as_deref(), Some("advising"));
    }

    #[test]
    fn test_blank_filters_dropped() {
        let query = ListAttachmentsQuery {
            owner: Some(" ".to_string()),
            collection_id: Some("C1".to_string()),
            tag_one: None,
        }
        .normalized();
        assert!(query.owner.is_none());
        assert_eq!(query.collection_id.as_deref(), Some("C1"));
    }
}
