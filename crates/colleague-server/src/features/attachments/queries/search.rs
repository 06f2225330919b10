use colleague_common::{Attachment, AttachmentSearchCriteria, ValidationError};

use crate::principal::Principal;
use crate::services::{AttachmentService, ServiceError};

#[derive(Debug, Clone)]
pub struct SearchAttachmentsQuery {
    pub criteria: AttachmentSearchCriteria,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchAttachmentsError {
    #[error("Search criteria are not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl SearchAttachmentsQuery {
    pub fn from_body(body: &[u8]) -> Result<Self, SearchAttachmentsError> {
        Ok(Self {
            criteria: serde_json::from_slice(body)?,
        })
    }

    pub fn validate(&self) -> Result<(), SearchAttachmentsError> {
        self.criteria.validate()?;
        Ok(())
    }
}

#[tracing::instrument(skip(service))]
pub async fn handle(
    service: &dyn AttachmentService,
    principal: &Principal,
    query: SearchAttachmentsQuery,
) -> Result<Vec<Attachment>, SearchAttachmentsError> {
    query.validate()?;
    Ok(service.query_attachments(principal, &query.criteria).await?)
}
