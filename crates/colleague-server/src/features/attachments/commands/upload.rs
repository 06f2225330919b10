//! Multipart attachment upload
//!
//! A multipart `POST /attachments` carries one JSON metadata section named
//! `attachment` and one binary section named `datafile`. Content is streamed
//! into a request-owned temp file so its size comes from the bytes actually
//! received, then handed to the attachment service as an open file. Every
//! temp file is removed before the request completes.

use axum::body::Body;
use colleague_common::{Attachment, AttachmentEncryption, ValidationError};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::features::attachments::{
    multipart::{get_boundary, BoundaryError, ContentDisposition, SectionKind, MAX_BOUNDARY_LENGTH},
    temp_files::TempFiles,
};
use crate::principal::Principal;
use crate::services::{AttachmentContent, AttachmentService, ServiceError};

/// Per-request limits for attachment uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_request_size: u64,
}

pub struct UploadAttachmentCommand {
    pub content_type: String,
    /// Declared `Content-Length`, when the client sent one
    pub content_length: Option<u64>,
    pub encryption: Option<AttachmentEncryption>,
    pub body: Body,
}

impl std::fmt::Debug for UploadAttachmentCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadAttachmentCommand")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("encrypted", &self.encryption.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadAttachmentError {
    #[error("Max attachment request size exceeded")]
    RequestTooLarge { size: Option<u64>, limit: u64 },
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
    #[error("Malformed multipart body: {0}")]
    Multipart(multer::Error),
    #[error("Attachment metadata is not valid JSON: {0}")]
    InvalidMetadata(#[from] serde_json::Error),
    #[error("No attachment content found in the request")]
    ContentMissing,
    #[error("Multiple attachment content in a single request is not allowed")]
    MultipleContent(usize),
    #[error("Attachment metadata not found in request")]
    MetadataMissing,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to stage attachment content: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<multer::Error> for UploadAttachmentError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit } => Self::RequestTooLarge { size: None, limit },
            other => Self::Multipart(other),
        }
    }
}

impl UploadAttachmentCommand {
    /// Reject requests whose declared length is over the limit before any of
    /// the body is read.
    pub fn check_size(&self, limits: UploadLimits) -> Result<(), UploadAttachmentError> {
        match self.content_length {
            Some(size) if size > limits.max_request_size => Err(UploadAttachmentError::RequestTooLarge {
                size: Some(size),
                limit: limits.max_request_size,
            }),
            _ => Ok(()),
        }
    }
}

/// What the walk over the multipart sections collected
#[derive(Debug, Default)]
struct UploadSections {
    metadata: Option<Attachment>,
    content_files: Vec<PathBuf>,
}

impl UploadSections {
    fn into_validated(self) -> Result<(Attachment, PathBuf), UploadAttachmentError> {
        let content = match self.content_files.as_slice() {
            [] => return Err(UploadAttachmentError::ContentMissing),
            [single] => single.clone(),
            many => return Err(UploadAttachmentError::MultipleContent(many.len())),
        };
        let metadata = self.metadata.ok_or(UploadAttachmentError::MetadataMissing)?;
        Ok((metadata, content))
    }
}

#[tracing::instrument(skip(service, command), fields(content_length = ?command.content_length))]
pub async fn handle(
    service: &dyn AttachmentService,
    principal: &Principal,
    limits: UploadLimits,
    command: UploadAttachmentCommand,
) -> Result<Attachment, UploadAttachmentError> {
    command.check_size(limits)?;
    let boundary = get_boundary(&command.content_type, MAX_BOUNDARY_LENGTH)?;

    // Declared before any file exists so every staged file outlives its use.
    let mut temp_files = TempFiles::new(service.temp_file_directory());

    let sections =
        read_sections(command.body, boundary, limits.max_request_size, &mut temp_files).await?;
    let (mut attachment, content_path) = sections.into_validated()?;

    let file = tokio::fs::File::open(&content_path).await?;
    let size = file.metadata().await?.len();
    // The received bytes decide the size, whatever the metadata claimed.
    attachment.size = Some(i64::try_from(size).unwrap_or(i64::MAX));
    attachment.validate()?;

    let created = service
        .create_attachment_with_content(
            principal,
            attachment,
            command.encryption,
            AttachmentContent { file, size },
        )
        .await?;

    Ok(created)
}

async fn read_sections(
    body: Body,
    boundary: String,
    max_request_size: u64,
    temp_files: &mut TempFiles,
) -> Result<UploadSections, UploadAttachmentError> {
    let constraints = multer::Constraints::new()
        .size_limit(multer::SizeLimit::new().whole_stream(max_request_size));
    let mut multipart =
        multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut sections = UploadSections::default();

    while let Some(mut field) = multipart.next_field().await? {
        let disposition = ContentDisposition::of_field(&field);

        match SectionKind::of(disposition.as_ref()) {
            SectionKind::Metadata => {
                let bytes = field.bytes().await?;
                // A repeated metadata section replaces the earlier one.
                sections.metadata = Some(serde_json::from_slice(&bytes)?);
            },
            SectionKind::Content => {
                let path = temp_files.reserve().await?;
                let written = stream_to_file(&mut field, &path).await?;
                debug!(path = %path.display(), bytes = written, "Staged attachment content");
                sections.content_files.push(path);
            },
            SectionKind::Other => {
                debug!(name = ?field.name(), "Skipping unrecognized multipart section");
            },
        }
    }

    Ok(sections)
}

async fn stream_to_file(
    field: &mut multer::Field<'_>,
    path: &Path,
) -> Result<u64, UploadAttachmentError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}
