use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tokio_util::io::ReaderStream;

use super::{
    commands::{
        CreateAttachmentCommand, CreateAttachmentError, DeleteAttachmentCommand,
        DeleteAttachmentError, UpdateAttachmentCommand, UpdateAttachmentError,
        UploadAttachmentCommand, UploadAttachmentError,
    },
    encryption::{self, EncryptionHeaderError},
    multipart::is_multipart_content_type,
    queries::{
        GetAttachmentContentError, GetAttachmentContentQuery, ListAttachmentsError,
        ListAttachmentsQuery, SearchAttachmentsError, SearchAttachmentsQuery,
    },
    AttachmentsState,
};
use crate::api::response::ErrorResponse;
use crate::principal::Principal;
use crate::services::ServiceError;

pub fn attachments_routes() -> Router<AttachmentsState> {
    Router::new()
        .route("/attachments", get(list_attachments).post(create_attachment))
        .route("/attachments/:id", put(update_attachment).delete(delete_attachment))
        .route("/attachments/:id/content", get(get_attachment_content))
        .route("/qapi/attachments", post(query_attachments))
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// `POST /attachments`: multipart upload with content, or a JSON document
/// creating a content-less attachment.
#[tracing::instrument(skip(state, headers, body))]
async fn create_attachment(
    State(state): State<AttachmentsState>,
    principal: Principal,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AttachmentApiError> {
    let encryption = encryption::from_headers(&headers)?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let created = if is_multipart_content_type(content_type) {
        let command = UploadAttachmentCommand {
            content_type: content_type.to_string(),
            content_length: declared_length(&headers),
            encryption,
            body,
        };
        super::commands::upload::handle(state.service.as_ref(), &principal, state.limits, command)
            .await?
    } else {
        let limit = usize::try_from(state.limits.max_request_size).unwrap_or(usize::MAX);
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| CreateAttachmentError::ReadBody(e.to_string()))?;
        let command = CreateAttachmentCommand::from_body(&bytes, encryption)?;
        super::commands::create::handle(state.service.as_ref(), &principal, command).await?
    };

    tracing::info!(
        id = ?created.id,
        size = ?created.size,
        "Attachment created via API"
    );

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

#[tracing::instrument(skip(state))]
async fn list_attachments(
    State(state): State<AttachmentsState>,
    principal: Principal,
    Query(query): Query<ListAttachmentsQuery>,
) -> Result<Response, AttachmentApiError> {
    let attachments =
        super::queries::list::handle(state.service.as_ref(), &principal, query).await?;

    Ok((StatusCode::OK, Json(attachments)).into_response())
}

#[tracing::instrument(skip(state, body))]
async fn query_attachments(
    State(state): State<AttachmentsState>,
    principal: Principal,
    body: axum::body::Bytes,
) -> Result<Response, AttachmentApiError> {
    let query = SearchAttachmentsQuery::from_body(&body)?;
    let attachments =
        super::queries::search::handle(state.service.as_ref(), &principal, query).await?;

    Ok((StatusCode::OK, Json(attachments)).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_attachment_content(
    State(state): State<AttachmentsState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, AttachmentApiError> {
    let query = GetAttachmentContentQuery { id };
    let download =
        super::queries::get_content::handle(state.service.as_ref(), &principal, query).await?;

    let content_type = download
        .attachment
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let mut response = Body::from_stream(ReaderStream::new(download.content)).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.attachment.name.replace('\\', "\\\\").replace('"', "\\\"")
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    if let Some(encryption) = &download.encryption {
        headers.extend(encryption::to_headers(encryption));
    }

    Ok(response)
}

#[tracing::instrument(skip(state, attachment))]
async fn update_attachment(
    State(state): State<AttachmentsState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(attachment): Json<colleague_common::Attachment>,
) -> Result<Response, AttachmentApiError> {
    let command = UpdateAttachmentCommand { id, attachment };
    let updated =
        super::commands::update::handle(state.service.as_ref(), &principal, command).await?;

    Ok((StatusCode::OK, Json(updated)).into_response())
}

#[tracing::instrument(skip(state))]
async fn delete_attachment(
    State(state): State<AttachmentsState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, AttachmentApiError> {
    let command = DeleteAttachmentCommand { id };
    super::commands::delete::handle(state.service.as_ref(), &principal, command).await?;

    tracing::info!("Attachment deleted via API");

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum AttachmentApiError {
    #[error(transparent)]
    Encryption(#[from] EncryptionHeaderError),
    #[error(transparent)]
    Create(#[from] CreateAttachmentError),
    #[error(transparent)]
    Upload(#[from] UploadAttachmentError),
    #[error(transparent)]
    Update(#[from] UpdateAttachmentError),
    #[error(transparent)]
    Delete(#[from] DeleteAttachmentError),
    #[error(transparent)]
    List(#[from] ListAttachmentsError),
    #[error(transparent)]
    Search(#[from] SearchAttachmentsError),
    #[error(transparent)]
    Content(#[from] GetAttachmentContentError),
}

impl AttachmentApiError {
    fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Create(CreateAttachmentError::Service(e))
            | Self::Upload(UploadAttachmentError::Service(e))
            | Self::Update(UpdateAttachmentError::Service(e))
            | Self::Delete(DeleteAttachmentError::Service(e))
            | Self::List(ListAttachmentsError::Service(e))
            | Self::Search(SearchAttachmentsError::Service(e))
            | Self::Content(GetAttachmentContentError::Service(e)) => Some(e),
            _ => None,
        }
    }
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(code, message))).into_response()
}

fn service_error_response(err: &ServiceError) -> Response {
    match err {
        ServiceError::PermissionDenied(msg) => error_response(StatusCode::FORBIDDEN, "FORBIDDEN", msg),
        ServiceError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        ServiceError::InvalidArgument(msg) => {
            error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
        },
        ServiceError::Database(_) | ServiceError::Storage(_) | ServiceError::Io(_) => {
            tracing::error!("Attachment service failure: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred",
            )
        },
    }
}

impl IntoResponse for AttachmentApiError {
    fn into_response(self) -> Response {
        if let Some(err) = self.service_error() {
            return service_error_response(err);
        }

        match &self {
            Self::Upload(UploadAttachmentError::RequestTooLarge { size, limit }) => {
                tracing::warn!(size = ?size, limit = limit, "Rejected oversized attachment request");
                error_response(StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", self.to_string())
            },
            Self::Upload(UploadAttachmentError::Io(_)) => {
                tracing::error!("Failed to stage attachment upload: {}", self);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                )
            },
            Self::Create(CreateAttachmentError::BodyRequired)
            | Self::Create(CreateAttachmentError::Validation(_))
            | Self::Upload(UploadAttachmentError::Validation(_))
            | Self::Update(UpdateAttachmentError::IdRequired)
            | Self::Update(UpdateAttachmentError::IdMismatch { .. })
            | Self::Update(UpdateAttachmentError::Validation(_))
            | Self::Delete(DeleteAttachmentError::IdRequired)
            | Self::Search(SearchAttachmentsError::Validation(_))
            | Self::Content(GetAttachmentContentError::IdRequired) => {
                error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string())
            },
            _ => {
                tracing::debug!("Rejected attachment request: {}", self);
                error_response(StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string())
            },
        }
    }
}
