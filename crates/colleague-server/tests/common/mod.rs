//! Shared fixtures for attachment API tests
//!
//! [`RecordingAttachmentService`] is an in-memory attachment service that
//! applies the same access rules as the production one and records every
//! call, so tests can assert exactly what reached the service layer.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use colleague_common::{Attachment, AttachmentEncryption, AttachmentSearchCriteria};
use colleague_server::{
    api,
    config::Config,
    features::FeatureState,
    principal::Principal,
    services::{
        can_access, ensure_can_access, ensure_can_list_owner, resolve_new_owner,
        AttachmentContent, AttachmentDownload, AttachmentService, ServiceError, ServiceResult,
    },
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::io::AsyncReadExt;

pub const BOUNDARY: &str = "----ColleagueTestBoundary7MA4YWxkTrZu0gW";

/// A call that reached the attachment service
#[derive(Debug, Clone)]
pub enum Call {
    Create {
        metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
    },
    CreateWithContent {
        metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
        content: Vec<u8>,
        size: u64,
        /// Files present in the temp directory while the service ran
        staged_files: usize,
    },
    Update {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Clone)]
struct Stored {
    attachment: Attachment,
    encryption: Option<AttachmentEncryption>,
    content: Option<Vec<u8>>,
}

pub struct RecordingAttachmentService {
    temp_dir: PathBuf,
    calls: Mutex<Vec<Call>>,
    stored: Mutex<BTreeMap<String, Stored>>,
    next_id: Mutex<u32>,
    fail_next_create: Mutex<Option<ServiceError>>,
}

impl RecordingAttachmentService {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            calls: Mutex::new(Vec::new()),
            stored: Mutex::new(BTreeMap::new()),
            next_id: Mutex::new(0),
            fail_next_create: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Make the next create call fail with `error`.
    pub fn fail_next_create(&self, error: ServiceError) {
        *self.fail_next_create.lock().unwrap() = Some(error);
    }

    /// Store an attachment directly, bypassing the HTTP layer.
    pub fn seed(
        &self,
        mut attachment: Attachment,
        encryption: Option<AttachmentEncryption>,
        content: Option<&[u8]>,
    ) -> String {
        let id = self.allocate_id();
        attachment.id = Some(id.clone());
        if let Some(content) = content {
            attachment.size = Some(content.len() as i64);
        }
        self.stored.lock().unwrap().insert(
            id.clone(),
            Stored {
                attachment,
                encryption,
                content: content.map(<[u8]>::to_vec),
            },
        );
        id
    }

    fn allocate_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("att-{:04}", *next)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_failure(&self) -> Option<ServiceError> {
        self.fail_next_create.lock().unwrap().take()
    }

    fn insert_new(
        &self,
        principal: &Principal,
        mut metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
        content: Option<Vec<u8>>,
    ) -> ServiceResult<Attachment> {
        metadata
            .validate()
            .map_err(|e| ServiceError::InvalidArgument(e.to_string()))?;
        metadata.owner = resolve_new_owner(principal, metadata.owner.take())?;
        metadata.created_by = principal.user_id.clone();

        let id = self.allocate_id();
        metadata.id = Some(id.clone());
        self.stored.lock().unwrap().insert(
            id,
            Stored {
                attachment: metadata.clone(),
                encryption,
                content,
            },
        );
        Ok(metadata)
    }

    fn find(&self, id: &str) -> ServiceResult<Stored> {
        self.stored
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Attachment {} not found", id)))
    }

    fn visible(&self, principal: &Principal) -> Vec<Attachment> {
        self.stored
            .lock()
            .unwrap()
            .values()
            .map(|s| s.attachment.clone())
            .filter(|a| can_access(principal, a))
            .collect()
    }
}

#[async_trait]
impl AttachmentService for RecordingAttachmentService {
    async fn get_attachments(
        &self,
        principal: &Principal,
        owner: Option<&str>,
        collection_id: Option<&str>,
        tag_one: Option<&str>,
    ) -> ServiceResult<Vec<Attachment>> {
        ensure_can_list_owner(principal, owner)?;

        Ok(self
            .visible(principal)
            .into_iter()
            .filter(|a| owner.is_none() || a.owner.as_deref() == owner)
            .filter(|a| collection_id.is_none() || a.collection_id.as_deref() == collection_id)
            .filter(|a| tag_one.is_none() || a.tag_one.as_deref() == tag_one)
            .collect())
    }

    async fn query_attachments(
        &self,
        principal: &Principal,
        criteria: &AttachmentSearchCriteria,
    ) -> ServiceResult<Vec<Attachment>> {
        ensure_can_list_owner(principal, criteria.owner.as_deref())?;

        Ok(self
            .visible(principal)
            .into_iter()
            .filter(|a| criteria.matches(a))
            .collect())
    }

    async fn get_attachment_content(
        &self,
        principal: &Principal,
        id: &str,
    ) -> ServiceResult<AttachmentDownload> {
        let stored = self.find(id)?;
        ensure_can_access(principal, &stored.attachment)?;

        let content = stored
            .content
            .ok_or_else(|| ServiceError::NotFound(format!("Attachment {} has no content", id)))?;

        Ok(AttachmentDownload {
            attachment: stored.attachment,
            encryption: stored.encryption,
            content: Box::pin(std::io::Cursor::new(content)),
        })
    }

    async fn create_attachment(
        &self,
        principal: &Principal,
        metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
    ) -> ServiceResult<Attachment> {
        self.record(Call::Create {
            metadata: metadata.clone(),
            encryption: encryption.clone(),
        });
        if let Some(error) = self.take_failure() {
            return Err(error);
        }

        self.insert_new(principal, metadata, encryption, None)
    }

    async fn create_attachment_with_content(
        &self,
        principal: &Principal,
        metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
        mut content: AttachmentContent,
    ) -> ServiceResult<Attachment> {
        let mut bytes = Vec::new();
        content.file.read_to_end(&mut bytes).await?;

        self.record(Call::CreateWithContent {
            metadata: metadata.clone(),
            encryption: encryption.clone(),
            content: bytes.clone(),
            size: content.size,
            staged_files: staged_files(&self.temp_dir),
        });
        if let Some(error) = self.take_failure() {
            return Err(error);
        }

        self.insert_new(principal, metadata, encryption, Some(bytes))
    }

    async fn update_attachment(
        &self,
        principal: &Principal,
        id: &str,
        metadata: Attachment,
    ) -> ServiceResult<Attachment> {
        self.record(Call::Update { id: id.to_string() });

        let existing = self.find(id)?;
        ensure_can_access(principal, &existing.attachment)?;

        let mut updated = existing.attachment.clone();
        updated.name = metadata.name;
        updated.content_type = metadata.content_type;
        updated.collection_id = metadata.collection_id;
        updated.tag_one = metadata.tag_one;
        updated.modified_by = principal.user_id.clone();

        self.stored.lock().unwrap().insert(
            id.to_string(),
            Stored {
                attachment: updated.clone(),
                ..existing
            },
        );
        Ok(updated)
    }

    async fn delete_attachment(&self, principal: &Principal, id: &str) -> ServiceResult<()> {
        self.record(Call::Delete { id: id.to_string() });

        let existing = self.find(id)?;
        ensure_can_access(principal, &existing.attachment)?;
        self.stored.lock().unwrap().remove(id);
        Ok(())
    }

    fn temp_file_directory(&self) -> PathBuf {
        self.temp_dir.clone()
    }
}

/// Number of entries in `dir`; a missing directory counts as empty.
pub fn staged_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// Fixture tying a recording service to a fresh temp directory
pub struct TestApp {
    pub router: Router,
    pub service: Arc<RecordingAttachmentService>,
    pub temp_dir: PathBuf,
    _root: tempfile::TempDir,
}

impl TestApp {
    pub fn new(max_request_size: u64) -> Self {
        let root = tempfile::tempdir().unwrap();
        let temp_dir = root.path().join("staging");
        let service = Arc::new(RecordingAttachmentService::new(&temp_dir));

        let state = FeatureState {
            attachments: service.clone(),
            max_request_size,
        };
        let router = api::create_router(state, &Config::default());

        Self {
            router,
            service,
            temp_dir,
            _root: root,
        }
    }

    pub fn staged_files(&self) -> usize {
        staged_files(&self.temp_dir)
    }
}

/// Builder for `multipart/form-data` request bodies
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::with_boundary(BOUNDARY)
    }

    pub fn with_boundary(boundary: &str) -> Self {
        Self {
            boundary: boundary.to_string(),
            body: Vec::new(),
        }
    }

    /// Append a section with the given `Content-Disposition` value.
    pub fn part(mut self, disposition: &str, content_type: Option<&str>, data: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body
            .extend_from_slice(format!("Content-Disposition: {}\r\n", disposition).as_bytes());
        if let Some(ct) = content_type {
            self.body
                .extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
        }
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn metadata(self, json: &str) -> Self {
        self.part(
            r#"form-data; name="attachment""#,
            Some("application/json"),
            json.as_bytes(),
        )
    }

    pub fn content(self, file_name: &str, data: &[u8]) -> Self {
        let disposition = format!(r#"form-data; name="datafile"; filename="{}""#, file_name);
        self.part(&disposition, Some("application/octet-stream"), data)
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

/// `POST /attachments` with a multipart body and a matching `Content-Length`.
pub fn upload_request(body: MultipartBody, headers: &[(&str, &str)]) -> Request<Body> {
    let content_type = body.content_type();
    let bytes = body.finish();

    let mut builder = Request::builder()
        .method("POST")
        .uri("/attachments")
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len());
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(bytes)).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
