//! PostgreSQL + S3 backed attachment service

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use colleague_common::{Attachment, AttachmentEncryption, AttachmentSearchCriteria};
use sqlx::PgPool;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    ensure_can_access, ensure_can_list_owner, resolve_new_owner, AttachmentContent,
    AttachmentDownload, AttachmentService, ServiceError, ServiceResult,
};
use crate::{principal::Principal, storage::Storage};

#[derive(Debug, sqlx::FromRow)]
struct AttachmentRow {
    id: String,
    name: String,
    content_type: Option<String>,
    size: Option<i64>,
    owner: Option<String>,
    collection_id: Option<String>,
    tag_one: Option<String>,
    has_content: bool,
    encr_key_id: Option<String>,
    encr_type: Option<String>,
    encr_content_key: Option<Vec<u8>>,
    encr_iv: Option<Vec<u8>>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    modified_by: Option<String>,
    modified_at: DateTime<Utc>,
}

impl AttachmentRow {
    fn into_parts(self) -> (Attachment, Option<AttachmentEncryption>, bool) {
        let encryption = self.encr_key_id.map(|encr_key_id| AttachmentEncryption {
            encr_key_id,
            encr_type: self.encr_type,
            encr_content_key: self.encr_content_key.unwrap_or_default(),
            encr_iv: self.encr_iv.unwrap_or_default(),
        });

        let attachment = Attachment {
            id: Some(self.id),
            name: self.name,
            content_type: self.content_type,
            size: self.size,
            owner: self.owner,
            collection_id: self.collection_id,
            tag_one: self.tag_one,
            created_by: self.created_by,
            created_at: Some(self.created_at),
            modified_by: self.modified_by,
            modified_at: Some(self.modified_at),
        };

        (attachment, encryption, self.has_content)
    }

    fn into_attachment(self) -> Attachment {
        self.into_parts().0
    }
}

fn invalid(err: colleague_common::ValidationError) -> ServiceError {
    ServiceError::InvalidArgument(err.to_string())
}

pub struct PgAttachmentService {
    pool: PgPool,
    storage: Storage,
    temp_dir: PathBuf,
}

impl PgAttachmentService {
    pub fn new(pool: PgPool, storage: Storage, temp_dir: PathBuf) -> Self {
        Self {
            pool,
            storage,
            temp_dir,
        }
    }

    async fn fetch_row(&self, id: &str) -> ServiceResult<AttachmentRow> {
        sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, name, content_type, size, owner, collection_id, tag_one, has_content,
                   encr_key_id, encr_type, encr_content_key, encr_iv,
                   created_by, created_at, modified_by, modified_at
            FROM attachments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Attachment {} not found", id)))
    }

    /// Validate incoming metadata and assign the id and owner of a new attachment.
    fn prepare_new(&self, principal: &Principal, mut metadata: Attachment) -> ServiceResult<Attachment> {
        metadata.validate().map_err(invalid)?;
        metadata.owner = resolve_new_owner(principal, metadata.owner.take())?;
        metadata.id = Some(Uuid::new_v4().to_string());
        Ok(metadata)
    }

    async fn insert_row(
        &self,
        principal: &Principal,
        attachment: &Attachment,
        encryption: Option<&AttachmentEncryption>,
        has_content: bool,
    ) -> ServiceResult<Attachment> {
        let row = sqlx::query_as::<_, AttachmentRow>(
            r#"
            INSERT INTO attachments (
                id, name, content_type, size, owner, collection_id, tag_one, has_content,
                encr_key_id, encr_type, encr_content_key, encr_iv,
                created_by, created_at, modified_by, modified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $13, $14)
            RETURNING id, name, content_type, size, owner, collection_id, tag_one, has_content,
                      encr_key_id, encr_type, encr_content_key, encr_iv,
                      created_by, created_at, modified_by, modified_at
            "#,
        )
        .bind(&attachment.id)
        .bind(&attachment.name)
        .bind(&attachment.content_type)
        .bind(attachment.size)
        .bind(&attachment.owner)
        .bind(&attachment.collection_id)
        .bind(&attachment.tag_one)
        .bind(has_content)
        .bind(encryption.map(|e| e.encr_key_id.as_str()))
        .bind(encryption.and_then(|e| e.encr_type.as_deref()))
        .bind(encryption.map(|e| e.encr_content_key.as_slice()))
        .bind(encryption.map(|e| e.encr_iv.as_slice()))
        .bind(&principal.user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_attachment())
    }
}

#[async_trait]
impl AttachmentService for PgAttachmentService {
    #[tracing::instrument(skip(self))]
    async fn get_attachments(
        &self,
        principal: &Principal,
        owner: Option<&str>,
        collection_id: Option<&str>,
        tag_one: Option<&str>,
    ) -> ServiceResult<Vec<Attachment>> {
        ensure_can_list_owner(principal, owner)?;

        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, name, content_type, size, owner, collection_id, tag_one, has_content,
                   encr_key_id, encr_type, encr_content_key, encr_iv,
                   created_by, created_at, modified_by, modified_at
            FROM attachments
            WHERE ($1::TEXT IS NULL OR owner = $1)
              AND ($2::TEXT IS NULL OR collection_id = $2)
              AND ($3::TEXT IS NULL OR tag_one = $3)
              AND (owner IS NULL OR owner = $4)
            ORDER BY created_at, id
            "#,
        )
        .bind(owner)
        .bind(collection_id)
        .bind(tag_one)
        .bind(&principal.user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AttachmentRow::into_attachment).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn query_attachments(
        &self,
        principal: &Principal,
        criteria: &AttachmentSearchCriteria,
    ) -> ServiceResult<Vec<Attachment>> {
        criteria.validate().map_err(invalid)?;
        ensure_can_list_owner(principal, criteria.owner.as_deref())?;

        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, name, content_type, size, owner, collection_id, tag_one, has_content,
                   encr_key_id, encr_type, encr_content_key, encr_iv,
                   created_by, created_at, modified_by, modified_at
            FROM attachments
            WHERE ($1::TEXT IS NULL OR owner = $1)
              AND (cardinality($2::TEXT[]) = 0 OR collection_id = ANY($2))
              AND (cardinality($3::TEXT[]) = 0 OR tag_one = ANY($3))
              AND (owner IS NULL OR owner = $4)
            ORDER BY created_at, id
            "#,
        )
        .bind(&criteria.owner)
        .bind(&criteria.collection_ids)
        .bind(&criteria.tag_one_values)
        .bind(&principal.user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AttachmentRow::into_attachment).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_attachment_content(
        &self,
        principal: &Principal,
        id: &str,
    ) -> ServiceResult<AttachmentDownload> {
        let (attachment, encryption, has_content) = self.fetch_row(id).await?.into_parts();
        ensure_can_access(principal, &attachment)?;

        if !has_content {
            return Err(ServiceError::NotFound(format!("Attachment {} has no content", id)));
        }

        let stream = self.storage.download_stream(&self.storage.build_key(id)).await?;

        Ok(AttachmentDownload {
            attachment,
            encryption,
            content: Box::pin(stream.into_async_read()),
        })
    }

    #[tracing::instrument(skip(self, metadata, encryption))]
    async fn create_attachment(
        &self,
        principal: &Principal,
        metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
    ) -> ServiceResult<Attachment> {
        let attachment = self.prepare_new(principal, metadata)?;
        let created = self
            .insert_row(principal, &attachment, encryption.as_ref(), false)
            .await?;

        info!(id = ?created.id, "Created attachment without content");
        Ok(created)
    }

    #[tracing::instrument(skip(self, metadata, encryption, content), fields(size = content.size))]
    async fn create_attachment_with_content(
        &self,
        principal: &Principal,
        mut metadata: Attachment,
        encryption: Option<AttachmentEncryption>,
        content: AttachmentContent,
    ) -> ServiceResult<Attachment> {
        metadata.size = Some(i64::try_from(content.size).unwrap_or(i64::MAX));
        let attachment = self.prepare_new(principal, metadata)?;

        let id = attachment.id.clone().unwrap_or_default();
        let key = self.storage.build_key(&id);
        self.storage
            .upload_file(&key, content.file, attachment.content_type.as_deref())
            .await?;

        let created = match self
            .insert_row(principal, &attachment, encryption.as_ref(), true)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove orphaned attachment content");
                }
                return Err(e);
            },
        };

        info!(id = %id, size = content.size, "Created attachment with content");
        Ok(created)
    }

    #[tracing::instrument(skip(self, metadata))]
    async fn update_attachment(
        &self,
        principal: &Principal,
        id: &str,
        metadata: Attachment,
    ) -> ServiceResult<Attachment> {
        metadata.validate().map_err(invalid)?;

        let (existing, _, _) = self.fetch_row(id).await?.into_parts();
        ensure_can_access(principal, &existing)?;

        let row = sqlx::query_as::<_, AttachmentRow>(
            r#"
            UPDATE attachments
            SET name = $2,
                content_type = $3,
                collection_id = $4,
                tag_one = $5,
                modified_by = $6,
                modified_at = $7
            WHERE id = $1
            RETURNING id, name, content_type, size, owner, collection_id, tag_one, has_content,
                      encr_key_id, encr_type, encr_content_key, encr_iv,
                      created_by, created_at, modified_by, modified_at
            "#,
        )
        .bind(id)
        .bind(&metadata.name)
        .bind(&metadata.content_type)
        .bind(&metadata.collection_id)
        .bind(&metadata.tag_one)
        .bind(&principal.user_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Attachment {} not found", id)))?;

        Ok(row.into_attachment())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_attachment(&self, principal: &Principal, id: &str) -> ServiceResult<()> {
        let (existing, _, has_content) = self.fetch_row(id).await?.into_parts();
        ensure_can_access(principal, &existing)?;

        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("Attachment {} not found", id)));
        }

        if has_content {
            let key = self.storage.build_key(id);
            if let Err(e) = self.storage.delete(&key).await {
                warn!(key = %key, error = %e, "Attachment deleted but its content could not be removed");
            }
        }

        info!(id = %id, "Deleted attachment");
        Ok(())
    }

    fn temp_file_directory(&self) -> PathBuf {
        self.temp_dir.clone()
    }
}
