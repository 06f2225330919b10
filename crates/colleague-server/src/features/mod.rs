//! Feature modules implementing the Colleague attachment API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes:
//! - `commands/` - Write operations (create, upload, update, delete)
//! - `queries/` - Read operations (list, search, content)
//! - `routes.rs` - HTTP route definitions and error mapping

pub mod attachments;

use axum::Router;
use std::sync::Arc;

use crate::services::AttachmentService;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Backend that stores attachment records and content
    pub attachments: Arc<dyn AttachmentService>,
    /// Largest upload accepted, in bytes
    pub max_request_size: u64,
}

/// Creates the router with all feature routes mounted
///
/// Attachment routes live at the root (`/attachments`, `/qapi/attachments`)
/// to match the paths existing Colleague clients call.
pub fn router(state: FeatureState) -> Router<()> {
    let attachments_state = attachments::AttachmentsState {
        service: state.attachments,
        limits: attachments::UploadLimits {
            max_request_size: state.max_request_size,
        },
    };

    Router::new().merge(attachments::attachments_routes().with_state(attachments_state))
}
