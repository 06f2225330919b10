//! Colleague Attachment Server Library
//!
//! HTTP front end for storing and retrieving Colleague attachments.
//!
//! # Overview
//!
//! - **Ingestion**: multipart uploads are streamed to request-scoped temp
//!   files, sized from the bytes received, and handed to the attachment
//!   service; temp files are always removed before the request completes
//! - **Retrieval**: listing, criteria search, and streamed content download
//!   with client-side encryption parameters echoed in `X-Encr-*` headers
//! - **Persistence**: PostgreSQL for metadata, S3-compatible storage for content
//!
//! # Architecture
//!
//! Each feature is a vertical slice of commands (writes) and queries (reads)
//! with its own routes. Handlers depend only on the [`services::AttachmentService`]
//! trait, so tests can substitute an in-memory implementation.
//!
//! # Example
//!
//! ```no_run
//! use colleague_server::{api, config::Config, features::FeatureState};
//! use std::sync::Arc;
//!
//! # fn service() -> Arc<dyn colleague_server::services::AttachmentService> { unimplemented!() }
//! let config = Config::load().unwrap();
//! let state = FeatureState {
//!     attachments: service(),
//!     max_request_size: config.attachments.max_request_size,
//! };
//! let app = api::create_router(state, &config);
//! ```

pub mod api;
pub mod config;
pub mod features;
pub mod middleware;
pub mod principal;
pub mod services;
pub mod storage;

pub use principal::Principal;
pub use services::{AttachmentService, ServiceError, ServiceResult};
