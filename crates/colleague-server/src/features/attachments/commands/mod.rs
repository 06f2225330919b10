pub mod create;
pub mod delete;
pub mod update;
pub mod upload;

pub use create::{CreateAttachmentCommand, CreateAttachmentError};
pub use delete::{DeleteAttachmentCommand, DeleteAttachmentError};
pub use update::{UpdateAttachmentCommand, UpdateAttachmentError};
pub use upload::{UploadAttachmentCommand, UploadAttachmentError, UploadLimits};
