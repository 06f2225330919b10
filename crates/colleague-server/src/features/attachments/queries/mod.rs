pub mod get_content;
pub mod list;
pub mod search;

pub use get_content::{GetAttachmentContentError, GetAttachmentContentQuery};
pub use list::{ListAttachmentsError, ListAttachmentsQuery};
pub use search::{SearchAttachmentsError, SearchAttachmentsQuery};
