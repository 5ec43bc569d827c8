// Re-export model types and service functions
pub mod http;
pub mod model;
pub mod service;

pub use model::{
    AddLinkPayload, Attachment, AttachmentPolicy, AttachmentSource, FileUpload,
    UploadAttachmentPayload,
};
pub use http::*;
pub use service::*;
