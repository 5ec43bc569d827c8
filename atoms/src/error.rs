use thiserror::Error;

/// Failure taxonomy of the task store. Validation-class errors abort the
/// triggering action with no partial state change; `Storage` wraps the
/// underlying persistence error text.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("name already exists: {0}")]
    DuplicateName(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("file too large: {name} is {size} bytes (limit {limit})")]
    FileTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    /// HTTP status this error maps to at the routing layer.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Validation(_)
            | StoreError::UnsupportedFileType(_)
            | StoreError::InvalidUrl(_) => 400,
            StoreError::NotFound(_) => 404,
            StoreError::DuplicateName(_) => 409,
            StoreError::FileTooLarge { .. } => 413,
            StoreError::Storage(_) => 500,
        }
    }
}
