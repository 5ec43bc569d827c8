use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const DEFAULT_REMOTE_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_LOCAL_MAX_BYTES: usize = 5 * 1024 * 1024 / 2;

/// File or link attached to a task. Persisted only when the enclosing task
/// save completes; see `session::EditSession` for the staging rules.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub mime: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub source: AttachmentSource,
}

/// Where the attachment's content lives. Exactly one variant per record:
/// embedded payloads carry no external reference, stored blobs keep their
/// object path for cascade delete, links carry only a URL.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttachmentSource {
    Embedded { data_url: String },
    Stored { url: String, storage_path: String },
    Link { url: String },
}

impl Attachment {
    /// True for external links (no binary payload anywhere).
    pub fn external(&self) -> bool {
        matches!(self.source, AttachmentSource::Link { .. })
    }

    /// Retrieval location, when the content lives outside the record.
    pub fn url(&self) -> Option<&str> {
        match &self.source {
            AttachmentSource::Embedded { .. } => None,
            AttachmentSource::Stored { url, .. } | AttachmentSource::Link { url } => Some(url),
        }
    }
}

/// Incoming file content before it is staged or persisted.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Upload acceptance rules. The byte ceiling is configurable, not a fixed
/// constant; the MIME allowlist is only enforced in the local shape.
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    pub max_bytes: usize,
    pub allowed_mime: Option<Vec<String>>,
}

impl AttachmentPolicy {
    /// Remote-shape default: 5 MiB ceiling, any MIME type.
    pub fn remote() -> Self {
        Self {
            max_bytes: DEFAULT_REMOTE_MAX_BYTES,
            allowed_mime: None,
        }
    }

    /// Local-shape default: 2.5 MiB ceiling, images plus PDF and Word
    /// documents.
    pub fn local() -> Self {
        Self {
            max_bytes: DEFAULT_LOCAL_MAX_BYTES,
            allowed_mime: Some(vec![
                "image/".to_string(),
                "application/pdf".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
            ]),
        }
    }

    pub fn from_env() -> Self {
        let mut policy = Self::remote();
        if let Some(max) = std::env::var("MAX_ATTACHMENT_BYTES")
            .ok()
            .and_then(|raw| raw.parse().ok())
        {
            policy.max_bytes = max;
        }
        policy
    }

    /// Accepts `mime` when no allowlist is set, on an exact entry match, or
    /// on a prefix entry ending in `/` (the `image/*` family).
    pub fn allows_mime(&self, mime: &str) -> bool {
        match &self.allowed_mime {
            None => true,
            Some(allowed) => allowed.iter().any(|entry| {
                if entry.ends_with('/') {
                    mime.starts_with(entry.as_str())
                } else {
                    mime == entry
                }
            }),
        }
    }

    /// Gate an upload before it may enter any working set.
    pub fn check(&self, upload: &FileUpload) -> Result<(), StoreError> {
        if !self.allows_mime(&upload.mime) {
            return Err(StoreError::UnsupportedFileType(format!(
                "{} ({})",
                upload.name, upload.mime
            )));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(StoreError::FileTooLarge {
                name: upload.name.clone(),
                size: upload.bytes.len(),
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadAttachmentPayload {
    pub name: String,
    pub mime: String,
    pub data_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct AddLinkPayload {
    pub url: String,
    pub label: Option<String>,
}

/// Well-formedness gate for external links: http(s) scheme and a plausible
/// host portion.
pub fn validate_url(url: &str) -> Result<(), StoreError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| StoreError::InvalidUrl(url.to_string()))?;
    let host = rest.split('/').next().unwrap_or("");
    if host.is_empty() || (!host.contains('.') && host != "localhost") {
        return Err(StoreError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

/// Display name for a link: the label when given, otherwise the URL with
/// its scheme stripped, clamped to 60 characters.
pub fn link_name(url: &str, label: Option<&str>) -> String {
    match label.map(str::trim).filter(|l| !l.is_empty()) {
        Some(label) => label.to_string(),
        None => {
            let stripped = url
                .strip_prefix("https://")
                .or_else(|| url.strip_prefix("http://"))
                .unwrap_or(url);
            stripped.chars().take(60).collect()
        }
    }
}

/// Object key for an uploaded file: `tasks/{task_id}/{millis}-{name}` with
/// whitespace runs collapsed to underscores.
pub fn storage_path(task_id: &str, uploaded_at: DateTime<Utc>, file_name: &str) -> String {
    let sanitized = file_name.split_whitespace().collect::<Vec<_>>().join("_");
    format!(
        "tasks/{}/{}-{}",
        task_id,
        uploaded_at.timestamp_millis(),
        sanitized
    )
}

/// Self-contained payload for the local shape, mirroring a browser
/// `FileReader.readAsDataURL` result.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}
