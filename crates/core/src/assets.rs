//! Media asset kinds and upload metadata validation.
//!
//! Assets are polymorphic: one table stores images, audio, video and
//! documents, discriminated by [`AssetKind`]. The declared MIME type must
//! agree with the kind.

use crate::error::CoreError;
use crate::status::define_code_enum;

define_code_enum! {
    /// Media asset discriminator.
    AssetKind {
        Image = 1 => "image",
        Audio = 2 => "audio",
        Video = 3 => "video",
        Document = 4 => "document",
    }
}

/// MIME types accepted for [`AssetKind::Document`] outside `text/*`.
const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/rtf",
];

impl AssetKind {
    /// Whether `content_type` is acceptable for this kind.
    pub fn accepts(self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            AssetKind::Image => mime.starts_with("image/"),
            AssetKind::Audio => mime.starts_with("audio/"),
            AssetKind::Video => mime.starts_with("video/"),
            AssetKind::Document => {
                mime.starts_with("text/") || DOCUMENT_TYPES.contains(&mime.as_str())
            }
        }
    }
}

/// Validate upload metadata for a new asset.
pub fn validate_asset(
    kind: AssetKind,
    file_path: &str,
    content_type: &str,
    size_bytes: i64,
) -> Result<(), CoreError> {
    if file_path.trim().is_empty() {
        return Err(CoreError::Validation("Asset file path must not be empty".into()));
    }
    if size_bytes < 0 {
        return Err(CoreError::Validation(format!(
            "Asset size must not be negative, got {size_bytes}"
        )));
    }
    if !kind.accepts(content_type) {
        return Err(CoreError::Validation(format!(
            "Content type '{content_type}' is not valid for {kind} assets"
        )));
    }
    Ok(())
}
