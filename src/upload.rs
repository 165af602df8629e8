//! Image intake: read a file, identify its MIME type, enforce upload limits.

use std::path::Path;

use serde::Serialize;

use crate::config::MAX_IMAGE_BYTES;
use crate::error::ClientError;

/// An image ready to be sent to the AI service.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Metadata shown next to the preview. Never carries the bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    pub fn new(filename: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: sanitize_filename(filename),
            mime_type: mime_type.trim().to_ascii_lowercase(),
            bytes,
        }
    }

    /// Load a file from disk.
    ///
    /// The MIME type comes from magic bytes when recognised, otherwise from
    /// the extension. Files over the limit are rejected before being read.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_IMAGE_BYTES {
            return Err(too_large());
        }

        let bytes = std::fs::read(path)?;
        let mime_type = sniff_image_mime(&bytes)
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image");

        tracing::debug!(
            filename,
            mime = %mime_type,
            size = bytes.len(),
            "Image loaded from disk"
        );

        Ok(Self::new(filename, &mime_type, bytes))
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Enforce `image/*` and the size limit.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !self.mime_type.starts_with("image/") {
            return Err(ClientError::invalid_image("Please select a valid image file"));
        }
        if self.size_bytes() > MAX_IMAGE_BYTES {
            return Err(too_large());
        }
        Ok(())
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}

fn too_large() -> ClientError {
    ClientError::invalid_image(format!(
        "Image file too large. Maximum size is {}MB.",
        MAX_IMAGE_BYTES / (1024 * 1024)
    ))
}

/// Identify common image formats from their leading bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some("image/tiff"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// Strip path components and control characters, limit length.
pub fn sanitize_filename(original: &str) -> String {
    let name = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let clean: String = name
        .chars()
        .filter(|c| !c.is_control())
        .take(255)
        .collect();

    if clean.trim().is_empty() {
        "image".to_string()
    } else {
        clean
    }
}
