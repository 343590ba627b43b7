use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::path::Path;

use crate::error::FileValidationError;

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DocumentKind {
    Jpeg,
    Png,
    Heic,
    Pdf,
}

impl DocumentKind {
    pub fn mime(&self) -> &'static str {
        match self {
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Png => "image/png",
            DocumentKind::Heic => "image/heic",
            DocumentKind::Pdf => "application/pdf",
        }
    }

    /// Magic bytes first, extension second.
    fn detect(name: &str, bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Png) => return Some(DocumentKind::Png),
            Ok(image::ImageFormat::Jpeg) => return Some(DocumentKind::Jpeg),
            _ => {}
        }
        if bytes.starts_with(b"%PDF-") {
            return Some(DocumentKind::Pdf);
        }
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            if let b"heic" | b"heix" | b"hevc" | b"heif" | b"mif1" | b"msf1" = &bytes[8..12] {
                return Some(DocumentKind::Heic);
            }
        }

        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;
        match ext.as_str() {
            "jpg" | "jpeg" => Some(DocumentKind::Jpeg),
            "png" => Some(DocumentKind::Png),
            "heic" | "heif" => Some(DocumentKind::Heic),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }
}

/// A validated upload, ready to be sent to a vision model.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub kind: DocumentKind,
    bytes: Vec<u8>,
}

impl Document {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, FileValidationError> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(FileValidationError::Empty { name });
        }
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(FileValidationError::TooLarge {
                name,
                size: bytes.len(),
                limit: MAX_DOCUMENT_BYTES,
            });
        }
        let kind = DocumentKind::detect(&name, &bytes)
            .ok_or_else(|| FileValidationError::UnsupportedType { name: name.clone() })?;

        Ok(Self { name, kind, bytes })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileValidationError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        // Check the size before pulling the whole file into memory.
        let size = std::fs::metadata(path)
            .map_err(|source| FileValidationError::Io {
                name: name.clone(),
                source,
            })?
            .len();
        if size > MAX_DOCUMENT_BYTES as u64 {
            return Err(FileValidationError::TooLarge {
                name,
                size: size as usize,
                limit: MAX_DOCUMENT_BYTES,
            });
        }

        let bytes = std::fs::read(path).map_err(|source| FileValidationError::Io {
            name: name.clone(),
            source,
        })?;
        Self::from_bytes(name, bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.kind.mime(), self.to_base64())
    }
}
