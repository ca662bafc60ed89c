//! Checks applied to uploaded files before they reach the blob store.

use std::path::Path;

use bytes::Bytes;
use thiserror::Error;

use crate::model::SubmissionMethod;

const MIB: usize = 1024 * 1024;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name as sent by the client, possibly with directories.
    pub file_name: String,
    pub bytes: Bytes,
}

/// Why an upload was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejected {
    #[error("File name is missing")]
    MissingName,

    #[error("File is empty")]
    Empty,

    #[error("Invalid file type. Allowed: {allowed}")]
    Extension { allowed: String },

    #[error("File too large (max {max_mib}MB)")]
    TooLarge { max_mib: usize },
}

/// Category of an upload, which decides extensions and size cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Text,
    Audio,
}

/// An upload that passed the checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedUpload {
    /// Final path component, restricted to `[A-Za-z0-9._-]`.
    pub file_name: String,
    pub content_type: &'static str,
}

impl UploadKind {
    /// Upload kind for a file-based submission method.
    pub fn for_method(method: SubmissionMethod) -> Option<Self> {
        match method {
            SubmissionMethod::Manual => None,
            SubmissionMethod::Upload => Some(Self::Text),
            SubmissionMethod::Recording => Some(Self::Audio),
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            Self::Text => 5 * MIB,
            Self::Audio => 10 * MIB,
        }
    }

    /// Allowed extensions with their content types.
    fn formats(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Text => &[
                ("txt", "text/plain"),
                ("doc", "application/msword"),
                (
                    "docx",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                ),
                ("pdf", "application/pdf"),
            ],
            Self::Audio => &[
                ("mp3", "audio/mpeg"),
                ("wav", "audio/wav"),
                ("m4a", "audio/mp4"),
                ("ogg", "audio/ogg"),
            ],
        }
    }

    pub fn check(&self, file: &UploadedFile) -> Result<CheckedUpload, UploadRejected> {
        let file_name = sanitize_file_name(&file.file_name).ok_or(UploadRejected::MissingName)?;

        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let content_type = extension
            .and_then(|ext| {
                self.formats()
                    .iter()
                    .find(|(allowed, _)| *allowed == ext)
                    .map(|(_, content_type)| *content_type)
            })
            .ok_or_else(|| UploadRejected::Extension {
                allowed: self
                    .formats()
                    .iter()
                    .map(|(ext, _)| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        if file.bytes.is_empty() {
            return Err(UploadRejected::Empty);
        }
        if file.bytes.len() > self.max_bytes() {
            return Err(UploadRejected::TooLarge {
                max_mib: self.max_bytes() / MIB,
            });
        }

        Ok(CheckedUpload {
            file_name,
            content_type,
        })
    }
}

/// Keep the last path component and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(cleaned)
    }
}
