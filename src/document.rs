//! Uploaded documents and per-document extraction results.

use crate::error::{ExtractionFailure, PodcastError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Declared format of an uploaded document, taken from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Txt,
    Pdf,
    Docx,
    Unsupported,
}

impl DocumentKind {
    /// Classify a file name by its (case-insensitive) extension.
    pub fn from_name(name: &str) -> Self {
        match extension_of(name).as_str() {
            "txt" => DocumentKind::Txt,
            "pdf" => DocumentKind::Pdf,
            "docx" => DocumentKind::Docx,
            _ => DocumentKind::Unsupported,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentKind::Txt => "txt",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Lower-cased extension without the dot; empty when there is none.
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// One document supplied by the caller. Immutable once built.
#[derive(Clone)]
pub struct UploadedDocument {
    name: String,
    kind: DocumentKind,
    bytes: Vec<u8>,
}

impl UploadedDocument {
    /// Wrap raw bytes; the kind is derived from `name`.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let kind = DocumentKind::from_name(&name);
        Self {
            name,
            kind,
            bytes: bytes.into(),
        }
    }

    /// Load a document from disk, naming it after the file name component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PodcastError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PodcastError::DocumentReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lower-cased extension, for diagnostics on unsupported files.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Coarse status of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Ok,
    Empty,
    Unsupported,
    DecodeError,
    ReadError,
}

/// Outcome of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub name: String,
    /// Extracted text; `None` whenever `failure` is set.
    pub text: Option<String>,
    pub failure: Option<ExtractionFailure>,
}

impl ExtractionResult {
    pub(crate) fn ok(name: &str, text: String) -> Self {
        Self {
            name: name.to_string(),
            text: Some(text),
            failure: None,
        }
    }

    pub(crate) fn failed(name: &str, failure: ExtractionFailure) -> Self {
        Self {
            name: name.to_string(),
            text: None,
            failure: Some(failure),
        }
    }

    pub fn status(&self) -> ExtractionStatus {
        match &self.failure {
            None => ExtractionStatus::Ok,
            Some(ExtractionFailure::Empty) => ExtractionStatus::Empty,
            Some(ExtractionFailure::Unsupported { .. }) => ExtractionStatus::Unsupported,
            Some(ExtractionFailure::DecodeError { .. }) => ExtractionStatus::DecodeError,
            Some(ExtractionFailure::ReadError { .. }) => ExtractionStatus::ReadError,
        }
    }

    /// Text usable in the corpus: status ok and not blank.
    pub fn usable_text(&self) -> Option<&str> {
        match (&self.failure, &self.text) {
            (None, Some(t)) if !t.trim().is_empty() => Some(t.as_str()),
            _ => None,
        }
    }
}
