//! Text extraction: one uploaded document → plain text or a typed failure.
//!
//! PDF and DOCX parsing sit behind [`SegmentParser`]: each parser returns the
//! document as ordered segments (pages for PDF, paragraphs for DOCX) and the
//! extractor joins the non-blank ones with newlines. Keeping the join here
//! means both formats share the same "blank segment is skipped, all-blank
//! document is empty" rule.
//!
//! Extraction never fails the caller. Every problem becomes an
//! [`ExtractionFailure`] on the returned [`ExtractionResult`].

use crate::document::{DocumentKind, ExtractionResult, UploadedDocument};
use crate::error::ExtractionFailure;
use crate::pipeline::docx::DocxParser;
use crate::pipeline::pdf::PdfiumParser;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// A parser rejected its input.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// Structure is broken, encrypted or otherwise unreadable.
    #[error("{0}")]
    Malformed(String),

    /// Content was found but its bytes are not valid text.
    #[error("{0}")]
    Encoding(String),
}

impl From<ParseError> for ExtractionFailure {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Malformed(detail) => ExtractionFailure::ReadError { detail },
            ParseError::Encoding(detail) => ExtractionFailure::DecodeError { detail },
        }
    }
}

/// Turns a binary document into ordered text segments.
///
/// Implementations are synchronous; callers in async code run extraction
/// inside `spawn_blocking`.
pub trait SegmentParser: Send + Sync {
    fn extract_segments(&self, bytes: &[u8]) -> Result<Vec<String>, ParseError>;
}

/// Dispatches each document to the decoder or parser for its kind.
#[derive(Clone)]
pub struct TextExtractor {
    pdf: Arc<dyn SegmentParser>,
    docx: Arc<dyn SegmentParser>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self {
            pdf: Arc::new(PdfiumParser::default()),
            docx: Arc::new(DocxParser),
        }
    }
}

impl fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextExtractor")
            .field("pdf", &"<dyn SegmentParser>")
            .field("docx", &"<dyn SegmentParser>")
            .finish()
    }
}

impl TextExtractor {
    /// Build an extractor with explicit parsers.
    pub fn new(pdf: Arc<dyn SegmentParser>, docx: Arc<dyn SegmentParser>) -> Self {
        Self { pdf, docx }
    }

    /// Replace the PDF parser.
    pub fn with_pdf_parser(mut self, parser: Arc<dyn SegmentParser>) -> Self {
        self.pdf = parser;
        self
    }

    /// Replace the DOCX parser.
    pub fn with_docx_parser(mut self, parser: Arc<dyn SegmentParser>) -> Self {
        self.docx = parser;
        self
    }

    /// Extract one document.
    pub fn extract(&self, doc: &UploadedDocument) -> ExtractionResult {
        let name = doc.name();
        let outcome = match doc.kind() {
            DocumentKind::Txt => decode_text(doc.bytes()),
            DocumentKind::Pdf => self.parse_with(self.pdf.as_ref(), doc.bytes()),
            DocumentKind::Docx => self.parse_with(self.docx.as_ref(), doc.bytes()),
            DocumentKind::Unsupported => Err(ExtractionFailure::Unsupported {
                extension: doc.extension(),
            }),
        };

        match outcome {
            Ok(text) if text.trim().is_empty() => {
                ExtractionResult::failed(name, ExtractionFailure::Empty)
            }
            Ok(text) => {
                debug!("{}: extracted {} chars", name, text.len());
                ExtractionResult::ok(name, text)
            }
            Err(failure) => {
                warn!("{}: {}", name, failure);
                ExtractionResult::failed(name, failure)
            }
        }
    }

    fn parse_with(
        &self,
        parser: &dyn SegmentParser,
        bytes: &[u8],
    ) -> Result<String, ExtractionFailure> {
        let segments = parser.extract_segments(bytes)?;
        Ok(join_segments(&segments))
    }
}

/// Decode plain text: UTF-8 first, Latin-1 as the fallback.
///
/// A leading UTF-8 byte-order mark is dropped. Latin-1 maps every byte to a
/// code point, so the fallback itself cannot fail; `DecodeError` is reserved
/// for parsers that find text they cannot decode.
pub fn decode_text(bytes: &[u8]) -> Result<String, ExtractionFailure> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            debug!("not UTF-8 ({}), decoding as Latin-1", e);
            Ok(bytes.iter().map(|&b| b as char).collect())
        }
    }
}

/// Join non-blank segments with a newline.
pub fn join_segments(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| s.trim_end())
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
