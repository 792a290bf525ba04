//! PDF text extraction via pdfium.
//!
//! Each page's text layer becomes one segment. Pages without a text layer
//! (scans, pure figures) come back empty and are skipped by the extractor.
//!
//! The pdfium shared library is resolved by `pdfium-auto`: `PDFIUM_LIB_PATH`
//! first, then the local cache, then a one-time download. A binding failure
//! is reported as a parse failure for that document rather than a panic, so
//! one unreadable PDF never takes down the rest of the batch.

use crate::pipeline::extract::{ParseError, SegmentParser};
use pdfium_render::prelude::*;
use tracing::debug;

/// Page-by-page PDF text parser.
#[derive(Debug, Clone, Default)]
pub struct PdfiumParser {
    password: Option<String>,
}

impl PdfiumParser {
    /// Parser that opens encrypted documents with `password`.
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
        }
    }
}

impl SegmentParser for PdfiumParser {
    fn extract_segments(&self, bytes: &[u8]) -> Result<Vec<String>, ParseError> {
        if !bytes.starts_with(b"%PDF") {
            let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
            return Err(ParseError::Malformed(format!(
                "not a PDF (first bytes: {magic:?})"
            )));
        }

        let pdfium = pdfium_auto::bind_pdfium_silent()
            .map_err(|e| ParseError::Malformed(format!("PDF engine unavailable: {e}")))?;

        let document = pdfium
            .load_pdf_from_byte_slice(bytes, self.password.as_deref())
            .map_err(|e| ParseError::Malformed(describe_load_error(&e, self.password.is_some())))?;

        let pages = document.pages();
        debug!("PDF loaded: {} pages", pages.len());

        let mut segments = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(text) => segments.push(text.all()),
                Err(e) => {
                    // A page whose text layer cannot be read is skipped like a blank page.
                    debug!("page {}: no text layer ({:?})", idx + 1, e);
                    segments.push(String::new());
                }
            }
        }

        Ok(segments)
    }
}

fn describe_load_error(e: &PdfiumError, had_password: bool) -> String {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            "wrong password for encrypted PDF".to_string()
        } else {
            "PDF is encrypted and requires a password".to_string()
        }
    } else {
        format!("corrupt PDF: {err_str}")
    }
}
