//! Corpus assembly: many documents → one labelled text blob for the model.
//!
//! Failed documents are tracked out-of-band in [`Corpus::failed_files`].
//! Their error messages never reach [`Corpus::text`], so nothing like
//! "unsupported file type" can end up narrated in the podcast.

use crate::document::UploadedDocument;
use crate::error::ExtractionFailure;
use crate::pipeline::extract::TextExtractor;
use crate::progress::GenerationProgressCallback;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A document that contributed nothing, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDocument {
    pub name: String,
    pub reason: ExtractionFailure,
}

/// Assembled text of every successfully read document, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    /// Delimited text sent to the model as user content. Empty iff no
    /// document yielded text.
    pub text: String,
    /// Documents that made it into `text`, in input order.
    pub read_files: Vec<String>,
    /// Documents that were skipped, in input order.
    pub failed_files: Vec<FailedDocument>,
}

impl Corpus {
    /// `true` when no document produced usable text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Names of the failed documents.
    pub fn failed_names(&self) -> Vec<String> {
        self.failed_files.iter().map(|f| f.name.clone()).collect()
    }
}

/// Render one document section.
pub fn format_section(name: &str, text: &str) -> String {
    format!("--- Content from {name} ---\n{text}\n--- End of {name} ---")
}

/// Extract every document and build the corpus, always returning the
/// succeeded/failed partition (even when nothing succeeded).
pub fn assemble(
    documents: &[UploadedDocument],
    extractor: &TextExtractor,
    progress: Option<&dyn GenerationProgressCallback>,
) -> Corpus {
    let total = documents.len();
    let mut sections = Vec::with_capacity(total);
    let mut corpus = Corpus::default();

    for (i, doc) in documents.iter().enumerate() {
        let result = extractor.extract(doc);
        match (result.usable_text(), result.failure.clone()) {
            (Some(text), _) => {
                sections.push(format_section(doc.name(), text.trim_end()));
                corpus.read_files.push(doc.name().to_string());
                if let Some(cb) = progress {
                    cb.on_document_read(i + 1, total, doc.name(), text.chars().count());
                }
            }
            (None, failure) => {
                let reason = failure.unwrap_or(ExtractionFailure::Empty);
                if let Some(cb) = progress {
                    cb.on_document_failed(i + 1, total, doc.name(), &reason.to_string());
                }
                corpus.failed_files.push(FailedDocument {
                    name: doc.name().to_string(),
                    reason,
                });
            }
        }
    }

    corpus.text = sections.join("\n\n");
    info!(
        "Corpus assembled: {} read, {} failed, {} chars",
        corpus.read_files.len(),
        corpus.failed_files.len(),
        corpus.text.len()
    );
    corpus
}

/// Extract and assemble; `None` when no document yielded text.
pub fn read_documents(documents: &[UploadedDocument], extractor: &TextExtractor) -> Option<Corpus> {
    let corpus = assemble(documents, extractor, None);
    if corpus.is_empty() {
        None
    } else {
        Some(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txt(name: &str, body: &str) -> UploadedDocument {
        UploadedDocument::new(name, body.as_bytes().to_vec())
    }

    #[test]
    fn single_document_section() {
        let corpus = read_documents(&[txt("news.txt", "Hello newsletter.")], &TextExtractor::default())
            .expect("corpus");
        assert_eq!(
            corpus.text,
            "--- Content from news.txt ---\nHello newsletter.\n--- End of news.txt ---"
        );
        assert_eq!(corpus.read_files, vec!["news.txt"]);
        assert!(corpus.failed_files.is_empty());
    }

    #[test]
    fn preserves_input_order() {
        let corpus = read_documents(
            &[txt("b.txt", "second"), txt("a.txt", "first")],
            &TextExtractor::default(),
        )
        .expect("corpus");
        assert_eq!(corpus.read_files, vec!["b.txt", "a.txt"]);
        let b = corpus.text.find("second").expect("b present");
        let a = corpus.text.find("first").expect("a present");
        assert!(b < a);
    }

    #[test]
    fn all_failed_is_none() {
        let docs = [
            txt("sheet.xlsx", "cells"),
            txt("blank.txt", "   "),
            txt("slides.pptx", "x"),
        ];
        assert!(read_documents(&docs, &TextExtractor::default()).is_none());

        let corpus = assemble(&docs, &TextExtractor::default(), None);
        assert!(corpus.is_empty());
        assert_eq!(corpus.failed_names(), vec!["sheet.xlsx", "blank.txt", "slides.pptx"]);
        assert_eq!(corpus.failed_files[1].reason, ExtractionFailure::Empty);
    }

    #[test]
    fn failures_never_leak_into_text() {
        let corpus = read_documents(
            &[txt("ok.txt", "real content"), txt("bad.odt", "zzz")],
            &TextExtractor::default(),
        )
        .expect("corpus");
        assert!(!corpus.text.contains("bad.odt"));
        assert!(!corpus.text.contains('['));
        assert!(!corpus.text.to_lowercase().contains("unsupported"));
        assert_eq!(corpus.failed_names(), vec!["bad.odt"]);
    }

    #[test]
    fn no_documents_is_none() {
        assert!(read_documents(&[], &TextExtractor::default()).is_none());
    }
}
