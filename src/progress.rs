//! Progress-callback trait for generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::PodcastConfigBuilder::progress_callback`] to follow a
//! request through its stages. The library knows nothing about how the host
//! displays progress; the CLI forwards events to an indicatif spinner, a UI
//! could forward them to a channel.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2pod::{GenerationProgressCallback, GenerationStage, PodcastConfig};
//! use std::sync::Arc;
//!
//! struct StagePrinter;
//!
//! impl GenerationProgressCallback for StagePrinter {
//!     fn on_stage(&self, stage: GenerationStage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = PodcastConfig::builder()
//!     .progress_callback(Arc::new(StagePrinter))
//!     .build()
//!     .unwrap();
//! ```

use crate::generate::GenerationStage;
use crate::output::OutcomeStatus;
use std::sync::Arc;

/// Called by the pipeline as a request moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Extraction events fire from a blocking worker
/// thread, hence `Send + Sync`.
pub trait GenerationProgressCallback: Send + Sync {
    /// The request entered `stage`.
    fn on_stage(&self, stage: GenerationStage) {
        let _ = stage;
    }

    /// A document was read and joined the corpus.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the input list
    /// * `total` — number of input documents
    /// * `name`  — document name
    /// * `chars` — length of the extracted text in characters
    fn on_document_read(&self, index: usize, total: usize, name: &str, chars: usize) {
        let _ = (index, total, name, chars);
    }

    /// A document was skipped.
    fn on_document_failed(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// The script is ready to render.
    fn on_script_ready(&self, words: usize) {
        let _ = words;
    }

    /// The request reached a terminal state.
    fn on_generation_complete(&self, status: OutcomeStatus) {
        let _ = status;
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PodcastConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
