//! # edgequake-doc2pod
//!
//! Turn a stack of documents (plain text, PDF, DOCX) into a narrated podcast
//! episode: a language model writes the script, a text-to-speech model
//! voices it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! documents
//!  │
//!  ├─ 1. Extract   txt / pdf (pdfium) / docx (zip + WordprocessingML)
//!  ├─ 2. Assemble  labelled corpus + read/failed file lists
//!  ├─ 3. Script    one completion call: persona + instructions + length target
//!  ├─ 4. Polish    strip fences and markup the voice must not read
//!  └─ 5. Audio     speech synthesis → verified MP3 at the caller's path
//! ```
//!
//! The outcome is tri-state: **complete** (script and audio), **partial**
//! (script only, audio failed) or an error when there was nothing to narrate
//! or the script stage failed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2pod::{GenerationRequest, PodcastConfig, PodcastGenerator, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Completion provider auto-detected; speech needs OPENAI_API_KEY
//!     let generator = PodcastGenerator::from_config(PodcastConfig::default())?;
//!     let docs = vec![UploadedDocument::from_path("newsletter.pdf").await?];
//!     let request = GenerationRequest::builder().target_minutes(5).build()?;
//!
//!     let outcome = generator.run(docs, &request, "episode.mp3").await?;
//!     println!("{}", outcome.status());
//!     if let Some(script) = outcome.script_text() {
//!         println!("{script}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `doc2pod` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off     | Embeds the pdfium library in the binary instead of downloading it |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doc2pod = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    GenerationRequest, GenerationRequestBuilder, PodcastConfig, PodcastConfigBuilder, Voice,
};
pub use document::{DocumentKind, ExtractionResult, ExtractionStatus, UploadedDocument};
pub use error::{ExtractionFailure, GenerationError, PodcastError, ProviderError, RenderError};
pub use generate::{save_script, GenerationStage, PodcastGenerator};
pub use output::{
    AudioArtifact, GenerationOutcome, GenerationStats, OutcomeError, OutcomeStatus, PodcastScript,
};
pub use pipeline::corpus::{Corpus, FailedDocument};
pub use pipeline::extract::TextExtractor;
pub use pipeline::llm::{Completion, CompletionBackend, CompletionParams, LlmCompletion};
pub use pipeline::speech::{OpenAiSpeech, SpeechBackend};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
