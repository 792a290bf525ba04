//! Error types for the edgequake-doc2pod library.
//!
//! Failures are split by how far they reach:
//!
//! * [`ExtractionFailure`] — **Non-fatal**: one uploaded document could not
//!   be turned into text. Recorded in [`crate::pipeline::corpus::Corpus`]
//!   next to the file name and never embedded in the text sent to the model.
//!
//! * [`RenderError`] — **Recoverable**: the audio stage failed. The
//!   orchestrator folds it into a partial [`crate::output::GenerationOutcome`]
//!   so the caller still gets the script.
//!
//! * [`PodcastError`] — **Fatal**: nothing usable came out of the request
//!   (no readable documents, script stage failed, bad configuration).
//!   Returned as `Err(PodcastError)` from the top-level entry points.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2pod library.
#[derive(Debug, Error)]
pub enum PodcastError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Every document was unsupported, unreadable or empty.
    #[error("No readable content in the uploaded documents ({})", failed_summary(failed_files))]
    NoContent { failed_files: Vec<String> },

    /// A document could not be loaded from disk.
    #[error("Failed to read document '{path}': {source}")]
    DocumentReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generation request failed validation before any provider call.
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    // ── Provider errors ───────────────────────────────────────────────────
    /// A provider could not be constructed (missing API key etc.).
    #[error("Provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The script stage failed; no audio was attempted.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the script file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single document contributed nothing to the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionFailure {
    /// The extension is not txt, pdf or docx. No parse was attempted.
    #[error("unsupported file type '{extension}'")]
    Unsupported { extension: String },

    /// Bytes could not be decoded into text.
    #[error("could not decode text: {detail}")]
    DecodeError { detail: String },

    /// The parser rejected the file (malformed, encrypted, engine missing).
    #[error("could not read document: {detail}")]
    ReadError { detail: String },

    /// The document parsed but held no text.
    #[error("no text extracted")]
    Empty,
}

/// A failure reported by an external provider (completion or speech).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderError {
    /// 401/403 or an explicit auth rejection. Retrying will not help.
    #[error("authentication error from '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// HTTP 429 or quota exhaustion.
    #[error("rate limit or quota exceeded for '{provider}': {detail}")]
    RateLimited { provider: String, detail: String },

    /// Non-success HTTP status not covered above.
    #[error("'{provider}' returned HTTP {status}: {detail}")]
    Http {
        provider: String,
        status: u16,
        detail: String,
    },

    /// Transport failure or an error without a status code.
    #[error("request to '{provider}' failed: {detail}")]
    Request { provider: String, detail: String },
}

impl ProviderError {
    /// Classify a provider error that is only available as text.
    ///
    /// edgequake-llm surfaces failures as display strings; the status code
    /// is recovered from the message when present.
    pub fn from_message(provider: impl Into<String>, message: impl Into<String>) -> Self {
        let provider = provider.into();
        let detail = message.into();
        let lower = detail.to_lowercase();
        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("unauthorized")
            || lower.contains("invalid api key")
            || lower.contains("authentication")
        {
            ProviderError::Auth { provider, detail }
        } else if lower.contains("429") || lower.contains("rate limit") || lower.contains("quota") {
            ProviderError::RateLimited { provider, detail }
        } else {
            ProviderError::Request { provider, detail }
        }
    }

    /// Classify by HTTP status code.
    pub fn from_status(provider: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        let provider = provider.into();
        let detail = detail.into();
        match status {
            401 | 403 => ProviderError::Auth { provider, detail },
            429 => ProviderError::RateLimited { provider, detail },
            _ => ProviderError::Http {
                provider,
                status,
                detail,
            },
        }
    }
}

/// Script stage failure. Aborts the request; audio is never attempted.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum GenerationError {
    /// The completion provider rejected or failed the call.
    #[error("Script generation failed: {0}")]
    Provider(#[from] ProviderError),

    /// The completion call did not answer in time.
    #[error("Script generation timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Audio stage failure. Recovered into a partial outcome by the orchestrator.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderError {
    /// Nothing to speak.
    #[error("Cannot render audio from an empty script")]
    EmptyScript,

    /// Speed multiplier outside the accepted range. Rejected, never clamped.
    #[error("Speech speed {speed} is outside the supported range 0.25–4.0")]
    SpeedOutOfRange { speed: f32 },

    /// The speech provider failed.
    #[error("Speech synthesis failed: {source}")]
    Provider { source: ProviderError },

    /// A speech request did not answer in time.
    #[error("Speech synthesis timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider reported success but no file exists at the path.
    #[error("Audio file '{path}' was not created")]
    ArtifactMissing { path: PathBuf },

    /// The provider reported success but the file is zero bytes.
    #[error("Audio file '{path}' is empty")]
    ArtifactEmpty { path: PathBuf },

    /// Local file-system failure while writing the audio.
    #[error("I/O error on '{path}': {detail}")]
    Io { path: PathBuf, detail: String },
}

impl From<ProviderError> for RenderError {
    fn from(e: ProviderError) -> Self {
        RenderError::Provider { source: e }
    }
}

fn failed_summary(failed_files: &[String]) -> String {
    if failed_files.is_empty() {
        "no documents given".to_string()
    } else {
        format!("{} failed: {}", failed_files.len(), failed_files.join(", "))
    }
}
