//! Output types returned by a generation run.

use crate::error::RenderError;
use crate::pipeline::corpus::FailedDocument;
use crate::pipeline::postprocess::word_count;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A cleaned, non-blank podcast script.
///
/// Only constructible through [`PodcastScript::new`], which refuses blank
/// text, so holding one means there is something to voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PodcastScript(String);

impl PodcastScript {
    /// `None` if `text` is empty or whitespace-only.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PodcastScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PodcastScript {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A verified audio file: it exists and is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Terminal state of one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Script and audio both produced.
    Complete,
    /// Script produced, audio failed or was unverifiable.
    Partial,
    /// No usable script.
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeStatus::Complete => "complete",
            OutcomeStatus::Partial => "partial",
            OutcomeStatus::Failed => "failed",
        })
    }
}

/// Error detail attached to a non-complete outcome.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum OutcomeError {
    /// The model answered, but nothing survived cleanup.
    #[error("The model returned an empty script")]
    EmptyScript,

    /// The audio stage failed; the script is still valid.
    #[error("Audio rendering failed: {error}")]
    Audio { error: RenderError },
}

/// Token usage and wall-clock time per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationStats {
    pub documents_read: usize,
    pub documents_failed: usize,
    pub corpus_chars: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub script_words: usize,
    pub audio_bytes: u64,
    pub extract_duration_ms: u64,
    pub script_duration_ms: u64,
    pub audio_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of [`PodcastGenerator::generate`](crate::PodcastGenerator::generate).
///
/// | script | audio | status     |
/// |--------|-------|------------|
/// | set    | set   | `Complete` |
/// | set    | none  | `Partial`  |
/// | none   | none  | `Failed`   |
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub script: Option<PodcastScript>,
    pub audio: Option<AudioArtifact>,
    pub error: Option<OutcomeError>,
    /// Documents that made it into the corpus, in input order.
    pub read_files: Vec<String>,
    /// Documents left out of the corpus, with the reason.
    pub failed_files: Vec<FailedDocument>,
    pub stats: GenerationStats,
}

impl GenerationOutcome {
    pub fn status(&self) -> OutcomeStatus {
        match (&self.script, &self.audio) {
            (Some(_), Some(_)) => OutcomeStatus::Complete,
            (Some(_), None) => OutcomeStatus::Partial,
            (None, _) => OutcomeStatus::Failed,
        }
    }

    pub fn audio_path(&self) -> Option<&Path> {
        self.audio.as_ref().map(|a| a.path.as_path())
    }

    pub fn script_text(&self) -> Option<&str> {
        self.script.as_ref().map(PodcastScript::as_str)
    }

    /// The audio-stage error, if the run ended partial.
    pub fn render_error(&self) -> Option<&RenderError> {
        match &self.error {
            Some(OutcomeError::Audio { error }) => Some(error),
            _ => None,
        }
    }
}
