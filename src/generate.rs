//! Pipeline orchestration: documents → corpus → script → audio.
//!
//! [`PodcastGenerator`] owns its external capabilities (completion and
//! speech backends) from construction onwards. There is no global client:
//! [`PodcastGenerator::from_config`] fails loudly when credentials are
//! missing, and tests inject fakes through [`PodcastGenerator::new`].
//!
//! ## State machine
//!
//! ```text
//! IDLE → EXTRACTING → (no content) ─────────────────────────────→ Err(NoContent)
//!                   → ASSEMBLED → SYNTHESIZING → (script error) → Err(Generation)
//!                                              → (empty script) → FAILED outcome
//!                                              → SCRIPT_READY → RENDERING → (audio error) → PARTIAL
//!                                                                         → COMPLETE
//! ```
//!
//! Every transition happens at most once per request. Corpus and script
//! failures come back as `Err`; audio failures never do, they turn into a
//! partial outcome that still carries the script.

use crate::config::{GenerationRequest, PodcastConfig};
use crate::document::UploadedDocument;
use crate::error::PodcastError;
use crate::output::{GenerationOutcome, GenerationStats, OutcomeError, OutcomeStatus, PodcastScript};
use crate::pipeline::corpus::{self, Corpus};
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::llm::{CompletionBackend, CompletionParams, LlmCompletion};
use crate::pipeline::pdf::PdfiumParser;
use crate::pipeline::script::{self, ScriptSettings};
use crate::pipeline::speech::{OpenAiSpeech, SpeechBackend};
use crate::pipeline::audio;
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Where a request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Idle,
    Extracting,
    Assembled,
    Synthesizing,
    ScriptReady,
    Rendering,
    Complete,
    Partial,
    Failed,
}

impl GenerationStage {
    /// `true` for the three end states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationStage::Complete | GenerationStage::Partial | GenerationStage::Failed
        )
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenerationStage::Idle => "idle",
            GenerationStage::Extracting => "extracting",
            GenerationStage::Assembled => "assembled",
            GenerationStage::Synthesizing => "synthesizing",
            GenerationStage::ScriptReady => "script ready",
            GenerationStage::Rendering => "rendering",
            GenerationStage::Complete => "complete",
            GenerationStage::Partial => "partial",
            GenerationStage::Failed => "failed",
        })
    }
}

impl From<OutcomeStatus> for GenerationStage {
    fn from(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::Complete => GenerationStage::Complete,
            OutcomeStatus::Partial => GenerationStage::Partial,
            OutcomeStatus::Failed => GenerationStage::Failed,
        }
    }
}

/// Runs documents through extraction, script synthesis and audio rendering.
///
/// Holds no per-request state; concurrent requests are fine as long as they
/// write to different output paths.
pub struct PodcastGenerator {
    completion: Arc<dyn CompletionBackend>,
    speech: Arc<dyn SpeechBackend>,
    extractor: TextExtractor,
    config: PodcastConfig,
}

impl fmt::Debug for PodcastGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodcastGenerator")
            .field("completion", &self.completion.name())
            .field("speech", &self.speech.name())
            .field("extractor", &self.extractor)
            .field("config", &self.config)
            .finish()
    }
}

impl PodcastGenerator {
    /// Build with explicit backends.
    pub fn new(
        completion: Arc<dyn CompletionBackend>,
        speech: Arc<dyn SpeechBackend>,
        config: PodcastConfig,
    ) -> Self {
        let mut extractor = TextExtractor::default();
        if let Some(ref pwd) = config.pdf_password {
            extractor = extractor.with_pdf_parser(Arc::new(PdfiumParser::with_password(pwd)));
        }
        Self {
            completion,
            speech,
            extractor,
            config,
        }
    }

    /// Resolve both backends from `config` and the environment.
    ///
    /// # Errors
    /// [`PodcastError::ProviderNotConfigured`] when no completion provider
    /// can be built or no speech API key is available.
    pub fn from_config(config: PodcastConfig) -> Result<Self, PodcastError> {
        let (provider, label) = resolve_provider(&config)?;
        let completion = Arc::new(LlmCompletion::new(provider, label));
        let speech = Arc::new(OpenAiSpeech::from_config(&config)?);
        Ok(Self::new(completion, speech, config))
    }

    /// Replace the text extractor (custom PDF/DOCX parsers).
    pub fn with_extractor(mut self, extractor: TextExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &PodcastConfig {
        &self.config
    }

    /// Extract and assemble on the current thread; `None` when no document
    /// yielded text. PDF parsing blocks, so async callers should prefer
    /// [`extract_corpus`](Self::extract_corpus).
    pub fn read_documents(&self, documents: &[UploadedDocument]) -> Option<Corpus> {
        let corpus = corpus::assemble(
            documents,
            &self.extractor,
            self.config.progress_callback.as_deref(),
        );
        if corpus.is_empty() {
            None
        } else {
            Some(corpus)
        }
    }

    /// Extract and assemble on a blocking worker. Always returns the
    /// read/failed partition, even when the corpus is empty.
    pub async fn extract_corpus(
        &self,
        documents: Vec<UploadedDocument>,
    ) -> Result<Corpus, PodcastError> {
        let extractor = self.extractor.clone();
        let progress = self.config.progress_callback.clone();
        tokio::task::spawn_blocking(move || {
            corpus::assemble(&documents, &extractor, progress.as_deref())
        })
        .await
        .map_err(|e| PodcastError::Internal(format!("extraction task failed: {e}")))
    }

    /// Turn an assembled corpus into a script and, if that worked, audio.
    ///
    /// # Returns
    /// `Ok(GenerationOutcome)` for complete, partial (audio failed) and
    /// empty-script runs; check [`GenerationOutcome::status`].
    ///
    /// # Errors
    /// - [`PodcastError::InvalidRequest`] — request failed validation
    /// - [`PodcastError::NoContent`] — the corpus is empty; nothing was called
    /// - [`PodcastError::Generation`] — the script stage failed; no audio attempted
    pub async fn generate(
        &self,
        corpus: &Corpus,
        request: &GenerationRequest,
        output_path: impl AsRef<Path>,
    ) -> Result<GenerationOutcome, PodcastError> {
        request.validate()?;
        self.generate_inner(corpus, request, output_path.as_ref(), GenerationStats::default())
            .await
    }

    /// Extract `documents`, then [`generate`](Self::generate).
    pub async fn run(
        &self,
        documents: Vec<UploadedDocument>,
        request: &GenerationRequest,
        output_path: impl AsRef<Path>,
    ) -> Result<GenerationOutcome, PodcastError> {
        request.validate()?;
        self.emit_stage(GenerationStage::Idle);
        info!("Generating podcast from {} document(s)", documents.len());

        self.emit_stage(GenerationStage::Extracting);
        let start = Instant::now();
        let corpus = self.extract_corpus(documents).await?;
        let stats = GenerationStats {
            extract_duration_ms: start.elapsed().as_millis() as u64,
            ..Default::default()
        };

        self.generate_inner(&corpus, request, output_path.as_ref(), stats)
            .await
    }

    async fn generate_inner(
        &self,
        corpus: &Corpus,
        request: &GenerationRequest,
        output: &Path,
        mut stats: GenerationStats,
    ) -> Result<GenerationOutcome, PodcastError> {
        let start = Instant::now();
        stats.documents_read = corpus.read_files.len();
        stats.documents_failed = corpus.failed_files.len();

        // ── Corpus gate: nothing paid happens past here without content ──
        if corpus.is_empty() {
            warn!(
                "No readable content ({} document(s) failed), skipping provider calls",
                corpus.failed_files.len()
            );
            self.finish(OutcomeStatus::Failed);
            return Err(PodcastError::NoContent {
                failed_files: corpus.failed_names(),
            });
        }
        stats.corpus_chars = corpus.text.chars().count();
        self.emit_stage(GenerationStage::Assembled);

        // ── Script ───────────────────────────────────────────────────────
        self.emit_stage(GenerationStage::Synthesizing);
        let settings = ScriptSettings {
            persona: self.config.persona.as_deref(),
            instructions: request.instructions.as_deref(),
            target_minutes: request.target_minutes,
            params: CompletionParams {
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            },
            timeout: Some(Duration::from_secs(self.config.api_timeout_secs)),
        };

        let script_start = Instant::now();
        let synthesis = match script::synthesize(self.completion.as_ref(), &corpus.text, &settings).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Script stage failed: {}", e);
                self.finish(OutcomeStatus::Failed);
                return Err(e.into());
            }
        };
        stats.script_duration_ms = script_start.elapsed().as_millis() as u64;

        let script = synthesis.and_then(|s| {
            stats.input_tokens = s.input_tokens;
            stats.output_tokens = s.output_tokens;
            s.script
        });

        let Some(script) = script else {
            warn!("Model returned an empty script, skipping audio");
            stats.total_duration_ms = stats.extract_duration_ms + start.elapsed().as_millis() as u64;
            self.finish(OutcomeStatus::Failed);
            return Ok(GenerationOutcome {
                script: None,
                audio: None,
                error: Some(OutcomeError::EmptyScript),
                read_files: corpus.read_files.clone(),
                failed_files: corpus.failed_files.clone(),
                stats,
            });
        };

        stats.script_words = script.word_count();
        self.emit_stage(GenerationStage::ScriptReady);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_script_ready(stats.script_words);
        }

        // ── Audio ────────────────────────────────────────────────────────
        self.emit_stage(GenerationStage::Rendering);
        let audio_start = Instant::now();
        let (audio, error) = match audio::render(
            self.speech.as_ref(),
            script.as_str(),
            output,
            request.voice,
            request.speed,
        )
        .await
        {
            Ok(artifact) => {
                stats.audio_bytes = artifact.bytes;
                (Some(artifact), None)
            }
            Err(e) => {
                warn!("Audio stage failed, returning script only: {}", e);
                (None, Some(OutcomeError::Audio { error: e }))
            }
        };
        stats.audio_duration_ms = audio_start.elapsed().as_millis() as u64;
        stats.total_duration_ms = stats.extract_duration_ms + start.elapsed().as_millis() as u64;

        let outcome = GenerationOutcome {
            script: Some(script),
            audio,
            error,
            read_files: corpus.read_files.clone(),
            failed_files: corpus.failed_files.clone(),
            stats,
        };

        let status = outcome.status();
        info!(
            "Generation {}: {} words, {} audio bytes, {} in / {} out tokens, {}ms",
            status,
            outcome.stats.script_words,
            outcome.stats.audio_bytes,
            outcome.stats.input_tokens,
            outcome.stats.output_tokens,
            outcome.stats.total_duration_ms
        );
        self.finish(status);
        Ok(outcome)
    }

    fn emit_stage(&self, stage: GenerationStage) {
        info!("Stage: {}", stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage(stage);
        }
    }

    fn finish(&self, status: OutcomeStatus) {
        self.emit_stage(status.into());
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_generation_complete(status);
        }
    }
}

/// Write a script to disk.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn save_script(
    script: &PodcastScript,
    output_path: impl AsRef<Path>,
) -> Result<(), PodcastError> {
    let path = output_path.as_ref();
    let write_err = |e| PodcastError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, script.as_str())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<(Arc<dyn LLMProvider>, String), PodcastError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PodcastError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok((provider, format!("{provider_name}/{model}")))
}

/// Resolve the completion provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, since the speech stage needs
///    that key anyway.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
fn resolve_provider(
    config: &PodcastConfig,
) -> Result<(Arc<dyn LLMProvider>, String), PodcastError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom".to_string()));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PodcastError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}
