//! Configuration types for podcast generation.
//!
//! Two kinds of settings exist and they live apart:
//!
//! * [`PodcastConfig`] is fixed for the lifetime of a
//!   [`PodcastGenerator`](crate::PodcastGenerator): providers, models,
//!   timeouts, persona.
//! * [`GenerationRequest`] is passed per call: instructions, duration,
//!   voice and speed. Nothing about one request leaks into the next.
//!
//! Both are built through builders whose `build()` validates.

use crate::error::PodcastError;
use crate::pipeline::audio::{validate_speed, SPEED_RANGE};
use crate::pipeline::speech::DEFAULT_MAX_INPUT_CHARS;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default completion model when none is named.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Generator-wide configuration.
///
/// # Example
/// ```rust
/// use edgequake_doc2pod::PodcastConfig;
///
/// let config = PodcastConfig::builder()
///     .model("gpt-4o")
///     .temperature(0.7)
///     .tts_model("tts-1-hd")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PodcastConfig {
    /// Completion model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is resolved from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for script writing. Range 0–2. Default: 0.6.
    pub temperature: f32,

    /// Maximum tokens the model may generate for one script. Default: 3000.
    ///
    /// A 15-minute script is about 2250 words, roughly 3000 tokens.
    pub max_tokens: usize,

    /// Replaces the built-in host persona. The caller's instructions, the
    /// length directive and the output rules are still appended.
    pub persona: Option<String>,

    /// Speech model. Default: "tts-1".
    pub tts_model: String,

    /// Base URL of the OpenAI-compatible speech endpoint.
    pub tts_base_url: String,

    /// Explicit speech API key. If None, `OPENAI_API_KEY` is read.
    pub tts_api_key: Option<String>,

    /// Maximum characters per speech request. Default: 4096.
    pub tts_max_input_chars: usize,

    /// Per-completion-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Per-speech-request timeout in seconds. Default: 300.
    pub tts_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub pdf_password: Option<String>,

    /// Receives stage transitions and per-document events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.6,
            max_tokens: 3000,
            persona: None,
            tts_model: "tts-1".into(),
            tts_base_url: "https://api.openai.com/v1".into(),
            tts_api_key: None,
            tts_max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            api_timeout_secs: 120,
            tts_timeout_secs: 300,
            pdf_password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PodcastConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodcastConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("persona", &self.persona.as_ref().map(|p| p.len()))
            .field("tts_model", &self.tts_model)
            .field("tts_base_url", &self.tts_base_url)
            .field("tts_api_key", &self.tts_api_key.as_ref().map(|_| "<redacted>"))
            .field("tts_max_input_chars", &self.tts_max_input_chars)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("tts_timeout_secs", &self.tts_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PodcastConfig {
    /// Create a new builder for `PodcastConfig`.
    pub fn builder() -> PodcastConfigBuilder {
        PodcastConfigBuilder {
            config: Self::default(),
        }
    }

    /// The completion model in effect.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`PodcastConfig`].
#[derive(Debug)]
pub struct PodcastConfigBuilder {
    config: PodcastConfig,
}

impl PodcastConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.config.persona = Some(persona.into());
        self
    }

    pub fn tts_model(mut self, model: impl Into<String>) -> Self {
        self.config.tts_model = model.into();
        self
    }

    pub fn tts_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.tts_base_url = url.into();
        self
    }

    pub fn tts_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.tts_api_key = Some(key.into());
        self
    }

    pub fn tts_max_input_chars(mut self, n: usize) -> Self {
        self.config.tts_max_input_chars = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn tts_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tts_timeout_secs = secs;
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PodcastConfig, PodcastError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(PodcastError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.tts_max_input_chars == 0 {
            return Err(PodcastError::InvalidConfig(
                "tts_max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.tts_timeout_secs == 0 {
            return Err(PodcastError::InvalidConfig("timeouts must be ≥ 1 second".into()));
        }
        if c.tts_model.trim().is_empty() {
            return Err(PodcastError::InvalidConfig("tts_model must not be empty".into()));
        }
        if !(c.tts_base_url.starts_with("http://") || c.tts_base_url.starts_with("https://")) {
            return Err(PodcastError::InvalidConfig(format!(
                "tts_base_url must be an http(s) URL, got '{}'",
                c.tts_base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Voice ────────────────────────────────────────────────────────────────

/// Speech voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Nova,
    Alloy,
    Echo,
    Fable,
    Onyx,
    Shimmer,
    Ash,
    Ballad,
    Coral,
    Sage,
}

impl Voice {
    pub const ALL: [Voice; 10] = [
        Voice::Nova,
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Shimmer,
        Voice::Ash,
        Voice::Ballad,
        Voice::Coral,
        Voice::Sage,
    ];

    /// Identifier sent to the speech endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Nova => "nova",
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Shimmer => "shimmer",
            Voice::Ash => "ash",
            Voice::Ballad => "ballad",
            Voice::Coral => "coral",
            Voice::Sage => "sage",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = PodcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Voice::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Voice::ALL.iter().map(Voice::as_str).collect();
                PodcastError::InvalidRequest(format!(
                    "unknown voice '{s}' (expected one of: {})",
                    names.join(", ")
                ))
            })
    }
}

// ── Request ──────────────────────────────────────────────────────────────

/// Per-call generation settings.
///
/// # Example
/// ```rust
/// use edgequake_doc2pod::{GenerationRequest, Voice};
///
/// let request = GenerationRequest::builder()
///     .instructions("Focus on fintech news, keep it upbeat.")
///     .target_minutes(10)
///     .voice(Voice::Onyx)
///     .speed(1.1)
///     .build()
///     .unwrap();
/// assert_eq!(request.target_words(), Some(1500));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-form style instructions, passed to the model verbatim.
    pub instructions: Option<String>,
    /// Target duration; `None` or 0 means "auto".
    pub target_minutes: Option<u32>,
    pub voice: Voice,
    /// Speech speed multiplier, 0.25–4.0. Default: 1.0.
    pub speed: f32,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            instructions: None,
            target_minutes: None,
            voice: Voice::default(),
            speed: 1.0,
        }
    }
}

impl GenerationRequest {
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            request: Self::default(),
        }
    }

    /// Word target implied by `target_minutes`.
    pub fn target_words(&self) -> Option<u32> {
        crate::pipeline::script::LengthDirective::for_minutes(self.target_minutes).target_words()
    }

    /// Check the request before any provider call.
    pub fn validate(&self) -> Result<(), PodcastError> {
        validate_speed(self.speed).map_err(|_| {
            PodcastError::InvalidRequest(format!(
                "speed {} is outside {}–{}",
                self.speed,
                SPEED_RANGE.start(),
                SPEED_RANGE.end()
            ))
        })
    }
}

/// Builder for [`GenerationRequest`].
#[derive(Debug)]
pub struct GenerationRequestBuilder {
    request: GenerationRequest,
}

impl GenerationRequestBuilder {
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.request.instructions = Some(instructions.into());
        self
    }

    pub fn target_minutes(mut self, minutes: u32) -> Self {
        self.request.target_minutes = Some(minutes);
        self
    }

    pub fn voice(mut self, voice: Voice) -> Self {
        self.request.voice = voice;
        self
    }

    /// Out-of-range speeds are rejected by `build()`, not clamped.
    pub fn speed(mut self, speed: f32) -> Self {
        self.request.speed = speed;
        self
    }

    pub fn build(self) -> Result<GenerationRequest, PodcastError> {
        self.request.validate()?;
        Ok(self.request)
    }
}
