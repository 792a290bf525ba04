//! Speech-synthesis capability: script text → audio file at a given path.
//!
//! [`SpeechBackend`] is the seam the audio stage talks to. The default
//! implementation, [`OpenAiSpeech`], posts to an OpenAI-compatible
//! `/audio/speech` endpoint.
//!
//! ## Input limit
//!
//! The endpoint accepts at most 4096 characters per request, while a
//! ten-minute script runs to roughly 9000. [`chunk_text`] cuts the script on
//! paragraph, then sentence, then word boundaries; the chunks are voiced in
//! order and their MP3 streams are appended into a single file (MP3 frames
//! concatenate cleanly).
//!
//! ## Atomic write
//!
//! Audio is streamed into a temp file beside the target and renamed over it
//! only after every chunk succeeded. A failed render leaves no truncated
//! file at the caller's path.

use crate::config::{PodcastConfig, Voice};
use crate::error::{PodcastError, ProviderError, RenderError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Maximum characters per speech request accepted by OpenAI.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 4096;

/// A text-to-speech engine that writes audio to a path.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Short provider label for logs and errors.
    fn name(&self) -> &str;

    /// Voice `text` and write the audio to `output`.
    ///
    /// Success means the backend believes the file was written; the audio
    /// stage still verifies the artifact afterwards.
    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
        output: &Path,
    ) -> Result<(), RenderError>;
}

/// Request body for `POST {base_url}/audio/speech`.
#[derive(Debug, Serialize)]
struct SpeechHttpRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'static str,
}

/// OpenAI-compatible speech client.
#[derive(Clone)]
pub struct OpenAiSpeech {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_input_chars: usize,
    request_timeout: Duration,
}

impl fmt::Debug for OpenAiSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSpeech")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_input_chars", &self.max_input_chars)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl OpenAiSpeech {
    /// Client with OpenAI defaults (`tts-1`, 4096-char chunks, 300 s per request).
    pub fn new(api_key: impl Into<String>) -> Result<Self, PodcastError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PodcastError::ProviderNotConfigured {
                provider: "openai-tts".into(),
                hint: "An API key is required for speech synthesis.".into(),
            });
        }
        let client = Client::builder()
            .build()
            .map_err(|e| PodcastError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: "https://api.openai.com/v1".into(),
            model: "tts-1".into(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            request_timeout: Duration::from_secs(300),
        })
    }

    /// Build from config; the key is `tts_api_key`, else `OPENAI_API_KEY`.
    pub fn from_config(config: &PodcastConfig) -> Result<Self, PodcastError> {
        let key = config
            .tts_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| PodcastError::ProviderNotConfigured {
                provider: "openai-tts".into(),
                hint: "Set OPENAI_API_KEY (or --tts-api-key) to enable speech synthesis.".into(),
            })?;

        Ok(Self::new(key)?
            .with_base_url(&config.tts_base_url)
            .with_model(&config.tts_model)
            .with_max_input_chars(config.tts_max_input_chars)
            .with_timeout(Duration::from_secs(config.tts_timeout_secs)))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_input_chars(mut self, n: usize) -> Self {
        self.max_input_chars = n.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url)
    }

    /// Voice one chunk and append its bytes to `file`.
    async fn voice_chunk(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
        file: &mut tokio::fs::File,
        output: &Path,
    ) -> Result<u64, RenderError> {
        let body = SpeechHttpRequest {
            model: &self.model,
            input: text,
            voice: voice.as_str(),
            speed,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(self.speech_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(self.name(), &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(self.name(), status.as_u16(), error_text).into());
        }

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| request_error(self.name(), &e))?;
            file.write_all(&bytes).await.map_err(|e| RenderError::Io {
                path: output.to_path_buf(),
                detail: e.to_string(),
            })?;
            written += bytes.len() as u64;
        }
        Ok(written)
    }
}

fn request_error(provider: &str, e: &reqwest::Error) -> RenderError {
    ProviderError::Request {
        provider: provider.to_string(),
        detail: e.to_string(),
    }
    .into()
}

#[async_trait]
impl SpeechBackend for OpenAiSpeech {
    fn name(&self) -> &str {
        "openai-tts"
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
        output: &Path,
    ) -> Result<(), RenderError> {
        let io_err = |e: std::io::Error| RenderError::Io {
            path: output.to_path_buf(),
            detail: e.to_string(),
        };

        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await.map_err(io_err)?;

        let tmp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
        let mut file = tokio::fs::File::from_std(tmp.as_file().try_clone().map_err(io_err)?);

        let chunks = chunk_text(text, self.max_input_chars);
        info!(
            "Synthesising {} chars in {} request(s) with voice '{}'",
            text.chars().count(),
            chunks.len(),
            voice
        );

        let mut total = 0u64;
        for (i, chunk) in chunks.iter().enumerate() {
            let call = self.voice_chunk(chunk, voice, speed, &mut file, output);
            let written = tokio::time::timeout(self.request_timeout, call)
                .await
                .map_err(|_| RenderError::Timeout {
                    secs: self.request_timeout.as_secs(),
                })??;
            debug!("chunk {}/{}: {} bytes", i + 1, chunks.len(), written);
            total += written;
        }

        file.flush().await.map_err(io_err)?;
        drop(file);

        tmp.persist(output).map_err(|e| io_err(e.error))?;
        debug!("Wrote {} audio bytes to {}", total, output.display());
        Ok(())
    }
}

// ── Chunking ─────────────────────────────────────────────────────────────────

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// Paragraphs stay whole when they fit and are packed together with a blank
/// line between them. Oversized paragraphs fall back to sentences, then
/// words, then a hard cut.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for (unit, sep) in units(text, max) {
        if current.is_empty() {
            current = unit;
        } else if char_len(&current) + char_len(sep) + char_len(&unit) <= max {
            current.push_str(sep);
            current.push_str(&unit);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = unit;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Pieces no longer than `max`, each with the separator that precedes it.
fn units(text: &str, max: usize) -> Vec<(String, &'static str)> {
    let mut out = Vec::new();
    let normalised = text.replace("\r\n", "\n");
    for para in normalised.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if char_len(para) <= max {
            out.push((para.to_string(), "\n\n"));
            continue;
        }
        let mut first = true;
        for sentence in split_sentences(para) {
            for piece in split_long(sentence, max) {
                out.push((piece, if first { "\n\n" } else { " " }));
                first = false;
            }
        }
    }
    out
}

/// Cut after `.`, `!` or `?` followed by whitespace.
fn split_sentences(para: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = para.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    let s = para[start..end].trim();
                    if !s.is_empty() {
                        out.push(s);
                    }
                    start = end;
                }
            }
        }
    }
    let tail = para[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Fit one sentence into `max`-char pieces on word boundaries.
fn split_long(sentence: &str, max: usize) -> Vec<String> {
    if char_len(sentence) <= max {
        return vec![sentence.to_string()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    for word in sentence.split_whitespace() {
        if char_len(word) > max {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            out.extend(chars.chunks(max).map(|c| c.iter().collect::<String>()));
            continue;
        }
        if current.is_empty() {
            current.push_str(word);
        } else if char_len(&current) + 1 + char_len(word) <= max {
            current.push(' ');
            current.push_str(word);
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
