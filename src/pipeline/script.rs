//! Script synthesis: corpus → podcast script via the completion capability.
//!
//! ## Length control
//!
//! A requested duration becomes a hard word target at
//! [`WORDS_PER_MINUTE`](crate::prompts::WORDS_PER_MINUTE) words per minute
//! (10 minutes → 1500 words). Without a duration, or with zero minutes, the
//! model gets a soft 500–1000 word guideline instead.
//!
//! ## Message layout
//!
//! 1. **System message** — persona, caller instructions (verbatim), length
//!    directive, output rules
//! 2. **User message** — the corpus text

use crate::error::GenerationError;
use crate::output::PodcastScript;
use crate::pipeline::llm::{Completion, CompletionBackend, CompletionParams};
use crate::pipeline::postprocess::clean_script;
use crate::prompts::{
    style_instructions, target_length_directive, DEFAULT_LENGTH_GUIDELINE, DEFAULT_PERSONA,
    OUTPUT_RULES, WORDS_PER_MINUTE,
};
use std::time::Duration;
use tracing::{debug, info};

/// How long the script should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthDirective {
    /// Explicit duration: the model must hit roughly `words` words.
    Target { minutes: u32, words: u32 },
    /// No duration requested: soft 500–1000 word guideline.
    Default,
}

impl LengthDirective {
    /// Directive for an optional duration; `None` and `Some(0)` mean default.
    pub fn for_minutes(minutes: Option<u32>) -> Self {
        match minutes {
            Some(m) if m > 0 => LengthDirective::Target {
                minutes: m,
                words: m.saturating_mul(WORDS_PER_MINUTE),
            },
            _ => LengthDirective::Default,
        }
    }

    /// Word target, when there is one.
    pub fn target_words(&self) -> Option<u32> {
        match self {
            LengthDirective::Target { words, .. } => Some(*words),
            LengthDirective::Default => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            LengthDirective::Target { minutes, words } => target_length_directive(*minutes, *words),
            LengthDirective::Default => DEFAULT_LENGTH_GUIDELINE.to_string(),
        }
    }
}

/// Assemble the system message.
pub fn build_system_prompt(
    persona: Option<&str>,
    instructions: Option<&str>,
    length: LengthDirective,
) -> String {
    let mut parts: Vec<String> = vec![persona.unwrap_or(DEFAULT_PERSONA).trim().to_string()];
    if let Some(instr) = instructions.filter(|s| !s.trim().is_empty()) {
        parts.push(style_instructions(instr));
    }
    parts.push(length.render());
    parts.push(OUTPUT_RULES.to_string());
    parts.join("\n\n")
}

/// What the synthesizer needs besides the corpus.
#[derive(Debug, Clone, Default)]
pub struct ScriptSettings<'a> {
    pub persona: Option<&'a str>,
    pub instructions: Option<&'a str>,
    pub target_minutes: Option<u32>,
    pub params: CompletionParams,
    /// Per-call timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Synthesised script plus the usage of the call that produced it.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// `None` when the model answered with nothing usable.
    pub script: Option<PodcastScript>,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Produce a script from `corpus_text`.
///
/// Returns `Ok(None)` without calling the model when the corpus is blank.
/// Provider failures and timeouts come back as [`GenerationError`] so the
/// caller can tell "script failed" from "script empty".
pub async fn synthesize(
    backend: &dyn CompletionBackend,
    corpus_text: &str,
    settings: &ScriptSettings<'_>,
) -> Result<Option<SynthesisResult>, GenerationError> {
    if corpus_text.trim().is_empty() {
        debug!("Empty corpus, skipping completion call");
        return Ok(None);
    }

    let length = LengthDirective::for_minutes(settings.target_minutes);
    match length {
        LengthDirective::Target { minutes, words } => {
            info!("Script target: {} min (~{} words)", minutes, words)
        }
        LengthDirective::Default => info!("Script target: default 500-1000 word guideline"),
    }

    let system = build_system_prompt(settings.persona, settings.instructions, length);
    let call = backend.complete(&system, corpus_text, &settings.params);

    let completion: Completion = match settings.timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| GenerationError::Timeout {
                secs: limit.as_secs(),
            })??,
        None => call.await?,
    };

    let cleaned = clean_script(&completion.text);
    debug!(
        "{}: raw {} chars → cleaned {} chars",
        backend.name(),
        completion.text.len(),
        cleaned.len()
    );

    Ok(Some(SynthesisResult {
        script: PodcastScript::new(cleaned),
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        reply: String,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CompletionBackend for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            system: &str,
            user: &str,
            _params: &CompletionParams,
        ) -> Result<Completion, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(Completion::text(self.reply.clone()))
        }
    }

    struct Hanging;

    #[async_trait]
    impl CompletionBackend for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _params: &CompletionParams,
        ) -> Result<Completion, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Completion::default())
        }
    }

    #[test]
    fn target_words_is_minutes_times_150() {
        for m in [1u32, 2, 5, 10, 37] {
            assert_eq!(LengthDirective::for_minutes(Some(m)).target_words(), Some(m * 150));
        }
    }

    #[test]
    fn zero_or_absent_minutes_use_default() {
        assert_eq!(LengthDirective::for_minutes(None), LengthDirective::Default);
        assert_eq!(LengthDirective::for_minutes(Some(0)), LengthDirective::Default);
    }

    #[test]
    fn system_prompt_contains_instructions_verbatim() {
        let p = build_system_prompt(None, Some("Focus on fintech, keep it upbeat."), LengthDirective::Default);
        assert!(p.starts_with(DEFAULT_PERSONA.trim()));
        assert!(p.contains("Focus on fintech, keep it upbeat."));
        assert!(p.contains("500-1000 words"));
        assert!(p.ends_with(OUTPUT_RULES));
    }

    #[test]
    fn blank_instructions_are_omitted() {
        let p = build_system_prompt(None, Some("   "), LengthDirective::Default);
        assert!(!p.contains("user instructions"));
    }

    #[test]
    fn persona_override_replaces_default() {
        let p = build_system_prompt(Some("You are a pirate radio DJ."), None, LengthDirective::Default);
        assert!(p.starts_with("You are a pirate radio DJ."));
        assert!(!p.contains(DEFAULT_PERSONA));
    }

    #[tokio::test]
    async fn empty_corpus_skips_the_model() {
        let backend = Recording::default();
        let out = synthesize(&backend, "  \n", &ScriptSettings::default())
            .await
            .expect("no error");
        assert!(out.is_none());
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn corpus_goes_to_user_channel_and_output_is_cleaned() {
        let backend = Recording {
            reply: "```\nScript text.\n```\n".into(),
            ..Default::default()
        };
        let settings = ScriptSettings {
            target_minutes: Some(10),
            ..Default::default()
        };
        let out = synthesize(&backend, "CORPUS", &settings)
            .await
            .expect("ok")
            .expect("called");
        assert_eq!(out.script.expect("script").as_str(), "Script text.");

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "CORPUS");
        assert!(calls[0].0.contains("approximately 1500 words"));
        assert!(!calls[0].0.contains("CORPUS"));
    }

    #[tokio::test]
    async fn whitespace_only_answer_yields_no_script() {
        let backend = Recording {
            reply: "```\n\n```".into(),
            ..Default::default()
        };
        let out = synthesize(&backend, "CORPUS", &ScriptSettings::default())
            .await
            .expect("ok")
            .expect("called");
        assert!(out.script.is_none());
    }

    #[test]
    fn synthesis_can_be_driven_from_sync_code() {
        let backend = Recording {
            reply: "Hello there.".into(),
            ..Default::default()
        };
        let out = tokio_test::block_on(synthesize(&backend, "CORPUS", &ScriptSettings::default()))
            .expect("ok")
            .expect("called");
        assert_eq!(out.script.map(|s| s.word_count()), Some(2));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let settings = ScriptSettings {
            timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let err = synthesize(&Hanging, "CORPUS", &settings)
            .await
            .expect_err("should time out");
        assert!(matches!(err, GenerationError::Timeout { .. }));
    }
}
