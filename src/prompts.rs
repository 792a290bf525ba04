//! Prompts for podcast script synthesis.
//!
//! Every piece of instruction text lives here so prompt changes touch one
//! file and tests can inspect the exact wording without a live model.
//!
//! The system message is assembled as:
//!
//! ```text
//! persona preamble            (DEFAULT_PERSONA or PodcastConfig::persona)
//! user style instructions     (verbatim, omitted when blank)
//! length directive            (hard word target or soft default guideline)
//! output rules                (plain text for text-to-speech)
//! ```

/// Speaking rate used to turn a duration into a word target.
pub const WORDS_PER_MINUTE: u32 = 150;

/// Default persona: a host synthesising a narrative for a busy,
/// professional-but-casual audience.
pub const DEFAULT_PERSONA: &str = r#"You are an expert podcast scriptwriter and host producing a personalised audio digest.
Your audience is busy, intellectually curious professionals who want the substance without the noise.
Your task is to synthesise the key insights from the provided documents into one coherent, engaging podcast script."#;

/// Rules appended after the length directive.
pub const OUTPUT_RULES: &str = r#"Additional guidelines:
- Summarise the key content and draw meaningful connections across sources.
- Do NOT just list summaries; weave the information into a single narrative.
- The tone is professional yet conversational.
- Structure the script as intro, main points and outro, separated by blank lines.
- Avoid overly technical jargon unless the instructions ask for it.
- Output plain text suitable for text-to-speech: no markdown, no code fences, no bullet lists, no headings, no stage directions."#;

/// Soft guideline used when no duration was requested.
pub const DEFAULT_LENGTH_GUIDELINE: &str = "LENGTH GUIDELINE: Aim for a concise script, typically between 500-1000 words, as no specific duration was selected.";

/// Hard length constraint for an explicit duration.
pub fn target_length_directive(minutes: u32, words: u32) -> String {
    format!(
        "IMPORTANT LENGTH CONSTRAINT: The final script must be approximately {words} words long \
(around {minutes} minutes of speaking time). Adhere closely to this word count."
    )
}

/// Wrap the caller's free-form instructions.
pub fn style_instructions(instructions: &str) -> String {
    format!("Follow these user instructions for style and content focus:\n'{instructions}'")
}
