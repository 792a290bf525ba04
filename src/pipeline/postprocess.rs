//! Post-processing: deterministic cleanup of model-written scripts.
//!
//! The script is read aloud verbatim, so any markup the model lets slip
//! through ends up spoken ("asterisk asterisk"). The prompt asks for plain
//! text; these rules enforce it regardless of what the model does.
//!
//! ## Rule Order
//!
//! Fences go first so language tags (```` ```json ````) disappear with their
//! fence line; line endings are normalised before any line-based rule; the
//! final trim runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output.
///
/// Rules (applied in order):
/// 1. Remove code-fence lines and any leftover triple backticks
/// 2. Normalise line endings (CRLF → LF)
/// 3. Drop heading markers (`# Intro` → `Intro`)
/// 4. Drop list bullets at line start
/// 5. Drop bold/underline emphasis markers (`**`, `__`)
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Trim trailing whitespace per line
/// 8. Collapse runs of blank lines to a single blank line
/// 9. Trim leading/trailing whitespace
pub fn clean_script(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = strip_heading_markers(&s);
    let s = strip_bullets(&s);
    let s = strip_emphasis(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Word count as a speaker would see it.
pub fn word_count(script: &str) -> usize {
    script.split_whitespace().count()
}

// ── Rule 1: Code fences ──────────────────────────────────────────────────────

static RE_FENCE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_+-]*[ \t]*\r?$\n?").unwrap());

fn strip_code_fences(input: &str) -> String {
    let mut s = RE_FENCE_LINE.replace_all(input, "").into_owned();
    // Inline fences (```text```) leave no line of their own.
    while s.contains("```") {
        s = s.replace("```", "");
    }
    s
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Heading markers ──────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").unwrap());

fn strip_heading_markers(input: &str) -> String {
    RE_HEADING.replace_all(input, "").into_owned()
}

// ── Rule 4: List bullets ─────────────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*•][ \t]+").unwrap());

fn strip_bullets(input: &str) -> String {
    RE_BULLET.replace_all(input, "").into_owned()
}

// ── Rule 5: Emphasis markers ─────────────────────────────────────────────────

fn strip_emphasis(input: &str) -> String {
    input.replace("**", "").replace("__", "")
}

// ── Rule 6: Invisible Unicode ────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 7: Trailing whitespace ──────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 8: Blank lines ──────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
