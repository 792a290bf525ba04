//! DOCX text extraction: one segment per `<w:p>` paragraph.
//!
//! A DOCX file is a zip container; the body lives in `word/document.xml`.
//! Only the text-bearing elements matter here (`w:t` runs, `w:tab`, `w:br`,
//! `w:cr`), so a single tag regex drives a small depth-tracking walk over the
//! XML instead of a full XML stack.

use crate::pipeline::extract::{ParseError, SegmentParser};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::io::{Cursor, Read};
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Paragraph-by-paragraph DOCX parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxParser;

impl SegmentParser for DocxParser {
    fn extract_segments(&self, bytes: &[u8]) -> Result<Vec<String>, ParseError> {
        let xml = read_document_part(bytes)?;
        let paragraphs = paragraphs_from_xml(&xml);
        debug!("DOCX: {} paragraphs", paragraphs.len());
        Ok(paragraphs)
    }
}

fn read_document_part(bytes: &[u8]) -> Result<String, ParseError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ParseError::Malformed(format!("not a DOCX container: {e}")))?;

    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ParseError::Malformed(format!("missing {DOCUMENT_PART}: {e}")))?;

    let mut raw = Vec::new();
    part.read_to_end(&mut raw)
        .map_err(|e| ParseError::Malformed(format!("cannot inflate {DOCUMENT_PART}: {e}")))?;

    String::from_utf8(raw)
        .map_err(|e| ParseError::Encoding(format!("{DOCUMENT_PART} is not UTF-8: {e}")))
}

// One start, end or empty-element tag. `<w:pPr>` never matches as `w:p`
// because anything after the name must start with whitespace.
static RE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(?P<close>/)?(?P<name>[A-Za-z_][\w:.\-]*)(?:\s[^>]*?)?(?P<empty>/)?>").unwrap()
});

static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap());

/// Extract paragraph texts in document order. Empty paragraphs are kept as
/// empty strings; the extractor decides what to skip.
///
/// Paragraphs nest (text boxes carry their own `w:p` inside a run), so the
/// walk keeps a stack of open paragraphs and appends text to the innermost
/// one. Each paragraph takes its slot when it opens, so an outer paragraph
/// precedes the text boxes it contains. `mc:Fallback` duplicates the
/// `mc:Choice` content for old readers and is skipped.
pub fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;
    let mut props_depth = 0usize;
    let mut fallback_depth = 0usize;
    let mut cursor = 0;

    for tag in RE_TAG.captures_iter(xml) {
        let Some(whole) = tag.get(0) else { continue };
        if in_text && fallback_depth == 0 {
            if let Some(&current) = open.last() {
                paragraphs[current].push_str(&unescape(&xml[cursor..whole.start()]));
            }
        }
        cursor = whole.end();

        let closing = tag.name("close").is_some();
        let empty = tag.name("empty").is_some();
        let name = &tag["name"];

        if name == "mc:Fallback" && !empty {
            if closing {
                fallback_depth = fallback_depth.saturating_sub(1);
            } else {
                fallback_depth += 1;
            }
            continue;
        }
        if fallback_depth > 0 {
            continue;
        }

        match (name, closing, empty) {
            ("w:p", false, false) => {
                open.push(paragraphs.len());
                paragraphs.push(String::new());
                in_text = false;
            }
            ("w:p", true, _) => {
                open.pop();
                in_text = false;
            }
            ("w:t", false, false) => in_text = true,
            ("w:t", true, _) => in_text = false,
            ("w:pPr", false, false) => props_depth += 1,
            ("w:pPr", true, _) => props_depth = props_depth.saturating_sub(1),
            // `w:tab` inside `w:pPr` is a tab-stop definition, not a tab
            ("w:tab", false, _) if props_depth == 0 => push_char(&mut paragraphs, &open, '\t'),
            ("w:br" | "w:cr", false, _) => push_char(&mut paragraphs, &open, '\n'),
            _ => {}
        }
    }
    paragraphs
}

fn push_char(paragraphs: &mut [String], open: &[usize], c: char) {
    if let Some(&current) = open.last() {
        paragraphs[current].push(c);
    }
}

fn unescape(s: &str) -> String {
    RE_ENTITY
        .replace_all(s, |caps: &Captures| {
            let entity = &caps[1];
            match entity {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        entity[1..].parse::<u32>().ok()
                    };
                    code.and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_else(|| caps[0].to_string())
                }
            }
        })
        .into_owned()
}
