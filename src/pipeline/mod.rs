//! Pipeline stages for document-to-podcast generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the external capabilities (model, speech engine,
//! document parsers) can be replaced by fakes.
//!
//! ## Data Flow
//!
//! ```text
//! documents ──▶ extract ──▶ corpus ──▶ script ──▶ postprocess ──▶ audio
//! (txt/pdf/docx) (text)    (labelled)  (llm)     (cleanup)       (speech)
//! ```
//!
//! 1. [`extract`] — one document → text or a typed failure; [`pdf`] and
//!    [`docx`] are the format parsers behind it
//! 2. [`corpus`]  — many extractions → one labelled corpus plus the
//!    read/failed partition
//! 3. [`script`]  — corpus → script through the [`llm`] completion seam,
//!    with the length directive and instruction assembly
//! 4. [`postprocess`] — deterministic cleanup so no markup reaches the voice
//! 5. [`audio`]   — script → verified audio file through the [`speech`] seam

pub mod audio;
pub mod corpus;
pub mod docx;
pub mod extract;
pub mod llm;
pub mod pdf;
pub mod postprocess;
pub mod script;
pub mod speech;
