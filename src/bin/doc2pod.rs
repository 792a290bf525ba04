//! CLI binary for edgequake-doc2pod.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PodcastConfig` / `GenerationRequest` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2pod::{
    save_script, DocumentKind, GenerationProgressCallback, GenerationRequest, GenerationStage,
    OutcomeStatus, PodcastConfig, PodcastGenerator, ProgressCallback, UploadedDocument, Voice,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner showing the current stage, plus one
/// log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: GenerationStage) {
        let (prefix, msg) = match stage {
            GenerationStage::Idle => ("Preparing", ""),
            GenerationStage::Extracting => ("Reading", "extracting documents…"),
            GenerationStage::Assembled => ("Reading", "corpus assembled"),
            GenerationStage::Synthesizing => ("Writing", "the model is drafting the script…"),
            GenerationStage::ScriptReady => ("Writing", "script ready"),
            GenerationStage::Rendering => ("Voicing", "synthesising speech…"),
            GenerationStage::Complete | GenerationStage::Partial | GenerationStage::Failed => {
                return
            }
        };
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn on_document_read(&self, index: usize, total: usize, name: &str, chars: usize) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{chars} chars")),
        ));
    }

    fn on_document_failed(&self, index: usize, total: usize, name: &str, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
        ));
    }

    fn on_script_ready(&self, words: usize) {
        self.bar.println(format!(
            "{} Script ready  {}",
            cyan("◆"),
            dim(&format!("{words} words"))
        ));
    }

    fn on_generation_complete(&self, status: OutcomeStatus) {
        self.bar.finish_and_clear();
        match status {
            OutcomeStatus::Complete => eprintln!("{} Podcast ready", green("✔")),
            OutcomeStatus::Partial => eprintln!("{} Script ready, audio failed", cyan("⚠")),
            OutcomeStatus::Failed => eprintln!("{} Generation failed", red("✘")),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One newsletter, default length (500-1000 words), script to stdout
  doc2pod newsletter.pdf -o episode.mp3

  # Several sources, 10-minute episode, custom focus
  doc2pod a.txt b.pdf c.docx -m 10 -i "Focus on fintech, keep it upbeat." -o digest.mp3

  # Different voice and pace, save the script next to the audio
  doc2pod report.docx --voice onyx --speed 1.2 -o report.mp3 --script-out report.txt

  # Structured JSON outcome (script, audio path, failed files, stats)
  doc2pod --json notes.txt -o notes.mp3

VOICES:
  nova (default), alloy, echo, fable, onyx, shimmer, ash, ballad, coral, sage

LENGTH:
  --minutes N asks the model for about N × 150 words.
  Without it the model aims for 500-1000 words.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (required for speech)
  ANTHROPIC_API_KEY       Anthropic API key (script writing only)
  GEMINI_API_KEY          Google Gemini API key (script writing only)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium, skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

  Every flag below also reads a DOC2POD_* variable (e.g. DOC2POD_VOICE).
"#;

/// Turn text, PDF and DOCX documents into a narrated podcast.
#[derive(Parser, Debug)]
#[command(
    name = "doc2pod",
    version,
    about = "Turn text, PDF and DOCX documents into a narrated podcast",
    long_about = "Extracts text from your documents, asks a language model to write a podcast \
script under your length and style constraints, then voices it with a text-to-speech model. \
Script writing works with OpenAI, Anthropic, Google Gemini, Ollama and any OpenAI-compatible \
endpoint; speech uses an OpenAI-compatible /audio/speech endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input documents (.txt, .pdf, .docx), in narration order.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Audio output path (MP3).
    #[arg(short, long, env = "DOC2POD_OUTPUT", default_value = "podcast.mp3")]
    output: PathBuf,

    /// Free-form style and focus instructions for the script writer.
    #[arg(short, long, env = "DOC2POD_INSTRUCTIONS")]
    instructions: Option<String>,

    /// Read the instructions from a file instead.
    #[arg(long, env = "DOC2POD_INSTRUCTIONS_FILE", conflicts_with = "instructions")]
    instructions_file: Option<PathBuf>,

    /// Target length in minutes (150 words per minute). Omit for auto.
    #[arg(short, long, env = "DOC2POD_MINUTES")]
    minutes: Option<u32>,

    /// Speech voice.
    #[arg(long, env = "DOC2POD_VOICE", value_enum, default_value = "nova")]
    voice: VoiceArg,

    /// Speech speed multiplier (0.25–4.0).
    #[arg(long, env = "DOC2POD_SPEED", default_value_t = 1.0)]
    speed: f32,

    /// LLM model ID for script writing (default: gpt-4o-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider for script writing. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOC2POD_TEMPERATURE", default_value_t = 0.6)]
    temperature: f32,

    /// Max LLM output tokens for the script.
    #[arg(long, env = "DOC2POD_MAX_TOKENS", default_value_t = 3000)]
    max_tokens: usize,

    /// Path to a text file replacing the built-in host persona.
    #[arg(long, env = "DOC2POD_PERSONA_FILE")]
    persona_file: Option<PathBuf>,

    /// Speech model.
    #[arg(long, env = "DOC2POD_TTS_MODEL", default_value = "tts-1")]
    tts_model: String,

    /// Base URL of the OpenAI-compatible speech endpoint.
    #[arg(long, env = "DOC2POD_TTS_BASE_URL", default_value = "https://api.openai.com/v1")]
    tts_base_url: String,

    /// Speech API key (defaults to OPENAI_API_KEY).
    #[arg(long, env = "DOC2POD_TTS_API_KEY", hide_env_values = true)]
    tts_api_key: Option<String>,

    /// Max characters per speech request.
    #[arg(long, env = "DOC2POD_TTS_CHUNK_CHARS", default_value_t = 4096)]
    tts_chunk_chars: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2POD_PDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Script-writing call timeout in seconds.
    #[arg(long, env = "DOC2POD_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Per-request speech timeout in seconds.
    #[arg(long, env = "DOC2POD_TTS_TIMEOUT", default_value_t = 300)]
    tts_timeout: u64,

    /// Also write the script to this file (otherwise it goes to stdout).
    #[arg(long, env = "DOC2POD_SCRIPT_OUT")]
    script_out: Option<PathBuf>,

    /// Output the structured outcome as JSON instead of the script.
    #[arg(long, env = "DOC2POD_JSON")]
    json: bool,

    /// Disable progress spinner.
    #[arg(long, env = "DOC2POD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2POD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2POD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum VoiceArg {
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

impl From<VoiceArg> for Voice {
    fn from(v: VoiceArg) -> Self {
        match v {
            VoiceArg::Nova => Voice::Nova,
            VoiceArg::Alloy => Voice::Alloy,
            VoiceArg::Echo => Voice::Echo,
            VoiceArg::Fable => Voice::Fable,
            VoiceArg::Onyx => Voice::Onyx,
            VoiceArg::Shimmer => Voice::Shimmer,
            VoiceArg::Ash => Voice::Ash,
            VoiceArg::Ballad => Voice::Ballad,
            VoiceArg::Coral => Voice::Coral,
            VoiceArg::Sage => Voice::Sage,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load documents ───────────────────────────────────────────────────
    let mut documents = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let doc = UploadedDocument::from_path(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?;
        documents.push(doc);
    }

    // ── Ensure PDFium engine is available ────────────────────────────────
    // Only needed when a PDF is among the inputs. The first run downloads
    // the library (~30 MB) into the pdfium-auto cache.
    #[cfg(not(feature = "bundled"))]
    if documents.iter().any(|d| d.kind() == DocumentKind::Pdf) && !pdfium_auto::is_pdfium_cached() {
        ensure_pdf_engine(cli.quiet)?;
    }

    // ── Build config and request ─────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let request = build_request(&cli).await?;

    let generator =
        PodcastGenerator::from_config(config).context("Failed to initialise providers")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = generator
        .run(documents, &request, &cli.output)
        .await
        .context("Podcast generation failed")?;

    if let (Some(path), Some(script)) = (&cli.script_out, &outcome.script) {
        save_script(script, path)
            .await
            .with_context(|| format!("Failed to write script to {}", path.display()))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
    } else if cli.script_out.is_none() {
        if let Some(script) = outcome.script_text() {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(script.as_bytes())
                .context("Failed to write to stdout")?;
            if !script.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet && !cli.json {
        let stats = &outcome.stats;
        if !outcome.failed_files.is_empty() && !show_progress {
            for failed in &outcome.failed_files {
                eprintln!("  {} {}  {}", red("✗"), failed.name, red(&failed.reason.to_string()));
            }
        }
        match outcome.audio_path() {
            Some(path) => eprintln!(
                "{}  {} words  {}  →  {}",
                green("✔"),
                stats.script_words,
                dim(&format!("{} KB", stats.audio_bytes / 1024)),
                bold(&path.display().to_string()),
            ),
            None => {
                if let Some(ref err) = outcome.error {
                    eprintln!("{}  {}", cyan("⚠"), err);
                }
            }
        }
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&stats.input_tokens.to_string()),
            dim(&stats.output_tokens.to_string()),
            stats.total_duration_ms,
        );
    }

    if outcome.status() == OutcomeStatus::Failed {
        anyhow::bail!(
            "{}",
            outcome
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no script produced".into())
        );
    }

    Ok(())
}

/// Download pdfium with a byte-progress bar (silently when quiet).
#[cfg(not(feature = "bundled"))]
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map CLI args to `PodcastConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PodcastConfig> {
    let mut builder = PodcastConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .tts_model(&cli.tts_model)
        .tts_base_url(&cli.tts_base_url)
        .tts_max_input_chars(cli.tts_chunk_chars)
        .api_timeout_secs(cli.api_timeout)
        .tts_timeout_secs(cli.tts_timeout);

    if let Some(ref path) = cli.persona_file {
        let persona = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read persona from {:?}", path))?;
        builder = builder.persona(persona);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref key) = cli.tts_api_key {
        builder = builder.tts_api_key(key);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.pdf_password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to `GenerationRequest`.
async fn build_request(cli: &Cli) -> Result<GenerationRequest> {
    let instructions = match (&cli.instructions, &cli.instructions_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read instructions from {:?}", path))?,
        ),
        (None, None) => None,
    };

    let mut builder = GenerationRequest::builder()
        .voice(cli.voice.into())
        .speed(cli.speed);
    if let Some(text) = instructions {
        builder = builder.instructions(text);
    }
    if let Some(minutes) = cli.minutes {
        builder = builder.target_minutes(minutes);
    }
    builder.build().context("Invalid request")
}
