//! Pipeline integration tests with in-process fakes.
//!
//! The completion backend, speech backend and PDF parser are replaced by
//! fakes that record every call, so these tests run offline and can assert
//! that paid calls were (or were not) made.
//!
//! Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use edgequake_doc2pod::pipeline::audio;
use edgequake_doc2pod::pipeline::extract::{ParseError, SegmentParser, TextExtractor};
use edgequake_doc2pod::{
    Completion, CompletionBackend, CompletionParams, ExtractionFailure, GenerationError,
    GenerationOutcome, GenerationProgressCallback, GenerationRequest, GenerationStage,
    OutcomeError, OutcomeStatus, PodcastConfig, PodcastError, PodcastGenerator, ProviderError,
    RenderError, SpeechBackend, UploadedDocument, Voice,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Completion backend that answers every call with a fixed reply or error.
struct FakeCompletion {
    reply: Result<String, ProviderError>,
    calls: Mutex<Vec<(String, String, CompletionParams)>>,
}

impl FakeCompletion {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn system(&self) -> String {
        self.calls.lock().unwrap()[0].0.clone()
    }

    fn user(&self) -> String {
        self.calls.lock().unwrap()[0].1.clone()
    }
}

#[async_trait]
impl CompletionBackend for FakeCompletion {
    fn name(&self) -> &str {
        "fake-llm"
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        params: &CompletionParams,
    ) -> Result<Completion, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string(), *params));
        self.reply.clone().map(|text| Completion {
            text,
            input_tokens: 120,
            output_tokens: 40,
        })
    }
}

enum SpeechBehaviour {
    /// Write these bytes to the output path and report success.
    Write(Vec<u8>),
    /// Report success without touching the file system.
    WriteNothing,
    /// Report a provider failure.
    Fail(ProviderError),
}

struct FakeSpeech {
    behaviour: SpeechBehaviour,
    calls: Mutex<Vec<(String, Voice, f32, PathBuf)>>,
}

impl FakeSpeech {
    fn new(behaviour: SpeechBehaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn ok() -> Arc<Self> {
        Self::new(SpeechBehaviour::Write(b"ID3\x04\x00fake-mp3-frames".to_vec()))
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechBackend for FakeSpeech {
    fn name(&self) -> &str {
        "fake-tts"
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
        output: &Path,
    ) -> Result<(), RenderError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), voice, speed, output.to_path_buf()));
        match &self.behaviour {
            SpeechBehaviour::Write(bytes) => {
                std::fs::write(output, bytes).map_err(|e| RenderError::Io {
                    path: output.to_path_buf(),
                    detail: e.to_string(),
                })
            }
            SpeechBehaviour::WriteNothing => Ok(()),
            SpeechBehaviour::Fail(e) => Err(e.clone().into()),
        }
    }
}

/// PDF parser that rejects everything.
struct BrokenPdf;

impl SegmentParser for BrokenPdf {
    fn extract_segments(&self, _bytes: &[u8]) -> Result<Vec<String>, ParseError> {
        Err(ParseError::Malformed("xref table corrupt".into()))
    }
}

/// PDF parser that returns fixed pages.
struct PagesPdf(Vec<&'static str>);

impl SegmentParser for PagesPdf {
    fn extract_segments(&self, _bytes: &[u8]) -> Result<Vec<String>, ParseError> {
        Ok(self.0.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Default)]
struct StageRecorder {
    stages: Mutex<Vec<GenerationStage>>,
    read: Mutex<Vec<String>>,
    read_chars: Mutex<Vec<usize>>,
    failed: Mutex<Vec<String>>,
    script_words: Mutex<Option<usize>>,
    completed: Mutex<Option<OutcomeStatus>>,
}

impl GenerationProgressCallback for StageRecorder {
    fn on_stage(&self, stage: GenerationStage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_document_read(&self, _index: usize, _total: usize, name: &str, chars: usize) {
        self.read.lock().unwrap().push(name.to_string());
        self.read_chars.lock().unwrap().push(chars);
    }

    fn on_document_failed(&self, _index: usize, _total: usize, name: &str, _error: &str) {
        self.failed.lock().unwrap().push(name.to_string());
    }

    fn on_script_ready(&self, words: usize) {
        *self.script_words.lock().unwrap() = Some(words);
    }

    fn on_generation_complete(&self, status: OutcomeStatus) {
        *self.completed.lock().unwrap() = Some(status);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn txt(name: &str, body: &str) -> UploadedDocument {
    UploadedDocument::new(name, body.as_bytes().to_vec())
}

fn generator(completion: &Arc<FakeCompletion>, speech: &Arc<FakeSpeech>) -> PodcastGenerator {
    PodcastGenerator::new(completion.clone(), speech.clone(), PodcastConfig::default())
}

fn generator_with(
    completion: &Arc<FakeCompletion>,
    speech: &Arc<FakeSpeech>,
    config: PodcastConfig,
) -> PodcastGenerator {
    PodcastGenerator::new(completion.clone(), speech.clone(), config)
}

async fn run_txt(
    gen: &PodcastGenerator,
    request: &GenerationRequest,
    out: &Path,
) -> Result<GenerationOutcome, PodcastError> {
    gen.run(vec![txt("news.txt", "Hello newsletter.")], request, out)
        .await
}

// ── Scenario A ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_single_txt_default_length() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("episode.mp3");
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let corpus = gen
        .read_documents(&[txt("news.txt", "Hello newsletter.")])
        .expect("corpus");
    assert!(corpus.text.contains("Hello newsletter."));
    assert_eq!(corpus.read_files, vec!["news.txt"]);

    let outcome = gen
        .generate(&corpus, &GenerationRequest::default(), &out)
        .await
        .expect("outcome");

    assert_eq!(outcome.script_text(), Some("Script text."));
    assert_eq!(outcome.status(), OutcomeStatus::Complete);
    assert_eq!(outcome.audio_path(), Some(out.as_path()));
    assert!(outcome.error.is_none());

    assert_eq!(llm.call_count(), 1);
    assert!(llm.system().contains("500-1000 words"));
    assert!(!llm.system().contains("IMPORTANT LENGTH CONSTRAINT"));
    assert_eq!(llm.user(), corpus.text);

    let calls = tts.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Script text.");
    assert_eq!(calls[0].1, Voice::Nova);
    assert_eq!(calls[0].2, 1.0);
}

// ── Scenario B ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_b_broken_pdf_is_partitioned_out() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts)
        .with_extractor(TextExtractor::default().with_pdf_parser(Arc::new(BrokenPdf)));

    let docs = vec![
        txt("notes.txt", "Quarterly rates stayed flat."),
        UploadedDocument::new("report.pdf", b"%PDF-1.7 garbage".to_vec()),
    ];
    let outcome = gen
        .run(docs, &GenerationRequest::default(), dir.path().join("b.mp3"))
        .await
        .expect("outcome");

    assert_eq!(outcome.read_files, vec!["notes.txt"]);
    assert_eq!(outcome.failed_files.len(), 1);
    assert_eq!(outcome.failed_files[0].name, "report.pdf");
    assert!(matches!(
        outcome.failed_files[0].reason,
        ExtractionFailure::ReadError { .. }
    ));

    let user = llm.user();
    assert!(user.contains("Quarterly rates stayed flat."));
    assert!(!user.contains("report.pdf"));
    assert!(!user.contains("xref"));
    assert_eq!(outcome.status(), OutcomeStatus::Complete);
}

#[tokio::test]
async fn non_pdf_bytes_with_pdf_extension_fail_without_pdf_engine() {
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let corpus = gen
        .extract_corpus(vec![
            txt("a.txt", "kept"),
            UploadedDocument::new("fake.pdf", b"PK\x03\x04 not a pdf".to_vec()),
        ])
        .await
        .expect("corpus");
    assert_eq!(corpus.read_files, vec!["a.txt"]);
    assert_eq!(corpus.failed_names(), vec!["fake.pdf"]);
}

#[tokio::test]
async fn pdf_pages_joined_and_blank_pages_skipped() {
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts).with_extractor(
        TextExtractor::default().with_pdf_parser(Arc::new(PagesPdf(vec!["Page one", "  ", "Page three"]))),
    );

    let corpus = gen
        .read_documents(&[UploadedDocument::new("deck.pdf", b"%PDF".to_vec())])
        .expect("corpus");
    assert!(corpus.text.contains("Page one\nPage three"), "{}", corpus.text);
}

// ── Scenario C ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_c_ten_minutes_asks_for_1500_words() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let request = GenerationRequest::builder().target_minutes(10).build().unwrap();
    run_txt(&gen, &request, &dir.path().join("c.mp3"))
        .await
        .expect("outcome");

    let system = llm.system();
    assert!(system.contains("approximately 1500 words"), "{system}");
    assert!(!system.contains("500-1000 words"));
}

#[tokio::test]
async fn word_target_is_minutes_times_150() {
    for minutes in [1u32, 3, 7, 15, 60] {
        let dir = tempfile::tempdir().unwrap();
        let llm = FakeCompletion::replying("Script text.");
        let tts = FakeSpeech::ok();
        let gen = generator(&llm, &tts);
        let request = GenerationRequest::builder()
            .target_minutes(minutes)
            .build()
            .unwrap();
        run_txt(&gen, &request, &dir.path().join("w.mp3"))
            .await
            .expect("outcome");
        let expected = format!("approximately {} words", minutes * 150);
        assert!(llm.system().contains(&expected), "{minutes} min");
    }
}

#[tokio::test]
async fn zero_minutes_uses_soft_guideline() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);
    let request = GenerationRequest::builder().target_minutes(0).build().unwrap();
    run_txt(&gen, &request, &dir.path().join("z.mp3"))
        .await
        .expect("outcome");
    assert!(llm.system().contains("500-1000 words"));
}

// ── Scenario D ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_d_speed_out_of_range_never_reaches_speech() {
    let dir = tempfile::tempdir().unwrap();
    let tts = FakeSpeech::ok();

    let err = audio::render(
        tts.as_ref(),
        "Script text.",
        &dir.path().join("d.mp3"),
        Voice::Nova,
        5.0,
    )
    .await
    .unwrap_err();
    assert_eq!(err, RenderError::SpeedOutOfRange { speed: 5.0 });
    assert_eq!(tts.call_count(), 0);
}

#[tokio::test]
async fn invalid_speed_request_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let request = GenerationRequest {
        speed: 5.0,
        ..Default::default()
    };
    let err = run_txt(&gen, &request, &dir.path().join("d.mp3"))
        .await
        .unwrap_err();
    assert!(matches!(err, PodcastError::InvalidRequest(_)));
    assert_eq!(llm.call_count(), 0);
    assert_eq!(tts.call_count(), 0);
}

// ── No content ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_failed_documents_short_circuit_before_paid_calls() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let docs = vec![
        txt("sheet.xlsx", "a,b,c"),
        txt("empty.txt", "   \n "),
        txt("slides.pptx", "..."),
    ];
    assert!(gen.read_documents(&docs).is_none());

    let err = gen
        .run(docs, &GenerationRequest::default(), dir.path().join("n.mp3"))
        .await
        .unwrap_err();
    match err {
        PodcastError::NoContent { failed_files } => {
            assert_eq!(failed_files, vec!["sheet.xlsx", "empty.txt", "slides.pptx"]);
        }
        other => panic!("expected NoContent, got {other:?}"),
    }
    assert_eq!(llm.call_count(), 0);
    assert_eq!(tts.call_count(), 0);
    assert!(!dir.path().join("n.mp3").exists());
}

#[tokio::test]
async fn empty_corpus_passed_to_generate_is_no_content() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let err = gen
        .generate(
            &Default::default(),
            &GenerationRequest::default(),
            dir.path().join("e.mp3"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PodcastError::NoContent { .. }));
    assert_eq!(llm.call_count(), 0);
}

// ── Script stage ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn fenced_model_output_never_reaches_speech() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("```markdown\n## Intro\nWelcome to **the** show.\n```\n");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let outcome = run_txt(&gen, &GenerationRequest::default(), &dir.path().join("f.mp3"))
        .await
        .expect("outcome");
    let script = outcome.script_text().expect("script");
    assert!(!script.contains("```"));
    assert_eq!(script, "Intro\nWelcome to the show.");
    assert!(!tts.calls.lock().unwrap()[0].0.contains("```"));
}

#[tokio::test]
async fn script_failure_propagates_and_skips_audio() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::failing(ProviderError::Auth {
        provider: "fake-llm".into(),
        detail: "invalid api key".into(),
    });
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let err = run_txt(&gen, &GenerationRequest::default(), &dir.path().join("s.mp3"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PodcastError::Generation(GenerationError::Provider(ProviderError::Auth { .. }))
    ));
    assert_eq!(tts.call_count(), 0);
}

#[tokio::test]
async fn empty_model_answer_is_a_failed_outcome_without_audio() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("```\n\n```");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let outcome = run_txt(&gen, &GenerationRequest::default(), &dir.path().join("x.mp3"))
        .await
        .expect("outcome");
    assert_eq!(outcome.status(), OutcomeStatus::Failed);
    assert!(outcome.script.is_none());
    assert_eq!(outcome.error, Some(OutcomeError::EmptyScript));
    assert_eq!(tts.call_count(), 0);
}

#[tokio::test]
async fn instructions_and_persona_reach_the_system_channel() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let config = PodcastConfig::builder()
        .persona("You host a late-night jazz radio show.")
        .temperature(0.9)
        .max_tokens(1234)
        .build()
        .unwrap();
    let gen = generator_with(&llm, &tts, config);

    let request = GenerationRequest::builder()
        .instructions("Focus on fintech, keep it upbeat.")
        .build()
        .unwrap();
    run_txt(&gen, &request, &dir.path().join("p.mp3"))
        .await
        .expect("outcome");

    let system = llm.system();
    assert!(system.starts_with("You host a late-night jazz radio show."));
    assert!(system.contains("Focus on fintech, keep it upbeat."));
    assert!(!llm.user().contains("Focus on fintech"));

    let params = llm.calls.lock().unwrap()[0].2;
    assert_eq!(params.temperature, 0.9);
    assert_eq!(params.max_tokens, 1234);
}

// ── Audio stage ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn speech_failure_yields_partial_with_script() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::new(SpeechBehaviour::Fail(ProviderError::RateLimited {
        provider: "fake-tts".into(),
        detail: "quota".into(),
    }));
    let gen = generator(&llm, &tts);

    let outcome = run_txt(&gen, &GenerationRequest::default(), &dir.path().join("r.mp3"))
        .await
        .expect("audio errors never escape");
    assert_eq!(outcome.status(), OutcomeStatus::Partial);
    assert_eq!(outcome.script_text(), Some("Script text."));
    assert!(outcome.audio_path().is_none());
    assert!(matches!(
        outcome.render_error(),
        Some(RenderError::Provider {
            source: ProviderError::RateLimited { .. }
        })
    ));
}

#[tokio::test]
async fn claimed_success_without_file_is_partial() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::new(SpeechBehaviour::WriteNothing);
    let gen = generator(&llm, &tts);

    let outcome = run_txt(&gen, &GenerationRequest::default(), &dir.path().join("m.mp3"))
        .await
        .expect("outcome");
    assert_eq!(outcome.status(), OutcomeStatus::Partial);
    assert!(outcome.audio_path().is_none());
    assert!(matches!(
        outcome.render_error(),
        Some(RenderError::ArtifactMissing { .. })
    ));
}

#[tokio::test]
async fn previous_episode_at_output_path_is_not_reported_as_new_audio() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("episode.mp3");
    std::fs::write(&out, b"ID3 last week's episode").unwrap();

    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::new(SpeechBehaviour::WriteNothing);
    let gen = generator(&llm, &tts);

    let outcome = run_txt(&gen, &GenerationRequest::default(), &out)
        .await
        .expect("outcome");
    assert_eq!(tts.call_count(), 1);
    assert_eq!(outcome.status(), OutcomeStatus::Partial);
    assert!(outcome.audio.is_none());
    assert!(matches!(
        outcome.render_error(),
        Some(RenderError::ArtifactMissing { .. })
    ));
}

#[tokio::test]
async fn claimed_success_with_empty_file_is_partial() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::new(SpeechBehaviour::Write(Vec::new()));
    let gen = generator(&llm, &tts);

    let outcome = run_txt(&gen, &GenerationRequest::default(), &dir.path().join("e.mp3"))
        .await
        .expect("outcome");
    assert_eq!(outcome.status(), OutcomeStatus::Partial);
    assert_eq!(outcome.script_text(), Some("Script text."));
    assert!(matches!(
        outcome.render_error(),
        Some(RenderError::ArtifactEmpty { .. })
    ));
}

#[tokio::test]
async fn voice_and_speed_forwarded_to_speech() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("v.mp3");
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let request = GenerationRequest::builder()
        .voice(Voice::Shimmer)
        .speed(1.5)
        .build()
        .unwrap();
    let outcome = run_txt(&gen, &request, &out).await.expect("outcome");

    let calls = tts.calls.lock().unwrap();
    assert_eq!(calls[0].1, Voice::Shimmer);
    assert_eq!(calls[0].2, 1.5);
    assert_eq!(calls[0].3, out);
    assert!(outcome.audio.expect("audio").bytes > 0);
}

// ── Progress and stats ───────────────────────────────────────────────────────

#[test]
fn document_read_progress_counts_characters() {
    let recorder = Arc::new(StageRecorder::default());
    let config = PodcastConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let gen = generator_with(
        &FakeCompletion::replying("unused"),
        &FakeSpeech::ok(),
        config,
    );

    let corpus = gen
        .read_documents(&[txt("menu.txt", "café naïve")])
        .expect("corpus");
    assert_eq!(corpus.read_files, vec!["menu.txt"]);
    assert_eq!(*recorder.read_chars.lock().unwrap(), vec![10]);
}

#[tokio::test]
async fn progress_follows_the_state_machine() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("One two three four.");
    let tts = FakeSpeech::ok();
    let recorder = Arc::new(StageRecorder::default());
    let config = PodcastConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let gen = generator_with(&llm, &tts, config);

    gen.run(
        vec![txt("a.txt", "alpha"), txt("b.odt", "beta")],
        &GenerationRequest::default(),
        dir.path().join("s.mp3"),
    )
    .await
    .expect("outcome");

    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![
            GenerationStage::Idle,
            GenerationStage::Extracting,
            GenerationStage::Assembled,
            GenerationStage::Synthesizing,
            GenerationStage::ScriptReady,
            GenerationStage::Rendering,
            GenerationStage::Complete,
        ]
    );
    assert_eq!(*recorder.read.lock().unwrap(), vec!["a.txt"]);
    assert_eq!(*recorder.failed.lock().unwrap(), vec!["b.odt"]);
    assert_eq!(*recorder.script_words.lock().unwrap(), Some(4));
    assert_eq!(*recorder.completed.lock().unwrap(), Some(OutcomeStatus::Complete));
}

#[tokio::test]
async fn partial_run_ends_in_partial_stage() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::new(SpeechBehaviour::WriteNothing);
    let recorder = Arc::new(StageRecorder::default());
    let config = PodcastConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let gen = generator_with(&llm, &tts, config);

    run_txt(&gen, &GenerationRequest::default(), &dir.path().join("p.mp3"))
        .await
        .expect("outcome");
    assert_eq!(
        recorder.stages.lock().unwrap().last(),
        Some(&GenerationStage::Partial)
    );
    assert_eq!(*recorder.completed.lock().unwrap(), Some(OutcomeStatus::Partial));
}

#[tokio::test]
async fn stats_carry_tokens_and_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text here.");
    let tts = FakeSpeech::ok();
    let gen = generator(&llm, &tts);

    let outcome = run_txt(&gen, &GenerationRequest::default(), &dir.path().join("t.mp3"))
        .await
        .expect("outcome");
    let s = &outcome.stats;
    assert_eq!(s.documents_read, 1);
    assert_eq!(s.documents_failed, 0);
    assert_eq!(s.input_tokens, 120);
    assert_eq!(s.output_tokens, 40);
    assert_eq!(s.script_words, 3);
    assert_eq!(s.audio_bytes, std::fs::metadata(dir.path().join("t.mp3")).unwrap().len());
}

#[tokio::test]
async fn outcome_serialises_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::new(SpeechBehaviour::WriteNothing);
    let gen = generator(&llm, &tts);

    let outcome = run_txt(&gen, &GenerationRequest::default(), &dir.path().join("j.mp3"))
        .await
        .expect("outcome");
    let json = serde_json::to_value(&outcome).expect("serialise");
    assert_eq!(json["script"], "Script text.");
    assert!(json["audio"].is_null());
    assert_eq!(json["error"]["stage"], "audio");
    assert_eq!(json["error"]["error"]["kind"], "artifact_missing");
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let llm = FakeCompletion::replying("Script text.");
    let tts = FakeSpeech::ok();
    let gen = Arc::new(generator(&llm, &tts));
    let counter = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..4 {
        let gen = gen.clone();
        let counter = counter.clone();
        let out = dir.path().join(format!("{i}.mp3"));
        handles.push(tokio::spawn(async move {
            let outcome = gen
                .run(
                    vec![txt(&format!("{i}.txt"), "body")],
                    &GenerationRequest::default(),
                    &out,
                )
                .await
                .expect("outcome");
            assert_eq!(outcome.read_files, vec![format!("{i}.txt")]);
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 4);
    assert_eq!(llm.call_count(), 4);
}
