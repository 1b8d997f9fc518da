//! Shared test utilities

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aura_voice::intent::{ClockContext, Intent, IntentClassifier};
use aura_voice::{ActionRouter, AudioFormat, Error, Orchestrator, Result, Synthesizer, Transcriber, UrlLauncher};

/// Bytes the scripted synthesizer returns
pub const SPEECH: &[u8] = b"RIFF-fake-speech";

/// Transcriber that returns a fixed transcript, or fails
pub struct ScriptedTranscriber {
    reply: std::result::Result<String, String>,
    pub calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn says(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn fails(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "input audio should exist while transcribing");
        self.reply.clone().map_err(Error::Stt)
    }
}

/// Classifier that answers with a fixed intent and counts calls
pub struct RecordingClassifier {
    reply: Intent,
    pub calls: AtomicUsize,
}

impl RecordingClassifier {
    pub fn answering(reply: Intent) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentClassifier for RecordingClassifier {
    async fn classify(&self, _text: &str, _clock: &ClockContext) -> Intent {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

/// Synthesizer that returns [`SPEECH`], optionally failing for some inputs
pub struct ScriptedSynthesizer {
    fail_on: FailOn,
    pub spoken: Mutex<Vec<String>>,
}

enum FailOn {
    Nothing,
    Everything,
    Text(String),
}

impl ScriptedSynthesizer {
    pub fn working() -> Arc<Self> {
        Self::with(FailOn::Nothing)
    }

    pub fn broken() -> Arc<Self> {
        Self::with(FailOn::Everything)
    }

    /// Fails only when asked to speak `text`
    pub fn failing_on(text: &str) -> Arc<Self> {
        Self::with(FailOn::Text(text.to_string()))
    }

    fn with(fail_on: FailOn) -> Arc<Self> {
        Arc::new(Self {
            fail_on,
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.spoken.lock().unwrap().push(text.to_string());
        let fail = match &self.fail_on {
            FailOn::Nothing => false,
            FailOn::Everything => true,
            FailOn::Text(t) => t == text,
        };
        if fail {
            return Err(Error::Tts("synthesis unavailable".to_string()));
        }
        Ok(SPEECH.to_vec())
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }
}

/// Launcher that records URLs instead of opening them
#[derive(Default)]
pub struct RecordingLauncher {
    pub urls: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl UrlLauncher for RecordingLauncher {
    fn launch(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

/// Orchestrator wired to test doubles, writing temp files under `dir`
pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub classifier: Arc<RecordingClassifier>,
    pub synthesizer: Arc<ScriptedSynthesizer>,
    pub launcher: Arc<RecordingLauncher>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(transcriber: Arc<ScriptedTranscriber>, synthesizer: Arc<ScriptedSynthesizer>) -> Self {
        Self::with_classifier(
            transcriber,
            RecordingClassifier::answering(Intent::respond("From the model")),
            synthesizer,
        )
    }

    pub fn with_classifier(
        transcriber: Arc<ScriptedTranscriber>,
        classifier: Arc<RecordingClassifier>,
        synthesizer: Arc<ScriptedSynthesizer>,
    ) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let launcher = Arc::new(RecordingLauncher::default());
        let orchestrator = Orchestrator::new(
            transcriber.clone(),
            classifier.clone(),
            synthesizer.clone(),
            ActionRouter::new(launcher.clone()),
        )
        .temp_dir(dir.path().to_path_buf());

        Self {
            orchestrator: Arc::new(orchestrator),
            transcriber,
            classifier,
            synthesizer,
            launcher,
            dir,
        }
    }

    /// Files currently left in the temp directory
    pub fn leftover_files(&self) -> usize {
        std::fs::read_dir(self.dir.path())
            .expect("temp dir should exist")
            .count()
    }
}

/// A short silent WAV recording
pub fn wav_fixture() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for _ in 0..1600 {
            writer.write_sample(0_i16).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}
