//! Request orchestration
//!
//! One request runs as a single sequential unit of work:
//!
//! ```text
//! Received → Transcribed → IntentResolved → ActionDispatched → Synthesized → Delivered
//!     │            └──────────────┴── any failure ──┴──────────────┘
//!     │                                     ▼
//!     │                              ErrorFallback (spoken apology)
//!     └─ empty transcript → rejected
//! ```
//!
//! Only two failures escape: no speech in the upload, and a fallback apology
//! that could not be synthesized. Everything else is turned into audio.

pub mod temp;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

pub use temp::TempResources;

use crate::actions::ActionRouter;
use crate::config::Config;
use crate::engine::Shared;
use crate::intent::classifier::ChatClassifier;
use crate::intent::rules::RuleResolver;
use crate::intent::{ClockContext, Intent, IntentClassifier, IntentSource};
use crate::voice::{
    AudioFormat, SharedSynthesizer, SpeechToText, Synthesizer, TextToSpeech, Transcriber,
};
use crate::{Error, Result};

/// Spoken when the pipeline fails after receiving audio
pub const APOLOGY: &str = "Sorry, I had trouble understanding that.";

/// Transcript reported alongside the apology
pub const FALLBACK_TRANSCRIPT: &str = "Error processing request";

/// Pipeline stage a request has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Transcribed,
    IntentResolved,
    ActionDispatched,
    Synthesized,
    Delivered,
    ErrorFallback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Transcribed => "transcribed",
            Self::IntentResolved => "intent_resolved",
            Self::ActionDispatched => "action_dispatched",
            Self::Synthesized => "synthesized",
            Self::Delivered => "delivered",
            Self::ErrorFallback => "error_fallback",
        };
        f.write_str(name)
    }
}

/// Hard failures surfaced to the caller
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Transcription produced no text
    #[error("no speech detected")]
    NoSpeech,

    /// Even the apology could not be synthesized
    #[error("audio generation failed: {0}")]
    AudioGeneration(#[source] Error),
}

/// Ephemeral per-request state, owned by one `process` call
#[derive(Debug)]
struct RequestContext {
    id: Uuid,
    stage: Stage,
    audio_bytes: usize,
    transcript: Option<String>,
    intent: Option<Intent>,
    source: Option<IntentSource>,
    response_text: Option<String>,
}

impl RequestContext {
    fn new(audio_bytes: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Received,
            audio_bytes,
            transcript: None,
            intent: None,
            source: None,
            response_text: None,
        }
    }

    fn advance(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "stage transition");
        self.stage = stage;
    }
}

/// Failure inside the stages, before the fallback decision
enum StageFailure {
    NoSpeech,
    Internal(Error),
}

impl From<Error> for StageFailure {
    fn from(e: Error) -> Self {
        Self::Internal(e)
    }
}

/// A finished request, ready to hand to the caller
///
/// Owns the request's temp files; they are released when the delivery (or
/// the resources taken from it) is dropped.
#[derive(Debug)]
pub struct Delivery {
    /// Request identifier
    pub request_id: Uuid,
    /// Recognized speech, or [`FALLBACK_TRANSCRIPT`]
    pub transcript: String,
    /// Resolved intent; absent when the request fell back before resolving
    pub intent: Option<Intent>,
    /// Tier that produced the intent
    pub source: Option<IntentSource>,
    /// Text that was spoken
    pub response_text: String,
    /// Encoding of the response audio
    pub format: AudioFormat,
    /// Whether this is the apology rather than a real answer
    pub is_fallback: bool,
    resources: TempResources,
}

impl Delivery {
    /// Path of the synthesized response audio
    #[must_use]
    pub fn audio_path(&self) -> Option<&Path> {
        self.resources.output_path()
    }

    /// Read the response audio into memory
    ///
    /// # Errors
    ///
    /// Returns error if the output file is missing or unreadable
    pub async fn audio(&self) -> Result<Vec<u8>> {
        let path = self
            .audio_path()
            .ok_or_else(|| Error::Audio("delivery has no audio".to_string()))?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Take ownership of the temp files, e.g. to release them after streaming
    #[must_use]
    pub fn into_resources(self) -> TempResources {
        self.resources
    }
}

/// The request orchestrator
pub struct Orchestrator {
    transcriber: Arc<dyn Transcriber>,
    rules: RuleResolver,
    classifier: Arc<dyn IntentClassifier>,
    router: ActionRouter,
    synthesizer: Arc<dyn Synthesizer>,
    temp_dir: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        classifier: Arc<dyn IntentClassifier>,
        synthesizer: Arc<dyn Synthesizer>,
        router: ActionRouter,
    ) -> Self {
        Self {
            transcriber,
            rules: RuleResolver::new(crate::config::DEFAULT_ASSISTANT_NAME),
            classifier,
            router,
            synthesizer,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Build an orchestrator whose collaborators initialise lazily from `config`
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let stt_config = config.clone();
        let transcriber = Shared::new("stt", move || SpeechToText::from_config(&stt_config));

        let tts_config = config.clone();
        let synthesizer = SharedSynthesizer::new(
            Shared::new("tts", move || TextToSpeech::from_config(&tts_config)),
            TextToSpeech::format_for(config.voice.tts_provider),
        );

        let llm_config = config.clone();
        let classifier = Shared::new("classifier", move || {
            let c = &llm_config.classifier;
            ChatClassifier::new(
                c.base_url.clone(),
                c.model.clone(),
                c.max_tokens,
                c.timeout,
                llm_config.api_keys.classifier_key().cloned(),
                llm_config.assistant_name.clone(),
            )
        });

        Self::new(
            Arc::new(transcriber),
            Arc::new(classifier),
            Arc::new(synthesizer),
            ActionRouter::for_host(config.server.open_urls),
        )
        .temp_dir(config.server.temp_dir.clone())
        .assistant_name(&config.assistant_name)
    }

    /// Place request temp files in `dir`
    #[must_use]
    pub fn temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Name used in canned replies
    #[must_use]
    pub fn assistant_name(mut self, name: &str) -> Self {
        self.rules = RuleResolver::new(name);
        self
    }

    /// Encoding of synthesized audio
    #[must_use]
    pub fn output_format(&self) -> AudioFormat {
        self.synthesizer.format()
    }

    /// Resolve text with rules first, escalating to the classifier on a miss
    pub async fn resolve_intent(&self, text: &str) -> (Intent, IntentSource) {
        if let Some(intent) = self.rules.resolve(text) {
            tracing::info!(intent = intent.name(), "rules match");
            return (intent, IntentSource::Rules);
        }

        let intent = self.classifier.classify(text, &ClockContext::now()).await;
        tracing::info!(intent = intent.name(), "generative fallback");
        (intent, IntentSource::Generative)
    }

    /// Route an intent to its action, returning the response text
    #[must_use]
    pub fn handle_action(&self, intent: &Intent) -> String {
        self.router.handle_action(intent)
    }

    /// Transcribe an upload on its own, outside the full pipeline
    ///
    /// # Errors
    ///
    /// Returns error if the temp file cannot be written or transcription fails
    pub async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<String> {
        let mut resources = TempResources::new(&self.temp_dir);
        let path = resources.store_input(audio, format).await?;
        let text = self.transcriber.transcribe(&path).await;
        resources.release();
        text.map(|t| t.trim().to_string())
    }

    /// Synthesize text on its own, outside the full pipeline
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.synthesizer.synthesize(text).await
    }

    /// Run the full pipeline for one uploaded recording
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::NoSpeech`] when nothing was said, and
    /// [`ProcessError::AudioGeneration`] when not even the apology could be
    /// synthesized. In both cases the temp files are already gone.
    pub async fn process(
        &self,
        audio: &[u8],
        format: AudioFormat,
    ) -> std::result::Result<Delivery, ProcessError> {
        let mut ctx = RequestContext::new(audio.len());
        let span = tracing::info_span!("request", request_id = %ctx.id);

        async move {
            tracing::info!(audio_bytes = ctx.audio_bytes, format = format.mime(), "request received");
            let mut resources = TempResources::new(&self.temp_dir);

            match self.run_stages(&mut ctx, &mut resources, audio, format).await {
                Ok(()) => {
                    ctx.advance(Stage::Delivered);
                    Ok(self.deliver(ctx, resources, false))
                }
                Err(StageFailure::NoSpeech) => {
                    tracing::warn!("no speech detected, rejecting request");
                    resources.release();
                    Err(ProcessError::NoSpeech)
                }
                Err(StageFailure::Internal(e)) => {
                    tracing::error!(stage = %ctx.stage, error = %e, "processing error");
                    ctx.advance(Stage::ErrorFallback);
                    self.fall_back(ctx, resources).await
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        ctx: &mut RequestContext,
        resources: &mut TempResources,
        audio: &[u8],
        format: AudioFormat,
    ) -> std::result::Result<(), StageFailure> {
        let input = resources.store_input(audio, format).await?;

        let transcript = self.transcriber.transcribe(&input).await?;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(StageFailure::NoSpeech);
        }
        tracing::info!(transcript = %transcript, "transcribed");
        ctx.transcript = Some(transcript.to_string());
        ctx.advance(Stage::Transcribed);

        let (intent, source) = self.resolve_intent(transcript).await;
        ctx.advance(Stage::IntentResolved);

        let response = self.router.handle_action(&intent);
        tracing::info!(response = %response, "response ready");
        ctx.intent = Some(intent);
        ctx.source = Some(source);
        ctx.advance(Stage::ActionDispatched);

        let speech = self.synthesizer.synthesize(&response).await?;
        resources
            .store_output(&speech, self.synthesizer.format())
            .await?;
        ctx.response_text = Some(response);
        ctx.advance(Stage::Synthesized);

        Ok(())
    }

    async fn fall_back(
        &self,
        mut ctx: RequestContext,
        mut resources: TempResources,
    ) -> std::result::Result<Delivery, ProcessError> {
        let stored = match self.synthesizer.synthesize(APOLOGY).await {
            Ok(speech) => resources
                .store_output(&speech, self.synthesizer.format())
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = stored {
            tracing::error!(error = %e, "fallback synthesis failed");
            resources.release();
            return Err(ProcessError::AudioGeneration(e));
        }

        ctx.transcript = Some(FALLBACK_TRANSCRIPT.to_string());
        ctx.response_text = Some(APOLOGY.to_string());
        ctx.advance(Stage::Delivered);
        Ok(self.deliver(ctx, resources, true))
    }

    fn deliver(&self, ctx: RequestContext, resources: TempResources, is_fallback: bool) -> Delivery {
        Delivery {
            request_id: ctx.id,
            transcript: ctx.transcript.unwrap_or_default(),
            intent: ctx.intent,
            source: ctx.source,
            response_text: ctx.response_text.unwrap_or_default(),
            format: self.synthesizer.format(),
            is_fallback,
            resources,
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("rules", &self.rules)
            .field("router", &self.router)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}
