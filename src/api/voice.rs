//! Voice API endpoints for speech-to-text and text-to-speech

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::config::{Config, SttProvider, TtsProvider};
use crate::pipeline::ProcessError;
use crate::voice::AudioFormat;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/transcribe", post(transcribe))
        .route("/synthesize", post(synthesize))
        .route("/capabilities", get(capabilities))
        .with_state(state)
}

/// Voice capabilities response
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoiceCapabilities {
    pub stt_available: bool,
    pub tts_available: bool,
    pub classifier_available: bool,
}

impl VoiceCapabilities {
    /// Derive what can work from the configured keys
    ///
    /// A classifier pointed somewhere other than `OpenAI` may not need a key.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let keys = &config.api_keys;
        let stt_available = match config.voice.stt_provider {
            SttProvider::OpenAi => keys.openai.is_some(),
            SttProvider::Deepgram => keys.deepgram.is_some(),
        };
        let tts_available = match config.voice.tts_provider {
            TtsProvider::OpenAi => keys.openai.is_some(),
            TtsProvider::ElevenLabs => keys.elevenlabs.is_some(),
        };
        let classifier_available = keys.classifier_key().is_some()
            || !config.classifier.base_url.contains("api.openai.com");

        Self {
            stt_available,
            tts_available,
            classifier_available,
        }
    }
}

/// Get voice capabilities
async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<VoiceCapabilities> {
    Json(state.capabilities)
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Transcribe audio to text
///
/// Accepts audio in WAV format (audio/wav) or `WebM` format (audio/webm)
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TranscribeResponse>, VoiceError> {
    if !state.capabilities.stt_available {
        return Err(VoiceError::NotConfigured("STT not configured (no API key)"));
    }

    if body.is_empty() {
        return Err(VoiceError::BadRequest("Empty audio data"));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let text = state
        .orchestrator
        .transcribe(&body, AudioFormat::from_content_type(content_type))
        .await
        .map_err(|e| VoiceError::TranscriptionFailed(e.to_string()))?;

    Ok(Json(TranscribeResponse { text }))
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
}

/// Synthesize text to speech
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, VoiceError> {
    if !state.capabilities.tts_available {
        return Err(VoiceError::NotConfigured("TTS not configured (no API key)"));
    }

    if request.text.trim().is_empty() {
        return Err(VoiceError::BadRequest("Empty text"));
    }

    let audio = state
        .orchestrator
        .synthesize(&request.text)
        .await
        .map_err(|e| VoiceError::SynthesisFailed(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, state.orchestrator.output_format().mime())],
        audio,
    )
        .into_response())
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    NotConfigured(&'static str),
    BadRequest(&'static str),
    NoSpeech,
    TranscriptionFailed(String),
    SynthesisFailed(String),
    AudioGenerationFailed,
}

impl From<ProcessError> for VoiceError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::NoSpeech => Self::NoSpeech,
            ProcessError::AudioGeneration(_) => Self::AudioGenerationFailed,
        }
    }
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::NoSpeech => (StatusCode::BAD_REQUEST, "no_speech", "No speech detected".to_string()),
            Self::TranscriptionFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "transcription_failed", msg),
            Self::SynthesisFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "synthesis_failed", msg),
            Self::AudioGenerationFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "audio_generation_failed",
                "Audio generation failed".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
