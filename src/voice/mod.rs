//! Voice collaborators
//!
//! The orchestrator only sees the [`Transcriber`] and [`Synthesizer`] traits.
//! The HTTP-backed [`SpeechToText`] and [`TextToSpeech`] clients implement
//! them, and both traits are forwarded through [`Shared`] so a process can
//! build each client once on first use.

mod stt;
mod tts;

use std::path::Path;

use async_trait::async_trait;

pub use stt::SpeechToText;
pub use tts::TextToSpeech;

use crate::Result;
use crate::engine::Shared;

/// Speech-to-text engine
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `path`
    async fn transcribe(&self, path: &Path) -> Result<String>;
}

/// Text-to-speech engine
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` to encoded audio
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Encoding of the audio this engine produces
    fn format(&self) -> AudioFormat;
}

/// Audio container formats handled at the edges of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Webm,
    Mp3,
}

impl AudioFormat {
    /// Format for an uploaded part with the given content type
    ///
    /// Anything that isn't explicitly `WebM` is treated as WAV.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type.map(|c| c.split(';').next().unwrap_or(c).trim()) {
            Some("audio/webm" | "video/webm") => Self::Webm,
            Some("audio/mpeg" | "audio/mp3") => Self::Mp3,
            _ => Self::Wav,
        }
    }

    /// Format implied by a file extension, defaulting to WAV
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("webm") => Self::Webm,
            Some("mp3") => Self::Mp3,
            _ => Self::Wav,
        }
    }

    /// MIME type
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Webm => "audio/webm",
            Self::Mp3 => "audio/mpeg",
        }
    }

    /// File extension without the dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Webm => "webm",
            Self::Mp3 => "mp3",
        }
    }
}

#[async_trait]
impl<T: Transcriber> Transcriber for Shared<T> {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        self.get().await?.transcribe(path).await
    }
}

/// Shared synthesizer that also knows its output format before initialising
pub struct SharedSynthesizer<T> {
    handle: Shared<T>,
    format: AudioFormat,
}

impl<T> SharedSynthesizer<T> {
    /// Wrap a lazily-built synthesizer that will produce `format`
    pub const fn new(handle: Shared<T>, format: AudioFormat) -> Self {
        Self { handle, format }
    }
}

#[async_trait]
impl<T: Synthesizer> Synthesizer for SharedSynthesizer<T> {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.handle.get().await?.synthesize(text).await
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_mapping() {
        assert_eq!(AudioFormat::from_content_type(Some("audio/webm")), AudioFormat::Webm);
        assert_eq!(
            AudioFormat::from_content_type(Some("audio/webm;codecs=opus")),
            AudioFormat::Webm
        );
        assert_eq!(AudioFormat::from_content_type(Some("audio/wav")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_content_type(None), AudioFormat::Wav);
    }

    #[test]
    fn path_mapping() {
        assert_eq!(AudioFormat::from_path(Path::new("/tmp/a.webm")), AudioFormat::Webm);
        assert_eq!(AudioFormat::from_path(Path::new("/tmp/a")), AudioFormat::Wav);
    }
}
