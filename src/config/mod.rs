//! Configuration management for Aura

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};

/// Default assistant name used in canned replies and the classifier prompt
pub const DEFAULT_ASSISTANT_NAME: &str = "Aura";

/// Aura configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Name the assistant introduces itself with
    pub assistant_name: String,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// Generative classifier configuration
    pub classifier: ClassifierConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Directory for per-request audio files
    pub temp_dir: PathBuf,

    /// Whether actions may open URLs on this host
    pub open_urls: bool,
}

/// STT provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    OpenAi,
    Deepgram,
}

/// TTS provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    OpenAi,
    ElevenLabs,
}

impl SttProvider {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "whisper" => Ok(Self::OpenAi),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

impl TtsProvider {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT backend
    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// Transcription language, fixed per deployment
    pub language: String,

    /// TTS backend
    pub tts_provider: TtsProvider,

    /// TTS model (e.g. "tts-1", "eleven_monolingual_v1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

/// Generative classifier configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Base URL of an OpenAI-compatible API (no trailing slash)
    pub base_url: String,

    /// Chat model identifier
    pub model: String,

    /// Completion token cap; intents are short JSON objects
    pub max_tokens: u32,

    /// Request timeout
    pub timeout: Duration,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper, TTS, and classifier by default)
    pub openai: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,

    /// Dedicated classifier key, for when it runs somewhere other than `OpenAI`
    pub classifier: Option<SecretString>,
}

impl ApiKeys {
    /// Key used by the generative classifier
    #[must_use]
    pub fn classifier_key(&self) -> Option<&SecretString> {
        self.classifier.as_ref().or(self.openai.as_ref())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                static_dir: None,
                temp_dir: std::env::temp_dir(),
                open_urls: true,
            },
            voice: VoiceConfig {
                stt_provider: SttProvider::OpenAi,
                stt_model: "whisper-1".to_string(),
                language: "en".to_string(),
                tts_provider: TtsProvider::OpenAi,
                tts_model: "tts-1".to_string(),
                tts_voice: "alloy".to_string(),
                tts_speed: 1.0,
            },
            classifier: ClassifierConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                max_tokens: 64,
                timeout: Duration::from_secs(20),
            },
            api_keys: ApiKeys::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the optional TOML file
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognised
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration with precedence env > file > default
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognised
    pub fn from_sources(
        fc: file::AuraConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai).map(SecretString::from),
            deepgram: env("DEEPGRAM_API_KEY")
                .or(fc.api_keys.deepgram)
                .map(SecretString::from),
            elevenlabs: env("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .map(SecretString::from),
            classifier: env("AURA_CLASSIFIER_API_KEY")
                .or(fc.api_keys.classifier)
                .map(SecretString::from),
        };

        let server = ServerConfig {
            host: env("AURA_HOST")
                .or(fc.server.host)
                .unwrap_or(defaults.server.host),
            port: env("AURA_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(defaults.server.port),
            static_dir: env("AURA_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            temp_dir: env("AURA_TEMP_DIR")
                .or(fc.server.temp_dir)
                .map_or(defaults.server.temp_dir, PathBuf::from),
            open_urls: env("AURA_OPEN_URLS")
                .and_then(|s| parse_bool(&s))
                .or(fc.server.open_urls)
                .unwrap_or(defaults.server.open_urls),
        };

        let stt_provider = env("AURA_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .map(|s| SttProvider::parse(&s))
            .transpose()?
            .unwrap_or(defaults.voice.stt_provider);
        let tts_provider = env("AURA_TTS_PROVIDER")
            .or(fc.voice.tts_provider)
            .map(|s| TtsProvider::parse(&s))
            .transpose()?
            .unwrap_or(defaults.voice.tts_provider);

        let voice = VoiceConfig {
            stt_provider,
            stt_model: env("AURA_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt_model(stt_provider).to_string()),
            language: fc.voice.language.unwrap_or(defaults.voice.language),
            tts_provider,
            tts_model: env("AURA_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts_model(tts_provider).to_string()),
            tts_voice: env("AURA_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(defaults.voice.tts_voice),
            tts_speed: fc
                .voice
                .tts_speed
                .unwrap_or(defaults.voice.tts_speed)
                .clamp(0.25, 4.0),
        };

        let classifier = ClassifierConfig {
            base_url: env("AURA_CLASSIFIER_URL")
                .or(fc.classifier.base_url)
                .map_or(defaults.classifier.base_url, |u| {
                    u.trim_end_matches('/').to_string()
                }),
            model: env("AURA_CLASSIFIER_MODEL")
                .or(fc.classifier.model)
                .unwrap_or(defaults.classifier.model),
            max_tokens: fc
                .classifier
                .max_tokens
                .unwrap_or(defaults.classifier.max_tokens),
            timeout: fc
                .classifier
                .timeout_secs
                .map_or(defaults.classifier.timeout, Duration::from_secs),
        };

        Ok(Self {
            assistant_name: fc.assistant_name.unwrap_or(defaults.assistant_name),
            server,
            voice,
            classifier,
            api_keys,
        })
    }
}

const fn default_stt_model(provider: SttProvider) -> &'static str {
    match provider {
        SttProvider::OpenAi => "whisper-1",
        SttProvider::Deepgram => "nova-2",
    }
}

const fn default_tts_model(provider: TtsProvider) -> &'static str {
    match provider {
        TtsProvider::OpenAi => "tts-1",
        TtsProvider::ElevenLabs => "eleven_monolingual_v1",
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::from_sources(file::AuraConfigFile::default(), |_| None).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.voice.language, "en");
        assert_eq!(config.voice.stt_model, "whisper-1");
        assert!(config.server.open_urls);
        assert!(config.api_keys.classifier_key().is_none());
    }

    #[test]
    fn env_overrides_file() {
        let fc: file::AuraConfigFile = toml::from_str(
            r#"
            [server]
            port = 9000
            open_urls = true
            "#,
        )
        .unwrap();
        let env = env_from(&[("AURA_PORT", "9100"), ("AURA_OPEN_URLS", "false")]);

        let config = Config::from_sources(fc, env).unwrap();
        assert_eq!(config.server.port, 9100);
        assert!(!config.server.open_urls);
    }

    #[test]
    fn provider_switch_changes_default_model() {
        let env = env_from(&[("AURA_STT_PROVIDER", "deepgram")]);
        let config = Config::from_sources(file::AuraConfigFile::default(), env).unwrap();

        assert_eq!(config.voice.stt_provider, SttProvider::Deepgram);
        assert_eq!(config.voice.stt_model, "nova-2");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let env = env_from(&[("AURA_TTS_PROVIDER", "espeak")]);
        assert!(Config::from_sources(file::AuraConfigFile::default(), env).is_err());
    }

    #[test]
    fn classifier_key_falls_back_to_openai() {
        let env = env_from(&[("OPENAI_API_KEY", "sk-test")]);
        let config = Config::from_sources(file::AuraConfigFile::default(), env).unwrap();

        let key = config.api_keys.classifier_key().unwrap();
        assert_eq!(key.expose_secret(), "sk-test");
    }

    #[test]
    fn classifier_url_trailing_slash_trimmed() {
        let env = env_from(&[("AURA_CLASSIFIER_URL", "http://localhost:11434/v1/")]);
        let config = Config::from_sources(file::AuraConfigFile::default(), env).unwrap();

        assert_eq!(config.classifier.base_url, "http://localhost:11434/v1");
    }
}
