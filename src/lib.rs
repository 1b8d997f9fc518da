//! Aura - a voice-command assistant
//!
//! This library provides the request pipeline behind the `aura` server:
//! - Speech-to-text and text-to-speech via hosted providers
//! - Intent resolution with fast rules and a generative fallback
//! - Action routing that builds a spoken reply and may open a URL
//! - An HTTP API that always answers with audio when it can
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      HTTP API                        │
//! │   /process  │  /api/voice  │  /api/intent  │ health │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Orchestrator                      │
//! │   STT  →  rules / classifier  →  router  →  TTS     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Hosted providers                    │
//! │   Whisper │ Deepgram │ chat completions │ TTS       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod intent;
pub mod pipeline;
pub mod voice;

pub use actions::{Action, ActionRouter, Effect, UrlLauncher};
pub use api::{ApiServer, ApiServerBuilder};
pub use config::Config;
pub use engine::Shared;
pub use error::{Error, Result};
pub use intent::{Intent, IntentClassifier, IntentSource};
pub use pipeline::{Delivery, Orchestrator, ProcessError};
pub use voice::{AudioFormat, Synthesizer, Transcriber};
