//! Generative intent classifier
//!
//! Second tier, used only when the rule resolver misses. The contract is
//! total: `classify` always yields a usable [`Intent`], substituting a
//! friendly `respond` intent when the model can't be reached or its output
//! can't be decoded.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::Intent;
use crate::engine::Shared;
use crate::{Error, Result};

/// Reply used whenever the model output is unusable
pub const FALLBACK_REPLY: &str = "I'm here to help! What would you like to do?";

/// First flat JSON object in free-form model output
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("valid regex"));

/// Wall-clock context handed to the model so it never invents a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockContext {
    /// e.g. "09:41 AM"
    pub time: String,
    /// e.g. "Friday, October 16, 2026"
    pub date: String,
}

impl ClockContext {
    /// Context for the current local time
    #[must_use]
    pub fn now() -> Self {
        Self::at(&Local::now())
    }

    /// Context for a given instant
    pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            time: instant.format("%I:%M %p").to_string(),
            date: instant.format("%A, %B %d, %Y").to_string(),
        }
    }
}

/// Model-backed intent classification
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify `text`; never fails
    async fn classify(&self, text: &str, clock: &ClockContext) -> Intent;
}

#[async_trait]
impl<T: IntentClassifier> IntentClassifier for Shared<T> {
    async fn classify(&self, text: &str, clock: &ClockContext) -> Intent {
        match self.get().await {
            Ok(inner) => inner.classify(text, clock).await,
            Err(e) => {
                tracing::warn!(error = %e, "classifier unavailable, using default reply");
                Intent::respond(FALLBACK_REPLY)
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Classifier backed by an OpenAI-compatible chat completions endpoint
///
/// Works against hosted models or a local server (llama.cpp, vLLM, Ollama)
/// running a small instruct model.
pub struct ChatClassifier {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: Option<SecretString>,
    assistant_name: String,
}

impl ChatClassifier {
    /// Create a classifier for `base_url` (e.g. `https://api.openai.com/v1`)
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        base_url: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
        api_key: Option<SecretString>,
        assistant_name: String,
    ) -> Result<Self> {
        if model.is_empty() {
            return Err(Error::Config("classifier model required".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            model,
            max_tokens,
            api_key,
            assistant_name,
        })
    }

    /// Build the system prompt for this assistant and moment
    #[must_use]
    pub fn system_prompt(&self, clock: &ClockContext) -> String {
        format!(
            r#"You are "{name}", a friendly voice assistant.

CONTEXT: Today is {date} | Current time is {time} | Use this for time/date. NEVER make up times.

RULES:
- Output ONLY valid JSON. No other text.
- Use ONE intent:
  - "time": time/date questions.
  - "weather": weather questions. Include "location" if one is named.
  - "open_app": open a website or app. Include "target" (lowercase).
  - "search": play or search for content. Include "query".
  - "respond": everything else. Include a warm "text" (max 15 words).
- Keep replies short; they will be spoken aloud.

EXAMPLES:
User: what time is it
{{"intent":"time"}}
User: open netflix
{{"intent":"open_app","target":"netflix"}}
User: play bad guy
{{"intent":"search","query":"bad guy"}}
User: is it raining in lisbon
{{"intent":"weather","location":"lisbon"}}
User: how are you
{{"intent":"respond","text":"Feeling great! Ready to help."}}"#,
            name = self.assistant_name,
            date = clock.date,
            time = clock.time,
        )
    }

    /// Ask the model and decode its answer
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or output
    /// without a decodable intent object
    pub async fn try_classify(&self, text: &str, clock: &ClockContext) -> Result<Intent> {
        let system = self.system_prompt(clock);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Classifier(format!("chat API error {status}: {body}")));
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        tracing::debug!(output = %content, "classifier output");
        parse_intent(&content)
            .ok_or_else(|| Error::Classifier(format!("no intent in model output: {content:?}")))
    }
}

#[async_trait]
impl IntentClassifier for ChatClassifier {
    async fn classify(&self, text: &str, clock: &ClockContext) -> Intent {
        match self.try_classify(text, clock).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(error = %e, "failed to classify intent, using default reply");
                Intent::respond(FALLBACK_REPLY)
            }
        }
    }
}

/// Extract the first flat JSON object from model output and decode it
///
/// Returns `None` when there is no object, it isn't JSON, or it carries no
/// discriminant.
#[must_use]
pub fn parse_intent(output: &str) -> Option<Intent> {
    let candidate = JSON_OBJECT.find(output)?;
    let value: serde_json::Value = serde_json::from_str(candidate.as_str()).ok()?;
    match Intent::from_value(&value) {
        Intent::Malformed => None,
        intent => Some(intent),
    }
}
