//! Rule-based intent resolver
//!
//! Deterministic first tier: an ordered set of recognizers is tried against
//! the normalised transcript and the first one that matches wins. The order
//! is the tie-break policy (time beats weather beats open beats search beats
//! canned replies). A miss returns `None` and the caller escalates to the
//! generative classifier.

use std::sync::LazyLock;

use regex::Regex;

use super::{App, Intent};
use crate::config::DEFAULT_ASSISTANT_NAME;

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(time|clock|date|what day|day is it)\b").expect("valid regex")
});

static WEATHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(weather|forecast|temperature|how (hot|cold)|degrees)\b").expect("valid regex")
});

static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:in|at|for)\s+([a-z\s]+)").expect("valid regex"));

static TRAILING_WHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s+)(?:right now|today|tonight|tomorrow|now)$").expect("valid regex")
});

static LEADING_WHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:right now|today|tonight|tomorrow|now)(?:\s+(?:in|at|for)\s+|$)")
        .expect("valid regex")
});

static OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bopen\s+([a-z0-9\s]+)").expect("valid regex"));

static TRAILING_POLITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(?:please|for me)$").expect("valid regex"));

static SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:play|search|find|look for)\s+(.+)").expect("valid regex")
});

/// Whole-word tokens dropped from search queries
const FILLER_WORDS: [&str; 5] = ["me", "for", "a", "the", "some"];

/// Canned replies, in priority order; `{name}` is the assistant name
const CANNED: [(&str, &str); 7] = [
    (r"\b(hi|hello|hey)\b", "Hi! I'm {name}. How can I help?"),
    (r"\bhow are you\b", "Feeling great! Ready to help."),
    (r"\bthank", "You're welcome!"),
    (
        r"\bjoke\b",
        "Why don't scientists trust atoms? They make up everything!",
    ),
    (
        r"\bhelp\b",
        "I can open apps, play music, tell time, or just chat!",
    ),
    (r"\byour name\b", "I'm {name}, your AI assistant!"),
    (r"\bwho are you\b", "I'm {name}, your AI assistant!"),
];

static DEFAULT_RESOLVER: LazyLock<RuleResolver> =
    LazyLock::new(|| RuleResolver::new(DEFAULT_ASSISTANT_NAME));

/// Resolve `text` with the default assistant name
///
/// See [`RuleResolver::resolve`].
#[must_use]
pub fn resolve_rules(text: &str) -> Option<Intent> {
    DEFAULT_RESOLVER.resolve(text)
}

/// Ordered, first-match-wins pattern resolver
#[derive(Debug)]
pub struct RuleResolver {
    canned: Vec<(Regex, String)>,
}

impl RuleResolver {
    /// Build a resolver whose canned replies use `assistant_name`
    #[must_use]
    pub fn new(assistant_name: &str) -> Self {
        let canned = CANNED
            .iter()
            .map(|(pattern, reply)| {
                (
                    Regex::new(pattern).expect("valid regex"),
                    reply.replace("{name}", assistant_name),
                )
            })
            .collect();

        Self { canned }
    }

    /// Resolve a transcript to an intent, or `None` when no rule applies
    ///
    /// Pure and deterministic: the same text always yields the same result.
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<Intent> {
        let text = normalize(text);
        if text.is_empty() {
            return None;
        }

        if TIME.is_match(&text) {
            return Some(Intent::Time);
        }

        if WEATHER.is_match(&text) {
            return Some(Intent::Weather {
                location: extract_location(&text),
            });
        }

        if let Some(caps) = OPEN.captures(&text) {
            let phrase = TRAILING_POLITE.replace(caps[1].trim(), "");
            let target = App::lookup(&phrase)
                .map_or_else(|| phrase.trim().to_string(), |app| app.canonical().to_string());
            return Some(Intent::OpenApp { target });
        }

        if let Some(caps) = SEARCH.captures(&text) {
            return Some(Intent::Search {
                query: strip_filler(&caps[1]),
            });
        }

        self.canned
            .iter()
            .find(|(pattern, _)| pattern.is_match(&text))
            .map(|(_, reply)| Intent::respond(reply.clone()))
    }
}

/// Lowercase, trim, and drop sentence punctuation added by transcription
fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_string()
}

fn extract_location(text: &str) -> Option<String> {
    let caps = LOCATION.captures(text)?;
    let mut location = caps[1].trim().to_string();
    // "for tomorrow in paris" puts the time word first
    loop {
        let leading = LEADING_WHEN.replace(&location, "");
        let stripped = TRAILING_WHEN.replace(leading.trim(), "").trim().to_string();
        if stripped == location {
            break;
        }
        location = stripped;
    }
    (!location.is_empty()).then_some(location)
}

fn strip_filler(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .filter(|word| !FILLER_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}
