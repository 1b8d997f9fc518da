//! Action router
//!
//! Maps a resolved [`Intent`] to the text spoken back to the user plus an
//! optional external effect. Text generation ([`plan`]) is pure; performing
//! the effect is left to [`ActionRouter::handle_action`], which hands it to a
//! [`UrlLauncher`] without waiting.

mod launcher;

use std::sync::{Arc, LazyLock};

use chrono::{Local, NaiveDateTime};
use regex::Regex;

pub use launcher::{NoopLauncher, SystemLauncher, UrlLauncher};

use crate::intent::{App, Intent};

/// Reply for an intent the router has no branch for
pub const UNSUPPORTED_REPLY: &str = "I'm still learning! I can't handle that request yet.";

/// Reply for input that isn't a tagged intent at all
pub const MALFORMED_REPLY: &str = "I had trouble understanding that request.";

static LEADING_PREPOSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:in|at|for|the)\s+").expect("valid regex"));

static TRAILING_APP_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s+)(?:website|app|application|site|page|dot com)$").expect("valid regex")
});

/// External effect requested by an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a URL in the default viewer
    OpenUrl(String),
}

/// Outcome of routing an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Text to speak back
    pub response: String,
    /// Effect to perform, if any
    pub effect: Option<Effect>,
}

impl Action {
    fn say(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            effect: None,
        }
    }

    fn open(response: impl Into<String>, url: String) -> Self {
        Self {
            response: response.into(),
            effect: Some(Effect::OpenUrl(url)),
        }
    }
}

/// Compute the response and effect for `intent` at local time `now`
///
/// Never fails and always returns non-empty response text.
#[must_use]
pub fn plan(intent: &Intent, now: NaiveDateTime) -> Action {
    match intent {
        Intent::Time => Action::say(format!(
            "It's {} on {}.",
            now.format("%I:%M %p"),
            now.format("%A, %B %-d")
        )),
        Intent::Weather { location } => plan_weather(location.as_deref()),
        Intent::OpenApp { target } => plan_open(target),
        Intent::Search { query } => plan_search(query),
        Intent::Respond { text } => Action::say(
            text.as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("Okay."),
        ),
        Intent::Unknown { .. } => Action::say(UNSUPPORTED_REPLY),
        Intent::Malformed => Action::say(MALFORMED_REPLY),
    }
}

fn plan_weather(location: Option<&str>) -> Action {
    let location = location.map(|l| l.trim().to_lowercase()).unwrap_or_default();
    let location = LEADING_PREPOSITION.replace(&location, "");
    let location = location.trim();

    if location.is_empty() {
        return Action::open(
            "Showing current weather forecast",
            "https://www.google.com/search?q=weather".to_string(),
        );
    }

    let query = format!("weather in {location}");
    Action::open(
        format!("Showing weather for {}", title_case(location)),
        format!(
            "https://www.google.com/search?q={}",
            urlencoding::encode(&query)
        ),
    )
}

fn plan_open(target: &str) -> Action {
    let target = target.trim().to_lowercase();
    let target = TRAILING_APP_WORD.replace(&target, "");
    let target = target.trim();

    if target.is_empty() {
        return Action::say("Which app would you like me to open?");
    }

    match App::lookup(target) {
        Some(app) => Action::open(
            format!("Opening {}", title_case(app.canonical())),
            format!("https://{}", app.domain()),
        ),
        None => {
            let host: String = target.split_whitespace().collect();
            let domain = if host.contains('.') {
                host
            } else {
                format!("{host}.com")
            };
            Action::open(format!("Opening {target}"), format!("https://{domain}"))
        }
    }
}

fn plan_search(query: &str) -> Action {
    let query = query.trim();
    if query.is_empty() {
        return Action::say("What would you like me to search for?");
    }

    Action::open(
        format!("Playing {query} on YouTube"),
        format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(query)
        ),
    )
}

/// Capitalise the first letter of every alphabetic run
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Routes intents to responses and performs their effects
#[derive(Clone)]
pub struct ActionRouter {
    launcher: Arc<dyn UrlLauncher>,
}

impl ActionRouter {
    /// Create a router that opens URLs through `launcher`
    #[must_use]
    pub fn new(launcher: Arc<dyn UrlLauncher>) -> Self {
        Self { launcher }
    }

    /// Create a router for this host: the system opener when enabled and
    /// available, otherwise a logging no-op
    #[must_use]
    pub fn for_host(open_urls: bool) -> Self {
        if !open_urls {
            return Self::new(Arc::new(NoopLauncher));
        }
        match SystemLauncher::detect() {
            Some(launcher) => Self::new(Arc::new(launcher)),
            None => {
                tracing::warn!("no url opener found, url actions will only be logged");
                Self::new(Arc::new(NoopLauncher))
            }
        }
    }

    /// Route `intent`: fire its effect and return the response text
    #[must_use]
    pub fn handle_action(&self, intent: &Intent) -> String {
        let action = plan(intent, Local::now().naive_local());
        if let Some(Effect::OpenUrl(url)) = &action.effect {
            self.launcher.launch(url);
        }
        tracing::debug!(intent = intent.name(), response = %action.response, "action dispatched");
        action.response
    }
}

impl std::fmt::Debug for ActionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRouter").finish_non_exhaustive()
    }
}
