//! Intent model and resolvers
//!
//! An [`Intent`] is the structured reading of one utterance. It is produced
//! once per request, either by the deterministic [`rules`] resolver or, on a
//! rule miss, by the generative [`classifier`], and consumed once by the
//! action router.

pub mod apps;
pub mod classifier;
pub mod rules;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub use apps::App;
pub use classifier::{ChatClassifier, ClockContext, IntentClassifier};
pub use rules::resolve_rules;

/// Structured classification of a user utterance
///
/// On the wire this is a flat object tagged by `"intent"`; an unfamiliar
/// discriminant is written back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Current time/date question
    Time,

    /// Weather lookup, optionally for a place
    Weather { location: Option<String> },

    /// Open an app or website
    OpenApp { target: String },

    /// Play or search for content
    Search { query: String },

    /// Literal spoken reply
    Respond { text: Option<String> },

    /// Well-formed intent with a discriminant this assistant doesn't handle
    Unknown { name: String },

    /// Not a tagged value at all
    Malformed,
}

impl Intent {
    /// Discriminant as it appears on the wire
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Time => "time",
            Self::Weather { .. } => "weather",
            Self::OpenApp { .. } => "open_app",
            Self::Search { .. } => "search",
            Self::Respond { .. } => "respond",
            Self::Unknown { name } => name,
            Self::Malformed => "malformed",
        }
    }

    /// Shorthand for a `respond` intent
    pub fn respond(text: impl Into<String>) -> Self {
        Self::Respond {
            text: Some(text.into()),
        }
    }

    /// Decode a loosely-typed JSON value
    ///
    /// Never fails: a non-object or a missing/non-string discriminant decodes
    /// to [`Intent::Malformed`], an unfamiliar discriminant to
    /// [`Intent::Unknown`]. Fields of the wrong type count as absent.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Malformed;
        };
        let Some(name) = object.get("intent").and_then(Value::as_str) else {
            return Self::Malformed;
        };
        let field = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(ToString::to_string)
        };

        match name.trim().to_lowercase().as_str() {
            "time" => Self::Time,
            "weather" => Self::Weather {
                location: field("location"),
            },
            "open_app" => Self::OpenApp {
                target: field("target").unwrap_or_default(),
            },
            "search" => Self::Search {
                query: field("query").unwrap_or_default(),
            },
            "respond" => Self::Respond {
                text: field("text"),
            },
            _ => Self::Unknown {
                name: name.to_string(),
            },
        }
    }
}

impl Serialize for Intent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("intent", self.name())?;
        match self {
            Self::Weather {
                location: Some(location),
            } => map.serialize_entry("location", location)?,
            Self::OpenApp { target } => map.serialize_entry("target", target)?,
            Self::Search { query } => map.serialize_entry("query", query)?,
            Self::Respond { text: Some(text) } => map.serialize_entry("text", text)?,
            _ => {}
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Which tier produced a request's intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// Deterministic rule resolver
    Rules,
    /// Generative classifier fallback
    Generative,
}

impl IntentSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Generative => "generative",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_each_discriminant() {
        assert_eq!(Intent::from_value(&json!({"intent": "time"})), Intent::Time);
        assert_eq!(
            Intent::from_value(&json!({"intent": "weather", "location": "paris"})),
            Intent::Weather {
                location: Some("paris".to_string())
            }
        );
        assert_eq!(
            Intent::from_value(&json!({"intent": "open_app", "target": "netflix"})),
            Intent::OpenApp {
                target: "netflix".to_string()
            }
        );
        assert_eq!(
            Intent::from_value(&json!({"intent": "search", "query": "lofi"})),
            Intent::Search {
                query: "lofi".to_string()
            }
        );
        assert_eq!(
            Intent::from_value(&json!({"intent": "respond", "text": "Hi"})),
            Intent::respond("Hi")
        );
    }

    #[test]
    fn absent_fields_stay_absent() {
        assert_eq!(
            Intent::from_value(&json!({"intent": "weather"})),
            Intent::Weather { location: None }
        );
        assert_eq!(
            Intent::from_value(&json!({"intent": "respond", "text": 5})),
            Intent::Respond { text: None }
        );
    }

    #[test]
    fn non_objects_are_malformed() {
        assert_eq!(Intent::from_value(&json!("time")), Intent::Malformed);
        assert_eq!(Intent::from_value(&json!([1, 2])), Intent::Malformed);
        assert_eq!(Intent::from_value(&json!({"target": "x"})), Intent::Malformed);
    }

    #[test]
    fn unfamiliar_discriminant_is_unknown() {
        let intent = Intent::from_value(&json!({"intent": "set_alarm", "at": "7am"}));
        assert_eq!(
            intent,
            Intent::Unknown {
                name: "set_alarm".to_string()
            }
        );
        assert_eq!(intent.name(), "set_alarm");
    }

    #[test]
    fn serializes_tagged() {
        let value = serde_json::to_value(Intent::Weather { location: None }).unwrap();
        assert_eq!(value, json!({"intent": "weather"}));

        let parsed: Intent = serde_json::from_str(r#"{"intent":"open_app","target":"gmail"}"#).unwrap();
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({"intent": "open_app", "target": "gmail"})
        );
    }

    #[test]
    fn unknown_keeps_its_discriminant_on_the_wire() {
        let intent = Intent::Unknown {
            name: "set_alarm".to_string(),
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value, json!({"intent": "set_alarm"}));

        let decoded: Intent = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, intent);
    }

    #[test]
    fn malformed_serializes_as_its_name() {
        let value = serde_json::to_value(Intent::Malformed).unwrap();
        assert_eq!(value, json!({"intent": "malformed"}));
    }
}
