// src/models/mod.rs

pub mod chat;
pub mod community;
pub mod guide;
pub mod note;
pub mod scholarship;
pub mod translation;

pub use chat::*;
pub use community::*;
pub use guide::*;
pub use note::*;
pub use scholarship::*;
pub use translation::*;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Generates an enum with fixed string labels: as_str, from_str
/// (case-insensitive), is_valid, all_values, Display and serde by label.
macro_rules! define_label_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            #[inline]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            pub fn from_str(s: &str) -> Option<Self> {
                $( if s.eq_ignore_ascii_case($label) { return Some($name::$variant); } )+
                None
            }

            #[inline]
            pub fn is_valid(s: &str) -> bool {
                Self::from_str(s).is_some()
            }

            pub const fn all_values() -> &'static [&'static str] {
                &[ $( $label ),+ ]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::from_str(s).ok_or_else(|| format!("Invalid {}: '{}'", stringify!($name), s))
            }
        }
    };
}

pub(crate) use define_label_enum;

define_label_enum! {
    pub enum DegreeLevel {
        Undergraduate => "Undergraduate",
        Masters => "Masters",
        PhD => "PhD",
        Research => "Research",
        Training => "Training",
    }
}

// ==================== BOUNDARY COERCION ====================
// Array-typed columns sometimes hold non-array JSON (null, a bare string, an
// object). Everything past this boundary assumes well-typed sequences, so
// anything that is not an array becomes empty here.

pub fn string_list_from_value(value: Value) -> Vec<String> {
    match value {
        Value::Array(elements) => elements
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parses a JSON text column into a list of strings.
pub fn coerce_string_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|text| serde_json::from_str::<Value>(text).ok())
        .map(string_list_from_value)
        .unwrap_or_default()
}

pub fn steps_from_value(value: Value) -> Vec<GuideStep> {
    let Value::Array(elements) = value else {
        return Vec::new();
    };
    elements
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => {
                let text = |key: &str| {
                    map.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                Some(GuideStep { title: text("title"), content: text("content") })
            }
            _ => None,
        })
        .collect()
}

pub fn coerce_steps(raw: Option<&str>) -> Vec<GuideStep> {
    raw.and_then(|text| serde_json::from_str::<Value>(text).ok())
        .map(steps_from_value)
        .unwrap_or_default()
}

/// `deserialize_with` counterpart of [`coerce_string_list`] for JSON payloads.
pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_list_from_value(Value::deserialize(deserializer)?))
}

pub fn lenient_steps<'de, D>(deserializer: D) -> Result<Vec<GuideStep>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(steps_from_value(Value::deserialize(deserializer)?))
}

/// For patch fields: an absent field stays `None`, an explicit `null`
/// becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Serialises a list for a JSON text column.
pub fn to_json_text<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_level_labels() {
        assert_eq!(DegreeLevel::from_str("phd"), Some(DegreeLevel::PhD));
        assert_eq!(DegreeLevel::PhD.as_str(), "PhD");
        assert!(!DegreeLevel::is_valid("Diploma"));
        assert_eq!(serde_json::to_string(&DegreeLevel::Masters).unwrap(), "\"Masters\"");
        let parsed: DegreeLevel = serde_json::from_str("\"Training\"").unwrap();
        assert_eq!(parsed, DegreeLevel::Training);
    }

    #[test]
    fn test_coerce_string_list() {
        assert_eq!(coerce_string_list(Some(r#"["Law","Art"]"#)), vec!["Law", "Art"]);
        assert!(coerce_string_list(Some("null")).is_empty());
        assert!(coerce_string_list(Some(r#""Engineering""#)).is_empty());
        assert!(coerce_string_list(Some(r#"{"a":1}"#)).is_empty());
        assert!(coerce_string_list(Some("not json")).is_empty());
        assert!(coerce_string_list(None).is_empty());
        assert_eq!(coerce_string_list(Some(r#"["Law", 3, null]"#)), vec!["Law"]);
    }

    #[test]
    fn test_coerce_steps() {
        let steps = coerce_steps(Some(r#"[{"title":"Apply","content":"Fill the form"},{"title":"Wait"},"junk"]"#));
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].title, "Apply");
        assert_eq!(steps[1].content, "");
        assert!(coerce_steps(Some(r#"{"title":"x"}"#)).is_empty());
    }

    #[test]
    fn test_lenient_payload_fields() {
        #[derive(serde::Deserialize)]
        struct Payload {
            #[serde(default, deserialize_with = "lenient_string_list")]
            fields: Vec<String>,
        }
        let p: Payload = serde_json::from_str(r#"{"fields":"Engineering"}"#).unwrap();
        assert!(p.fields.is_empty());
        let p: Payload = serde_json::from_str(r#"{}"#).unwrap();
        assert!(p.fields.is_empty());
        let p: Payload = serde_json::from_str(r#"{"fields":["Law"]}"#).unwrap();
        assert_eq!(p.fields, vec!["Law"]);
    }

    #[test]
    fn test_nullable_patch_field() {
        let absent: UpdateScholarshipRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.source_url, None);
        let cleared: UpdateScholarshipRequest = serde_json::from_str(r#"{"source_url":null}"#).unwrap();
        assert_eq!(cleared.source_url, Some(None));
        let set: UpdateGuideRequest = serde_json::from_str(r#"{"image_url":"https://a.org/x.png"}"#).unwrap();
        assert_eq!(set.image_url, Some(Some("https://a.org/x.png".to_string())));
        assert!(serde_json::to_value(&absent).unwrap().get("source_url").is_none());
    }
}
