//! Type definitions for the redirect ruleset document.
//!
//! These types match the document the rule editor saves, field for field,
//! so a ruleset can be loaded without any intermediate conversion.

use serde::{Deserialize, Deserializer, Serialize};

/// Status code used when an entry does not carry one.
pub const DEFAULT_STATUS_CODE: u16 = 301;

/// Refresh interval written into a freshly provisioned ruleset.
pub const SEED_REFRESH_SECS: u64 = 60;

// ============================================================================
// Ruleset Document
// ============================================================================

/// The complete ruleset document.
///
/// Categories are evaluated in field order: `rules`, then `wildcards`,
/// then `querystrings`. Missing categories are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Ruleset {
    /// Exact URI rules
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    /// URI patterns containing `*`
    #[serde(default)]
    pub wildcards: Vec<RuleSpec>,
    /// Exact raw querystring rules
    #[serde(default)]
    pub querystrings: Vec<RuleSpec>,
    /// Advisory cache TTL in seconds for whoever fetches this document.
    /// The editor writes it either as a number or as a numeric string.
    /// Fractions are rounded; an unusable value is dropped with a warning.
    #[serde(
        rename = "refreshTime",
        default,
        deserialize_with = "deserialize_refresh_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_time: Option<u64>,
}

/// A single declarative redirect entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleSpec {
    /// URI, wildcard pattern or raw querystring, depending on the category
    #[serde(rename = "original")]
    pub origin: String,
    /// Destination template; may contain `*` for wildcard rules
    #[serde(rename = "redirect")]
    pub destination: String,
    /// Absent or `null` means 301
    #[serde(rename = "statusCode", default = "default_status_code", deserialize_with = "deserialize_status_code")]
    pub status_code: u16,
    /// ISO-8601 UTC timestamp, e.g. `2021-07-09T07:16:00.000Z`
    #[serde(rename = "startTime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

fn default_status_code() -> u16 {
    DEFAULT_STATUS_CODE
}

impl RuleSpec {
    /// Create an always-active entry with the default status code.
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            status_code: DEFAULT_STATUS_CODE,
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Restrict the entry to a validity window. Either bound may be omitted.
    pub fn with_window(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.start_time = start.map(str::to_string);
        self.end_time = end.map(str::to_string);
        self
    }
}

impl Ruleset {
    /// The initial document written when a deployment is provisioned:
    /// no rules at all and a one minute refresh hint.
    pub fn seed() -> Self {
        Self {
            refresh_time: Some(SEED_REFRESH_SECS),
            ..Self::default()
        }
    }

    /// Parse a ruleset from its JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a ruleset exported in RON format.
    pub fn from_ron(ron: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(ron)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Total number of entries across all categories.
    pub fn len(&self) -> usize {
        self.rules.len() + self.wildcards.len() + self.querystrings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    // Untagged rather than Option so RON's bare `statusCode: 308` still parses.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawStatus {
        Code(u16),
        Null(()),
    }

    Ok(match RawStatus::deserialize(deserializer)? {
        RawStatus::Code(code) => code,
        RawStatus::Null(()) => DEFAULT_STATUS_CODE,
    })
}

/// Accepts `10`, `10.5`, `"10"` or `null` for `refreshTime`.
///
/// The value is only a hint, so anything that is not a non-negative number
/// of seconds becomes `None` instead of rejecting the document.
fn deserialize_refresh_time<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRefresh {
        Seconds(u64),
        Fractional(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let secs = match Option::<RawRefresh>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(RawRefresh::Seconds(secs)) => return Ok(Some(secs)),
        Some(RawRefresh::Fractional(secs)) => Some(secs),
        Some(RawRefresh::Text(text)) => text.trim().parse::<f64>().ok(),
        Some(RawRefresh::Other(_)) => None,
    };

    match secs {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(secs.round() as u64)),
        _ => {
            tracing::warn!(value = ?secs, "ignoring unusable refreshTime hint");
            Ok(None)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
