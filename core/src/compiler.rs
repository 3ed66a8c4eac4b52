//! Ruleset compilation.
//!
//! Turns a [`Ruleset`] document into a flat, ordered list of predicates.
//! Order is fixed: every exact rule, then every wildcard rule, then every
//! querystring rule, each category in document order. Compilation is all or
//! nothing; one bad entry rejects the whole ruleset.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::types::{RuleSpec, Ruleset};
use crate::wildcard::WildcardPattern;

/// Timestamp layout written by the rule editor (`2021-07-09T07:16:00.000Z`).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Errors that can occur while compiling a ruleset.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Malformed ruleset document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("Malformed {field} {value:?} on {category} entry {index}")]
    MalformedTimestamp {
        category: RuleCategory,
        index: usize,
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid wildcard pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

// ============================================================================
// Compiled Types
// ============================================================================

/// The category a predicate was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Exact,
    Wildcard,
    Querystring,
}

impl RuleCategory {
    /// Name of the document section holding this category.
    pub fn section(&self) -> &'static str {
        match self {
            RuleCategory::Exact => "rules",
            RuleCategory::Wildcard => "wildcards",
            RuleCategory::Querystring => "querystrings",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleCategory::Exact => "exact",
            RuleCategory::Wildcard => "wildcard",
            RuleCategory::Querystring => "querystring",
        })
    }
}

/// What a predicate tests the request against.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// URI must equal this string byte for byte
    Exact(String),
    /// URI must match this pattern
    Wildcard(WildcardPattern),
    /// Raw querystring must equal this string byte for byte
    Querystring(String),
}

impl Criterion {
    pub fn category(&self) -> RuleCategory {
        match self {
            Criterion::Exact(_) => RuleCategory::Exact,
            Criterion::Wildcard(_) => RuleCategory::Wildcard,
            Criterion::Querystring(_) => RuleCategory::Querystring,
        }
    }
}

/// Inclusive validity window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ValidityWindow {
    /// A window that is always open.
    pub const ALWAYS: ValidityWindow = ValidityWindow {
        start: DateTime::<Utc>::MIN_UTC,
        end: DateTime::<Utc>::MAX_UTC,
    };

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// True when no instant can ever fall inside the window.
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// The redirect an entry produces when it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRecord {
    pub origin: String,
    pub destination: String,
    pub status_code: u16,
}

/// A single compiled entry: criterion, window and redirect record.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    pub criterion: Criterion,
    pub window: ValidityWindow,
    pub record: RedirectRecord,
}

impl CompiledPredicate {
    pub fn category(&self) -> RuleCategory {
        self.criterion.category()
    }
}

/// The ordered predicate list for one ruleset document.
///
/// Immutable once built; safe to share between concurrent evaluations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledRuleset {
    predicates: Vec<CompiledPredicate>,
    refresh_time: Option<Duration>,
}

impl CompiledRuleset {
    pub fn predicates(&self) -> &[CompiledPredicate] {
        &self.predicates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledPredicate> {
        self.predicates.iter()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// The document's advisory refresh interval, if it declared one.
    pub fn refresh_time(&self) -> Option<Duration> {
        self.refresh_time
    }

    /// Number of predicates in the given category.
    pub fn count(&self, category: RuleCategory) -> usize {
        self.predicates.iter().filter(|p| p.category() == category).count()
    }
}

impl<'a> IntoIterator for &'a CompiledRuleset {
    type Item = &'a CompiledPredicate;
    type IntoIter = std::slice::Iter<'a, CompiledPredicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.predicates.iter()
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// Compile a ruleset JSON document.
pub fn compile_json(json: &str) -> Result<CompiledRuleset, CompileError> {
    let ruleset = Ruleset::from_json(json)?;
    compile(&ruleset)
}

/// Compile a parsed ruleset into its ordered predicate list.
pub fn compile(ruleset: &Ruleset) -> Result<CompiledRuleset, CompileError> {
    let mut predicates = Vec::with_capacity(ruleset.len());

    let sections = [
        (RuleCategory::Exact, &ruleset.rules),
        (RuleCategory::Wildcard, &ruleset.wildcards),
        (RuleCategory::Querystring, &ruleset.querystrings),
    ];

    for (category, specs) in sections {
        for (index, spec) in specs.iter().enumerate() {
            predicates.push(compile_entry(category, index, spec)?);
        }
    }

    let compiled = CompiledRuleset {
        predicates,
        refresh_time: ruleset.refresh_time.map(Duration::from_secs),
    };

    tracing::info!(
        exact = compiled.count(RuleCategory::Exact),
        wildcard = compiled.count(RuleCategory::Wildcard),
        querystring = compiled.count(RuleCategory::Querystring),
        "compiled redirect ruleset"
    );

    Ok(compiled)
}

fn compile_entry(category: RuleCategory, index: usize, spec: &RuleSpec) -> Result<CompiledPredicate, CompileError> {
    let start = resolve_bound(category, index, "startTime", spec.start_time.as_deref())?
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = resolve_bound(category, index, "endTime", spec.end_time.as_deref())?
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let window = ValidityWindow { start, end };

    if window.is_inverted() {
        tracing::warn!(%category, index, origin = %spec.origin, "entry window ends before it starts and will never match");
    }

    let criterion = match category {
        RuleCategory::Exact => Criterion::Exact(spec.origin.clone()),
        RuleCategory::Querystring => Criterion::Querystring(spec.origin.clone()),
        RuleCategory::Wildcard => {
            let pattern = WildcardPattern::translate(&spec.origin).map_err(|source| CompileError::InvalidPattern {
                pattern: spec.origin.clone(),
                source,
            })?;
            tracing::debug!(pattern = %spec.origin, regex = pattern.regex_source(), "translated wildcard");
            Criterion::Wildcard(pattern)
        }
    };

    Ok(CompiledPredicate {
        criterion,
        window,
        record: RedirectRecord {
            origin: spec.origin.clone(),
            destination: spec.destination.clone(),
            status_code: spec.status_code,
        },
    })
}

fn resolve_bound(
    category: RuleCategory,
    index: usize,
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, CompileError> {
    let Some(value) = value else {
        return Ok(None);
    };
    parse_timestamp(value).map(Some).map_err(|source| CompileError::MalformedTimestamp {
        category,
        index,
        field,
        value: value.to_string(),
        source,
    })
}

/// Parse an editor timestamp. Offsets other than `Z` are accepted in
/// RFC 3339 form and normalized to UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(strict) => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| strict),
    }
}
