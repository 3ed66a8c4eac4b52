//! Predicate evaluation.
//!
//! Tests a request fact against the compiled predicate list and returns the
//! first match as a redirect decision. Evaluation never fails: "no match"
//! is an ordinary outcome meaning the request passes through unchanged.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::compiler::{CompiledPredicate, CompiledRuleset, Criterion};
use crate::render::render_with;

/// The request attributes a ruleset is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFact {
    pub uri: String,
    /// Raw querystring, without the leading `?`
    pub querystring: String,
    pub evaluated_at: DateTime<Utc>,
}

impl RequestFact {
    /// A fact evaluated at the current wall-clock time.
    pub fn new(uri: impl Into<String>, querystring: impl Into<String>) -> Self {
        Self::at(uri, querystring, Utc::now())
    }

    /// A fact evaluated at a fixed instant.
    pub fn at(uri: impl Into<String>, querystring: impl Into<String>, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            uri: uri.into(),
            querystring: querystring.into(),
            evaluated_at,
        }
    }
}

/// A redirect to issue instead of serving the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectDecision {
    pub status_code: u16,
    pub location: String,
}

impl RedirectDecision {
    /// Header pair to set on the redirect response.
    pub fn location_header(&self) -> (&'static str, &str) {
        ("Location", &self.location)
    }
}

/// Evaluate a fact against an ordered predicate list.
///
/// Predicates are tested in order and the first one whose window contains
/// `fact.evaluated_at` and whose criterion holds wins.
pub fn evaluate<'a, I>(predicates: I, fact: &RequestFact) -> Option<RedirectDecision>
where
    I: IntoIterator<Item = &'a CompiledPredicate>,
{
    for (position, predicate) in predicates.into_iter().enumerate() {
        if !predicate.window.contains(fact.evaluated_at) {
            tracing::trace!(position, origin = %predicate.record.origin, "outside validity window");
            continue;
        }

        let location = match &predicate.criterion {
            Criterion::Exact(uri) if *uri == fact.uri => predicate.record.destination.clone(),
            Criterion::Querystring(qs) if *qs == fact.querystring => predicate.record.destination.clone(),
            Criterion::Wildcard(pattern) if pattern.is_match(&fact.uri) => {
                render_with(&predicate.record.destination, pattern, &fact.uri)
            }
            _ => continue,
        };

        tracing::debug!(
            position,
            category = %predicate.category(),
            origin = %predicate.record.origin,
            %location,
            status = predicate.record.status_code,
            "redirect rule matched"
        );

        return Some(RedirectDecision {
            status_code: predicate.record.status_code,
            location,
        });
    }

    tracing::trace!(uri = %fact.uri, "no redirect rule matched");
    None
}

impl CompiledRuleset {
    /// Evaluate a fact against this ruleset. See [`evaluate`].
    pub fn evaluate(&self, fact: &RequestFact) -> Option<RedirectDecision> {
        evaluate(self, fact)
    }
}
