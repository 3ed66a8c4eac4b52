//! Redirector configuration and the per-deployment facade.
//!
//! The core never fetches the ruleset itself. [`RedirectorConfig`] records
//! where the document lives and how often the fetch layer should refresh it,
//! and [`Redirector`] pairs that configuration with a compiled ruleset.

use std::collections::HashMap;
use std::time::Duration;

use crate::compiler::{compile_json, CompileError, CompiledRuleset};
use crate::evaluator::{RedirectDecision, RequestFact};
use crate::types::SEED_REFRESH_SECS;

/// Origin custom header naming the bucket that holds the ruleset.
pub const RULES_BUCKET_HEADER: &str = "rules_bucket";
/// Origin custom header naming the ruleset object key.
pub const RULES_FILE_HEADER: &str = "rules_file";

pub const ENV_RULES_BUCKET: &str = "REDIRECTOR_RULES_BUCKET";
pub const ENV_RULES_FILE: &str = "REDIRECTOR_RULES_FILE";
pub const ENV_REFRESH_SECS: &str = "REDIRECTOR_REFRESH_SECS";

/// Errors that can occur while building a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid refresh interval {0:?}: expected whole seconds")]
    InvalidRefresh(String),
}

/// Location of the ruleset document in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesetSource {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectorConfig {
    pub source: RulesetSource,
    /// How long the fetch layer may reuse a fetched document
    pub refresh_interval: Duration,
}

impl RedirectorConfig {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            source: RulesetSource {
                bucket: bucket.into(),
                key: key.into(),
            },
            refresh_interval: Duration::from_secs(SEED_REFRESH_SECS),
        }
    }

    /// Build from the custom headers attached to the edge origin
    /// (`rules_bucket` and `rules_file`). Header names are case-insensitive.
    pub fn from_custom_headers(headers: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lookup = |name: &'static str| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(Self::new(lookup(RULES_BUCKET_HEADER)?, lookup(RULES_FILE_HEADER)?))
    }

    /// Build from `REDIRECTOR_RULES_BUCKET`, `REDIRECTOR_RULES_FILE` and the
    /// optional `REDIRECTOR_REFRESH_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup(ENV_RULES_BUCKET).ok_or(ConfigError::Missing(ENV_RULES_BUCKET))?;
        let key = lookup(ENV_RULES_FILE).ok_or(ConfigError::Missing(ENV_RULES_FILE))?;
        let mut config = Self::new(bucket, key);

        if let Some(raw) = lookup(ENV_REFRESH_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidRefresh(raw.clone()))?;
            config.refresh_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Adopt the refresh hint declared by a compiled ruleset, if any.
    pub fn with_ruleset_refresh(mut self, ruleset: &CompiledRuleset) -> Self {
        if let Some(interval) = ruleset.refresh_time() {
            self.refresh_interval = interval;
        }
        self
    }
}

/// A configuration paired with the ruleset compiled from its document.
#[derive(Debug, Clone)]
pub struct Redirector {
    config: RedirectorConfig,
    ruleset: CompiledRuleset,
}

impl Redirector {
    pub fn new(config: RedirectorConfig, ruleset: CompiledRuleset) -> Self {
        let config = config.with_ruleset_refresh(&ruleset);
        Self { config, ruleset }
    }

    /// Compile `document` for the given configuration.
    pub fn from_document(config: RedirectorConfig, document: &str) -> Result<Self, CompileError> {
        Ok(Self::new(config, compile_json(document)?))
    }

    pub fn config(&self) -> &RedirectorConfig {
        &self.config
    }

    pub fn ruleset(&self) -> &CompiledRuleset {
        &self.ruleset
    }

    pub fn decide(&self, fact: &RequestFact) -> Option<RedirectDecision> {
        self.ruleset.evaluate(fact)
    }
}

/// Compile `document` and evaluate `fact` against it, failing open.
///
/// A ruleset that does not compile yields no decision, so the request is
/// passed through rather than failed.
pub fn decide_fail_open(document: &str, fact: &RequestFact) -> Option<RedirectDecision> {
    match compile_json(document) {
        Ok(ruleset) => ruleset.evaluate(fact),
        Err(e) => {
            tracing::warn!(error = %e, uri = %fact.uri, "ruleset failed to compile, passing request through");
            None
        }
    }
}
