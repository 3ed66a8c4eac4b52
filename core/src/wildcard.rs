//! Wildcard pattern translation.
//!
//! Origin patterns are literal text with `*` wildcards. Each pattern is
//! compiled once into an anchored regular expression with one capture group
//! per wildcard, so matching and capture extraction happen in a single pass.

use regex::Regex;

/// The wildcard character in origin patterns and destination templates.
pub const WILDCARD: char = '*';

/// A compiled origin pattern.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    pattern: String,
    regex: Regex,
    wildcards: usize,
}

impl WildcardPattern {
    /// Translate a wildcard pattern into a matcher.
    ///
    /// Every character other than `*` matches only itself (`.` included).
    /// Each `*` matches any run of characters, including the empty run.
    pub fn translate(pattern: &str) -> Result<Self, regex::Error> {
        let mut source = String::with_capacity(pattern.len() + 16);
        source.push_str("(?s)^");

        let mut wildcards = 0;
        for (i, literal) in pattern.split(WILDCARD).enumerate() {
            if i > 0 {
                source.push_str("(.*)");
                wildcards += 1;
            }
            source.push_str(&regex::escape(literal));
        }
        source.push('$');

        let regex = Regex::new(&source)?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            wildcards,
        })
    }

    /// The pattern as written in the ruleset.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// The generated regular expression source.
    pub fn regex_source(&self) -> &str {
        self.regex.as_str()
    }

    /// Number of `*` occurrences in the pattern.
    pub fn wildcard_count(&self) -> usize {
        self.wildcards
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// Match `candidate` and return the text captured by each wildcard,
    /// left to right. `None` when the candidate does not match.
    ///
    /// With several wildcards the leftmost one takes the longest run that
    /// still lets the rest of the pattern match.
    pub fn captures<'t>(&self, candidate: &'t str) -> Option<Vec<&'t str>> {
        let caps = self.regex.captures(candidate)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or("", |m| m.as_str()))
                .collect(),
        )
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for WildcardPattern {}
