//! Ruleset loader with compression support.
//!
//! Decodes the ruleset document in whichever form the fetch layer hands it
//! over: plain JSON, `raw:` + base64(JSON), base64(gzip(JSON)), or the deploy
//! envelope wrapping one of the packed forms.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::io::Read;

use crate::compiler::{compile, CompileError, CompiledRuleset};
use crate::types::Ruleset;

/// Envelope written by the deploy step.
#[derive(Debug, Deserialize)]
pub struct RulesetPayload {
    pub version: String,
    #[serde(rename = "deployedAt")]
    pub deployed_at: String,
    pub rules_packed: String,
}

/// Errors that can occur while loading a ruleset.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Gzip decompression error: {0}")]
    DecompressError(#[from] std::io::Error),

    /// The deploy envelope itself is not valid JSON
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Empty rules_packed in payload")]
    EmptyRules,

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Decompresses and parses a packed ruleset.
///
/// Expected encoding: base64(gzip(JSON)) or "raw:" + base64(JSON).
/// A value that already starts with `{` is taken as plain JSON.
pub fn decompress_ruleset(packed: &str) -> Result<Ruleset, LoadError> {
    let packed = packed.trim();

    let json = if packed.starts_with('{') {
        packed.to_string()
    } else if let Some(b64) = packed.strip_prefix("raw:") {
        // Uncompressed fallback format
        let bytes = BASE64.decode(b64)?;
        String::from_utf8(bytes).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
    } else {
        // Compressed format: base64(gzip(json))
        let compressed = BASE64.decode(packed)?;
        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut json = String::new();
        decoder.read_to_string(&mut json)?;
        json
    };

    let ruleset = Ruleset::from_json(&json).map_err(CompileError::MalformedDocument)?;
    tracing::debug!(
        rules = ruleset.rules.len(),
        wildcards = ruleset.wildcards.len(),
        querystrings = ruleset.querystrings.len(),
        "decoded ruleset document"
    );

    Ok(ruleset)
}

/// Parses the deploy envelope and decodes the ruleset inside it.
pub fn load_ruleset_payload(payload_json: &str) -> Result<Ruleset, LoadError> {
    let payload: RulesetPayload = serde_json::from_str(payload_json)?;
    tracing::info!(version = %payload.version, deployed_at = %payload.deployed_at, "loading ruleset payload");

    if payload.rules_packed.is_empty() {
        return Err(LoadError::EmptyRules);
    }

    decompress_ruleset(&payload.rules_packed)
}

/// Decode and compile in one step.
pub fn load_compiled(packed: &str) -> Result<CompiledRuleset, LoadError> {
    let ruleset = decompress_ruleset(packed)?;
    Ok(compile(&ruleset)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RequestFact;

    const RULESET_JSON: &str = r#"{"rules":[{"original":"/old","redirect":"/new"}],"wildcards":[{"original":"/blog/*","redirect":"/posts/*"}],"querystrings":[],"refreshTime":"30"}"#;

    fn gzip_base64(json: &str) -> String {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        BASE64.encode(&compressed)
    }

    #[test]
    fn test_decompress_ruleset_plain_json() {
        let ruleset = decompress_ruleset(RULESET_JSON).unwrap();
        assert_eq!(ruleset.rules.len(), 1);
        assert_eq!(ruleset.wildcards.len(), 1);
        assert_eq!(ruleset.refresh_time, Some(30));
    }

    #[test]
    fn test_decompress_ruleset_raw_format() {
        let encoded = format!("raw:{}", BASE64.encode(RULESET_JSON));

        let ruleset = decompress_ruleset(&encoded).unwrap();
        assert_eq!(ruleset.rules[0].origin, "/old");
        assert_eq!(ruleset.wildcards[0].destination, "/posts/*");
    }

    #[test]
    fn test_decompress_gzip_format() {
        let ruleset = decompress_ruleset(&gzip_base64(RULESET_JSON)).unwrap();
        assert_eq!(ruleset.len(), 2);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let result = decompress_ruleset("raw:%%%not-base64%%%");
        assert!(matches!(result, Err(LoadError::Base64Error(_))));
    }

    #[test]
    fn test_non_gzip_bytes_rejected() {
        let encoded = BASE64.encode(b"definitely not gzip");
        assert!(matches!(decompress_ruleset(&encoded), Err(LoadError::DecompressError(_))));
    }

    #[test]
    fn test_malformed_entry_rejected() {
        let encoded = format!("raw:{}", BASE64.encode(r#"{"rules":[{"redirect":"/x"}]}"#));
        assert!(matches!(
            decompress_ruleset(&encoded),
            Err(LoadError::Compile(CompileError::MalformedDocument(_)))
        ));
    }

    #[test]
    fn test_malformed_entry_same_error_on_plain_json() {
        let result = load_compiled(r#"{"rules":[{"original":"/a"}]}"#);
        assert!(matches!(result, Err(LoadError::Compile(CompileError::MalformedDocument(_)))));
    }

    #[test]
    fn test_invalid_envelope_is_json_error() {
        assert!(matches!(load_ruleset_payload("{not json"), Err(LoadError::JsonError(_))));
    }

    #[test]
    fn test_load_ruleset_payload() {
        let payload = serde_json::json!({
            "version": "7",
            "deployedAt": "2021-07-09T07:16:00.000Z",
            "rules_packed": gzip_base64(RULESET_JSON),
        });

        let ruleset = load_ruleset_payload(&payload.to_string()).unwrap();
        assert_eq!(ruleset.rules.len(), 1);
    }

    #[test]
    fn test_empty_payload_rejected() {
        let payload = r#"{"version": "1", "deployedAt": "now", "rules_packed": ""}"#;
        assert!(matches!(load_ruleset_payload(payload), Err(LoadError::EmptyRules)));
    }

    #[test]
    fn test_load_compiled_evaluates() {
        let compiled = load_compiled(&gzip_base64(RULESET_JSON)).unwrap();
        let decision = compiled.evaluate(&RequestFact::new("/blog/2021/hello", "")).unwrap();
        assert_eq!(decision.location, "/posts/2021/hello");
    }

    #[test]
    fn test_load_compiled_bad_timestamp() {
        let json = r#"{"rules":[{"original":"/a","redirect":"/b","startTime":"tomorrow"}]}"#;
        let result = load_compiled(json);
        assert!(matches!(result, Err(LoadError::Compile(CompileError::MalformedTimestamp { .. }))));
    }
}
