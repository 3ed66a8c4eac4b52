//! WASM bindings for redirector-core.
//!
//! Lets the rule editor compile a ruleset and preview redirect decisions in
//! the browser with exactly the same engine that runs at the edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::{compile, parse_timestamp, CompiledRuleset, RequestFact, RedirectDecision, RuleCategory, Ruleset};

// ═══════════════════════════════════════════════════════════════════════════
// Ruleset API
// ═══════════════════════════════════════════════════════════════════════════

/// A ruleset document together with its compiled predicates.
#[wasm_bindgen]
pub struct WasmRuleset {
    document: Ruleset,
    compiled: CompiledRuleset,
}

impl WasmRuleset {
    fn from_document(document: Ruleset) -> Result<WasmRuleset, JsError> {
        let compiled = compile(&document).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(WasmRuleset { document, compiled })
    }
}

#[wasm_bindgen]
impl WasmRuleset {
    /// Create an empty ruleset (the provisioning seed document).
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmRuleset {
        WasmRuleset {
            document: Ruleset::seed(),
            compiled: CompiledRuleset::default(),
        }
    }

    /// Load and compile a ruleset from JSON.
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str) -> Result<WasmRuleset, JsError> {
        let document = Ruleset::from_json(json).map_err(|e| JsError::new(&e.to_string()))?;
        Self::from_document(document)
    }

    /// Load and compile a ruleset from RON format.
    #[wasm_bindgen(js_name = fromRon)]
    pub fn from_ron(ron: &str) -> Result<WasmRuleset, JsError> {
        let document = Ruleset::from_ron(ron).map_err(|e| JsError::new(&e.to_string()))?;
        Self::from_document(document)
    }

    /// Serialize the document to JSON.
    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsError> {
        serde_json::to_string_pretty(&self.document).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Serialize the document to RON format.
    #[wasm_bindgen(js_name = toRon)]
    pub fn to_ron(&self) -> Result<String, JsError> {
        self.document.to_ron().map_err(|e| JsError::new(&e.to_string()))
    }

    /// Number of compiled predicates.
    #[wasm_bindgen(getter)]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// Get the compiled predicates in evaluation order as JSON array.
    #[wasm_bindgen(js_name = getPredicates)]
    pub fn get_predicates(&self) -> Result<String, JsError> {
        let predicates: Vec<_> = self
            .compiled
            .iter()
            .map(|p| PredicateJson {
                category: p.category(),
                origin: p.record.origin.clone(),
                destination: p.record.destination.clone(),
                status_code: p.record.status_code,
                start: (p.window.start != DateTime::<Utc>::MIN_UTC).then(|| p.window.start.to_rfc3339()),
                end: (p.window.end != DateTime::<Utc>::MAX_UTC).then(|| p.window.end.to_rfc3339()),
            })
            .collect();
        serde_json::to_string(&predicates).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmRuleset {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Evaluation API
// ═══════════════════════════════════════════════════════════════════════════

/// Evaluate a ruleset against a request for preview/testing.
/// request_json: `{"uri": "...", "querystring": "...", "evaluatedAt": "..."}`;
/// `evaluatedAt` defaults to now.
#[wasm_bindgen(js_name = evaluateRequest)]
pub fn evaluate_request(ruleset: &WasmRuleset, request_json: &str) -> Result<String, JsError> {
    let request: RequestFactJson = serde_json::from_str(request_json)
        .map_err(|e| JsError::new(&format!("Invalid request JSON: {}", e)))?;
    let fact = request.into_fact().map_err(|e| JsError::new(&e))?;

    let result = DecisionJson::from(ruleset.compiled.evaluate(&fact));
    serde_json::to_string(&result).map_err(|e| JsError::new(&e.to_string()))
}

/// Validate a ruleset document without keeping it.
/// Returns `null` when it compiles, otherwise the error message.
#[wasm_bindgen(js_name = validateRuleset)]
pub fn validate_ruleset(json: &str) -> Option<String> {
    match Ruleset::from_json(json) {
        Ok(document) => compile(&document).err().map(|e| e.to_string()),
        Err(e) => Some(e.to_string()),
    }
}

/// The document sections in evaluation order as JSON array.
#[wasm_bindgen(js_name = getCategories)]
pub fn get_categories() -> String {
    let categories: Vec<_> = [RuleCategory::Exact, RuleCategory::Wildcard, RuleCategory::Querystring]
        .iter()
        .map(|c| serde_json::json!({
            "value": c,
            "section": c.section(),
        }))
        .collect();
    serde_json::Value::Array(categories).to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct RequestFactJson {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    querystring: String,
    #[serde(rename = "evaluatedAt", default)]
    evaluated_at: Option<String>,
}

impl RequestFactJson {
    fn into_fact(self) -> Result<RequestFact, String> {
        match self.evaluated_at {
            Some(ts) => {
                let at = parse_timestamp(&ts).map_err(|e| format!("Invalid evaluatedAt {:?}: {}", ts, e))?;
                Ok(RequestFact::at(self.uri, self.querystring, at))
            }
            None => Ok(RequestFact::new(self.uri, self.querystring)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct PredicateJson {
    category: RuleCategory,
    origin: String,
    destination: String,
    #[serde(rename = "statusCode")]
    status_code: u16,
    /// `null` when unbounded
    start: Option<String>,
    end: Option<String>,
}

// JSON-friendly decision: pass-through is an explicit variant
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum DecisionJson {
    Pass,
    Redirect {
        #[serde(rename = "statusCode")]
        status_code: u16,
        location: String,
    },
}

impl From<Option<RedirectDecision>> for DecisionJson {
    fn from(decision: Option<RedirectDecision>) -> Self {
        match decision {
            Some(RedirectDecision { status_code, location }) => DecisionJson::Redirect { status_code, location },
            None => DecisionJson::Pass,
        }
    }
}
