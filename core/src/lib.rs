//! # Redirector Core
//!
//! Redirect rule compiler and evaluator for edge request handlers.
//!
//! A ruleset document declares redirects in three categories, evaluated in
//! this fixed order:
//! - **rules** match the request URI exactly
//! - **wildcards** match the URI against a pattern where `*` is any run of
//!   characters; captured text can be substituted into the destination
//! - **querystrings** match the raw querystring exactly
//!
//! Every entry may be limited to an inclusive validity window. The first
//! entry whose window and criterion both hold decides the redirect.
//!
//! ## Example
//!
//! ```text
//! Ruleset ──► compile ──► CompiledRuleset ──► evaluate(RequestFact) ──► Option<RedirectDecision>
//! ```
//!
//! ## Modules
//!
//! - `types` - Ruleset document types
//! - `wildcard` - Wildcard pattern translation
//! - `compiler` - Ruleset to ordered predicate list
//! - `evaluator` - Request fact evaluation
//! - `render` - Destination rendering for wildcard captures
//! - `loader` - Packed document decoding
//! - `config` - Configuration and fail-open facade
//! - `wasm` - WebAssembly bindings for JavaScript

mod compiler;
mod config;
mod evaluator;
mod loader;
mod render;
mod types;
mod wildcard;
pub mod wasm;

#[cfg(test)]
mod bench_compression;

pub use compiler::*;
pub use config::*;
pub use evaluator::*;
pub use loader::*;
pub use render::*;
pub use types::*;
pub use wildcard::*;
