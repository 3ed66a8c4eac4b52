//! Storage size benchmark: JSON vs RON vs packed ruleset documents.
//!
//! Run with: cargo test bench_compression -- --nocapture

use crate::compiler::compile;
use crate::evaluator::RequestFact;
use crate::loader::decompress_ruleset;
use crate::types::{RuleSpec, Ruleset};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

/// Generate a ruleset with `num_rules` entries spread over all categories.
fn generate_test_ruleset(num_rules: usize) -> Ruleset {
    let mut ruleset = Ruleset::seed();

    for i in 0..num_rules {
        match i % 4 {
            0 | 1 => ruleset.rules.push(
                RuleSpec::new(format!("/section{}/page{}.html", i % 10, i), format!("/new/page{}.html", i))
                    .with_window(Some("2021-07-09T07:16:00.000Z"), Some("2022-07-13T07:16:00.000Z")),
            ),
            2 => ruleset.wildcards.push(
                RuleSpec::new(format!("/legacy{}/*", i), format!("/archive{}/*", i)).with_status_code(302),
            ),
            _ => ruleset.querystrings.push(RuleSpec::new(format!("campaign={}&src=mail", i), "/landing.html")),
        }
    }

    ruleset
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn bench_compression_sizes() {
    println!("\n{:>8} {:>10} {:>10} {:>12} {:>12}", "rules", "json", "ron", "json+gzip", "packed b64");

    for &size in &[10, 100, 1000] {
        let ruleset = generate_test_ruleset(size);
        let json = ruleset.to_json().unwrap();
        let ron = ruleset.to_ron().unwrap();
        let gz = gzip(json.as_bytes());
        let packed = BASE64.encode(&gz);

        println!("{:>8} {:>10} {:>10} {:>12} {:>12}", size, json.len(), ron.len(), gz.len(), packed.len());

        assert!(gz.len() < json.len());
        assert_eq!(decompress_ruleset(&packed).unwrap(), ruleset);
    }
}

#[test]
fn bench_large_ruleset_last_entry_reachable() {
    let ruleset = generate_test_ruleset(1000);
    let compiled = compile(&ruleset).unwrap();
    assert_eq!(compiled.len(), 1000);

    // Entry 999 is the last querystring rule and is tested after every other predicate.
    let fact = RequestFact::new("/nowhere", "campaign=999&src=mail");
    let decision = compiled.evaluate(&fact).unwrap();
    assert_eq!(decision.location, "/landing.html");
}
