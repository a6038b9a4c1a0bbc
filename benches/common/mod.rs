#![allow(dead_code)]
use std::path::Path;

use minipas::ast::Program;
use minipas::parser;
use test_support::load_cases;

/// Fixture programs flagged for benchmarking, as `(name, source)` pairs.
pub fn workloads() -> Vec<(String, String)> {
    load_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load cases: {err:#}"))
        .into_iter()
        .filter(|case| case.spec.bench.enabled)
        .map(|case| {
            let source = case
                .source()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}

pub fn load_program(name: &str, source: &str) -> Program {
    parser::parse(source).unwrap_or_else(|err| panic!("parse {name}: {err}"))
}
