use oxc_allocator::Allocator;

use crate::ast::{parse, print};
use crate::pipeline::{self, options::Options, pass::Pass};

/// Reprints `code` through the parser and drops all whitespace so that
/// formatting differences do not matter when comparing outputs.
pub fn normalize(code: &str) -> String {
    let allocator = Allocator::default();
    let source = allocator.alloc_str(code);
    let printed = match parse(&allocator, source) {
        Ok(program) => print(&program),
        Err(_) => code.to_string(),
    };
    printed.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn run_pass(pass: Pass, input: &str) -> String {
    run_pass_with(pass, input, &Options::default())
}

pub fn run_pass_with(pass: Pass, input: &str, options: &Options) -> String {
    let result = pipeline::run(input, "test.js", &[pass], options);
    assert!(!result.failed, "pass failed: {:?}", result.diagnostics);
    result.code
}

#[track_caller]
pub fn assert_transform(pass: Pass, input: &str, expected: &str) {
    let output = run_pass(pass, input);
    assert_eq!(normalize(&output), normalize(expected), "\noutput:\n{output}");
}

#[track_caller]
pub fn assert_transform_with(pass: Pass, options: &Options, input: &str, expected: &str) {
    let output = run_pass_with(pass, input, options);
    assert_eq!(normalize(&output), normalize(expected), "\noutput:\n{output}");
}
