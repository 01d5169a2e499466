use oxc_allocator::Allocator;

use unmangle::pipeline::pass::Pass;
use unmangle::pipeline::{run, run_many, SourceFile};
use unmangle::unminify::transformers::{indirect_call::UnIndirectCall, jsx::UnJsx, smart_inline::SmartInline};
use unmangle::unminify::unminify;
use unmangle::{unpack, ModuleId, Options, UnpackError};

fn normalize(code: &str) -> String {
    let allocator = Allocator::default();
    let printed = match unmangle::ast::parse(&allocator, code) {
        Ok(program) => unmangle::ast::print(&program),
        Err(_) => code.to_string(),
    };
    printed.chars().filter(|c| !c.is_whitespace()).collect()
}

#[track_caller]
fn assert_pass(pass: Pass, input: &str, expected: &str) {
    let result = run(input, "scenario.js", &[pass], &Options::default());
    assert!(!result.failed, "{:?}", result.diagnostics);
    assert_eq!(normalize(&result.code), normalize(expected), "\noutput:\n{}", result.code);
}

#[test]
fn alias_chain() {
    assert_pass(Pass::tree(SmartInline), "const t = e; const n = t;", "const n = e;");
}

#[test]
fn destructuring_with_conflict() {
    assert_pass(
        Pass::tree(SmartInline),
        r#"
const t = e.size;
const n = e.color;
const r = f.size;
const a = f.color;
render(t, n);
render(r, a);
"#,
        r#"
const { size, color } = e;
const { size: size_1, color: color_1 } = f;
render(size, color);
render(size_1, color_1);
"#,
    );
}

#[test]
fn indirect_call_via_require() {
    assert_pass(
        Pass::tree(UnIndirectCall),
        r#"const s = require("react"); (0, s.useRef)(0);"#,
        r#"const s = require("react"); const { useRef } = s; useRef(0);"#,
    );
}

#[test]
fn classic_element_without_props() {
    assert_pass(
        Pass::tree(UnJsx),
        r#"const el = React.createElement("div", null);"#,
        "const el = <div />;",
    );
}

#[test]
fn automatic_element_with_key_and_children() {
    assert_pass(
        Pass::tree(UnJsx),
        r#"const el = jsx(Button, { children: "Hello" }, "k");"#,
        r#"const el = <Button key="k">Hello</Button>;"#,
    );
}

#[test]
fn unrecognized_bundle() {
    let error = unpack("const a = 1;\nconsole.log(a);\n").unwrap_err();
    assert!(matches!(error, UnpackError::UnrecognizedBundleFormat));
}

#[test]
fn parse_error_keeps_source_and_reports_location() {
    let source = "const a = 1;\nconst = 2;\n";
    let result = unminify(source, "broken.js", &Options::default());
    assert!(result.failed);
    assert_eq!(result.code, source);
    assert!(result.diagnostics[0].message.contains("2 |"));
}

#[test]
fn bad_file_does_not_stop_the_batch() {
    let files = vec![
        SourceFile {
            path: "bad.js".to_string(),
            source: "const = ;".to_string(),
        },
        SourceFile {
            path: "good.js".to_string(),
            source: "for (;;) { a(), b(); }".to_string(),
        },
    ];
    let passes = unmangle::unminify::default_passes();
    let results = run_many(&files, &passes, &Options::default());

    assert!(results[0].failed);
    assert!(!results[1].failed);
    assert_eq!(normalize(&results[1].code), normalize("while (true) { a(); b(); }"));
}

#[test]
fn unpack_then_unminify() {
    let bundle = r#"!function(e){function n(r){var o={exports:{}};return e[r].call(o.exports,o,o.exports,n),o.exports}n(n.s=0)}([function(e,t,n){"use strict";var r=n(1),a=r.title;console.log(void 0===a?"none":a)},function(e,t){e.exports={title:"hi"}}]);"#;
    let unpacked = unpack(bundle).unwrap();
    assert_eq!(unpacked.modules.len(), 2);
    assert_eq!(unpacked.entries().map(|module| module.id.clone()).collect::<Vec<_>>(), vec![ModuleId::Number(0)]);

    let entry = &unpacked.modules[0];
    let result = unminify(&entry.code, &unpacked.filename(&entry.id), &Options::default());
    assert!(!result.failed);
    assert!(!result.code.contains("use strict"));
    assert!(result.code.contains("require(1)"));
    assert!(result.code.contains("undefined"));
}
