pub mod build;
pub mod comments;
pub mod identifier;
pub mod matchers;
pub mod rename;
pub mod scope;

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::error::ParseError;

/// Parses `source` as an ES module with JSX enabled, falling back to a
/// classic script when module goal rejects it (legacy bundles often do).
pub fn parse<'a>(allocator: &'a Allocator, source: &'a str) -> Result<Program<'a>, ParseError> {
    let module_type = SourceType::mjs().with_jsx(true);
    let parsed = Parser::new(allocator, source, module_type).parse();
    if !parsed.panicked && parsed.errors.is_empty() {
        return Ok(parsed.program);
    }

    let script_type = SourceType::cjs().with_jsx(true);
    let fallback = Parser::new(allocator, source, script_type).parse();
    if !fallback.panicked && fallback.errors.is_empty() {
        return Ok(fallback.program);
    }

    let error = match parsed.errors.first() {
        Some(diagnostic) => {
            let offset = diagnostic
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map_or(0, |label| label.offset());
            ParseError::at_offset(source, offset, diagnostic.message.to_string())
        }
        None => ParseError::at_offset(source, 0, "parser gave up"),
    };
    Err(error)
}

pub fn print(program: &Program<'_>) -> String {
    Codegen::new().build(program).code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_and_jsx() {
        let allocator = Allocator::default();
        let program = parse(&allocator, "import a from 'a';\nconst b = <div>{a}</div>;").unwrap();
        assert_eq!(program.body.len(), 2);
        assert!(print(&program).contains("<div>"));
    }

    #[test]
    fn test_parse_sloppy_script_fallback() {
        let allocator = Allocator::default();
        let program = parse(&allocator, "with (a) { b = 010; }").unwrap();
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_parse_error_location() {
        let allocator = Allocator::default();
        let error = parse(&allocator, "const a = 1;\nconst = 2;").unwrap_err();
        assert_eq!(error.line, 2);
    }
}
