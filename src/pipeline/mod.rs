pub mod options;
pub mod pass;
pub mod timing;

use std::panic::{catch_unwind, AssertUnwindSafe};

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use rayon::prelude::*;

use crate::ast;
use crate::error::{panic_message, Diagnostic, PassError};
use options::Options;
use pass::{Pass, PassContext};
use timing::Timing;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct FileResult {
    pub path: String,
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
    pub timing: Timing,
    /// A parse failure or a failing tree pass cut the run short.
    pub failed: bool,
}

/// A file is held either as source text or as a parsed tree, never both.
enum Representation<'a> {
    Tree(Program<'a>),
    Text(String),
}

fn take<'a>(state: &mut Representation<'a>) -> Representation<'a> {
    std::mem::replace(state, Representation::Text(String::new()))
}

fn print_guarded(timing: &mut Timing, program: &Program<'_>) -> Result<String, String> {
    timing
        .measure("print", || catch_unwind(AssertUnwindSafe(|| ast::print(program))))
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn settle(
    pass: &'static str,
    outcome: std::thread::Result<anyhow::Result<()>>,
) -> Result<(), PassError> {
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(PassError::Failed { pass, source }),
        Err(payload) => Err(PassError::Panicked {
            pass,
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Runs `passes` over one file, converting between text and tree only when
/// the kind of the next pass requires it.
///
/// A file that cannot be parsed, or a tree pass that fails, stops the run
/// and returns the last text known to be good. A failing text pass is
/// logged and skipped.
pub fn run(source: &str, path: &str, passes: &[Pass], options: &Options) -> FileResult {
    let allocator = Allocator::default();
    let mut timing = Timing::default();
    let mut diagnostics = Vec::new();
    let mut failed = false;
    let mut last_text = source.to_string();
    let mut state = Representation::Text(source.to_string());

    for pass in passes {
        match pass {
            Pass::Tree(tree_pass) => {
                let mut program = match take(&mut state) {
                    Representation::Tree(program) => program,
                    Representation::Text(text) => {
                        let text = allocator.alloc_str(&text);
                        match timing.measure("parse", || ast::parse(&allocator, text)) {
                            Ok(program) => program,
                            Err(error) => {
                                let frame = error.code_frame(text);
                                tracing::error!(path, "failed to parse: {error}\n{frame}");
                                diagnostics.push(Diagnostic::error(None, format!("{error}\n{frame}")));
                                failed = true;
                                state = Representation::Text(text.to_string());
                                break;
                            }
                        }
                    }
                };

                let mut ctx = PassContext::new(&allocator, options, path, tree_pass.id());
                let outcome = timing.measure(tree_pass.id(), || {
                    catch_unwind(AssertUnwindSafe(|| tree_pass.transform(&mut ctx, &mut program)))
                });
                diagnostics.extend(ctx.into_diagnostics());

                match settle(tree_pass.id(), outcome) {
                    Ok(()) => {
                        tracing::debug!(path, pass = tree_pass.id(), "applied");
                        state = Representation::Tree(program);
                    }
                    Err(error) => {
                        tracing::error!(path, "{error}");
                        diagnostics.push(Diagnostic::error(Some(tree_pass.id()), error.to_string()));
                        failed = true;
                        state = Representation::Text(last_text.clone());
                        break;
                    }
                }
            }
            Pass::Text(text_pass) => {
                let text = match take(&mut state) {
                    Representation::Text(text) => text,
                    Representation::Tree(program) => match print_guarded(&mut timing, &program) {
                        Ok(text) => text,
                        Err(message) => {
                            tracing::error!(path, "failed to print: {message}");
                            diagnostics.push(Diagnostic::error(None, format!("failed to print: {message}")));
                            failed = true;
                            state = Representation::Text(source.to_string());
                            break;
                        }
                    },
                };

                let mut ctx = PassContext::new(&allocator, options, path, text_pass.id());
                let outcome = timing.measure(text_pass.id(), || {
                    catch_unwind(AssertUnwindSafe(|| text_pass.transform(&mut ctx, &text)))
                });
                diagnostics.extend(ctx.into_diagnostics());

                let text = match outcome {
                    Ok(Ok(Some(output))) => output,
                    Ok(Ok(None)) => text,
                    Ok(Err(source)) => {
                        let error = PassError::Failed { pass: text_pass.id(), source };
                        tracing::warn!(path, "{error}");
                        diagnostics.push(Diagnostic::error(Some(text_pass.id()), error.to_string()));
                        text
                    }
                    Err(payload) => {
                        let error = PassError::Panicked {
                            pass: text_pass.id(),
                            message: panic_message(payload.as_ref()),
                        };
                        tracing::warn!(path, "{error}");
                        diagnostics.push(Diagnostic::error(Some(text_pass.id()), error.to_string()));
                        text
                    }
                };
                last_text = text.clone();
                state = Representation::Text(text);
            }
        }
    }

    let code = match state {
        Representation::Text(text) => text,
        Representation::Tree(program) => match print_guarded(&mut timing, &program) {
            Ok(code) => code,
            Err(message) => {
                tracing::error!(path, "failed to print: {message}");
                diagnostics.push(Diagnostic::error(None, format!("failed to print: {message}")));
                failed = true;
                source.to_string()
            }
        },
    };

    FileResult {
        path: path.to_string(),
        code,
        diagnostics,
        timing,
        failed,
    }
}

/// Runs every file independently on the rayon pool. Results keep input order.
pub fn run_many(files: &[SourceFile], passes: &[Pass], options: &Options) -> Vec<FileResult> {
    files
        .par_iter()
        .map(|file| run(&file.source, &file.path, passes, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use oxc_ast::ast::{Expression, Program, Statement};

    use super::pass::{PassContext, TextPass, TreePass};
    use super::*;
    use crate::test_utils::normalize;

    struct Append(&'static str);

    impl TextPass for Append {
        fn id(&self) -> &'static str {
            "append"
        }

        fn transform(&self, _ctx: &mut PassContext<'_, '_>, source: &str) -> anyhow::Result<Option<String>> {
            Ok(Some(format!("{source}\n{}", self.0)))
        }
    }

    struct Broken;

    impl TextPass for Broken {
        fn id(&self) -> &'static str {
            "broken"
        }

        fn transform(&self, _ctx: &mut PassContext<'_, '_>, _source: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("nope")
        }
    }

    /// Renames every `a` reference to `b` without touching scoping.
    struct RenameA;

    impl TreePass for RenameA {
        fn id(&self) -> &'static str {
            "rename-a"
        }

        fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
            for stmt in program.body.iter_mut() {
                if let Statement::ExpressionStatement(expr_stmt) = stmt {
                    if let Expression::Identifier(ident) = &mut expr_stmt.expression {
                        if ident.name == "a" {
                            ident.name = ctx.ast.atom("b");
                        }
                    }
                }
            }
            Ok(())
        }
    }

    struct Panics;

    impl TreePass for Panics {
        fn id(&self) -> &'static str {
            "panics"
        }

        fn transform<'a>(&self, _ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
            program.body.clear();
            panic!("boom")
        }
    }

    #[test]
    fn test_mixed_passes_convert_lazily() {
        let passes = [
            Pass::tree(RenameA),
            Pass::text(Append("a;")),
            Pass::tree(RenameA),
        ];
        let result = run("a;", "input.js", &passes, &Options::default());
        assert!(!result.failed);
        assert_eq!(normalize(&result.code), normalize("b; b;"));

        let keys: Vec<&str> = result.timing.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys.iter().filter(|&&k| k == "parse").count(), 2);
        assert_eq!(keys.iter().filter(|&&k| k == "print").count(), 2);
    }

    #[test]
    fn test_text_pass_errors_are_skipped() {
        let passes = [Pass::text(Broken), Pass::text(Append("x;"))];
        let result = run("a;", "input.js", &passes, &Options::default());
        assert!(!result.failed);
        assert_eq!(result.code, "a;\nx;");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].pass.as_deref(), Some("broken"));
    }

    #[test]
    fn test_parse_failure_returns_last_good_text() {
        let passes = [Pass::text(Append("const = ;")), Pass::tree(RenameA), Pass::text(Append("y;"))];
        let result = run("a;", "input.js", &passes, &Options::default());
        assert!(result.failed);
        assert_eq!(result.code, "a;\nconst = ;");
        assert!(result.diagnostics[0].message.contains("|"));
    }

    #[test]
    fn test_tree_pass_panic_aborts_run() {
        let passes = [Pass::tree(Panics), Pass::tree(RenameA)];
        let result = run("a;", "input.js", &passes, &Options::default());
        assert!(result.failed);
        assert_eq!(result.code, "a;");
        assert!(result.diagnostics[0].message.contains("boom"));
    }

    #[test]
    fn test_run_many_keeps_order() {
        let files: Vec<SourceFile> = (0..8)
            .map(|i| SourceFile {
                path: format!("{i}.js"),
                source: format!("a; {i};"),
            })
            .collect();
        let results = run_many(&files, &[Pass::tree(RenameA)], &Options::default());
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.path, format!("{i}.js"));
            assert_eq!(normalize(&result.code), normalize(&format!("b; {i};")));
        }
    }
}
