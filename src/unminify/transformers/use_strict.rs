use oxc_allocator::Vec;
use oxc_ast::ast::*;
use oxc_ast_visit::walk_mut::walk_function_body;
use oxc_ast_visit::VisitMut;
use oxc_span::GetSpan;

use crate::ast::comments::CommentMoves;
use crate::pipeline::pass::{PassContext, TreePass};

/// Drops `'use strict'` directives. Modules are strict anyway and bundlers
/// repeat the directive in every wrapped module.
pub struct UnUseStrict;

impl TreePass for UnUseStrict {
    fn id(&self) -> &'static str {
        "un-use-strict"
    }

    fn transform<'a>(&self, _ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        let mut remover = DirectiveRemover::default();
        remover.strip(&mut program.directives, &program.body);
        remover.visit_program(program);
        remover.comments.apply(&mut program.comments);
        Ok(())
    }
}

#[derive(Default)]
struct DirectiveRemover {
    comments: CommentMoves,
}

impl DirectiveRemover {
    /// Removes strict directives, handing their leading comments to the node
    /// that follows each one.
    fn strip<'a>(&mut self, directives: &mut Vec<'a, Directive<'a>>, body: &[Statement<'a>]) {
        if !directives.iter().any(is_use_strict) {
            return;
        }
        let first_statement = body.first().map(|stmt| stmt.span().start);
        for (index, directive) in directives.iter().enumerate() {
            if !is_use_strict(directive) {
                continue;
            }
            let next = directives.get(index + 1).map(|next| next.span.start).or(first_statement);
            if let Some(next) = next {
                self.comments.push(directive.span.start, next);
            }
        }
        directives.retain(|directive| !is_use_strict(directive));
    }
}

fn is_use_strict(directive: &Directive<'_>) -> bool {
    directive.expression.value == "use strict"
}

impl<'a> VisitMut<'a> for DirectiveRemover {
    fn visit_function_body(&mut self, body: &mut FunctionBody<'a>) {
        self.strip(&mut body.directives, &body.statements);
        walk_function_body(self, body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pass::Pass;
    use crate::test_utils::{assert_transform, run_pass};

    #[test]
    fn test_removes_directives() {
        assert_transform(Pass::tree(UnUseStrict), "'use strict'\nfoo();", "foo();");
        assert_transform(Pass::tree(UnUseStrict), "\"use strict\";var a=1;", "var a = 1;");
        assert_transform(
            Pass::tree(UnUseStrict),
            "function foo(str) {\n  'use strict'\n  return str === 'use strict'\n}",
            "function foo(str) {\n  return str === 'use strict'\n}",
        );
        assert_transform(
            Pass::tree(UnUseStrict),
            "const f = () => { 'use strict'; 'use asm'; return 1 };",
            "const f = () => { 'use asm'; return 1 };",
        );
    }

    #[test]
    fn test_keeps_string_values() {
        let input = "const a = ['use strict'];\nf('use strict');";
        assert_transform(Pass::tree(UnUseStrict), input, input);
    }

    #[test]
    fn test_keeps_strings_and_templates_containing_directive_text() {
        let input = "const s = \"a;'use strict';b\";";
        assert_transform(Pass::tree(UnUseStrict), input, input);

        let input = "const t = `\n'use strict'\n`;";
        assert_transform(Pass::tree(UnUseStrict), input, input);
    }

    #[test]
    fn test_directive_comment_moves_to_next_statement() {
        let output = run_pass(Pass::tree(UnUseStrict), "// header\n'use strict';\nfoo();");
        assert!(output.contains("// header"), "{output}");
        assert!(!output.contains("use strict"), "{output}");
    }
}
