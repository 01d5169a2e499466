use oxc_allocator::{Allocator, TakeIn};
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::walk_mut::walk_statement;
use oxc_ast_visit::VisitMut;

use crate::pipeline::pass::{PassContext, TreePass};

/// `for (;;)` and `for (; cond;)` become `while` loops.
pub struct UnWhileLoop;

impl TreePass for UnWhileLoop {
    fn id(&self) -> &'static str {
        "un-while-loop"
    }

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        WhileLoops::new(ctx.allocator).visit_program(program);
        Ok(())
    }
}

pub struct WhileLoops<'a> {
    ast: AstBuilder<'a>,
}

impl<'a> WhileLoops<'a> {
    pub fn new(allocator: &'a Allocator) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
        }
    }
}

impl<'a> VisitMut<'a> for WhileLoops<'a> {
    fn visit_statement(&mut self, node: &mut Statement<'a>) {
        if let Statement::ForStatement(for_stmt) = node {
            if for_stmt.init.is_none() && for_stmt.update.is_none() {
                let span = for_stmt.span;
                let test = match for_stmt.test.as_mut() {
                    Some(test) => test.take_in(self.ast.allocator),
                    None => self.ast.expression_boolean_literal(span, true),
                };
                let body = for_stmt.body.take_in(self.ast.allocator);
                *node = Statement::WhileStatement(self.ast.alloc(WhileStatement { span, test, body }));
            }
        }

        walk_statement(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pass::Pass;
    use crate::test_utils::assert_transform;

    #[test]
    fn test_for_to_while() {
        assert_transform(Pass::tree(UnWhileLoop), "for (;;) { a(); }", "while (true) { a(); }");
        assert_transform(
            Pass::tree(UnWhileLoop),
            "for (; i < 3;) { for (;;) break; }",
            "while (i < 3) { while (true) break; }",
        );
        assert_transform(
            Pass::tree(UnWhileLoop),
            "for (let i = 0; ;) {}",
            "for (let i = 0; ;) {}",
        );
    }
}
