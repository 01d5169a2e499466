use std::cell::Cell;

use oxc_allocator::Allocator;
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::walk_mut::walk_expression;
use oxc_ast_visit::VisitMut;
use oxc_semantic::ScopeFlags;
use oxc_syntax::scope::ScopeId;

use crate::ast::build;
use crate::ast::scope::ScopeTree;
use crate::pipeline::pass::{PassContext, TreePass};

/// `void 0` becomes `undefined` wherever `undefined` is not shadowed.
pub struct UnUndefined;

impl TreePass for UnUndefined {
    fn id(&self) -> &'static str {
        "un-undefined"
    }

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        let scope = ScopeTree::build(program);
        VoidZero::new(ctx.allocator, &scope).visit_program(program);
        Ok(())
    }
}

pub struct VoidZero<'s, 'a> {
    ast: AstBuilder<'a>,
    scope: &'s ScopeTree,
    scopes: Vec<ScopeId>,
}

impl<'s, 'a> VoidZero<'s, 'a> {
    pub fn new(allocator: &'a Allocator, scope: &'s ScopeTree) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
            scope,
            scopes: Vec::new(),
        }
    }

    fn undefined_is_shadowed(&self) -> bool {
        let current = self.scopes.last().copied().unwrap_or_else(|| self.scope.root_scope());
        self.scope.is_declared(current, "undefined")
    }
}

impl<'a> VisitMut<'a> for VoidZero<'_, 'a> {
    fn enter_scope(&mut self, _flags: ScopeFlags, scope_id: &Cell<Option<ScopeId>>) {
        if let Some(scope_id) = scope_id.get() {
            self.scopes.push(scope_id);
        }
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    fn visit_expression(&mut self, node: &mut Expression<'a>) {
        if let Expression::UnaryExpression(unary) = node {
            if unary.operator == UnaryOperator::Void
                && matches!(unary.argument, Expression::NumericLiteral(_))
                && !self.undefined_is_shadowed()
            {
                let span = unary.span;
                *node = build::identifier(&self.ast, span, "undefined");
                return;
            }
        }

        walk_expression(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pass::Pass;
    use crate::test_utils::assert_transform;

    #[test]
    fn test_void_zero() {
        assert_transform(
            Pass::tree(UnUndefined),
            "if (a === void 0) b = void 0;",
            "if (a === undefined) b = undefined;",
        );
    }

    #[test]
    fn test_shadowed_undefined() {
        assert_transform(
            Pass::tree(UnUndefined),
            "function f(undefined) { return void 0; } g(void 0);",
            "function f(undefined) { return void 0; } g(undefined);",
        );
    }
}
