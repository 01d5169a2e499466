use oxc_allocator::{Allocator, TakeIn, Vec};
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::walk_mut::walk_statements;
use oxc_ast_visit::VisitMut;
use oxc_span::{GetSpan, Span};

use crate::pipeline::pass::{PassContext, TreePass};

/// Splits comma sequences in statement position into one statement per
/// element: `a(), b(), c()` becomes three statements, `return a(), b`
/// becomes `a(); return b;`.
pub struct UnSequenceExpression;

impl TreePass for UnSequenceExpression {
    fn id(&self) -> &'static str {
        "un-sequence-expression"
    }

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        SequenceExpressions::new(ctx.allocator).visit_program(program);
        Ok(())
    }
}

pub struct SequenceExpressions<'a> {
    ast: AstBuilder<'a>,
}

impl<'a> SequenceExpressions<'a> {
    pub fn new(allocator: &'a Allocator) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
        }
    }

    fn expression_statement(&self, span: Span, expression: Expression<'a>) -> Statement<'a> {
        Statement::ExpressionStatement(self.ast.alloc(ExpressionStatement { span, expression }))
    }

    /// Emits every element but the last as its own statement and returns the
    /// last one. The first emitted statement takes `span` so comments stay put.
    fn split(
        &self,
        seq_expr: &mut SequenceExpression<'a>,
        span: Span,
        out: &mut Vec<'a, Statement<'a>>,
    ) -> Expression<'a> {
        let len = seq_expr.expressions.len();
        let mut last = None;
        for (i, expr) in seq_expr.expressions.iter_mut().enumerate() {
            if i == len - 1 {
                last = Some(expr.take_in(self.ast.allocator));
            } else {
                let stmt_span = if i == 0 { span } else { expr.span() };
                out.push(self.expression_statement(stmt_span, expr.take_in(self.ast.allocator)));
            }
        }
        last.unwrap_or_else(|| self.ast.expression_null_literal(span))
    }
}

fn sequence_mut<'b, 'a>(expr: &'b mut Expression<'a>) -> Option<&'b mut SequenceExpression<'a>> {
    match expr.get_inner_expression_mut() {
        Expression::SequenceExpression(seq_expr) if seq_expr.expressions.len() > 1 => Some(seq_expr),
        _ => None,
    }
}

impl<'a> VisitMut<'a> for SequenceExpressions<'a> {
    fn visit_statements(&mut self, node: &mut Vec<'a, Statement<'a>>) {
        let mut new_stmts: Vec<'_, Statement<'a>> = self.ast.vec();

        for stmt in node.iter_mut() {
            match stmt {
                Statement::ExpressionStatement(expr_stmt) => {
                    let span = expr_stmt.span;
                    if let Some(seq_expr) = sequence_mut(&mut expr_stmt.expression) {
                        let last = self.split(seq_expr, span, &mut new_stmts);
                        let last_span = last.span();
                        new_stmts.push(self.expression_statement(last_span, last));
                        continue;
                    }

                    // `x = (a, b)` -> `a; x = b;`, identifiers only so no
                    // member object is evaluated out of order.
                    if let Expression::AssignmentExpression(assign_expr) =
                        expr_stmt.expression.get_inner_expression_mut()
                    {
                        if matches!(assign_expr.left, AssignmentTarget::AssignmentTargetIdentifier(_)) {
                            if let Some(seq_expr) = sequence_mut(&mut assign_expr.right) {
                                let last = self.split(seq_expr, span, &mut new_stmts);
                                assign_expr.right = last;
                                let assign_span = assign_expr.span;
                                let assignment = expr_stmt.expression.take_in(self.ast.allocator);
                                new_stmts.push(self.expression_statement(assign_span, assignment));
                                continue;
                            }
                        }
                    }

                    new_stmts.push(stmt.take_in(self.ast.allocator));
                }

                Statement::ReturnStatement(return_stmt) => {
                    let span = return_stmt.span;
                    match return_stmt.argument.as_mut().and_then(sequence_mut) {
                        Some(seq_expr) => {
                            let last = self.split(seq_expr, span, &mut new_stmts);
                            new_stmts.push(Statement::ReturnStatement(self.ast.alloc(ReturnStatement {
                                span: last.span(),
                                argument: Some(last),
                            })));
                        }
                        None => new_stmts.push(stmt.take_in(self.ast.allocator)),
                    }
                }

                Statement::ThrowStatement(throw_stmt) => {
                    let span = throw_stmt.span;
                    match sequence_mut(&mut throw_stmt.argument) {
                        Some(seq_expr) => {
                            let last = self.split(seq_expr, span, &mut new_stmts);
                            new_stmts.push(Statement::ThrowStatement(self.ast.alloc(ThrowStatement {
                                span: last.span(),
                                argument: last,
                            })));
                        }
                        None => new_stmts.push(stmt.take_in(self.ast.allocator)),
                    }
                }

                Statement::IfStatement(if_stmt) => {
                    let span = if_stmt.span;
                    match sequence_mut(&mut if_stmt.test) {
                        Some(seq_expr) => {
                            let last = self.split(seq_expr, span, &mut new_stmts);
                            new_stmts.push(Statement::IfStatement(self.ast.alloc(IfStatement {
                                span: last.span(),
                                test: last,
                                consequent: if_stmt.consequent.take_in(self.ast.allocator),
                                alternate: if_stmt
                                    .alternate
                                    .as_mut()
                                    .map(|alt| alt.take_in(self.ast.allocator)),
                            })));
                        }
                        None => new_stmts.push(stmt.take_in(self.ast.allocator)),
                    }
                }

                // `var x = (a, b)` -> `a; var x = b;` for the leading declarator.
                Statement::VariableDeclaration(var_decl) => {
                    let span = var_decl.span;
                    let split = var_decl
                        .declarations
                        .first_mut()
                        .and_then(|declarator| declarator.init.as_mut())
                        .and_then(sequence_mut);
                    match split {
                        Some(seq_expr) => {
                            let last = self.split(seq_expr, span, &mut new_stmts);
                            if let Some(declarator) = var_decl.declarations.first_mut() {
                                declarator.init = Some(last);
                            }
                            var_decl.span = Span::new(var_decl.declarations[0].span.start, span.end);
                            new_stmts.push(stmt.take_in(self.ast.allocator));
                        }
                        None => new_stmts.push(stmt.take_in(self.ast.allocator)),
                    }
                }

                _ => new_stmts.push(stmt.take_in(self.ast.allocator)),
            }
        }

        *node = new_stmts;
        walk_statements(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pass::Pass;
    use crate::test_utils::assert_transform;

    #[test]
    fn test_expression_statement() {
        assert_transform(Pass::tree(UnSequenceExpression), "a(), b(), c();", "a(); b(); c();");
    }

    #[test]
    fn test_return_and_throw() {
        assert_transform(
            Pass::tree(UnSequenceExpression),
            "function f() { if (x) { throw a(), new Error(); } return b(), c; }",
            "function f() { if (x) { a(); throw new Error(); } b(); return c; }",
        );
    }

    #[test]
    fn test_identifier_assignment_only() {
        assert_transform(
            Pass::tree(UnSequenceExpression),
            "x = (a(), b); o.p = (c(), d);",
            "a(); x = b; o.p = (c(), d);",
        );
    }

    #[test]
    fn test_if_test_and_declaration() {
        assert_transform(
            Pass::tree(UnSequenceExpression),
            "if (a(), b) c(); var x = (d(), e), y = 1;",
            "a(); if (b) c(); d(); var x = e, y = 1;",
        );
    }
}
