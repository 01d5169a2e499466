use oxc_ast::ast::*;

/// `undefined` or `void <literal>`.
pub fn is_undefined(expr: &Expression<'_>) -> bool {
    match expr.get_inner_expression() {
        Expression::Identifier(ident) => ident.name == "undefined",
        Expression::UnaryExpression(unary) => {
            unary.operator == UnaryOperator::Void && is_void_operand(&unary.argument)
        }
        _ => false,
    }
}

fn is_void_operand(expr: &Expression<'_>) -> bool {
    matches!(
        expr.get_inner_expression(),
        Expression::NumericLiteral(_) | Expression::StringLiteral(_) | Expression::BooleanLiteral(_)
    )
}

pub fn is_null(expr: &Expression<'_>) -> bool {
    matches!(expr.get_inner_expression(), Expression::NullLiteral(_))
}

pub fn is_boolean(expr: &Expression<'_>) -> bool {
    matches!(expr.get_inner_expression(), Expression::BooleanLiteral(_))
}

pub fn is_true(expr: &Expression<'_>) -> bool {
    matches!(expr.get_inner_expression(), Expression::BooleanLiteral(lit) if lit.value)
}

/// Primitive literal that can be duplicated without changing behavior.
pub fn is_primitive_literal(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::NumericLiteral(_)
        | Expression::StringLiteral(_)
        | Expression::BooleanLiteral(_)
        | Expression::NullLiteral(_)
        | Expression::BigIntLiteral(_) => true,
        Expression::UnaryExpression(unary) => {
            matches!(unary.operator, UnaryOperator::UnaryNegation | UnaryOperator::Void)
                && matches!(unary.argument, Expression::NumericLiteral(_))
        }
        _ => false,
    }
}

/// Integral numbers print without a fraction so `29` and `29.0` agree.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Specifier of `require("x")` / `require(29)`, as text.
pub fn require_specifier(expr: &Expression<'_>) -> Option<String> {
    let Expression::CallExpression(call) = expr.get_inner_expression() else {
        return None;
    };
    let Expression::Identifier(callee) = &call.callee else {
        return None;
    };
    if callee.name != "require" || call.arguments.len() != 1 {
        return None;
    }
    match &call.arguments[0] {
        Argument::StringLiteral(lit) => Some(lit.value.to_string()),
        Argument::NumericLiteral(lit) => Some(format_number(lit.value)),
        _ => None,
    }
}

/// `(0, target)` with any numeric first element.
pub fn indirect_call_target<'b, 'a>(callee: &'b Expression<'a>) -> Option<&'b Expression<'a>> {
    let Expression::SequenceExpression(seq) = callee.get_inner_expression() else {
        return None;
    };
    if seq.expressions.len() != 2 {
        return None;
    }
    match &seq.expressions[0] {
        Expression::NumericLiteral(_) => Some(seq.expressions[1].get_inner_expression()),
        _ => None,
    }
}

/// Property name of `obj.name` or `obj["name"]` with a plain identifier object.
pub fn static_member_of<'b, 'a>(
    expr: &'b Expression<'a>,
) -> Option<(&'b IdentifierReference<'a>, &'b str)> {
    match expr.get_inner_expression() {
        Expression::StaticMemberExpression(member) if !member.optional => match &member.object {
            Expression::Identifier(object) => Some((object, member.property.name.as_str())),
            _ => None,
        },
        Expression::ComputedMemberExpression(member) if !member.optional => {
            match (&member.object, &member.expression) {
                (Expression::Identifier(object), Expression::StringLiteral(key)) => {
                    Some((object, key.value.as_str()))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use oxc_ast::ast::Statement;

    use super::*;
    use crate::ast::parse;

    fn with_expression(code: &str, check: impl FnOnce(&Expression<'_>)) {
        let allocator = Allocator::default();
        let source = allocator.alloc_str(code);
        let program = parse(&allocator, source).unwrap();
        let Some(Statement::ExpressionStatement(stmt)) = program.body.first() else {
            panic!("expected an expression statement");
        };
        check(&stmt.expression);
    }

    #[test]
    fn test_undefined_forms() {
        with_expression("undefined", |expr| assert!(is_undefined(expr)));
        with_expression("void 0", |expr| assert!(is_undefined(expr)));
        with_expression("void foo()", |expr| assert!(!is_undefined(expr)));
    }

    #[test]
    fn test_require_specifier() {
        with_expression("require('react')", |expr| {
            assert_eq!(require_specifier(expr).as_deref(), Some("react"));
        });
        with_expression("require(29)", |expr| {
            assert_eq!(require_specifier(expr).as_deref(), Some("29"));
        });
        with_expression("require(a)", |expr| assert!(require_specifier(expr).is_none()));
    }

    #[test]
    fn test_indirect_call_target() {
        with_expression("(0, s.useRef)", |expr| {
            let target = indirect_call_target(expr).unwrap();
            let (object, property) = static_member_of(target).unwrap();
            assert_eq!(object.name, "s");
            assert_eq!(property, "useRef");
        });
        with_expression("(1, 2, s.useRef)", |expr| assert!(indirect_call_target(expr).is_none()));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(29.0), "29");
        assert_eq!(format_number(1.5), "1.5");
    }
}
