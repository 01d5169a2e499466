//! Small node constructors shared by the passes.

use std::cell::Cell;

use oxc_ast::{ast::*, AstBuilder, NONE};
use oxc_span::{Span, SPAN};
use oxc_syntax::symbol::SymbolId;

use super::identifier::is_identifier_name;

pub fn identifier<'a>(ast: &AstBuilder<'a>, span: Span, name: &str) -> Expression<'a> {
    Expression::Identifier(ast.alloc(IdentifierReference {
        span,
        name: ast.atom(name),
        reference_id: Cell::new(None),
    }))
}

pub fn string_literal<'a>(ast: &AstBuilder<'a>, span: Span, value: &str) -> Expression<'a> {
    Expression::StringLiteral(ast.alloc(StringLiteral {
        span,
        value: ast.atom(value),
        raw: None,
        lone_surrogates: false,
    }))
}

pub fn binding_pattern<'a>(
    ast: &AstBuilder<'a>,
    name: &str,
    symbol: Option<SymbolId>,
) -> BindingPattern<'a> {
    let ident = BindingIdentifier {
        span: SPAN,
        name: ast.atom(name),
        symbol_id: Cell::new(symbol),
    };
    ast.binding_pattern(
        BindingPatternKind::BindingIdentifier(ast.alloc(ident)),
        NONE,
        false,
    )
}

/// Identifier key when `name` allows it, string key otherwise.
pub fn property_key<'a>(ast: &AstBuilder<'a>, name: &str) -> PropertyKey<'a> {
    if is_identifier_name(name) {
        PropertyKey::StaticIdentifier(ast.alloc(IdentifierName {
            span: SPAN,
            name: ast.atom(name),
        }))
    } else {
        PropertyKey::StringLiteral(ast.alloc(StringLiteral {
            span: SPAN,
            value: ast.atom(name),
            raw: None,
            lone_surrogates: false,
        }))
    }
}

/// `{ key: local }` entry of an object pattern, shorthand when both agree.
pub fn binding_property<'a>(
    ast: &AstBuilder<'a>,
    key: &str,
    local: &str,
    symbol: Option<SymbolId>,
) -> BindingProperty<'a> {
    BindingProperty {
        span: SPAN,
        key: property_key(ast, key),
        value: binding_pattern(ast, local, symbol),
        shorthand: key == local && is_identifier_name(key),
        computed: false,
    }
}

pub fn object_pattern<'a>(
    ast: &AstBuilder<'a>,
    properties: oxc_allocator::Vec<'a, BindingProperty<'a>>,
) -> BindingPattern<'a> {
    ast.binding_pattern(
        BindingPatternKind::ObjectPattern(ast.alloc(ObjectPattern {
            span: SPAN,
            properties,
            rest: None,
        })),
        NONE,
        false,
    )
}

/// `<kind> <id> = <init>;` with a single declarator.
pub fn variable_declaration<'a>(
    ast: &AstBuilder<'a>,
    span: Span,
    kind: VariableDeclarationKind,
    id: BindingPattern<'a>,
    init: Expression<'a>,
) -> Statement<'a> {
    let declarator = VariableDeclarator {
        span,
        kind,
        id,
        init: Some(init),
        definite: false,
    };
    Statement::VariableDeclaration(ast.alloc(VariableDeclaration {
        span,
        kind,
        declarations: ast.vec1(declarator),
        declare: false,
    }))
}
