use oxc_allocator::{Allocator, TakeIn};
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::walk_mut::walk_expression;
use oxc_ast_visit::VisitMut;
use oxc_span::GetSpan;
use oxc_syntax::symbol::SymbolId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::matchers::{indirect_call_target, require_specifier};
use crate::ast::scope::ScopeTree;
use crate::pipeline::options::HelperOptions;
use crate::pipeline::pass::{PassContext, TreePass};

/// Replaces Babel runtime helper calls with the syntax they emulate and drops
/// the helper import once unused:
///
/// - `_extends({}, a, { b: 1 })` and `_objectSpread2({}, a, { b: 1 })` become `{ ...a, b: 1 }`
/// - `_toConsumableArray(a)` becomes `[...a]`
pub struct RuntimeHelpers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Helper {
    Extends,
    ObjectSpread,
    ToConsumableArray,
}

impl Helper {
    fn modules(self, options: &HelperOptions) -> &[String] {
        match self {
            Self::Extends => &options.extends_modules,
            Self::ObjectSpread => &options.object_spread_modules,
            Self::ToConsumableArray => &options.to_consumable_array_modules,
        }
    }
}

const HELPERS: [Helper; 3] = [Helper::Extends, Helper::ObjectSpread, Helper::ToConsumableArray];

fn helper_of_module(module: &str, options: &HelperOptions) -> Option<Helper> {
    HELPERS
        .into_iter()
        .find(|helper| helper.modules(options).iter().any(|candidate| candidate == module))
}

impl TreePass for RuntimeHelpers {
    fn id(&self) -> &'static str {
        "runtime-helpers"
    }

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        let options = &ctx.options.helpers;
        let helpers = helper_symbols(program, options);
        if helpers.is_empty() {
            return Ok(());
        }

        let scope = ScopeTree::build(program);
        let mut inliner = HelperInliner::new(ctx.allocator, &scope, &helpers);
        inliner.visit_program(program);
        if inliner.inlined == 0 {
            return Ok(());
        }
        tracing::debug!(inlined = inliner.inlined, "runtime helper calls inlined");

        let scope = ScopeTree::build(program);
        let unused: FxHashSet<SymbolId> = helper_symbols(program, options)
            .into_keys()
            .filter(|&symbol| scope.read_count(symbol) == 0)
            .collect();
        remove_declarations(program, &unused);
        Ok(())
    }
}

fn helper_source(expr: &Expression<'_>, options: &HelperOptions) -> Option<Helper> {
    let expr = expr.get_inner_expression();
    if let Some(specifier) = require_specifier(expr) {
        return helper_of_module(&specifier, options);
    }
    match expr {
        // require("...").default
        Expression::StaticMemberExpression(member) if member.property.name == "default" => {
            helper_source(&member.object, options)
        }
        // _interopRequireDefault(require("..."))
        Expression::CallExpression(call) if call.arguments.len() == 1 => {
            call.arguments[0].as_expression().and_then(|arg| helper_source(arg, options))
        }
        _ => None,
    }
}

/// Top-level bindings holding a helper, with the helper each one holds.
fn helper_symbols(program: &Program<'_>, options: &HelperOptions) -> FxHashMap<SymbolId, Helper> {
    let mut symbols = FxHashMap::default();
    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(import) => {
                let Some(helper) = helper_of_module(&import.source.value, options) else {
                    continue;
                };
                for specifier in import.specifiers.iter().flatten() {
                    if let ImportDeclarationSpecifier::ImportDefaultSpecifier(default) = specifier {
                        symbols.extend(default.local.symbol_id.get().map(|symbol| (symbol, helper)));
                    }
                }
            }
            Statement::VariableDeclaration(var_decl) => {
                for declarator in &var_decl.declarations {
                    let BindingPatternKind::BindingIdentifier(ident) = &declarator.id.kind else {
                        continue;
                    };
                    let Some(helper) = declarator.init.as_ref().and_then(|init| helper_source(init, options)) else {
                        continue;
                    };
                    symbols.extend(ident.symbol_id.get().map(|symbol| (symbol, helper)));
                }
            }
            _ => {}
        }
    }
    symbols
}

fn remove_declarations(program: &mut Program<'_>, unused: &FxHashSet<SymbolId>) {
    if unused.is_empty() {
        return;
    }
    let is_unused = |ident: &BindingIdentifier<'_>| ident.symbol_id.get().is_some_and(|s| unused.contains(&s));

    for stmt in program.body.iter_mut() {
        match stmt {
            Statement::ImportDeclaration(import) => {
                if let Some(specifiers) = import.specifiers.as_mut() {
                    specifiers.retain(|specifier| match specifier {
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => !is_unused(&default.local),
                        _ => true,
                    });
                }
            }
            Statement::VariableDeclaration(var_decl) => {
                var_decl.declarations.retain(|declarator| match &declarator.id.kind {
                    BindingPatternKind::BindingIdentifier(ident) => !is_unused(ident),
                    _ => true,
                });
            }
            _ => {}
        }
    }

    program.body.retain(|stmt| match stmt {
        Statement::ImportDeclaration(import) => import.specifiers.as_ref().map_or(true, |s| !s.is_empty()),
        Statement::VariableDeclaration(var_decl) => !var_decl.declarations.is_empty(),
        _ => true,
    });
}

struct HelperInliner<'s, 'a> {
    ast: AstBuilder<'a>,
    scope: &'s ScopeTree,
    helpers: &'s FxHashMap<SymbolId, Helper>,
    inlined: usize,
}

impl<'s, 'a> HelperInliner<'s, 'a> {
    fn new(allocator: &'a Allocator, scope: &'s ScopeTree, helpers: &'s FxHashMap<SymbolId, Helper>) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
            scope,
            helpers,
            inlined: 0,
        }
    }

    fn helper(&self, ident: &IdentifierReference<'a>) -> Option<Helper> {
        ident
            .reference_id
            .get()
            .and_then(|reference| self.scope.symbol_of_reference(reference))
            .and_then(|symbol| self.helpers.get(&symbol).copied())
    }

    fn callee_helper(&self, callee: &Expression<'a>) -> Option<Helper> {
        let callee = indirect_call_target(callee).unwrap_or_else(|| callee.get_inner_expression());
        match callee {
            Expression::Identifier(ident) => self.helper(ident),
            Expression::StaticMemberExpression(member) if member.property.name == "default" => match &member.object {
                Expression::Identifier(ident) => self.helper(ident),
                _ => None,
            },
            _ => None,
        }
    }

    /// `_toConsumableArray(x)` with a single plain argument.
    fn is_spreadable(call: &CallExpression<'a>) -> bool {
        matches!(&call.arguments[..], [argument] if argument.as_expression().is_some())
    }

    fn spread_array(&self, call: &mut CallExpression<'a>) -> Expression<'a> {
        let mut elements = self.ast.vec();
        if let Some(argument) = call.arguments.first_mut().and_then(Argument::as_expression_mut) {
            let argument = argument.take_in(self.ast.allocator);
            let span = argument.span();
            elements.push(ArrayExpressionElement::SpreadElement(self.ast.alloc(SpreadElement {
                span,
                argument,
            })));
        }
        self.ast.expression_array(call.span, elements)
    }

    fn is_mergeable(call: &CallExpression<'a>) -> bool {
        matches!(
            call.arguments.first().map(|arg| arg.as_expression().map(Expression::get_inner_expression)),
            Some(Some(Expression::ObjectExpression(_)))
        ) && !call.arguments.iter().any(|arg| matches!(arg, Argument::SpreadElement(_)))
    }

    fn has_accessors(object: &ObjectExpression<'a>) -> bool {
        object.properties.iter().any(|property| {
            matches!(property, ObjectPropertyKind::ObjectProperty(prop) if prop.kind != PropertyKind::Init)
        })
    }

    fn merge(&self, call: &mut CallExpression<'a>) -> Expression<'a> {
        let mut properties = self.ast.vec();
        for (i, argument) in call.arguments.iter_mut().enumerate() {
            let Some(expr) = argument.as_expression_mut() else {
                continue;
            };
            let mut expr = expr.get_inner_expression_mut().take_in(self.ast.allocator);
            let inline = matches!(
                &expr,
                Expression::ObjectExpression(object) if i == 0 || !Self::has_accessors(object)
            );
            if inline {
                if let Expression::ObjectExpression(object) = &mut expr {
                    properties.extend(object.properties.drain(..));
                }
            } else {
                let span = expr.span();
                properties.push(ObjectPropertyKind::SpreadProperty(self.ast.alloc(SpreadElement {
                    span,
                    argument: expr,
                })));
            }
        }
        Expression::ObjectExpression(self.ast.alloc(ObjectExpression {
            span: call.span,
            properties,
        }))
    }
}

impl<'a> VisitMut<'a> for HelperInliner<'_, 'a> {
    fn visit_expression(&mut self, node: &mut Expression<'a>) {
        walk_expression(self, node);

        let Expression::CallExpression(call) = node else {
            return;
        };
        let replacement = match self.callee_helper(&call.callee) {
            Some(Helper::Extends | Helper::ObjectSpread) if Self::is_mergeable(call) => self.merge(call),
            Some(Helper::ToConsumableArray) if Self::is_spreadable(call) => self.spread_array(call),
            _ => return,
        };
        *node = replacement;
        self.inlined += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pass::Pass;
    use crate::test_utils::assert_transform;

    #[test]
    fn test_import_helper() {
        assert_transform(
            Pass::tree(RuntimeHelpers),
            r#"
import _extends from "@babel/runtime/helpers/extends";
const a = _extends({}, props, { b: 1 });
"#,
            "const a = { ...props, b: 1 };",
        );
    }

    #[test]
    fn test_require_helper_nested() {
        assert_transform(
            Pass::tree(RuntimeHelpers),
            r#"
var _extends = _interopRequireDefault(require("@babel/runtime/helpers/extends"));
var a = (0, _extends.default)({ x: 1 }, (0, _extends.default)({}, b), c);
"#,
            "var a = { x: 1, ...b, ...c };",
        );
    }

    #[test]
    fn test_object_spread_helper() {
        assert_transform(
            Pass::tree(RuntimeHelpers),
            r#"
import _objectSpread from "@babel/runtime/helpers/esm/objectSpread2";
const a = _objectSpread(_objectSpread({}, props), {}, { b: 1 });
"#,
            "const a = { ...props, b: 1 };",
        );
        assert_transform(
            Pass::tree(RuntimeHelpers),
            r#"
var _objectSpread2 = _interopRequireDefault(require("@babel/runtime/helpers/objectSpread2"));
var a = (0, _objectSpread2.default)({ x: 1 }, rest);
"#,
            "var a = { x: 1, ...rest };",
        );
    }

    #[test]
    fn test_to_consumable_array_helper() {
        assert_transform(
            Pass::tree(RuntimeHelpers),
            r#"
import _toConsumableArray from "@babel/runtime/helpers/toConsumableArray";
const a = [].concat(_toConsumableArray(items), [last]);
const b = _toConsumableArray(new Set(c));
"#,
            "const a = [].concat([...items], [last]); const b = [...new Set(c)];",
        );
    }

    #[test]
    fn test_keeps_unrecognized_helper_calls() {
        assert_transform(
            Pass::tree(RuntimeHelpers),
            r#"
import _toConsumableArray from "@babel/runtime/helpers/toConsumableArray";
import _objectSpread from "@babel/runtime/helpers/objectSpread2";
const a = _toConsumableArray(...lists);
const b = _objectSpread(target, c);
"#,
            r#"
import _toConsumableArray from "@babel/runtime/helpers/toConsumableArray";
import _objectSpread from "@babel/runtime/helpers/objectSpread2";
const a = _toConsumableArray(...lists);
const b = _objectSpread(target, c);
"#,
        );
    }

    #[test]
    fn test_keeps_helper_still_in_use() {
        assert_transform(
            Pass::tree(RuntimeHelpers),
            r#"
import _extends from "@babel/runtime/helpers/extends";
const a = _extends({}, b);
const c = _extends(target, d);
"#,
            r#"
import _extends from "@babel/runtime/helpers/extends";
const a = { ...b };
const c = _extends(target, d);
"#,
        );
    }
}
