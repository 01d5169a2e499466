use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_syntax::scope::ScopeFlags;
use oxc_syntax::symbol::SymbolId;
use rustc_hash::FxHashSet;

use super::{module_id, registry, unwrap_statement, BundleKind, Layout, ModuleId, RegistryCallFinder};
use crate::ast::scope::ScopeTree;

/// Collects entry ids: `__webpack_require__.s = <id>` assignments and,
/// when `calls` is set, single-argument calls with one of those ids.
#[derive(Default)]
struct EntryFinder {
    calls: Option<FxHashSet<ModuleId>>,
    ids: Vec<ModuleId>,
}

impl EntryFinder {
    fn push(&mut self, id: ModuleId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }
}

impl<'a> Visit<'a> for EntryFinder {
    fn visit_assignment_expression(&mut self, assign: &AssignmentExpression<'a>) {
        if let AssignmentTarget::StaticMemberExpression(member) = &assign.left {
            if member.property.name == "s" {
                if let Some(id) = module_id(&assign.right) {
                    self.push(id);
                }
            }
        }
        walk::walk_assignment_expression(self, assign);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let (Some(calls), [argument]) = (&self.calls, &call.arguments[..]) {
            if let Some(id) = argument.as_expression().and_then(module_id) {
                if calls.contains(&id) {
                    self.push(id);
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// `require(<id>)` calls made directly by the runtime, outside any nested
/// function. Inlined entry modules live in nested functions and are skipped.
struct StartupCalls<'s> {
    scope: &'s ScopeTree,
    require: SymbolId,
    ids: Vec<ModuleId>,
}

impl<'a> Visit<'a> for StartupCalls<'_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let (Expression::Identifier(ident), [argument]) =
            (call.callee.get_inner_expression(), &call.arguments[..])
        {
            let symbol = ident
                .reference_id
                .get()
                .and_then(|reference| self.scope.symbol_of_reference(reference));
            if symbol == Some(self.require) {
                if let Some(id) = argument.as_expression().and_then(module_id) {
                    if !self.ids.contains(&id) {
                        self.ids.push(id);
                    }
                }
            }
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'a>) {}
}

fn registry_symbol(func: &Function<'_>) -> Option<SymbolId> {
    let [param] = &func.params.items[..] else {
        return None;
    };
    match &param.pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => ident.symbol_id.get(),
        _ => None,
    }
}

/// Webpack 4 and earlier:
///
/// ```js
/// !function(modules) {
///     function __webpack_require__(id) { ... modules[id].call(...) ... }
///     return __webpack_require__(__webpack_require__.s = 3);
/// }([function(module, exports) { ... }, ...]);
/// ```
///
/// The registry is an array or an object keyed by id or path.
pub(crate) fn detect_bootstrap(program: &Program<'_>, scope: &ScopeTree) -> Option<Layout> {
    program.body.iter().find_map(|stmt| {
        let Expression::CallExpression(call) = unwrap_statement(stmt)? else {
            return None;
        };
        let Expression::FunctionExpression(bootstrap) = call.callee.get_inner_expression() else {
            return None;
        };
        let [argument] = &call.arguments[..] else {
            return None;
        };
        let body = bootstrap.body.as_ref()?;

        let mut finder = RegistryCallFinder::new(scope, registry_symbol(bootstrap)?);
        finder.visit_function_body(body);
        if !finder.found {
            return None;
        }

        let mut layout = Layout::new(BundleKind::Webpack4, registry(argument.as_expression()?)?);
        let mut entries = EntryFinder::default();
        entries.visit_function_body(body);
        layout.entries = entries.ids;
        Some(layout)
    })
}

/// The registry declaration and `__webpack_require__` of a webpack 5 runtime.
fn runtime_layout(body: &FunctionBody<'_>, scope: &ScopeTree) -> Option<Layout> {
    let (registry_symbol, factories) = body.statements.iter().find_map(|stmt| {
        let Statement::VariableDeclaration(var_decl) = stmt else {
            return None;
        };
        var_decl.declarations.iter().find_map(|declarator| {
            let BindingPatternKind::BindingIdentifier(ident) = &declarator.id.kind else {
                return None;
            };
            let init = declarator.init.as_ref()?;
            if !matches!(init.get_inner_expression(), Expression::ObjectExpression(_)) {
                return None;
            }
            Some((ident.symbol_id.get()?, registry(init)?))
        })
    })?;

    let require = body.statements.iter().find_map(|stmt| {
        let Statement::FunctionDeclaration(func) = stmt else {
            return None;
        };
        let mut finder = RegistryCallFinder::new(scope, registry_symbol);
        finder.visit_function_body(func.body.as_ref()?);
        if !finder.found {
            return None;
        }
        func.id.as_ref()?.symbol_id.get()
    })?;

    let mut startup = StartupCalls {
        scope,
        require,
        ids: Vec::new(),
    };
    for stmt in &body.statements {
        startup.visit_statement(stmt);
    }

    let mut layout = Layout::new(BundleKind::Webpack5, factories);
    layout.entries = startup.ids;
    Some(layout)
}

/// Webpack 5:
///
/// ```js
/// (() => {
///     var __webpack_modules__ = { 123: (module, exports, require) => { ... } };
///     function __webpack_require__(id) { ... __webpack_modules__[id](...) ... }
///     __webpack_require__(123);
/// })();
/// ```
pub(crate) fn detect_runtime(program: &Program<'_>, scope: &ScopeTree) -> Option<Layout> {
    program.body.iter().find_map(|stmt| {
        let Expression::CallExpression(call) = unwrap_statement(stmt)? else {
            return None;
        };
        if !call.arguments.is_empty() {
            return None;
        }
        let body = match call.callee.get_inner_expression() {
            Expression::ArrowFunctionExpression(arrow) if arrow.params.items.is_empty() => &arrow.body,
            Expression::FunctionExpression(func) if func.params.items.is_empty() => func.body.as_ref()?,
            _ => return None,
        };
        runtime_layout(body, scope)
    })
}

/// A chunk loaded through the JSONP runtime:
///
/// ```js
/// (self.webpackChunkapp = self.webpackChunkapp || []).push([[179], { 123: ... }, runtime]);
/// (window.webpackJsonp = window.webpackJsonp || []).push([[0], [...], [[5, 1]]]);
/// ```
///
/// Entries come from the optional third element: webpack 4 lists
/// `[id, ...chunks]` tuples, webpack 5 passes a runtime function that
/// starts them.
pub(crate) fn detect_chunk(program: &Program<'_>) -> Option<Layout> {
    program.body.iter().find_map(|stmt| {
        let Expression::CallExpression(call) = unwrap_statement(stmt)? else {
            return None;
        };
        let Expression::StaticMemberExpression(member) = call.callee.get_inner_expression() else {
            return None;
        };
        let [argument] = &call.arguments[..] else {
            return None;
        };
        if member.property.name != "push" {
            return None;
        }
        let Expression::ArrayExpression(chunk) = argument.as_expression()?.get_inner_expression() else {
            return None;
        };
        let element = |index: usize| {
            chunk
                .elements
                .get(index)
                .and_then(ArrayExpressionElement::as_expression)
                .map(Expression::get_inner_expression)
        };
        if !matches!(element(0), Some(Expression::ArrayExpression(_))) {
            return None;
        }

        let mut layout = Layout::new(BundleKind::WebpackJsonp, registry(element(1)?)?);
        layout.entries = match element(2) {
            Some(Expression::ArrayExpression(deferred)) => deferred
                .elements
                .iter()
                .filter_map(|tuple| match tuple.as_expression()?.get_inner_expression() {
                    Expression::ArrayExpression(tuple) => {
                        tuple.elements.first()?.as_expression().and_then(module_id)
                    }
                    _ => None,
                })
                .collect(),
            Some(runtime) => {
                let mut entries = EntryFinder {
                    calls: Some(layout.factories.iter().map(|factory| factory.id.clone()).collect()),
                    ids: Vec::new(),
                };
                entries.visit_expression(runtime);
                entries.ids
            }
            None => Vec::new(),
        };
        Some(layout)
    })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::normalize;
    use crate::unpacker::{unpack, Module, ModuleId, UnpackResult};

    fn module<'r>(result: &'r UnpackResult, id: impl Into<ModuleId>) -> &'r Module {
        let id = id.into();
        result.modules.iter().find(|module| module.id == id).unwrap()
    }

    #[track_caller]
    fn assert_code(module: &Module, expected: &str) {
        assert_eq!(normalize(&module.code), normalize(expected), "\nmodule {}:\n{}", module.id, module.code);
    }

    #[test]
    fn test_webpack4_array_registry() {
        let result = unpack(
            r#"!function(e){var t={};function n(r){if(t[r])return t[r].exports;var o=t[r]={i:r,l:!1,exports:{}};return e[r].call(o.exports,o,o.exports,n),o.l=!0,o.exports}n.m=e,n.c=t,n.s=1,n(n.s=1)}([function(e,t){e.exports=42},function(e,t,n){var r=n(0);console.log(r)}]);"#,
        )
        .unwrap();

        assert_eq!(result.modules.len(), 2);
        assert_code(module(&result, 0), "module.exports = 42;");
        assert_code(module(&result, 1), "var r = require(0); console.log(r);");
        assert!(!module(&result, 0).is_entry);
        assert!(module(&result, 1).is_entry);
        assert!(result.module_id_mapping.is_empty());
        assert_eq!(result.filename(&ModuleId::Number(1)), "module-1.js");
    }

    #[test]
    fn test_webpack4_path_keys() {
        let result = unpack(
            r#"
/******/ (function(modules) { // webpackBootstrap
/******/ 	function __webpack_require__(moduleId) {
/******/ 		var module = { exports: {} };
/******/ 		modules[moduleId].call(module.exports, module, module.exports, __webpack_require__);
/******/ 		return module.exports;
/******/ 	}
/******/ 	return __webpack_require__(__webpack_require__.s = "./src/index.js");
/******/ })
/******/ ({
"./src/index.js": (function(module, exports, __webpack_require__) {
const util = __webpack_require__("./src/util.js");
console.log(util);
}),
"./src/util.js": (function(module, exports) {
module.exports = "util";
})
/******/ });
"#,
        )
        .unwrap();

        let index = module(&result, "./src/index.js");
        assert!(index.is_entry);
        assert_eq!(index.path_hint.as_deref(), Some("./src/index.js"));
        assert_code(index, r#"const util = require("./src/util.js"); console.log(util);"#);
        assert_code(module(&result, "./src/util.js"), r#"module.exports = "util";"#);
        assert_eq!(result.filename(&ModuleId::from("./src/index.js")), "src/index.js");
        assert_eq!(result.filename(&ModuleId::from("./src/util.js")), "src/util.js");
    }

    #[test]
    fn test_webpack4_banners() {
        let result = unpack(
            r#"
(function(modules){ function r(id){ var m={exports:{}}; modules[id].call(m.exports,m,m.exports,r); return m.exports } r.s = 7; return r(7); })({
/*!*** ./src/app.js ***!*/
7: function(e, t, r) { r(8); },
/*!*** ./src/dep.js ***!*/
8: function(e) { e.exports = 1; }
});
"#,
        )
        .unwrap();

        assert!(module(&result, 7).is_entry);
        assert_eq!(result.module_id_mapping.get(&ModuleId::Number(7)).map(String::as_str), Some("src/app.js"));
        assert_eq!(result.module_id_mapping.get(&ModuleId::Number(8)).map(String::as_str), Some("src/dep.js"));
        assert_code(module(&result, 7), "require(8);");
    }

    #[test]
    fn test_webpack5_runtime() {
        let result = unpack(
            r#"(()=>{var e={10:(e,t,r)=>{const n=r(20);console.log(n)},20:e=>{e.exports="dep"}},t={};function r(n){var o=t[n];if(void 0!==o)return o.exports;var i=t[n]={exports:{}};return e[n](i,i.exports,r),i.exports}r(10)})();"#,
        )
        .unwrap();

        assert_eq!(result.modules.len(), 2);
        assert_code(module(&result, 10), "const n = require(20); console.log(n);");
        assert_code(module(&result, 20), r#"module.exports = "dep";"#);
        assert!(module(&result, 10).is_entry);
        assert!(!module(&result, 20).is_entry);
    }

    #[test]
    fn test_webpack5_inline_entry_is_not_an_entry_call() {
        let result = unpack(
            r#"(()=>{var e={1:e=>{e.exports=1}},t={};function r(n){var o=t[n];if(void 0!==o)return o.exports;var i=t[n]={exports:{}};return e[n](i,i.exports,r),i.exports}(()=>{var n=r(1);console.log(n)})()})();"#,
        )
        .unwrap();
        assert_eq!(result.modules.len(), 1);
        assert_eq!(result.entries().count(), 0);
    }

    #[test]
    fn test_jsonp_chunk_with_runtime() {
        let result = unpack(
            r#"(self.webpackChunkapp=self.webpackChunkapp||[]).push([[179],{5:(e,t,r)=>{r(6)},6:e=>{e.exports=1}},e=>{var t=t=>e(e.s=t);e.O(0,[179],()=>t(5))}]);"#,
        )
        .unwrap();

        assert_eq!(result.modules.len(), 2);
        assert!(module(&result, 5).is_entry);
        assert!(!module(&result, 6).is_entry);
        assert_code(module(&result, 5), "require(6);");
    }

    #[test]
    fn test_jsonp_chunk_webpack4() {
        let result = unpack(
            r#"(window.webpackJsonp=window.webpackJsonp||[]).push([[0],[function(e,t){e.exports=1},function(e,t,n){n(0)}],[[1,0]]]);"#,
        )
        .unwrap();

        assert_eq!(result.modules.len(), 2);
        assert_eq!(result.entries().map(|module| module.id.clone()).collect::<Vec<_>>(), vec![ModuleId::Number(1)]);
        assert_code(module(&result, 1), "require(0);");
    }
}
