use std::cell::Cell;

use oxc_allocator::{Allocator, CloneIn};
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::walk::walk_call_expression;
use oxc_ast_visit::walk_mut::walk_call_expression as walk_call_expression_mut;
use oxc_ast_visit::{Visit, VisitMut};
use oxc_semantic::ScopeFlags;
use oxc_span::{GetSpan, SPAN};
use oxc_syntax::scope::ScopeId;
use oxc_syntax::symbol::SymbolId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::build;
use crate::ast::identifier::is_identifier_name;
use crate::ast::matchers::{indirect_call_target, require_specifier, static_member_of};
use crate::ast::scope::ScopeTree;
use crate::pipeline::pass::{PassContext, TreePass};

/// Turns `(0, s.useRef)(0)` into `useRef(0)`, importing or destructuring
/// `useRef` from wherever `s` came from.
pub struct UnIndirectCall;

#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginKind {
    DefaultImport,
    NamespaceImport,
    Require,
}

#[derive(Debug)]
struct Origin {
    /// Index of the declaring statement in the program body.
    index: usize,
    kind: OriginKind,
    source: String,
    /// Member name -> local binding that already holds it.
    existing: FxHashMap<String, SymbolId>,
    /// `const { .. } = s` right after the `require`, new entries join it.
    merge_target: Option<usize>,
}

impl TreePass for UnIndirectCall {
    fn id(&self) -> &'static str {
        "un-indirect-call"
    }

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        let mut scope = ScopeTree::build(program);
        let origins = collect_origins(program, &scope);
        if origins.is_empty() {
            return Ok(());
        }

        let mut finder = IndirectCallFinder {
            scope: &scope,
            origins: &origins,
            scopes: Vec::new(),
            pairs: Vec::new(),
            call_scopes: FxHashMap::default(),
        };
        finder.visit_program(program);
        let IndirectCallFinder { pairs, call_scopes, .. } = finder;
        if pairs.is_empty() {
            return Ok(());
        }

        let root = scope.root_scope();
        let mut locals: FxHashMap<(SymbolId, String), String> = FxHashMap::default();
        let mut additions: FxHashMap<SymbolId, Vec<(String, String)>> = FxHashMap::default();
        for (symbol, method) in pairs {
            let origin = &origins[&symbol];
            // An existing local is only reused where every call site resolves to it.
            let reusable = origin.existing.get(&method).copied().filter(|&local| {
                !scope.has_writes(local)
                    && call_scopes[&(symbol, method.clone())].iter().all(|&call_scope| {
                        scope
                            .find_declaration(call_scope, scope.symbol_name(local))
                            .is_some_and(|binding| binding.symbol == local)
                    })
            });
            let local = match reusable {
                Some(local) => scope.symbol_name(local).to_string(),
                None => {
                    let local = scope.generate_collision_free_name(&method, root);
                    additions.entry(symbol).or_default().push((method.clone(), local.clone()));
                    local
                }
            };
            locals.insert((symbol, method), local);
        }

        let mut rewriter = CallRewriter {
            ast: AstBuilder::new(ctx.allocator),
            scope: &scope,
            locals: &locals,
            rewritten: 0,
        };
        rewriter.visit_program(program);
        tracing::debug!(rewritten = rewriter.rewritten, "indirect calls rewritten");

        let mut planned: Vec<(&Origin, SymbolId, Vec<(String, String)>)> = additions
            .into_iter()
            .map(|(symbol, entries)| (&origins[&symbol], symbol, entries))
            .collect();
        planned.sort_by(|a, b| b.0.index.cmp(&a.0.index));
        for (origin, symbol, entries) in planned {
            let object_name = scope.symbol_name(symbol).to_string();
            insert_bindings(ctx.allocator, program, origin, &object_name, &entries);
        }

        let touched: FxHashSet<String> = locals
            .keys()
            .map(|(symbol, _)| &origins[symbol])
            .filter(|origin| origin.kind != OriginKind::Require)
            .map(|origin| origin.source.clone())
            .collect();
        remove_unused_import_objects(program, &touched);
        Ok(())
    }
}

fn module_export_name_text<'b>(name: &'b ModuleExportName<'_>) -> &'b str {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.as_str(),
        ModuleExportName::IdentifierReference(ident) => ident.name.as_str(),
        ModuleExportName::StringLiteral(lit) => lit.value.as_str(),
    }
}

fn destructured_object<'b, 'a>(
    declarator: &'b VariableDeclarator<'a>,
) -> Option<(&'b ObjectPattern<'a>, &'b IdentifierReference<'a>)> {
    let BindingPatternKind::ObjectPattern(pattern) = &declarator.id.kind else {
        return None;
    };
    match declarator.init.as_ref().map(Expression::get_inner_expression) {
        Some(Expression::Identifier(object)) if pattern.rest.is_none() => Some((pattern, object)),
        _ => None,
    }
}

fn collect_origins(program: &Program<'_>, scope: &ScopeTree) -> FxHashMap<SymbolId, Origin> {
    let mut origins = FxHashMap::default();
    let mut named_imports: FxHashMap<String, FxHashMap<String, SymbolId>> = FxHashMap::default();

    for (index, stmt) in program.body.iter().enumerate() {
        match stmt {
            Statement::ImportDeclaration(import) if import.import_kind.is_value() => {
                let source = import.source.value.to_string();
                for specifier in import.specifiers.iter().flatten() {
                    let (symbol, kind) = match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(named) => {
                            if let Some(local) = named.local.symbol_id.get() {
                                named_imports
                                    .entry(source.clone())
                                    .or_default()
                                    .entry(module_export_name_text(&named.imported).to_string())
                                    .or_insert(local);
                            }
                            continue;
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                            (default.local.symbol_id.get(), OriginKind::DefaultImport)
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                            (namespace.local.symbol_id.get(), OriginKind::NamespaceImport)
                        }
                    };
                    if let Some(symbol) = symbol {
                        origins.insert(symbol, Origin {
                            index,
                            kind,
                            source: source.clone(),
                            existing: FxHashMap::default(),
                            merge_target: None,
                        });
                    }
                }
            }
            Statement::VariableDeclaration(var_decl) if var_decl.declarations.len() == 1 => {
                let declarator = &var_decl.declarations[0];
                let BindingPatternKind::BindingIdentifier(ident) = &declarator.id.kind else {
                    continue;
                };
                let Some(source) = declarator.init.as_ref().and_then(require_specifier) else {
                    continue;
                };
                let Some(symbol) = ident.symbol_id.get() else {
                    continue;
                };
                if scope.has_writes(symbol) {
                    continue;
                }
                origins.insert(symbol, Origin {
                    index,
                    kind: OriginKind::Require,
                    source,
                    existing: FxHashMap::default(),
                    merge_target: None,
                });
            }
            _ => {}
        }
    }

    for origin in origins.values_mut() {
        if origin.kind != OriginKind::Require {
            if let Some(existing) = named_imports.get(&origin.source) {
                origin.existing = existing.clone();
            }
        }
    }

    // Destructurings of a required object that sit right after the require.
    for (index, stmt) in program.body.iter().enumerate() {
        let Statement::VariableDeclaration(var_decl) = stmt else {
            continue;
        };
        if var_decl.declarations.len() != 1 {
            continue;
        }
        let Some((pattern, object)) = destructured_object(&var_decl.declarations[0]) else {
            continue;
        };
        let Some(symbol) = object.reference_id.get().and_then(|r| scope.symbol_of_reference(r)) else {
            continue;
        };
        let Some(origin) = origins.get_mut(&symbol) else {
            continue;
        };
        if origin.kind != OriginKind::Require || origin.index + 1 != index {
            continue;
        }
        origin.merge_target = Some(index);
        for property in &pattern.properties {
            if property.computed {
                continue;
            }
            let key = match &property.key {
                PropertyKey::StaticIdentifier(key) => key.name.as_str(),
                PropertyKey::StringLiteral(key) => key.value.as_str(),
                _ => continue,
            };
            if let BindingPatternKind::BindingIdentifier(local) = &property.value.kind {
                if let Some(local) = local.symbol_id.get() {
                    origin.existing.entry(key.to_string()).or_insert(local);
                }
            }
        }
    }

    origins
}

/// `(0, obj.method)` callee whose `obj` is a known origin.
fn match_callee<'b>(
    callee: &'b Expression<'_>,
    scope: &ScopeTree,
) -> Option<(SymbolId, &'b str)> {
    let target = indirect_call_target(callee)?;
    let (object, method) = static_member_of(target)?;
    let symbol = scope.symbol_of_reference(object.reference_id.get()?)?;
    Some((symbol, method))
}

struct IndirectCallFinder<'s> {
    scope: &'s ScopeTree,
    origins: &'s FxHashMap<SymbolId, Origin>,
    scopes: Vec<ScopeId>,
    /// Distinct `(origin, method)` pairs in first-seen order.
    pairs: Vec<(SymbolId, String)>,
    /// Scopes each pair is called from.
    call_scopes: FxHashMap<(SymbolId, String), FxHashSet<ScopeId>>,
}

impl<'a> Visit<'a> for IndirectCallFinder<'_> {
    fn enter_scope(&mut self, _flags: ScopeFlags, scope_id: &Cell<Option<ScopeId>>) {
        if let Some(scope_id) = scope_id.get() {
            self.scopes.push(scope_id);
        }
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Some((symbol, method)) = match_callee(&it.callee, self.scope) {
            if self.origins.contains_key(&symbol) {
                let current = self.scopes.last().copied().unwrap_or_else(|| self.scope.root_scope());
                let key = (symbol, method.to_string());
                if !self.call_scopes.contains_key(&key) {
                    self.pairs.push(key.clone());
                }
                self.call_scopes.entry(key).or_default().insert(current);
            }
        }
        walk_call_expression(self, it);
    }
}

struct CallRewriter<'s, 'a> {
    ast: AstBuilder<'a>,
    scope: &'s ScopeTree,
    locals: &'s FxHashMap<(SymbolId, String), String>,
    rewritten: usize,
}

impl<'a> VisitMut<'a> for CallRewriter<'_, 'a> {
    fn visit_call_expression(&mut self, it: &mut CallExpression<'a>) {
        let local = match_callee(&it.callee, self.scope)
            .and_then(|(symbol, method)| self.locals.get(&(symbol, method.to_string())));
        if let Some(local) = local {
            let span = it.callee.span();
            it.callee = build::identifier(&self.ast, span, local);
            self.rewritten += 1;
        }
        walk_call_expression_mut(self, it);
    }
}

fn import_specifier<'a>(ast: &AstBuilder<'a>, imported: &str, local: &str) -> ImportDeclarationSpecifier<'a> {
    let imported = if is_identifier_name(imported) {
        ModuleExportName::IdentifierName(IdentifierName {
            span: SPAN,
            name: ast.atom(imported),
        })
    } else {
        ModuleExportName::StringLiteral(StringLiteral {
            span: SPAN,
            value: ast.atom(imported),
            raw: None,
            lone_surrogates: false,
        })
    };
    ImportDeclarationSpecifier::ImportSpecifier(ast.alloc(ImportSpecifier {
        span: SPAN,
        imported,
        local: BindingIdentifier {
            span: SPAN,
            name: ast.atom(local),
            symbol_id: Cell::new(None),
        },
        import_kind: ImportOrExportKind::Value,
    }))
}

fn insert_bindings<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    origin: &Origin,
    object_name: &str,
    entries: &[(String, String)],
) {
    let ast = AstBuilder::new(allocator);
    match origin.kind {
        OriginKind::DefaultImport => {
            if let Some(Statement::ImportDeclaration(import)) = program.body.get_mut(origin.index) {
                let specifiers = import.specifiers.get_or_insert_with(|| ast.vec());
                for (method, local) in entries {
                    specifiers.push(import_specifier(&ast, method, local));
                }
            }
        }
        OriginKind::NamespaceImport => {
            let Some(Statement::ImportDeclaration(import)) = program.body.get(origin.index) else {
                return;
            };
            let mut declaration = import.clone_in(allocator);
            declaration.span = SPAN;
            let mut specifiers = ast.vec();
            for (method, local) in entries {
                specifiers.push(import_specifier(&ast, method, local));
            }
            declaration.specifiers = Some(specifiers);
            program
                .body
                .insert(origin.index + 1, Statement::ImportDeclaration(declaration));
        }
        OriginKind::Require => {
            if let Some(index) = origin.merge_target {
                if let Some(Statement::VariableDeclaration(var_decl)) = program.body.get_mut(index) {
                    if let Some(declarator) = var_decl.declarations.first_mut() {
                        if let BindingPatternKind::ObjectPattern(pattern) = &mut declarator.id.kind {
                            for (method, local) in entries {
                                pattern.properties.push(build::binding_property(&ast, method, local, None));
                            }
                            return;
                        }
                    }
                }
            }

            let mut properties = ast.vec();
            for (method, local) in entries {
                properties.push(build::binding_property(&ast, method, local, None));
            }
            let declaration = build::variable_declaration(
                &ast,
                SPAN,
                VariableDeclarationKind::Const,
                build::object_pattern(&ast, properties),
                build::identifier(&ast, SPAN, object_name),
            );
            program.body.insert(origin.index + 1, declaration);
        }
    }
}

/// Drops default and namespace import bindings of `sources` that nothing
/// reads any more.
fn remove_unused_import_objects(program: &mut Program<'_>, sources: &FxHashSet<String>) {
    if sources.is_empty() {
        return;
    }
    let scope = ScopeTree::build(program);
    let unused = |ident: &BindingIdentifier<'_>| {
        ident.symbol_id.get().is_some_and(|symbol| scope.references(symbol).is_empty())
    };

    let mut emptied = FxHashSet::default();
    for (index, stmt) in program.body.iter_mut().enumerate() {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };
        if !sources.contains(import.source.value.as_str()) {
            continue;
        }
        let Some(specifiers) = import.specifiers.as_mut() else {
            continue;
        };
        let before = specifiers.len();
        specifiers.retain(|specifier| match specifier {
            ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => !unused(&default.local),
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => !unused(&namespace.local),
            ImportDeclarationSpecifier::ImportSpecifier(_) => true,
        });
        if specifiers.is_empty() && before > 0 {
            emptied.insert(index);
        }
    }

    let mut index = 0;
    program.body.retain(|_| {
        let keep = !emptied.contains(&index);
        index += 1;
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pass::Pass;
    use crate::test_utils::assert_transform;

    #[test]
    fn test_require_origin() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
const s = require("react");
const ref = (0, s.useRef)(0);
const memo = (0, s.useMemo)(() => 1, []);
"#,
            r#"
const s = require("react");
const { useRef, useMemo } = s;
const ref = useRef(0);
const memo = useMemo(() => 1, []);
"#,
        );
    }

    #[test]
    fn test_require_origin_with_existing_destructuring() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
const s = require("react");
const { useRef } = s;
const ref = (0, s.useRef)(0);
const memo = (0, s.useMemo)(() => 1, []);
"#,
            r#"
const s = require("react");
const { useRef, useMemo } = s;
const ref = useRef(0);
const memo = useMemo(() => 1, []);
"#,
        );
    }

    #[test]
    fn test_default_import_origin() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
import s from "react";
const ref = (0, s.useRef)(0);
"#,
            r#"
import { useRef } from "react";
const ref = useRef(0);
"#,
        );
    }

    #[test]
    fn test_name_collisions_across_origins() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
import p from "r2";
const s = require("react");
const a = (0, s.useRef)(0);
const b = (0, p.useRef)(1);
"#,
            r#"
import { useRef as useRef_1 } from "r2";
const s = require("react");
const { useRef } = s;
const a = useRef(0);
const b = useRef_1(1);
"#,
        );
    }

    #[test]
    fn test_reuses_existing_named_import() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
import s, { useRef as ref } from "react";
const a = (0, s.useRef)(0);
s.version;
"#,
            r#"
import s, { useRef as ref } from "react";
const a = ref(0);
s.version;
"#,
        );
    }

    #[test]
    fn test_shadowed_existing_import_gets_fresh_name() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
import { useRef } from "react";
import s from "react";
function f(useRef) { return (0, s.useRef)(1); }
"#,
            r#"
import { useRef } from "react";
import { useRef as useRef_1 } from "react";
function f(useRef) { return useRef_1(1); }
"#,
        );
    }

    #[test]
    fn test_shadowed_existing_destructuring_gets_fresh_name() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
const s = require("react");
const { useRef } = s;
function f() { const useRef = 2; return (0, s.useRef)(useRef); }
"#,
            r#"
const s = require("react");
const { useRef, useRef: useRef_1 } = s;
function f() { const useRef = 2; return useRef_1(useRef); }
"#,
        );
    }

    #[test]
    fn test_destructuring_after_the_call_is_not_reused() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
const s = require("react");
const a = (0, s.useRef)(0);
const { useRef } = s;
"#,
            r#"
const s = require("react");
const { useRef: useRef_1 } = s;
const a = useRef_1(0);
const { useRef } = s;
"#,
        );
    }

    #[test]
    fn test_removes_unused_import_objects_of_same_source() {
        assert_transform(
            Pass::tree(UnIndirectCall),
            r#"
import * as R from "react";
import s from "react";
import other from "lodash";
const a = (0, R.useRef)(0);
"#,
            r#"
import { useRef } from "react";
import other from "lodash";
const a = useRef(0);
"#,
        );
    }

    #[test]
    fn test_unknown_objects_untouched() {
        let input = "const a = (0, obj.method)(1);";
        assert_transform(Pass::tree(UnIndirectCall), input, input);
    }
}
