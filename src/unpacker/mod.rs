//! Splits bundler output back into its modules.
//!
//! Detection is structural: each supported runtime is recognized by the
//! shape of its wrapper call and module registry, never by version strings.

pub mod browserify;
pub mod module;
pub mod webpack;

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;

use oxc_allocator::{Allocator, Vec as ArenaVec};
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::{walk, walk_mut, Visit, VisitMut};
use oxc_span::{GetSpan, Span};
use oxc_syntax::scope::ScopeId;
use oxc_syntax::symbol::SymbolId;
use rustc_hash::{FxHashMap, FxHashSet};
use strum::Display;

use crate::ast::{self, matchers::is_null, scope::ScopeTree};
use crate::error::{Error, UnpackError};
use module::{banner_path, is_path_like, normalize_filename};
pub use module::{Module, ModuleId, UnpackResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum BundleKind {
    Webpack4,
    Webpack5,
    WebpackJsonp,
    Browserify,
}

impl BundleKind {
    /// Names given to factory parameters, in parameter order.
    fn parameter_names(self) -> [&'static str; 3] {
        match self {
            Self::Browserify => ["require", "module", "exports"],
            _ => ["module", "exports", "require"],
        }
    }
}

/// One registry entry.
#[derive(Debug)]
pub(crate) struct Factory {
    pub id: ModuleId,
    pub scope: Option<ScopeId>,
    pub params: Vec<Option<SymbolId>>,
    pub body: Span,
    /// The whole registry entry, key included.
    pub entry: Span,
    pub path: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Layout {
    pub kind: BundleKind,
    pub factories: Vec<Factory>,
    pub entries: Vec<ModuleId>,
    /// Specifiers other modules use to import a module.
    pub dependency_names: Vec<(ModuleId, String)>,
}

impl Layout {
    pub fn new(kind: BundleKind, factories: Vec<Factory>) -> Self {
        Self {
            kind,
            factories,
            entries: Vec::new(),
            dependency_names: Vec::new(),
        }
    }

    fn is_entry(&self, id: &ModuleId) -> bool {
        self.entries.contains(id)
    }
}

/// Expression of a top-level statement with the `!`, `void` and parentheses
/// minifiers wrap around an IIFE removed.
pub(crate) fn unwrap_statement<'b, 'a>(stmt: &'b Statement<'a>) -> Option<&'b Expression<'a>> {
    let Statement::ExpressionStatement(stmt) = stmt else {
        return None;
    };
    let mut expr = stmt.expression.get_inner_expression();
    while let Expression::UnaryExpression(unary) = expr {
        expr = unary.argument.get_inner_expression();
    }
    Some(expr)
}

fn numeric_id(value: f64) -> Option<ModuleId> {
    (value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64).then(|| ModuleId::Number(value as u64))
}

/// `"12"` and `12` address the same registry slot.
fn named_id(name: &str) -> ModuleId {
    let canonical = !name.is_empty() && (name == "0" || !name.starts_with('0'));
    match name.parse::<u64>() {
        Ok(id) if canonical => ModuleId::Number(id),
        _ => ModuleId::Name(name.to_string()),
    }
}

pub(crate) fn module_id(expr: &Expression<'_>) -> Option<ModuleId> {
    match expr.get_inner_expression() {
        Expression::NumericLiteral(lit) => numeric_id(lit.value),
        Expression::StringLiteral(lit) => Some(named_id(&lit.value)),
        _ => None,
    }
}

pub(crate) fn key_id(key: &PropertyKey<'_>) -> Option<ModuleId> {
    match key {
        PropertyKey::NumericLiteral(lit) => numeric_id(lit.value),
        PropertyKey::StringLiteral(lit) => Some(named_id(&lit.value)),
        PropertyKey::StaticIdentifier(ident) => Some(named_id(&ident.name)),
        _ => None,
    }
}

/// A module factory: a function or arrow with a block body.
pub(crate) fn factory(expr: &Expression<'_>, id: ModuleId, entry: Span) -> Option<Factory> {
    let (params, body, scope) = match expr.get_inner_expression() {
        Expression::FunctionExpression(func) => (&*func.params, func.body.as_ref()?.span, func.scope_id.get()),
        Expression::ArrowFunctionExpression(arrow) => (&*arrow.params, arrow.body.span, arrow.scope_id.get()),
        _ => return None,
    };
    let params = params
        .items
        .iter()
        .map(|param| match &param.pattern.kind {
            BindingPatternKind::BindingIdentifier(ident) => ident.symbol_id.get(),
            _ => None,
        })
        .collect();
    Some(Factory {
        id,
        scope,
        params,
        body,
        entry,
        path: None,
    })
}

/// Factories of an array registry (`[function(e, t) {...}, ...]`, index ids)
/// or an object registry (`{ 12: ..., "./src/a.js": ... }`, key ids).
/// Any entry that is not a factory rejects the whole literal.
pub(crate) fn registry(expr: &Expression<'_>) -> Option<Vec<Factory>> {
    let mut factories = Vec::new();
    match expr.get_inner_expression() {
        Expression::ArrayExpression(array) => {
            for (index, element) in array.elements.iter().enumerate() {
                if matches!(element, ArrayExpressionElement::Elision(_)) {
                    continue;
                }
                let value = element.as_expression()?;
                if is_null(value) {
                    continue;
                }
                factories.push(factory(value, ModuleId::Number(index as u64), element.span())?);
            }
        }
        Expression::ObjectExpression(object) => {
            for property in &object.properties {
                let ObjectPropertyKind::ObjectProperty(property) = property else {
                    return None;
                };
                let id = key_id(&property.key)?;
                let mut found = factory(&property.value, id, property.span)?;
                if let ModuleId::Name(name) = &found.id {
                    if is_path_like(name) {
                        found.path = Some(name.clone());
                    }
                }
                factories.push(found);
            }
        }
        _ => return None,
    }
    (!factories.is_empty()).then_some(factories)
}

/// Finds `registry[id](...)` or `registry[id].call(...)`, the way every
/// webpack `require` implementation invokes a factory.
pub(crate) struct RegistryCallFinder<'s> {
    scope: &'s ScopeTree,
    registry: SymbolId,
    pub found: bool,
}

impl<'s> RegistryCallFinder<'s> {
    pub fn new(scope: &'s ScopeTree, registry: SymbolId) -> Self {
        Self {
            scope,
            registry,
            found: false,
        }
    }
}

impl<'a> Visit<'a> for RegistryCallFinder<'_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        let callee = match call.callee.get_inner_expression() {
            Expression::StaticMemberExpression(member) if member.property.name == "call" => {
                member.object.get_inner_expression()
            }
            callee => callee,
        };
        if let Expression::ComputedMemberExpression(member) = callee {
            if let Expression::Identifier(ident) = member.object.get_inner_expression() {
                let symbol = ident
                    .reference_id
                    .get()
                    .and_then(|reference| self.scope.symbol_of_reference(reference));
                if symbol == Some(self.registry) {
                    self.found = true;
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

fn banner_paths(program: &Program<'_>, factories: &[Factory]) -> Vec<Option<String>> {
    let mut from = 0;
    factories
        .iter()
        .map(|factory| {
            let to = factory.entry.start;
            let path = program
                .comments
                .iter()
                .filter(|comment| comment.span.start >= from && comment.span.end <= to)
                .find_map(|comment| banner_path(comment.span.source_text(program.source_text)))
                .map(str::to_string);
            from = factory.entry.end;
            path
        })
        .collect()
}

/// Names referenced inside each factory body other than its own parameters.
struct ForeignNames<'s> {
    scope: &'s ScopeTree,
    bodies: FxHashMap<Span, usize>,
    params: FxHashSet<SymbolId>,
    current: Vec<usize>,
    names: Vec<FxHashSet<String>>,
}

impl<'a> Visit<'a> for ForeignNames<'_> {
    fn visit_function_body(&mut self, body: &FunctionBody<'a>) {
        let index = self.bodies.get(&body.span).copied();
        if let Some(index) = index {
            self.current.push(index);
        }
        walk::walk_function_body(self, body);
        if index.is_some() {
            self.current.pop();
        }
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        let Some(&index) = self.current.last() else {
            return;
        };
        let symbol = ident
            .reference_id
            .get()
            .and_then(|reference| self.scope.symbol_of_reference(reference));
        if symbol.is_some_and(|symbol| self.params.contains(&symbol)) {
            return;
        }
        self.names[index].insert(ident.name.to_string());
    }
}

/// Gives factory parameters their runtime names wherever that neither
/// captures nor is captured by another binding.
fn rename_parameters(scope: &mut ScopeTree, program: &Program<'_>, layout: &Layout) -> usize {
    let mut foreign = ForeignNames {
        scope: &*scope,
        bodies: layout
            .factories
            .iter()
            .enumerate()
            .map(|(index, factory)| (factory.body, index))
            .collect(),
        params: layout.factories.iter().flat_map(|factory| factory.params.iter().flatten().copied()).collect(),
        current: Vec::new(),
        names: vec![FxHashSet::default(); layout.factories.len()],
    };
    foreign.visit_program(program);
    let names = foreign.names;

    let mut renamed = 0;
    for (factory, foreign) in layout.factories.iter().zip(&names) {
        let Some(factory_scope) = factory.scope else {
            continue;
        };
        for (param, name) in factory.params.iter().zip(layout.kind.parameter_names()) {
            let Some(symbol) = *param else {
                continue;
            };
            if scope.symbol_name(symbol) == name {
                continue;
            }
            let free = scope.scoping().get_binding(factory_scope, name).is_none()
                && !scope.is_shadowed_below(factory_scope, name)
                && !foreign.contains(name);
            if free {
                scope.rename_symbol(symbol, name);
                renamed += 1;
            }
        }
    }
    renamed
}

type Body<'a> = (ArenaVec<'a, Directive<'a>>, ArenaVec<'a, Statement<'a>>);

/// Moves each factory body out of the bundle tree.
struct BodyExtractor<'a> {
    ast: AstBuilder<'a>,
    wanted: FxHashMap<Span, usize>,
    bodies: Vec<Option<Body<'a>>>,
}

impl<'a> VisitMut<'a> for BodyExtractor<'a> {
    fn visit_function_body(&mut self, body: &mut FunctionBody<'a>) {
        if let Some(&index) = self.wanted.get(&body.span) {
            let directives = std::mem::replace(&mut body.directives, self.ast.vec());
            let statements = std::mem::replace(&mut body.statements, self.ast.vec());
            self.bodies[index] = Some((directives, statements));
            return;
        }
        walk_mut::walk_function_body(self, body);
    }
}

fn detect(program: &Program<'_>, scope: &ScopeTree) -> Option<Layout> {
    webpack::detect_bootstrap(program, scope)
        .or_else(|| webpack::detect_runtime(program, scope))
        .or_else(|| webpack::detect_chunk(program))
        .or_else(|| browserify::detect(program))
}

fn module_mapping(layout: &Layout, hints: &[Option<String>]) -> BTreeMap<ModuleId, String> {
    let known: FxHashSet<&ModuleId> = layout.factories.iter().map(|factory| &factory.id).collect();
    let candidates = layout
        .factories
        .iter()
        .zip(hints)
        .filter_map(|(factory, hint)| Some((&factory.id, hint.as_deref()?)))
        .chain(layout.dependency_names.iter().map(|(id, name)| (id, name.as_str())));

    let mut mapping = BTreeMap::new();
    let mut used = FxHashSet::default();
    for (id, path) in candidates {
        if !known.contains(id) || mapping.contains_key(id) {
            continue;
        }
        let Some(filename) = normalize_filename(path) else {
            continue;
        };
        if used.insert(filename.clone()) {
            mapping.insert(id.clone(), filename);
        }
    }
    mapping
}

/// Recognizes the bundle runtime in `source` and returns every registry
/// entry as a module, together with the filenames the bundle recorded.
pub fn unpack(source: &str) -> Result<UnpackResult, UnpackError> {
    let allocator = Allocator::default();
    let mut program = ast::parse(&allocator, source)?;
    let mut scope = ScopeTree::build(&program);

    let Some(layout) = detect(&program, &scope) else {
        tracing::warn!("no known bundle runtime found");
        return Err(UnpackError::UnrecognizedBundleFormat);
    };
    tracing::info!(
        kind = %layout.kind,
        modules = layout.factories.len(),
        entries = layout.entries.len(),
        "bundle recognized"
    );

    let banners = banner_paths(&program, &layout.factories);
    let hints: Vec<Option<String>> = layout
        .factories
        .iter()
        .zip(banners)
        .map(|(factory, banner)| factory.path.clone().or(banner))
        .collect();

    let renamed = rename_parameters(&mut scope, &program, &layout);
    scope.apply_renames(&allocator, &mut program);
    tracing::debug!(renamed, "factory parameters renamed");

    let mut extractor = BodyExtractor {
        ast: AstBuilder::new(&allocator),
        wanted: layout
            .factories
            .iter()
            .enumerate()
            .map(|(index, factory)| (factory.body, index))
            .collect(),
        bodies: layout.factories.iter().map(|_| None).collect(),
    };
    extractor.visit_program(&mut program);

    let ast = AstBuilder::new(&allocator);
    let mut modules = Vec::with_capacity(layout.factories.len());
    for ((factory, body), hint) in layout.factories.iter().zip(extractor.bodies).zip(&hints) {
        let (directives, statements) = body.unwrap_or_else(|| (ast.vec(), ast.vec()));
        let comments = ast.vec_from_iter(
            program
                .comments
                .iter()
                .filter(|comment| factory.body.contains_inclusive(comment.span))
                .copied(),
        );
        let module_program = Program {
            span: factory.body,
            source_type: program.source_type,
            source_text: program.source_text,
            comments,
            hashbang: None,
            directives,
            body: statements,
            scope_id: Cell::new(None),
        };
        modules.push(Module {
            id: factory.id.clone(),
            code: ast::print(&module_program),
            is_entry: layout.is_entry(&factory.id),
            path_hint: hint.clone(),
        });
    }

    Ok(UnpackResult {
        module_id_mapping: module_mapping(&layout, &hints),
        modules,
    })
}

/// Reads and unpacks one bundle file.
pub fn unpack_file(path: &Path) -> Result<UnpackResult, Error> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(unpack(&source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::normalize;

    fn module<'r>(result: &'r UnpackResult, id: impl Into<ModuleId>) -> &'r Module {
        let id = id.into();
        result
            .modules
            .iter()
            .find(|module| module.id == id)
            .unwrap_or_else(|| panic!("module {id} missing"))
    }

    #[track_caller]
    fn assert_code(module: &Module, expected: &str) {
        assert_eq!(normalize(&module.code), normalize(expected), "\nmodule {}:\n{}", module.id, module.code);
    }

    #[test]
    fn test_plain_script_is_unrecognized() {
        let error = unpack("console.log('hello');\nfunction f() { return 1; }").unwrap_err();
        assert!(matches!(error, UnpackError::UnrecognizedBundleFormat));
    }

    #[test]
    fn test_parse_error() {
        let error = unpack("!function(e){(}([])").unwrap_err();
        assert!(matches!(error, UnpackError::Parse(_)));
    }

    #[test]
    fn test_parameter_rename_avoids_collisions() {
        let result = unpack(
            r#"
!function(e){var t={};function n(r){var o=t[r]={exports:{}};return e[r].call(o.exports,o,o.exports,n),o.exports}n.s=0,n(0)}([
function(e,t,n){var module=1;console.log(e,module,n)},
function(e,t,n){e.exports=require("fs")},
function(e,t,n){function r(){var exports=2;return exports}e.exports=r}
]);
"#,
        )
        .unwrap();
        assert_code(module(&result, 0), "var module = 1; console.log(e, module, require);");
        assert_code(module(&result, 1), r#"module.exports = require("fs");"#);
        assert_code(
            module(&result, 2),
            "function r() { var exports = 2; return exports; } module.exports = r;",
        );
    }

    #[test]
    fn test_unpack_missing_file() {
        let error = unpack_file(Path::new("does/not/exist.js")).unwrap_err();
        assert!(matches!(error, Error::Io { .. }));
    }

    #[test]
    fn test_string_and_number_keys_share_ids() {
        assert_eq!(named_id("12"), ModuleId::Number(12));
        assert_eq!(named_id("012"), ModuleId::from("012"));
        assert_eq!(named_id("./a.js"), ModuleId::from("./a.js"));
    }
}
