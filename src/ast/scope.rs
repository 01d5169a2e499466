use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_ast_visit::VisitMut;
use oxc_semantic::{Scoping, SemanticBuilder};
use oxc_span::Span;
use oxc_syntax::reference::ReferenceId;
use oxc_syntax::scope::ScopeId;
use oxc_syntax::symbol::SymbolId;
use rustc_hash::{FxHashMap, FxHashSet};

use super::identifier::{is_reserved_word, to_identifier};
use super::rename::Renamer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub symbol: SymbolId,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSite {
    pub id: ReferenceId,
    pub is_write: bool,
}

/// Binding and reference view of one program.
///
/// Renames take effect in the view immediately and are written back to the
/// tree by [`ScopeTree::apply_renames`]. Any other structural edit to the
/// tree leaves the view stale; rebuild it with [`ScopeTree::build`].
pub struct ScopeTree {
    scoping: Scoping,
    /// Names handed out by [`ScopeTree::generate_collision_free_name`].
    reserved: FxHashSet<String>,
    renamed: FxHashSet<SymbolId>,
    merged: FxHashMap<SymbolId, SymbolId>,
}

impl ScopeTree {
    pub fn build(program: &Program<'_>) -> Self {
        let semantic = SemanticBuilder::new()
            .with_scope_tree_child_ids(true)
            .build(program)
            .semantic;
        Self {
            scoping: semantic.into_scoping(),
            reserved: FxHashSet::default(),
            renamed: FxHashSet::default(),
            merged: FxHashMap::default(),
        }
    }

    pub fn scoping(&self) -> &Scoping {
        &self.scoping
    }

    pub fn root_scope(&self) -> ScopeId {
        self.scoping.root_scope_id()
    }

    pub fn is_declared(&self, scope: ScopeId, name: &str) -> bool {
        self.scoping.find_binding(scope, name).is_some()
    }

    pub fn find_declaration(&self, scope: ScopeId, name: &str) -> Option<Binding> {
        self.scoping.find_binding(scope, name).map(|symbol| self.binding(symbol))
    }

    pub fn binding(&self, symbol: SymbolId) -> Binding {
        Binding {
            symbol,
            scope: self.scoping.symbol_scope_id(symbol),
            span: self.scoping.symbol_span(symbol),
        }
    }

    pub fn find_all_references(&self, scope: ScopeId, name: &str) -> Vec<ReferenceSite> {
        match self.scoping.find_binding(scope, name) {
            Some(symbol) => self.references(symbol),
            None => Vec::new(),
        }
    }

    pub fn references(&self, symbol: SymbolId) -> Vec<ReferenceSite> {
        self.scoping
            .get_resolved_reference_ids(symbol)
            .iter()
            .map(|&id| ReferenceSite {
                id,
                is_write: self.scoping.get_reference(id).is_write(),
            })
            .collect()
    }

    pub fn symbol_of_reference(&self, reference: ReferenceId) -> Option<SymbolId> {
        self.scoping.get_reference(reference).symbol_id()
    }

    pub fn symbol_name(&self, symbol: SymbolId) -> &str {
        self.scoping.symbol_name(symbol)
    }

    pub fn symbol_scope(&self, symbol: SymbolId) -> ScopeId {
        self.scoping.symbol_scope_id(symbol)
    }

    pub fn has_writes(&self, symbol: SymbolId) -> bool {
        self.references(symbol).iter().any(|reference| reference.is_write)
    }

    pub fn read_count(&self, symbol: SymbolId) -> usize {
        self.scoping
            .get_resolved_reference_ids(symbol)
            .iter()
            .filter(|&&id| self.scoping.get_reference(id).is_read())
            .count()
    }

    pub fn is_unresolved(&self, name: &str) -> bool {
        self.scoping.root_unresolved_references().contains_key(name)
    }

    /// Strict descendants of `scope`, walked through the recorded child ids.
    fn descendants(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        self.scoping.iter_all_scope_child_ids(scope)
    }

    /// `name` is bound in a strict descendant of `scope`.
    pub fn is_shadowed_below(&self, scope: ScopeId, name: &str) -> bool {
        self.descendants(scope)
            .any(|descendant| self.scoping.get_binding(descendant, name).is_some())
    }

    /// `name` is bound in `scope`, one of its ancestors or one of its descendants.
    pub fn is_bound_around(&self, scope: ScopeId, name: &str) -> bool {
        self.scoping.find_binding(scope, name).is_some() || self.is_shadowed_below(scope, name)
    }

    pub fn is_name_taken(&self, scope: ScopeId, name: &str) -> bool {
        is_reserved_word(name)
            || self.reserved.contains(name)
            || self.is_unresolved(name)
            || self.is_bound_around(scope, name)
    }

    /// Sanitizes `base` and appends `_1`, `_2`, ... until the result is free
    /// in `scope`. The returned name counts as taken from then on.
    pub fn generate_collision_free_name(&mut self, base: &str, scope: ScopeId) -> String {
        let base = to_identifier(base);
        let mut name = base.clone();
        let mut suffix = 1;
        while self.is_name_taken(scope, &name) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.reserved.insert(name.clone());
        name
    }

    /// Renames the binding of `old` visible from `scope` and rewrites every
    /// declaration and reference site in `program`.
    pub fn rename<'a>(
        &mut self,
        allocator: &'a Allocator,
        program: &mut Program<'a>,
        scope: ScopeId,
        old: &str,
        new: &str,
    ) -> bool {
        let Some(symbol) = self.scoping.find_binding(scope, old) else {
            return false;
        };
        self.rename_symbol(symbol, new);
        self.apply_renames(allocator, program);
        true
    }

    /// Records a rename in the view. The tree is rewritten by
    /// [`ScopeTree::apply_renames`].
    pub fn rename_symbol(&mut self, symbol: SymbolId, new_name: &str) {
        if self.scoping.symbol_name(symbol) == new_name {
            return;
        }
        let scope = self.scoping.symbol_scope_id(symbol);
        self.scoping.rename_symbol(symbol, scope, new_name);
        self.reserved.insert(new_name.to_string());
        self.renamed.insert(symbol);
    }

    /// Every site of `duplicate` will be written with the name of `primary`.
    pub fn merge_symbol_into(&mut self, duplicate: SymbolId, primary: SymbolId) {
        if duplicate != primary {
            self.merged.insert(duplicate, primary);
        }
    }

    pub fn has_pending_renames(&self) -> bool {
        !self.renamed.is_empty() || !self.merged.is_empty()
    }

    pub fn apply_renames<'a>(&mut self, allocator: &'a Allocator, program: &mut Program<'a>) {
        if !self.has_pending_renames() {
            return;
        }
        let mut renamer = Renamer::new(allocator, &self.scoping, &self.renamed, &self.merged);
        renamer.visit_program(program);
        self.renamed.clear();
        self.merged.clear();
    }
}

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;

    use super::*;
    use crate::ast::parse;

    fn function_scopes(scope: &ScopeTree) -> Vec<ScopeId> {
        scope
            .scoping()
            .scope_descendants_from_root()
            .filter(|&id| scope.scoping().scope_flags(id).is_function())
            .collect()
    }

    #[test]
    fn test_shadowed_below_only_looks_down() {
        let allocator = Allocator::default();
        let program = parse(&allocator, "function outer(a) { function inner(b) { let c; } }").unwrap();
        let scope = ScopeTree::build(&program);
        let root = scope.root_scope();
        let [outer, inner] = function_scopes(&scope)[..] else {
            panic!("expected two function scopes");
        };

        assert!(scope.is_shadowed_below(root, "b"));
        assert!(scope.is_shadowed_below(root, "c"));
        assert!(scope.is_shadowed_below(outer, "c"));
        assert!(!scope.is_shadowed_below(inner, "a"));
        assert!(!scope.is_shadowed_below(inner, "b"));
        assert!(scope.is_bound_around(inner, "a"));
        assert!(!scope.is_bound_around(outer, "d"));
    }

    #[test]
    fn test_collision_free_name_skips_inner_bindings() {
        let allocator = Allocator::default();
        let program = parse(&allocator, "const a = 1; function f() { const b = 2; }").unwrap();
        let mut scope = ScopeTree::build(&program);
        let root = scope.root_scope();

        assert_eq!(scope.generate_collision_free_name("b", root), "b_1");
        assert_eq!(scope.generate_collision_free_name("b", root), "b_2");
    }
}
