use std::cell::Cell;

use oxc_allocator::Allocator;
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::walk_mut::{
    walk_assignment_target_property, walk_binding_property, walk_object_property,
};
use oxc_ast_visit::VisitMut;
use oxc_semantic::Scoping;
use oxc_syntax::symbol::SymbolId;
use rustc_hash::{FxHashMap, FxHashSet};

/// Writes renamed and merged symbol names back into the tree, expanding
/// shorthand properties whose binding changes name.
pub struct Renamer<'s, 'a> {
    ast: AstBuilder<'a>,
    scoping: &'s Scoping,
    renamed: &'s FxHashSet<SymbolId>,
    merged: &'s FxHashMap<SymbolId, SymbolId>,
}

impl<'s, 'a> Renamer<'s, 'a> {
    pub fn new(
        allocator: &'a Allocator,
        scoping: &'s Scoping,
        renamed: &'s FxHashSet<SymbolId>,
        merged: &'s FxHashMap<SymbolId, SymbolId>,
    ) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
            scoping,
            renamed,
            merged,
        }
    }

    fn target_name(&self, symbol: SymbolId) -> Option<&'s str> {
        if !self.renamed.contains(&symbol) && !self.merged.contains_key(&symbol) {
            return None;
        }
        let mut target = symbol;
        while let Some(&next) = self.merged.get(&target) {
            target = next;
        }
        Some(self.scoping.symbol_name(target))
    }

    fn binding_name(&self, ident: &BindingIdentifier<'a>) -> Option<&'s str> {
        ident.symbol_id.get().and_then(|symbol| self.target_name(symbol))
    }

    fn reference_name(&self, ident: &IdentifierReference<'a>) -> Option<&'s str> {
        ident
            .reference_id
            .get()
            .and_then(|reference| self.scoping.get_reference(reference).symbol_id())
            .and_then(|symbol| self.target_name(symbol))
    }

    fn pattern_changes_name(&self, pattern: &BindingPattern<'a>) -> bool {
        match &pattern.kind {
            BindingPatternKind::BindingIdentifier(ident) => self.binding_name(ident).is_some(),
            BindingPatternKind::AssignmentPattern(assign) => self.pattern_changes_name(&assign.left),
            _ => false,
        }
    }
}

impl<'a> VisitMut<'a> for Renamer<'_, 'a> {
    fn visit_binding_identifier(&mut self, it: &mut BindingIdentifier<'a>) {
        if let Some(name) = self.binding_name(it) {
            if it.name.as_str() != name {
                it.name = self.ast.atom(name);
            }
        }
    }

    fn visit_identifier_reference(&mut self, it: &mut IdentifierReference<'a>) {
        if let Some(name) = self.reference_name(it) {
            if it.name.as_str() != name {
                it.name = self.ast.atom(name);
            }
        }
    }

    fn visit_object_property(&mut self, it: &mut ObjectProperty<'a>) {
        if it.shorthand {
            if let Expression::Identifier(ident) = &it.value {
                if self.reference_name(ident).is_some() {
                    it.shorthand = false;
                }
            }
        }
        walk_object_property(self, it);
    }

    fn visit_binding_property(&mut self, it: &mut BindingProperty<'a>) {
        if it.shorthand && self.pattern_changes_name(&it.value) {
            it.shorthand = false;
        }
        walk_binding_property(self, it);
    }

    fn visit_assignment_target_property(&mut self, it: &mut AssignmentTargetProperty<'a>) {
        if let AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(prop) = it {
            if self.reference_name(&prop.binding).is_some() {
                let span = prop.span;
                let key = PropertyKey::StaticIdentifier(self.ast.alloc(IdentifierName {
                    span: prop.binding.span,
                    name: prop.binding.name,
                }));
                let target = self.ast.alloc(IdentifierReference {
                    span: prop.binding.span,
                    name: prop.binding.name,
                    reference_id: Cell::new(prop.binding.reference_id.get()),
                });
                let binding = match prop.init.take() {
                    Some(init) => AssignmentTargetMaybeDefault::AssignmentTargetWithDefault(
                        self.ast.alloc(AssignmentTargetWithDefault {
                            span,
                            binding: AssignmentTarget::AssignmentTargetIdentifier(target),
                            init,
                        }),
                    ),
                    None => AssignmentTargetMaybeDefault::AssignmentTargetIdentifier(target),
                };
                *it = AssignmentTargetProperty::AssignmentTargetPropertyProperty(self.ast.alloc(
                    AssignmentTargetPropertyProperty {
                        span,
                        name: key,
                        binding,
                        computed: false,
                    },
                ));
            }
        }
        walk_assignment_target_property(self, it);
    }
}

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;

    use crate::ast::{parse, print, scope::ScopeTree};
    use crate::test_utils::normalize;

    fn rename_in_root(code: &str, old: &str, new: &str) -> String {
        let allocator = Allocator::default();
        let source = allocator.alloc_str(code);
        let mut program = parse(&allocator, source).unwrap();
        let mut scope = ScopeTree::build(&program);
        let root = scope.root_scope();
        assert!(scope.rename(&allocator, &mut program, root, old, new));
        print(&program)
    }

    #[test]
    fn test_rename_updates_every_site() {
        let output = rename_in_root("const a = 1; function f() { return a + 1; } a++;", "a", "count");
        assert_eq!(
            normalize(&output),
            normalize("const count = 1; function f() { return count + 1; } count++;")
        );
    }

    #[test]
    fn test_rename_respects_shadowing() {
        let output = rename_in_root("let a = 1; function f(a) { return a; } g(a);", "a", "b");
        assert_eq!(
            normalize(&output),
            normalize("let b = 1; function f(a) { return a; } g(b);")
        );
    }

    #[test]
    fn test_rename_expands_shorthand() {
        let output = rename_in_root(
            "const a = 1; const o = { a }; const { a: x } = o; let y; ({ y } = o);",
            "a",
            "b",
        );
        assert_eq!(
            normalize(&output),
            normalize("const b = 1; const o = { a: b }; const { a: x } = o; let y; ({ y } = o);")
        );

        let output = rename_in_root("let y; ({ y = 2 } = o);", "y", "z");
        assert_eq!(normalize(&output), normalize("let z; ({ y: z = 2 } = o);"));
    }
}
