use std::cell::Cell;

use oxc_allocator::{Allocator, CloneIn, TakeIn, Vec as ArenaVec};
use oxc_ast::{ast::*, AstBuilder, NONE};
use oxc_ast_visit::walk::walk_statement;
use oxc_ast_visit::walk_mut::{walk_expression, walk_object_property, walk_statements};
use oxc_ast_visit::{Visit, VisitMut};
use oxc_span::{GetSpan, Span, SPAN};
use oxc_syntax::reference::ReferenceId;
use oxc_syntax::symbol::SymbolId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::build;
use crate::ast::comments::CommentMoves;
use crate::ast::identifier::to_identifier;
use crate::ast::matchers::is_primitive_literal;
use crate::ast::scope::ScopeTree;
use crate::pipeline::pass::{PassContext, TreePass};

/// Most holes tolerated between two recovered array elements.
const MAX_ARRAY_HOLES: u32 = 2;

/// Undoes minifier-style temporaries:
///
/// * `const t = e; use(t)` with a single read becomes `use(e)`, literals too;
/// * runs of `const t = e.x; const n = e.y;` become `const { x, y } = e;`
///   with the locals renamed after the keys, and `e[0]`, `e[1]` runs become
///   array patterns.
///
/// Inlining runs again after destructuring since grouping exposes new aliases.
pub struct SmartInline;

impl TreePass for SmartInline {
    fn id(&self) -> &'static str {
        "smart-inline"
    }

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        let inlined = inline_aliases(ctx.allocator, program);
        let grouped = reconstruct_destructuring(ctx.allocator, program);
        let inlined_again = inline_aliases(ctx.allocator, program);
        tracing::debug!(inlined = inlined + inlined_again, grouped, "smart inline done");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Alias inlining
// ---------------------------------------------------------------------------

enum AliasValue<'a> {
    Identifier {
        name: Atom<'a>,
        reference: Option<ReferenceId>,
    },
    Literal(Expression<'a>),
}

impl<'a> AliasValue<'a> {
    fn to_expression(&self, ast: &AstBuilder<'a>, span: Span) -> Expression<'a> {
        match self {
            Self::Identifier { name, reference } => Expression::Identifier(ast.alloc(IdentifierReference {
                span,
                name: *name,
                reference_id: Cell::new(*reference),
            })),
            Self::Literal(literal) => literal.clone_in(ast.allocator),
        }
    }
}

struct AliasCandidate<'a> {
    symbol: SymbolId,
    /// The single read of `symbol`.
    reference: ReferenceId,
    value: AliasValue<'a>,
}

struct AliasCollector<'s, 'a> {
    allocator: &'a Allocator,
    scope: &'s ScopeTree,
    candidates: Vec<AliasCandidate<'a>>,
}

impl<'s, 'a> AliasCollector<'s, 'a> {
    fn consider(&mut self, declarator: &VariableDeclarator<'a>) {
        let BindingPatternKind::BindingIdentifier(ident) = &declarator.id.kind else {
            return;
        };
        let (Some(symbol), Some(init)) = (ident.symbol_id.get(), declarator.init.as_ref()) else {
            return;
        };
        let references = self.scope.references(symbol);
        if references.len() != 1 || references[0].is_write {
            return;
        }

        let value = match init.get_inner_expression() {
            Expression::Identifier(target) => {
                if target.name == ident.name {
                    return;
                }
                let target_symbol = target
                    .reference_id
                    .get()
                    .and_then(|reference| self.scope.symbol_of_reference(reference));
                if target_symbol.is_some_and(|target_symbol| self.scope.has_writes(target_symbol)) {
                    return;
                }
                if self.scope.is_shadowed_below(self.scope.symbol_scope(symbol), &target.name) {
                    return;
                }
                AliasValue::Identifier {
                    name: target.name,
                    reference: target.reference_id.get(),
                }
            }
            literal if declarator.kind == VariableDeclarationKind::Const && is_primitive_literal(literal) => {
                AliasValue::Literal(literal.clone_in(self.allocator))
            }
            _ => return,
        };

        self.candidates.push(AliasCandidate {
            symbol,
            reference: references[0].id,
            value,
        });
    }
}

impl<'a> Visit<'a> for AliasCollector<'_, 'a> {
    fn visit_statement(&mut self, it: &Statement<'a>) {
        if let Statement::VariableDeclaration(var_decl) = it {
            if matches!(var_decl.kind, VariableDeclarationKind::Const | VariableDeclarationKind::Let) {
                for declarator in &var_decl.declarations {
                    self.consider(declarator);
                }
            }
        }
        walk_statement(self, it);
    }
}

/// Follows alias chains (`n -> t -> e`) to the value that ends up at each
/// replaced reference.
fn resolve_replacements(candidates: &[AliasCandidate<'_>]) -> FxHashMap<ReferenceId, usize> {
    let by_reference: FxHashMap<ReferenceId, usize> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| (candidate.reference, index))
        .collect();

    let mut replacements = FxHashMap::default();
    'candidates: for (index, candidate) in candidates.iter().enumerate() {
        let mut current = index;
        let mut steps = 0;
        while let AliasValue::Identifier { reference: Some(next), .. } = &candidates[current].value {
            match by_reference.get(next) {
                Some(&next_index) => {
                    current = next_index;
                    steps += 1;
                    if steps > candidates.len() {
                        continue 'candidates;
                    }
                }
                None => break,
            }
        }
        replacements.insert(candidate.reference, current);
    }
    replacements
}

struct AliasInliner<'r, 'a> {
    ast: AstBuilder<'a>,
    candidates: &'r [AliasCandidate<'a>],
    replacements: &'r FxHashMap<ReferenceId, usize>,
    replaced: FxHashSet<ReferenceId>,
}

impl<'r, 'a> AliasInliner<'r, 'a> {
    fn replacement_for(&self, ident: &IdentifierReference<'a>) -> Option<(ReferenceId, usize)> {
        let reference = ident.reference_id.get()?;
        self.replacements.get(&reference).map(|&index| (reference, index))
    }
}

impl<'a> VisitMut<'a> for AliasInliner<'_, 'a> {
    fn visit_expression(&mut self, it: &mut Expression<'a>) {
        if let Expression::Identifier(ident) = it {
            if let Some((reference, index)) = self.replacement_for(ident) {
                let span = ident.span;
                *it = self.candidates[index].value.to_expression(&self.ast, span);
                self.replaced.insert(reference);
                return;
            }
        }
        walk_expression(self, it);
    }

    fn visit_object_property(&mut self, it: &mut ObjectProperty<'a>) {
        if it.shorthand {
            if let Expression::Identifier(ident) = &it.value {
                if self.replacement_for(ident).is_some() {
                    it.shorthand = false;
                }
            }
        }
        walk_object_property(self, it);
    }
}

/// Deletes the declarators of inlined symbols, carrying the comments of
/// emptied statements over to the next statement.
struct DeclaratorRemover<'r> {
    symbols: &'r FxHashSet<SymbolId>,
    comments: CommentMoves,
}

impl<'r> DeclaratorRemover<'r> {
    fn is_removed(&self, declarator: &VariableDeclarator<'_>) -> bool {
        match &declarator.id.kind {
            BindingPatternKind::BindingIdentifier(ident) => {
                ident.symbol_id.get().is_some_and(|symbol| self.symbols.contains(&symbol))
            }
            _ => false,
        }
    }
}

impl<'a> VisitMut<'a> for DeclaratorRemover<'_> {
    fn visit_statements(&mut self, it: &mut ArenaVec<'a, Statement<'a>>) {
        walk_statements(self, it);

        let mut keep = Vec::with_capacity(it.len());
        for stmt in it.iter_mut() {
            let emptied = match stmt {
                Statement::VariableDeclaration(var_decl) if !var_decl.declarations.is_empty() => {
                    var_decl.declarations.retain(|declarator| !self.is_removed(declarator));
                    var_decl.declarations.is_empty()
                }
                _ => false,
            };
            keep.push(!emptied);
        }
        if keep.iter().all(|&kept| kept) {
            return;
        }

        for (index, stmt) in it.iter().enumerate() {
            if keep[index] {
                continue;
            }
            if let Some(next) = (index + 1..it.len()).find(|&next| keep[next]) {
                self.comments.push(stmt.span().start, it[next].span().start);
            }
        }
        let mut index = 0;
        it.retain(|_| {
            let kept = keep[index];
            index += 1;
            kept
        });
    }
}

/// Returns how many references were inlined.
fn inline_aliases<'a>(allocator: &'a Allocator, program: &mut Program<'a>) -> usize {
    let scope = ScopeTree::build(program);
    let mut collector = AliasCollector {
        allocator,
        scope: &scope,
        candidates: Vec::new(),
    };
    collector.visit_program(program);
    let candidates = collector.candidates;
    if candidates.is_empty() {
        return 0;
    }

    let replacements = resolve_replacements(&candidates);
    let mut inliner = AliasInliner {
        ast: AstBuilder::new(allocator),
        candidates: &candidates,
        replacements: &replacements,
        replaced: FxHashSet::default(),
    };
    inliner.visit_program(program);
    let replaced = inliner.replaced;

    let symbols: FxHashSet<SymbolId> = candidates
        .iter()
        .filter(|candidate| replaced.contains(&candidate.reference))
        .map(|candidate| candidate.symbol)
        .collect();
    let mut remover = DeclaratorRemover {
        symbols: &symbols,
        comments: CommentMoves::default(),
    };
    remover.visit_program(program);
    remover.comments.apply(&mut program.comments);

    replaced.len()
}

// ---------------------------------------------------------------------------
// Destructuring reconstruction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ObjectKey {
    Symbol(SymbolId),
    Global(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AccessKey {
    Named(String),
    Index(u32),
}

/// `K x = obj.key;` with `x` never reassigned.
#[derive(Debug, Clone)]
struct Access {
    object: ObjectKey,
    object_name: String,
    object_reference: Option<ReferenceId>,
    key: AccessKey,
    local: SymbolId,
    kind: VariableDeclarationKind,
}

fn member_access<'b>(expr: &'b Expression<'_>) -> Option<(&'b IdentifierReference<'b>, AccessKey)> {
    match expr.get_inner_expression() {
        Expression::StaticMemberExpression(member) if !member.optional => match &member.object {
            Expression::Identifier(object) => Some((object, AccessKey::Named(member.property.name.to_string()))),
            _ => None,
        },
        Expression::ComputedMemberExpression(member) if !member.optional => {
            let Expression::Identifier(object) = &member.object else {
                return None;
            };
            match &member.expression {
                Expression::StringLiteral(key) => Some((object, AccessKey::Named(key.value.to_string()))),
                Expression::NumericLiteral(key)
                    if key.value.fract() == 0.0 && key.value >= 0.0 && key.value <= f64::from(u32::MAX) =>
                {
                    Some((object, AccessKey::Index(key.value as u32)))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn classify(stmt: &Statement<'_>, scope: &ScopeTree) -> Option<Access> {
    let Statement::VariableDeclaration(var_decl) = stmt else {
        return None;
    };
    if var_decl.declarations.len() != 1 || var_decl.declare {
        return None;
    }
    let declarator = &var_decl.declarations[0];
    let BindingPatternKind::BindingIdentifier(ident) = &declarator.id.kind else {
        return None;
    };
    if declarator.id.type_annotation.is_some() {
        return None;
    }
    let local = ident.symbol_id.get()?;
    if scope.has_writes(local) {
        return None;
    }
    let (object, key) = member_access(declarator.init.as_ref()?)?;

    let reference = object.reference_id.get();
    let object_key = match reference.and_then(|reference| scope.symbol_of_reference(reference)) {
        Some(symbol) if symbol == local => return None,
        Some(symbol) => ObjectKey::Symbol(symbol),
        None if scope.symbol_name(local) == object.name.as_str() => return None,
        None => ObjectKey::Global(object.name.to_string()),
    };

    Some(Access {
        object: object_key,
        object_name: object.name.to_string(),
        object_reference: reference,
        key,
        local,
        kind: var_decl.kind,
    })
}

#[derive(Debug)]
struct Entry {
    locals: Vec<SymbolId>,
    statements: Vec<usize>,
}

/// One destructuring declaration to emit.
#[derive(Debug)]
enum Group {
    Object(Vec<(String, Entry)>),
    Array(Vec<(u32, Entry)>),
}

impl Group {
    fn statements(&self) -> Vec<usize> {
        let mut statements: Vec<usize> = match self {
            Self::Object(entries) => entries.iter().flat_map(|(_, e)| e.statements.iter().copied()).collect(),
            Self::Array(entries) => entries.iter().flat_map(|(_, e)| e.statements.iter().copied()).collect(),
        };
        statements.sort_unstable();
        statements
    }
}

struct RunPlan {
    object_name: String,
    object_reference: Option<ReferenceId>,
    kind: VariableDeclarationKind,
    groups: Vec<Group>,
}

struct DestructuringBuilder<'s, 'a> {
    ast: AstBuilder<'a>,
    scope: &'s mut ScopeTree,
    comments: CommentMoves,
    grouped: usize,
}

impl<'s, 'a> DestructuringBuilder<'s, 'a> {
    /// Records one access under `key`, reusing the entry of an earlier
    /// access of the same key.
    fn add_entry<K: PartialEq>(entries: &mut Vec<(K, Entry)>, key: K, local: SymbolId, position: usize) {
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, entry)) => {
                entry.locals.push(local);
                entry.statements.push(position);
            }
            None => entries.push((
                key,
                Entry {
                    locals: vec![local],
                    statements: vec![position],
                },
            )),
        }
    }

    /// Splits the accesses of one run into an object group and an array
    /// group, leaving out what cannot be expressed.
    fn plan_run(&self, accesses: &[(usize, &Access)]) -> Option<RunPlan> {
        let mut named: Vec<(String, Entry)> = Vec::new();
        let mut indexed: Vec<(u32, Entry)> = Vec::new();
        for &(position, access) in accesses {
            match &access.key {
                AccessKey::Named(key) => Self::add_entry(&mut named, key.clone(), access.local, position),
                AccessKey::Index(index) => Self::add_entry(&mut indexed, *index, access.local, position),
            }
        }

        indexed.sort_by_key(|(index, _)| *index);
        let mut previous: Option<u32> = None;
        let mut dense = 0;
        for (index, _) in &indexed {
            let holes = match previous {
                Some(previous) => index - previous - 1,
                None => *index,
            };
            if holes > MAX_ARRAY_HOLES {
                break;
            }
            previous = Some(*index);
            dense += 1;
        }
        indexed.truncate(dense);

        let mut groups = Vec::new();
        if !named.is_empty() {
            groups.push(Group::Object(named));
        }
        if !indexed.is_empty() {
            groups.push(Group::Array(indexed));
        }
        if groups.is_empty() {
            return None;
        }
        groups.sort_by_key(|group| group.statements().first().copied().unwrap_or(usize::MAX));

        let (_, first) = accesses.first()?;
        Some(RunPlan {
            object_name: first.object_name.clone(),
            object_reference: first.object_reference,
            kind: first.kind,
            groups,
        })
    }

    fn object_pattern(&mut self, entries: &[(String, Entry)]) -> BindingPattern<'a> {
        let mut properties = self.ast.vec();
        for (key, entry) in entries {
            let primary = entry.locals[0];
            let desired = to_identifier(key);
            let local = if self.scope.symbol_name(primary) == desired {
                desired
            } else {
                let naming_scope = self.scope.symbol_scope(primary);
                let local = self.scope.generate_collision_free_name(&desired, naming_scope);
                self.scope.rename_symbol(primary, &local);
                local
            };
            for &duplicate in &entry.locals[1..] {
                self.scope.merge_symbol_into(duplicate, primary);
            }
            properties.push(build::binding_property(&self.ast, key, &local, Some(primary)));
        }
        build::object_pattern(&self.ast, properties)
    }

    fn array_pattern(&mut self, entries: &[(u32, Entry)]) -> BindingPattern<'a> {
        let mut elements = self.ast.vec();
        let mut next = 0;
        for (index, entry) in entries {
            while next < *index {
                elements.push(None);
                next += 1;
            }
            let primary = entry.locals[0];
            for &duplicate in &entry.locals[1..] {
                self.scope.merge_symbol_into(duplicate, primary);
            }
            let name = self.scope.symbol_name(primary).to_string();
            elements.push(Some(build::binding_pattern(&self.ast, &name, Some(primary))));
            next += 1;
        }
        self.ast.binding_pattern(
            BindingPatternKind::ArrayPattern(self.ast.alloc(ArrayPattern {
                span: SPAN,
                elements,
                rest: None,
            })),
            NONE,
            false,
        )
    }

    fn rebuild(&mut self, stmts: &mut ArenaVec<'a, Statement<'a>>) {
        let accesses: Vec<Option<Access>> = stmts.iter().map(|stmt| classify(stmt, &*self.scope)).collect();

        // Maximal runs over the same object and declaration kind.
        let mut plans: Vec<(usize, usize, RunPlan)> = Vec::new();
        let mut start = 0;
        while start < accesses.len() {
            let Some(first) = &accesses[start] else {
                start += 1;
                continue;
            };
            let mut end = start + 1;
            while let Some(Some(next)) = accesses.get(end) {
                if next.object != first.object || next.kind != first.kind {
                    break;
                }
                end += 1;
            }

            let run: Vec<(usize, &Access)> = (start..end)
                .filter_map(|position| accesses[position].as_ref().map(|access| (position, access)))
                .collect();
            if let Some(plan) = self.plan_run(&run) {
                plans.push((start, end, plan));
            }
            start = end;
        }
        if plans.is_empty() {
            return;
        }

        let mut slots: Vec<Option<Statement<'a>>> =
            stmts.iter_mut().map(|stmt| Some(stmt.take_in(self.ast.allocator))).collect();
        let mut replacements: FxHashMap<usize, Vec<Statement<'a>>> = FxHashMap::default();

        for (run_start, run_end, plan) in plans {
            let mut emitted = Vec::new();
            let mut absorbed: FxHashSet<usize> = FxHashSet::default();
            for group in &plan.groups {
                let positions = group.statements();
                let Some(&first) = positions.first() else {
                    continue;
                };
                let span = slots[first].as_ref().map_or(SPAN, |stmt| stmt.span());
                for &position in &positions[1..] {
                    if let Some(stmt) = &slots[position] {
                        self.comments.push(stmt.span().start, span.start);
                    }
                }
                absorbed.extend(positions.iter().copied());

                let pattern = match group {
                    Group::Object(entries) => self.object_pattern(entries),
                    Group::Array(entries) => self.array_pattern(entries),
                };
                let init = Expression::Identifier(self.ast.alloc(IdentifierReference {
                    span: SPAN,
                    name: self.ast.atom(&plan.object_name),
                    reference_id: Cell::new(plan.object_reference),
                }));
                emitted.push(build::variable_declaration(&self.ast, span, plan.kind, pattern, init));
                self.grouped += 1;
            }

            // Leftovers of the run follow the new declarations.
            for position in run_start..run_end {
                let stmt = slots[position].take();
                if !absorbed.contains(&position) {
                    emitted.extend(stmt);
                }
            }
            replacements.insert(run_start, emitted);
        }

        let mut rebuilt = self.ast.vec_with_capacity(slots.len());
        for (position, slot) in slots.into_iter().enumerate() {
            if let Some(emitted) = replacements.remove(&position) {
                rebuilt.extend(emitted);
            }
            if let Some(stmt) = slot {
                rebuilt.push(stmt);
            }
        }
        *stmts = rebuilt;
    }
}

impl<'a> VisitMut<'a> for DestructuringBuilder<'_, 'a> {
    fn visit_statements(&mut self, it: &mut ArenaVec<'a, Statement<'a>>) {
        self.rebuild(it);
        walk_statements(self, it);
    }
}

/// Returns how many destructuring declarations were created.
fn reconstruct_destructuring<'a>(allocator: &'a Allocator, program: &mut Program<'a>) -> usize {
    let mut scope = ScopeTree::build(program);
    let mut builder = DestructuringBuilder {
        ast: AstBuilder::new(allocator),
        scope: &mut scope,
        comments: CommentMoves::default(),
        grouped: 0,
    };
    builder.visit_program(program);
    let grouped = builder.grouped;
    let comments = std::mem::take(&mut builder.comments);
    comments.apply(&mut program.comments);
    scope.apply_renames(allocator, program);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pass::Pass;
    use crate::test_utils::{assert_transform, normalize, run_pass};

    #[test]
    fn test_alias_chain() {
        assert_transform(
            Pass::tree(SmartInline),
            "const t = e; const n = t; console.log(n);",
            "console.log(e);",
        );
    }

    #[test]
    fn test_literal_alias() {
        assert_transform(Pass::tree(SmartInline), "const a = 1; f(a);", "f(1);");
    }

    #[test]
    fn test_alias_in_shorthand_property() {
        assert_transform(Pass::tree(SmartInline), "const t = e; f({ t });", "f({ t: e });");
    }

    #[test]
    fn test_reassigned_alias_is_kept() {
        let input = "let a = b; a = 2; f(a);";
        assert_transform(Pass::tree(SmartInline), input, input);
    }

    #[test]
    fn test_shadowed_target_is_kept() {
        let input = "const t = e; function g(e) { return t; }";
        assert_transform(Pass::tree(SmartInline), input, input);
    }

    #[test]
    fn test_object_destructuring() {
        assert_transform(
            Pass::tree(SmartInline),
            r#"
const t = e.x;
const n = e.y;
const r = e.color;
console.log(t, n, r);
"#,
            r#"
const { x, y, color } = e;
console.log(x, y, color);
"#,
        );
    }

    #[test]
    fn test_duplicate_keys_merge() {
        assert_transform(
            Pass::tree(SmartInline),
            "const t = e.size; const n = e.size; console.log(t, n);",
            "const { size } = e; console.log(size, size);",
        );
    }

    #[test]
    fn test_lonely_access_is_left_alone() {
        assert_transform(
            Pass::tree(SmartInline),
            "e.y; const t = e.x; use(t);",
            "e.y; const { x } = e; use(x);",
        );
    }

    #[test]
    fn test_conflicting_groups_of_different_objects() {
        assert_transform(
            Pass::tree(SmartInline),
            r#"
const t = e.size;
const n = e.color;
const r = f.size;
const a = f.color;
use(t, n, r, a);
"#,
            r#"
const { size, color } = e;
const { size: size_1, color: color_1 } = f;
use(size, color, size_1, color_1);
"#,
        );
    }

    #[test]
    fn test_key_collides_with_parameter() {
        assert_transform(
            Pass::tree(SmartInline),
            "function f(color) { const t = e.color; return t + color; }",
            "function f(color) { const { color: color_1 } = e; return color_1 + color; }",
        );
    }

    #[test]
    fn test_non_identifier_key() {
        assert_transform(
            Pass::tree(SmartInline),
            r#"const t = e["data-id"]; use(t);"#,
            r#"const { "data-id": dataId } = e; use(dataId);"#,
        );
    }

    #[test]
    fn test_array_destructuring() {
        assert_transform(
            Pass::tree(SmartInline),
            "const t = e[0]; const n = e[1]; const r = e[2]; use(t, n, r);",
            "const [t, n, r] = e; use(t, n, r);",
        );
    }

    #[test]
    fn test_array_holes_and_far_index() {
        assert_transform(
            Pass::tree(SmartInline),
            "const t = e[0]; const n = e[2]; const g = e[99]; use(t, n, g);",
            "const [t, , n] = e; const g = e[99]; use(t, n, g);",
        );
    }

    #[test]
    fn test_mixed_run_keeps_order() {
        assert_transform(
            Pass::tree(SmartInline),
            "var x1 = _expr[0]; var y1 = _expr[1]; var a = _expr.a; use(x1, y1, a);",
            "var [x1, y1] = _expr; var { a } = _expr; use(x1, y1, a);",
        );
    }

    #[test]
    fn test_renamed_object_in_nested_scope() {
        assert_transform(
            Pass::tree(SmartInline),
            r#"
var u = r.tag;
if (3 === u) {
  var i = u.tag;
  use(i);
}
"#,
            r#"
var { tag } = r;
if (3 === tag) {
  var { tag: tag_1 } = tag;
  use(tag_1);
}
"#,
        );
    }

    #[test]
    fn test_comments_follow_group() {
        let output = run_pass(
            Pass::tree(SmartInline),
            "// first\nconst t = e.x;\n// second\nconst n = e.y;\nuse(t, n);",
        );
        assert!(output.contains("// first"));
        assert!(output.contains("// second"));
        assert!(normalize(&output).contains("const{x,y}=e;use(x,y);"));
    }

    #[test]
    fn test_mixed_declaration_kinds_split_runs() {
        assert_transform(
            Pass::tree(SmartInline),
            "const t = e.x; let n = e.y; use(t, n);",
            "const { x } = e; let { y } = e; use(x, y);",
        );
    }

    #[test]
    fn test_reassigned_local_is_not_grouped() {
        assert_transform(
            Pass::tree(SmartInline),
            "const t = e.x; let n = e.y; n++; use(t, n);",
            "const { x } = e; let n = e.y; n++; use(x, n);",
        );
    }

    #[test]
    fn test_alias_declaration_without_reads_stays() {
        assert_transform(Pass::tree(SmartInline), "const t = e; const n = t;", "const n = e;");
    }
}
