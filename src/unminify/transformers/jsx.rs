use std::cell::Cell;

use oxc_allocator::{Allocator, Box as ArenaBox, CloneIn, TakeIn, Vec as ArenaVec};
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::walk::{walk_assignment_expression, walk_call_expression, walk_variable_declarator};
use oxc_ast_visit::walk_mut::{walk_arrow_function_expression, walk_expression};
use oxc_ast_visit::{Visit, VisitMut};
use oxc_semantic::ScopeFlags;
use oxc_span::{GetSpan, Span, SPAN};
use oxc_syntax::reference::ReferenceId;
use oxc_syntax::scope::ScopeId;
use oxc_syntax::symbol::SymbolId;
use rustc_hash::FxHashSet;

use crate::ast::build;
use crate::ast::comments::strip_pure_annotations;
use crate::ast::identifier::pascal_case;
use crate::ast::matchers::{indirect_call_target, is_boolean, is_null, is_true, is_undefined};
use crate::ast::scope::ScopeTree;
use crate::pipeline::options::JsxOptions;
use crate::pipeline::pass::{PassContext, TreePass};

/// Turns element factory calls (`React.createElement`, `jsx`, `h`, ...) back
/// into JSX.
pub struct UnJsx;

impl TreePass for UnJsx {
    fn id(&self) -> &'static str {
        "un-jsx"
    }

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        let config = JsxConfig::new(&ctx.options.jsx);

        legalize_component_names(ctx.allocator, program, &config);

        let mut scope = ScopeTree::build(program);
        let mut builder = ElementBuilder::new(ctx.allocator, &mut scope, &config);
        builder.visit_program(program);
        let ElementBuilder {
            anchors,
            warnings,
            converted,
            ..
        } = builder;

        strip_pure_annotations(&mut program.comments, program.source_text, &anchors);
        for warning in warnings {
            ctx.warn(warning);
        }
        tracing::debug!(converted, "factory calls rebuilt as jsx");
        Ok(())
    }
}

struct JsxConfig {
    pragmas: Vec<String>,
    automatic: Vec<String>,
    fragments: Vec<String>,
    ignored_namespaces: Vec<String>,
    spread_helpers: Vec<String>,
}

impl JsxConfig {
    fn new(options: &JsxOptions) -> Self {
        Self {
            pragmas: options.pragmas(),
            automatic: options.automatic_pragmas.clone(),
            fragments: options.fragments(),
            ignored_namespaces: options.ignored_namespaces.clone(),
            spread_helpers: options.spread_helpers.clone(),
        }
    }

    /// The pragma name `callee` calls, if any: `jsx`, `React.createElement`
    /// or `(0, r.jsx)`.
    fn pragma_of(&self, callee: &Expression<'_>) -> Option<&str> {
        let callee = indirect_call_target(callee).unwrap_or_else(|| callee.get_inner_expression());
        let name = match callee {
            Expression::Identifier(ident) => ident.name.as_str(),
            Expression::StaticMemberExpression(member) => {
                let Expression::Identifier(object) = &member.object else {
                    return None;
                };
                if self.ignored_namespaces.iter().any(|ignored| object.name == *ignored) {
                    return None;
                }
                member.property.name.as_str()
            }
            _ => return None,
        };
        self.pragmas.iter().find(|pragma| *pragma == name).map(String::as_str)
    }

    fn is_automatic(&self, pragma: &str) -> bool {
        self.automatic.iter().any(|automatic| automatic == pragma)
    }

    fn is_fragment(&self, name: &str) -> bool {
        self.fragments.iter().any(|fragment| fragment == name)
    }

    /// `Object.assign(...)` style calls whose arguments merge into one props
    /// object. Entries without a dot match the method on any object.
    fn is_spread_helper(&self, callee: &Expression<'_>) -> bool {
        let Expression::StaticMemberExpression(member) = callee.get_inner_expression() else {
            return false;
        };
        let Expression::Identifier(object) = &member.object else {
            return false;
        };
        self.spread_helpers.iter().any(|helper| match helper.split_once('.') {
            Some((helper_object, method)) => object.name == helper_object && member.property.name == method,
            None => member.property.name == helper.as_str(),
        })
    }
}

fn starts_lowercase(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
}

/// A lowercase identifier would read as an intrinsic tag and an uppercase
/// string as a component.
fn is_capitalization_invalid(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::StringLiteral(lit) => !starts_lowercase(&lit.value),
        Expression::Identifier(ident) => starts_lowercase(&ident.name),
        _ => false,
    }
}

fn is_jsx_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '-'))
}

/// `div`, `f:image` or `aria-label` split into namespace and name.
fn jsx_name(value: &str) -> Option<(Option<&str>, &str)> {
    match value.split_once(':') {
        Some((namespace, name)) if is_jsx_identifier(namespace) && is_jsx_identifier(name) => {
            Some((Some(namespace), name))
        }
        Some(_) => None,
        None => is_jsx_identifier(value).then_some((None, value)),
    }
}

// ---------------------------------------------------------------------------
// Component name legalization
// ---------------------------------------------------------------------------

struct FactoryCallFinder<'c> {
    config: &'c JsxConfig,
    found: bool,
}

impl<'a> Visit<'a> for FactoryCallFinder<'_> {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if self.config.pragma_of(&it.callee).is_some() {
            self.found = true;
            return;
        }
        walk_call_expression(self, it);
    }
}

#[derive(Default)]
struct LegalizationSites {
    /// Variables initialized with something that builds elements.
    components: FxHashSet<SymbolId>,
    /// `x.displayName = "Name"` assignments.
    display_names: Vec<(ReferenceId, String)>,
    /// Lowercase identifiers passed as the element type.
    lowercase_tags: Vec<ReferenceId>,
}

struct LegalizationCollector<'c> {
    config: &'c JsxConfig,
    sites: LegalizationSites,
}

impl<'a> Visit<'a> for LegalizationCollector<'_> {
    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        if let (BindingPatternKind::BindingIdentifier(ident), Some(init)) = (&it.id.kind, &it.init) {
            let mut finder = FactoryCallFinder {
                config: self.config,
                found: false,
            };
            finder.visit_expression(init);
            if finder.found {
                self.sites.components.extend(ident.symbol_id.get());
            }
        }
        walk_variable_declarator(self, it);
    }

    fn visit_assignment_expression(&mut self, it: &AssignmentExpression<'a>) {
        if let (AssignmentTarget::StaticMemberExpression(member), Expression::StringLiteral(name)) =
            (&it.left, &it.right)
        {
            if member.property.name == "displayName" {
                if let Expression::Identifier(object) = &member.object {
                    if let Some(reference) = object.reference_id.get() {
                        self.sites.display_names.push((reference, name.value.to_string()));
                    }
                }
            }
        }
        walk_assignment_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if self.config.pragma_of(&it.callee).is_some() {
            if let Some(Argument::Identifier(tag)) = it.arguments.first() {
                if starts_lowercase(&tag.name) {
                    self.sites.lowercase_tags.extend(tag.reference_id.get());
                }
            }
        }
        walk_call_expression(self, it);
    }
}

/// Renames short component variables after their `displayName` and
/// capitalizes lowercase component variables so they can serve as tags.
fn legalize_component_names<'a>(allocator: &'a Allocator, program: &mut Program<'a>, config: &JsxConfig) {
    let mut collector = LegalizationCollector {
        config,
        sites: LegalizationSites::default(),
    };
    collector.visit_program(program);
    let sites = collector.sites;
    if sites.display_names.is_empty() && sites.lowercase_tags.is_empty() {
        return;
    }

    let mut scope = ScopeTree::build(program);
    let mut renamed = FxHashSet::default();
    for (reference, display_name) in &sites.display_names {
        let Some(symbol) = scope.symbol_of_reference(*reference) else {
            continue;
        };
        if !sites.components.contains(&symbol)
            || scope.symbol_name(symbol).chars().count() > 2
            || !renamed.insert(symbol)
        {
            continue;
        }
        let declared_in = scope.symbol_scope(symbol);
        let name = scope.generate_collision_free_name(display_name, declared_in);
        tracing::debug!(from = scope.symbol_name(symbol), to = %name, "component renamed after displayName");
        scope.rename_symbol(symbol, &name);
    }

    for reference in &sites.lowercase_tags {
        let Some(symbol) = scope.symbol_of_reference(*reference) else {
            continue;
        };
        let current = scope.symbol_name(symbol).to_string();
        if !starts_lowercase(&current) {
            continue;
        }
        let declared_in = scope.symbol_scope(symbol);
        let name = scope.generate_collision_free_name(&pascal_case(&current), declared_in);
        scope.rename_symbol(symbol, &name);
    }

    scope.apply_renames(allocator, program);
}

// ---------------------------------------------------------------------------
// Element reconstruction
// ---------------------------------------------------------------------------

/// Statement list currently being visited. Hoisted tag declarations wait
/// here until the statement holding the call has been visited.
struct Frame<'a> {
    scope: Option<ScopeId>,
    accepts_hoisting: bool,
    pending: Vec<Statement<'a>>,
}

enum Tag {
    Intrinsic,
    Component,
    Member,
    /// Anything else is bound to a fresh `Component` variable first.
    Hoisted,
}

struct CallPlan {
    tag: Tag,
    /// The third argument is a key and children live in the props.
    key_mode: bool,
}

struct ElementBuilder<'s, 'c, 'a> {
    ast: AstBuilder<'a>,
    scope: &'s mut ScopeTree,
    config: &'c JsxConfig,
    scopes: Vec<ScopeId>,
    expression_arrows: FxHashSet<ScopeId>,
    frames: Vec<Frame<'a>>,
    anchors: Vec<u32>,
    warnings: Vec<String>,
    converted: usize,
}

impl<'s, 'c, 'a> ElementBuilder<'s, 'c, 'a> {
    fn new(allocator: &'a Allocator, scope: &'s mut ScopeTree, config: &'c JsxConfig) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
            scope,
            config,
            scopes: Vec::new(),
            expression_arrows: FxHashSet::default(),
            frames: Vec::new(),
            anchors: Vec::new(),
            warnings: Vec::new(),
            converted: 0,
        }
    }

    fn current_scope(&self) -> Option<ScopeId> {
        self.scopes.last().copied()
    }

    fn can_hoist(&self) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.accepts_hoisting && frame.scope == self.current_scope())
    }

    fn has_children_prop(&self, props: &Expression<'a>) -> bool {
        match props.get_inner_expression() {
            Expression::ObjectExpression(object) => object.properties.iter().any(|property| {
                matches!(property, ObjectPropertyKind::ObjectProperty(prop)
                    if !prop.computed && prop.key.static_name().is_some_and(|name| name == "children"))
            }),
            Expression::CallExpression(call) if self.config.is_spread_helper(&call.callee) => call
                .arguments
                .iter()
                .filter_map(Argument::as_expression)
                .any(|arg| self.has_children_prop(arg)),
            _ => false,
        }
    }

    /// Everything that can reject a call is decided here, before the call is
    /// touched.
    fn plan(&mut self, call: &CallExpression<'a>, pragma: &str) -> Option<CallPlan> {
        if call.arguments.len() < 2 {
            return None;
        }
        let tag = call.arguments[0].as_expression()?;
        let props = match &call.arguments[1] {
            Argument::SpreadElement(spread) => &spread.argument,
            argument => argument.as_expression()?,
        };
        if is_capitalization_invalid(tag) {
            return None;
        }

        let tag = match tag.get_inner_expression() {
            Expression::StringLiteral(lit) if jsx_name(&lit.value).is_some() => Tag::Intrinsic,
            Expression::Identifier(_) => Tag::Component,
            expr if Self::is_member_tag(expr) => Tag::Member,
            _ => {
                if !self.can_hoist() {
                    self.warnings.push(format!(
                        "element type at offset {} cannot be hoisted out of an expression body",
                        call.span.start
                    ));
                    return None;
                }
                Tag::Hoisted
            }
        };

        let key_mode = self.config.is_automatic(pragma) || self.has_children_prop(props);
        if key_mode && matches!(call.arguments.get(2), Some(Argument::SpreadElement(_))) {
            return None;
        }
        Some(CallPlan { tag, key_mode })
    }

    fn is_member_tag(expr: &Expression<'a>) -> bool {
        match expr {
            Expression::StaticMemberExpression(member) if !member.optional => {
                matches!(member.object, Expression::Identifier(_) | Expression::ThisExpression(_))
                    || Self::is_member_tag(&member.object)
            }
            _ => false,
        }
    }

    fn take_argument(&self, argument: &mut Argument<'a>) -> (Expression<'a>, bool) {
        match argument {
            Argument::SpreadElement(spread) => (spread.argument.take_in(self.ast.allocator), true),
            argument => {
                let expr = argument.to_expression_mut();
                (expr.get_inner_expression_mut().take_in(self.ast.allocator), false)
            }
        }
    }

    fn jsx_identifier(&self, name: &str) -> JSXIdentifier<'a> {
        JSXIdentifier {
            span: SPAN,
            name: self.ast.atom(name),
        }
    }

    fn member_object(&self, expr: Expression<'a>) -> Option<JSXMemberExpressionObject<'a>> {
        match expr {
            Expression::Identifier(ident) => Some(JSXMemberExpressionObject::IdentifierReference(ident)),
            Expression::ThisExpression(this) => Some(JSXMemberExpressionObject::ThisExpression(this)),
            Expression::StaticMemberExpression(member) => {
                let member = member.unbox();
                let object = self.member_object(member.object)?;
                Some(JSXMemberExpressionObject::MemberExpression(self.ast.alloc(JSXMemberExpression {
                    span: member.span,
                    object,
                    property: self.jsx_identifier(&member.property.name),
                })))
            }
            _ => None,
        }
    }

    fn element_name(&mut self, tag: &Tag, expr: Expression<'a>) -> Option<JSXElementName<'a>> {
        match (tag, expr) {
            (Tag::Intrinsic, Expression::StringLiteral(lit)) => {
                let (namespace, name) = jsx_name(&lit.value)?;
                Some(match namespace {
                    Some(namespace) => JSXElementName::NamespacedName(self.ast.alloc(JSXNamespacedName {
                        span: lit.span,
                        namespace: self.jsx_identifier(namespace),
                        name: self.jsx_identifier(name),
                    })),
                    None => JSXElementName::Identifier(self.ast.alloc(JSXIdentifier {
                        span: lit.span,
                        name: self.ast.atom(name),
                    })),
                })
            }
            (Tag::Component, Expression::Identifier(ident)) => Some(JSXElementName::IdentifierReference(ident)),
            (Tag::Member, Expression::StaticMemberExpression(member)) => {
                let member = member.unbox();
                let object = self.member_object(member.object)?;
                Some(JSXElementName::MemberExpression(self.ast.alloc(JSXMemberExpression {
                    span: member.span,
                    object,
                    property: self.jsx_identifier(&member.property.name),
                })))
            }
            (Tag::Hoisted, expr) => {
                let scope = self.current_scope().unwrap_or_else(|| self.scope.root_scope());
                let name = self.scope.generate_collision_free_name("Component", scope);
                let declaration = build::variable_declaration(
                    &self.ast,
                    SPAN,
                    VariableDeclarationKind::Const,
                    build::binding_pattern(&self.ast, &name, None),
                    expr,
                );
                self.frames.last_mut()?.pending.push(declaration);
                Some(JSXElementName::IdentifierReference(self.ast.alloc(IdentifierReference {
                    span: SPAN,
                    name: self.ast.atom(&name),
                    reference_id: Cell::new(None),
                })))
            }
            _ => None,
        }
    }

    fn closing_name(&self, name: &JSXElementName<'a>) -> JSXElementName<'a> {
        name.clone_in(self.ast.allocator)
    }

    fn attribute_value(&self, value: Expression<'a>) -> Option<JSXAttributeValue<'a>> {
        if is_true(&value) {
            return None;
        }
        Some(match value {
            Expression::StringLiteral(lit)
                if !lit.raw.is_some_and(|raw| raw.contains('\\')) && !lit.value.contains('"') =>
            {
                JSXAttributeValue::StringLiteral(lit)
            }
            value => JSXAttributeValue::ExpressionContainer(self.container(value.span(), value)),
        })
    }

    fn container(&self, span: Span, expr: Expression<'a>) -> ArenaBox<'a, JSXExpressionContainer<'a>> {
        self.ast.alloc(JSXExpressionContainer {
            span,
            expression: JSXExpression::from(expr),
        })
    }

    fn attribute(&self, span: Span, name: &str, value: Expression<'a>) -> Option<JSXAttributeItem<'a>> {
        let (namespace, name) = jsx_name(name)?;
        let name = match namespace {
            Some(namespace) => JSXAttributeName::NamespacedName(self.ast.alloc(JSXNamespacedName {
                span: SPAN,
                namespace: self.jsx_identifier(namespace),
                name: self.jsx_identifier(name),
            })),
            None => JSXAttributeName::Identifier(self.ast.alloc(self.jsx_identifier(name))),
        };
        Some(JSXAttributeItem::Attribute(self.ast.alloc(JSXAttribute {
            span,
            name,
            value: self.attribute_value(value),
        })))
    }

    fn spread_attribute(&self, argument: Expression<'a>) -> JSXAttributeItem<'a> {
        JSXAttributeItem::SpreadAttribute(self.ast.alloc(JSXSpreadAttribute {
            span: argument.span(),
            argument,
        }))
    }

    /// `{...{ [key]: value }}` for properties that have no attribute form.
    fn wrapped_property(&self, property: ArenaBox<'a, ObjectProperty<'a>>) -> JSXAttributeItem<'a> {
        let span = property.span;
        self.spread_attribute(Expression::ObjectExpression(self.ast.alloc(ObjectExpression {
            span,
            properties: self.ast.vec1(ObjectPropertyKind::ObjectProperty(property)),
        })))
    }

    fn attributes(&mut self, props: Expression<'a>, out: &mut Vec<JSXAttributeItem<'a>>) {
        match props {
            props if is_null(&props) => {}
            Expression::ParenthesizedExpression(paren) => {
                let paren = paren.unbox();
                self.attributes(paren.expression, out);
            }
            Expression::CallExpression(mut call) if self.config.is_spread_helper(&call.callee) => {
                for argument in call.arguments.iter_mut() {
                    let (expr, _) = self.take_argument(argument);
                    self.attributes(expr, out);
                }
            }
            Expression::ObjectExpression(mut object) => {
                for property in object.properties.drain(..) {
                    match property {
                        ObjectPropertyKind::SpreadProperty(spread) => {
                            let spread = spread.unbox();
                            out.push(self.spread_attribute(spread.argument));
                        }
                        ObjectPropertyKind::ObjectProperty(prop) => self.property_attribute(prop, out),
                    }
                }
            }
            props => out.push(self.spread_attribute(props)),
        }
    }

    fn property_attribute(&mut self, prop: ArenaBox<'a, ObjectProperty<'a>>, out: &mut Vec<JSXAttributeItem<'a>>) {
        if prop.kind != PropertyKind::Init {
            self.warnings.push(format!("accessor prop at offset {} dropped", prop.span.start));
            return;
        }
        let name = if prop.computed { None } else { prop.key.static_name() };
        let Some(name) = name.filter(|name| jsx_name(name).is_some()).map(|name| name.to_string()) else {
            out.push(self.wrapped_property(prop));
            return;
        };
        let prop = prop.unbox();
        if let Some(attribute) = self.attribute(prop.span, &name, prop.value) {
            out.push(attribute);
        }
    }

    fn child(&self, expr: Expression<'a>, spread: bool) -> Option<JSXChild<'a>> {
        if spread {
            return Some(JSXChild::Spread(self.ast.alloc(JSXSpreadChild {
                span: expr.span(),
                expression: expr,
            })));
        }
        if is_undefined(&expr) || is_null(&expr) || is_boolean(&expr) {
            return None;
        }
        Some(match expr {
            Expression::JSXElement(element) => JSXChild::Element(element),
            Expression::JSXFragment(fragment) => JSXChild::Fragment(fragment),
            Expression::StringLiteral(lit) if is_plain_text(&lit.value) => JSXChild::Text(self.ast.alloc(JSXText {
                span: lit.span,
                value: lit.value,
                raw: None,
            })),
            expr => JSXChild::ExpressionContainer(self.container(expr.span(), expr)),
        })
    }

    /// Children from a `children` attribute, arrays flattened.
    fn attribute_children(&self, value: Option<JSXAttributeValue<'a>>, out: &mut Vec<JSXChild<'a>>) {
        match value {
            None => {}
            Some(JSXAttributeValue::StringLiteral(lit)) => out.extend(self.child(Expression::StringLiteral(lit), false)),
            Some(JSXAttributeValue::Element(element)) => out.push(JSXChild::Element(element)),
            Some(JSXAttributeValue::Fragment(fragment)) => out.push(JSXChild::Fragment(fragment)),
            Some(JSXAttributeValue::ExpressionContainer(mut container)) => {
                let Some(expr) = container.expression.as_expression_mut() else {
                    return;
                };
                match expr.take_in(self.ast.allocator) {
                    Expression::ArrayExpression(mut array) => {
                        for element in array.elements.iter_mut() {
                            match element {
                                ArrayExpressionElement::SpreadElement(spread) => {
                                    let expr = spread.argument.take_in(self.ast.allocator);
                                    out.extend(self.child(expr, true));
                                }
                                ArrayExpressionElement::Elision(_) => {}
                                element => {
                                    let expr = element.to_expression_mut().take_in(self.ast.allocator);
                                    out.extend(self.child(expr, false));
                                }
                            }
                        }
                    }
                    expr => out.extend(self.child(expr, false)),
                }
            }
        }
    }

    /// One child per line unless the element holds a single text.
    fn with_line_breaks(&self, children: Vec<JSXChild<'a>>) -> ArenaVec<'a, JSXChild<'a>> {
        let mut out = self.ast.vec_with_capacity(children.len() * 2 + 1);
        if children.is_empty() || (children.len() == 1 && matches!(children[0], JSXChild::Text(_))) {
            out.extend(children);
            return out;
        }
        out.push(self.line_break());
        for child in children {
            out.push(child);
            out.push(self.line_break());
        }
        out
    }

    fn line_break(&self) -> JSXChild<'a> {
        JSXChild::Text(self.ast.alloc(JSXText {
            span: SPAN,
            value: self.ast.atom("\n"),
            raw: None,
        }))
    }

    fn is_fragment_tag(&self, name: &JSXElementName<'a>) -> bool {
        match name {
            JSXElementName::Identifier(ident) => self.config.is_fragment(&ident.name),
            JSXElementName::IdentifierReference(ident) => self.config.is_fragment(&ident.name),
            JSXElementName::MemberExpression(member) => self.config.is_fragment(&member.property.name),
            _ => false,
        }
    }

    fn build(&mut self, call: &mut CallExpression<'a>, plan: CallPlan) -> Option<Expression<'a>> {
        let span = call.span;
        let (tag, _) = self.take_argument(&mut call.arguments[0]);
        let name = self.element_name(&plan.tag, tag)?;

        let (props, _) = self.take_argument(&mut call.arguments[1]);
        let mut attributes = Vec::new();
        self.attributes(props, &mut attributes);

        let mut children = Vec::new();
        if plan.key_mode {
            if let Some(argument) = call.arguments.get_mut(2) {
                let (key, _) = self.take_argument(argument);
                if !is_undefined(&key) {
                    if let Some(attribute) = self.attribute(key.span(), "key", key) {
                        attributes.insert(0, attribute);
                    }
                }
            }
            let children_index = attributes.iter().position(|attribute| {
                matches!(attribute, JSXAttributeItem::Attribute(attr)
                    if matches!(&attr.name, JSXAttributeName::Identifier(name) if name.name == "children"))
            });
            if let Some(index) = children_index {
                if let JSXAttributeItem::Attribute(attribute) = attributes.remove(index) {
                    self.attribute_children(attribute.unbox().value, &mut children);
                }
            }
        } else {
            for argument in call.arguments.iter_mut().skip(2) {
                let (expr, spread) = self.take_argument(argument);
                children.extend(self.child(expr, spread));
            }
        }

        let children = self.with_line_breaks(children);
        self.anchors.push(span.start);
        self.converted += 1;

        if attributes.is_empty() && self.is_fragment_tag(&name) {
            return Some(Expression::JSXFragment(self.ast.alloc(JSXFragment {
                span,
                opening_fragment: JSXOpeningFragment { span: SPAN },
                children,
                closing_fragment: JSXClosingFragment { span: SPAN },
            })));
        }

        let closing_element = (!children.is_empty()).then(|| {
            self.ast.alloc(JSXClosingElement {
                span: SPAN,
                name: self.closing_name(&name),
            })
        });
        let mut attribute_items = self.ast.vec_with_capacity(attributes.len());
        attribute_items.extend(attributes);
        Some(Expression::JSXElement(self.ast.alloc(JSXElement {
            span,
            opening_element: self.ast.alloc(JSXOpeningElement {
                span,
                name,
                type_arguments: None,
                attributes: attribute_items,
            }),
            children,
            closing_element,
        })))
    }
}

/// Strings that survive as bare JSX text.
fn is_plain_text(value: &str) -> bool {
    !value.is_empty()
        && !value.contains(['{', '}', '<', '>', '&', '\r', '\n'])
        && !value.starts_with(char::is_whitespace)
        && !value.ends_with(char::is_whitespace)
}

impl<'a> VisitMut<'a> for ElementBuilder<'_, '_, 'a> {
    fn enter_scope(&mut self, _flags: ScopeFlags, scope_id: &Cell<Option<ScopeId>>) {
        if let Some(scope_id) = scope_id.get() {
            self.scopes.push(scope_id);
        }
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    fn visit_arrow_function_expression(&mut self, it: &mut ArrowFunctionExpression<'a>) {
        if it.expression {
            self.expression_arrows.extend(it.scope_id.get());
        }
        walk_arrow_function_expression(self, it);
    }

    fn visit_statements(&mut self, it: &mut ArenaVec<'a, Statement<'a>>) {
        let scope = self.current_scope();
        self.frames.push(Frame {
            scope,
            accepts_hoisting: !scope.is_some_and(|scope| self.expression_arrows.contains(&scope)),
            pending: Vec::new(),
        });

        let mut index = 0;
        while index < it.len() {
            self.visit_statement(&mut it[index]);
            let pending = self.frames.last_mut().map(|frame| std::mem::take(&mut frame.pending)).unwrap_or_default();
            for stmt in pending {
                it.insert(index, stmt);
                index += 1;
            }
            index += 1;
        }

        self.frames.pop();
    }

    fn visit_expression(&mut self, it: &mut Expression<'a>) {
        walk_expression(self, it);

        let Expression::CallExpression(call) = it else {
            return;
        };
        let Some(pragma) = self.config.pragma_of(&call.callee).map(str::to_string) else {
            return;
        };
        let Some(plan) = self.plan(call, &pragma) else {
            return;
        };
        if let Some(element) = self.build(call, plan) {
            *it = element;
        }
    }
}
