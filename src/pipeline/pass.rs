use oxc_allocator::Allocator;
use oxc_ast::{ast::Program, AstBuilder};
use strum::Display;

use super::options::Options;
use crate::error::Diagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PassKind {
    Tree,
    Text,
}

/// Handed to every pass invocation. Collects the diagnostics a pass reports.
pub struct PassContext<'a, 'o> {
    pub allocator: &'a Allocator,
    pub ast: AstBuilder<'a>,
    pub options: &'o Options,
    pub path: &'o str,
    pass: &'static str,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, 'o> PassContext<'a, 'o> {
    pub fn new(allocator: &'a Allocator, options: &'o Options, path: &'o str, pass: &'static str) -> Self {
        Self {
            allocator,
            ast: AstBuilder::new(allocator),
            options,
            path,
            pass,
            diagnostics: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(pass = self.pass, path = self.path, "{message}");
        self.diagnostics.push(Diagnostic::warning(Some(self.pass), message));
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Rewrites a parsed program in place.
pub trait TreePass: Send + Sync {
    fn id(&self) -> &'static str;

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()>;
}

/// Rewrites source text. `Ok(None)` keeps the input unchanged.
pub trait TextPass: Send + Sync {
    fn id(&self) -> &'static str;

    fn transform(&self, ctx: &mut PassContext<'_, '_>, source: &str) -> anyhow::Result<Option<String>>;
}

pub enum Pass {
    Tree(Box<dyn TreePass>),
    Text(Box<dyn TextPass>),
}

impl Pass {
    pub fn tree(pass: impl TreePass + 'static) -> Self {
        Self::Tree(Box::new(pass))
    }

    pub fn text(pass: impl TextPass + 'static) -> Self {
        Self::Text(Box::new(pass))
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Tree(pass) => pass.id(),
            Self::Text(pass) => pass.id(),
        }
    }

    pub fn kind(&self) -> PassKind {
        match self {
            Self::Tree(_) => PassKind::Tree,
            Self::Text(_) => PassKind::Text,
        }
    }
}

/// Named group of passes that runs as a unit in declaration order.
pub struct PassSet {
    pub id: &'static str,
    pub passes: Vec<Pass>,
}

impl PassSet {
    pub fn new(id: &'static str, passes: Vec<Pass>) -> Self {
        Self { id, passes }
    }

    /// Flattens sets into one ordered list, dropping ids in `disabled`
    /// (either a whole set or a single pass).
    pub fn flatten(sets: Vec<PassSet>, disabled: &[String]) -> Vec<Pass> {
        sets.into_iter()
            .filter(|set| !disabled.iter().any(|id| id == set.id))
            .flat_map(|set| set.passes)
            .filter(|pass| !disabled.iter().any(|id| id == pass.id()))
            .collect()
    }
}
