use oxc_allocator::Allocator;
use oxc_ast::{ast::*, AstBuilder};
use oxc_ast_visit::walk_mut::walk_call_expression;
use oxc_ast_visit::VisitMut;
use rustc_hash::FxHashMap;

use crate::ast::build;
use crate::ast::matchers::format_number;
use crate::pipeline::pass::{PassContext, TreePass};

/// Rewrites `require(<id>)` to `require("<package>")` using the configured
/// module mapping.
pub struct ModuleMapping;

impl TreePass for ModuleMapping {
    fn id(&self) -> &'static str {
        "module-mapping"
    }

    fn transform<'a>(&self, ctx: &mut PassContext<'a, '_>, program: &mut Program<'a>) -> anyhow::Result<()> {
        let mapping = &ctx.options.module_mapping;
        if mapping.is_empty() {
            return Ok(());
        }
        let mut visitor = RequireMapper::new(ctx.allocator, mapping);
        visitor.visit_program(program);
        tracing::debug!(rewritten = visitor.rewritten, "module ids mapped");
        Ok(())
    }
}

pub struct RequireMapper<'m, 'a> {
    ast: AstBuilder<'a>,
    mapping: &'m FxHashMap<String, String>,
    rewritten: usize,
}

impl<'m, 'a> RequireMapper<'m, 'a> {
    pub fn new(allocator: &'a Allocator, mapping: &'m FxHashMap<String, String>) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
            mapping,
            rewritten: 0,
        }
    }
}

impl<'a> VisitMut<'a> for RequireMapper<'_, 'a> {
    fn visit_call_expression(&mut self, node: &mut CallExpression<'a>) {
        let is_require = matches!(&node.callee, Expression::Identifier(callee) if callee.name == "require");
        if is_require && node.arguments.len() == 1 {
            let key = match &node.arguments[0] {
                Argument::NumericLiteral(lit) => Some((format_number(lit.value), lit.span)),
                Argument::StringLiteral(lit) => Some((lit.value.to_string(), lit.span)),
                _ => None,
            };
            if let Some((key, span)) = key {
                if let Some(target) = self.mapping.get(&key) {
                    node.arguments[0] = Argument::from(build::string_literal(&self.ast, span, target));
                    self.rewritten += 1;
                }
            }
        }

        walk_call_expression(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::options::Options;
    use crate::pipeline::pass::Pass;
    use crate::test_utils::assert_transform_with;

    #[test]
    fn test_maps_numeric_ids() {
        let mut options = Options::default();
        options.module_mapping.insert("29".to_string(), "react".to_string());
        options.module_mapping.insert("./a".to_string(), "lodash".to_string());

        assert_transform_with(
            Pass::tree(ModuleMapping),
            &options,
            "const r = require(29); const l = require('./a'); const o = require(30);",
            "const r = require('react'); const l = require('lodash'); const o = require(30);",
        );
    }
}
