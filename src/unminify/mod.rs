pub mod transformers;

use transformers::{
    indirect_call::UnIndirectCall, jsx::UnJsx, module_mapping::ModuleMapping, runtime_helpers::RuntimeHelpers,
    sequence_expressions::UnSequenceExpression, smart_inline::SmartInline, undefined::UnUndefined,
    use_strict::UnUseStrict, while_loop::UnWhileLoop,
};

use crate::pipeline::options::Options;
use crate::pipeline::pass::{Pass, PassSet};
use crate::pipeline::{self, FileResult};

/// Built-in passes grouped by concern. Later sets rely on the canonical
/// shapes produced by earlier ones.
pub fn default_pass_sets() -> Vec<PassSet> {
    vec![
        PassSet::new(
            "syntax",
            vec![
                Pass::tree(UnUseStrict),
                Pass::tree(UnSequenceExpression),
                Pass::tree(UnWhileLoop),
                Pass::tree(UnUndefined),
            ],
        ),
        PassSet::new(
            "modules",
            vec![
                Pass::tree(ModuleMapping),
                Pass::tree(RuntimeHelpers),
                Pass::tree(UnIndirectCall),
            ],
        ),
        PassSet::new("readability", vec![Pass::tree(SmartInline), Pass::tree(UnJsx)]),
    ]
}

pub fn default_passes() -> Vec<Pass> {
    PassSet::flatten(default_pass_sets(), &[])
}

/// Every known pass id, in default order.
pub fn pass_ids() -> Vec<&'static str> {
    default_passes().iter().map(Pass::id).collect()
}

/// Runs the default pipeline over one file.
pub fn unminify(source: &str, path: &str, options: &Options) -> FileResult {
    pipeline::run(source, path, &default_passes(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::normalize;

    #[test]
    fn test_default_order() {
        assert_eq!(
            pass_ids(),
            vec![
                "un-use-strict",
                "un-sequence-expression",
                "un-while-loop",
                "un-undefined",
                "module-mapping",
                "runtime-helpers",
                "un-indirect-call",
                "smart-inline",
                "un-jsx",
            ]
        );
    }

    #[test]
    fn test_disable_set_and_pass() {
        let passes = PassSet::flatten(default_pass_sets(), &["modules".to_string(), "un-jsx".to_string()]);
        let ids: Vec<_> = passes.iter().map(Pass::id).collect();
        assert!(!ids.contains(&"un-indirect-call"));
        assert!(!ids.contains(&"un-jsx"));
        assert!(ids.contains(&"smart-inline"));
    }

    #[test]
    fn test_full_pipeline() {
        let result = unminify(
            r#"
"use strict";
const s = require("react");
function App(e) {
  const t = e.title;
  const n = e.items;
  for (; n.length;) n.pop();
  return (0, s.createElement)("h1", null, t, void 0);
}
"#,
            "app.js",
            &Options::default(),
        );
        assert!(!result.failed);
        assert_eq!(
            normalize(&result.code),
            normalize(
                r#"
const s = require("react");
const { createElement } = s;
function App(e) {
  const { title, items } = e;
  while (items.length) items.pop();
  return <h1>
    {title}
  </h1>;
}
"#
            )
        );
    }
}
