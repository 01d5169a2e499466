use oxc_ast::ast::*;

use super::{factory, key_id, module_id, unwrap_statement, BundleKind, Layout};

/// The browserify prelude call:
///
/// ```js
/// (function () { function r(e, n, t) { ... } return r; })()({
///     1: [function (require, module, exports) { ... }, { "./dep": 2 }],
///     2: [function (require, module, exports) { ... }, {}],
/// }, {}, [1]);
/// ```
///
/// Each entry pairs a factory with the specifiers it resolves to other ids.
pub(crate) fn detect(program: &Program<'_>) -> Option<Layout> {
    program.body.iter().find_map(|stmt| {
        let Expression::CallExpression(call) = unwrap_statement(stmt)? else {
            return None;
        };
        let [definitions, _cache, entries] = &call.arguments[..] else {
            return None;
        };
        let Expression::ObjectExpression(definitions) = definitions.as_expression()?.get_inner_expression() else {
            return None;
        };
        let Expression::ArrayExpression(entries) = entries.as_expression()?.get_inner_expression() else {
            return None;
        };

        let mut layout = Layout::new(BundleKind::Browserify, Vec::new());
        for property in &definitions.properties {
            let ObjectPropertyKind::ObjectProperty(property) = property else {
                return None;
            };
            let Expression::ArrayExpression(definition) = property.value.get_inner_expression() else {
                return None;
            };
            let element = |index: usize| {
                definition
                    .elements
                    .get(index)
                    .and_then(ArrayExpressionElement::as_expression)
                    .map(Expression::get_inner_expression)
            };

            layout.factories.push(factory(element(0)?, key_id(&property.key)?, property.span)?);
            if let Some(Expression::ObjectExpression(dependencies)) = element(1) {
                for dependency in &dependencies.properties {
                    let ObjectPropertyKind::ObjectProperty(dependency) = dependency else {
                        continue;
                    };
                    if let (Some(name), Some(id)) = (dependency.key.static_name(), module_id(&dependency.value)) {
                        layout.dependency_names.push((id, name.into_owned()));
                    }
                }
            }
        }
        if layout.factories.is_empty() {
            return None;
        }

        layout.entries = entries
            .elements
            .iter()
            .filter_map(|entry| entry.as_expression().and_then(module_id))
            .collect();
        Some(layout)
    })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::normalize;
    use crate::unpacker::{unpack, ModuleId};

    const BUNDLE: &str = r#"
(function(){function r(e,n,t){function o(i,f){return e[i][0].call()}return o}return r})()({
1:[function(require,module,exports){
var b = require("./b");
var c = require("../lib/c");
console.log(b, c);
},{"./b":2,"../lib/c":3}],
2:[function(e,t,n){t.exports="b"},{}],
3:[function(e,t,n){n.c=e("./b")},{"./b":2}]
},{},[1]);
"#;

    #[test]
    fn test_modules_and_entries() {
        let result = unpack(BUNDLE).unwrap();

        assert_eq!(result.modules.len(), 3);
        let ids: Vec<ModuleId> = result.entries().map(|module| module.id.clone()).collect();
        assert_eq!(ids, vec![ModuleId::Number(1)]);

        let second = &result.modules[1];
        assert_eq!(normalize(&second.code), normalize(r#"module.exports = "b";"#));
        let third = &result.modules[2];
        assert_eq!(normalize(&third.code), normalize(r#"exports.c = require("./b");"#));
    }

    #[test]
    fn test_dependency_names_become_filenames() {
        let result = unpack(BUNDLE).unwrap();

        assert_eq!(result.filename(&ModuleId::Number(1)), "module-1.js");
        assert_eq!(result.filename(&ModuleId::Number(2)), "b.js");
        assert_eq!(result.filename(&ModuleId::Number(3)), "lib/c.js");
        assert!(result
            .module_id_mapping
            .keys()
            .all(|id| result.modules.iter().any(|module| &module.id == id)));
    }
}
