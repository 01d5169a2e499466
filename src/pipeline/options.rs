use std::path::Path;

use anyhow::Context;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Module id (as text) -> package name, used to rewrite `require(<id>)`.
    pub module_mapping: FxHashMap<String, String>,
    pub jsx: JsxOptions,
    pub helpers: HelperOptions,
}

impl Options {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid options")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsxOptions {
    /// Custom element factory such as `h` or `preact.h`. Narrows the candidate
    /// set to this one name.
    pub pragma: Option<String>,
    pub pragma_frag: Option<String>,
    pub pragma_candidates: Vec<String>,
    /// Factories with the automatic runtime calling convention.
    pub automatic_pragmas: Vec<String>,
    pub fragment_candidates: Vec<String>,
    /// Objects whose `createElement` is not a JSX factory.
    pub ignored_namespaces: Vec<String>,
    /// Call shapes (`X.__spread`, `Object.assign`) flattened into props.
    pub spread_helpers: Vec<String>,
}

impl Default for JsxOptions {
    fn default() -> Self {
        let names = |names: &[&str]| names.iter().map(|name| name.to_string()).collect();
        Self {
            pragma: None,
            pragma_frag: None,
            pragma_candidates: names(&[
                "createElement",
                "jsx",
                "jsxs",
                "_jsx",
                "_jsxs",
                "jsxDEV",
                "jsxsDEV",
                "h",
            ]),
            automatic_pragmas: names(&["jsx", "jsxs", "_jsx", "_jsxs", "jsxDEV", "jsxsDEV"]),
            fragment_candidates: names(&["Fragment"]),
            ignored_namespaces: names(&["document"]),
            spread_helpers: names(&["__spread", "Object.assign"]),
        }
    }
}

fn last_segment(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_string()
}

impl JsxOptions {
    pub fn pragmas(&self) -> Vec<String> {
        match &self.pragma {
            Some(pragma) => vec![last_segment(pragma)],
            None => self.pragma_candidates.clone(),
        }
    }

    pub fn fragments(&self) -> Vec<String> {
        match &self.pragma_frag {
            Some(fragment) => vec![last_segment(fragment)],
            None => self.fragment_candidates.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HelperOptions {
    /// Modules exporting Babel's `_extends` helper.
    pub extends_modules: Vec<String>,
    /// Modules exporting `_objectSpread` / `_objectSpread2`.
    pub object_spread_modules: Vec<String>,
    /// Modules exporting `_toConsumableArray`.
    pub to_consumable_array_modules: Vec<String>,
}

/// `@babel/runtime` and `babel-runtime` paths of helper `name`, plain and esm.
fn runtime_paths(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .flat_map(|name| {
            [
                format!("@babel/runtime/helpers/{name}"),
                format!("@babel/runtime/helpers/esm/{name}"),
                format!("babel-runtime/helpers/{name}"),
            ]
        })
        .collect()
}

impl Default for HelperOptions {
    fn default() -> Self {
        Self {
            extends_modules: runtime_paths(&["extends"]),
            object_spread_modules: runtime_paths(&["objectSpread2", "objectSpread"]),
            to_consumable_array_modules: runtime_paths(&["toConsumableArray"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options = Options::from_json(
            r#"{ "moduleMapping": { "29": "react" }, "jsx": { "pragma": "preact.h" } }"#,
        )
        .unwrap();

        assert_eq!(options.module_mapping.get("29").map(String::as_str), Some("react"));
        assert_eq!(options.jsx.pragmas(), vec!["h".to_string()]);
        assert_eq!(options.jsx.fragments(), vec!["Fragment".to_string()]);
        assert!(options.helpers.extends_modules.iter().any(|m| m.ends_with("extends")));
        assert!(options
            .helpers
            .object_spread_modules
            .contains(&"@babel/runtime/helpers/esm/objectSpread2".to_string()));
    }

    #[test]
    fn test_options_ignore_unknown_fields() {
        let options = Options::from_json(r#"{ "moduleMeta": { "1": {} } }"#).unwrap();
        assert!(options.module_mapping.is_empty());
    }

    #[test]
    fn test_options_reject_bad_json() {
        assert!(Options::from_json("{ \"moduleMapping\": 3 }").is_err());
    }
}
