use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Bundler-assigned module id: array index, numeric key or path key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleId {
    Number(u64),
    Name(String),
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for ModuleId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for ModuleId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: ModuleId,
    pub code: String,
    pub is_entry: bool,
    /// Source path the bundler recorded for this module, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpackResult {
    pub modules: Vec<Module>,
    pub module_id_mapping: BTreeMap<ModuleId, String>,
}

impl UnpackResult {
    /// Mapped filename of `id`, `module-<id>.js` when the bundle gave none.
    pub fn filename(&self, id: &ModuleId) -> String {
        self.module_id_mapping
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("module-{id}.js"))
    }

    pub fn entries(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|module| module.is_entry)
    }
}

static BANNER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{3}\s+(\S+)\s+\*{3}").expect("banner pattern"));

/// Path from a `!*** ./src/index.js ***!` module banner.
pub fn banner_path(comment: &str) -> Option<&str> {
    BANNER.captures(comment).and_then(|captures| captures.get(1)).map(|path| path.as_str())
}

/// Registry keys such as `./src/a.js` or `../node_modules/x/index.js`.
pub fn is_path_like(key: &str) -> bool {
    key.contains('/') || key.starts_with('.')
}

const SCRIPT_EXTENSIONS: [&str; 4] = [".js", ".mjs", ".cjs", ".jsx"];

/// Relative output filename for a module path: no `./` or `..` segments,
/// no query string, and always a script extension.
pub fn normalize_filename(path: &str) -> Option<String> {
    let path = path.trim_start_matches("webpack://");
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect();
    if segments.is_empty() {
        return None;
    }

    let mut filename = segments.join("/");
    if !SCRIPT_EXTENSIONS.iter().any(|extension| filename.ends_with(extension)) {
        filename.push_str(".js");
    }
    Some(filename)
}
