use oxc_syntax::identifier::{is_identifier_part, is_identifier_start};

const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
    "with", "yield", "NaN", "Infinity",
];

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_part),
        _ => false,
    }
}

/// Usable as a binding name as-is.
pub fn is_valid_binding_name(name: &str) -> bool {
    is_identifier_name(name) && !is_reserved_word(name)
}

/// Turns arbitrary text into a binding name: invalid characters split words
/// which are joined in camel case, a leading digit or a reserved word gets an
/// underscore prefix.
pub fn to_identifier(input: &str) -> String {
    let mut name = String::with_capacity(input.len());
    for (index, word) in input
        .split(|c: char| !is_identifier_part(c))
        .filter(|word| !word.is_empty())
        .enumerate()
    {
        if index == 0 {
            name.push_str(word);
        } else {
            name.push_str(&capitalize(word));
        }
    }

    if name.is_empty() {
        return "_".to_string();
    }
    if !name.chars().next().is_some_and(is_identifier_start) || is_reserved_word(&name) {
        name.insert(0, '_');
    }
    name
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `foo` -> `Foo`, `foo_bar` -> `FooBar`, `fooBar` -> `FooBar`.
pub fn pascal_case(input: &str) -> String {
    let name: String = input
        .split(|c: char| !c.is_alphanumeric() || c == '_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect();
    to_identifier(&name)
}
