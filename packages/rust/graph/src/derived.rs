//! Name and signature helpers derived from raw entity data.

use std::sync::LazyLock;

use regex::Regex;

use doxograph_shared::{Kind, Modifiers};

/// Overloadable C++ operator spellings, used to give operator members
/// positional anchors instead of name-derived ones.
pub const OVERLOAD_OPERATORS: &[&str] = &[
    "operator=",
    "operator+",
    "operator-",
    "operator*",
    "operator/",
    "operator%",
    "operator^",
    "operator&",
    "operator|",
    "operator~",
    "operator!",
    "operator<",
    "operator>",
    "operator+=",
    "operator-=",
    "operator*=",
    "operator/=",
    "operator%=",
    "operator^=",
    "operator&=",
    "operator|=",
    "operator<<",
    "operator>>",
    "operator>>=",
    "operator<<=",
    "operator==",
    "operator!=",
    "operator<=",
    "operator>=",
    "operator<=>",
    "operator&&",
    "operator||",
    "operator++",
    "operator--",
    "operator,",
    "operator->*",
    "operator->",
    "operator()",
    "operator[]",
];

pub fn is_operator(name: &str) -> bool {
    OVERLOAD_OPERATORS.contains(&name)
}

/// Split on a delimiter, ignoring occurrences nested in `<>`, `()`, or `[]`.
/// `Foo<std::string>::Bar` splits into `Foo<std::string>` and `Bar`.
pub fn split_safe(s: &str, delim: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let bytes = s.as_bytes();
    let d = delim.as_bytes();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth -= 1,
            _ => {}
        }
        if depth == 0 && bytes[i..].starts_with(d) {
            tokens.push(s[start..i].to_string());
            i += d.len();
            start = i;
        } else {
            i += 1;
        }
    }
    tokens.push(s[start..].to_string());
    tokens
}

/// Break an entity name into scope tokens: path segments for files and
/// directories, `::`-qualified scopes for everything else.
pub fn name_tokens(kind: Kind, name: &str) -> Vec<String> {
    if kind.is_file() || kind.is_dir() {
        name.split('/').map(str::to_string).collect()
    } else {
        split_safe(name, "::")
    }
}

/// Last name token, normalized for use in anchors and URLs.
pub fn url_safe(token: &str) -> String {
    token
        .replace(' ', "-")
        .replace(['=', '~'], "")
        .to_lowercase()
}

static DELETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)\s*=\s*delete").expect("valid regex"));
static DEFAULTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)\s*=\s*default").expect("valid regex"));
static NOEXCEPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\).*noexcept").expect("valid regex"));
static OVERRIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\).*override").expect("valid regex"));

/// Trailing specifier clause of a function signature, in declaration order:
/// `const noexcept override` plus at most one of `= 0`, `= default`,
/// `= delete`. Textual specifiers come from the argument string; `const`
/// and pure-virtual come from the extractor's attributes.
pub fn trailing_specifiers(argsstring: Option<&str>, modifiers: &Modifiers) -> String {
    let args = argsstring.unwrap_or("");
    let mut parts: Vec<&str> = Vec::new();
    if modifiers.is_const {
        parts.push("const");
    }
    if NOEXCEPT.is_match(args) {
        parts.push("noexcept");
    }
    if OVERRIDE.is_match(args) {
        parts.push("override");
    }
    if modifiers.is_pure_virtual {
        parts.push("= 0");
    } else if DEFAULTED.is_match(args) {
        parts.push("= default");
    } else if DELETED.is_match(args) {
        parts.push("= delete");
    }
    parts.join(" ")
}
