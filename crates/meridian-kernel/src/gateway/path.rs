//! Route path and method matching.
//!
//! Two path forms are supported on handlers and filters:
//!
//! ```text
//! path        "/testb"          exact match
//! pathPattern "/users/{id}"     `{name}` matches one non-empty segment
//!             "/_/proxy/*"      `*` matches any run of characters, `/` included
//! ```
//!
//! When an entry carries both, the pattern wins.  Query strings never take
//! part in matching.

use super::types::HttpMethod;
use dashmap::DashMap;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Method wildcard accepted in route method lists.
pub const ANY_METHOD: &str = "*";

/// Compiled patterns, keyed by their source text.
static COMPILED: LazyLock<DashMap<String, Option<Arc<Regex>>>> = LazyLock::new(DashMap::new);

/// Strip a `?query` suffix from a request path.
pub fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}

/// Whether `method` is accepted by a route's method list.
pub fn method_matches(methods: &[String], method: &HttpMethod) -> bool {
    methods
        .iter()
        .any(|m| m == ANY_METHOD || m.eq_ignore_ascii_case(method.as_str()))
}

/// Whether a route's `path` / `pathPattern` pair accepts `request_path`.
pub fn path_matches(path: Option<&str>, path_pattern: Option<&str>, request_path: &str) -> bool {
    let request_path = strip_query(request_path);
    match path_pattern {
        Some(pattern) => pattern_matches(pattern, request_path),
        None => path.is_some_and(|p| p == request_path),
    }
}

/// Match `path` against `pattern` in time linear in the path length.
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    compiled(pattern).is_some_and(|re| re.is_match(path))
}

/// Compile and cache `pattern`; `false` if it cannot be compiled.
pub fn compile_pattern(pattern: &str) -> bool {
    compiled(pattern).is_some()
}

fn compiled(pattern: &str) -> Option<Arc<Regex>> {
    if let Some(re) = COMPILED.get(pattern) {
        return re.clone();
    }
    let re = Regex::new(&pattern_to_regex(pattern)).ok().map(Arc::new);
    COMPILED.insert(pattern.to_string(), re.clone());
    re
}

/// Anchored regex source for a route pattern: `*` is `.*`, `{name}` is one
/// non-empty segment, everything else is literal.
fn pattern_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");
    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        match c {
            '*' => {
                out.push_str(".*");
                rest = &rest[1..];
            }
            '{' if rest.contains('}') => {
                out.push_str("[^/]+");
                rest = rest.split_once('}').map_or("", |(_, tail)| tail);
            }
            // unterminated brace is a literal
            _ => {
                out.push_str(&regex::escape(&rest[..c.len_utf8()]));
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out.push('$');
    out
}
