use std::collections::HashSet;

use regex::Regex;

/// Sanitizes `text` into a valid Starlark identifier: invalid characters
/// become `_`, runs of `_` collapse to one, and a leading digit gets a `_`
/// prefix. Mirrors the sanitization the original implementation applied to
/// Python identifiers, since Starlark's identifier grammar is the same.
pub fn sanitize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let invalid = Regex::new(r"[^a-zA-Z0-9_]").expect("static pattern");
    let collapse = Regex::new(r"_+").expect("static pattern");

    let mut clean = invalid.replace_all(text, "_").into_owned();
    if let Some(first) = clean.chars().next() {
        if !first.is_alphabetic() && first != '_' {
            clean = format!("_{clean}");
        }
    }
    collapse.replace_all(&clean, "_").into_owned()
}

/// Tracks names already handed out within one scope (one sheet's function
/// names, or one node's argument names) and appends `_1`, `_2`, ... on
/// collision, deterministically in the order names are requested.
#[derive(Default)]
pub struct NameTable {
    used: HashSet<String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve_all(&mut self, names: impl IntoIterator<Item = &'static str>) {
        self.used.extend(names.into_iter().map(str::to_owned));
    }

    pub fn claim(&mut self, base: &str) -> String {
        let base = if base.is_empty() { "node" } else { base };
        if !self.used.contains(base) {
            self.used.insert(base.to_string());
            return base.to_string();
        }
        let mut idx = 1;
        loop {
            let candidate = format!("{base}_{idx}");
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
            idx += 1;
        }
    }
}
