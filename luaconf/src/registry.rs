//! Read-back registry: every entry successfully read, per kind.
//!
//! The registry reflects the *effective* configuration, not the file: a
//! default value applied to an absent entry is recorded like any other
//! read.  From the recorded entries a Lua reproduction document can be
//! synthesised; loading it into a fresh interpreter yields, for every
//! recorded name, a value equal to the one previously read.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::path::{self, Step};
use crate::value::{ConfigScalar, ConfigValue};

/// Per-kind maps of every entry successfully read, keyed by effective name.
#[derive(Debug, Default)]
pub struct ReadRegistry {
    pub(crate) booleans: BTreeMap<String, bool>,
    pub(crate) integers: BTreeMap<String, i64>,
    pub(crate) singles: BTreeMap<String, f32>,
    pub(crate) doubles: BTreeMap<String, f64>,
    pub(crate) strings: BTreeMap<String, String>,
    pub(crate) boolean_lists: BTreeMap<String, Vec<bool>>,
    pub(crate) integer_lists: BTreeMap<String, Vec<i64>>,
    pub(crate) single_lists: BTreeMap<String, Vec<f32>>,
    pub(crate) double_lists: BTreeMap<String, Vec<f64>>,
    pub(crate) string_lists: BTreeMap<String, Vec<String>>,
}

impl ReadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entry names, sorted, without duplicates.
    pub fn entry_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for (name, _) in self.literals() {
            names.insert(name);
        }
        names.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.literals().is_empty()
    }

    /// Forget every recorded entry.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The recorded scalar entries of kind `S`, keyed by effective name.
    pub fn scalar_entries<S: ConfigScalar>(&self) -> &BTreeMap<String, S> {
        S::scalars(self)
    }

    /// The recorded sequence entries with elements of kind `S`.
    pub fn list_entries<S: ConfigScalar>(&self) -> &BTreeMap<String, Vec<S>> {
        S::lists(self)
    }

    /// Name → value literal for every recorded entry, across all ten maps.
    fn literals(&self) -> BTreeMap<String, String> {
        fn put<T: ConfigValue>(out: &mut BTreeMap<String, String>, map: &BTreeMap<String, T>) {
            for (name, value) in map {
                out.insert(name.clone(), value.lua_literal());
            }
        }
        let mut out = BTreeMap::new();
        put(&mut out, &self.booleans);
        put(&mut out, &self.integers);
        put(&mut out, &self.singles);
        put(&mut out, &self.doubles);
        put(&mut out, &self.strings);
        put(&mut out, &self.boolean_lists);
        put(&mut out, &self.integer_lists);
        put(&mut out, &self.single_lists);
        put(&mut out, &self.double_lists);
        put(&mut out, &self.string_lists);
        out
    }

    /// Name → standalone reconstruction snippet for every recorded entry.
    /// Nested names carry their own `t = t or {}` prelude lines so each
    /// snippet loads on its own.
    pub fn definitions(&self) -> BTreeMap<String, String> {
        self.literals()
            .into_iter()
            .map(|(name, literal)| {
                let mut snippet = String::new();
                for line in prelude_lines(&name) {
                    snippet.push_str(&line);
                    snippet.push('\n');
                }
                snippet.push_str(&format!("{name} = {literal}\n"));
                (name, snippet)
            })
            .collect()
    }

    /// The full reproduction document, one assignment per recorded entry,
    /// in sorted name order.
    pub fn document(&self) -> String {
        let mut seen = HashSet::new();
        let mut out = String::new();
        for (name, literal) in self.literals() {
            for line in prelude_lines(&name) {
                if seen.insert(line.clone()) {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            out.push_str(&format!("{name} = {literal}\n"));
        }
        out
    }
}

/// `t = t or {}` lines creating the enclosing tables of a nested name.
/// A name that does not tokenize was recorded as a default for a malformed
/// path; it gets no prelude and is emitted as-is.
fn prelude_lines(name: &str) -> Vec<String> {
    let Some(steps) = path::tokenize(name) else {
        return Vec::new();
    };
    let mut expr = String::new();
    let mut lines = Vec::new();
    let last = steps.len() - 1;
    for (i, step) in steps.iter().enumerate() {
        match step {
            Step::Field(f) => {
                if i > 0 {
                    expr.push('.');
                }
                expr.push_str(f);
            }
            Step::Index(n) => {
                expr.push('[');
                expr.push_str(&n.to_string());
                expr.push(']');
            }
        }
        if i < last {
            lines.push(format!("{expr} = {expr} or {{}}"));
        }
    }
    lines
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_has_empty_document() {
        let reg = ReadRegistry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.document(), "");
        assert!(reg.entry_names().is_empty());
    }

    #[test]
    fn scalar_entries_become_assignments() {
        let mut reg = ReadRegistry::new();
        reg.booleans.insert("show".to_owned(), true);
        reg.integers.insert("birth_year".to_owned(), 1685);
        reg.strings.insert("last_name".to_owned(), "Handel".to_owned());

        let doc = reg.document();
        assert!(doc.contains("show = true\n"));
        assert!(doc.contains("birth_year = 1685\n"));
        assert!(doc.contains("last_name = \"Handel\"\n"));
    }

    #[test]
    fn sequence_entries_use_brace_constructors() {
        let mut reg = ReadRegistry::new();
        reg.integer_lists.insert("ops".to_owned(), vec![1, 2, 3]);
        assert!(reg.document().contains("ops = { 1, 2, 3 }\n"));
    }

    #[test]
    fn nested_names_get_table_preludes() {
        let mut reg = ReadRegistry::new();
        reg.integers.insert("a.b.c".to_owned(), 7);
        assert_eq!(
            reg.document(),
            "a = a or {}\na.b = a.b or {}\na.b.c = 7\n"
        );
    }

    #[test]
    fn shared_preludes_are_emitted_once() {
        let mut reg = ReadRegistry::new();
        reg.integers.insert("a.b".to_owned(), 1);
        reg.integers.insert("a.c".to_owned(), 2);
        let doc = reg.document();
        assert_eq!(doc.matches("a = a or {}").count(), 1);
    }

    #[test]
    fn indexed_names_get_table_preludes() {
        let mut reg = ReadRegistry::new();
        reg.strings.insert("list[2]".to_owned(), "x".to_owned());
        assert_eq!(reg.document(), "list = list or {}\nlist[2] = \"x\"\n");
    }

    #[test]
    fn definitions_are_standalone() {
        let mut reg = ReadRegistry::new();
        reg.integers.insert("a.b".to_owned(), 1);
        let defs = reg.definitions();
        assert_eq!(defs["a.b"], "a = a or {}\na.b = 1\n");
    }

    #[test]
    fn entry_names_are_sorted_and_unique() {
        let mut reg = ReadRegistry::new();
        reg.integers.insert("b".to_owned(), 1);
        reg.strings.insert("a".to_owned(), "x".to_owned());
        reg.integer_lists.insert("c".to_owned(), vec![1]);
        assert_eq!(reg.entry_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut reg = ReadRegistry::new();
        reg.integers.insert("x".to_owned(), 1);
        reg.clear();
        assert!(reg.is_empty());
    }
}
