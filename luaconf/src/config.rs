//! Configuration session: one Lua interpreter, one file, typed access.
//!
//! A [`Config`] owns a Lua 5.4 state in which the configuration file has
//! been evaluated, and exposes the typed accessor surface on top of it:
//!
//! | Operation | Method |
//! |-----------|--------|
//! | open / reload / close     | [`Config::open`], [`Config::reload`], [`Config::close`] |
//! | evaluate extra sources    | [`Config::do_file`], [`Config::do_string`] |
//! | typed read                | [`Config::get`], [`Config::get_checked`], [`Config::get_or`] |
//! | typed read into location  | [`Config::set`], [`Config::set_checked`], [`Config::set_or`] |
//! | kind tests                | [`Config::exists`], [`Config::is`], [`Config::is_function`], [`Config::is_table`] |
//! | constraints               | [`Config::check_constraint`], [`Config::check_constraint_on_value`] |
//! | user-defined functions    | [`Config::apply`], [`Config::apply_elementwise`] |
//! | entry listing             | [`Config::get_entry_list`] |
//! | read-back                 | [`Config::lua_definition`], [`Config::write_lua_definition`] |
//!
//! Entry names use the dotted/bracketed grammar of [`crate::path`]; the
//! session prefix is prepended to every name at call time.  A session is
//! single-threaded and non-reentrant; independent sessions share nothing.
//!
//! A `ops_in(v, array)` helper is predefined in every session for use in
//! constraints; it checks whether `v` is part of the list `array`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mlua::prelude::*;
use mlua::IntoLua;

use crate::error::{fail, EntryRef, Error, Result};
use crate::path::{self, Step};
use crate::registry::ReadRegistry;
use crate::value::{self, ConfigScalar, ConfigValue};

/// Lua source of the `ops_in` constraint helper.
const OPS_IN: &str = "\
function ops_in(v, table)
  for _, value in ipairs(table) do
    if v == value then
      return true
    end
  end
  return false
end
";

// ── Config ────────────────────────────────────────────────────────────────

/// A configuration session: an owned interpreter plus the file-path
/// identity, the current name prefix, and the read-back registry.
#[derive(Default)]
pub struct Config {
    file_path: PathBuf,
    lua: Option<Lua>,
    prefix: String,
    registry: ReadRegistry,
    definition: BTreeMap<String, String>,
}

impl Config {
    /// Create an empty session; no interpreter is running until
    /// [`Config::open`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a configuration file and return the running session.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self::new();
        config.open(path)?;
        Ok(config)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Open a configuration file.
    ///
    /// Any previously open interpreter is released and the prefix cleared;
    /// a fresh interpreter is created with the standard library, `ops_in`
    /// is predefined, then the file is evaluated.  On failure the session
    /// is left with no interpreter.
    pub fn open(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.close();
        self.file_path = path.into();

        let lua = Lua::new();
        if let Err(e) = lua.load(OPS_IN).exec() {
            return fail(Error::load("open", &self.file_path, e));
        }
        if let Err(e) = lua.load(self.file_path.as_path()).exec() {
            return fail(Error::load("open", &self.file_path, e));
        }
        self.lua = Some(lua);
        Ok(())
    }

    /// Re-open the current configuration file from scratch.
    pub fn reload(&mut self) -> Result<()> {
        let path = self.file_path.clone();
        self.open(path)
    }

    /// Release the interpreter and clear the prefix.  Idempotent; the
    /// read-back registry survives.
    pub fn close(&mut self) {
        self.prefix.clear();
        self.lua = None;
    }

    /// Evaluate an additional source file in the current interpreter,
    /// merging its definitions into the environment.
    pub fn do_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let Some(lua) = self.lua.as_ref() else {
            return fail(Error::no_state("do_file"));
        };
        if let Err(e) = lua.load(path.as_ref()).exec() {
            return fail(Error::load("do_file", path.as_ref(), e));
        }
        Ok(())
    }

    /// Evaluate a source snippet in the current interpreter.
    pub fn do_string(&mut self, chunk: &str) -> Result<()> {
        let Some(lua) = self.lua.as_ref() else {
            return fail(Error::no_state("do_string"));
        };
        if let Err(e) = lua.load(chunk).exec() {
            return fail(Error::load("do_string", &self.file_path, e));
        }
        Ok(())
    }

    // ── Typed reads ───────────────────────────────────────────────────────

    /// Read the entry `prefix + name` as `T`.
    ///
    /// Numeric entries also read successfully as `String` (the
    /// interpreter's own string coercion); integer reads are strict and
    /// reject fractional numbers.
    pub fn get<T: ConfigValue>(&mut self, name: &str) -> Result<T> {
        self.get_value("get", name, "", None)
    }

    /// Read the entry and check `constraint` — a Lua Boolean expression
    /// over the free variable `v` — against its value.  For sequences the
    /// constraint must hold on every element.
    pub fn get_checked<T: ConfigValue>(&mut self, name: &str, constraint: &str) -> Result<T> {
        self.get_value("get", name, constraint, None)
    }

    /// Like [`Config::get_checked`], but an absent entry yields
    /// `default_value` instead of an error.  The default is recorded in the
    /// read-back registry and is *not* checked against the constraint.
    pub fn get_or<T: ConfigValue>(
        &mut self,
        name: &str,
        constraint: &str,
        default_value: T,
    ) -> Result<T> {
        self.get_value("get", name, constraint, Some(default_value))
    }

    /// Read the entry into a host-provided location.
    pub fn set<T: ConfigValue>(&mut self, name: &str, out: &mut T) -> Result<()> {
        *out = self.get_value("set", name, "", None)?;
        Ok(())
    }

    /// Read with a constraint into a host-provided location.
    pub fn set_checked<T: ConfigValue>(
        &mut self,
        name: &str,
        constraint: &str,
        out: &mut T,
    ) -> Result<()> {
        *out = self.get_value("set", name, constraint, None)?;
        Ok(())
    }

    /// Read with a constraint and a default into a host-provided location.
    pub fn set_or<T: ConfigValue>(
        &mut self,
        name: &str,
        constraint: &str,
        default_value: T,
        out: &mut T,
    ) -> Result<()> {
        *out = self.get_value("set", name, constraint, Some(default_value))?;
        Ok(())
    }

    fn get_value<T: ConfigValue>(
        &mut self,
        op: &'static str,
        name: &str,
        constraint: &str,
        default_value: Option<T>,
    ) -> Result<T> {
        let full = self.full_name(name);
        let Some(lua) = self.lua.as_ref() else {
            return fail(Error::no_state(op));
        };
        let slot = navigate(lua, &full);
        if slot.is_nil() {
            return match default_value {
                Some(default) => {
                    T::record(&mut self.registry, full, default.clone());
                    Ok(default)
                }
                None => fail(Error::not_found(op, self.entry(&full))),
            };
        }
        let converted = T::read_checked(self, op, &slot, &full, constraint)?;
        T::record(&mut self.registry, full, converted.clone());
        Ok(converted)
    }

    // ── Kind tests ────────────────────────────────────────────────────────

    /// Whether the entry exists.  Never raises.
    pub fn exists(&self, name: &str) -> bool {
        match self.lua.as_ref() {
            Some(lua) => !navigate(lua, &self.full_name(name)).is_nil(),
            None => false,
        }
    }

    /// Whether the entry exists and converts to `T`.  Never raises.
    pub fn is<T: ConfigValue>(&self, name: &str) -> bool {
        let Some(lua) = self.lua.as_ref() else {
            return false;
        };
        let slot = navigate(lua, &self.full_name(name));
        !slot.is_nil() && T::matches(&slot)
    }

    /// Whether the entry exists and is a function.  Never raises.
    pub fn is_function(&self, name: &str) -> bool {
        self.kind_is(name, |slot| matches!(slot, LuaValue::Function(_)))
    }

    /// Whether the entry exists and is a table.  Never raises.
    pub fn is_table(&self, name: &str) -> bool {
        self.kind_is(name, |slot| matches!(slot, LuaValue::Table(_)))
    }

    fn kind_is(&self, name: &str, predicate: impl FnOnce(&LuaValue) -> bool) -> bool {
        match self.lua.as_ref() {
            Some(lua) => predicate(&navigate(lua, &self.full_name(name))),
            None => false,
        }
    }

    // ── Entry listing ─────────────────────────────────────────────────────

    /// The keys of the table entry `prefix + name`, stringified and sorted
    /// in ascending lexicographic byte order (so numbers come first).  An
    /// empty name lists the global bindings.
    pub fn get_entry_list(&self, name: &str) -> Result<Vec<String>> {
        let op = "get_entry_list";
        let full = self.full_name(name);
        let Some(lua) = self.lua.as_ref() else {
            return fail(Error::no_state(op));
        };
        let slot = navigate(lua, &full);
        if slot.is_nil() {
            return fail(Error::not_found(op, self.entry(&full)));
        }
        let LuaValue::Table(table) = slot else {
            return fail(Error::mismatch(op, self.entry(&full), "a table"));
        };

        let mut keys = Vec::new();
        for pair in table.pairs::<LuaValue, LuaValue>() {
            let Ok((key, _)) = pair else {
                return fail(Error::mismatch(op, self.entry(&full), "a table"));
            };
            let Some(key) = value::coerce_key(&key) else {
                return fail(Error::mismatch(
                    op,
                    self.entry(&full),
                    "a table with string or numeric keys",
                ));
            };
            keys.push(key);
        }
        keys.sort();
        Ok(keys)
    }

    // ── Constraints ───────────────────────────────────────────────────────

    /// Evaluate `constraint` against the entry `prefix + name`.  An empty
    /// constraint is always true.
    pub fn check_constraint(&self, name: &str, constraint: &str) -> Result<bool> {
        let full = self.full_name(name);
        self.run_constraint("check_constraint", &full, &full, constraint)
    }

    /// Evaluate `constraint` against a host-supplied Lua value literal.
    pub fn check_constraint_on_value(&self, literal: &str, constraint: &str) -> Result<bool> {
        self.run_constraint("check_constraint_on_value", literal, literal, constraint)
    }

    /// Compile and run the constraint program: binds
    /// `ops_check_constraint(v)` with body `return constraint`, applies it
    /// to `expr` and reads back `ops_result`, which must be a Boolean.
    ///
    /// `display` is the entry name (or literal) used in diagnostics.
    pub(crate) fn run_constraint(
        &self,
        op: &'static str,
        display: &str,
        expr: &str,
        constraint: &str,
    ) -> Result<bool> {
        if constraint.is_empty() {
            return Ok(true);
        }
        let Some(lua) = self.lua.as_ref() else {
            return fail(Error::no_state(op));
        };
        let program = format!(
            "function ops_check_constraint(v)\nreturn {constraint}\nend\n\
             ops_result = ops_check_constraint({expr})"
        );
        if let Err(e) = lua.load(&program).exec() {
            return fail(Error::eval(op, self.entry(display), constraint, e.to_string()));
        }
        match lua.globals().get::<LuaValue>("ops_result") {
            Ok(LuaValue::Boolean(result)) => Ok(result),
            _ => fail(Error::eval(
                op,
                self.entry(display),
                constraint,
                "the constraint did not return a Boolean".to_owned(),
            )),
        }
    }

    // ── Function calls ────────────────────────────────────────────────────

    /// Call the user-defined function `prefix + name` with the given
    /// arguments and convert its first result back to the same kind.
    pub fn apply<T: ConfigScalar>(&self, name: &str, args: &[T]) -> Result<T> {
        self.call_scalar("apply", name, |lua| {
            args.iter().map(|a| a.clone().into_lua(lua)).collect()
        })
    }

    /// Call the function once per input element and collect the outputs.
    pub fn apply_elementwise<A: ConfigScalar, R: ConfigScalar>(
        &self,
        name: &str,
        inputs: &[A],
    ) -> Result<Vec<R>> {
        inputs
            .iter()
            .map(|input| {
                self.call_scalar("apply_elementwise", name, |lua| {
                    Ok(vec![input.clone().into_lua(lua)?])
                })
            })
            .collect()
    }

    fn call_scalar<R: ConfigScalar>(
        &self,
        op: &'static str,
        name: &str,
        build_args: impl FnOnce(&Lua) -> LuaResult<Vec<LuaValue>>,
    ) -> Result<R> {
        let full = self.full_name(name);
        let path = self.file_path.display().to_string();
        let Some(lua) = self.lua.as_ref() else {
            return fail(Error::no_state(op));
        };
        let LuaValue::Function(function) = navigate(lua, &full) else {
            return fail(Error::function(op, full, path, "is not a function".to_owned()));
        };
        let args = match build_args(lua) {
            Ok(args) => args,
            Err(e) => {
                return fail(Error::function(
                    op,
                    full,
                    path,
                    format!("argument conversion failed: {e}"),
                ));
            }
        };
        let args: LuaMultiValue = args.into();
        let result = match function.call::<LuaValue>(args) {
            Ok(result) => result,
            Err(e) => return fail(Error::function(op, full, path, e.to_string())),
        };
        match R::from_lua_value(&result) {
            Some(converted) => Ok(converted),
            None => fail(Error::function(
                op,
                full,
                path,
                format!("did not return {}", <R as ConfigScalar>::KIND),
            )),
        }
    }

    // ── Prefix and identity ───────────────────────────────────────────────

    /// The current name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Set the prefix prepended to every entry name, e.g. `"name."`.
    /// Leading dots are stripped so the prefix never begins with a
    /// separator.
    pub fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.trim_start_matches('.').to_owned();
    }

    /// Clear the prefix.
    pub fn clear_prefix(&mut self) {
        self.prefix.clear();
    }

    /// The path of the configuration file, possibly empty.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// The raw interpreter, if the session is open.
    ///
    /// Escape hatch: mutating the interpreter out-of-band invalidates the
    /// read-back registry's round-trip guarantee.
    pub fn state(&self) -> Option<&Lua> {
        self.lua.as_ref()
    }

    // ── Read-back ─────────────────────────────────────────────────────────

    /// The read-back registry of every entry successfully read so far.
    pub fn registry(&self) -> &ReadRegistry {
        &self.registry
    }

    /// Names of all recorded entries, sorted.
    pub fn read_entry_list(&self) -> Vec<String> {
        self.registry.entry_names()
    }

    /// Re-synthesise the per-entry reconstruction snippets from the
    /// registry.
    pub fn update_lua_definition(&mut self) {
        self.definition = self.registry.definitions();
    }

    /// A Lua document that reconstructs every recorded entry.
    pub fn lua_definition(&mut self) -> String {
        self.update_lua_definition();
        self.registry.document()
    }

    /// The reconstruction snippet of a single recorded entry.
    pub fn lua_definition_of(&mut self, name: &str) -> Result<String> {
        self.update_lua_definition();
        match self.definition.get(name) {
            Some(snippet) => Ok(snippet.clone()),
            None => fail(Error::not_found("lua_definition", self.entry(name))),
        }
    }

    /// Write the full reconstruction document to a file.
    pub fn write_lua_definition(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let document = self.lua_definition();
        if let Err(e) = std::fs::write(path.as_ref(), document) {
            return fail(Error::io("write_lua_definition", path.as_ref(), e));
        }
        Ok(())
    }

    // ── Internal ──────────────────────────────────────────────────────────

    fn full_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub(crate) fn entry(&self, name: &str) -> EntryRef {
        EntryRef {
            name: name.to_owned(),
            path: self.file_path.display().to_string(),
        }
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Navigation ────────────────────────────────────────────────────────────

/// Walk from the globals table down the navigation steps of `name`.
///
/// Returns `Nil` when any step fails (missing binding, non-table parent,
/// malformed name, metamethod error); the empty name yields the globals
/// table itself.  Never raises.
fn navigate(lua: &Lua, name: &str) -> LuaValue {
    if name.is_empty() {
        return LuaValue::Table(lua.globals());
    }
    let Some(steps) = path::tokenize(name) else {
        return LuaValue::Nil;
    };
    let mut steps = steps.into_iter();
    let Some(Step::Field(root)) = steps.next() else {
        return LuaValue::Nil;
    };
    let mut current: LuaValue = lua
        .globals()
        .get::<LuaValue>(root.as_str())
        .unwrap_or(LuaValue::Nil);

    for step in steps {
        let LuaValue::Table(table) = current else {
            return LuaValue::Nil;
        };
        current = match step {
            Step::Field(field) => table.get::<LuaValue>(field.as_str()),
            Step::Index(index) => table.get::<LuaValue>(index),
        }
        .unwrap_or(LuaValue::Nil);
    }
    current
}

// ── Tests ─────────────────────────────────────────────────────────────────
