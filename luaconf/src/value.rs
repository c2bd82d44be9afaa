//! Ground kinds of the typed surface and their conversion rules.
//!
//! The typed surface recognises exactly five scalar kinds plus homogeneous
//! sequences of them:
//!
//! | Rust type | Lua acceptance |
//! |-----------|----------------|
//! | `bool`    | Boolean only |
//! | `i64`     | number with `floor(n) == n`, losslessly representable |
//! | `f32`     | any number |
//! | `f64`     | any number |
//! | `String`  | string, or number (Lua's string coercion) |
//! | `Vec<T>`  | table whose values all convert to `T` |
//!
//! [`ConfigScalar`] is the closed set of scalar kinds; [`ConfigValue`] is
//! the surface trait the accessor families are generic over (the five
//! scalars plus `Vec` of each).  Both are sealed.

use std::collections::BTreeMap;
use std::fmt;

use mlua::prelude::*;
use mlua::IntoLua;

use crate::config::Config;
use crate::error::{fail, Error, Result};
use crate::registry::ReadRegistry;

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for String {}
    impl<S: Sealed> Sealed for Vec<S> {}
}

// ── ConfigScalar ──────────────────────────────────────────────────────────

/// A scalar ground kind: Boolean, integer, single, double or string.
pub trait ConfigScalar:
    sealed::Sealed + Clone + PartialEq + fmt::Debug + IntoLua + Sized
{
    /// Indefinite noun used in diagnostics, e.g. `"an integer"`.
    const KIND: &'static str;
    /// Diagnostic noun for a sequence of this kind.
    const LIST_KIND: &'static str;

    /// Strict conversion from a Lua value; `None` on kind mismatch.
    fn from_lua_value(value: &LuaValue) -> Option<Self>;

    /// A Lua source literal that evaluates back to this value.
    fn scalar_literal(&self) -> String;

    /// The per-kind scalar map of the read-back registry.
    fn scalars(registry: &ReadRegistry) -> &BTreeMap<String, Self>;
    fn scalars_mut(registry: &mut ReadRegistry) -> &mut BTreeMap<String, Self>;

    /// The per-kind sequence map of the read-back registry.
    fn lists(registry: &ReadRegistry) -> &BTreeMap<String, Vec<Self>>;
    fn lists_mut(registry: &mut ReadRegistry) -> &mut BTreeMap<String, Vec<Self>>;
}

macro_rules! registry_slots {
    ($scalar:ident, $list:ident) => {
        fn scalars(registry: &ReadRegistry) -> &BTreeMap<String, Self> {
            &registry.$scalar
        }
        fn scalars_mut(registry: &mut ReadRegistry) -> &mut BTreeMap<String, Self> {
            &mut registry.$scalar
        }
        fn lists(registry: &ReadRegistry) -> &BTreeMap<String, Vec<Self>> {
            &registry.$list
        }
        fn lists_mut(registry: &mut ReadRegistry) -> &mut BTreeMap<String, Vec<Self>> {
            &mut registry.$list
        }
    };
}

impl ConfigScalar for bool {
    const KIND: &'static str = "a Boolean";
    const LIST_KIND: &'static str = "a list of Booleans";

    fn from_lua_value(value: &LuaValue) -> Option<Self> {
        match value {
            LuaValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn scalar_literal(&self) -> String {
        if *self { "true".to_owned() } else { "false".to_owned() }
    }

    registry_slots!(booleans, boolean_lists);
}

impl ConfigScalar for i64 {
    const KIND: &'static str = "an integer";
    const LIST_KIND: &'static str = "a list of integers";

    fn from_lua_value(value: &LuaValue) -> Option<Self> {
        match value {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Number(n) => integral(*n),
            _ => None,
        }
    }

    fn scalar_literal(&self) -> String {
        self.to_string()
    }

    registry_slots!(integers, integer_lists);
}

impl ConfigScalar for f32 {
    const KIND: &'static str = "a float";
    const LIST_KIND: &'static str = "a list of floats";

    fn from_lua_value(value: &LuaValue) -> Option<Self> {
        match value {
            LuaValue::Integer(i) => Some(*i as f32),
            LuaValue::Number(n) => Some(*n as f32),
            _ => None,
        }
    }

    fn scalar_literal(&self) -> String {
        if self.is_nan() {
            "(0/0)".to_owned()
        } else if self.is_infinite() {
            if *self > 0.0 { "math.huge".to_owned() } else { "-math.huge".to_owned() }
        } else if *self == self.trunc() {
            format!("{self:.1}")
        } else {
            format!("{self}")
        }
    }

    registry_slots!(singles, single_lists);
}

impl ConfigScalar for f64 {
    const KIND: &'static str = "a double";
    const LIST_KIND: &'static str = "a list of doubles";

    fn from_lua_value(value: &LuaValue) -> Option<Self> {
        match value {
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn scalar_literal(&self) -> String {
        if self.is_nan() {
            "(0/0)".to_owned()
        } else if self.is_infinite() {
            if *self > 0.0 { "math.huge".to_owned() } else { "-math.huge".to_owned() }
        } else if *self == self.trunc() {
            format!("{self:.1}")
        } else {
            format!("{self}")
        }
    }

    registry_slots!(doubles, double_lists);
}

impl ConfigScalar for String {
    const KIND: &'static str = "a string";
    const LIST_KIND: &'static str = "a list of strings";

    /// Numbers also convert, matching the interpreter's string coercion.
    fn from_lua_value(value: &LuaValue) -> Option<Self> {
        match value {
            LuaValue::String(s) => Some(s.to_string_lossy()),
            LuaValue::Integer(i) => Some(i.to_string()),
            LuaValue::Number(n) => Some(number_to_string(*n)),
            _ => None,
        }
    }

    fn scalar_literal(&self) -> String {
        quote_lua(self)
    }

    registry_slots!(strings, string_lists);
}

/// A float that is exactly an integer, within the losslessly representable
/// range.
fn integral(n: f64) -> Option<i64> {
    if !n.is_finite() || n.floor() != n {
        return None;
    }
    if n < -9.223_372_036_854_776e18 || n >= 9.223_372_036_854_776e18 {
        return None;
    }
    let i = n as i64;
    if i as f64 == n { Some(i) } else { None }
}

/// Render a number the way Lua 5.4's string coercion does: integral floats
/// keep a trailing `.0`.
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "nan".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "inf".to_owned() } else { "-inf".to_owned() }
    } else if n == n.trunc() {
        format!("{n:.1}")
    } else {
        format!("{n}")
    }
}

/// Quote a string as a Lua literal, escaping quotes, backslashes and
/// control characters (decimal escapes are zero-padded so a following
/// digit cannot extend them).
fn quote_lua(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\{:03}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Stringify a table key for diagnostics and entry listings; `None` for
/// keys that are neither strings nor numbers.
pub(crate) fn coerce_key(key: &LuaValue) -> Option<String> {
    String::from_lua_value(key)
}

// ── ConfigValue ───────────────────────────────────────────────────────────

/// A kind readable through the accessor surface: the five scalars and
/// homogeneous sequences of them.
pub trait ConfigValue: sealed::Sealed + Clone + fmt::Debug + Sized {
    /// Diagnostic noun, e.g. `"an integer"` or `"a list of integers"`.
    const KIND: &'static str;

    /// Convert the navigated value and evaluate the constraint against it.
    ///
    /// `name` is the effective entry name, used in diagnostics and as the
    /// Lua expression the constraint is evaluated on.
    fn read_checked(
        config: &Config,
        op: &'static str,
        value: &LuaValue,
        name: &str,
        constraint: &str,
    ) -> Result<Self>;

    /// Whether the value converts to this kind; never raises.
    fn matches(value: &LuaValue) -> bool;

    /// Record a successful read in the per-kind registry map.
    fn record(registry: &mut ReadRegistry, name: String, value: Self);

    /// A Lua source literal that evaluates back to this value.
    fn lua_literal(&self) -> String;
}

impl<T: ConfigScalar> ConfigValue for T {
    const KIND: &'static str = <T as ConfigScalar>::KIND;

    fn read_checked(
        config: &Config,
        op: &'static str,
        value: &LuaValue,
        name: &str,
        constraint: &str,
    ) -> Result<Self> {
        let Some(converted) = T::from_lua_value(value) else {
            return fail(Error::mismatch(op, config.entry(name), T::KIND));
        };
        if !config.run_constraint(op, name, name, constraint)? {
            return fail(Error::violation(op, config.entry(name), constraint));
        }
        Ok(converted)
    }

    fn matches(value: &LuaValue) -> bool {
        T::from_lua_value(value).is_some()
    }

    fn record(registry: &mut ReadRegistry, name: String, value: Self) {
        T::scalars_mut(registry).insert(name, value);
    }

    fn lua_literal(&self) -> String {
        self.scalar_literal()
    }
}

impl<S: ConfigScalar> ConfigValue for Vec<S> {
    const KIND: &'static str = S::LIST_KIND;

    fn read_checked(
        config: &Config,
        op: &'static str,
        value: &LuaValue,
        name: &str,
        constraint: &str,
    ) -> Result<Self> {
        let LuaValue::Table(table) = value else {
            return fail(Error::mismatch(op, config.entry(name), S::LIST_KIND));
        };

        let mut items: Vec<(Option<i64>, String, S)> = Vec::new();
        for pair in table.clone().pairs::<LuaValue, LuaValue>() {
            let Ok((key, element)) = pair else {
                return fail(Error::mismatch(op, config.entry(name), S::LIST_KIND));
            };
            let Some(key_string) = coerce_key(&key) else {
                return fail(Error::mismatch(
                    op,
                    config.entry(name),
                    "a table with string or numeric keys",
                ));
            };
            let key_index = match key {
                LuaValue::Integer(i) => Some(i),
                _ => None,
            };
            let Some(converted) = S::from_lua_value(&element) else {
                let element_name = format!("{name}[{key_string}]");
                return fail(Error::mismatch(op, config.entry(&element_name), S::KIND));
            };
            items.push((key_index, key_string, converted));
        }

        // Integer-keyed tables come out in ascending key order; anything
        // else keeps the interpreter's iteration order.
        if items.iter().all(|(k, _, _)| k.is_some()) {
            items.sort_by_key(|(k, _, _)| *k);
        }

        // The constraint applies to every element, under the element's
        // synthetic name.
        if !constraint.is_empty() {
            for (_, key_string, element) in &items {
                let element_name = format!("{name}[{key_string}]");
                let literal = element.scalar_literal();
                if !config.run_constraint(op, &element_name, &literal, constraint)? {
                    return fail(Error::violation(
                        op,
                        config.entry(&element_name),
                        constraint,
                    ));
                }
            }
        }

        Ok(items.into_iter().map(|(_, _, element)| element).collect())
    }

    fn matches(value: &LuaValue) -> bool {
        let LuaValue::Table(table) = value else {
            return false;
        };
        for pair in table.clone().pairs::<LuaValue, LuaValue>() {
            let Ok((key, element)) = pair else { return false };
            if coerce_key(&key).is_none() || S::from_lua_value(&element).is_none() {
                return false;
            }
        }
        true
    }

    fn record(registry: &mut ReadRegistry, name: String, value: Self) {
        S::lists_mut(registry).insert(name, value);
    }

    fn lua_literal(&self) -> String {
        if self.is_empty() {
            return "{}".to_owned();
        }
        let items: Vec<String> = self.iter().map(|v| v.scalar_literal()).collect();
        format!("{{ {} }}", items.join(", "))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(lua: &Lua, expr: &str) -> LuaValue {
        lua.load(format!("return {expr}")).eval().unwrap()
    }

    // ── integer strictness ────────────────────────────────────────────────

    #[test]
    fn integer_accepts_integral_float() {
        let lua = Lua::new();
        assert_eq!(i64::from_lua_value(&eval(&lua, "1685.0")), Some(1685));
    }

    #[test]
    fn integer_rejects_fractional_float() {
        let lua = Lua::new();
        assert_eq!(i64::from_lua_value(&eval(&lua, "1685.5")), None);
    }

    #[test]
    fn integer_accepts_lua_integer() {
        let lua = Lua::new();
        assert_eq!(i64::from_lua_value(&eval(&lua, "74")), Some(74));
    }

    #[test]
    fn integer_rejects_string() {
        let lua = Lua::new();
        assert_eq!(i64::from_lua_value(&eval(&lua, "'74'")), None);
    }

    #[test]
    fn integer_rejects_huge_float() {
        let lua = Lua::new();
        assert_eq!(i64::from_lua_value(&eval(&lua, "1e300")), None);
        assert_eq!(i64::from_lua_value(&eval(&lua, "0/0")), None);
    }

    #[test]
    fn integer_accepts_negative() {
        let lua = Lua::new();
        assert_eq!(i64::from_lua_value(&eval(&lua, "-3.0")), Some(-3));
    }

    // ── booleans ──────────────────────────────────────────────────────────

    #[test]
    fn boolean_is_strict() {
        let lua = Lua::new();
        assert_eq!(bool::from_lua_value(&eval(&lua, "true")), Some(true));
        assert_eq!(bool::from_lua_value(&eval(&lua, "1")), None);
        assert_eq!(bool::from_lua_value(&eval(&lua, "'true'")), None);
    }

    // ── floats ────────────────────────────────────────────────────────────

    #[test]
    fn floats_accept_any_number() {
        let lua = Lua::new();
        assert_eq!(f64::from_lua_value(&eval(&lua, "2.5")), Some(2.5));
        assert_eq!(f64::from_lua_value(&eval(&lua, "3")), Some(3.0));
        assert_eq!(f32::from_lua_value(&eval(&lua, "2.5")), Some(2.5f32));
        assert_eq!(f32::from_lua_value(&eval(&lua, "'2.5'")), None);
    }

    // ── string coercion ───────────────────────────────────────────────────

    #[test]
    fn string_accepts_numbers() {
        let lua = Lua::new();
        assert_eq!(
            String::from_lua_value(&eval(&lua, "'Handel'")),
            Some("Handel".to_owned())
        );
        assert_eq!(String::from_lua_value(&eval(&lua, "1685")), Some("1685".to_owned()));
        assert_eq!(
            String::from_lua_value(&eval(&lua, "1685.0")),
            Some("1685.0".to_owned())
        );
        assert_eq!(String::from_lua_value(&eval(&lua, "true")), None);
    }

    // ── literals ──────────────────────────────────────────────────────────

    #[test]
    fn scalar_literals() {
        assert_eq!(true.scalar_literal(), "true");
        assert_eq!(1685i64.scalar_literal(), "1685");
        assert_eq!(1685.0f64.scalar_literal(), "1685.0");
        assert_eq!(2.5f64.scalar_literal(), "2.5");
        assert_eq!("Handel".to_owned().scalar_literal(), "\"Handel\"");
    }

    #[test]
    fn string_literal_escapes() {
        assert_eq!(
            "a\"b\\c\nd".to_owned().scalar_literal(),
            "\"a\\\"b\\\\c\\nd\""
        );
        // Zero-padded decimal escape so the following digit is not absorbed.
        assert_eq!("\u{1}9".to_owned().scalar_literal(), "\"\\0019\"");
    }

    #[test]
    fn nonfinite_literals() {
        assert_eq!(f64::INFINITY.scalar_literal(), "math.huge");
        assert_eq!(f64::NEG_INFINITY.scalar_literal(), "-math.huge");
        assert_eq!(f64::NAN.scalar_literal(), "(0/0)");
    }

    #[test]
    fn vector_literal() {
        assert_eq!(vec![1i64, 2, 3].lua_literal(), "{ 1, 2, 3 }");
        assert_eq!(Vec::<i64>::new().lua_literal(), "{}");
        assert_eq!(
            vec!["a".to_owned(), "b".to_owned()].lua_literal(),
            "{ \"a\", \"b\" }"
        );
    }

    // ── matches ───────────────────────────────────────────────────────────

    #[test]
    fn vector_matches_homogeneous_table() {
        let lua = Lua::new();
        assert!(<Vec<i64>>::matches(&eval(&lua, "{1, 2, 3}")));
        assert!(!<Vec<i64>>::matches(&eval(&lua, "{1, 'two', 3}")));
        assert!(!<Vec<i64>>::matches(&eval(&lua, "42")));
    }

    #[test]
    fn string_vector_matches_numbers_too() {
        let lua = Lua::new();
        assert!(<Vec<String>>::matches(&eval(&lua, "{'a', 2}")));
    }
}
