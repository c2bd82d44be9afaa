//! Typed, constraint-checked access to Lua configuration files.
//!
//! A configuration file is an ordinary Lua program; `luaconf` loads it,
//! evaluates it once, and exposes a typed accessor surface over the
//! resulting globals: "give me entry `x` as an integer in `1..12`,
//! otherwise default `7`".  Entries are addressed with dots and brackets
//! (`compositions.concerti_grossi_op_6[3]`), values convert to five ground
//! kinds — `bool`, `i64`, `f32`, `f64`, `String` — and homogeneous `Vec`s
//! of them, and every entry can be checked against a Lua predicate over the
//! free variable `v`.
//!
//! Every successful read is recorded; [`Config::lua_definition`] later
//! synthesises a Lua document reproducing the configuration as it was
//! actually consumed, defaults included.
//!
//! ```
//! use luaconf::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let path = std::env::temp_dir().join("luaconf_crate_doc.lua");
//! std::fs::write(&path, "last_name = 'Handel'\nbirth_year = 1685.0\n")?;
//!
//! let mut config = Config::from_file(&path)?;
//! let name: String = config.get("last_name")?;
//! assert_eq!(name, "Handel");
//!
//! // Strict integer read: 1685.0 is integral, so it converts.
//! let year: i64 = config.get_checked("birth_year", "v > 1000")?;
//! assert_eq!(year, 1685);
//!
//! // Absent entry with a default; the default lands in the read-back
//! // registry like any other read.
//! let show: bool = config.get_or("show", "", true)?;
//! assert!(show);
//! assert!(config.lua_definition().contains("show = true"));
//! # std::fs::remove_file(&path).ok();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod path;
pub mod registry;
pub mod value;

pub use config::Config;
pub use error::{EntryRef, Error, Result};
pub use registry::ReadRegistry;
pub use value::{ConfigScalar, ConfigValue};
