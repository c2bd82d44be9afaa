//! Failure kinds raised by the accessor surface.
//!
//! Every error carries the name of the operation that raised it, and — where
//! one is involved — the entry name and configuration file path, so that a
//! host can print the diagnostic without further context.  Constraint errors
//! additionally carry the predicate source text; [`Display`] renders it
//! indented by six spaces, with an explanatory note appended whenever the
//! predicate uses the predefined `ops_in` helper.
//!
//! With the `abort` Cargo feature the crate prints the diagnostic and aborts
//! the process instead of returning an error, for hosts that cannot handle
//! failures at every access site.

use std::fmt;
use std::path::Path;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

// ── EntryRef ──────────────────────────────────────────────────────────────

/// An entry name qualified by the configuration file it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRef {
    /// Effective entry name (prefix already prepended).
    pub name: String,
    /// Path to the configuration file, possibly empty.
    pub path: String,
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry \"{}\" in \"{}\"", self.name, self.path)
    }
}

// ── Error ─────────────────────────────────────────────────────────────────

/// An error raised by a [`Config`](crate::Config) operation.
#[derive(Debug)]
pub enum Error {
    /// The configuration file (or an extra chunk) failed to load or run.
    /// The message is the interpreter's diagnostic, verbatim.
    LoadFailure {
        op: &'static str,
        path: String,
        message: String,
    },
    /// The entry was not found and no default value was supplied.
    EntryNotFound { op: &'static str, entry: EntryRef },
    /// The entry exists but does not convert to the requested kind.
    TypeMismatch {
        op: &'static str,
        entry: EntryRef,
        expected: &'static str,
    },
    /// The constraint evaluated to `false` on the entry (or on one of its
    /// elements, in which case the entry name carries the failing index).
    ConstraintViolation {
        op: &'static str,
        entry: EntryRef,
        constraint: String,
    },
    /// The constraint itself failed to compile or run, or did not return a
    /// Boolean.
    ConstraintEvalFailure {
        op: &'static str,
        entry: EntryRef,
        constraint: String,
        message: String,
    },
    /// A user-defined function could not be called, failed at runtime, or
    /// returned a value of the wrong kind.
    FunctionCall {
        op: &'static str,
        function: String,
        path: String,
        message: String,
    },
    /// Writing the reproduction document failed.
    Io {
        op: &'static str,
        path: String,
        source: std::io::Error,
    },
    /// The session holds no interpreter (not opened, or already closed).
    NoState { op: &'static str },
}

impl Error {
    pub(crate) fn load(op: &'static str, path: &Path, err: mlua::Error) -> Self {
        Error::LoadFailure {
            op,
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn not_found(op: &'static str, entry: EntryRef) -> Self {
        Error::EntryNotFound { op, entry }
    }

    pub(crate) fn mismatch(op: &'static str, entry: EntryRef, expected: &'static str) -> Self {
        Error::TypeMismatch {
            op,
            entry,
            expected,
        }
    }

    pub(crate) fn violation(op: &'static str, entry: EntryRef, constraint: &str) -> Self {
        Error::ConstraintViolation {
            op,
            entry,
            constraint: constraint.to_owned(),
        }
    }

    pub(crate) fn eval(
        op: &'static str,
        entry: EntryRef,
        constraint: &str,
        message: String,
    ) -> Self {
        Error::ConstraintEvalFailure {
            op,
            entry,
            constraint: constraint.to_owned(),
            message,
        }
    }

    pub(crate) fn function(
        op: &'static str,
        function: String,
        path: String,
        message: String,
    ) -> Self {
        Error::FunctionCall {
            op,
            function,
            path,
            message,
        }
    }

    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            op,
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn no_state(op: &'static str) -> Self {
        Error::NoState { op }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LoadFailure { op, message, .. } => {
                write!(f, "{op}: {message}")
            }
            Error::EntryNotFound { op, entry } => {
                write!(f, "{op}: the {entry} was not found.")
            }
            Error::TypeMismatch {
                op,
                entry,
                expected,
            } => {
                write!(f, "{op}: the {entry} is not {expected}.")
            }
            Error::ConstraintViolation {
                op,
                entry,
                constraint,
            } => {
                write!(
                    f,
                    "{op}: the {entry} does not satisfy the constraint:\n{}",
                    format_constraint(constraint)
                )
            }
            Error::ConstraintEvalFailure {
                op,
                entry,
                constraint,
                message,
            } => {
                write!(
                    f,
                    "{op}: while checking the {entry}: {message}\n{}",
                    format_constraint(constraint)
                )
            }
            Error::FunctionCall {
                op,
                function,
                path,
                message,
            } => {
                write!(f, "{op}: function \"{function}\" in \"{path}\": {message}")
            }
            Error::Io { op, path, source } => {
                write!(f, "{op}: cannot write \"{path}\": {source}")
            }
            Error::NoState { op } => {
                write!(f, "{op}: no configuration file is open.")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Indent the constraint text by six spaces; append a note about `ops_in`
/// when the predicate mentions it.
fn format_constraint(constraint: &str) -> String {
    let mut out = format!("      {constraint}");
    if constraint.contains("ops_in") {
        out.push_str(
            "\n      Note: 'ops_in(v, array)' checks whether 'v' is part of the list 'array'.",
        );
    }
    out
}

/// Raise an error: return it, or — with the `abort` feature — print the
/// diagnostic and abort the process.
pub(crate) fn fail<T>(error: Error) -> Result<T> {
    #[cfg(feature = "abort")]
    {
        eprintln!("{error}");
        std::process::abort();
    }
    #[cfg(not(feature = "abort"))]
    Err(error)
}

// ── Tests ─────────────────────────────────────────────────────────────────
