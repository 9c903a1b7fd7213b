use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can raise an interpreter error.
pub type RunResult<T> = Result<T, Exception>;

/// Error categories raised by the interpreter.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `SyntaxError` -> "SyntaxError"), so hosts can classify failures
/// without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcKind {
    /// Malformed source: bad tokens, unbalanced brackets, misplaced dots,
    /// wrong shape for a syntactic form, or trailing input after the
    /// expression.
    SyntaxError,
    /// A name that cannot be resolved or a value that cannot be rendered:
    /// unbound variables, `set!` on an undefined name, printing a procedure.
    NameError,
    /// A well-formed program doing something unsupported at runtime: type
    /// mismatches, bad arities for non-syntactic builtins, out-of-range list
    /// access, division by zero.
    RuntimeError,
}

/// An interpreter error carrying its category and a human-readable message.
///
/// Raised out of `Session::run` and never caught internally; the session's
/// top-level state keeps whatever bindings were established before the
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    kind: ExcKind,
    message: String,
}

impl Exception {
    pub(crate) fn new(kind: ExcKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::new(ExcKind::SyntaxError, message)
    }

    pub(crate) fn name(message: impl Into<String>) -> Self {
        Self::new(ExcKind::NameError, message)
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Self::new(ExcKind::RuntimeError, message)
    }

    /// The error category, for host-side classification.
    #[must_use]
    pub fn kind(&self) -> ExcKind {
        self.kind
    }

    /// The message without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Exception {}
