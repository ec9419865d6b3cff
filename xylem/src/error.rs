//! Error types for parsing and tree mutation.

use thiserror::Error;

/// A fatal parse failure, frozen at the point of first detection.
///
/// `line` starts at 1 and `column` at 1 for syntax errors found in the
/// input; both are 0 when the failure happened before any input was read
/// (for example an I/O error inside [`crate::load`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// 1-based line of the offending construct, or 0 if not in the input.
    pub line: u32,
    /// 1-based column of the offending construct, or 0 if not in the input.
    pub column: u32,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// An error that is not tied to a position in the input.
    pub(crate) fn external(message: impl Into<String>) -> Self {
        Self::new(message, 0, 0)
    }
}

/// Failure of a mutation or lookup against an existing tree.
///
/// Callers can always tell "no such node" apart from resource exhaustion:
/// the former is recoverable by substituting a default, the latter means
/// the arena refused to grow any further. A failed mutation leaves the
/// tree in its prior valid state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The path did not resolve to any node.
    #[error("no node matches path {0:?}")]
    PathNotFound(String),
    /// The arena reached its fragment bound and cannot grow.
    #[error("arena fragment limit reached")]
    FragmentLimit,
}
