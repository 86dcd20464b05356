//! Error classification

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Broad classification of a failure, shared by every error type in the workspace.
///
/// Callers map this onto their own transport (status codes, exit codes) without
/// matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself is malformed or incomplete.
    Validation,

    /// A referenced entity does not exist.
    NotFound,

    /// The request is well formed but conflicts with current state.
    Conflict,

    /// A concurrent write aborted the transaction; the caller may retry.
    TransactionAborted,

    /// Storage or arithmetic failure unrelated to the request.
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name, suitable for logs and API payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::TransactionAborted => "transaction_aborted",
            Self::Internal => "internal",
        }
    }

    /// Whether retrying the same request may succeed.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransactionAborted)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
