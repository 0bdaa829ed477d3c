//! Statement safety policy.
//!
//! Classifies candidate SQL statements and their bound parameters as
//! admissible or rejected before any database contact. Matching is lexical
//! and pattern-based by design: a best-effort filter layered on top of
//! parameterized execution, not a provable sandbox.

mod rules;

pub use rules::{validate_sql, SqlValidator, MAX_PARAMS};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of SQL operation a statement performs.
///
/// The gateway is an allowlist of exactly four kinds; everything else is
/// `Unknown` and inadmissible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Unknown,
}

impl OperationKind {
    /// Returns the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true if this kind reads rows rather than modifying them.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The validator's accept/reject decision for one statement or parameter list.
///
/// Created fresh per call and immutable afterwards. The classified operation
/// kind is carried forward so the executor never reclassifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the input passed the policy.
    pub admissible: bool,

    /// The classified operation kind.
    pub operation: OperationKind,

    /// Rejection reason, present when `admissible` is false.
    pub reason: Option<String>,
}

impl Verdict {
    /// Creates an admitting verdict for the given operation kind.
    pub fn admit(operation: OperationKind) -> Self {
        Self {
            admissible: true,
            operation,
            reason: None,
        }
    }

    /// Creates a rejecting verdict with the given reason.
    pub fn reject(operation: OperationKind, reason: impl Into<String>) -> Self {
        Self {
            admissible: false,
            operation,
            reason: Some(reason.into()),
        }
    }

    /// Returns the rejection reason, or a generic fallback for admitted input.
    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("statement rejected")
    }
}
