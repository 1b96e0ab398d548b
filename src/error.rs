//! Error taxonomy for synapse-core.
//!
//! Every error explains what went wrong and carries a stable,
//! machine-readable [`SynapseErrorCode`] for programmatic handling. The
//! taxonomy is deliberately small: five kinds, per spec §7.
//!
//! [`SynapseError::NotSatisfied`] is the odd one out — it is a control
//! signal ("this rule's predicate did not match"), not a failure. The
//! runtime matches on it and swallows it; it must never be the error a
//! caller of [`crate::runtime::SynapseRuntime::ingest`] sees.

use crate::event::EventId;

/// Stable, `Copy` discriminant for [`SynapseError`], independent of the
/// context each variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynapseErrorCode {
    NotFound,
    InvalidExpression,
    NotSatisfied,
    CompileError,
    Internal,
}

impl SynapseErrorCode {
    /// Short human-facing summary, the way the teacher's `ErrorCode::message`
    /// documents each code for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotFound => "referenced event id does not exist",
            Self::InvalidExpression => "expression is structurally invalid",
            Self::NotSatisfied => "rule predicate did not match (not an error)",
            Self::CompileError => "condition could not be compiled against the network",
            Self::Internal => "internal invariant violation",
        }
    }
}

/// The error type surfaced by every fallible synapse-core operation.
#[derive(Debug, thiserror::Error)]
pub enum SynapseError {
    /// An id does not exist: edge endpoint, `GetByID`/`GetByIDs`, or a
    /// relation lookup on an unknown anchor.
    #[error("event not found: {id}")]
    NotFound {
        /// The id that could not be resolved.
        id: EventId,
    },

    /// The expression token stream is empty, has mismatched parentheses, has
    /// an operator starved of operands, or references an unknown term kind.
    #[error("invalid expression: {reason}")]
    InvalidExpression {
        /// Human-readable description of the structural problem.
        reason: String,
    },

    /// A rule's predicate evaluated to `false` for the given anchor. This is
    /// an expected control-flow signal (§7), filtered silently by
    /// [`crate::runtime::SynapseRuntime`] — it is never propagated to an
    /// external caller.
    #[error("condition not satisfied for anchor {anchor}")]
    NotSatisfied {
        /// The anchor event whose predicate failed.
        anchor: EventId,
    },

    /// A [`crate::expr::condition::Condition`] could not be compiled: nil
    /// spec, nil anchor, or nil network (in Rust terms: an empty token
    /// sequence, or an anchor id absent from the network).
    #[error("compile error: {reason}")]
    CompileError {
        /// Human-readable description.
        reason: String,
    },

    /// An invariant was violated that should be unreachable by construction
    /// (e.g. an edge endpoint vanished between existence check and insert
    /// under the write lock).
    #[error("internal invariant violation: {reason}")]
    Internal {
        /// Description of the violated invariant.
        reason: String,
    },
}

impl SynapseError {
    /// Stable machine-readable code for this error, independent of the
    /// context carried by each variant.
    #[must_use]
    pub const fn code(&self) -> SynapseErrorCode {
        match self {
            Self::NotFound { .. } => SynapseErrorCode::NotFound,
            Self::InvalidExpression { .. } => SynapseErrorCode::InvalidExpression,
            Self::NotSatisfied { .. } => SynapseErrorCode::NotSatisfied,
            Self::CompileError { .. } => SynapseErrorCode::CompileError,
            Self::Internal { .. } => SynapseErrorCode::Internal,
        }
    }

    /// `true` for the one error kind that is an expected control signal
    /// rather than a failure (§7 propagation policy).
    #[must_use]
    pub const fn is_not_satisfied(&self) -> bool {
        matches!(self, Self::NotSatisfied { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SynapseError>;
