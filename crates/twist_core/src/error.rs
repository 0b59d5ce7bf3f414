//! Core error types for the oracle.
//!
//! Only structural problems are errors. Ordering violations and response
//! mismatches are findings collected into reports by the engines.

use crate::id::RequestId;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Structural violation in the trace
    #[error("Malformed trace{}: {reason}", line_suffix(.line))]
    MalformedTrace {
        /// 1-based input line, when the format is line oriented
        line: Option<usize>,
        /// What was wrong
        reason: String,
    },

    /// Structural violation in the audit log
    #[error("Malformed audit log{}: {reason}", line_suffix(.line))]
    MalformedAudit {
        /// 1-based input line
        line: Option<usize>,
        /// What was wrong
        reason: String,
    },

    /// Audit log references a request the trace never opened
    #[error("Unknown request {id}: not present in trace")]
    UnknownRequest {
        /// Offending request
        id: RequestId,
    },

    /// Audit log lists the same request twice
    #[error("Request {id} appears more than once in audit log")]
    DuplicateAuditEntry {
        /// Offending request
        id: RequestId,
    },

    /// Storage operation failed during replay
    #[error("Replay I/O failed during {operation} on {path}: {reason}")]
    ReplayIo {
        /// Storage operation name
        operation: String,
        /// Path the operation touched
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },

    /// Reading an input artifact failed
    #[error("I/O error on {path}: {reason}")]
    Io {
        /// Input path
        path: String,
        /// Underlying failure
        reason: String,
    },
}

impl CoreError {
    /// Malformed trace without line context
    #[must_use]
    pub fn malformed_trace(reason: impl Into<String>) -> Self {
        Self::MalformedTrace {
            line: None,
            reason: reason.into(),
        }
    }

    /// Attach a line number to a parse error that lacks one
    #[must_use]
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::MalformedTrace { line: None, reason } => Self::MalformedTrace {
                line: Some(line),
                reason,
            },
            Self::MalformedAudit { line: None, reason } => Self::MalformedAudit {
                line: Some(line),
                reason,
            },
            other => other,
        }
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" at line {}", n),
        None => String::new(),
    }
}
