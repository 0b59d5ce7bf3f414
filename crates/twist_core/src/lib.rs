//! Oliver Twist Core Types
//!
//! Pure data shared by both oracle engines: request identifiers, the trace
//! event model, audit entries, and the error taxonomy. No I/O happens here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod id;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use event::{AuditEntry, AuditOutcome, Connect, EventKind, Method, TraceEvent};
pub use id::RequestId;
