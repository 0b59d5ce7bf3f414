//! Oliver Twist Replay Engine
//!
//! Rebuilds one total order of execution from a trace and an audit log,
//! replays it against a reference storage model, and diffs the resulting
//! responses against the ones captured from the live service.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod engine;
pub mod schedule;

pub use diff::{MismatchKind, ResponseMismatch, ResponseReport, ResponseValidator};
pub use engine::{ReplayConfig, ReplayEngine, ReplayOutcome};
pub use schedule::{Schedule, TraceGroups};
