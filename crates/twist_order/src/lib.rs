//! Oliver Twist Causal Order
//!
//! Extracts the happened-before relation between requests from a trace and
//! checks observed completion orders against it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod causal;
pub mod validate;

pub use causal::CausalOrder;
pub use validate::{CausalOrderViolation, Finding, OrderReport, OrderValidator};
