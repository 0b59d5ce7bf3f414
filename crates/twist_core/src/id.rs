//! Request identifiers.
//!
//! Requests are numbered by the service under test; the oracle never mints
//! new ids, it only parses and compares them.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Request identifier - identifies one client request in a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Create from a raw request number
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw request number
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Name of the response artifact produced for this request
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!("{}-out", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for RequestId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
