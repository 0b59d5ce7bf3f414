//! Causal dependency extraction.
//!
//! A request depends on every request that had completed (WAIT observed)
//! before it was opened (CONNECT observed). Those dependencies are
//! snapshotted once at CONNECT and never revised.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use twist_core::{CoreError, CoreResult, EventKind, RequestId, TraceEvent};

/// Happened-before relation between the requests of one trace
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CausalOrder {
    /// Dependency set per request, in first-CONNECT order
    requests: IndexMap<RequestId, BTreeSet<RequestId>>,
}

impl CausalOrder {
    /// Extract dependencies from timestamp-ordered events
    ///
    /// # Errors
    ///
    /// Returns `MalformedTrace` if a WAIT appears for a request that was never opened
    pub fn extract(events: &[TraceEvent]) -> CoreResult<Self> {
        let mut requests: IndexMap<RequestId, BTreeSet<RequestId>> = IndexMap::new();
        let mut finished = BTreeSet::new();

        for (position, event) in events.iter().enumerate() {
            match &event.kind {
                EventKind::Load { .. } | EventKind::Unload { .. } | EventKind::Sleep { .. } => {}
                EventKind::Connect(connect) => {
                    if requests.contains_key(&connect.id) {
                        debug!(id = %connect.id, position, "ignoring repeated CONNECT");
                    } else {
                        requests.insert(connect.id, finished.clone());
                    }
                }
                EventKind::Wait { id, .. } => {
                    if !requests.contains_key(id) {
                        return Err(CoreError::malformed_trace(format!(
                            "WAIT for request {} at event {} without a prior CONNECT",
                            id,
                            position + 1
                        )));
                    }
                    if !finished.insert(*id) {
                        warn!(id = %id, position, "repeated WAIT");
                    }
                }
                EventKind::SendLine { .. }
                | EventKind::SendHeaders { .. }
                | EventKind::SendAll { .. }
                | EventKind::SentBody { .. }
                | EventKind::Received { .. }
                | EventKind::Other { .. } => {}
            }
        }

        debug!(requests = requests.len(), completed = finished.len(), "extracted causal order");
        Ok(Self { requests })
    }

    /// Dependencies of a request, or `None` if the trace never opened it
    #[must_use]
    pub fn dependencies(&self, id: RequestId) -> Option<&BTreeSet<RequestId>> {
        self.requests.get(&id)
    }

    /// Whether the trace opened this request
    #[must_use]
    pub fn contains(&self, id: RequestId) -> bool {
        self.requests.contains_key(&id)
    }

    /// Number of requests
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the trace opened no requests
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Requests and their dependencies, in first-CONNECT order
    pub fn iter(&self) -> impl Iterator<Item = (RequestId, &BTreeSet<RequestId>)> {
        self.requests.iter().map(|(id, deps)| (*id, deps))
    }
}
