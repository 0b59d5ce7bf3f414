//! Total-order reconstruction.
//!
//! Fixtures load first and unload last. In between, each request's events
//! run as one uninterrupted group, in the order the audit log says requests
//! completed. That middle section is the only part being tested.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};
use twist_core::{AuditEntry, CoreError, CoreResult, EventKind, RequestId, TraceEvent};

/// A trace split into fixture groups and per-request groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceGroups {
    /// LOAD events, in trace order
    pub loads: Vec<TraceEvent>,
    /// UNLOAD events, in trace order
    pub unloads: Vec<TraceEvent>,
    /// Per-request events, keyed in first-appearance order
    pub requests: IndexMap<RequestId, Vec<TraceEvent>>,
}

impl TraceGroups {
    /// Partition a trace. SLEEP markers are dropped.
    #[must_use]
    pub fn from_events(events: Vec<TraceEvent>) -> Self {
        let mut groups = Self::default();
        for event in events {
            match event.kind {
                EventKind::Load { .. } => groups.loads.push(event),
                EventKind::Unload { .. } => groups.unloads.push(event),
                EventKind::Sleep { .. } => {}
                _ => {
                    if let Some(id) = event.request_id() {
                        groups.requests.entry(id).or_default().push(event);
                    }
                }
            }
        }
        groups
    }

    /// Events recorded for one request
    #[must_use]
    pub fn request(&self, id: RequestId) -> Option<&[TraceEvent]> {
        self.requests.get(&id).map(Vec::as_slice)
    }
}

/// A flat candidate execution order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    events: Vec<TraceEvent>,
    replayed: Vec<RequestId>,
}

impl Schedule {
    /// Build `loads ++ groups in audit order ++ unloads`
    ///
    /// Requests the audit log does not mention are left out.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRequest` if the audit names a request with no events,
    /// `DuplicateAuditEntry` if it names one twice
    pub fn reconstruct(groups: &TraceGroups, audit: &[AuditEntry]) -> CoreResult<Self> {
        let mut events = groups.loads.clone();
        let mut replayed: IndexSet<RequestId> = IndexSet::new();

        for entry in audit {
            let group = groups
                .request(entry.id)
                .ok_or(CoreError::UnknownRequest { id: entry.id })?;
            if !replayed.insert(entry.id) {
                return Err(CoreError::DuplicateAuditEntry { id: entry.id });
            }
            debug!(id = %entry.id, events = group.len(), "scheduling request");
            events.extend_from_slice(group);
        }

        for id in groups.requests.keys().filter(|id| !replayed.contains(*id)) {
            info!(id = %id, "request absent from audit log; not replayed");
        }

        events.extend(groups.unloads.iter().cloned());
        Ok(Self {
            events,
            replayed: replayed.into_iter().collect(),
        })
    }

    /// Events in execution order
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Requests included, in audit order
    #[must_use]
    pub fn replayed(&self) -> &[RequestId] {
        &self.replayed
    }

    /// Number of events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether there is nothing to execute
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
