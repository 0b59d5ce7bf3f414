//! Trace events and audit entries.
//!
//! A trace is the full ordered record of what the service under test did.
//! Global events (fixtures and pauses) carry no request id. Every other event
//! belongs to exactly one request.

use crate::error::{CoreError, CoreResult};
use crate::id::RequestId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Request method understood by the reference storage model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read a resource
    Get,
    /// Create or replace a resource
    Put,
    /// Append to an existing resource
    Append,
}

impl Method {
    /// Wire name of the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Append => "APPEND",
        }
    }
}

impl FromStr for Method {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "APPEND" => Ok(Self::Append),
            other => Err(CoreError::malformed_trace(format!(
                "unsupported method {:?}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-open event
///
/// The line log only records the id; the document format also records what
/// the request asked for, which replay needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connect {
    /// Request being opened
    pub id: RequestId,
    /// Request method
    pub method: Option<Method>,
    /// Target resource path
    pub uri: Option<String>,
    /// Local file holding the request body (PUT, APPEND)
    pub infile: Option<String>,
}

impl Connect {
    /// Connect carrying only an id
    #[must_use]
    pub fn bare(id: RequestId) -> Self {
        Self {
            id,
            method: None,
            uri: None,
            infile: None,
        }
    }
}

/// Kind of trace event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Copy a fixture file into place
    Load {
        /// Fixture source
        infile: String,
        /// Destination path
        outfile: String,
    },
    /// Remove a fixture file
    Unload {
        /// Path to remove
        file: String,
    },
    /// Pause marker; never an actual delay
    Sleep {
        /// Recorded pause length
        seconds: f64,
    },
    /// Request opened
    Connect(Connect),
    /// Request line sent
    SendLine {
        /// Owning request
        id: RequestId,
    },
    /// Headers sent
    SendHeaders {
        /// Owning request
        id: RequestId,
    },
    /// Whole request sent
    SendAll {
        /// Owning request
        id: RequestId,
    },
    /// Body sent
    SentBody {
        /// Owning request
        id: RequestId,
    },
    /// Response received
    Received {
        /// Owning request
        id: RequestId,
    },
    /// Request completed with a status
    Wait {
        /// Completed request
        id: RequestId,
        /// Response status observed by the client, when recorded
        status: Option<u16>,
    },
    /// Unrecognised per-request record
    Other {
        /// Owning request
        id: RequestId,
        /// Record type as written in the trace
        name: String,
    },
}

impl EventKind {
    /// Request this event belongs to, or `None` for global events
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Load { .. } | Self::Unload { .. } | Self::Sleep { .. } => None,
            Self::Connect(connect) => Some(connect.id),
            Self::SendLine { id }
            | Self::SendHeaders { id }
            | Self::SendAll { id }
            | Self::SentBody { id }
            | Self::Received { id }
            | Self::Wait { id, .. }
            | Self::Other { id, .. } => Some(*id),
        }
    }

    /// Whether the event carries no request id
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.request_id().is_none()
    }

    /// Record type name as it appears in traces
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Load { .. } => "LOAD",
            Self::Unload { .. } => "UNLOAD",
            Self::Sleep { .. } => "SLEEP",
            Self::Connect(_) => "CONNECT",
            Self::SendLine { .. } => "SEND_LINE",
            Self::SendHeaders { .. } => "SEND_HEADERS",
            Self::SendAll { .. } => "SEND_ALL",
            Self::SentBody { .. } => "SENT_BODY",
            Self::Received { .. } => "RECEIVED",
            Self::Wait { .. } => "WAIT",
            Self::Other { name, .. } => name,
        }
    }
}

/// Event from a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Observation time; only used to order events, never to pace replay
    pub timestamp: f64,
    /// Event type
    pub kind: EventKind,
}

impl TraceEvent {
    /// Create an event
    #[must_use]
    pub fn new(timestamp: f64, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }

    /// Request this event belongs to
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        self.kind.request_id()
    }

    /// Whether the event carries no request id
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.kind.is_global()
    }
}

/// Observed outcome recorded next to a completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditOutcome {
    /// Request method as logged
    pub method: String,
    /// Target resource
    pub uri: String,
    /// Response status; not re-validated
    pub status: u16,
}

/// One completed request in observed completion order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Completed request
    pub id: RequestId,
    /// Outcome, when the log records one
    pub outcome: Option<AuditOutcome>,
}

impl AuditEntry {
    /// Entry that only names a request
    #[must_use]
    pub fn new(id: RequestId) -> Self {
        Self { id, outcome: None }
    }

    /// Entry with an observed outcome
    #[must_use]
    pub fn with_outcome(id: RequestId, outcome: AuditOutcome) -> Self {
        Self {
            id,
            outcome: Some(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(" APPEND ".parse::<Method>().unwrap(), Method::Append);
        assert!(matches!(
            "DELETE".parse::<Method>(),
            Err(CoreError::MalformedTrace { .. })
        ));
    }

    #[test]
    fn test_global_events_have_no_id() {
        let load = EventKind::Load {
            infile: "a".to_string(),
            outfile: "b".to_string(),
        };
        assert!(load.is_global());
        assert!(EventKind::Sleep { seconds: 1.0 }.is_global());

        let wait = EventKind::Wait {
            id: RequestId::new(4),
            status: Some(200),
        };
        assert_eq!(wait.request_id(), Some(RequestId::new(4)));
        assert!(!wait.is_global());
    }

    #[test]
    fn test_event_names() {
        let connect = EventKind::Connect(Connect::bare(RequestId::new(1)));
        assert_eq!(connect.name(), "CONNECT");

        let other = EventKind::Other {
            id: RequestId::new(1),
            name: "PING".to_string(),
        };
        assert_eq!(other.name(), "PING");
    }

    #[test]
    fn test_event_kind_serialization() {
        let kind = EventKind::Wait {
            id: RequestId::new(2),
            status: Some(404),
        };
        let serialized = serde_json::to_vec(&kind).unwrap();
        let deserialized: EventKind = serde_json::from_slice(&serialized).unwrap();
        assert_eq!(kind, deserialized);
    }
}
