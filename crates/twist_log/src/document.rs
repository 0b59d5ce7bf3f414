//! TOML trace document.
//!
//! The event file the load generator writes:
//!
//! ```toml
//! [[events]]
//! type = "LOAD"
//! infile = "fixtures/a.txt"
//! outfile = "a.txt"
//!
//! [[events]]
//! type = "CREATE"
//! id = 1
//! method = "PUT"
//! uri = "b.txt"
//! infile = "fixtures/b.txt"
//! ```
//!
//! `CREATE` and `CONNECT` both open a request. Numeric fields may be written
//! as integers or decimal strings.

use serde::Deserialize;
use twist_core::{Connect, CoreError, CoreResult, EventKind, Method, RequestId, TraceEvent};

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    events: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "type")]
    kind: String,
    timestamp: Option<Scalar>,
    id: Option<Scalar>,
    method: Option<String>,
    uri: Option<String>,
    infile: Option<String>,
    outfile: Option<String>,
    file: Option<String>,
    seconds: Option<Scalar>,
    status: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn as_u64(&self, name: &str) -> CoreResult<u64> {
        match self {
            Self::Int(v) if *v >= 0 => Ok(*v as u64),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| CoreError::malformed_trace(format!("bad {} {:?}", name, s))),
            other => Err(CoreError::malformed_trace(format!("bad {} {:?}", name, other))),
        }
    }

    fn as_f64(&self, name: &str) -> CoreResult<f64> {
        match self {
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| CoreError::malformed_trace(format!("bad {} {:?}", name, s))),
        }
    }
}

/// Parse a TOML trace document
///
/// # Errors
///
/// Returns `MalformedTrace` if the TOML is invalid or a record lacks a field
/// its type requires. The reason names the offending record (1-based).
pub fn parse_document(text: &str) -> CoreResult<Vec<TraceEvent>> {
    let document: Document = toml::from_str(text)
        .map_err(|e| CoreError::malformed_trace(format!("invalid trace document: {}", e)))?;

    document
        .events
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            convert(record).map_err(|e| match e {
                CoreError::MalformedTrace { reason, .. } => {
                    CoreError::malformed_trace(format!("record {}: {}", index + 1, reason))
                }
                other => other,
            })
        })
        .collect()
}

fn convert(record: Record) -> CoreResult<TraceEvent> {
    let timestamp = match &record.timestamp {
        Some(ts) => ts.as_f64("timestamp")?,
        None => 0.0,
    };

    let kind = match record.kind.as_str() {
        "LOAD" => EventKind::Load {
            infile: required(record.infile, "infile")?,
            outfile: required(record.outfile, "outfile")?,
        },
        "UNLOAD" => EventKind::Unload {
            file: required(record.file, "file")?,
        },
        "SLEEP" => EventKind::Sleep {
            seconds: match &record.seconds {
                Some(seconds) => seconds.as_f64("seconds")?,
                None => 0.0,
            },
        },
        "CREATE" | "CONNECT" => EventKind::Connect(Connect {
            id: request_id(record.id.as_ref())?,
            method: record.method.as_deref().map(str::parse::<Method>).transpose()?,
            uri: record.uri,
            infile: record.infile,
        }),
        "SEND_LINE" => EventKind::SendLine { id: request_id(record.id.as_ref())? },
        "SEND_HEADERS" => EventKind::SendHeaders { id: request_id(record.id.as_ref())? },
        "SEND_ALL" => EventKind::SendAll { id: request_id(record.id.as_ref())? },
        "SEND_BODY" | "SENT_BODY" => EventKind::SentBody { id: request_id(record.id.as_ref())? },
        "RECEIVED" => EventKind::Received { id: request_id(record.id.as_ref())? },
        "WAIT" => {
            let status = record
                .status
                .as_ref()
                .map(|raw| {
                    let status = raw.as_u64("status")?;
                    u16::try_from(status).map_err(|_| {
                        CoreError::malformed_trace(format!("status {} out of range", status))
                    })
                })
                .transpose()?;
            EventKind::Wait {
                id: request_id(record.id.as_ref())?,
                status,
            }
        }
        _ => EventKind::Other {
            id: request_id(record.id.as_ref())?,
            name: record.kind.clone(),
        },
    };

    Ok(TraceEvent::new(timestamp, kind))
}

fn required<T>(value: Option<T>, name: &str) -> CoreResult<T> {
    value.ok_or_else(|| CoreError::malformed_trace(format!("missing field {}", name)))
}

fn request_id(raw: Option<&Scalar>) -> CoreResult<RequestId> {
    let raw = raw.ok_or_else(|| CoreError::malformed_trace("missing field id"))?;
    raw.as_u64("id").map(RequestId::new)
}
