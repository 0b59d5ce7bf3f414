//! Line-oriented trace log.
//!
//! One event per line, comma separated, fields trimmed:
//!
//! ```text
//! 0.00,LOAD,fixtures/a.txt,a.txt
//! 0.10,CONNECT,1,GET,a.txt
//! 0.20,SEND_LINE,1
//! 0.30,WAIT,1,200
//! 0.40,UNLOAD,a.txt
//! ```
//!
//! `CONNECT` may stop after the id; method, uri, and infile are optional.
//! Blank lines and lines starting with `#` are skipped.

use twist_core::{Connect, CoreError, CoreResult, EventKind, Method, RequestId, TraceEvent};

/// Parse a whole line log
///
/// # Errors
///
/// Returns `MalformedTrace` with the 1-based line number of the first bad line
pub fn parse_lines(text: &str) -> CoreResult<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = parse_line(trimmed).map_err(|e| e.at_line(index + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Parse a single event line
///
/// # Errors
///
/// Returns `MalformedTrace` if fields are missing or do not parse
pub fn parse_line(line: &str) -> CoreResult<TraceEvent> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let timestamp = fields[0]
        .parse::<f64>()
        .map_err(|_| CoreError::malformed_trace(format!("bad timestamp {:?}", fields[0])))?;
    let name = field(&fields, 1, "type")?;

    let kind = match name {
        "LOAD" => EventKind::Load {
            infile: field(&fields, 2, "infile")?.to_string(),
            outfile: field(&fields, 3, "outfile")?.to_string(),
        },
        "UNLOAD" => EventKind::Unload {
            file: field(&fields, 2, "file")?.to_string(),
        },
        "SLEEP" => EventKind::Sleep {
            seconds: number(field(&fields, 2, "seconds")?, "seconds")?,
        },
        "CONNECT" | "CREATE" => {
            let id = request_id(&fields)?;
            let method = optional(&fields, 3).map(str::parse::<Method>).transpose()?;
            EventKind::Connect(Connect {
                id,
                method,
                uri: optional(&fields, 4).map(str::to_string),
                infile: optional(&fields, 5).map(str::to_string),
            })
        }
        "SEND_LINE" => EventKind::SendLine { id: request_id(&fields)? },
        "SEND_HEADERS" => EventKind::SendHeaders { id: request_id(&fields)? },
        "SEND_ALL" => EventKind::SendAll { id: request_id(&fields)? },
        "SENT_BODY" | "SEND_BODY" => EventKind::SentBody { id: request_id(&fields)? },
        "RECEIVED" => EventKind::Received { id: request_id(&fields)? },
        "WAIT" => EventKind::Wait {
            id: request_id(&fields)?,
            status: optional(&fields, 3)
                .map(|raw| number(raw, "status"))
                .transpose()?,
        },
        other => EventKind::Other {
            id: request_id(&fields)?,
            name: other.to_string(),
        },
    };

    Ok(TraceEvent::new(timestamp, kind))
}

fn field<'a>(fields: &[&'a str], index: usize, name: &str) -> CoreResult<&'a str> {
    match fields.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(CoreError::malformed_trace(format!("missing field {}", name))),
    }
}

/// A trailing field that may be absent or left empty
fn optional<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields.get(index).copied().filter(|value| !value.is_empty())
}

fn request_id(fields: &[&str]) -> CoreResult<RequestId> {
    let raw = field(fields, 2, "id")?;
    raw.parse()
        .map_err(|_| CoreError::malformed_trace(format!("bad request id {:?}", raw)))
}

fn number<T: std::str::FromStr>(raw: &str, name: &str) -> CoreResult<T> {
    raw.parse()
        .map_err(|_| CoreError::malformed_trace(format!("bad {} {:?}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_events() {
        let load = parse_line("0.5,LOAD,fixtures/a.txt,a.txt").unwrap();
        assert_eq!(load.timestamp, 0.5);
        assert_eq!(
            load.kind,
            EventKind::Load {
                infile: "fixtures/a.txt".to_string(),
                outfile: "a.txt".to_string(),
            }
        );

        let unload = parse_line("1, UNLOAD , a.txt").unwrap();
        assert_eq!(unload.kind, EventKind::Unload { file: "a.txt".to_string() });

        let sleep = parse_line("2,SLEEP,3").unwrap();
        assert_eq!(sleep.kind, EventKind::Sleep { seconds: 3.0 });
    }

    #[test]
    fn test_parse_bare_connect() {
        let event = parse_line("0.1,CONNECT,7").unwrap();
        assert_eq!(event.kind, EventKind::Connect(Connect::bare(RequestId::new(7))));
    }

    #[test]
    fn test_parse_full_connect() {
        let event = parse_line("0.1,CONNECT,7,PUT,/x,a.txt").unwrap();
        let EventKind::Connect(connect) = event.kind else {
            panic!("expected connect");
        };
        assert_eq!(connect.method, Some(Method::Put));
        assert_eq!(connect.uri.as_deref(), Some("/x"));
        assert_eq!(connect.infile.as_deref(), Some("a.txt"));
    }

    #[test]
    fn test_parse_markers_and_wait() {
        let id = RequestId::new(3);
        assert_eq!(parse_line("1,SEND_LINE,3").unwrap().kind, EventKind::SendLine { id });
        assert_eq!(parse_line("1,SENT_BODY,3").unwrap().kind, EventKind::SentBody { id });
        assert_eq!(parse_line("1,SEND_BODY,3").unwrap().kind, EventKind::SentBody { id });
        assert_eq!(
            parse_line("1,WAIT,3,404").unwrap().kind,
            EventKind::Wait { id, status: Some(404) }
        );
    }

    #[test]
    fn test_parse_connect_empty_fields_are_absent() {
        let event = parse_line("0.1,CONNECT,7,PUT,/x,").unwrap();
        let EventKind::Connect(connect) = event.kind else {
            panic!("expected connect");
        };
        assert_eq!(connect.uri.as_deref(), Some("/x"));
        assert_eq!(connect.infile, None);

        let event = parse_line("0.1,CONNECT,7,,").unwrap();
        assert_eq!(event.kind, EventKind::Connect(Connect::bare(RequestId::new(7))));
    }

    #[test]
    fn test_parse_lenient_sleep_and_wait() {
        assert_eq!(
            parse_line("1,SLEEP,0.5").unwrap().kind,
            EventKind::Sleep { seconds: 0.5 }
        );
        assert_eq!(
            parse_line("1,WAIT,3").unwrap().kind,
            EventKind::Wait {
                id: RequestId::new(3),
                status: None,
            }
        );
    }

    #[test]
    fn test_parse_unknown_type_keeps_id() {
        let event = parse_line("1,PING,5").unwrap();
        assert_eq!(
            event.kind,
            EventKind::Other {
                id: RequestId::new(5),
                name: "PING".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_lines_reports_line_number() {
        let text = "0,CONNECT,1\n\n# comment\n1,WAIT\n";
        let err = parse_lines(text).unwrap_err();
        assert_eq!(
            err,
            CoreError::MalformedTrace {
                line: Some(4),
                reason: "missing field id".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_lines_skips_blanks() {
        let text = "0,CONNECT,1\n\n  \n1,WAIT,1,200\n";
        assert_eq!(parse_lines(text).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_bad_timestamp() {
        assert!(parse_line("soon,CONNECT,1").is_err());
        assert!(parse_line("1,CONNECT,one").is_err());
        assert!(parse_line("1,CONNECT,1,DELETE,/x").is_err());
    }
}
