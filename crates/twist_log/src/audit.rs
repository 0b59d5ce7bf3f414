//! Audit log parsing.
//!
//! An audit log lists completed requests in the order they were observed to
//! finish. Only line order and the trailing request id are load bearing.

use serde::{Deserialize, Serialize};
use twist_core::{AuditEntry, AuditOutcome, CoreError, CoreResult, RequestId};

/// Audit log line shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditFormat {
    /// `timestamp,TYPE,...,request_id`; any number of middle fields
    Completion,
    /// `type,uri,status,request_id`; exactly four fields
    Outcome,
}

/// Parse an audit log
///
/// # Errors
///
/// Returns `MalformedAudit` with the 1-based line number of the first bad line
pub fn parse_audit(text: &str, format: AuditFormat) -> CoreResult<Vec<AuditEntry>> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry = match format {
            AuditFormat::Completion => parse_completion_line(trimmed),
            AuditFormat::Outcome => parse_outcome_line(trimmed),
        }
        .map_err(|e| e.at_line(index + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Parse a `timestamp,TYPE,...,request_id` line
///
/// # Errors
///
/// Returns `MalformedAudit` if the line has no separator or the id is not a number
pub fn parse_completion_line(line: &str) -> CoreResult<AuditEntry> {
    let Some((_, last)) = line.rsplit_once(',') else {
        return Err(malformed(format!("expected comma separated fields in {:?}", line)));
    };
    Ok(AuditEntry::new(parse_id(last)?))
}

/// Parse a `type,uri,status,request_id` line
///
/// # Errors
///
/// Returns `MalformedAudit` if the field count is wrong or a number does not parse
pub fn parse_outcome_line(line: &str) -> CoreResult<AuditEntry> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [method, uri, status, id] = fields.as_slice() else {
        return Err(malformed(format!("expected 4 fields, found {}", fields.len())));
    };
    let status = status
        .parse::<u16>()
        .map_err(|_| malformed(format!("bad status {:?}", status)))?;
    Ok(AuditEntry::with_outcome(
        parse_id(id)?,
        AuditOutcome {
            method: (*method).to_string(),
            uri: (*uri).to_string(),
            status,
        },
    ))
}

fn parse_id(raw: &str) -> CoreResult<RequestId> {
    raw.parse()
        .map_err(|_| malformed(format!("bad request id {:?}", raw.trim())))
}

fn malformed(reason: String) -> CoreError {
    CoreError::MalformedAudit { line: None, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_log() {
        let text = "0.12,WAIT,200,2\n0.30,WAIT,404,1\n";
        let entries = parse_audit(text, AuditFormat::Completion).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_u64()).collect();
        assert_eq!(ids, [2, 1]);
        assert!(entries.iter().all(|e| e.outcome.is_none()));
    }

    #[test]
    fn test_completion_uses_trailing_field_only() {
        let entry = parse_completion_line("1.0,GET,whatever,extra, 17 ").unwrap();
        assert_eq!(entry.id, RequestId::new(17));
    }

    #[test]
    fn test_parse_outcome_log() {
        let text = "PUT,b.txt,201,3\n\nGET,a.txt,200,1\n";
        let entries = parse_audit(text, AuditFormat::Outcome).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, RequestId::new(3));
        let outcome = entries[0].outcome.as_ref().unwrap();
        assert_eq!(outcome.method, "PUT");
        assert_eq!(outcome.uri, "b.txt");
        assert_eq!(outcome.status, 201);
    }

    #[test]
    fn test_outcome_wrong_field_count() {
        let err = parse_audit("GET,a.txt,200\n", AuditFormat::Outcome).unwrap_err();
        assert_eq!(
            err,
            CoreError::MalformedAudit {
                line: Some(1),
                reason: "expected 4 fields, found 3".to_string(),
            }
        );
    }

    #[test]
    fn test_bad_id_reports_line() {
        let err = parse_audit("1,WAIT,1\n2,WAIT,x\n", AuditFormat::Completion).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_completion_line("42").is_err());
    }
}
