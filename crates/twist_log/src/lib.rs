//! Oliver Twist Trace and Audit Logs
//!
//! Parsers for the two trace encodings (TOML document and line log) and the
//! two audit log shapes. Parsing is the only place raw text is interpreted;
//! everything downstream works on [`twist_core::TraceEvent`] and
//! [`twist_core::AuditEntry`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod document;
pub mod stream;

pub use audit::{AuditFormat, parse_audit};
pub use document::parse_document;
pub use stream::{parse_line, parse_lines};

use serde::{Deserialize, Serialize};
use std::path::Path;
use twist_core::{CoreError, CoreResult, TraceEvent};

/// Trace encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// Pick from the file extension
    #[default]
    Auto,
    /// `[[events]]` TOML document
    Document,
    /// One comma-separated event per line
    Lines,
}

impl TraceFormat {
    /// Resolve `Auto` against a path: `.toml` is a document, anything else a line log
    #[must_use]
    pub fn detect(self, path: &Path) -> Self {
        match self {
            Self::Auto => match path.extension().and_then(|ext| ext.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Document,
                _ => Self::Lines,
            },
            explicit => explicit,
        }
    }

    /// Parse trace text in this format
    ///
    /// # Errors
    ///
    /// Returns `MalformedTrace` if the text does not parse. `Auto` is treated
    /// as a line log because there is no path to inspect.
    pub fn parse(self, text: &str) -> CoreResult<Vec<TraceEvent>> {
        match self {
            Self::Document => parse_document(text),
            Self::Auto | Self::Lines => parse_lines(text),
        }
    }
}

/// Read and parse a trace file
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, `MalformedTrace` if it does not parse
pub fn load_trace(path: &Path, format: TraceFormat) -> CoreResult<Vec<TraceEvent>> {
    let text = read_input(path)?;
    let format = format.detect(path);
    tracing::debug!(path = %path.display(), ?format, "parsing trace");
    format.parse(&text)
}

/// Read and parse an audit log file
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, `MalformedAudit` if it does not parse
pub fn load_audit(path: &Path, format: AuditFormat) -> CoreResult<Vec<twist_core::AuditEntry>> {
    let text = read_input(path)?;
    parse_audit(&text, format)
}

fn read_input(path: &Path) -> CoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| CoreError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Stable sort by timestamp; equal timestamps keep input order
///
/// # Errors
///
/// Returns `MalformedTrace` if any timestamp is NaN
pub fn order_by_timestamp(mut events: Vec<TraceEvent>) -> CoreResult<Vec<TraceEvent>> {
    if let Some(pos) = events.iter().position(|e| e.timestamp.is_nan()) {
        return Err(CoreError::malformed_trace(format!(
            "event {} has a NaN timestamp",
            pos + 1
        )));
    }
    events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    Ok(events)
}
