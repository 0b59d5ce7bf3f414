//! Response comparison between a replay and the live run.

use crate::engine::{ReplayConfig, replay_io};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use twist_core::{CoreResult, RequestId};
use twist_storage::Storage;

/// Summary of one side of a mismatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    /// Size in bytes
    pub size: usize,
    /// BLAKE3 digest, hex encoded
    pub blake3: String,
}

impl ArtifactDigest {
    fn of(content: &[u8]) -> Self {
        Self {
            size: content.len(),
            blake3: hex::encode(blake3::hash(content).as_bytes()),
        }
    }
}

/// First line where two artifacts disagree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDivergence {
    /// 1-based line number
    pub line: usize,
    /// Captured line, if the captured response has that many lines
    pub expected: Option<String>,
    /// Replayed line, if the replayed response has that many lines
    pub actual: Option<String>,
}

/// Why a response did not match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MismatchKind {
    /// Both artifacts exist and differ
    Differs {
        /// Captured response
        expected: ArtifactDigest,
        /// Replayed response
        actual: ArtifactDigest,
        /// First differing line; `None` when only line endings differ
        divergence: Option<LineDivergence>,
    },
    /// No captured response for a replayed request
    MissingExpected,
    /// Replay produced no response for the request
    MissingReplayed,
}

/// A replayed response that does not match the captured one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMismatch {
    /// Request whose responses disagree
    pub id: RequestId,
    /// How they disagree
    pub kind: MismatchKind,
}

impl std::fmt::Display for ResponseMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            MismatchKind::Differs {
                expected,
                actual,
                divergence,
            } => {
                write!(
                    f,
                    "request {}: expected {} bytes ({}), replayed {} bytes ({})",
                    self.id, expected.size, expected.blake3, actual.size, actual.blake3
                )?;
                if let Some(d) = divergence {
                    write!(
                        f,
                        "; line {}: expected {:?}, got {:?}",
                        d.line, d.expected, d.actual
                    )?;
                }
                Ok(())
            }
            MismatchKind::MissingExpected => {
                write!(f, "request {}: no captured response", self.id)
            }
            MismatchKind::MissingReplayed => {
                write!(f, "request {}: replay produced no response", self.id)
            }
        }
    }
}

/// Result of comparing all replayed responses
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseReport {
    /// Requests whose responses matched
    pub matched: Vec<RequestId>,
    /// Requests whose responses did not
    pub mismatches: Vec<ResponseMismatch>,
}

impl ResponseReport {
    /// True iff every compared response matched
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Ids of mismatched requests
    #[must_use]
    pub fn mismatched_ids(&self) -> Vec<RequestId> {
        self.mismatches.iter().map(|m| m.id).collect()
    }
}

/// Byte-for-byte comparison of replayed against captured responses
pub struct ResponseValidator<'a> {
    config: &'a ReplayConfig,
}

impl<'a> ResponseValidator<'a> {
    /// Create a validator for the directories in `config`
    #[must_use]
    pub fn new(config: &'a ReplayConfig) -> Self {
        Self { config }
    }

    /// Compare the responses of every request in `ids`
    ///
    /// Every id is checked; mismatches accumulate in the report.
    ///
    /// # Errors
    ///
    /// Returns `ReplayIo` if an artifact exists but cannot be read
    pub fn compare<S: Storage>(&self, storage: &S, ids: &[RequestId]) -> CoreResult<ResponseReport> {
        let mut report = ResponseReport::default();

        for &id in ids {
            let replayed_path = self.config.replayed_artifact(id);
            let expected_path = self.config.expected_artifact(id);

            if !storage.exists(&replayed_path).map_err(replay_io("compare"))? {
                error!("VALIDATE: {} was not replayed", replayed_path.display());
                report.mismatches.push(ResponseMismatch {
                    id,
                    kind: MismatchKind::MissingReplayed,
                });
                continue;
            }
            if !storage.exists(&expected_path).map_err(replay_io("compare"))? {
                error!("VALIDATE: {} does not exist", expected_path.display());
                report.mismatches.push(ResponseMismatch {
                    id,
                    kind: MismatchKind::MissingExpected,
                });
                continue;
            }

            if storage
                .byte_equals(&replayed_path, &expected_path)
                .map_err(replay_io("compare"))?
            {
                info!(
                    "VALIDATE: {} matches {}",
                    replayed_path.display(),
                    expected_path.display()
                );
                report.matched.push(id);
                continue;
            }

            error!(
                "VALIDATE: {} differs from {}",
                replayed_path.display(),
                expected_path.display()
            );
            let actual = storage.read(&replayed_path).map_err(replay_io("compare"))?;
            let expected = storage.read(&expected_path).map_err(replay_io("compare"))?;
            report.mismatches.push(ResponseMismatch {
                id,
                kind: MismatchKind::Differs {
                    expected: ArtifactDigest::of(&expected),
                    actual: ArtifactDigest::of(&actual),
                    divergence: first_divergence(&expected, &actual),
                },
            });
        }

        Ok(report)
    }
}

/// Walk both responses line by line and report the first disagreement
fn first_divergence(expected: &[u8], actual: &[u8]) -> Option<LineDivergence> {
    let expected = String::from_utf8_lossy(expected);
    let actual = String::from_utf8_lossy(actual);
    let mut old_lines = expected.lines();
    let mut new_lines = actual.lines();
    let mut line = 0;

    loop {
        line += 1;
        match (old_lines.next(), new_lines.next()) {
            (None, None) => return None,
            (Some(o), Some(n)) if o == n => {}
            (o, n) => {
                return Some(LineDivergence {
                    line,
                    expected: o.map(str::to_string),
                    actual: n.map(str::to_string),
                });
            }
        }
    }
}
