//! Replay engine for reconstructed schedules.
//!
//! Executes a [`Schedule`] one event at a time against a [`Storage`] and
//! writes one response artifact per CONNECT into the replay directory.

use crate::schedule::Schedule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use twist_core::{Connect, CoreError, CoreResult, EventKind, Method, RequestId, TraceEvent};
use twist_storage::{Storage, StoreError};

/// Body written when the target resource is absent
pub const NOT_FOUND: &[u8] = b"Not Found\n";
/// Body written when PUT creates a resource
pub const CREATED: &[u8] = b"Created\n";
/// Body written when PUT replaces or APPEND extends a resource
pub const OK: &[u8] = b"OK\n";

/// Replay engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Scratch directory for replayed responses; wiped before each run
    pub replay_dir: PathBuf,
    /// Directory holding the responses captured from the live service
    pub response_dir: PathBuf,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            replay_dir: PathBuf::from("replay"),
            response_dir: PathBuf::from("responses"),
        }
    }
}

impl ReplayConfig {
    /// Path of the replayed response for a request
    #[must_use]
    pub fn replayed_artifact(&self, id: RequestId) -> PathBuf {
        self.replay_dir.join(id.artifact_name())
    }

    /// Path of the captured response for a request
    #[must_use]
    pub fn expected_artifact(&self, id: RequestId) -> PathBuf {
        self.response_dir.join(id.artifact_name())
    }
}

/// What a replay produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayOutcome {
    /// Events executed
    pub executed: usize,
    /// Requests that wrote a response artifact, in execution order
    pub responded: Vec<RequestId>,
}

/// Replay engine for executing schedules
pub struct ReplayEngine {
    config: ReplayConfig,
}

impl ReplayEngine {
    /// Create a new replay engine
    #[must_use]
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Engine configuration
    #[must_use]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Wipe the replay directory and execute `schedule` in order
    ///
    /// # Errors
    ///
    /// Returns `ReplayIo` on the first storage failure and `MalformedTrace` if
    /// a CONNECT lacks what its method needs. Either aborts the run.
    pub fn replay<S: Storage>(
        &self,
        storage: &mut S,
        schedule: &Schedule,
    ) -> CoreResult<ReplayOutcome> {
        storage
            .reset_dir(&self.config.replay_dir)
            .map_err(replay_io("reset"))?;

        let mut outcome = ReplayOutcome::default();
        for event in schedule.events() {
            self.process_event(storage, event, &mut outcome)?;
            outcome.executed += 1;
        }

        debug!(
            executed = outcome.executed,
            responses = outcome.responded.len(),
            "replay finished"
        );
        Ok(outcome)
    }

    fn process_event<S: Storage>(
        &self,
        storage: &mut S,
        event: &TraceEvent,
        outcome: &mut ReplayOutcome,
    ) -> CoreResult<()> {
        match &event.kind {
            EventKind::Load { infile, outfile } => {
                storage
                    .copy(Path::new(infile), Path::new(outfile))
                    .map_err(replay_io("load"))?;
                info!("LOAD: {} to {}", infile, outfile);
            }
            EventKind::Unload { file } => {
                storage.delete(Path::new(file)).map_err(replay_io("unload"))?;
                info!("UNLOAD: {}", file);
            }
            EventKind::Sleep { seconds } => {
                info!("SLEEP: {} seconds", seconds);
            }
            EventKind::Connect(connect) => {
                let body = self.execute(storage, connect)?;
                storage
                    .write(&self.config.replayed_artifact(connect.id), &body)
                    .map_err(replay_io("respond"))?;
                outcome.responded.push(connect.id);
            }
            EventKind::SendLine { .. }
            | EventKind::SendHeaders { .. }
            | EventKind::SendAll { .. }
            | EventKind::SentBody { .. }
            | EventKind::Received { .. }
            | EventKind::Wait { .. }
            | EventKind::Other { .. } => {}
        }
        Ok(())
    }

    /// Apply a request to storage and return its response body
    fn execute<S: Storage>(&self, storage: &mut S, connect: &Connect) -> CoreResult<Vec<u8>> {
        let method = connect.method.ok_or_else(|| incomplete(connect, "method"))?;
        let uri = Path::new(connect.uri.as_deref().ok_or_else(|| incomplete(connect, "uri"))?);
        let present = storage.exists(uri).map_err(replay_io("stat"))?;

        let body = match method {
            Method::Get => {
                if present {
                    storage.read(uri).map_err(replay_io("get"))?
                } else {
                    NOT_FOUND.to_vec()
                }
            }
            Method::Put => {
                let content = read_infile(storage, connect)?;
                storage.write(uri, &content).map_err(replay_io("put"))?;
                if present { OK.to_vec() } else { CREATED.to_vec() }
            }
            Method::Append => {
                if present {
                    let content = read_infile(storage, connect)?;
                    storage.append(uri, &content).map_err(replay_io("append"))?;
                    OK.to_vec()
                } else {
                    NOT_FOUND.to_vec()
                }
            }
        };

        match &connect.infile {
            Some(infile) if method != Method::Get => {
                info!("CREATE: {} {} to {}", method, infile, uri.display());
            }
            _ => info!("CREATE: {} {}", method, uri.display()),
        }
        Ok(body)
    }
}

fn read_infile<S: Storage>(storage: &S, connect: &Connect) -> CoreResult<Vec<u8>> {
    let infile = connect
        .infile
        .as_deref()
        .ok_or_else(|| incomplete(connect, "infile"))?;
    storage.read(Path::new(infile)).map_err(replay_io("read"))
}

fn incomplete(connect: &Connect, field: &str) -> CoreError {
    CoreError::malformed_trace(format!(
        "CONNECT for request {} has no {} to replay",
        connect.id, field
    ))
}

pub(crate) fn replay_io(operation: &'static str) -> impl Fn(StoreError) -> CoreError {
    move |err| {
        let path = match &err {
            StoreError::NotFound { path } | StoreError::Io { path, .. } => path.clone(),
        };
        CoreError::ReplayIo {
            operation: operation.to_string(),
            path,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::TraceGroups;
    use proptest::prelude::*;
    use twist_core::AuditEntry;
    use twist_storage::{FsStorage, MemoryStorage};

    fn rid(raw: u64) -> RequestId {
        RequestId::new(raw)
    }

    fn request(id: u64, method: Method, uri: &str, infile: Option<&str>) -> TraceEvent {
        TraceEvent::new(
            0.0,
            EventKind::Connect(Connect {
                id: rid(id),
                method: Some(method),
                uri: Some(uri.to_string()),
                infile: infile.map(str::to_string),
            }),
        )
    }

    fn schedule_of(events: Vec<TraceEvent>) -> Schedule {
        let groups = TraceGroups::from_events(events);
        let audit: Vec<AuditEntry> = groups.requests.keys().map(|id| AuditEntry::new(*id)).collect();
        Schedule::reconstruct(&groups, &audit).unwrap()
    }

    fn engine() -> ReplayEngine {
        ReplayEngine::new(ReplayConfig::default())
    }

    fn response(storage: &MemoryStorage, id: u64) -> &[u8] {
        storage.get(format!("replay/{}-out", id)).unwrap()
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let mut storage = MemoryStorage::new();
        let schedule = schedule_of(vec![request(1, Method::Get, "/x", None)]);
        let outcome = engine().replay(&mut storage, &schedule).unwrap();
        assert_eq!(response(&storage, 1), NOT_FOUND);
        assert_eq!(outcome.responded, [rid(1)]);
    }

    #[test]
    fn test_put_created_then_ok() {
        let mut storage = MemoryStorage::new()
            .with_file("a.txt", "hi")
            .with_file("b.txt", "bye");
        let schedule = schedule_of(vec![
            request(1, Method::Put, "/x", Some("a.txt")),
            request(2, Method::Get, "/x", None),
            request(3, Method::Put, "/x", Some("b.txt")),
        ]);
        engine().replay(&mut storage, &schedule).unwrap();

        assert_eq!(response(&storage, 1), CREATED);
        assert_eq!(response(&storage, 2), b"hi");
        assert_eq!(response(&storage, 3), OK);
        assert_eq!(storage.get("/x"), Some(&b"bye"[..]));
    }

    #[test]
    fn test_append_missing_leaves_storage_unchanged() {
        let mut storage = MemoryStorage::new().with_file("a.txt", "hi");
        let before = storage.clone();
        let schedule = schedule_of(vec![request(1, Method::Append, "/x", Some("a.txt"))]);
        engine().replay(&mut storage, &schedule).unwrap();

        assert_eq!(response(&storage, 1), NOT_FOUND);
        assert_eq!(storage.get("/x"), None);
        assert_eq!(storage.len(), before.len() + 1);
    }

    #[test]
    fn test_append_existing_concatenates() {
        let mut storage = MemoryStorage::new()
            .with_file("/x", "ab")
            .with_file("c.txt", "cd");
        let schedule = schedule_of(vec![request(1, Method::Append, "/x", Some("c.txt"))]);
        engine().replay(&mut storage, &schedule).unwrap();

        assert_eq!(response(&storage, 1), OK);
        assert_eq!(storage.get("/x"), Some(&b"abcd"[..]));
    }

    #[test]
    fn test_load_and_unload_fixtures() {
        let mut storage = MemoryStorage::new().with_file("fx/a", "fixture");
        let schedule = schedule_of(vec![
            TraceEvent::new(
                0.0,
                EventKind::Load {
                    infile: "fx/a".to_string(),
                    outfile: "a".to_string(),
                },
            ),
            request(1, Method::Get, "a", None),
            TraceEvent::new(0.0, EventKind::Unload { file: "a".to_string() }),
            TraceEvent::new(0.0, EventKind::Unload { file: "never".to_string() }),
        ]);
        let outcome = engine().replay(&mut storage, &schedule).unwrap();

        assert_eq!(response(&storage, 1), b"fixture");
        assert_eq!(storage.get("a"), None);
        assert_eq!(outcome.executed, 4);
    }

    #[test]
    fn test_missing_load_source_is_fatal() {
        let mut storage = MemoryStorage::new();
        let schedule = schedule_of(vec![TraceEvent::new(
            0.0,
            EventKind::Load {
                infile: "fx/missing".to_string(),
                outfile: "a".to_string(),
            },
        )]);
        let err = engine().replay(&mut storage, &schedule).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReplayIo { ref operation, ref path, .. } if operation == "load" && path == "fx/missing"
        ));
    }

    #[test]
    fn test_missing_put_source_is_fatal() {
        let mut storage = MemoryStorage::new();
        let schedule = schedule_of(vec![request(1, Method::Put, "/x", Some("nope"))]);
        assert!(matches!(
            engine().replay(&mut storage, &schedule),
            Err(CoreError::ReplayIo { .. })
        ));
    }

    #[test]
    fn test_bare_connect_cannot_replay() {
        let mut storage = MemoryStorage::new();
        let schedule = schedule_of(vec![TraceEvent::new(
            0.0,
            EventKind::Connect(Connect::bare(rid(1))),
        )]);
        assert!(matches!(
            engine().replay(&mut storage, &schedule),
            Err(CoreError::MalformedTrace { .. })
        ));
    }

    #[test]
    fn test_markers_are_noops() {
        let mut storage = MemoryStorage::new();
        let id = rid(1);
        let schedule = schedule_of(vec![
            request(1, Method::Get, "/x", None),
            TraceEvent::new(0.0, EventKind::SendLine { id }),
            TraceEvent::new(0.0, EventKind::Received { id }),
            TraceEvent::new(0.0, EventKind::Wait { id, status: Some(404) }),
        ]);
        let outcome = engine().replay(&mut storage, &schedule).unwrap();
        assert_eq!(outcome.executed, 4);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let seed = MemoryStorage::new()
            .with_file("a.txt", "one")
            .with_file("b.txt", "two");
        let schedule = schedule_of(vec![
            request(1, Method::Put, "/x", Some("a.txt")),
            request(2, Method::Append, "/x", Some("b.txt")),
            request(3, Method::Get, "/x", None),
        ]);

        let mut first = seed.clone();
        let mut second = seed.clone();
        engine().replay(&mut first, &schedule).unwrap();
        engine().replay(&mut second, &schedule).unwrap();
        assert_eq!(first, second);
        assert_eq!(response(&first, 3), b"onetwo");
    }

    fn arbitrary_request(id: u64, (method, uri, infile): (u8, u8, u8)) -> TraceEvent {
        let method = match method {
            0 => Method::Get,
            1 => Method::Put,
            _ => Method::Append,
        };
        let infile = if infile == 0 { "a.txt" } else { "b.txt" };
        request(id, method, &format!("/r{}", uri), Some(infile))
    }

    proptest! {
        #[test]
        fn prop_replay_is_deterministic(
            ops in prop::collection::vec((0u8..3, 0u8..3, 0u8..2), 0..24)
        ) {
            let seed = MemoryStorage::new()
                .with_file("a.txt", "one\n")
                .with_file("b.txt", "two\n");
            let events: Vec<TraceEvent> = ops
                .iter()
                .enumerate()
                .map(|(i, op)| arbitrary_request(i as u64 + 1, *op))
                .collect();
            let schedule = schedule_of(events);

            let mut first = seed.clone();
            let mut second = seed.clone();
            let a = engine().replay(&mut first, &schedule).unwrap();
            let b = engine().replay(&mut second, &schedule).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(&a, &b);

            let expected: Vec<RequestId> = (1..=ops.len() as u64).map(rid).collect();
            prop_assert_eq!(a.responded, expected);
        }
    }

    #[test]
    fn test_append_existing_without_body_is_fatal() {
        let mut storage = MemoryStorage::new().with_file("/x", "ab");
        let schedule = schedule_of(vec![request(1, Method::Append, "/x", Some("gone.txt"))]);
        let err = engine().replay(&mut storage, &schedule).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReplayIo { ref operation, ref path, .. } if operation == "read" && path == "gone.txt"
        ));
        assert_eq!(storage.get("/x"), Some(&b"ab"[..]));
    }

    #[test]
    fn test_replay_wipes_previous_artifacts() {
        let mut storage = MemoryStorage::new().with_file("replay/99-out", "stale");
        let schedule = schedule_of(vec![request(1, Method::Get, "/x", None)]);
        engine().replay(&mut storage, &schedule).unwrap();
        assert_eq!(storage.get("replay/99-out"), None);
    }

    #[test]
    fn test_replay_on_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        let mut storage = FsStorage::new(dir.path());
        let schedule = schedule_of(vec![
            request(1, Method::Put, "x", Some("a.txt")),
            request(2, Method::Put, "x", Some("a.txt")),
        ]);
        engine().replay(&mut storage, &schedule).unwrap();

        let replay = dir.path().join("replay");
        assert_eq!(std::fs::read(replay.join("1-out")).unwrap(), CREATED);
        assert_eq!(std::fs::read(replay.join("2-out")).unwrap(), OK);
        assert_eq!(std::fs::read(dir.path().join("x")).unwrap(), b"hi");
    }
}
