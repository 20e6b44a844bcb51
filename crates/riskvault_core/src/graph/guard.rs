//! Timeout guard for note-graph calls.
//!
//! Each call runs on a short-lived helper thread; the caller waits at most
//! `timeout` for the result. A call that outlives the bound keeps running in
//! the background.
//!
//! # Invariants
//! - At most `max_in_flight` helper threads exist at once; past that, calls
//!   fail fast with `Unavailable` instead of spawning.
//! - A timed-out write is parked. Repeating the identical write rejoins the
//!   parked call instead of sending it again, so a retried `create_note`
//!   never lands twice.

use super::{GraphError, GraphResult, NoteGraphStore};
use crate::model::note::{Note, NotePatch};
use crate::model::RecordId;
use log::{debug, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Identity of one write call; equal requests may share a parked call.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteRequest {
    Create(Note),
    Update(RecordId, NotePatch),
    Delete(RecordId),
}

impl WriteRequest {
    fn operation(&self) -> &'static str {
        match self {
            Self::Create(_) => "create_note",
            Self::Update(..) => "update_note",
            Self::Delete(_) => "delete_note",
        }
    }

    fn note_id(&self) -> &str {
        match self {
            Self::Create(note) => &note.id,
            Self::Update(id, _) | Self::Delete(id) => id,
        }
    }

    fn send_to(&self, store: &dyn NoteGraphStore) -> GraphResult<()> {
        match self {
            Self::Create(note) => store.create_note(note),
            Self::Update(id, patch) => store.update_note(id, patch),
            Self::Delete(id) => store.delete_note(id),
        }
    }
}

struct ParkedWrite {
    request: WriteRequest,
    receiver: Receiver<GraphResult<()>>,
}

/// Decrements the in-flight counter when a helper thread ends, even on panic.
struct InFlightSlot(Arc<AtomicUsize>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `NoteGraphStore` wrapper that fails with `GraphError::Timeout` instead of hanging.
pub struct GuardedNoteGraph {
    inner: Arc<dyn NoteGraphStore>,
    timeout: Duration,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
    parked: Mutex<Vec<ParkedWrite>>,
}

impl GuardedNoteGraph {
    pub fn new(inner: Arc<dyn NoteGraphStore>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            in_flight: Arc::new(AtomicUsize::new(0)),
            parked: Mutex::new(Vec::new()),
        }
    }

    /// Caps concurrent helper threads, including ones left behind by timeouts.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Helper threads currently running, finished or not awaited.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn spawn<T, F>(&self, operation: &'static str, call: F) -> GraphResult<Receiver<GraphResult<T>>>
    where
        T: Send + 'static,
        F: FnOnce(&dyn NoteGraphStore) -> GraphResult<T> + Send + 'static,
    {
        let claimed = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < self.max_in_flight).then_some(current + 1)
            });
        if claimed.is_err() {
            warn!(
                "event=graph_call module=graph status=error operation={} error_code=store_unavailable reason=in_flight_limit limit={}",
                operation, self.max_in_flight
            );
            return Err(GraphError::Unavailable(format!(
                "{} graph calls still in flight",
                self.max_in_flight
            )));
        }

        let slot = InFlightSlot(Arc::clone(&self.in_flight));
        let inner = Arc::clone(&self.inner);
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name(format!("note-graph-{operation}"))
            .spawn(move || {
                let _slot = slot;
                let _ = sender.send(call(inner.as_ref()));
            })
            .map_err(|err| GraphError::Unavailable(format!("failed to spawn graph call: {err}")))?;
        Ok(receiver)
    }

    fn wait<T>(
        &self,
        operation: &'static str,
        started_at: Instant,
        receiver: &Receiver<GraphResult<T>>,
    ) -> GraphResult<T> {
        match receiver.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    "event=graph_call module=graph status=error operation={} duration_ms={} error_code=store_timeout",
                    operation,
                    started_at.elapsed().as_millis()
                );
                Err(GraphError::Timeout {
                    operation,
                    timeout_ms,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(GraphError::Unavailable(format!(
                "graph call `{operation}` ended without a result"
            ))),
        }
    }

    fn call<T, F>(&self, operation: &'static str, call: F) -> GraphResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn NoteGraphStore) -> GraphResult<T> + Send + 'static,
    {
        let started_at = Instant::now();
        let receiver = self.spawn(operation, call)?;
        self.wait(operation, started_at, &receiver)
    }

    fn write(&self, request: WriteRequest) -> GraphResult<()> {
        let started_at = Instant::now();
        let operation = request.operation();
        let parked = {
            let mut parked = self.lock_parked()?;
            parked
                .iter()
                .position(|entry| entry.request == request)
                .map(|index| parked.remove(index))
        };

        let receiver = match parked {
            Some(entry) => {
                debug!(
                    "event=graph_call module=graph status=rejoin operation={} note_id={}",
                    operation,
                    request.note_id()
                );
                entry.receiver
            }
            None => {
                let sent = request.clone();
                self.spawn(operation, move |store| sent.send_to(store))?
            }
        };

        let result = self.wait(operation, started_at, &receiver);
        if matches!(result, Err(GraphError::Timeout { .. })) {
            let mut parked = self.lock_parked()?;
            if parked.len() >= self.max_in_flight {
                parked.remove(0);
            }
            parked.push(ParkedWrite { request, receiver });
        }
        result
    }

    fn lock_parked(&self) -> GraphResult<MutexGuard<'_, Vec<ParkedWrite>>> {
        self.parked
            .lock()
            .map_err(|_| GraphError::Unavailable("parked graph calls lock poisoned".to_string()))
    }
}

impl NoteGraphStore for GuardedNoteGraph {
    fn search(&self, query: &str) -> GraphResult<Vec<Note>> {
        let query = query.to_string();
        self.call("search", move |store| store.search(&query))
    }

    fn create_note(&self, note: &Note) -> GraphResult<()> {
        self.write(WriteRequest::Create(note.clone()))
    }

    fn update_note(&self, note_id: &str, patch: &NotePatch) -> GraphResult<()> {
        self.write(WriteRequest::Update(note_id.to_string(), patch.clone()))
    }

    fn delete_note(&self, note_id: &str) -> GraphResult<()> {
        self.write(WriteRequest::Delete(note_id.to_string()))
    }

    fn count_connections(&self, note_id: &str) -> GraphResult<u32> {
        let note_id = note_id.to_string();
        self.call("count_connections", move |store| {
            store.count_connections(&note_id)
        })
    }
}
