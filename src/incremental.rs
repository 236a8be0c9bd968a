//! The incremental-delivery coordinator (§4.8): tracks every `@defer`d
//! fragment and `@stream`d list as a numbered record, and turns their
//! completions into the initial-plus-subsequent payload sequence described
//! in §6.
//!
//! Grounded on the same channel-plus-`Stream` shape the teacher crate uses
//! for its own async boundary (an `UnboundedSender`/`UnboundedReceiver`
//! pair from `tokio::sync::mpsc`, with a hand-rolled [`futures::Stream`]
//! impl over the receiving end, since this crate has no `tokio-stream`
//! dependency to reach for a ready-made wrapper). A [`tokio::sync::Semaphore`]
//! enforces the configured cap on in-flight records (§5, `ExecutionConfig`).

use std::{
    collections::HashSet,
    fmt,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

use crate::{error::ExecutionError, path::PathElement, value::Object, value::Value};

/// Identifies one `@defer`d fragment or `@stream`d list across the whole
/// lifetime of an operation's incremental delivery. Stable once assigned
/// (§4.8 invariant: "record IDs are stable for the life of the record").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct RecordId(u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record announced in a `pending` list: execution has started
/// collecting it, but it has not completed yet.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PendingEntry {
    /// This record's stable id.
    pub id: RecordId,
    /// Response path at which this record's data will be merged.
    pub path: Vec<PathElement>,
    /// The directive's `label` argument, if given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One chunk of data delivered for a record that has not yet completed.
#[derive(Clone, Debug)]
pub enum IncrementalEntry {
    /// Data for a `@defer`d fragment, to be merged as an object at the
    /// record's path.
    Fragment {
        /// The record this chunk belongs to.
        id: RecordId,
        /// The deferred fragment's completed field data.
        data: Object,
        /// Field errors raised while completing this fragment.
        errors: Vec<ExecutionError>,
    },
    /// New items for a `@stream`d list, appended after whatever has already
    /// been delivered for this record.
    List {
        /// The record this chunk belongs to.
        id: RecordId,
        /// The newly-available list items, in order.
        items: Vec<Value>,
        /// Field errors raised while completing these items.
        errors: Vec<ExecutionError>,
    },
}

/// A record that will receive no further data.
#[derive(Clone, Debug)]
pub struct CompletedEntry {
    /// The completed record's id.
    pub id: RecordId,
    /// Errors that terminated this record, if it ended abnormally (e.g. a
    /// `@stream`d iterable raised an error mid-sequence).
    pub errors: Vec<ExecutionError>,
}

/// One payload in an operation's incremental delivery sequence (§6).
#[derive(Clone, Debug)]
pub enum IncrementalPayload {
    /// The first payload: the synchronously-available portion of the
    /// response, plus which records are already pending.
    Initial {
        /// The root data, with deferred/streamed positions omitted or
        /// truncated per §4.8.
        data: Value,
        /// Field errors raised while producing the initial payload.
        errors: Vec<ExecutionError>,
        /// Records deferred or streamed out of the initial payload.
        pending: Vec<PendingEntry>,
        /// Whether any subsequent payload will follow.
        has_next: bool,
    },
    /// A later payload: newly available data, records that just completed,
    /// and records that only just started being collected.
    Subsequent {
        /// Newly available chunks.
        incremental: Vec<IncrementalEntry>,
        /// Records delivering no further data.
        completed: Vec<CompletedEntry>,
        /// Records newly announced as pending (e.g. a `@defer` nested
        /// inside a `@stream`d item that was just produced).
        pending: Vec<PendingEntry>,
        /// Whether any further subsequent payload will follow.
        has_next: bool,
    },
}

impl PendingEntry {
    /// Serializes this entry into the `{id, path, label?}` shape described
    /// in §4.8.
    pub fn to_response_object(&self) -> Object {
        let mut obj = Object::with_capacity(3);
        obj.add_field("id", Value::from(self.id.to_string()));
        obj.add_field(
            "path",
            Value::List(self.path.iter().map(PathElement::to_value).collect()),
        );
        if let Some(label) = &self.label {
            obj.add_field("label", Value::from(label.clone()));
        }
        obj
    }
}

impl CompletedEntry {
    /// Serializes this entry into the `{id, errors?}` shape described in
    /// §4.8.
    pub fn to_response_object(&self) -> Object {
        let mut obj = Object::with_capacity(2);
        obj.add_field("id", Value::from(self.id.to_string()));
        if !self.errors.is_empty() {
            let errors = self.errors.iter().map(|e| Value::Object(e.to_response_object())).collect();
            obj.add_field("errors", Value::List(errors));
        }
        obj
    }
}

impl IncrementalEntry {
    /// Serializes this entry into the `{id, data|items, errors?}` shape
    /// described in §4.8.
    pub fn to_response_object(&self) -> Object {
        match self {
            Self::Fragment { id, data, errors } => {
                let mut obj = Object::with_capacity(3);
                obj.add_field("id", Value::from(id.to_string()));
                obj.add_field("data", Value::Object(data.clone()));
                if !errors.is_empty() {
                    let errors = errors.iter().map(|e| Value::Object(e.to_response_object())).collect();
                    obj.add_field("errors", Value::List(errors));
                }
                obj
            }
            Self::List { id, items, errors } => {
                let mut obj = Object::with_capacity(3);
                obj.add_field("id", Value::from(id.to_string()));
                obj.add_field("items", Value::List(items.clone()));
                if !errors.is_empty() {
                    let errors = errors.iter().map(|e| Value::Object(e.to_response_object())).collect();
                    obj.add_field("errors", Value::List(errors));
                }
                obj
            }
        }
    }
}

impl IncrementalPayload {
    /// Serializes this payload into the top-level shape described in §6:
    /// `data`/`pending`/`hasNext` for the initial payload, or
    /// `incremental`/`completed`/`pending`/`hasNext` for a subsequent one.
    pub fn to_response_object(&self) -> Object {
        match self {
            Self::Initial {
                data,
                errors,
                pending,
                has_next,
            } => {
                let mut obj = Object::with_capacity(4);
                obj.add_field("data", data.clone());
                if !errors.is_empty() {
                    let errors = errors.iter().map(|e| Value::Object(e.to_response_object())).collect();
                    obj.add_field("errors", Value::List(errors));
                }
                if !pending.is_empty() {
                    let pending = pending.iter().map(|p| Value::Object(p.to_response_object())).collect();
                    obj.add_field("pending", Value::List(pending));
                }
                obj.add_field("hasNext", Value::from(*has_next));
                obj
            }
            Self::Subsequent {
                incremental,
                completed,
                pending,
                has_next,
            } => {
                let mut obj = Object::with_capacity(4);
                if !incremental.is_empty() {
                    let incremental = incremental.iter().map(|e| Value::Object(e.to_response_object())).collect();
                    obj.add_field("incremental", Value::List(incremental));
                }
                if !completed.is_empty() {
                    let completed = completed.iter().map(|c| Value::Object(c.to_response_object())).collect();
                    obj.add_field("completed", Value::List(completed));
                }
                if !pending.is_empty() {
                    let pending = pending.iter().map(|p| Value::Object(p.to_response_object())).collect();
                    obj.add_field("pending", Value::List(pending));
                }
                obj.add_field("hasNext", Value::from(*has_next));
                obj
            }
        }
    }

    /// Whether this is the terminal payload of the sequence.
    pub fn has_next(&self) -> bool {
        match self {
            Self::Initial { has_next, .. } | Self::Subsequent { has_next, .. } => *has_next,
        }
    }
}

/// Tracks every in-flight record and turns their completions into the
/// ordered [`IncrementalPayload`] sequence a caller consumes as a
/// [`Stream`].
pub struct Coordinator {
    next_id: AtomicU64,
    outstanding: Arc<std::sync::Mutex<HashSet<RecordId>>>,
    sender: mpsc::UnboundedSender<IncrementalPayload>,
    concurrency: Arc<Semaphore>,
}

impl Coordinator {
    /// Constructs a coordinator allowing at most `concurrency_cap`
    /// simultaneously in-flight records, returning it alongside the
    /// [`Stream`] of payloads it will produce after the initial one.
    pub fn new(concurrency_cap: usize) -> (Self, PayloadStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let coordinator = Self {
            next_id: AtomicU64::new(0),
            outstanding: Arc::new(std::sync::Mutex::new(HashSet::new())),
            sender,
            concurrency: Arc::new(Semaphore::new(concurrency_cap.max(1))),
        };
        (coordinator, PayloadStream { receiver })
    }

    /// Reserves a new record as pending: assigns its stable id and marks it
    /// outstanding, synchronously, so the caller can fold its
    /// [`PendingEntry`] into whichever payload announces it without
    /// racing the record's own background execution (§4.8 invariant:
    /// "a record is announced pending no later than the payload in which
    /// its parent data appears").
    ///
    /// The returned handle still owes a concurrency permit before it may
    /// begin real work; acquire one with [`RecordHandle::admit`] from
    /// within the task that will do that work, so throttling at the
    /// configured cap (§5) never delays the announcement itself.
    pub fn begin_record(&self, path: Vec<PathElement>, label: Option<String>) -> RecordHandle {
        let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.outstanding.lock().unwrap().insert(id);
        RecordHandle {
            id,
            path,
            label,
            sender: self.sender.clone(),
            outstanding: self.outstanding.clone(),
            concurrency: self.concurrency.clone(),
            permit: None,
        }
    }

    /// Filters a record announced via [`begin_record`](Self::begin_record)
    /// without ever admitting or completing it, because non-null
    /// propagation has nulled out an ancestor of its path before the
    /// record's own pass finished (§4.8 "Filtering"): the caller never
    /// learns this record existed, and the background task still holding
    /// its [`RecordHandle`] becomes a no-op the moment it tries to deliver,
    /// since every delivery method first checks the same outstanding set
    /// this removes the id from.
    pub fn filter_pending(&self, entries: &[PendingEntry]) {
        if entries.is_empty() {
            return;
        }
        let mut outstanding = self.outstanding.lock().unwrap();
        for entry in entries {
            outstanding.remove(&entry.id);
        }
    }

    /// Emits the initial payload. Must be called exactly once, before any
    /// [`RecordHandle`] created via [`begin_record`](Self::begin_record)
    /// completes.
    pub fn initial_payload(
        &self,
        data: Value,
        errors: Vec<ExecutionError>,
        pending: Vec<PendingEntry>,
    ) -> IncrementalPayload {
        let has_next = !pending.is_empty();
        IncrementalPayload::Initial {
            data,
            errors,
            pending,
            has_next,
        }
    }
}

/// A registered, not-yet-completed `@defer`/`@stream` record.
pub struct RecordHandle {
    id: RecordId,
    path: Vec<PathElement>,
    label: Option<String>,
    sender: mpsc::UnboundedSender<IncrementalPayload>,
    outstanding: Arc<std::sync::Mutex<HashSet<RecordId>>>,
    concurrency: Arc<Semaphore>,
    permit: Option<OwnedSemaphorePermit>,
}

impl RecordHandle {
    /// This record's stable id.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Waits for a concurrency permit under the configured cap (§5).
    /// Call this from within the background task once it is ready to do
    /// real work, after the record has already been announced pending.
    pub async fn admit(&mut self) {
        let permit = self
            .concurrency
            .clone()
            .acquire_owned()
            .await
            .expect("coordinator semaphore is never closed while a Coordinator exists");
        self.permit = Some(permit);
    }

    /// The [`PendingEntry`] announcing this record.
    pub fn pending_entry(&self) -> PendingEntry {
        PendingEntry {
            id: self.id,
            path: self.path.clone(),
            label: self.label.clone(),
        }
    }

    fn is_outstanding(&self) -> bool {
        self.outstanding.lock().unwrap().contains(&self.id)
    }

    fn has_next(&self) -> bool {
        !self.outstanding.lock().unwrap().is_empty()
    }

    /// Delivers a completed `@defer`d fragment's data and completes the
    /// record.
    ///
    /// `newly_pending` announces any `@defer`/`@stream` found nested inside
    /// this fragment's own selection set (§4.8: a deferred fragment's
    /// interior can itself schedule further records).
    pub fn complete_fragment(
        mut self,
        data: Object,
        errors: Vec<ExecutionError>,
        newly_pending: Vec<PendingEntry>,
    ) {
        if !self.is_outstanding() {
            return;
        }
        let id = self.id;
        self.finish_outstanding();
        let has_next = self.has_next();
        let _ = self.sender.send(IncrementalPayload::Subsequent {
            incremental: vec![IncrementalEntry::Fragment { id, data, errors: vec![] }],
            completed: vec![CompletedEntry { id, errors }],
            pending: newly_pending,
            has_next,
        });
        self.permit.take();
    }

    /// Delivers a chunk of newly-available `@stream`d list items, leaving
    /// the record outstanding for further chunks.
    ///
    /// `newly_pending` announces any `@defer`/`@stream` found nested inside
    /// the item(s) just completed.
    pub fn deliver_stream_items(
        &self,
        items: Vec<Value>,
        errors: Vec<ExecutionError>,
        newly_pending: Vec<PendingEntry>,
    ) {
        if !self.is_outstanding() {
            return;
        }
        let _ = self.sender.send(IncrementalPayload::Subsequent {
            incremental: vec![IncrementalEntry::List { id: self.id, items, errors }],
            completed: vec![],
            pending: newly_pending,
            has_next: true,
        });
    }

    /// Completes a `@stream`d record once its source iterable is
    /// exhausted (or has failed).
    ///
    /// `newly_pending` announces any `@defer`/`@stream` nested inside the
    /// final item whose completion caused the stream to end (e.g. one that
    /// terminated the loop by failing a non-null item check before its own
    /// chunk could be delivered).
    pub fn complete_stream(mut self, errors: Vec<ExecutionError>, newly_pending: Vec<PendingEntry>) {
        if !self.is_outstanding() {
            return;
        }
        let id = self.id;
        self.finish_outstanding();
        let has_next = self.has_next();
        let _ = self.sender.send(IncrementalPayload::Subsequent {
            incremental: vec![],
            completed: vec![CompletedEntry { id, errors }],
            pending: newly_pending,
            has_next,
        });
        self.permit.take();
    }

    /// Drops this record without ever delivering or completing it, because
    /// non-null propagation has nulled out an ancestor position: per §4.8,
    /// a record whose parent has been nulled out is simply never announced
    /// to the client as pending, so it is likewise never completed.
    pub fn discard_for_null_propagation(mut self) {
        self.finish_outstanding();
        self.permit.take();
    }

    fn finish_outstanding(&mut self) {
        self.outstanding.lock().unwrap().remove(&self.id);
    }
}

impl Drop for RecordHandle {
    fn drop(&mut self) {
        // A handle dropped without an explicit completion call (e.g. a
        // panicking resolver) still must not hold its concurrency permit
        // or its outstanding-record membership forever.
        self.finish_outstanding();
    }
}

/// The [`Stream`] of [`IncrementalPayload`]s following an operation's
/// initial payload.
pub struct PayloadStream {
    receiver: mpsc::UnboundedReceiver<IncrementalPayload>,
}

impl Stream for PayloadStream {
    type Item = IncrementalPayload;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn begin_record_and_complete_fragment_emits_subsequent_payload() {
        let (coordinator, mut stream) = Coordinator::new(4);
        let handle = coordinator.begin_record(vec![PathElement::Key("a".into())], None);
        let pending = handle.pending_entry();
        assert_eq!(pending.id, handle.id());

        handle.complete_fragment(Object::with_capacity(0), vec![], vec![]);

        let payload = stream.next().await.expect("expected a payload");
        match payload {
            IncrementalPayload::Subsequent { completed, has_next, .. } => {
                assert_eq!(completed.len(), 1);
                assert!(!has_next);
            }
            other => panic!("expected Subsequent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn has_next_stays_true_while_other_records_remain_outstanding() {
        let (coordinator, mut stream) = Coordinator::new(4);
        let first = coordinator.begin_record(vec![], None);
        let second = coordinator.begin_record(vec![], None);

        first.complete_fragment(Object::with_capacity(0), vec![], vec![]);
        let payload = stream.next().await.unwrap();
        match payload {
            IncrementalPayload::Subsequent { has_next, .. } => assert!(has_next),
            other => panic!("expected Subsequent, got {other:?}"),
        }

        second.complete_fragment(Object::with_capacity(0), vec![], vec![]);
        let payload = stream.next().await.unwrap();
        match payload {
            IncrementalPayload::Subsequent { has_next, .. } => assert!(!has_next),
            other => panic!("expected Subsequent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn begin_record_never_blocks_even_at_the_concurrency_cap() {
        // Reservation (and therefore pending-announcement) must stay
        // synchronous regardless of how many records are already admitted,
        // so the cap can only ever throttle `admit`, never the engine's
        // ability to tell the caller a record now exists.
        let (coordinator, _stream) = Coordinator::new(1);
        let _first = coordinator.begin_record(vec![], None);
        let _second = coordinator.begin_record(vec![], None);
    }

    #[tokio::test]
    async fn admit_blocks_additional_records_until_one_completes() {
        let (coordinator, _stream) = Coordinator::new(1);
        let mut first = coordinator.begin_record(vec![], None);
        first.admit().await;

        let mut second = coordinator.begin_record(vec![], None);
        let blocked = tokio::time::timeout(std::time::Duration::from_millis(20), second.admit()).await;
        assert!(blocked.is_err(), "expected admit to block at the concurrency cap");

        first.discard_for_null_propagation();
        second.admit().await;
    }

    #[tokio::test]
    async fn complete_fragment_forwards_newly_pending_records() {
        let (coordinator, mut stream) = Coordinator::new(4);
        let handle = coordinator.begin_record(vec![PathElement::Key("a".into())], None);
        let nested = coordinator.begin_record(vec![PathElement::Key("b".into())], None);
        let nested_pending = nested.pending_entry();

        handle.complete_fragment(Object::with_capacity(0), vec![], vec![nested_pending.clone()]);

        let payload = stream.next().await.expect("expected a payload");
        match payload {
            IncrementalPayload::Subsequent { pending, .. } => {
                assert_eq!(pending.len(), 1);
                assert_eq!(pending[0].id, nested_pending.id);
            }
            other => panic!("expected Subsequent, got {other:?}"),
        }
        nested.discard_for_null_propagation();
    }

    #[tokio::test]
    async fn discarded_record_never_appears_in_the_stream() {
        let (coordinator, mut stream) = Coordinator::new(4);
        let handle = coordinator.begin_record(vec![], None);
        handle.discard_for_null_propagation();
        drop(coordinator);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn filtered_record_is_a_no_op_even_if_its_task_still_completes_it() {
        let (coordinator, mut stream) = Coordinator::new(4);
        let handle = coordinator.begin_record(vec![PathElement::Key("a".into())], None);
        let pending = handle.pending_entry();

        coordinator.filter_pending(&[pending]);
        // The background task holding `handle` didn't know it was filtered
        // and tries to complete it anyway; the outstanding-set check inside
        // must swallow this rather than emit a payload for a record the
        // caller was never told about.
        handle.complete_fragment(Object::with_capacity(0), vec![], vec![]);

        drop(coordinator);
        assert!(stream.next().await.is_none());
    }
}

impl fmt::Debug for IncrementalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial { pending, has_next, .. } => f
                .debug_struct("Initial")
                .field("pending", pending)
                .field("has_next", has_next)
                .finish(),
            Self::Subsequent {
                completed,
                has_next,
                ..
            } => f
                .debug_struct("Subsequent")
                .field("completed", &completed.iter().map(|c| c.id).collect::<Vec<_>>())
                .field("has_next", has_next)
                .finish(),
        }
    }
}
