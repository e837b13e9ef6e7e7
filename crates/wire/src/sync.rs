//! Source and target ends of a replica link.
//!
//! [`SyncSource`] turns the buffered update stream of a graph into task
//! batches, one flush per transaction. A flush larger than the batch limit
//! is split into chunks, and only the last chunk is marked `complete`.
//! [`SyncTarget`] owns the mirror and keeps one transaction open from the
//! first chunk to the complete one, so a source transaction is replayed as
//! a single mirror transaction and a box may still refer to a box that
//! arrives in a later chunk.

use std::sync::Arc;

use boxgraph_core::{ByteInput, ByteOutput, Checksum, CodecError, CodecResult, Subscription};
use boxgraph_engine::{BoxGraph, TransactionListener, Update};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{SyncError, SyncResult};
use crate::task::{decode_batch, encode_batch, UpdateTask};

/// Transport towards a mirror.
pub trait Synchronization: Send + Sync {
    /// Deliver one ordered batch. `complete` is false while more chunks of
    /// the same source transaction follow.
    fn send_updates(&self, tasks: Vec<UpdateTask>, complete: bool) -> SyncResult<()>;

    /// Deliver the source's content hash for comparison.
    fn checksum(&self, checksum: Checksum) -> SyncResult<()>;
}

/// A message on a replica link.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    /// Tasks to apply in order
    Updates {
        /// The chunk
        tasks: Vec<UpdateTask>,
        /// Last chunk of a source transaction
        complete: bool,
    },
    /// Source checksum after the preceding batches
    Checksum(Checksum),
}

impl SyncMessage {
    /// Encode for transport across a process boundary.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            SyncMessage::Updates { tasks, complete } => {
                let mut output = ByteOutput::new();
                output.write_string("updates");
                output.write_bool(*complete);
                output.write_raw(&encode_batch(tasks));
                output.into_bytes()
            }
            SyncMessage::Checksum(checksum) => {
                let mut output = ByteOutput::new();
                output.write_string("checksum");
                output.write_raw(checksum.as_bytes());
                output.into_bytes()
            }
        }
    }

    /// Decode a message written by [`SyncMessage::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let mut input = ByteInput::new(bytes);
        let tag = input.read_string()?;
        match tag.as_str() {
            "updates" => {
                let complete = input.read_bool()?;
                Ok(SyncMessage::Updates {
                    tasks: decode_batch(input.rest())?,
                    complete,
                })
            }
            "checksum" => {
                let mut digest = [0u8; 16];
                digest.copy_from_slice(input.take(16)?);
                Ok(SyncMessage::Checksum(Checksum(digest)))
            }
            _ => Err(CodecError::UnknownTag(tag)),
        }
    }
}

/// [`Synchronization`] over a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSynchronization {
    sender: Sender<SyncMessage>,
}

impl ChannelSynchronization {
    /// Wrap an existing sender.
    pub fn new(sender: Sender<SyncMessage>) -> Self {
        Self { sender }
    }
}

impl Synchronization for ChannelSynchronization {
    fn send_updates(&self, tasks: Vec<UpdateTask>, complete: bool) -> SyncResult<()> {
        self.sender
            .send(SyncMessage::Updates { tasks, complete })
            .map_err(|_| SyncError::Disconnected)
    }

    fn checksum(&self, checksum: Checksum) -> SyncResult<()> {
        self.sender
            .send(SyncMessage::Checksum(checksum))
            .map_err(|_| SyncError::Disconnected)
    }
}

/// An unbounded link: the transport for a [`SyncSource`] and the receiver
/// for [`SyncTarget::run`].
pub fn channel() -> (ChannelSynchronization, Receiver<SyncMessage>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (ChannelSynchronization::new(sender), receiver)
}

// =============================================================================
// Source
// =============================================================================

struct Outbox {
    pending: Mutex<Vec<UpdateTask>>,
    transport: Box<dyn Synchronization>,
    max_batch: usize,
}

impl Outbox {
    fn flush(&self) -> SyncResult<usize> {
        let mut rest = std::mem::take(&mut *self.pending.lock());
        let total = rest.len();
        while !rest.is_empty() {
            let tail = rest.split_off(rest.len().min(self.max_batch));
            let complete = tail.is_empty();
            trace!(target: "boxgraph::sync", tasks = rest.len(), complete, "sending batch");
            self.transport.send_updates(rest, complete)?;
            rest = tail;
        }
        Ok(total)
    }
}

struct FlushOnEnd(Arc<Outbox>);

impl TransactionListener for FlushOnEnd {
    fn on_end_transaction(&self) {
        if let Err(error) = self.0.flush() {
            warn!(target: "boxgraph::sync", %error, "batch rejected by peer");
        }
    }
}

/// Ships the changes of a graph to a mirror.
pub struct SyncSource {
    outbox: Arc<Outbox>,
    subscriptions: Vec<Subscription>,
}

impl SyncSource {
    /// Start listening to `graph`. With `initialize`, the current content
    /// is sent first as `new` tasks in creation order. Call outside a
    /// transaction.
    pub fn new(
        graph: &BoxGraph,
        transport: impl Synchronization + 'static,
        initialize: bool,
    ) -> SyncResult<Self> {
        let outbox = Arc::new(Outbox {
            pending: Mutex::new(Vec::new()),
            transport: Box::new(transport),
            max_batch: graph.config().max_sync_batch.max(1),
        });

        if initialize {
            let mut boxes: Vec<_> = graph.boxes().collect();
            boxes.sort_by_key(|graph_box| graph_box.creation_index());
            outbox.pending.lock().extend(boxes.into_iter().map(|graph_box| {
                UpdateTask::New {
                    kind: graph_box.kind().to_string(),
                    uuid: graph_box.uuid(),
                    bytes: graph_box.to_bytes(),
                }
            }));
            let sent = outbox.flush()?;
            debug!(target: "boxgraph::sync", boxes = sent, "initial content sent");
        }

        let sink = Arc::clone(&outbox);
        let updates = graph.subscribe_to_all_updates(move |update: &Update| {
            sink.pending.lock().push(UpdateTask::from_update(update));
        });
        let transactions = graph.subscribe_transaction(FlushOnEnd(Arc::clone(&outbox)));
        Ok(Self {
            outbox,
            subscriptions: vec![updates, transactions],
        })
    }

    /// Tasks collected but not yet sent.
    pub fn pending(&self) -> usize {
        self.outbox.pending.lock().len()
    }

    /// Send everything collected so far as one mirror transaction. Returns
    /// the number of tasks sent.
    pub fn flush(&self) -> SyncResult<usize> {
        self.outbox.flush()
    }

    /// Flush, then send the checksum of `graph`.
    pub fn send_checksum(&self, graph: &BoxGraph) -> SyncResult<()> {
        self.flush()?;
        let checksum = graph.checksum();
        trace!(target: "boxgraph::sync", %checksum, "sending checksum");
        self.outbox.transport.checksum(checksum)
    }

    /// Stop listening. Unsent tasks are dropped.
    pub fn terminate(self) {
        for subscription in self.subscriptions {
            subscription.terminate();
        }
    }
}

impl std::fmt::Debug for SyncSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSource")
            .field("pending", &self.pending())
            .field("max_batch", &self.outbox.max_batch)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Target
// =============================================================================

/// Owns a mirror graph and applies incoming batches.
#[derive(Debug)]
pub struct SyncTarget {
    graph: BoxGraph,
    applied: usize,
}

impl SyncTarget {
    /// Mirror into `graph`.
    pub fn new(graph: BoxGraph) -> Self {
        Self { graph, applied: 0 }
    }

    /// The mirror.
    pub fn graph(&self) -> &BoxGraph {
        &self.graph
    }

    /// Give the mirror back.
    pub fn into_graph(self) -> BoxGraph {
        self.graph
    }

    /// Number of tasks applied so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Apply a batch in order inside one transaction.
    pub fn apply(&mut self, tasks: &[UpdateTask]) -> SyncResult<()> {
        self.apply_chunk(tasks, true)
    }

    /// Apply one chunk of a source transaction. The mirror transaction is
    /// opened by the first chunk and closed by the `complete` one, or by
    /// the first failure.
    pub fn apply_chunk(&mut self, tasks: &[UpdateTask], complete: bool) -> SyncResult<()> {
        if !self.graph.in_transaction() {
            self.graph.begin_transaction()?;
        }
        let result = tasks.iter().try_for_each(|task| task.apply(&mut self.graph));
        if result.is_err() || complete {
            let ended = self.graph.end_transaction();
            result?;
            ended?;
        }
        self.applied += tasks.len();
        trace!(target: "boxgraph::sync", tasks = tasks.len(), complete, "batch applied");
        Ok(())
    }

    /// True while chunks of a source transaction are still expected.
    pub fn is_mid_transaction(&self) -> bool {
        self.graph.in_transaction()
    }

    /// Compare the mirror against the source's checksum.
    pub fn verify_checksum(&self, expected: Checksum) -> SyncResult<()> {
        let actual = self.graph.checksum();
        if actual != expected {
            warn!(target: "boxgraph::sync", %expected, %actual, "mirror diverged");
            return Err(SyncError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }

    /// Handle one message.
    pub fn handle(&mut self, message: SyncMessage) -> SyncResult<()> {
        match message {
            SyncMessage::Updates { tasks, complete } => self.apply_chunk(&tasks, complete),
            SyncMessage::Checksum(expected) => self.verify_checksum(expected),
        }
    }

    /// Handle messages until the sender side disconnects. Stops at the
    /// first failure. Returns the number of messages handled.
    pub fn run(&mut self, receiver: &Receiver<SyncMessage>) -> SyncResult<usize> {
        let mut handled = 0;
        for message in receiver.iter() {
            self.handle(message)?;
            handled += 1;
        }
        if self.graph.in_transaction() {
            warn!(target: "boxgraph::sync", "link closed inside a source transaction");
            self.graph.end_transaction()?;
        }
        debug!(target: "boxgraph::sync", handled, applied = self.applied, "link closed");
        Ok(handled)
    }
}
