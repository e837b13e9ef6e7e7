//! Undo/redo history built on the immediate update channel.

use std::sync::Arc;

use boxgraph_core::Subscription;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::GraphResult;
use crate::graph::BoxGraph;
use crate::updates::Update;

#[derive(Default)]
struct Recorder {
    recording: bool,
    updates: Vec<Update>,
}

/// Records modifications as history steps and replays them.
pub struct Editing {
    recorder: Arc<Mutex<Recorder>>,
    subscription: Subscription,
    history: Vec<Vec<Update>>,
    cursor: usize,
}

impl Editing {
    /// Start listening to `graph`.
    pub fn new(graph: &BoxGraph) -> Self {
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        let sink = Arc::clone(&recorder);
        let subscription = graph.subscribe_to_all_updates_immediate(move |update: &Update| {
            let mut recorder = sink.lock();
            if recorder.recording {
                recorder.updates.push(update.clone());
            }
        });
        Self {
            recorder,
            subscription,
            history: Vec::new(),
            cursor: 0,
        }
    }

    /// Run `modifier` in a transaction and record its updates as one step.
    /// An empty step is not recorded. A recorded step drops the redo tail.
    pub fn modify<R>(
        &mut self,
        graph: &mut BoxGraph,
        modifier: impl FnOnce(&mut BoxGraph) -> GraphResult<R>,
    ) -> GraphResult<R> {
        graph.begin_transaction()?;
        self.recorder.lock().recording = true;
        let result = modifier(graph);
        let ended = graph.end_transaction();
        let updates = {
            let mut recorder = self.recorder.lock();
            recorder.recording = false;
            std::mem::take(&mut recorder.updates)
        };
        if !updates.is_empty() {
            self.history.truncate(self.cursor);
            debug!(target: "boxgraph::editing", updates = updates.len(), "step recorded");
            self.history.push(updates);
            self.cursor = self.history.len();
        }
        let value = result?;
        ended?;
        Ok(value)
    }

    /// True if there is a step to undo.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// True if there is a step to redo.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    /// Revert the last step. Returns `false` if there is nothing to undo.
    pub fn undo(&mut self, graph: &mut BoxGraph) -> GraphResult<bool> {
        if !self.can_undo() {
            return Ok(false);
        }
        let step = &self.history[self.cursor - 1];
        graph.transaction(|graph| {
            // boxes created in this step may point at each other in any order
            for update in step {
                if let Update::New(created) = update {
                    if graph.find_box(created.uuid()).is_some() {
                        graph.detach_outgoing_pointers(created.uuid())?;
                    }
                }
            }
            step.iter().rev().try_for_each(|update| update.inverse(graph))
        })?;
        self.cursor -= 1;
        debug!(target: "boxgraph::editing", cursor = self.cursor, "undo");
        Ok(true)
    }

    /// Replay the next step. Returns `false` if there is nothing to redo.
    pub fn redo(&mut self, graph: &mut BoxGraph) -> GraphResult<bool> {
        if !self.can_redo() {
            return Ok(false);
        }
        let step = &self.history[self.cursor];
        graph.transaction(|graph| step.iter().try_for_each(|update| update.forward(graph)))?;
        self.cursor += 1;
        debug!(target: "boxgraph::editing", cursor = self.cursor, "redo");
        Ok(true)
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Forget all steps.
    pub fn clear(&mut self) {
        self.history.clear();
        self.cursor = 0;
    }

    /// Stop listening to the graph.
    pub fn terminate(self) {
        self.subscription.terminate();
    }
}
