//! The box graph: a transactional store of boxes and their pointer edges.
//!
//! All mutations happen inside a transaction. Every committed change is
//! turned into an [`Update`] and fanned out to three audiences:
//! - address-scoped subscribers ([`BoxGraph::subscribe_vertex_updates`])
//! - buffered listeners, fed in order for wire transport
//! - immediate listeners, fed synchronously for undo recording
//!
//! Pointer resolution is deferred while a box is under construction and
//! flushed by [`BoxGraph::end_transaction`], so a box may refer to boxes
//! created later in the same transaction.

mod dependencies;
mod snapshot;

pub use dependencies::Dependencies;

use std::collections::BTreeMap;
use std::sync::Arc;

use boxgraph_core::{Address, Listeners, PrimitiveValue, Subscription, Uuid};
use tracing::{debug, trace, warn};

use crate::boxes::GraphBox;
use crate::config::GraphConfig;
use crate::dispatch::{Dispatchers, Propagation};
use crate::edges::GraphEdges;
use crate::error::{GraphError, GraphResult};
use crate::field::{Field, PointerField, PrimitiveField};
use crate::schema::BoxFactory;
use crate::updates::{DeleteUpdate, NewUpdate, PointerUpdate, PrimitiveUpdate, Update};
use crate::vertex::VertexRef;

/// Receives every update emitted by the graph.
pub trait UpdateListener: Send + Sync {
    /// Called once per update, in emission order.
    fn on_update(&self, update: &Update);
}

impl<F> UpdateListener for F
where
    F: Fn(&Update) + Send + Sync,
{
    fn on_update(&self, update: &Update) {
        self(update)
    }
}

/// Observes transaction boundaries.
pub trait TransactionListener: Send + Sync {
    /// A transaction was opened.
    fn on_begin_transaction(&self) {}

    /// A transaction was closed, after deferred work and observers ran.
    fn on_end_transaction(&self) {}
}

/// A pointer started or stopped resolving to a vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerHubEvent {
    /// The pointer at this address now targets the vertex
    Added(Address),
    /// The pointer at this address no longer targets the vertex
    Removed(Address),
}

/// One-shot callback run when the current transaction ends.
pub type EndTransactionObserver = Box<dyn FnOnce(&mut BoxGraph) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Open,
    Constructing(Uuid),
}

/// Transactional graph of boxes.
pub struct BoxGraph {
    config: GraphConfig,
    factory: Option<Arc<dyn BoxFactory>>,
    boxes: BTreeMap<Uuid, GraphBox>,
    edges: GraphEdges,
    dispatchers: Dispatchers<Update>,
    pointer_hub: Dispatchers<PointerHubEvent>,
    update_listeners: Listeners<dyn UpdateListener>,
    immediate_update_listeners: Listeners<dyn UpdateListener>,
    transaction_listeners: Listeners<dyn TransactionListener>,
    end_transaction_observers: Vec<EndTransactionObserver>,
    deferred_pointer_updates: Vec<PointerUpdate>,
    phase: Phase,
    next_creation_index: i32,
}

impl BoxGraph {
    /// Graph using `factory` and the default configuration.
    pub fn new(factory: impl BoxFactory + 'static) -> Self {
        Self::with_config(factory, GraphConfig::default())
    }

    /// Graph using `factory` and `config`.
    pub fn with_config(factory: impl BoxFactory + 'static, config: GraphConfig) -> Self {
        let mut graph = Self::without_factory(config);
        graph.factory = Some(Arc::new(factory));
        graph
    }

    /// Graph that can only stage prebuilt boxes; `create_box` fails.
    pub fn without_factory(config: GraphConfig) -> Self {
        Self {
            config,
            factory: None,
            boxes: BTreeMap::new(),
            edges: GraphEdges::new(),
            dispatchers: Dispatchers::new(),
            pointer_hub: Dispatchers::new(),
            update_listeners: Listeners::new(),
            immediate_update_listeners: Listeners::new(),
            transaction_listeners: Listeners::new(),
            end_transaction_observers: Vec::new(),
            deferred_pointer_updates: Vec::new(),
            phase: Phase::Idle,
            next_creation_index: 0,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Open a transaction.
    pub fn begin_transaction(&mut self) -> GraphResult<()> {
        if self.phase != Phase::Idle {
            return Err(GraphError::TransactionInProgress);
        }
        self.phase = Phase::Open;
        trace!(target: "boxgraph::graph", "transaction opened");
        self.transaction_listeners
            .for_each(|listener| listener.on_begin_transaction());
        Ok(())
    }

    /// Close the transaction: resolve deferred pointers in order, run
    /// end-of-transaction observers until none remain, then notify
    /// transaction listeners.
    ///
    /// The transaction is closed even when an error is returned; the error
    /// is the first failure encountered while settling.
    pub fn end_transaction(&mut self) -> GraphResult<()> {
        if self.phase != Phase::Open {
            return Err(GraphError::NoTransaction);
        }
        self.phase = Phase::Idle;
        let mut first_error = None;

        for update in std::mem::take(&mut self.deferred_pointer_updates) {
            if self.pointer_field(update.address()).is_none() {
                warn!(
                    target: "boxgraph::graph",
                    pointer = %update.address(),
                    "dropping deferred update for a detached pointer"
                );
                continue;
            }
            if let Err(error) = self.process_pointer_update(update) {
                first_error.get_or_insert(error);
            }
        }

        let mut rounds = 0;
        while !self.end_transaction_observers.is_empty() {
            if rounds == self.config.max_observer_rounds {
                warn!(
                    target: "boxgraph::graph",
                    pending = self.end_transaction_observers.len(),
                    rounds,
                    "dropping end-of-transaction observers"
                );
                self.end_transaction_observers.clear();
                first_error.get_or_insert(GraphError::ObserverLoop(rounds));
                break;
            }
            rounds += 1;
            for observer in std::mem::take(&mut self.end_transaction_observers) {
                observer(self);
            }
            if !self.end_transaction_observers.is_empty() {
                debug!(
                    target: "boxgraph::graph",
                    count = self.end_transaction_observers.len(),
                    "new observers while notifying"
                );
            }
        }

        trace!(target: "boxgraph::graph", "transaction closed");
        self.transaction_listeners
            .for_each(|listener| listener.on_end_transaction());
        first_error.map_or(Ok(()), Err)
    }

    /// Run `f` inside its own transaction.
    pub fn transaction<R>(&mut self, f: impl FnOnce(&mut Self) -> GraphResult<R>) -> GraphResult<R> {
        self.begin_transaction()?;
        let result = f(self);
        let ended = self.end_transaction();
        let value = result?;
        ended?;
        Ok(value)
    }

    /// True while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Uuid of the box currently under construction.
    pub fn constructing_box(&self) -> Option<Uuid> {
        match self.phase {
            Phase::Constructing(uuid) => Some(uuid),
            _ => None,
        }
    }

    /// Run `observer` once the current transaction has settled.
    pub fn subscribe_end_transaction(&mut self, observer: impl FnOnce(&mut BoxGraph) + Send + 'static) {
        self.end_transaction_observers.push(Box::new(observer));
    }

    fn assert_transaction(&self) -> GraphResult<()> {
        match self.phase {
            Phase::Idle => Err(GraphError::NoTransaction),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Boxes
    // =========================================================================

    /// Build a box of `kind` with the factory and stage it. `init` runs
    /// under the construction guard before the box joins the graph.
    pub fn create_box<F>(&mut self, kind: &str, uuid: Uuid, init: F) -> GraphResult<Uuid>
    where
        F: FnOnce(&mut GraphBox) -> GraphResult<()>,
    {
        let factory = self.factory.as_ref().ok_or(GraphError::NoFactory)?;
        let graph_box = factory
            .create(kind, uuid)
            .ok_or_else(|| GraphError::UnknownKind(kind.to_string()))?;
        self.stage_box(graph_box, init)
    }

    /// Add a box to the graph and emit a [`NewUpdate`].
    pub fn stage_box<F>(&mut self, mut graph_box: GraphBox, init: F) -> GraphResult<Uuid>
    where
        F: FnOnce(&mut GraphBox) -> GraphResult<()>,
    {
        match self.phase {
            Phase::Idle => return Err(GraphError::NoTransaction),
            Phase::Constructing(other) => return Err(GraphError::NestedConstruction(other)),
            Phase::Open => {}
        }
        let uuid = graph_box.uuid();
        if self.boxes.contains_key(&uuid) {
            return Err(GraphError::BoxAlreadyStaged(uuid));
        }

        self.phase = Phase::Constructing(uuid);
        if let Err(error) = init(&mut graph_box) {
            self.phase = Phase::Open;
            return Err(error);
        }
        graph_box.set_creation_index(self.next_creation_index);
        self.next_creation_index += 1;

        let update = Update::New(NewUpdate::new(uuid, graph_box.kind(), graph_box.to_bytes()));
        let targets: Vec<(Address, Address)> = graph_box
            .pointers()
            .into_iter()
            .filter_map(|pointer| {
                let target = pointer.target_address()?;
                Some((pointer.address().clone(), target.clone()))
            })
            .collect();
        self.boxes.insert(uuid, graph_box);
        let attached = self.attach(uuid, targets);
        self.phase = Phase::Open;
        attached?;

        trace!(target: "boxgraph::graph", %update, "box staged");
        self.notify_all(&update);
        Ok(uuid)
    }

    fn attach(&mut self, uuid: Uuid, targets: Vec<(Address, Address)>) -> GraphResult<()> {
        for (source, target) in targets {
            self.on_pointer_address_updated(source, None, Some(target))?;
        }
        let Some(graph_box) = self.boxes.get(&uuid) else {
            return Err(GraphError::BoxNotFound(uuid));
        };
        for vertex in graph_box.vertices() {
            let required = match vertex.as_pointer() {
                Some(pointer) => pointer.is_mandatory(),
                None => vertex.pointer_rules().is_mandatory(),
            };
            if required {
                self.edges.watch_vertex(vertex)?;
            }
        }
        Ok(())
    }

    /// Remove a box that has no edges left and emit a [`DeleteUpdate`].
    pub fn unstage_box(&mut self, uuid: Uuid) -> GraphResult<GraphBox> {
        self.assert_transaction()?;
        if !self.boxes.contains_key(&uuid) {
            return Err(GraphError::BoxNotFound(uuid));
        }
        self.edges.unwatch_vertices_of(&[uuid])?;
        let graph_box = self
            .boxes
            .remove(&uuid)
            .ok_or(GraphError::BoxNotFound(uuid))?;

        let update = Update::Delete(DeleteUpdate::new(uuid, graph_box.kind(), graph_box.to_bytes()));
        trace!(target: "boxgraph::graph", %uuid, kind = graph_box.kind(), "box unstaged");
        self.notify_all(&update);
        Ok(graph_box)
    }

    /// Delete a box together with everything that depends on it: every
    /// pointer collected by [`BoxGraph::dependencies_of`] is cleared, then
    /// the dependent boxes and the box itself are unstaged. Returns the
    /// deleted uuids, the box itself last.
    pub fn delete_box(&mut self, uuid: Uuid) -> GraphResult<Vec<Uuid>> {
        self.assert_transaction()?;
        let Dependencies { boxes, pointers } = self.dependencies_of(uuid)?;
        for pointer in &pointers {
            self.set_pointer(pointer, None)?;
        }
        for dependent in &boxes {
            self.unstage_box(*dependent)?;
        }
        self.unstage_box(uuid)?;
        debug!(
            target: "boxgraph::graph",
            %uuid,
            dependents = boxes.len(),
            pointers = pointers.len(),
            "box deleted"
        );
        let mut deleted = boxes;
        deleted.push(uuid);
        Ok(deleted)
    }

    /// Clear every pointer of the box that has an edge. Returns the number
    /// of pointers cleared.
    pub fn detach_outgoing_pointers(&mut self, uuid: Uuid) -> GraphResult<usize> {
        let outgoing = self.edges.outgoing_edges_of(uuid);
        for (source, _) in &outgoing {
            self.set_pointer(source, None)?;
        }
        Ok(outgoing.len())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Box with `uuid`.
    pub fn find_box(&self, uuid: Uuid) -> Option<&GraphBox> {
        self.boxes.get(&uuid)
    }

    /// Vertex at `address`.
    pub fn find_vertex(&self, address: &Address) -> Option<VertexRef<'_>> {
        self.boxes.get(&address.uuid())?.vertex(address.field_keys())
    }

    /// Boxes in uuid order.
    pub fn boxes(&self) -> impl Iterator<Item = &GraphBox> {
        self.boxes.values()
    }

    /// Number of staged boxes.
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    /// The edge index.
    pub fn edges(&self) -> &GraphEdges {
        &self.edges
    }

    /// Target address of the pointer field at `address`.
    pub fn pointer_target(&self, address: &Address) -> Option<&Address> {
        self.pointer_field(address)?.target_address()
    }

    /// Value of the primitive field at `address`.
    pub fn primitive_value(&self, address: &Address) -> Option<&PrimitiveValue> {
        self.find_vertex(address)?
            .as_field()?
            .as_primitive()
            .map(PrimitiveField::value)
    }

    /// Human-readable path of a vertex: the box kind followed by field names.
    pub fn debug_path(&self, address: &Address) -> Option<String> {
        let graph_box = self.boxes.get(&address.uuid())?;
        let mut path = graph_box.kind().to_string();
        for ancestor in address.lineage().skip(1) {
            let field = graph_box.field(ancestor.field_keys())?;
            path.push('/');
            path.push_str(field.name());
        }
        Some(path)
    }

    fn pointer_field(&self, address: &Address) -> Option<&PointerField> {
        self.find_vertex(address)?.as_pointer()
    }

    fn field_mut(&mut self, address: &Address) -> GraphResult<&mut Field> {
        self.boxes
            .get_mut(&address.uuid())
            .and_then(|graph_box| graph_box.field_mut(address.field_keys()))
            .ok_or_else(|| GraphError::VertexNotFound(address.clone()))
    }

    // =========================================================================
    // Field mutation
    // =========================================================================

    /// Set the primitive field at `address`. Setting the current value is a
    /// no-op.
    pub fn set_primitive(
        &mut self,
        address: &Address,
        value: impl Into<PrimitiveValue>,
    ) -> GraphResult<()> {
        self.assert_transaction()?;
        let value = value.into();
        let field = self.field_mut(address)?.as_primitive_mut()?;
        if field.value() == &value {
            return Ok(());
        }
        let old_value = field.replace(value.clone())?;
        if self.constructing_box().is_some() {
            return Ok(());
        }
        let update = Update::Primitive(PrimitiveUpdate::new(address.clone(), old_value, value));
        trace!(target: "boxgraph::graph", %update, "primitive updated");
        self.dispatchers.dispatch(address, &update);
        self.notify_all(&update);
        Ok(())
    }

    /// Point the pointer field at `address` to `target`, or clear it.
    /// Setting the current target is a no-op.
    pub fn set_pointer(&mut self, address: &Address, target: Option<Address>) -> GraphResult<()> {
        self.assert_transaction()?;
        let pointer = self.pointer_field(address).ok_or_else(|| {
            match self.find_vertex(address) {
                Some(_) => GraphError::FieldKindMismatch {
                    address: address.clone(),
                    expected: "pointer",
                },
                None => GraphError::VertexNotFound(address.clone()),
            }
        })?;
        let old_target = pointer.target_address().cloned();
        if old_target == target {
            return Ok(());
        }
        let pointer_type = pointer.pointer_type();
        if let Some(target) = &target {
            if let Some(vertex) = self.find_vertex(target) {
                if !vertex.pointer_rules().accepts(pointer_type) {
                    return Err(GraphError::PointerRejected {
                        pointer: address.clone(),
                        target: target.clone(),
                        pointer_type,
                    });
                }
            }
        }
        self.field_mut(address)?
            .as_pointer_mut()?
            .set_target(target.clone());
        self.on_pointer_address_updated(address.clone(), old_target, target)
    }

    /// Keep the edge index in step with a pointer change, then resolve the
    /// pointer now or, during construction, at the end of the transaction.
    fn on_pointer_address_updated(
        &mut self,
        source: Address,
        old_target: Option<Address>,
        new_target: Option<Address>,
    ) -> GraphResult<()> {
        if old_target.is_some() {
            self.edges.disconnect(&source)?;
        }
        if let Some(target) = &new_target {
            self.edges.connect(source.clone(), target.clone())?;
        }
        let update = PointerUpdate::new(source, old_target, new_target);
        if self.constructing_box().is_some() {
            self.deferred_pointer_updates.push(update);
            return Ok(());
        }
        // the construction-time target is replaced, its deferred update with it
        let superseded = self.deferred_pointer_updates.len();
        self.deferred_pointer_updates
            .retain(|deferred| deferred.address() != update.address());
        if self.deferred_pointer_updates.len() != superseded {
            trace!(target: "boxgraph::graph", pointer = %update.address(), "deferred update superseded");
        }
        let resolved = self.process_pointer_update(update.clone());
        let update = Update::Pointer(update);
        self.immediate_update_listeners
            .for_each(|listener| listener.on_update(&update));
        resolved
    }

    /// Bind the pointer to the vertex its current target names, notify the
    /// pointer hubs on a change, then dispatch the update.
    fn process_pointer_update(&mut self, update: PointerUpdate) -> GraphResult<()> {
        let source = update.address().clone();
        let Some(pointer) = self.pointer_field(&source) else {
            warn!(
                target: "boxgraph::graph",
                pointer = %source,
                "dropping pointer update for a detached pointer"
            );
            return Ok(());
        };
        let pointer_type = pointer.pointer_type();
        let vertex = pointer
            .target_address()
            .and_then(|target| self.find_vertex(target))
            .map(|vertex| {
                (
                    vertex.address().clone(),
                    vertex.pointer_rules().accepts(pointer_type),
                )
            });
        let (resolved, rejected) = match vertex {
            Some((address, true)) => (Some(address), None),
            Some((address, false)) => (None, Some(address)),
            None => (None, None),
        };

        let previous = self
            .field_mut(&source)?
            .as_pointer_mut()?
            .resolve(resolved.clone());
        if previous != resolved {
            if let Some(vertex) = &previous {
                self.pointer_hub
                    .dispatch(vertex, &PointerHubEvent::Removed(source.clone()));
            }
            if let Some(vertex) = &resolved {
                self.pointer_hub
                    .dispatch(vertex, &PointerHubEvent::Added(source.clone()));
            }
        }

        let update = Update::Pointer(update);
        trace!(target: "boxgraph::graph", %update, "pointer resolved");
        self.dispatchers.dispatch(&source, &update);
        self.update_listeners
            .for_each(|listener| listener.on_update(&update));

        match rejected {
            Some(target) => Err(GraphError::PointerRejected {
                pointer: source,
                target,
                pointer_type,
            }),
            None => Ok(()),
        }
    }

    fn notify_all(&self, update: &Update) {
        self.update_listeners
            .for_each(|listener| listener.on_update(update));
        self.immediate_update_listeners
            .for_each(|listener| listener.on_update(update));
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Receive field updates at `address` with the given breadth.
    pub fn subscribe_vertex_updates(
        &self,
        propagation: Propagation,
        address: Address,
        listener: impl Fn(&Update) + Send + Sync + 'static,
    ) -> Subscription {
        self.dispatchers.subscribe(propagation, address, listener)
    }

    /// Receive pointer hub events for vertices at `address`.
    pub fn subscribe_pointer_hub(
        &self,
        propagation: Propagation,
        address: Address,
        listener: impl Fn(&PointerHubEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.pointer_hub.subscribe(propagation, address, listener)
    }

    /// Receive every update on the buffered channel. Pointer updates made
    /// during construction arrive when the transaction ends.
    pub fn subscribe_to_all_updates(&self, listener: impl UpdateListener + 'static) -> Subscription {
        self.update_listeners.subscribe(Arc::new(listener))
    }

    /// Receive every update synchronously as it happens. Pointer updates
    /// made during construction are not repeated here; the new-box update
    /// already carries them.
    pub fn subscribe_to_all_updates_immediate(
        &self,
        listener: impl UpdateListener + 'static,
    ) -> Subscription {
        self.immediate_update_listeners.subscribe(Arc::new(listener))
    }

    /// Observe transaction boundaries.
    pub fn subscribe_transaction(&self, listener: impl TransactionListener + 'static) -> Subscription {
        self.transaction_listeners.subscribe(Arc::new(listener))
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    /// Check every edge requirement, then every pointer with a target:
    /// it must be resolved and its target must exist. Returns the number of
    /// pointers checked.
    pub fn verify_pointers(&self) -> GraphResult<usize> {
        self.edges
            .validate_requirements(|address| self.find_vertex(address))?;
        let mut count = 0;
        for graph_box in self.boxes.values() {
            for pointer in graph_box.pointers() {
                let Some(target) = pointer.target_address() else {
                    continue;
                };
                if pointer.resolved_target().is_none() {
                    return Err(GraphError::BrokenPointer(pointer.address().clone()));
                }
                if self.find_vertex(target).is_none() {
                    return Err(GraphError::DanglingPointer {
                        pointer: pointer.address().clone(),
                        target: target.clone(),
                    });
                }
                count += 1;
            }
        }
        debug!(target: "boxgraph::graph", count, "verification complete");
        Ok(count)
    }

    /// Log one record per box.
    pub fn debug_boxes(&self) {
        for graph_box in self.boxes.values() {
            debug!(
                target: "boxgraph::graph",
                uuid = %graph_box.uuid(),
                kind = graph_box.kind(),
                incoming = self.edges.incoming_edges_of(graph_box.address()).len(),
                outgoing = self.edges.outgoing_edges_of(graph_box.uuid()).len(),
                bytes = graph_box.to_bytes().len(),
                "box"
            );
        }
    }

    /// Log the dependencies of every box.
    pub fn debug_dependencies(&self) {
        for graph_box in self.boxes.values() {
            match self.dependencies_of(graph_box.uuid()) {
                Ok(dependencies) => debug!(
                    target: "boxgraph::graph",
                    uuid = %graph_box.uuid(),
                    kind = graph_box.kind(),
                    boxes = ?dependencies.boxes,
                    "dependencies"
                ),
                Err(error) => warn!(
                    target: "boxgraph::graph",
                    uuid = %graph_box.uuid(),
                    %error,
                    "dependencies could not be traced"
                ),
            }
        }
    }
}

impl std::fmt::Debug for BoxGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxGraph")
            .field("boxes", &self.boxes.len())
            .field("edges", &self.edges.len())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
