//! Edge index: who points where, and who must be pointed to.
//!
//! The index is keyed by address, so every edge of a box sits in one
//! contiguous range of the ordered maps and per-box queries are range scans.

use std::collections::{BTreeMap, BTreeSet};

use boxgraph_core::address::{box_entries, box_members};
use boxgraph_core::{Address, Uuid};
use tracing::{debug, trace};

use crate::error::{GraphError, GraphResult};
use crate::vertex::VertexRef;

/// Pointer edges plus the vertices with edge requirements.
#[derive(Debug, Default, Clone)]
pub struct GraphEdges {
    /// Mandatory pointer fields
    requires_target: BTreeSet<Address>,
    /// Vertices whose rules demand an incoming pointer
    requires_pointer: BTreeSet<Address>,
    /// target -> sources, in connection order
    incoming: BTreeMap<Address, Vec<Address>>,
    /// source -> target
    outgoing: BTreeMap<Address, Address>,
}

impl GraphEdges {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Requirements
    // =========================================================================

    /// Register a vertex that has an edge requirement: a mandatory pointer,
    /// or a vertex whose rules require an incoming pointer.
    pub fn watch_vertex(&mut self, vertex: VertexRef<'_>) -> GraphResult<()> {
        let address = vertex.address().clone();
        match vertex.as_pointer() {
            Some(pointer) if pointer.is_mandatory() => {
                self.requires_target.insert(address);
                Ok(())
            }
            None if vertex.pointer_rules().is_mandatory() => {
                self.requires_pointer.insert(address);
                Ok(())
            }
            _ => Err(GraphError::NoEdgeRequirement(address)),
        }
    }

    /// Drop the requirements of the given boxes. Fails without changing
    /// anything if any of them still has edges.
    pub fn unwatch_vertices_of(&mut self, uuids: &[Uuid]) -> GraphResult<()> {
        for &uuid in uuids {
            let edges = self.outgoing_edges_of(uuid);
            if !edges.is_empty() {
                return Err(GraphError::HasOutgoingEdges { uuid, edges });
            }
            let sources = self.incoming_edges_of(&Address::of_box(uuid));
            if !sources.is_empty() {
                return Err(GraphError::HasIncomingEdges { uuid, sources });
            }
        }
        let mut released = 0;
        for &uuid in uuids {
            for set in [&mut self.requires_target, &mut self.requires_pointer] {
                let members: Vec<Address> = box_members(set, uuid).cloned().collect();
                released += members.len();
                for address in members {
                    set.remove(&address);
                }
            }
        }
        debug!(target: "boxgraph::edges", boxes = uuids.len(), released, "requirements released");
        Ok(())
    }

    /// Check every registered requirement. `lookup` resolves an address to
    /// the vertex currently in the graph.
    pub fn validate_requirements<'g>(
        &self,
        lookup: impl Fn(&Address) -> Option<VertexRef<'g>>,
    ) -> GraphResult<()> {
        self.check_requirements(lookup).map_err(|error| {
            debug!(target: "boxgraph::edges", %error, "requirement violated");
            error
        })
    }

    fn check_requirements<'g>(
        &self,
        lookup: impl Fn(&Address) -> Option<VertexRef<'g>>,
    ) -> GraphResult<()> {
        for address in &self.requires_target {
            let vertex = lookup(address).ok_or_else(|| GraphError::NotAttached(address.clone()))?;
            match vertex.as_pointer() {
                Some(pointer) if pointer.is_empty() && pointer.is_mandatory() => {
                    return Err(GraphError::MissingTarget(address.clone()))
                }
                Some(pointer) if pointer.is_empty() => {
                    return Err(GraphError::IllegalWatchState(address.clone()))
                }
                Some(_) => {}
                None => return Err(GraphError::IllegalWatchState(address.clone())),
            }
        }
        for address in &self.requires_pointer {
            let vertex = lookup(address).ok_or_else(|| GraphError::NotAttached(address.clone()))?;
            if self.incoming_edges_of(vertex.address()).is_empty() {
                return Err(if vertex.pointer_rules().is_mandatory() {
                    GraphError::MissingIncoming(address.clone())
                } else {
                    GraphError::IllegalWatchState(address.clone())
                });
            }
        }
        Ok(())
    }

    /// Number of registered requirements (pointers, targets).
    pub fn requirement_counts(&self) -> (usize, usize) {
        (self.requires_target.len(), self.requires_pointer.len())
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// Record the edge `source -> target`.
    pub fn connect(&mut self, source: Address, target: Address) -> GraphResult<()> {
        if self.outgoing.contains_key(&source) {
            return Err(GraphError::AlreadyConnected(source));
        }
        trace!(target: "boxgraph::edges", %source, %target, "connect");
        self.incoming
            .entry(target.clone())
            .or_default()
            .push(source.clone());
        self.outgoing.insert(source, target);
        Ok(())
    }

    /// Remove the edge leaving `source`, returning its target.
    pub fn disconnect(&mut self, source: &Address) -> GraphResult<Address> {
        let target = self
            .outgoing
            .remove(source)
            .ok_or_else(|| GraphError::NotConnected(source.clone()))?;
        trace!(target: "boxgraph::edges", %source, %target, "disconnect");
        if let Some(sources) = self.incoming.get_mut(&target) {
            sources.retain(|address| address != source);
            if sources.is_empty() {
                self.incoming.remove(&target);
            }
        }
        Ok(target)
    }

    /// Target of the edge leaving `source`.
    pub fn target_of(&self, source: &Address) -> Option<&Address> {
        self.outgoing.get(source)
    }

    /// `(source, target)` for every pointer field of the box that has an edge.
    pub fn outgoing_edges_of(&self, uuid: Uuid) -> Vec<(Address, Address)> {
        box_entries(&self.outgoing, uuid)
            .map(|(source, target)| (source.clone(), target.clone()))
            .collect()
    }

    /// Pointers targeting `address`. For a box address this includes
    /// pointers to any of its fields.
    pub fn incoming_edges_of(&self, address: &Address) -> Vec<Address> {
        if address.is_box() {
            box_entries(&self.incoming, address.uuid())
                .flat_map(|(_, sources)| sources.iter().cloned())
                .collect()
        } else {
            self.incoming.get(address).cloned().unwrap_or_default()
        }
    }

    /// All edges in source order.
    pub fn edges(&self) -> impl Iterator<Item = (&Address, &Address)> {
        self.outgoing.iter()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.outgoing.len()
    }

    /// Check if there are no edges.
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty()
    }
}
