//! Dependency tracing for export and cascading deletion.

use boxgraph_core::{Address, Uuid};
use rustc_hash::FxHashSet;

use super::BoxGraph;
use crate::error::{GraphError, GraphResult};

/// What has to go along with a box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Dependent boxes in discovery order, excluding the box itself
    pub boxes: Vec<Uuid>,
    /// Pointers touching the traced boxes, most recently discovered first
    pub pointers: Vec<Address>,
}

#[derive(Default)]
struct Trace {
    seen_boxes: FxHashSet<Uuid>,
    boxes: Vec<Uuid>,
    seen_pointers: FxHashSet<Address>,
    pointers: Vec<Address>,
}

impl Trace {
    fn add_pointer(&mut self, pointer: Address) {
        if self.seen_pointers.insert(pointer.clone()) {
            self.pointers.push(pointer);
        }
    }
}

impl BoxGraph {
    /// Boxes and pointers that depend on the box `uuid`.
    ///
    /// Following the box's own pointers, a target box is included only if
    /// the target vertex requires an incoming pointer and every pointer into
    /// it has already been collected. Every box with a mandatory pointer
    /// into a traced box is included as well.
    pub fn dependencies_of(&self, uuid: Uuid) -> GraphResult<Dependencies> {
        if !self.boxes.contains_key(&uuid) {
            return Err(GraphError::BoxNotFound(uuid));
        }
        let mut trace = Trace::default();
        self.trace(uuid, &mut trace)?;

        let Trace {
            boxes, mut pointers, ..
        } = trace;
        pointers.reverse();
        Ok(Dependencies {
            boxes: boxes.into_iter().filter(|other| *other != uuid).collect(),
            pointers,
        })
    }

    fn trace(&self, uuid: Uuid, trace: &mut Trace) -> GraphResult<()> {
        if !trace.seen_boxes.insert(uuid) {
            return Ok(());
        }
        trace.boxes.push(uuid);

        for (source, target) in self.edges.outgoing_edges_of(uuid) {
            if trace.seen_pointers.contains(&source) {
                continue;
            }
            let vertex = self
                .find_vertex(&target)
                .ok_or_else(|| GraphError::DanglingPointer {
                    pointer: source.clone(),
                    target: target.clone(),
                })?;
            trace.add_pointer(source);
            if vertex.pointer_rules().is_mandatory()
                && self
                    .edges
                    .incoming_edges_of(vertex.address())
                    .iter()
                    .all(|pointer| trace.seen_pointers.contains(pointer))
            {
                self.trace(vertex.box_uuid(), trace)?;
            }
        }

        for pointer in self.edges.incoming_edges_of(&Address::of_box(uuid)) {
            let mandatory = self
                .pointer_field(&pointer)
                .ok_or_else(|| GraphError::VertexNotFound(pointer.clone()))?
                .is_mandatory();
            let referrer = pointer.uuid();
            trace.add_pointer(pointer);
            if mandatory {
                self.trace(referrer, trace)?;
            }
        }
        Ok(())
    }
}
