//! Shared fixtures: a small session catalog and random edit sequences.

use boxgraph::*;
use proptest::prelude::*;

pub const REF: PointerType = PointerType(1);
pub const SIGNAL: PointerType = PointerType(2);
pub const HOST: PointerType = PointerType(3);

pub const SEND_SLOTS: u16 = 2;

/// Kinds:
/// - `X`: accepts `REF`, no fields
/// - `Y`: `1 ref -> REF`
/// - `Bus`: accepts `SIGNAL`; `1 name`
/// - `Track`: accepts `SIGNAL`; `1 name`, `2 volume`, `3 output -> SIGNAL`,
///   `4 sends[2] -> SIGNAL`
/// - `Device`: requires an incoming `HOST`; `1 gain`
/// - `Plugin`: `1 host -> HOST` (mandatory), `2 bypass`
pub fn catalog() -> BoxCatalog {
    BoxCatalog::new()
        .with(BoxSchema::new("X").pointer_rules(PointerRules::accepting([REF])))
        .with(BoxSchema::new("Y").field(FieldSchema::pointer(1, "ref", REF)))
        .with(
            BoxSchema::new("Bus")
                .pointer_rules(PointerRules::accepting([SIGNAL]))
                .field(FieldSchema::primitive(1, "name", "bus")),
        )
        .with(
            BoxSchema::new("Track")
                .pointer_rules(PointerRules::accepting([SIGNAL]))
                .field(FieldSchema::primitive(1, "name", ""))
                .field(FieldSchema::primitive(2, "volume", 0))
                .field(FieldSchema::pointer(3, "output", SIGNAL))
                .field(FieldSchema::array(
                    4,
                    "sends",
                    SEND_SLOTS,
                    FieldSchema::pointer(0, "send", SIGNAL),
                )),
        )
        .with(
            BoxSchema::new("Device")
                .pointer_rules(PointerRules::accepting([HOST]).required())
                .field(FieldSchema::primitive(1, "gain", 1.0f32)),
        )
        .with(
            BoxSchema::new("Plugin")
                .field(FieldSchema::mandatory_pointer(1, "host", HOST))
                .field(FieldSchema::primitive(2, "bypass", false)),
        )
}

pub fn graph() -> BoxGraph {
    BoxGraph::new(catalog())
}

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn at(uuid: Uuid, keys: &[u16]) -> Address {
    Address::new(uuid, keys.iter().copied())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Every edge appears exactly once on both sides of the index, and every
/// pointer with a target has the matching edge.
pub fn assert_edges_consistent(graph: &BoxGraph) {
    let edges = graph.edges();
    for (source, target) in edges.edges() {
        let incoming = edges.incoming_edges_of(target);
        assert_eq!(
            incoming.iter().filter(|address| *address == source).count(),
            1,
            "{source} missing from incoming of {target}"
        );
        let outgoing = edges.outgoing_edges_of(source.uuid());
        assert!(outgoing.contains(&(source.clone(), target.clone())));
    }
    let mut pointers = 0;
    for graph_box in graph.boxes() {
        for pointer in graph_box.pointers() {
            assert_eq!(edges.target_of(pointer.address()), pointer.target_address());
            if pointer.target_address().is_some() {
                pointers += 1;
            }
        }
    }
    assert_eq!(pointers, edges.len());
}

// =============================================================================
// Random edit sequences over tracks and buses
// =============================================================================

/// One edit. Indices pick among the boxes created so far, modulo their count.
#[derive(Debug, Clone)]
pub enum Edit {
    AddTrack,
    AddBus,
    Rename(usize, String),
    Volume(usize, i32),
    Route(usize, Option<usize>),
    Send(usize, u16, Option<usize>),
    Remove(usize),
}

pub fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => Just(Edit::AddTrack),
        1 => Just(Edit::AddBus),
        2 => (any::<usize>(), "[a-z]{0,6}").prop_map(|(n, name)| Edit::Rename(n, name)),
        2 => (any::<usize>(), any::<i32>()).prop_map(|(n, volume)| Edit::Volume(n, volume)),
        3 => (any::<usize>(), prop::option::of(any::<usize>()))
            .prop_map(|(n, target)| Edit::Route(n, target)),
        2 => (any::<usize>(), 0..SEND_SLOTS, prop::option::of(any::<usize>()))
            .prop_map(|(n, slot, target)| Edit::Send(n, slot, target)),
        1 => any::<usize>().prop_map(Edit::Remove),
    ]
}

pub fn edits(max: usize) -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(edit(), 1..max)
}

/// Tracks edits against a graph with deterministic uuids.
#[derive(Debug, Default)]
pub struct Session {
    next: u128,
    tracks: Vec<Uuid>,
    buses: Vec<Uuid>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn pick(list: &[Uuid], n: usize) -> Option<Uuid> {
        (!list.is_empty()).then(|| list[n % list.len()])
    }

    fn signal_target(&self, n: usize) -> Option<Uuid> {
        let total = self.tracks.len() + self.buses.len();
        if total == 0 {
            return None;
        }
        let n = n % total;
        Some(match self.tracks.get(n) {
            Some(uuid) => *uuid,
            None => self.buses[n - self.tracks.len()],
        })
    }

    /// Apply `edit` inside the caller's transaction. Edits that have no
    /// subject yet are skipped.
    pub fn apply(&mut self, graph: &mut BoxGraph, edit: &Edit) -> GraphResult<()> {
        match edit {
            Edit::AddTrack | Edit::AddBus => {
                self.next += 1;
                let uuid = id(self.next);
                let kind = if matches!(edit, Edit::AddTrack) { "Track" } else { "Bus" };
                graph.create_box(kind, uuid, |_| Ok(()))?;
                if kind == "Track" {
                    self.tracks.push(uuid);
                } else {
                    self.buses.push(uuid);
                }
            }
            Edit::Rename(n, name) => {
                if let Some(track) = Self::pick(&self.tracks, *n) {
                    graph.set_primitive(&at(track, &[1]), name.as_str())?;
                }
            }
            Edit::Volume(n, volume) => {
                if let Some(track) = Self::pick(&self.tracks, *n) {
                    graph.set_primitive(&at(track, &[2]), *volume)?;
                }
            }
            Edit::Route(n, target) => {
                if let Some(track) = Self::pick(&self.tracks, *n) {
                    let target = target.and_then(|t| self.signal_target(t));
                    graph.set_pointer(&at(track, &[3]), target.map(Address::of_box))?;
                }
            }
            Edit::Send(n, slot, target) => {
                if let Some(track) = Self::pick(&self.tracks, *n) {
                    let target = target.and_then(|t| self.signal_target(t));
                    graph.set_pointer(&at(track, &[4, *slot]), target.map(Address::of_box))?;
                }
            }
            Edit::Remove(n) => {
                if let Some(uuid) = self.signal_target(*n) {
                    graph.delete_box(uuid)?;
                    self.tracks.retain(|other| *other != uuid);
                    self.buses.retain(|other| *other != uuid);
                }
            }
        }
        Ok(())
    }

    /// Apply every edit in its own transaction.
    pub fn run(&mut self, graph: &mut BoxGraph, edits: &[Edit]) {
        for edit in edits {
            graph
                .transaction(|graph| self.apply(graph, edit))
                .unwrap_or_else(|error| panic!("{edit:?} failed: {error}"));
        }
    }
}
