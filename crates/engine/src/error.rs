//! Error type for graph operations.
//!
//! Most variants are contract violations: the caller broke a precondition
//! (no open transaction, deleting a box with live edges, ...). The graph
//! rejects the call and never tries to repair the situation itself.

use boxgraph_core::{Address, CodecError, PrimitiveType, Uuid};
use thiserror::Error;

use crate::vertex::PointerType;

/// Errors returned by [`BoxGraph`](crate::BoxGraph) and its collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    // =========================================================================
    // Transactions
    // =========================================================================
    /// `begin_transaction` while a transaction is open.
    #[error("transaction already in progress")]
    TransactionInProgress,

    /// A mutation or `end_transaction` outside of a transaction.
    #[error("modification only permitted in transaction mode")]
    NoTransaction,

    /// A box was staged while another box was being constructed.
    #[error("cannot construct a box while box {0} is constructing")]
    NestedConstruction(Uuid),

    /// End-of-transaction observers kept scheduling new observers.
    #[error("end-of-transaction observers did not settle after {0} rounds")]
    ObserverLoop(usize),

    // =========================================================================
    // Boxes and vertices
    // =========================================================================
    /// `create_box` without a box factory.
    #[error("no box factory installed")]
    NoFactory,

    /// The box factory does not know the requested kind.
    #[error("unknown box kind: {0}")]
    UnknownKind(String),

    /// A box with the same uuid is already staged.
    #[error("box {0} is already staged")]
    BoxAlreadyStaged(Uuid),

    /// No staged box has this uuid.
    #[error("box {0} could not be found")]
    BoxNotFound(Uuid),

    /// No vertex exists at this address.
    #[error("no vertex at {0}")]
    VertexNotFound(Address),

    /// The vertex exists but is not the expected kind of field.
    #[error("vertex at {address} is not a {expected} field")]
    FieldKindMismatch {
        /// Address of the vertex
        address: Address,
        /// The field kind the operation needs
        expected: &'static str,
    },

    /// A primitive field was given a value of another type.
    #[error("field {address} holds {expected}, got {actual}")]
    TypeMismatch {
        /// Address of the field
        address: Address,
        /// Declared type of the field
        expected: PrimitiveType,
        /// Type of the rejected value
        actual: PrimitiveType,
    },

    /// The target vertex does not accept pointers of this type.
    #[error("{target} does not accept pointer {pointer} of type {pointer_type}")]
    PointerRejected {
        /// Address of the pointer field
        pointer: Address,
        /// Address of the target vertex
        target: Address,
        /// Type of the pointer
        pointer_type: PointerType,
    },

    // =========================================================================
    // Edges
    // =========================================================================
    /// `connect` for a source that already has an outgoing edge.
    #[error("pointer {0} is already connected")]
    AlreadyConnected(Address),

    /// `disconnect` for a source without an outgoing edge.
    #[error("pointer {0} is not connected")]
    NotConnected(Address),

    /// A box still has outgoing edges.
    #[error("box {uuid} has outgoing edges: {edges:?}")]
    HasOutgoingEdges {
        /// The box
        uuid: Uuid,
        /// `(source, target)` pairs
        edges: Vec<(Address, Address)>,
    },

    /// A box still has incoming edges.
    #[error("box {uuid} has incoming edges from: {sources:?}")]
    HasIncomingEdges {
        /// The box
        uuid: Uuid,
        /// Pointer fields pointing into the box
        sources: Vec<Address>,
    },

    /// `watch_vertex` for a vertex without an edge requirement.
    #[error("{0} was watched but has no edge requirement")]
    NoEdgeRequirement(Address),

    // =========================================================================
    // Integrity findings
    // =========================================================================
    /// A watched vertex is no longer part of the graph.
    #[error("{0} is not attached")]
    NotAttached(Address),

    /// A mandatory pointer has no target.
    #[error("pointer {0} requires an edge")]
    MissingTarget(Address),

    /// A vertex that must be pointed to has no incoming pointer.
    #[error("target {0} requires an edge")]
    MissingIncoming(Address),

    /// A watched vertex lost its requirement after registration.
    #[error("illegal state: {0} has no edge requirements")]
    IllegalWatchState(Address),

    /// A pointer has a target address but is not resolved.
    #[error("pointer {0} is broken")]
    BrokenPointer(Address),

    /// A pointer targets an address that does not exist in the graph.
    #[error("cannot find target {target} of pointer {pointer}")]
    DanglingPointer {
        /// Address of the pointer field
        pointer: Address,
        /// Missing target
        target: Address,
    },

    // =========================================================================
    // Serialization and configuration
    // =========================================================================
    /// `from_bytes` on a graph that already holds boxes.
    #[error("cannot load into a graph that is not empty")]
    GraphNotEmpty,

    /// Malformed input.
    #[error("decode error: {0}")]
    Codec(#[from] CodecError),

    /// JSON that does not match the shape of the boxes it is read into.
    #[error("invalid json: {0}")]
    Json(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
