//! Public types for the boxgraph API.
//!
//! This module re-exports types from the internal crates with a flat public interface.

// ============================================================================
// Addresses, values, codec
// ============================================================================

pub use boxgraph_core::{
    Address, ByteInput, ByteOutput, Checksum, CodecError, CodecResult, FieldKey, PrimitiveType,
    PrimitiveValue, Subscription, Uuid,
};

// ============================================================================
// Graph
// ============================================================================

pub use boxgraph_engine::{
    ArrayField, BoxCatalog, BoxFactory, BoxGraph, BoxSchema, Dependencies, EndTransactionObserver,
    Field, FieldSchema, GraphBox, GraphConfig, GraphEdges, GraphError, GraphResult, ObjectField,
    PointerField, PointerHubEvent, PointerRules, PointerType, PrimitiveField, Propagation,
    TransactionListener, UpdateListener, VertexRef,
};

// ============================================================================
// Change records, history, bundles
// ============================================================================

pub use boxgraph_engine::{
    export_bundle, import_bundle, import_bundle_preserving, DeleteUpdate, Editing, NewUpdate,
    PointerUpdate, PrimitiveUpdate, Update,
};

// ============================================================================
// Replica sync
// ============================================================================

pub use boxgraph_wire::{
    channel, ChannelSynchronization, SyncError, SyncMessage, SyncResult, SyncSource, SyncTarget,
    Synchronization, UpdateTask,
};
