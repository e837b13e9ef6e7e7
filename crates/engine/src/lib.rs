//! Box graph engine
//!
//! A transactional graph of typed records ("boxes") whose fields may point
//! at other boxes or at fields inside them. This crate provides:
//! - the field tree and [`GraphBox`], built from declarative schemas
//! - [`GraphEdges`]: the pointer index and its integrity requirements
//! - [`BoxGraph`]: transactions, change notification, snapshots, checksums
//! - [`Update`]: invertible change records with a binary codec
//! - [`Editing`]: undo/redo on top of the update stream
//! - box bundles for moving a box and its dependencies between graphs

#![warn(missing_docs)]

pub mod array;
pub mod boxes;
pub mod bundle;
pub mod config;
pub mod dispatch;
pub mod edges;
pub mod editing;
pub mod error;
pub mod field;
pub mod graph;
pub mod schema;
pub mod updates;
pub mod vertex;

pub use array::ArrayField;
pub use boxes::GraphBox;
pub use bundle::{export_bundle, import_bundle, import_bundle_preserving};
pub use config::GraphConfig;
pub use dispatch::{Dispatchers, Propagation};
pub use edges::GraphEdges;
pub use editing::Editing;
pub use error::{GraphError, GraphResult};
pub use field::{Field, ObjectField, PointerField, PrimitiveField};
pub use graph::{
    BoxGraph, Dependencies, EndTransactionObserver, PointerHubEvent, TransactionListener,
    UpdateListener,
};
pub use schema::{BoxCatalog, BoxFactory, BoxSchema, FieldSchema};
pub use updates::{DeleteUpdate, NewUpdate, PointerUpdate, PrimitiveUpdate, Update};
pub use vertex::{PointerRules, PointerType, VertexRef};
