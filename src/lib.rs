//! boxgraph: a transactional graph of typed records ("boxes") connected by
//! typed pointers.
//!
//! ```no_run
//! use boxgraph::*;
//!
//! let catalog = BoxCatalog::new().with(
//!     BoxSchema::new("Track")
//!         .field(FieldSchema::primitive(1, "name", ""))
//!         .field(FieldSchema::primitive(2, "volume", 1.0f32)),
//! );
//! let mut graph = BoxGraph::new(catalog);
//! let track = graph
//!     .transaction(|graph| graph.create_box("Track", Uuid::new_v4(), |_| Ok(())))
//!     .unwrap();
//! graph
//!     .transaction(|graph| graph.set_primitive(&Address::new(track, [1]), "Lead"))
//!     .unwrap();
//! ```

mod types;

pub use types::*;

/// Update log encoding (`i32` count followed by tagged updates).
pub mod updates {
    pub use boxgraph_engine::updates::{decode, encode};
}

/// Update task batch encoding.
pub mod tasks {
    pub use boxgraph_wire::{decode_batch, encode_batch};
}
