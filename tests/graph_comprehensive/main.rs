//! Box Graph Comprehensive Test Suite
//!
//! Exercises the public API end to end, through the `boxgraph` facade.
//!
//! ## Suites
//!
//! - **properties**: snapshot round trip, update inversion, edge index
//!   consistency, deletion preconditions, deferred pointers, checksums
//! - **scenarios**: fixed walkthroughs of pointer lifecycle and load order
//! - **undo**: history stepping over random edit sequences
//! - **sync**: mirrors kept in step across threads
//! - **dependencies**: dependency tracing over shared and diamond shapes
//! - **bundles**: moving boxes with their dependencies between graphs
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test graph_comprehensive
//! ```

mod test_utils;

mod bundles;
mod dependencies;
mod properties;
mod scenarios;
mod sync;
mod undo;
