//! Replica synchronization for box graphs
//!
//! A graph on one thread (or process) is mirrored by an independent graph
//! elsewhere. The source side listens to the buffered update channel and
//! ships [`UpdateTask`] batches; the target side applies them in order and
//! compares checksums to detect divergence.
//!
//! ```text
//! BoxGraph --updates--> SyncSource --SyncMessage--> SyncTarget --> mirror BoxGraph
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod sync;
pub mod task;

pub use error::{SyncError, SyncResult};
pub use sync::{channel, ChannelSynchronization, SyncMessage, SyncSource, SyncTarget, Synchronization};
pub use task::{decode_batch, encode_batch, UpdateTask};
