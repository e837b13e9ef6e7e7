//! Core types for boxgraph
//!
//! This crate defines the leaf types every other boxgraph crate builds on:
//! - Address: box uuid plus field path, totally ordered
//! - ByteOutput / ByteInput: the big-endian byte codec
//! - PrimitiveType / PrimitiveValue: the closed registry of scalar field values
//! - Checksum: content hash for replica comparison
//! - Listeners / Subscription: listener registries with explicit release

#![warn(missing_docs)]

pub mod address;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod listeners;
pub mod value;

pub use address::{Address, FieldKey, FieldKeys};
pub use checksum::{Checksum, ChecksumWriter};
pub use codec::{ByteInput, ByteOutput};
pub use error::{CodecError, CodecResult};
pub use listeners::{Listeners, Subscription};
pub use value::{PrimitiveType, PrimitiveValue};

pub use uuid::Uuid;
