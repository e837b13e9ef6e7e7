//! Invertible records of committed graph changes.
//!
//! Every [`Update`] can be replayed forward or inverted against a graph,
//! and encoded for logging or transport. Box creation and deletion carry
//! the complete field table so they invert without any history.
//!
//! Wire layout of an update block:
//!
//! ```text
//! i32 count
//! repeat:
//!   string tag            "new" | "primitive" | "pointer" | "delete"
//!   new / delete:         uuid, string kind, i32 length, field bytes
//!   primitive:            address, string type tag, old value, new value
//!   pointer:              address, optional old target, optional new target
//! ```

use std::fmt;

use boxgraph_core::{
    Address, ByteInput, ByteOutput, CodecError, CodecResult, PrimitiveType, PrimitiveValue, Uuid,
};

use crate::error::{GraphError, GraphResult};
use crate::graph::BoxGraph;

/// One committed change.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// A box was staged
    New(NewUpdate),
    /// A primitive field changed value
    Primitive(PrimitiveUpdate),
    /// A pointer field changed target
    Pointer(PointerUpdate),
    /// A box was unstaged
    Delete(DeleteUpdate),
}

impl Update {
    /// Wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Update::New(_) => "new",
            Update::Primitive(_) => "primitive",
            Update::Pointer(_) => "pointer",
            Update::Delete(_) => "delete",
        }
    }

    /// Address of the changed vertex: the box for new and delete updates.
    pub fn address(&self) -> Address {
        match self {
            Update::New(update) => Address::of_box(update.uuid),
            Update::Primitive(update) => update.address.clone(),
            Update::Pointer(update) => update.address.clone(),
            Update::Delete(update) => Address::of_box(update.uuid),
        }
    }

    /// Apply the change to `graph`.
    pub fn forward(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        match self {
            Update::New(update) => update.forward(graph),
            Update::Primitive(update) => update.forward(graph),
            Update::Pointer(update) => update.forward(graph),
            Update::Delete(update) => update.forward(graph),
        }
    }

    /// Revert the change on `graph`.
    pub fn inverse(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        match self {
            Update::New(update) => update.inverse(graph),
            Update::Primitive(update) => update.inverse(graph),
            Update::Pointer(update) => update.inverse(graph),
            Update::Delete(update) => update.inverse(graph),
        }
    }

    /// Append the tagged encoding.
    pub fn write(&self, output: &mut ByteOutput) {
        output.write_string(self.tag());
        match self {
            Update::New(update) => write_box_payload(output, update.uuid, &update.kind, &update.bytes),
            Update::Primitive(update) => {
                update.address.write(output);
                output.write_string(update.old_value.primitive_type().tag());
                update.old_value.encode(output);
                update.new_value.encode(output);
            }
            Update::Pointer(update) => {
                update.address.write(output);
                Address::write_optional(update.old_address.as_ref(), output);
                Address::write_optional(update.new_address.as_ref(), output);
            }
            Update::Delete(update) => write_box_payload(output, update.uuid, &update.kind, &update.bytes),
        }
    }

    /// Read one tagged update.
    pub fn read(input: &mut ByteInput<'_>) -> CodecResult<Self> {
        let tag = input.read_string()?;
        match tag.as_str() {
            "new" => {
                let (uuid, kind, bytes) = read_box_payload(input)?;
                Ok(Update::New(NewUpdate { uuid, kind, bytes }))
            }
            "primitive" => {
                let address = Address::read(input)?;
                let primitive_type = PrimitiveType::from_tag(&input.read_string()?)?;
                let old_value = primitive_type.decode(input)?;
                let new_value = primitive_type.decode(input)?;
                Ok(Update::Primitive(PrimitiveUpdate {
                    address,
                    old_value,
                    new_value,
                }))
            }
            "pointer" => Ok(Update::Pointer(PointerUpdate {
                address: Address::read(input)?,
                old_address: Address::read_optional(input)?,
                new_address: Address::read_optional(input)?,
            })),
            "delete" => {
                let (uuid, kind, bytes) = read_box_payload(input)?;
                Ok(Update::Delete(DeleteUpdate { uuid, kind, bytes }))
            }
            _ => Err(CodecError::UnknownTag(tag)),
        }
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::New(update) => write!(
                f,
                "new {} {} ({} bytes)",
                update.kind,
                update.uuid,
                update.bytes.len()
            ),
            Update::Primitive(update) => write!(
                f,
                "primitive {}: {} -> {}",
                update.address, update.old_value, update.new_value
            ),
            Update::Pointer(update) => write!(
                f,
                "pointer {}: {} -> {}",
                update.address,
                DisplayTarget(update.old_address.as_ref()),
                DisplayTarget(update.new_address.as_ref())
            ),
            Update::Delete(update) => write!(
                f,
                "delete {} {} ({} bytes)",
                update.kind,
                update.uuid,
                update.bytes.len()
            ),
        }
    }
}

struct DisplayTarget<'a>(Option<&'a Address>);

impl fmt::Display for DisplayTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(address) => write!(f, "{}", address),
            None => f.write_str("none"),
        }
    }
}

fn write_box_payload(output: &mut ByteOutput, uuid: Uuid, kind: &str, bytes: &[u8]) {
    output.write_uuid(&uuid);
    output.write_string(kind);
    output.write_blob(bytes);
}

fn read_box_payload(input: &mut ByteInput<'_>) -> CodecResult<(Uuid, String, Vec<u8>)> {
    let uuid = input.read_uuid()?;
    let kind = input.read_string()?;
    let bytes = input.read_blob()?.to_vec();
    Ok((uuid, kind, bytes))
}

/// Encode a block of updates.
pub fn encode(updates: &[Update]) -> Vec<u8> {
    let mut output = ByteOutput::new();
    output.write_i32(updates.len() as i32);
    for update in updates {
        update.write(&mut output);
    }
    output.into_bytes()
}

/// Decode a block of updates written by [`encode`].
pub fn decode(input: &mut ByteInput<'_>) -> CodecResult<Vec<Update>> {
    let count = input.read_len()?;
    (0..count).map(|_| Update::read(input)).collect()
}

// =============================================================================
// Variants
// =============================================================================

/// A box was staged with this field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpdate {
    uuid: Uuid,
    kind: String,
    bytes: Vec<u8>,
}

impl NewUpdate {
    /// Record the creation of box `uuid`.
    pub fn new(uuid: Uuid, kind: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            uuid,
            kind: kind.into(),
            bytes,
        }
    }

    /// Box uuid.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Box kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Field table at creation.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn forward(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        create_from_bytes(graph, self.uuid, &self.kind, &self.bytes)
    }

    /// Clears the box's own pointers first; incoming pointers must already
    /// be gone.
    fn inverse(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        graph.detach_outgoing_pointers(self.uuid)?;
        graph.unstage_box(self.uuid).map(|_| ())
    }
}

/// A box was unstaged with this field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteUpdate {
    uuid: Uuid,
    kind: String,
    bytes: Vec<u8>,
}

impl DeleteUpdate {
    /// Record the deletion of box `uuid`.
    pub fn new(uuid: Uuid, kind: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            uuid,
            kind: kind.into(),
            bytes,
        }
    }

    /// Box uuid.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Box kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Field table at deletion.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn forward(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        graph.unstage_box(self.uuid).map(|_| ())
    }

    fn inverse(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        create_from_bytes(graph, self.uuid, &self.kind, &self.bytes)
    }
}

fn create_from_bytes(graph: &mut BoxGraph, uuid: Uuid, kind: &str, bytes: &[u8]) -> GraphResult<()> {
    graph
        .create_box(kind, uuid, |graph_box| {
            graph_box.read_fields(bytes).map_err(GraphError::from)
        })
        .map(|_| ())
}

/// A primitive field changed value.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveUpdate {
    address: Address,
    old_value: PrimitiveValue,
    new_value: PrimitiveValue,
}

impl PrimitiveUpdate {
    /// Record a value change at `address`.
    pub fn new(address: Address, old_value: PrimitiveValue, new_value: PrimitiveValue) -> Self {
        Self {
            address,
            old_value,
            new_value,
        }
    }

    /// Field address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Value before the change.
    pub fn old_value(&self) -> &PrimitiveValue {
        &self.old_value
    }

    /// Value after the change.
    pub fn new_value(&self) -> &PrimitiveValue {
        &self.new_value
    }

    fn forward(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        graph.set_primitive(&self.address, self.new_value.clone())
    }

    fn inverse(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        graph.set_primitive(&self.address, self.old_value.clone())
    }
}

/// A pointer field changed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerUpdate {
    address: Address,
    old_address: Option<Address>,
    new_address: Option<Address>,
}

impl PointerUpdate {
    /// Record a target change of the pointer at `address`.
    pub fn new(address: Address, old_address: Option<Address>, new_address: Option<Address>) -> Self {
        Self {
            address,
            old_address,
            new_address,
        }
    }

    /// Pointer field address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Target before the change.
    pub fn old_address(&self) -> Option<&Address> {
        self.old_address.as_ref()
    }

    /// Target after the change.
    pub fn new_address(&self) -> Option<&Address> {
        self.new_address.as_ref()
    }

    fn forward(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        graph.set_pointer(&self.address, self.new_address.clone())
    }

    fn inverse(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        graph.set_pointer(&self.address, self.old_address.clone())
    }
}
