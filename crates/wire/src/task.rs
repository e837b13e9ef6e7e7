//! Update tasks: the replica-facing form of graph updates.
//!
//! Unlike [`Update`], a task carries only what a mirror needs to move
//! forward: no old values, and a delete names the box alone.
//!
//! ```text
//! i32 count
//! repeat:
//!   string tag           "new" | "update-primitive" | "update-pointer" | "delete"
//!   new:                 string kind, uuid, i32 length, field bytes
//!   update-primitive:    address, string type tag, value
//!   update-pointer:      address, optional target
//!   delete:              uuid
//! ```

use boxgraph_core::{
    Address, ByteInput, ByteOutput, CodecError, CodecResult, PrimitiveType, PrimitiveValue, Uuid,
};
use boxgraph_engine::{BoxGraph, GraphError, GraphResult, Update};

/// One step for a mirror graph.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateTask {
    /// Create a box from its field table
    New {
        /// Box kind
        kind: String,
        /// Box uuid
        uuid: Uuid,
        /// Encoded field table
        bytes: Vec<u8>,
    },
    /// Set a primitive field
    UpdatePrimitive {
        /// Field address
        address: Address,
        /// New value
        value: PrimitiveValue,
    },
    /// Retarget or clear a pointer field
    UpdatePointer {
        /// Pointer address
        address: Address,
        /// New target
        target: Option<Address>,
    },
    /// Remove a box
    Delete {
        /// Box uuid
        uuid: Uuid,
    },
}

impl UpdateTask {
    /// The task that replays `update` forward.
    pub fn from_update(update: &Update) -> Self {
        match update {
            Update::New(update) => UpdateTask::New {
                kind: update.kind().to_string(),
                uuid: update.uuid(),
                bytes: update.bytes().to_vec(),
            },
            Update::Primitive(update) => UpdateTask::UpdatePrimitive {
                address: update.address().clone(),
                value: update.new_value().clone(),
            },
            Update::Pointer(update) => UpdateTask::UpdatePointer {
                address: update.address().clone(),
                target: update.new_address().cloned(),
            },
            Update::Delete(update) => UpdateTask::Delete {
                uuid: update.uuid(),
            },
        }
    }

    /// Wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            UpdateTask::New { .. } => "new",
            UpdateTask::UpdatePrimitive { .. } => "update-primitive",
            UpdateTask::UpdatePointer { .. } => "update-pointer",
            UpdateTask::Delete { .. } => "delete",
        }
    }

    /// Apply to `graph`. Must be called inside a transaction.
    pub fn apply(&self, graph: &mut BoxGraph) -> GraphResult<()> {
        match self {
            UpdateTask::New { kind, uuid, bytes } => graph
                .create_box(kind, *uuid, |graph_box| {
                    graph_box.read_fields(bytes).map_err(GraphError::from)
                })
                .map(|_| ()),
            UpdateTask::UpdatePrimitive { address, value } => {
                graph.set_primitive(address, value.clone())
            }
            UpdateTask::UpdatePointer { address, target } => {
                graph.set_pointer(address, target.clone())
            }
            UpdateTask::Delete { uuid } => graph.unstage_box(*uuid).map(|_| ()),
        }
    }

    /// Append the tagged encoding.
    pub fn write(&self, output: &mut ByteOutput) {
        output.write_string(self.tag());
        match self {
            UpdateTask::New { kind, uuid, bytes } => {
                output.write_string(kind);
                output.write_uuid(uuid);
                output.write_blob(bytes);
            }
            UpdateTask::UpdatePrimitive { address, value } => {
                address.write(output);
                output.write_string(value.primitive_type().tag());
                value.encode(output);
            }
            UpdateTask::UpdatePointer { address, target } => {
                address.write(output);
                Address::write_optional(target.as_ref(), output);
            }
            UpdateTask::Delete { uuid } => output.write_uuid(uuid),
        }
    }

    /// Read one tagged task.
    pub fn read(input: &mut ByteInput<'_>) -> CodecResult<Self> {
        let tag = input.read_string()?;
        match tag.as_str() {
            "new" => Ok(UpdateTask::New {
                kind: input.read_string()?,
                uuid: input.read_uuid()?,
                bytes: input.read_blob()?.to_vec(),
            }),
            "update-primitive" => {
                let address = Address::read(input)?;
                let primitive_type = PrimitiveType::from_tag(&input.read_string()?)?;
                Ok(UpdateTask::UpdatePrimitive {
                    address,
                    value: primitive_type.decode(input)?,
                })
            }
            "update-pointer" => Ok(UpdateTask::UpdatePointer {
                address: Address::read(input)?,
                target: Address::read_optional(input)?,
            }),
            "delete" => Ok(UpdateTask::Delete {
                uuid: input.read_uuid()?,
            }),
            _ => Err(CodecError::UnknownTag(tag)),
        }
    }
}

/// Encode a batch, preserving order.
pub fn encode_batch(tasks: &[UpdateTask]) -> Vec<u8> {
    let mut output = ByteOutput::new();
    output.write_i32(tasks.len() as i32);
    for task in tasks {
        task.write(&mut output);
    }
    output.into_bytes()
}

/// Decode a batch written by [`encode_batch`].
pub fn decode_batch(bytes: &[u8]) -> CodecResult<Vec<UpdateTask>> {
    let mut input = ByteInput::new(bytes);
    let count = input.read_len()?;
    (0..count).map(|_| UpdateTask::read(&mut input)).collect()
}
