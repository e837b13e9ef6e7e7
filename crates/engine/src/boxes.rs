//! Boxes: the top-level records of the graph.
//!
//! A box is a vertex with a kind name, a uuid and a table of fields. Its
//! mutating setters exist for construction only: once staged, the graph
//! hands out `&GraphBox` and every change goes through the graph so that
//! updates are emitted and edges stay in sync.

use std::collections::BTreeMap;
use std::fmt;

use boxgraph_core::{
    Address, ByteInput, ByteOutput, CodecResult, FieldKey, PrimitiveValue, Uuid,
};
use serde_json::Value;

use crate::error::{GraphError, GraphResult};
use crate::field::{
    fields_to_json, read_field_block, read_fields_json, write_field_block, Field, PointerField,
};
use crate::vertex::{PointerRules, VertexRef};

/// A top-level record.
#[derive(Clone, PartialEq)]
pub struct GraphBox {
    kind: String,
    address: Address,
    creation_index: i32,
    pointer_rules: PointerRules,
    fields: BTreeMap<FieldKey, Field>,
}

impl GraphBox {
    pub(crate) fn new(
        kind: impl Into<String>,
        uuid: Uuid,
        pointer_rules: PointerRules,
        fields: BTreeMap<FieldKey, Field>,
    ) -> Self {
        Self {
            kind: kind.into(),
            address: Address::of_box(uuid),
            creation_index: 0,
            pointer_rules,
            fields,
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Kind name, used by the factory to rebuild the box.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Box uuid.
    pub fn uuid(&self) -> Uuid {
        self.address.uuid()
    }

    /// Box address (uuid with an empty field path).
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Order in which the box was staged.
    pub fn creation_index(&self) -> i32 {
        self.creation_index
    }

    pub(crate) fn set_creation_index(&mut self, index: i32) {
        self.creation_index = index;
    }

    /// Rules for pointers targeting the box itself.
    pub fn pointer_rules(&self) -> &PointerRules {
        &self.pointer_rules
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Top-level fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Field at a relative path. An empty path yields `None`.
    pub fn field(&self, keys: &[FieldKey]) -> Option<&Field> {
        let (first, rest) = keys.split_first()?;
        rest.iter()
            .try_fold(self.fields.get(first)?, |field, key| field.child(*key))
    }

    pub(crate) fn field_mut(&mut self, keys: &[FieldKey]) -> Option<&mut Field> {
        let (first, rest) = keys.split_first()?;
        let mut field = self.fields.get_mut(first)?;
        for key in rest {
            field = field.child_mut(*key)?;
        }
        Some(field)
    }

    /// Vertex at a relative path. An empty path is the box itself.
    pub fn vertex(&self, keys: &[FieldKey]) -> Option<VertexRef<'_>> {
        if keys.is_empty() {
            Some(VertexRef::Box(self))
        } else {
            self.field(keys).map(VertexRef::Field)
        }
    }

    /// Value of the primitive field at `keys`.
    pub fn primitive(&self, keys: &[FieldKey]) -> Option<&PrimitiveValue> {
        self.field(keys)?.as_primitive().map(|field| field.value())
    }

    /// Pointer field at `keys`.
    pub fn pointer(&self, keys: &[FieldKey]) -> Option<&PointerField> {
        self.field(keys)?.as_pointer()
    }

    /// Every pointer field, depth-first in key order.
    pub fn pointers(&self) -> Vec<&PointerField> {
        let mut pointers = Vec::new();
        for field in self.fields.values() {
            field.collect_pointers(&mut pointers);
        }
        pointers
    }

    /// The box followed by every nested field, depth-first.
    pub fn vertices(&self) -> Vec<VertexRef<'_>> {
        let mut fields = Vec::new();
        for field in self.fields.values() {
            field.collect_fields(&mut fields);
        }
        std::iter::once(VertexRef::Box(self))
            .chain(fields.into_iter().map(VertexRef::Field))
            .collect()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    fn field_or_missing(&mut self, keys: &[FieldKey]) -> GraphResult<&mut Field> {
        let address = Address::new(self.uuid(), keys.iter().copied());
        self.field_mut(keys).ok_or(GraphError::VertexNotFound(address))
    }

    /// Set a primitive field while the box is under construction.
    pub fn set_primitive(
        &mut self,
        keys: &[FieldKey],
        value: impl Into<PrimitiveValue>,
    ) -> GraphResult<()> {
        self.field_or_missing(keys)?
            .as_primitive_mut()?
            .replace(value.into())
            .map(|_| ())
    }

    /// Point a pointer field at `target` while the box is under construction.
    /// The edge is created when the box is staged.
    pub fn refer(&mut self, keys: &[FieldKey], target: Address) -> GraphResult<()> {
        self.field_or_missing(keys)?
            .as_pointer_mut()?
            .set_target(Some(target));
        Ok(())
    }

    /// Clear a pointer field while the box is under construction.
    pub fn clear_pointer(&mut self, keys: &[FieldKey]) -> GraphResult<()> {
        self.field_or_missing(keys)?.as_pointer_mut()?.set_target(None);
        Ok(())
    }

    /// Overwrite fields from their encoded form (see [`GraphBox::to_bytes`]).
    pub fn read_fields(&mut self, bytes: &[u8]) -> CodecResult<()> {
        read_field_block(&mut self.fields, &mut ByteInput::new(bytes), None)
    }

    /// Like [`GraphBox::read_fields`], rewriting every pointer target.
    pub fn read_fields_remapped(
        &mut self,
        bytes: &[u8],
        remap: &dyn Fn(&Address) -> Address,
    ) -> CodecResult<()> {
        read_field_block(&mut self.fields, &mut ByteInput::new(bytes), Some(remap))
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Append the field table.
    pub fn write_fields(&self, output: &mut ByteOutput) {
        write_field_block(&self.fields, output);
    }

    /// Field table only. This is the payload of new and delete updates.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut output = ByteOutput::new();
        self.write_fields(&mut output);
        output.into_bytes()
    }

    /// Fields as a JSON object keyed by field name.
    pub fn to_json(&self) -> Value {
        fields_to_json(&self.fields)
    }

    /// Overwrite fields from [`GraphBox::to_json`] output while the box is
    /// under construction.
    pub fn read_json(&mut self, value: &Value) -> GraphResult<()> {
        let address = self.address.clone();
        read_fields_json(&mut self.fields, &address, value)
    }

    /// Snapshot record: creation index, kind, uuid, then the field table.
    pub fn serialize(&self) -> Vec<u8> {
        let mut output = ByteOutput::new();
        output.write_i32(self.creation_index);
        output.write_string(&self.kind);
        output.write_uuid(&self.uuid());
        self.write_fields(&mut output);
        output.into_bytes()
    }
}

impl fmt::Debug for GraphBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBox")
            .field("kind", &self.kind)
            .field("uuid", &self.uuid())
            .field("creation_index", &self.creation_index)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for GraphBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.uuid())
    }
}
