//! Fields: the vertices nested inside a box.
//!
//! Every field carries its absolute address, a debug name and the pointer
//! rules that govern which pointers may target it. The four field kinds
//! share one byte layout per kind:
//!
//! | kind      | payload                                       |
//! |-----------|-----------------------------------------------|
//! | primitive | the value, encoded by its type                |
//! | pointer   | optional address (`bool` flag + address)      |
//! | object    | `u16` count, then `u16` key + payload each    |
//! | array     | `u16` length, then each element's payload     |
//!
//! A box's own fields use the object layout.
//!
//! The JSON form follows the same shape: a primitive is its value, a
//! pointer is its target address string or `null`, an object is keyed by
//! field name and an array lists its elements in index order.

use std::collections::BTreeMap;

use boxgraph_core::{
    Address, ByteInput, ByteOutput, CodecError, CodecResult, FieldKey, PrimitiveType,
    PrimitiveValue,
};
use serde_json::{Map, Number, Value};

use crate::array::ArrayField;
use crate::error::{GraphError, GraphResult};
use crate::vertex::{PointerRules, PointerType};

/// Rewrites addresses while field bytes are read.
pub type Remap<'a> = Option<&'a dyn Fn(&Address) -> Address>;

/// Identity shared by every field kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub(crate) address: Address,
    name: String,
    pointer_rules: PointerRules,
}

impl FieldMeta {
    pub(crate) fn new(address: Address, name: impl Into<String>, pointer_rules: PointerRules) -> Self {
        Self {
            address,
            name: name.into(),
            pointer_rules,
        }
    }

    /// Key of the field within its parent.
    pub fn key(&self) -> FieldKey {
        self.address.field_keys().last().copied().unwrap_or_default()
    }
}

// =============================================================================
// Field
// =============================================================================

/// A vertex nested in a box.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Scalar value
    Primitive(PrimitiveField),
    /// Reference to another vertex
    Pointer(PointerField),
    /// Keyed container of nested fields
    Object(ObjectField),
    /// Fixed-length sequence of same-shaped fields
    Array(ArrayField),
}

impl Field {
    fn meta(&self) -> &FieldMeta {
        match self {
            Field::Primitive(field) => &field.meta,
            Field::Pointer(field) => &field.meta,
            Field::Object(field) => &field.meta,
            Field::Array(field) => field.meta(),
        }
    }

    /// Absolute address.
    pub fn address(&self) -> &Address {
        &self.meta().address
    }

    /// Key within the parent.
    pub fn key(&self) -> FieldKey {
        self.meta().key()
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.meta().name
    }

    /// Rules for pointers targeting this field.
    pub fn pointer_rules(&self) -> &PointerRules {
        &self.meta().pointer_rules
    }

    /// Kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Field::Primitive(_) => "primitive",
            Field::Pointer(_) => "pointer",
            Field::Object(_) => "object",
            Field::Array(_) => "array",
        }
    }

    /// Direct child with `key`, for objects and arrays.
    pub fn child(&self, key: FieldKey) -> Option<&Field> {
        match self {
            Field::Object(object) => object.fields.get(&key),
            Field::Array(array) => array.get(key),
            _ => None,
        }
    }

    pub(crate) fn child_mut(&mut self, key: FieldKey) -> Option<&mut Field> {
        match self {
            Field::Object(object) => object.fields.get_mut(&key),
            Field::Array(array) => array.get_mut(key),
            _ => None,
        }
    }

    /// Direct children in key order.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Field> + '_> {
        match self {
            Field::Object(object) => Box::new(object.fields.values()),
            Field::Array(array) => Box::new(array.elements()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// This field as a primitive.
    pub fn as_primitive(&self) -> Option<&PrimitiveField> {
        match self {
            Field::Primitive(field) => Some(field),
            _ => None,
        }
    }

    /// This field as a pointer.
    pub fn as_pointer(&self) -> Option<&PointerField> {
        match self {
            Field::Pointer(field) => Some(field),
            _ => None,
        }
    }

    pub(crate) fn as_primitive_mut(&mut self) -> GraphResult<&mut PrimitiveField> {
        match self {
            Field::Primitive(field) => Ok(field),
            other => Err(GraphError::FieldKindMismatch {
                address: other.address().clone(),
                expected: "primitive",
            }),
        }
    }

    pub(crate) fn as_pointer_mut(&mut self) -> GraphResult<&mut PointerField> {
        match self {
            Field::Pointer(field) => Ok(field),
            other => Err(GraphError::FieldKindMismatch {
                address: other.address().clone(),
                expected: "pointer",
            }),
        }
    }

    /// Push every pointer field of this subtree, depth-first in key order.
    pub(crate) fn collect_pointers<'a>(&'a self, out: &mut Vec<&'a PointerField>) {
        match self {
            Field::Pointer(pointer) => out.push(pointer),
            Field::Primitive(_) => {}
            _ => {
                for child in self.children() {
                    child.collect_pointers(out);
                }
            }
        }
    }

    /// Push every field of this subtree, self first.
    pub(crate) fn collect_fields<'a>(&'a self, out: &mut Vec<&'a Field>) {
        out.push(self);
        for child in self.children() {
            child.collect_fields(out);
        }
    }

    /// Encode the payload.
    pub fn write(&self, output: &mut ByteOutput) {
        match self {
            Field::Primitive(field) => field.value.encode(output),
            Field::Pointer(field) => Address::write_optional(field.target.as_ref(), output),
            Field::Object(field) => write_field_block(&field.fields, output),
            Field::Array(field) => field.write(output),
        }
    }

    /// Decode the payload in place. Primitive values must keep their type.
    pub fn read(&mut self, input: &mut ByteInput<'_>, remap: Remap<'_>) -> CodecResult<()> {
        match self {
            Field::Primitive(field) => {
                field.value = field.value.primitive_type().decode(input)?;
            }
            Field::Pointer(field) => {
                let target = Address::read_optional(input)?;
                field.target = match (target, remap) {
                    (Some(address), Some(remap)) => Some(remap(&address)),
                    (target, _) => target,
                };
                field.resolved = None;
            }
            Field::Object(field) => read_field_block(&mut field.fields, input, remap)?,
            Field::Array(field) => field.read(input, remap)?,
        }
        Ok(())
    }

    /// JSON form of the payload.
    pub fn to_json(&self) -> Value {
        match self {
            Field::Primitive(field) => primitive_to_json(&field.value),
            Field::Pointer(field) => field
                .target
                .as_ref()
                .map_or(Value::Null, |target| Value::String(target.to_string())),
            Field::Object(field) => fields_to_json(&field.fields),
            Field::Array(field) => field.to_json(),
        }
    }

    /// Overwrite the payload from its JSON form. Primitive values must keep
    /// their type.
    pub fn read_json(&mut self, value: &Value) -> GraphResult<()> {
        match self {
            Field::Primitive(field) => {
                let primitive_type = field.value.primitive_type();
                field.value = primitive_from_json(primitive_type, value)
                    .ok_or_else(|| json_mismatch(&field.meta.address, primitive_type.tag(), value))?;
            }
            Field::Pointer(field) => {
                field.target = match value {
                    Value::Null => None,
                    Value::String(text) => Some(text.parse::<Address>()?),
                    other => return Err(json_mismatch(&field.meta.address, "address", other)),
                };
                field.resolved = None;
            }
            Field::Object(field) => {
                let address = field.meta.address.clone();
                read_fields_json(&mut field.fields, &address, value)?;
            }
            Field::Array(field) => field.read_json(value)?,
        }
        Ok(())
    }
}

fn primitive_to_json(value: &PrimitiveValue) -> Value {
    match value {
        PrimitiveValue::Boolean(v) => Value::Bool(*v),
        PrimitiveValue::Int32(v) => Value::from(*v),
        // non-finite floats have no JSON number
        PrimitiveValue::Float32(v) => {
            Number::from_f64(f64::from(*v)).map_or(Value::Null, Value::Number)
        }
        PrimitiveValue::String(v) => Value::String(v.clone()),
    }
}

fn primitive_from_json(primitive_type: PrimitiveType, value: &Value) -> Option<PrimitiveValue> {
    Some(match primitive_type {
        PrimitiveType::Boolean => PrimitiveValue::Boolean(value.as_bool()?),
        PrimitiveType::Int32 => PrimitiveValue::Int32(i32::try_from(value.as_i64()?).ok()?),
        PrimitiveType::Float32 => PrimitiveValue::Float32(value.as_f64()? as f32),
        PrimitiveType::String => PrimitiveValue::String(value.as_str()?.to_string()),
    })
}

pub(crate) fn json_mismatch(address: &Address, expected: &str, found: &Value) -> GraphError {
    GraphError::Json(format!("{address}: expected {expected}, found {found}"))
}

/// JSON object of a keyed field table, keyed by field name.
pub(crate) fn fields_to_json(fields: &BTreeMap<FieldKey, Field>) -> Value {
    Value::Object(
        fields
            .values()
            .map(|field| (field.name().to_string(), field.to_json()))
            .collect::<Map<String, Value>>(),
    )
}

/// Read a JSON object into a keyed field table. Names absent from the
/// object keep their current value; unknown names are rejected.
pub(crate) fn read_fields_json(
    fields: &mut BTreeMap<FieldKey, Field>,
    address: &Address,
    value: &Value,
) -> GraphResult<()> {
    let Value::Object(entries) = value else {
        return Err(json_mismatch(address, "object", value));
    };
    for (name, value) in entries {
        let field = fields
            .values_mut()
            .find(|field| field.name() == name)
            .ok_or_else(|| GraphError::Json(format!("{address}: unknown field {name:?}")))?;
        field.read_json(value)?;
    }
    Ok(())
}

/// Encode a keyed field table: count, then key and payload per field.
pub(crate) fn write_field_block(fields: &BTreeMap<FieldKey, Field>, output: &mut ByteOutput) {
    output.write_u16(fields.len() as u16);
    for (key, field) in fields {
        output.write_u16(*key);
        field.write(output);
    }
}

/// Decode a keyed field table into existing fields. Keys absent from the
/// input keep their current value; unknown keys are rejected.
pub(crate) fn read_field_block(
    fields: &mut BTreeMap<FieldKey, Field>,
    input: &mut ByteInput<'_>,
    remap: Remap<'_>,
) -> CodecResult<()> {
    let count = input.read_u16()?;
    for _ in 0..count {
        let key = input.read_u16()?;
        let field = fields
            .get_mut(&key)
            .ok_or(CodecError::UnknownField { key })?;
        field.read(input, remap)?;
    }
    Ok(())
}

// =============================================================================
// Field kinds
// =============================================================================

/// Scalar field. The value type is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveField {
    meta: FieldMeta,
    value: PrimitiveValue,
}

impl PrimitiveField {
    pub(crate) fn new(meta: FieldMeta, value: PrimitiveValue) -> Self {
        Self { meta, value }
    }

    /// Current value.
    pub fn value(&self) -> &PrimitiveValue {
        &self.value
    }

    /// Absolute address.
    pub fn address(&self) -> &Address {
        &self.meta.address
    }

    /// Replace the value, returning the previous one.
    pub(crate) fn replace(&mut self, value: PrimitiveValue) -> GraphResult<PrimitiveValue> {
        let expected = self.value.primitive_type();
        if value.primitive_type() != expected {
            return Err(GraphError::TypeMismatch {
                address: self.meta.address.clone(),
                expected,
                actual: value.primitive_type(),
            });
        }
        Ok(std::mem::replace(&mut self.value, value))
    }
}

/// Reference to another vertex.
///
/// `target` is the address the pointer was set to. `resolved` is the
/// vertex it was last successfully bound to; it lags behind `target` until
/// the graph processes the pointer update.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerField {
    meta: FieldMeta,
    pointer_type: PointerType,
    mandatory: bool,
    target: Option<Address>,
    resolved: Option<Address>,
}

impl PointerField {
    pub(crate) fn new(meta: FieldMeta, pointer_type: PointerType, mandatory: bool) -> Self {
        Self {
            meta,
            pointer_type,
            mandatory,
            target: None,
            resolved: None,
        }
    }

    /// Absolute address.
    pub fn address(&self) -> &Address {
        &self.meta.address
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Pointer category, checked against target rules.
    pub fn pointer_type(&self) -> PointerType {
        self.pointer_type
    }

    /// True if the pointer must always have a target.
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Address the pointer is set to.
    pub fn target_address(&self) -> Option<&Address> {
        self.target.as_ref()
    }

    /// Vertex the pointer is bound to.
    pub fn resolved_target(&self) -> Option<&Address> {
        self.resolved.as_ref()
    }

    /// True if no target is set.
    pub fn is_empty(&self) -> bool {
        self.target.is_none()
    }

    pub(crate) fn set_target(&mut self, target: Option<Address>) -> Option<Address> {
        std::mem::replace(&mut self.target, target)
    }

    pub(crate) fn resolve(&mut self, vertex: Option<Address>) -> Option<Address> {
        std::mem::replace(&mut self.resolved, vertex)
    }
}

/// Keyed container of nested fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    meta: FieldMeta,
    fields: BTreeMap<FieldKey, Field>,
}

impl ObjectField {
    pub(crate) fn new(meta: FieldMeta, fields: BTreeMap<FieldKey, Field>) -> Self {
        Self { meta, fields }
    }

    /// Nested fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }
}
