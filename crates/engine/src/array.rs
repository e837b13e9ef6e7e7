//! Fixed-length array fields.
//!
//! Elements are addressed by their index, so element `i` of the array at
//! `a` lives at `a.append(i)`.

use boxgraph_core::{ByteInput, ByteOutput, CodecError, CodecResult, FieldKey};
use serde_json::Value;

use crate::error::{GraphError, GraphResult};
use crate::field::{json_mismatch, Field, FieldMeta, Remap};

/// Fixed-length sequence of same-shaped fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayField {
    meta: FieldMeta,
    elements: Vec<Field>,
}

impl ArrayField {
    pub(crate) fn new(meta: FieldMeta, elements: Vec<Field>) -> Self {
        Self { meta, elements }
    }

    pub(crate) fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`.
    pub fn get(&self, index: FieldKey) -> Option<&Field> {
        self.elements.get(index as usize)
    }

    pub(crate) fn get_mut(&mut self, index: FieldKey) -> Option<&mut Field> {
        self.elements.get_mut(index as usize)
    }

    /// Elements in index order.
    pub fn elements(&self) -> impl Iterator<Item = &Field> {
        self.elements.iter()
    }

    pub(crate) fn write(&self, output: &mut ByteOutput) {
        output.write_u16(self.elements.len() as u16);
        for element in &self.elements {
            element.write(output);
        }
    }

    pub(crate) fn read(&mut self, input: &mut ByteInput<'_>, remap: Remap<'_>) -> CodecResult<()> {
        let found = input.read_u16()? as usize;
        if found != self.elements.len() {
            return Err(CodecError::ArrayLengthMismatch {
                expected: self.elements.len(),
                found,
            });
        }
        for element in &mut self.elements {
            element.read(input, remap)?;
        }
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Value {
        Value::Array(self.elements.iter().map(Field::to_json).collect())
    }

    /// Read every element from a JSON array of the same length.
    pub(crate) fn read_json(&mut self, value: &Value) -> GraphResult<()> {
        let Value::Array(values) = value else {
            return Err(json_mismatch(&self.meta.address, "array", value));
        };
        if values.len() != self.elements.len() {
            return Err(GraphError::Json(format!(
                "{}: expected {} elements, found {}",
                self.meta.address,
                self.elements.len(),
                values.len()
            )));
        }
        for (element, value) in self.elements.iter_mut().zip(values) {
            element.read_json(value)?;
        }
        Ok(())
    }
}
