//! Box schemas and factories.
//!
//! The graph never knows concrete box types. It asks a [`BoxFactory`] to
//! build a fresh box for a kind name and then fills it from bytes or from a
//! constructor callback. [`BoxCatalog`] is the stock factory: a table of
//! declarative [`BoxSchema`]s.

use std::collections::BTreeMap;

use boxgraph_core::{Address, FieldKey, PrimitiveValue, Uuid};

use crate::array::ArrayField;
use crate::boxes::GraphBox;
use crate::field::{Field, FieldMeta, ObjectField, PointerField, PrimitiveField};
use crate::vertex::{PointerRules, PointerType};

/// Builds empty boxes by kind name.
pub trait BoxFactory: Send + Sync {
    /// A fresh box of `kind` with default field values, or `None` if the
    /// kind is unknown.
    fn create(&self, kind: &str, uuid: Uuid) -> Option<GraphBox>;
}

impl<F> BoxFactory for F
where
    F: Fn(&str, Uuid) -> Option<GraphBox> + Send + Sync,
{
    fn create(&self, kind: &str, uuid: Uuid) -> Option<GraphBox> {
        self(kind, uuid)
    }
}

// =============================================================================
// Field schemas
// =============================================================================

/// Declarative description of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSchema {
    /// Scalar field with its default value (which also fixes its type)
    Primitive {
        /// Key within the parent
        key: FieldKey,
        /// Debug name
        name: String,
        /// Initial value
        default: PrimitiveValue,
        /// Rules for pointers targeting the field
        pointer_rules: PointerRules,
    },
    /// Pointer field, initially empty
    Pointer {
        /// Key within the parent
        key: FieldKey,
        /// Debug name
        name: String,
        /// Pointer category
        pointer_type: PointerType,
        /// Must always have a target
        mandatory: bool,
    },
    /// Nested keyed fields
    Object {
        /// Key within the parent
        key: FieldKey,
        /// Debug name
        name: String,
        /// Nested fields
        fields: Vec<FieldSchema>,
        /// Rules for pointers targeting the object
        pointer_rules: PointerRules,
    },
    /// Fixed-length array; every element follows `element`
    Array {
        /// Key within the parent
        key: FieldKey,
        /// Debug name
        name: String,
        /// Number of elements
        length: u16,
        /// Shape of each element (its key and name are ignored)
        element: Box<FieldSchema>,
    },
}

impl FieldSchema {
    /// Primitive field.
    pub fn primitive(key: FieldKey, name: impl Into<String>, default: impl Into<PrimitiveValue>) -> Self {
        FieldSchema::Primitive {
            key,
            name: name.into(),
            default: default.into(),
            pointer_rules: PointerRules::NONE,
        }
    }

    /// Optional pointer field.
    pub fn pointer(key: FieldKey, name: impl Into<String>, pointer_type: PointerType) -> Self {
        FieldSchema::Pointer {
            key,
            name: name.into(),
            pointer_type,
            mandatory: false,
        }
    }

    /// Pointer field that must always have a target.
    pub fn mandatory_pointer(key: FieldKey, name: impl Into<String>, pointer_type: PointerType) -> Self {
        FieldSchema::Pointer {
            key,
            name: name.into(),
            pointer_type,
            mandatory: true,
        }
    }

    /// Object field.
    pub fn object(key: FieldKey, name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        FieldSchema::Object {
            key,
            name: name.into(),
            fields,
            pointer_rules: PointerRules::NONE,
        }
    }

    /// Array field.
    pub fn array(key: FieldKey, name: impl Into<String>, length: u16, element: FieldSchema) -> Self {
        FieldSchema::Array {
            key,
            name: name.into(),
            length,
            element: Box::new(element),
        }
    }

    /// Set the rules for pointers targeting this field. Pointer and array
    /// fields cannot be targeted and are returned unchanged.
    pub fn with_pointer_rules(mut self, rules: PointerRules) -> Self {
        match &mut self {
            FieldSchema::Primitive { pointer_rules, .. }
            | FieldSchema::Object { pointer_rules, .. } => *pointer_rules = rules,
            FieldSchema::Pointer { .. } | FieldSchema::Array { .. } => {}
        }
        self
    }

    /// Key within the parent.
    pub fn key(&self) -> FieldKey {
        match self {
            FieldSchema::Primitive { key, .. }
            | FieldSchema::Pointer { key, .. }
            | FieldSchema::Object { key, .. }
            | FieldSchema::Array { key, .. } => *key,
        }
    }

    fn build(&self, address: Address, name: &str) -> Field {
        match self {
            FieldSchema::Primitive {
                default,
                pointer_rules,
                ..
            } => Field::Primitive(PrimitiveField::new(
                FieldMeta::new(address, name, pointer_rules.clone()),
                default.clone(),
            )),
            FieldSchema::Pointer {
                pointer_type,
                mandatory,
                ..
            } => Field::Pointer(PointerField::new(
                FieldMeta::new(address, name, PointerRules::NONE),
                *pointer_type,
                *mandatory,
            )),
            FieldSchema::Object {
                fields,
                pointer_rules,
                ..
            } => {
                let children = build_fields(fields, &address);
                Field::Object(ObjectField::new(
                    FieldMeta::new(address, name, pointer_rules.clone()),
                    children,
                ))
            }
            FieldSchema::Array {
                length, element, ..
            } => {
                let elements = (0..*length)
                    .map(|index| element.build(address.append(index), &index.to_string()))
                    .collect();
                Field::Array(ArrayField::new(
                    FieldMeta::new(address, name, PointerRules::NONE),
                    elements,
                ))
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            FieldSchema::Primitive { name, .. }
            | FieldSchema::Pointer { name, .. }
            | FieldSchema::Object { name, .. }
            | FieldSchema::Array { name, .. } => name,
        }
    }
}

fn build_fields(schemas: &[FieldSchema], parent: &Address) -> BTreeMap<FieldKey, Field> {
    schemas
        .iter()
        .map(|schema| {
            let key = schema.key();
            (key, schema.build(parent.append(key), schema.name()))
        })
        .collect()
}

// =============================================================================
// Box schemas
// =============================================================================

/// Declarative description of one box kind.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSchema {
    name: String,
    pointer_rules: PointerRules,
    fields: Vec<FieldSchema>,
}

impl BoxSchema {
    /// Schema for kind `name` with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pointer_rules: PointerRules::NONE,
            fields: Vec::new(),
        }
    }

    /// Set the rules for pointers targeting the box.
    pub fn pointer_rules(mut self, rules: PointerRules) -> Self {
        self.pointer_rules = rules;
        self
    }

    /// Add a field.
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Kind name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A fresh box with default field values.
    pub fn instantiate(&self, uuid: Uuid) -> GraphBox {
        let fields = build_fields(&self.fields, &Address::of_box(uuid));
        GraphBox::new(self.name.clone(), uuid, self.pointer_rules.clone(), fields)
    }
}

/// Factory backed by a table of box schemas.
#[derive(Debug, Clone, Default)]
pub struct BoxCatalog {
    schemas: BTreeMap<String, BoxSchema>,
}

impl BoxCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`BoxCatalog::register`].
    pub fn with(mut self, schema: BoxSchema) -> Self {
        self.register(schema);
        self
    }

    /// Add or replace the schema for `schema.name()`.
    pub fn register(&mut self, schema: BoxSchema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    /// Schema for `kind`.
    pub fn schema(&self, kind: &str) -> Option<&BoxSchema> {
        self.schemas.get(kind)
    }

    /// Registered kind names in order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

impl BoxFactory for BoxCatalog {
    fn create(&self, kind: &str, uuid: Uuid) -> Option<GraphBox> {
        self.schemas.get(kind).map(|schema| schema.instantiate(uuid))
    }
}
