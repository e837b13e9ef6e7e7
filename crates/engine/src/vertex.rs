//! Vertices and pointer rules.
//!
//! A vertex is either a box or one of the fields nested under it.
//! [`VertexRef`] is the borrowed view used wherever code needs to treat both
//! uniformly; dispatch on the concrete kind is a plain `match`.

use std::fmt;

use boxgraph_core::{Address, Uuid};

use crate::boxes::GraphBox;
use crate::field::{Field, PointerField};

/// Application-defined pointer category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerType(pub u16);

impl fmt::Display for PointerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which pointers may target a vertex, and whether at least one must.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerRules {
    accepts: Vec<PointerType>,
    mandatory: bool,
}

impl PointerRules {
    /// Accepts nothing, requires nothing.
    pub const NONE: PointerRules = PointerRules {
        accepts: Vec::new(),
        mandatory: false,
    };

    /// Rules accepting the given pointer types.
    pub fn accepting(types: impl IntoIterator<Item = PointerType>) -> Self {
        Self {
            accepts: types.into_iter().collect(),
            mandatory: false,
        }
    }

    /// Require at least one incoming pointer.
    pub fn required(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// True if pointers of `pointer_type` may target this vertex.
    pub fn accepts(&self, pointer_type: PointerType) -> bool {
        self.accepts.contains(&pointer_type)
    }

    /// Accepted pointer types.
    pub fn accepted(&self) -> &[PointerType] {
        &self.accepts
    }

    /// True if the vertex must be pointed to.
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }
}

/// Borrowed view of a vertex.
#[derive(Clone, Copy)]
pub enum VertexRef<'a> {
    /// A top-level box
    Box(&'a GraphBox),
    /// A field nested in a box
    Field(&'a Field),
}

impl<'a> VertexRef<'a> {
    /// Address of the vertex.
    pub fn address(&self) -> &'a Address {
        match self {
            VertexRef::Box(graph_box) => graph_box.address(),
            VertexRef::Field(field) => field.address(),
        }
    }

    /// Uuid of the box owning the vertex.
    pub fn box_uuid(&self) -> Uuid {
        self.address().uuid()
    }

    /// Pointer rules declared for the vertex.
    pub fn pointer_rules(&self) -> &'a PointerRules {
        match self {
            VertexRef::Box(graph_box) => graph_box.pointer_rules(),
            VertexRef::Field(field) => field.pointer_rules(),
        }
    }

    /// Box kind or field name.
    pub fn name(&self) -> &'a str {
        match self {
            VertexRef::Box(graph_box) => graph_box.kind(),
            VertexRef::Field(field) => field.name(),
        }
    }

    /// True for a box vertex.
    pub fn is_box(&self) -> bool {
        matches!(self, VertexRef::Box(_))
    }

    /// The box, if this is a box vertex.
    pub fn as_box(&self) -> Option<&'a GraphBox> {
        match self {
            VertexRef::Box(graph_box) => Some(graph_box),
            VertexRef::Field(_) => None,
        }
    }

    /// The field, if this is a field vertex.
    pub fn as_field(&self) -> Option<&'a Field> {
        match self {
            VertexRef::Box(_) => None,
            VertexRef::Field(field) => Some(field),
        }
    }

    /// The pointer field, if this is one.
    pub fn as_pointer(&self) -> Option<&'a PointerField> {
        self.as_field().and_then(Field::as_pointer)
    }
}

impl fmt::Debug for VertexRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name(), self.address())
    }
}
