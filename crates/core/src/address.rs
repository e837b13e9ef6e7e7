//! Vertex addresses.
//!
//! An [`Address`] is a box uuid plus the field keys leading from the box to a
//! vertex. Addresses order by uuid first and field path second, so every
//! address of one box forms a contiguous range in any sorted collection.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;
use uuid::Uuid;

use crate::codec::{ByteInput, ByteOutput};
use crate::error::{CodecError, CodecResult};

/// Position of a field under its parent vertex.
pub type FieldKey = u16;

/// Field path from a box to one of its vertices.
pub type FieldKeys = SmallVec<[FieldKey; 4]>;

/// Location of a vertex in a box graph.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    uuid: Uuid,
    field_keys: FieldKeys,
}

impl Address {
    /// Create an address from a uuid and a field path.
    pub fn new(uuid: Uuid, field_keys: impl IntoIterator<Item = FieldKey>) -> Self {
        Self {
            uuid,
            field_keys: field_keys.into_iter().collect(),
        }
    }

    /// The address of a box itself (empty field path).
    pub fn of_box(uuid: Uuid) -> Self {
        Self {
            uuid,
            field_keys: FieldKeys::new(),
        }
    }

    /// The uuid of the box this address lives in.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The field path below the box.
    pub fn field_keys(&self) -> &[FieldKey] {
        &self.field_keys
    }

    /// True if this addresses a box rather than a field.
    pub fn is_box(&self) -> bool {
        self.field_keys.is_empty()
    }

    /// Address of the child with `key`.
    pub fn append(&self, key: FieldKey) -> Self {
        let mut field_keys = self.field_keys.clone();
        field_keys.push(key);
        Self {
            uuid: self.uuid,
            field_keys,
        }
    }

    /// Address of the parent vertex, `None` for a box address.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent_keys) = self.field_keys.split_last()?;
        Some(Self::new(self.uuid, parent_keys.iter().copied()))
    }

    /// True if `other` is this address or one of its ancestors.
    pub fn starts_with(&self, other: &Address) -> bool {
        self.uuid == other.uuid && self.field_keys.starts_with(&other.field_keys)
    }

    /// The same field path inside another box.
    pub fn move_to(&self, uuid: Uuid) -> Self {
        Self {
            uuid,
            field_keys: self.field_keys.clone(),
        }
    }

    /// Every ancestor from the box down to and including this address.
    pub fn lineage(&self) -> impl Iterator<Item = Address> + '_ {
        (0..=self.field_keys.len())
            .map(move |depth| Self::new(self.uuid, self.field_keys[..depth].iter().copied()))
    }

    /// Encode as uuid, `u16` key count, then each key.
    pub fn write(&self, output: &mut ByteOutput) {
        output.write_uuid(&self.uuid);
        output.write_u16(self.field_keys.len() as u16);
        for key in &self.field_keys {
            output.write_u16(*key);
        }
    }

    /// Decode an address written by [`Address::write`].
    pub fn read(input: &mut ByteInput<'_>) -> CodecResult<Self> {
        let uuid = input.read_uuid()?;
        let count = input.read_u16()?;
        let mut field_keys = FieldKeys::with_capacity(count as usize);
        for _ in 0..count {
            field_keys.push(input.read_u16()?);
        }
        Ok(Self { uuid, field_keys })
    }

    /// Encode an optional address behind a presence flag.
    pub fn write_optional(address: Option<&Address>, output: &mut ByteOutput) {
        match address {
            Some(address) => {
                output.write_bool(true);
                address.write(output);
            }
            None => output.write_bool(false),
        }
    }

    /// Decode an optional address written by [`Address::write_optional`].
    pub fn read_optional(input: &mut ByteInput<'_>) -> CodecResult<Option<Self>> {
        if input.read_bool()? {
            Ok(Some(Self::read(input)?))
        } else {
            Ok(None)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)?;
        for key in &self.field_keys {
            write!(f, "/{}", key)?;
        }
        Ok(())
    }
}

/// Parses the [`Display`](fmt::Display) form, `uuid` followed by `/key` per
/// field level.
impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidAddress(s.to_string());
        let mut parts = s.split('/');
        let uuid = parts
            .next()
            .and_then(|uuid| Uuid::parse_str(uuid).ok())
            .ok_or_else(invalid)?;
        let field_keys = parts
            .map(|key| key.parse::<FieldKey>().map_err(|_| invalid()))
            .collect::<Result<FieldKeys, _>>()?;
        Ok(Self { uuid, field_keys })
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

// =============================================================================
// Box-scoped range queries
// =============================================================================

/// Entries of `map` whose key lives in box `uuid`.
pub fn box_entries<V>(
    map: &BTreeMap<Address, V>,
    uuid: Uuid,
) -> impl Iterator<Item = (&Address, &V)> {
    map.range(Address::of_box(uuid)..)
        .take_while(move |(address, _)| address.uuid == uuid)
}

/// Members of `set` that live in box `uuid`.
pub fn box_members(set: &BTreeSet<Address>, uuid: Uuid) -> impl Iterator<Item = &Address> {
    set.range(Address::of_box(uuid)..)
        .take_while(move |address| address.uuid == uuid)
}
