//! Full-graph snapshots, JSON rendering and content checksums.
//!
//! Snapshot layout:
//!
//! ```text
//! i32          box count
//! repeat:
//!   i32        record length
//!   bytes      record: i32 creation index, string kind, uuid, field table
//! ```
//!
//! JSON layout, one object per box in uuid order:
//!
//! ```json
//! [{ "name": "Track", "uuid": "<uuid>", "fields": { "volume": 0.5, "output": null } }]
//! ```

use boxgraph_core::{ByteInput, ByteOutput, Checksum, ChecksumWriter, Uuid};
use serde_json::{json, Value};
use tracing::debug;

use super::BoxGraph;
use crate::error::{GraphError, GraphResult};

struct BoxRecord<'a> {
    creation_index: i32,
    kind: String,
    uuid: Uuid,
    fields: &'a [u8],
}

impl<'a> BoxRecord<'a> {
    fn read(record: &'a [u8]) -> GraphResult<Self> {
        let mut input = ByteInput::new(record);
        Ok(Self {
            creation_index: input.read_i32()?,
            kind: input.read_string()?,
            uuid: input.read_uuid()?,
            fields: input.rest(),
        })
    }
}

impl BoxGraph {
    /// Encode every box in uuid order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut output = ByteOutput::new();
        output.write_i32(self.boxes.len() as i32);
        for graph_box in self.boxes.values() {
            output.write_blob(&graph_box.serialize());
        }
        output.into_bytes()
    }

    /// Load a snapshot into this empty graph. Boxes are created in their
    /// recorded creation order inside one transaction, so pointers to boxes
    /// stored later in the snapshot still resolve.
    ///
    /// A decode failure after the transaction opened leaves the boxes
    /// created so far in place.
    pub fn from_bytes(&mut self, bytes: &[u8]) -> GraphResult<()> {
        if !self.boxes.is_empty() {
            return Err(GraphError::GraphNotEmpty);
        }
        let mut input = ByteInput::new(bytes);
        let count = input.read_len()?;
        let mut records = Vec::with_capacity(count.min(input.remaining() / 4));
        for _ in 0..count {
            records.push(BoxRecord::read(input.read_blob()?)?);
        }
        records.sort_by_key(|record| record.creation_index);

        self.transaction(|graph| {
            for record in &records {
                graph.create_box(&record.kind, record.uuid, |graph_box| {
                    graph_box.read_fields(record.fields).map_err(GraphError::from)
                })?;
            }
            Ok(())
        })?;
        debug!(target: "boxgraph::graph", boxes = count, "graph loaded");

        if self.config.verify_after_load {
            self.verify_pointers()?;
        }
        Ok(())
    }

    /// Render every box as `{name, uuid, fields}`, in uuid order.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.boxes
                .values()
                .map(|graph_box| {
                    json!({
                        "name": graph_box.kind(),
                        "uuid": graph_box.uuid().to_string(),
                        "fields": graph_box.to_json(),
                    })
                })
                .collect(),
        )
    }

    /// Load [`BoxGraph::to_json`] output into this empty graph. Boxes are
    /// created in listed order inside one transaction. Fails before the
    /// transaction opens if an entry lacks its name or uuid.
    pub fn from_json(&mut self, value: &Value) -> GraphResult<()> {
        if !self.boxes.is_empty() {
            return Err(GraphError::GraphNotEmpty);
        }
        let entries = value
            .as_array()
            .ok_or_else(|| GraphError::Json(format!("expected a list of boxes, found {value}")))?;
        let records = entries
            .iter()
            .map(|entry| {
                let kind = entry["name"].as_str();
                let uuid = entry["uuid"].as_str().and_then(|uuid| Uuid::parse_str(uuid).ok());
                match (kind, uuid) {
                    (Some(kind), Some(uuid)) => Ok((kind, uuid, &entry["fields"])),
                    _ => Err(GraphError::Json(format!("malformed box entry {entry}"))),
                }
            })
            .collect::<GraphResult<Vec<_>>>()?;

        self.transaction(|graph| {
            for (kind, uuid, fields) in &records {
                graph.create_box(kind, *uuid, |graph_box| graph_box.read_json(fields))?;
            }
            Ok(())
        })?;
        debug!(target: "boxgraph::graph", boxes = records.len(), "graph loaded from json");

        if self.config.verify_after_load {
            self.verify_pointers()?;
        }
        Ok(())
    }

    /// Content hash over kind, uuid and field bytes of every box, in uuid
    /// order. Graphs with equal content hash equally regardless of the
    /// order their boxes were created in.
    pub fn checksum(&self) -> Checksum {
        let mut writer = ChecksumWriter::new();
        for graph_box in self.boxes.values() {
            writer.update(graph_box.kind().as_bytes());
            writer.update(graph_box.uuid().as_bytes());
            writer.update(&graph_box.to_bytes());
        }
        writer.finish()
    }
}
