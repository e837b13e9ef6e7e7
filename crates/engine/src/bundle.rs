//! Box bundles: a box plus its dependencies, portable between graphs.
//!
//! ```text
//! string  header   "boxgraph:bundle"
//! i32     version  1
//! record  root
//! i32     dependency count
//! record  dependencies...
//!
//! record := uuid, string kind, i32 length, field bytes
//! ```
//!
//! Importing gives every bundled box a fresh uuid and rewrites pointers
//! between bundled boxes accordingly. Pointers to boxes outside the bundle
//! keep their targets.

use std::collections::BTreeMap;

use boxgraph_core::{Address, ByteInput, ByteOutput, CodecError, Uuid};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::graph::BoxGraph;

/// Bundle header string.
pub const BUNDLE_HEADER: &str = "boxgraph:bundle";

/// Bundle format version.
pub const BUNDLE_VERSION: i32 = 1;

/// Encode the box `uuid` together with its dependencies.
pub fn export_bundle(graph: &BoxGraph, uuid: Uuid) -> GraphResult<Vec<u8>> {
    let dependencies = graph.dependencies_of(uuid)?;
    let mut output = ByteOutput::new();
    output.write_string(BUNDLE_HEADER);
    output.write_i32(BUNDLE_VERSION);
    write_record(graph, uuid, &mut output)?;
    output.write_i32(dependencies.boxes.len() as i32);
    for dependency in &dependencies.boxes {
        write_record(graph, *dependency, &mut output)?;
    }
    debug!(
        target: "boxgraph::bundle",
        %uuid,
        dependencies = dependencies.boxes.len(),
        bytes = output.len(),
        "bundle exported"
    );
    Ok(output.into_bytes())
}

fn write_record(graph: &BoxGraph, uuid: Uuid, output: &mut ByteOutput) -> GraphResult<()> {
    let graph_box = graph.find_box(uuid).ok_or(GraphError::BoxNotFound(uuid))?;
    output.write_uuid(&uuid);
    output.write_string(graph_box.kind());
    output.write_blob(&graph_box.to_bytes());
    Ok(())
}

/// Create the bundled boxes in `graph` under fresh uuids. Must be called
/// inside a transaction. Returns the new uuid of the root box.
pub fn import_bundle(graph: &mut BoxGraph, bytes: &[u8]) -> GraphResult<Uuid> {
    import_bundle_preserving(graph, bytes, &[])
}

/// Like [`import_bundle`], but boxes whose kind is listed in `shared_kinds`
/// keep their uuid and are reused if the graph already holds them.
pub fn import_bundle_preserving(
    graph: &mut BoxGraph,
    bytes: &[u8],
    shared_kinds: &[&str],
) -> GraphResult<Uuid> {
    let mut input = ByteInput::new(bytes);
    let header = input.read_string()?;
    if header != BUNDLE_HEADER {
        return Err(CodecError::HeaderMismatch {
            expected: BUNDLE_HEADER.to_string(),
            found: header,
        }
        .into());
    }
    let version = input.read_i32()?;
    if version != BUNDLE_VERSION {
        return Err(CodecError::VersionMismatch {
            expected: BUNDLE_VERSION,
            found: version,
        }
        .into());
    }

    let root = RawRecord::read(&mut input)?;
    let root_source = root.uuid;
    let mut records = vec![root];
    let count = input.read_len()?;
    for _ in 0..count {
        records.push(RawRecord::read(&mut input)?);
    }

    let mapping: BTreeMap<Uuid, Uuid> = records
        .iter()
        .map(|record| {
            let target = if shared_kinds.contains(&record.kind.as_str()) {
                record.uuid
            } else {
                Uuid::new_v4()
            };
            (record.uuid, target)
        })
        .collect();
    let remap = |address: &Address| match mapping.get(&address.uuid()) {
        Some(uuid) => address.move_to(*uuid),
        None => address.clone(),
    };

    for record in &records {
        let uuid = mapping.get(&record.uuid).copied().unwrap_or(record.uuid);
        if uuid == record.uuid && graph.find_box(uuid).is_some() {
            continue;
        }
        graph.create_box(&record.kind, uuid, |graph_box| {
            graph_box
                .read_fields_remapped(record.fields, &remap)
                .map_err(GraphError::from)
        })?;
    }
    let root = mapping.get(&root_source).copied().unwrap_or(root_source);
    debug!(target: "boxgraph::bundle", %root, boxes = records.len(), "bundle imported");
    Ok(root)
}

struct RawRecord<'a> {
    uuid: Uuid,
    kind: String,
    fields: &'a [u8],
}

impl<'a> RawRecord<'a> {
    fn read(input: &mut ByteInput<'a>) -> GraphResult<Self> {
        Ok(Self {
            uuid: input.read_uuid()?,
            kind: input.read_string()?,
            fields: input.read_blob()?,
        })
    }
}
