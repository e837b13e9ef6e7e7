//! Moving boxes with their dependencies between graphs.

use boxgraph::*;

use crate::test_utils::*;

/// Plugin 2 hosted by device 1, routed track 3 -> bus 4.
fn studio() -> BoxGraph {
    let mut graph = graph();
    graph
        .transaction(|graph| {
            graph.create_box("Device", id(1), |d| d.set_primitive(&[1], 0.5f32))?;
            graph.create_box("Plugin", id(2), |p| {
                p.refer(&[1], Address::of_box(id(1)))?;
                p.set_primitive(&[2], true)
            })?;
            graph.create_box("Bus", id(4), |_| Ok(()))?;
            graph.create_box("Track", id(3), |t| t.refer(&[3], Address::of_box(id(4))))?;
            Ok(())
        })
        .unwrap();
    graph
}

#[test]
fn plugin_travels_with_its_device() {
    let source = studio();
    let bytes = export_bundle(&source, id(2)).unwrap();

    let mut target = graph();
    let plugin = target.transaction(|graph| import_bundle(graph, &bytes)).unwrap();
    assert_eq!(target.box_count(), 2);
    let host = target.pointer_target(&at(plugin, &[1])).cloned().unwrap();
    assert_eq!(target.find_box(host.uuid()).unwrap().kind(), "Device");
    assert_eq!(
        target.primitive_value(&at(host.uuid(), &[1])),
        Some(&PrimitiveValue::Float32(0.5))
    );
    assert_eq!(
        target.primitive_value(&at(plugin, &[2])),
        Some(&PrimitiveValue::Boolean(true))
    );
    assert_eq!(target.verify_pointers(), Ok(1));
}

#[test]
fn external_targets_are_kept() {
    let mut graph = studio();
    let bytes = export_bundle(&graph, id(3)).unwrap();
    let copy = graph.transaction(|graph| import_bundle(graph, &bytes)).unwrap();

    assert_ne!(copy, id(3));
    assert_eq!(graph.pointer_target(&at(copy, &[3])), Some(&Address::of_box(id(4))));
    assert_eq!(graph.edges().incoming_edges_of(&Address::of_box(id(4))).len(), 2);
    assert_edges_consistent(&graph);
}

#[test]
fn import_can_be_undone() {
    let source = studio();
    let bytes = export_bundle(&source, id(2)).unwrap();

    let mut target = graph();
    let mut editing = Editing::new(&target);
    editing
        .modify(&mut target, |graph| import_bundle(graph, &bytes))
        .unwrap();
    assert_eq!(target.box_count(), 2);
    editing.undo(&mut target).unwrap();
    assert_eq!(target.box_count(), 0);
    assert!(target.edges().is_empty());
}

#[test]
fn import_requires_a_transaction() {
    let source = studio();
    let bytes = export_bundle(&source, id(2)).unwrap();
    let mut target = graph();
    assert_eq!(import_bundle(&mut target, &bytes), Err(GraphError::NoTransaction));
}

#[test]
fn export_of_missing_box_fails() {
    let source = studio();
    assert_eq!(export_bundle(&source, id(99)), Err(GraphError::BoxNotFound(id(99))));
}
