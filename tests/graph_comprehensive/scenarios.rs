//! Fixed walkthroughs.

use std::sync::Arc;

use boxgraph::*;
use parking_lot::Mutex;

use crate::test_utils::*;

#[test]
fn pointer_lifecycle_between_two_boxes() {
    init_tracing();
    let (a, b) = (id(1), id(2));
    let mut graph = graph();
    graph
        .transaction(|graph| {
            graph.create_box("X", a, |_| Ok(()))?;
            graph.create_box("Y", b, |y| y.refer(&[1], Address::of_box(a)))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(graph.edges().incoming_edges_of(&Address::of_box(a)), vec![at(b, &[1])]);

    // a first: b.ref still points at it
    let result = graph.transaction(|graph| graph.unstage_box(a).map(|_| ()));
    assert!(matches!(result, Err(GraphError::HasIncomingEdges { .. })));
    assert_eq!(graph.box_count(), 2);

    // b first: its own pointer must go before the box can
    let result = graph.transaction(|graph| graph.unstage_box(b).map(|_| ()));
    assert!(matches!(result, Err(GraphError::HasOutgoingEdges { .. })));

    graph
        .transaction(|graph| {
            graph.set_pointer(&at(b, &[1]), None)?;
            graph.unstage_box(b)?;
            graph.unstage_box(a)?;
            Ok(())
        })
        .unwrap();
    assert_eq!(graph.box_count(), 0);
    assert!(graph.edges().is_empty());
}

#[test]
fn reload_follows_creation_order() {
    let (first, referrer, last) = (id(30), id(10), id(20));
    let mut graph = graph();
    graph
        .transaction(|graph| {
            graph.create_box("X", first, |_| Ok(()))?;
            graph.create_box("Y", referrer, |y| y.refer(&[1], Address::of_box(first)))?;
            graph.create_box("X", last, |_| Ok(()))?;
            Ok(())
        })
        .unwrap();
    let bytes = graph.to_bytes();

    let mut copy = super::test_utils::graph();
    let created = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&created);
    let _s = copy.subscribe_to_all_updates_immediate(move |update: &Update| {
        if let Update::New(update) = update {
            sink.lock().push(update.uuid());
        }
    });
    copy.from_bytes(&bytes).unwrap();

    assert_eq!(*created.lock(), vec![first, referrer, last]);
    assert_eq!(copy.verify_pointers(), Ok(1));
    assert_eq!(
        copy.find_box(referrer).unwrap().pointer(&[1]).unwrap().resolved_target(),
        Some(&Address::of_box(first))
    );
}

#[test]
fn mandatory_edges_are_enforced_by_verification() {
    let (device, plugin) = (id(1), id(2));
    let mut graph = graph();
    graph
        .transaction(|graph| {
            graph.create_box("Device", device, |_| Ok(()))?;
            graph.create_box("Plugin", plugin, |p| p.refer(&[1], Address::of_box(device)))?;
            Ok(())
        })
        .unwrap();
    assert_eq!(graph.verify_pointers(), Ok(1));
    assert_eq!(graph.edges().requirement_counts(), (1, 1));

    graph
        .transaction(|graph| graph.set_pointer(&at(plugin, &[1]), None))
        .unwrap();
    assert_eq!(graph.verify_pointers(), Err(GraphError::MissingTarget(at(plugin, &[1]))));

    let deleted = graph.transaction(|graph| graph.delete_box(plugin)).unwrap();
    assert_eq!(deleted, vec![plugin]);
    assert_eq!(graph.verify_pointers(), Err(GraphError::MissingIncoming(Address::of_box(device))));

    let deleted = graph.transaction(|graph| graph.delete_box(device)).unwrap();
    assert_eq!(deleted, vec![device]);
    assert_eq!(graph.edges().requirement_counts(), (0, 0));
    assert_eq!(graph.verify_pointers(), Ok(0));
}

#[test]
fn snapshot_with_broken_requirement_fails_verification() {
    let mut graph = graph();
    graph
        .transaction(|graph| graph.create_box("Device", id(1), |_| Ok(())).map(|_| ()))
        .unwrap();
    let bytes = graph.to_bytes();

    let mut strict = super::test_utils::graph();
    assert_eq!(
        strict.from_bytes(&bytes),
        Err(GraphError::MissingIncoming(Address::of_box(id(1))))
    );

    let config = GraphConfig::from_toml_str("verify_after_load = false").unwrap();
    let mut lenient = BoxGraph::with_config(catalog(), config);
    lenient.from_bytes(&bytes).unwrap();
    assert_eq!(lenient.box_count(), 1);
}

#[test]
fn observers_can_react_with_their_own_transaction() {
    let mut graph = graph();
    graph
        .transaction(|graph| {
            graph.create_box("Track", id(1), |_| Ok(()))?;
            graph.subscribe_end_transaction(|graph| {
                let result = graph.transaction(|graph| {
                    graph.create_box("Bus", id(2), |_| Ok(()))?;
                    graph.set_pointer(&at(id(1), &[3]), Some(Address::of_box(id(2))))
                });
                assert!(result.is_ok());
            });
            Ok(())
        })
        .unwrap();
    assert_eq!(graph.box_count(), 2);
    assert_eq!(graph.pointer_target(&at(id(1), &[3])), Some(&Address::of_box(id(2))));
}

#[test]
fn array_elements_are_addressable() {
    let mut graph = graph();
    graph
        .transaction(|graph| {
            graph.create_box("Bus", id(1), |_| Ok(()))?;
            graph.create_box("Track", id(2), |track| {
                track.refer(&[4, 1], Address::of_box(id(1)))
            })?;
            Ok(())
        })
        .unwrap();
    assert_eq!(graph.debug_path(&at(id(2), &[4, 1])).as_deref(), Some("Track/sends/1"));
    assert_eq!(graph.pointer_target(&at(id(2), &[4, 0])), None);
    assert_eq!(graph.pointer_target(&at(id(2), &[4, 1])), Some(&Address::of_box(id(1))));
    assert!(graph.find_vertex(&at(id(2), &[4, SEND_SLOTS])).is_none());
}
