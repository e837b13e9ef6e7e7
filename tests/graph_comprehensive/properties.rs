//! Graph-wide properties over random edit sequences.

use std::sync::Arc;

use boxgraph::*;
use parking_lot::Mutex;
use proptest::prelude::*;

use crate::test_utils::*;

fn build(edits: &[Edit]) -> BoxGraph {
    let mut graph = graph();
    Session::new().run(&mut graph, edits);
    graph
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn snapshot_round_trip(edits in edits(40)) {
        let graph = build(&edits);
        let mut copy = super::test_utils::graph();
        copy.from_bytes(&graph.to_bytes()).unwrap();

        prop_assert_eq!(copy.box_count(), graph.box_count());
        prop_assert_eq!(copy.checksum(), graph.checksum());
        for graph_box in graph.boxes() {
            let mirrored = copy.find_box(graph_box.uuid()).unwrap();
            prop_assert_eq!(mirrored.to_bytes(), graph_box.to_bytes());
        }
        let creation_order = |graph: &BoxGraph| {
            let mut boxes: Vec<_> = graph.boxes().collect();
            boxes.sort_by_key(|graph_box| graph_box.creation_index());
            boxes.iter().map(|graph_box| graph_box.uuid()).collect::<Vec<_>>()
        };
        prop_assert_eq!(creation_order(&copy), creation_order(&graph));
        let edges: Vec<_> = graph.edges().edges().collect();
        let mirrored: Vec<_> = copy.edges().edges().collect();
        prop_assert_eq!(mirrored, edges);
    }

    #[test]
    fn every_step_inverts(edits in edits(30)) {
        let mut graph = graph();
        let mut session = Session::new();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        let _recording = graph.subscribe_to_all_updates_immediate(move |update: &Update| {
            sink.lock().push(update.clone());
        });

        for edit in &edits {
            let before = graph.checksum();
            graph.transaction(|graph| session.apply(graph, edit)).unwrap();
            let after = graph.checksum();
            let step = std::mem::take(&mut *recorded.lock());

            graph
                .transaction(|graph| step.iter().rev().try_for_each(|update| update.inverse(graph)))
                .unwrap();
            prop_assert_eq!(graph.checksum(), before);
            graph
                .transaction(|graph| step.iter().try_for_each(|update| update.forward(graph)))
                .unwrap();
            prop_assert_eq!(graph.checksum(), after);
            recorded.lock().clear();
        }
        assert_edges_consistent(&graph);
    }

    #[test]
    fn edge_index_stays_consistent(edits in edits(60)) {
        let graph = build(&edits);
        assert_edges_consistent(&graph);
        prop_assert!(graph.verify_pointers().is_ok());
    }

    #[test]
    fn unstage_with_edges_fails_cleanly(edits in edits(40)) {
        let mut graph = build(&edits);
        let checksum = graph.checksum();
        let connected: Vec<Uuid> = graph
            .boxes()
            .map(|graph_box| graph_box.uuid())
            .filter(|uuid| {
                !graph.edges().outgoing_edges_of(*uuid).is_empty()
                    || !graph.edges().incoming_edges_of(&Address::of_box(*uuid)).is_empty()
            })
            .collect();

        graph.begin_transaction().unwrap();
        for uuid in connected {
            let result = graph.unstage_box(uuid);
            let rejected = matches!(
                result,
                Err(GraphError::HasOutgoingEdges { .. }) | Err(GraphError::HasIncomingEdges { .. })
            );
            prop_assert!(rejected);
        }
        graph.end_transaction().unwrap();
        prop_assert_eq!(graph.checksum(), checksum);
        assert_edges_consistent(&graph);
    }

    #[test]
    fn checksum_ignores_creation_order(edits in edits(30)) {
        let graph = build(&edits);
        let mut boxes: Vec<&GraphBox> = graph.boxes().collect();
        boxes.reverse();

        let mut reordered = super::test_utils::graph();
        reordered
            .transaction(|target| {
                for graph_box in &boxes {
                    let bytes = graph_box.to_bytes();
                    target.create_box(graph_box.kind(), graph_box.uuid(), |copy| {
                        copy.read_fields(&bytes).map_err(GraphError::from)
                    })?;
                }
                Ok(())
            })
            .unwrap();
        prop_assert_eq!(reordered.checksum(), graph.checksum());
    }
}

#[test]
fn deferred_pointer_notifies_once() {
    init_tracing();
    let mut graph = graph();
    let pointers = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&pointers);
    let _s = graph.subscribe_to_all_updates(move |update: &Update| {
        if let Update::Pointer(update) = update {
            sink.lock().push(update.clone());
        }
    });

    graph
        .transaction(|graph| {
            graph.create_box("Y", id(1), |y| y.refer(&[1], Address::of_box(id(2))))?;
            graph.create_box("X", id(2), |_| Ok(()))?;
            Ok(())
        })
        .unwrap();

    let pointers = pointers.lock();
    assert_eq!(pointers.len(), 1);
    assert_eq!(pointers[0].address(), &at(id(1), &[1]));
    assert_eq!(pointers[0].new_address(), Some(&Address::of_box(id(2))));
    let y = graph.find_box(id(1)).unwrap();
    assert_eq!(y.pointer(&[1]).unwrap().resolved_target(), Some(&Address::of_box(id(2))));
}

#[test]
fn checksum_detects_each_kind_of_change() {
    let edits = [Edit::AddTrack, Edit::AddBus, Edit::Route(0, Some(1))];
    let base = build(&edits);
    let checksum = base.checksum();
    assert_eq!(build(&edits).checksum(), checksum);

    let mut renamed = build(&edits);
    renamed
        .transaction(|graph| graph.set_primitive(&at(id(1), &[1]), "lead"))
        .unwrap();
    assert_ne!(renamed.checksum(), checksum);

    let mut rerouted = build(&edits);
    rerouted
        .transaction(|graph| graph.set_pointer(&at(id(1), &[3]), None))
        .unwrap();
    assert_ne!(rerouted.checksum(), checksum);

    let extended = build(&[Edit::AddTrack, Edit::AddBus, Edit::Route(0, Some(1)), Edit::AddBus]);
    assert_ne!(extended.checksum(), checksum);
}
