//! History stepping through `Editing`.

use boxgraph::*;
use proptest::prelude::*;

use crate::test_utils::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn undo_all_then_redo_all(edits in edits(30)) {
        let mut graph = graph();
        let mut editing = Editing::new(&graph);
        let mut session = Session::new();

        let mut checksums = vec![graph.checksum()];
        for edit in &edits {
            editing.modify(&mut graph, |graph| session.apply(graph, edit)).unwrap();
            let checksum = graph.checksum();
            if checksum != *checksums.last().unwrap() {
                checksums.push(checksum);
            }
        }
        prop_assert_eq!(editing.len(), checksums.len() - 1);

        for expected in checksums.iter().rev().skip(1) {
            prop_assert!(editing.undo(&mut graph).unwrap());
            prop_assert_eq!(graph.checksum(), *expected);
            assert_edges_consistent(&graph);
        }
        prop_assert!(!editing.can_undo());
        prop_assert_eq!(graph.box_count(), 0);

        for expected in checksums.iter().skip(1) {
            prop_assert!(editing.redo(&mut graph).unwrap());
            prop_assert_eq!(graph.checksum(), *expected);
        }
        prop_assert!(!editing.can_redo());
        prop_assert!(graph.verify_pointers().is_ok());
    }
}

#[test]
fn undo_step_with_boxes_pointing_at_each_other() {
    let mut graph = graph();
    let mut editing = Editing::new(&graph);
    editing
        .modify(&mut graph, |graph| {
            graph.create_box("Track", id(1), |t| t.refer(&[3], Address::of_box(id(2))))?;
            graph.create_box("Track", id(2), |t| t.refer(&[3], Address::of_box(id(1))))?;
            graph.set_primitive(&at(id(1), &[1]), "drums")
        })
        .unwrap();

    editing.undo(&mut graph).unwrap();
    assert_eq!(graph.box_count(), 0);
    assert!(graph.edges().is_empty());

    editing.redo(&mut graph).unwrap();
    assert_eq!(graph.pointer_target(&at(id(2), &[3])), Some(&Address::of_box(id(1))));
    assert_eq!(
        graph.primitive_value(&at(id(1), &[1])),
        Some(&PrimitiveValue::from("drums"))
    );
    assert_eq!(graph.verify_pointers(), Ok(2));
}

#[test]
fn terminated_history_stops_recording() {
    let mut graph = graph();
    let mut editing = Editing::new(&graph);
    editing
        .modify(&mut graph, |graph| graph.create_box("Bus", id(1), |_| Ok(())))
        .unwrap();
    editing.clear();
    assert!(editing.is_empty());
    assert!(!editing.undo(&mut graph).unwrap());
    editing.terminate();

    graph
        .transaction(|graph| graph.set_primitive(&at(id(1), &[1]), "fx"))
        .unwrap();
    assert_eq!(graph.box_count(), 1);
}
