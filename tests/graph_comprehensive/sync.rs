//! Mirrors driven over a channel from another thread.

use std::thread;

use boxgraph::*;
use proptest::prelude::*;

use crate::test_utils::*;

struct Mirrored {
    result: SyncResult<usize>,
    checksum: Checksum,
    boxes: usize,
    verified: GraphResult<usize>,
}

fn mirror_on_thread(receiver: crossbeam_channel::Receiver<SyncMessage>) -> thread::JoinHandle<Mirrored> {
    thread::spawn(move || {
        let mut target = SyncTarget::new(graph());
        let result = target.run(&receiver);
        let mirror = target.graph();
        Mirrored {
            result,
            checksum: mirror.checksum(),
            boxes: mirror.box_count(),
            verified: mirror.verify_pointers(),
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn mirror_matches_after_random_edits(
        prefix in edits(10),
        edits in edits(40),
        max_sync_batch in 1usize..4,
    ) {
        let config = GraphConfig {
            max_sync_batch,
            ..GraphConfig::default()
        };
        let mut source_graph = BoxGraph::with_config(catalog(), config);
        let mut session = Session::new();
        session.run(&mut source_graph, &prefix);

        let (transport, receiver) = channel();
        let handle = mirror_on_thread(receiver);
        let source = SyncSource::new(&source_graph, transport, true).unwrap();
        session.run(&mut source_graph, &edits);
        source.send_checksum(&source_graph).unwrap();
        let expected = source_graph.checksum();
        source.terminate();

        let expected_pointers = source_graph.verify_pointers();
        drop(source_graph);

        let mirrored = handle.join().unwrap();
        prop_assert!(mirrored.result.is_ok(), "{:?}", mirrored.result);
        prop_assert_eq!(mirrored.checksum, expected);
        prop_assert_eq!(mirrored.verified, expected_pointers);
        prop_assert_eq!(mirrored.boxes, {
            let mut check = graph();
            Session::new().run(&mut check, &[prefix, edits].concat());
            check.box_count()
        });
    }
}

#[test]
fn mirror_through_encoded_messages() {
    init_tracing();
    let mut source_graph = graph();
    let (transport, receiver) = channel();
    let source = SyncSource::new(&source_graph, transport, false).unwrap();

    source_graph
        .transaction(|graph| {
            graph.create_box("Device", id(1), |_| Ok(()))?;
            graph.create_box("Plugin", id(2), |p| p.refer(&[1], Address::of_box(id(1))))?;
            graph.set_primitive(&at(id(1), &[1]), 0.25f32)
        })
        .unwrap();
    source.send_checksum(&source_graph).unwrap();

    let mut target = SyncTarget::new(graph());
    for message in receiver.try_iter() {
        let decoded = SyncMessage::from_bytes(&message.to_bytes()).unwrap();
        assert_eq!(decoded, message);
        target.handle(decoded).unwrap();
    }
    assert_eq!(target.graph().verify_pointers(), Ok(1));
    assert_eq!(target.graph().checksum(), source_graph.checksum());
}

#[test]
fn mirror_rejects_out_of_order_delete() {
    let mut target = SyncTarget::new(graph());
    target
        .apply(&[
            UpdateTask::New {
                kind: "X".to_string(),
                uuid: id(1),
                bytes: vec![0, 0],
            },
            UpdateTask::New {
                kind: "Y".to_string(),
                uuid: id(2),
                bytes: vec![0, 0],
            },
            UpdateTask::UpdatePointer {
                address: at(id(2), &[1]),
                target: Some(Address::of_box(id(1))),
            },
        ])
        .unwrap();
    let result = target.apply(&[UpdateTask::Delete { uuid: id(1) }]);
    assert!(matches!(
        result,
        Err(SyncError::Graph(GraphError::HasIncomingEdges { .. }))
    ));
    assert_eq!(target.graph().box_count(), 2);
    assert_eq!(target.applied(), 3);
}
