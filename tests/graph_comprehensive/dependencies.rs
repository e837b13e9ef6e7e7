//! Dependency tracing over shared (diamond) mandatory targets.
//!
//! Plugins hold a mandatory pointer to a device; a device requires at least
//! one plugin. A device shared by several plugins must survive the
//! deletion of any one of them, and deleting a device takes all of its
//! plugins along.

use std::collections::BTreeSet;

use boxgraph::*;
use proptest::prelude::*;

use crate::test_utils::*;

struct Rack {
    devices: Vec<Uuid>,
    plugins: Vec<(Uuid, Uuid)>,
}

impl Rack {
    fn plugins_of(&self, device: Uuid) -> BTreeSet<Uuid> {
        self.plugins
            .iter()
            .filter(|(_, host)| *host == device)
            .map(|(plugin, _)| *plugin)
            .collect()
    }
}

/// One plugin per device plus `extra` plugins hosted by `extra[i] % devices`.
fn rack(graph: &mut BoxGraph, devices: usize, extra: &[usize]) -> Rack {
    let devices: Vec<Uuid> = (0..devices).map(|n| id(100 + n as u128)).collect();
    let hosts = (0..devices.len()).chain(extra.iter().map(|n| n % devices.len()));
    let plugins: Vec<(Uuid, Uuid)> = hosts
        .enumerate()
        .map(|(n, host)| (id(1000 + n as u128), devices[host]))
        .collect();

    graph
        .transaction(|graph| {
            // plugins first, so every host pointer is resolved at the end
            for (plugin, host) in &plugins {
                graph.create_box("Plugin", *plugin, |p| p.refer(&[1], Address::of_box(*host)))?;
            }
            for device in &devices {
                graph.create_box("Device", *device, |_| Ok(()))?;
            }
            Ok(())
        })
        .unwrap();
    Rack { devices, plugins }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn device_takes_its_plugins_along(
        devices in 1usize..5,
        extra in prop::collection::vec(any::<usize>(), 0..10),
        pick in any::<usize>(),
    ) {
        let mut graph = graph();
        let rack = rack(&mut graph, devices, &extra);
        prop_assert!(graph.verify_pointers().is_ok());

        let device = rack.devices[pick % rack.devices.len()];
        let dependencies = graph.dependencies_of(device).unwrap();
        let boxes: BTreeSet<Uuid> = dependencies.boxes.iter().copied().collect();
        prop_assert_eq!(boxes.len(), dependencies.boxes.len());
        prop_assert_eq!(&boxes, &rack.plugins_of(device));
        prop_assert_eq!(dependencies.pointers.len(), boxes.len());

        graph.transaction(|graph| graph.delete_box(device)).unwrap();
        prop_assert!(graph.find_box(device).is_none());
        prop_assert!(graph.verify_pointers().is_ok());
        assert_edges_consistent(&graph);
    }

    #[test]
    fn shared_device_survives_one_plugin(
        devices in 1usize..5,
        extra in prop::collection::vec(any::<usize>(), 0..10),
        pick in any::<usize>(),
    ) {
        let mut graph = graph();
        let rack = rack(&mut graph, devices, &extra);

        let (plugin, host) = rack.plugins[pick % rack.plugins.len()];
        let siblings = rack.plugins_of(host);
        let dependencies = graph.dependencies_of(plugin).unwrap();
        if siblings.len() == 1 {
            prop_assert_eq!(&dependencies.boxes, &vec![host]);
        } else {
            prop_assert!(dependencies.boxes.is_empty());
        }
        prop_assert_eq!(&dependencies.pointers, &vec![at(plugin, &[1])]);

        let deleted = graph.transaction(|graph| graph.delete_box(plugin)).unwrap();
        prop_assert_eq!(deleted.len(), dependencies.boxes.len() + 1);
        prop_assert_eq!(graph.find_box(host).is_some(), siblings.len() > 1);
        prop_assert!(graph.verify_pointers().is_ok());
    }
}

#[test]
fn optional_referrers_are_detached_not_deleted() {
    let mut graph = graph();
    graph
        .transaction(|graph| {
            graph.create_box("Bus", id(1), |_| Ok(()))?;
            graph.create_box("Track", id(2), |t| t.refer(&[3], Address::of_box(id(1))))?;
            graph.create_box("Track", id(3), |t| t.refer(&[4, 0], Address::of_box(id(1))))?;
            Ok(())
        })
        .unwrap();

    let dependencies = graph.dependencies_of(id(1)).unwrap();
    assert!(dependencies.boxes.is_empty());
    assert_eq!(
        dependencies.pointers.iter().collect::<BTreeSet<_>>(),
        [at(id(2), &[3]), at(id(3), &[4, 0])]
            .iter()
            .collect::<BTreeSet<_>>()
    );

    graph.transaction(|graph| graph.delete_box(id(1))).unwrap();
    assert_eq!(graph.box_count(), 2);
    assert_eq!(graph.pointer_target(&at(id(2), &[3])), None);
    assert_eq!(graph.pointer_target(&at(id(3), &[4, 0])), None);
}

#[test]
fn debug_output_covers_every_box() {
    init_tracing();
    let mut graph = graph();
    rack(&mut graph, 2, &[0, 0, 1]);
    graph.debug_boxes();
    graph.debug_dependencies();
    assert_eq!(graph.box_count(), 7);
}
