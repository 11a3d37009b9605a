//! Unit tests for dataset integrity and change tracking.

use super::*;
use rstest::{fixture, rstest};

fn coord(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

/// Two local nodes joined by one local way, with the tracker reset.
#[fixture]
fn line() -> Dataset {
    let mut dataset = Dataset::new();
    dataset
        .add_node(Node::with_empty_tags(NodeId(-1), coord(0.0, 0.0)))
        .expect("add node");
    dataset
        .add_node(Node::with_empty_tags(NodeId(-2), coord(0.0, 1.0)))
        .expect("add node");
    dataset
        .add_way(Way::with_empty_tags(WayId(-1), vec![NodeId(-1), NodeId(-2)]))
        .expect("add way");
    dataset.snapshot();
    dataset
}

#[rstest]
fn allocation_skips_identifiers_already_in_use(mut line: Dataset) {
    assert_eq!(line.allocate_node_id(), NodeId(-3));
    assert_eq!(line.allocate_way_id(), WayId(-2));
}

#[rstest]
fn ways_must_reference_existing_nodes(mut line: Dataset) {
    let err = line
        .add_way(Way::with_empty_tags(WayId(-2), vec![NodeId(-1), NodeId(-9)]))
        .expect_err("missing node must be rejected");
    assert_eq!(err, DatasetError::MissingNode(NodeId(-9)));
    assert!(!line.is_modified());
}

#[rstest]
fn ways_reject_back_to_back_references(mut line: Dataset) {
    let err = line
        .set_way_nodes(WayId(-1), vec![NodeId(-1), NodeId(-1), NodeId(-2)])
        .expect_err("adjacent duplicate must be rejected");
    assert_eq!(
        err,
        DatasetError::AdjacentDuplicate {
            way: WayId(-1),
            node: NodeId(-1),
        }
    );
}

#[rstest]
fn referenced_nodes_cannot_be_removed(mut line: Dataset) {
    let err = line
        .remove_node(NodeId(-1))
        .expect_err("node is referenced");
    assert_eq!(
        err,
        DatasetError::NodeInUse {
            node: NodeId(-1),
            way: WayId(-1),
        }
    );
    line.remove_way(WayId(-1)).expect("way exists");
    assert!(line.remove_node(NodeId(-1)).expect("unreferenced").is_some());
    assert_eq!(line.referrers(NodeId(-2)).count(), 0);
}

#[rstest]
fn replacing_a_way_updates_referrers(mut line: Dataset) {
    line.add_node(Node::with_empty_tags(NodeId(-3), coord(1.0, 1.0)))
        .expect("add node");
    line.set_way_nodes(WayId(-1), vec![NodeId(-1), NodeId(-3)])
        .expect("valid sequence");
    assert_eq!(line.referrers(NodeId(-2)).count(), 0);
    assert_eq!(line.referrers(NodeId(-3)).collect::<Vec<_>>(), vec![WayId(-1)]);
}

#[rstest]
fn markers_attach_only_to_local_nodes(mut line: Dataset) {
    line.add_node(Node::with_empty_tags(NodeId(5), coord(2.0, 2.0)))
        .expect("add node");
    let marker = ConflationMarker::Duplicate {
        canonical: NodeId(5),
    };
    assert_eq!(
        line.set_marker(NodeId(5), marker),
        Err(DatasetError::MarkerOnPermanent(NodeId(5)))
    );
    assert_eq!(line.set_marker(NodeId(-1), marker), Ok(None));
    assert_eq!(line.marker(NodeId(-1)), Some(&marker));
}

#[rstest]
fn removing_a_node_drops_its_marker(mut line: Dataset) {
    line.add_node(Node::with_empty_tags(NodeId(-3), coord(1.0, 1.0)))
        .expect("add node");
    line.set_marker(
        NodeId(-3),
        ConflationMarker::Duplicate {
            canonical: NodeId(-1),
        },
    )
    .expect("local node");
    line.remove_node(NodeId(-3)).expect("unreferenced");
    assert_eq!(line.markers().count(), 0);
}

#[rstest]
fn tracker_classifies_changes(mut line: Dataset) {
    line.update_tags(PrimitiveId::Way(WayId(-1)), |tags| {
        tags.insert("highway".into(), "track".into());
    })
    .expect("way exists");
    line.add_node(Node::with_empty_tags(NodeId(-3), coord(1.0, 1.0)))
        .expect("add node");
    line.remove_node(NodeId(-3)).expect("unreferenced");

    let changes = line.snapshot();
    assert_eq!(
        changes.modified,
        BTreeSet::from([PrimitiveId::Way(WayId(-1))])
    );
    assert!(changes.added.is_empty());
    assert!(changes.deleted.is_empty());
    assert!(!line.is_modified());
}

#[rstest]
fn unchanged_tags_are_not_recorded(mut line: Dataset) {
    let changed = line
        .update_tags(PrimitiveId::Node(NodeId(-1)), |_| {})
        .expect("node exists");
    assert!(!changed);
    assert!(!line.is_modified());
}

#[rstest]
fn restoring_a_captured_slot_reverts_the_edit(mut line: Dataset) {
    let before = line.capture(SlotKey::Way(WayId(-1)));
    line.remove_way(WayId(-1));
    line.restore(before).expect("nodes still exist");
    assert_eq!(
        line.way(WayId(-1)).map(|way| way.nodes.clone()),
        Some(vec![NodeId(-1), NodeId(-2)])
    );
}

#[rstest]
fn absorb_assigns_fresh_local_identifiers(mut line: Dataset) {
    let other = line.clone();
    let map = line.absorb(other);
    assert_eq!(line.node_count(), 4);
    assert_eq!(line.way_count(), 2);
    let copied = map.ways.get(&WayId(-1)).copied().expect("way mapped");
    let way = line.way(copied).expect("copied way exists");
    assert_eq!(
        way.nodes,
        vec![
            map.nodes[&NodeId(-1)],
            map.nodes[&NodeId(-2)],
        ]
    );
}

#[rstest]
fn absorb_keeps_existing_permanent_primitives() {
    let mut target = Dataset::new();
    let mut tags = Tags::new();
    tags.insert("name".into(), "kept".into());
    target
        .add_node(Node::new(NodeId(7), coord(0.0, 0.0), tags))
        .expect("add node");
    let mut other = Dataset::new();
    other
        .add_node(Node::with_empty_tags(NodeId(7), coord(0.0, 0.0)))
        .expect("add node");
    let map = target.absorb(other);
    assert_eq!(map.nodes[&NodeId(7)], NodeId(7));
    assert_eq!(target.node_count(), 1);
    assert_eq!(
        target.node(NodeId(7)).and_then(|n| n.tags.get("name")).map(String::as_str),
        Some("kept")
    );
}

#[rstest]
fn shared_dataset_allows_scoped_mutation() {
    let shared = SharedDataset::new(Dataset::new());
    let id = shared
        .with(|dataset| {
            let id = dataset.allocate_node_id();
            dataset.put_node(Node::with_empty_tags(id, coord(0.0, 0.0)));
            id
        })
        .expect("lock not poisoned");
    let guard = shared.lock().expect("lock not poisoned");
    assert!(guard.contains_node(id));
}
