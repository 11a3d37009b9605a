//! Small datasets shared by the unit tests.

use conflux_core::{ConflationMarker, Dataset, Node, NodeId, Tags, Way, WayId};
use geo::Coord;

pub(crate) fn c(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

pub(crate) fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

/// `w1 = [n1, n2]` along the equator with candidate `n-3` at its midpoint,
/// marked to connect between the two.
pub(crate) fn street() -> Dataset {
    let mut dataset = Dataset::new();
    for node in [
        Node::with_empty_tags(NodeId(1), c(0.0, 0.0)),
        Node::with_empty_tags(NodeId(2), c(1.0, 0.0)),
        Node::with_empty_tags(NodeId(-3), c(0.5, 0.0)),
    ] {
        dataset.add_node(node).expect("add node");
    }
    dataset
        .add_way(Way::new(
            WayId(1),
            vec![NodeId(1), NodeId(2)],
            tags(&[("highway", "residential")]),
        ))
        .expect("add way");
    dataset
        .set_marker(
            NodeId(-3),
            ConflationMarker::Connect {
                way: WayId(1),
                first: NodeId(1),
                second: NodeId(2),
            },
        )
        .expect("mark candidate");
    dataset.snapshot();
    dataset
}

/// [`street`] plus candidate `n-4` a metre east of `n1`, marked as its
/// duplicate and carrying tags of its own.
pub(crate) fn with_duplicate() -> Dataset {
    let mut dataset = street();
    dataset
        .update_tags(NodeId(1).into(), |t| {
            t.insert("highway".to_owned(), "traffic_signals".to_owned());
        })
        .expect("tag canonical");
    dataset
        .add_node(Node::new(
            NodeId(-4),
            c(0.00001, 0.0),
            tags(&[("highway", "crossing"), ("crossing", "zebra")]),
        ))
        .expect("add duplicate");
    dataset
        .set_marker(
            NodeId(-4),
            ConflationMarker::Duplicate {
                canonical: NodeId(1),
            },
        )
        .expect("mark duplicate");
    dataset.snapshot();
    dataset
}
