// id.rs — Deterministic identifiers for synthesized nodes and edges
//
// Every node a pass creates is named from the entity it originates from, so
// re-running a pass on the same input yields the same ids and two passes can
// never mint the same key. No counters, no ambient state.
//
// Key space:
//   duplicate  `{node}_{port}_DUPLICATE_{from}_{to}`
//   join       `{node}_{port}_JOIN_{from}_{to}`
//   identity   `id_{node}@{outPort}_to_{node}@{inPort}`
//   consume    `{node}_consume_dummy_{port}`

use crate::graph::{EdgeRoute, NodeId, PortRef};

/// Duplicate node splitting `root` over leaf range `[from, to]`.
pub fn duplicate_id(root: &PortRef, from: usize, to: usize) -> NodeId {
    NodeId(format!(
        "{}_{}_DUPLICATE_{}_{}",
        root.node, root.port, from, to
    ))
}

/// Join node merging leaf range `[from, to]` into `root`.
pub fn join_id(root: &PortRef, from: usize, to: usize) -> NodeId {
    NodeId(format!("{}_{}_JOIN_{}_{}", root.node, root.port, from, to))
}

/// Identity node replacing the self-loop `route`.
pub fn identity_id(route: &EdgeRoute) -> NodeId {
    NodeId(format!("id_{}", edge_name(&route.source, &route.target)))
}

/// Sink attached to the otherwise unconsumed `port`.
pub fn consume_id(port: &PortRef) -> NodeId {
    NodeId(format!("{}_consume_dummy_{}", port.node, port.port))
}

/// Name for an edge created by the boundary rewriter or the drain.
pub fn edge_name(source: &PortRef, target: &PortRef) -> String {
    format!(
        "{}@{}_to_{}@{}",
        source.node, source.port, target.node, target.port
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_and_join_encode_range() {
        let root = PortRef::new("A", "output");
        assert_eq!(duplicate_id(&root, 0, 1).as_str(), "A_output_DUPLICATE_0_1");
        assert_eq!(join_id(&root, 2, 5).as_str(), "A_output_JOIN_2_5");
    }

    #[test]
    fn nested_tree_nodes_extend_parent_id() {
        let root = PortRef::new("A", "output");
        let top = duplicate_id(&root, 0, 2);
        let child = duplicate_id(&PortRef::on(&top, "d1"), 0, 1);
        assert_eq!(child.as_str(), "A_output_DUPLICATE_0_2_d1_DUPLICATE_0_1");
    }

    #[test]
    fn identity_and_consume_names() {
        let route = EdgeRoute {
            source: PortRef::new("X", "a"),
            target: PortRef::new("X", "b"),
        };
        assert_eq!(identity_id(&route).as_str(), "id_X@a_to_X@b");
        assert_eq!(
            consume_id(&PortRef::new("Y", "y")).as_str(),
            "Y_consume_dummy_y"
        );
    }

    #[test]
    fn kinds_do_not_share_keys() {
        let port = PortRef::new("N", "p");
        let route = EdgeRoute {
            source: port.clone(),
            target: port.clone(),
        };
        let ids = [
            duplicate_id(&port, 0, 1),
            join_id(&port, 0, 1),
            identity_id(&route),
            consume_id(&port),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
