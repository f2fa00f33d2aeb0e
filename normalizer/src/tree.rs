// tree.rs — Duplicate-tree and join-tree synthesis
//
// Replaces one port with N peers by a balanced binary tree of two-way
// primitives: duplicates fan one source out to N sinks, joins fan N sources
// in to one sink. The recursion splits the leaf range `[from, to]` at
// `floor((from + to) / 2)`; leaf order is the order of the peer list, and
// every tree node lands in the root's scope.
//
// Preconditions: the peer list is non-empty.
// Postconditions: N leaves, N - 1 tree nodes, depth ceil(log2 N).
// Failure modes: empty peer list → E0100; placement anchors missing → E0101.
// Side effects: none (returns fresh nodes and edges).

use crate::diag::{codes, Diagnostic};
use crate::graph::{Edge, Node, NodeId, PortGraph, PortRef, PortType};
use crate::id;
use crate::primitives;

/// Nodes and edges synthesized for one bundle, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Synthesized {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Synthesized {
    fn direct(edge: Edge) -> Self {
        Synthesized {
            nodes: Vec::new(),
            edges: vec![edge],
        }
    }

    pub fn append(&mut self, other: Synthesized) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }
}

/// The port a tree hangs from, its type, and the scope tree nodes go into.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRoot {
    pub port: PortRef,
    pub port_type: PortType,
    pub parent: Option<NodeId>,
}

impl TreeRoot {
    /// Subtree root at `port` of the tree node `node`, same type and scope.
    fn branch(&self, node: &NodeId, port: &str) -> TreeRoot {
        TreeRoot {
            port: PortRef::on(node, port),
            port_type: self.port_type.clone(),
            parent: self.parent.clone(),
        }
    }
}

/// Scope for the root of a tree anchored at `anchor` whose last peer is on
/// `last`.
///
/// Same parent → that parent. `last` is the anchor's parent → `last`.
/// Otherwise the anchor itself (the peers live inside it).
pub fn root_scope(
    graph: &PortGraph,
    anchor: &NodeId,
    last: &NodeId,
) -> Result<Option<NodeId>, Diagnostic> {
    for node in [anchor, last] {
        if !graph.contains_node(node) {
            return Err(Diagnostic::error(
                codes::E0101,
                format!("cannot place tree: node '{}' is not in the graph", node),
            )
            .at_node(node));
        }
    }
    let anchor_parent = graph.parent(anchor);
    if anchor_parent == graph.parent(last) {
        Ok(anchor_parent.cloned())
    } else if anchor_parent == Some(last) {
        Ok(Some(last.clone()))
    } else {
        Ok(Some(anchor.clone()))
    }
}

/// Route `root` to every port in `sinks`.
pub fn duplicate_tree(root: &TreeRoot, sinks: &[PortRef]) -> Result<Synthesized, Diagnostic> {
    if sinks.is_empty() {
        return Err(empty_bundle(&root.port, "successors"));
    }
    Ok(duplicate_range(root, sinks, 0, sinks.len() - 1))
}

/// Route every port in `sources` to `root`.
pub fn join_tree(root: &TreeRoot, sources: &[PortRef]) -> Result<Synthesized, Diagnostic> {
    if sources.is_empty() {
        return Err(empty_bundle(&root.port, "predecessors"));
    }
    Ok(join_range(root, sources, 0, sources.len() - 1))
}

fn empty_bundle(port: &PortRef, what: &str) -> Diagnostic {
    Diagnostic::error(
        codes::E0100,
        format!("fan bundle at {} has no {}", port, what),
    )
    .at_port(&port.node, &port.port)
    .with_hint("fan detection and tree synthesis disagree about this port")
}

fn duplicate_range(root: &TreeRoot, sinks: &[PortRef], from: usize, to: usize) -> Synthesized {
    if from == to {
        return Synthesized::direct(Edge::between(&root.port, &sinks[from]));
    }
    let dup_id = id::duplicate_id(&root.port, from, to);
    let dup = primitives::duplicate(dup_id.clone(), &root.port_type, root.parent.clone());
    let input = PortRef::on(&dup_id, "in");

    if to - from == 1 {
        return Synthesized {
            nodes: vec![dup],
            edges: vec![
                Edge::between(&PortRef::on(&dup_id, "d1"), &sinks[from]),
                Edge::between(&PortRef::on(&dup_id, "d2"), &sinks[to]),
                Edge::between(&root.port, &input),
            ],
        };
    }

    let mid = (from + to) / 2;
    let left = duplicate_range(&root.branch(&dup_id, "d1"), sinks, from, mid);
    let right = duplicate_range(&root.branch(&dup_id, "d2"), sinks, mid + 1, to);

    let mut out = Synthesized {
        nodes: vec![dup],
        edges: Vec::new(),
    };
    out.nodes.extend(left.nodes);
    out.nodes.extend(right.nodes);
    out.edges.extend(left.edges);
    out.edges.extend(right.edges);
    out.edges.push(Edge::between(&root.port, &input));
    out
}

fn join_range(root: &TreeRoot, sources: &[PortRef], from: usize, to: usize) -> Synthesized {
    if from == to {
        return Synthesized::direct(Edge::between(&sources[from], &root.port));
    }
    let join_id = id::join_id(&root.port, from, to);
    let join = primitives::join(join_id.clone(), &root.port_type, root.parent.clone());
    let output = PortRef::on(&join_id, "to");

    if to - from == 1 {
        return Synthesized {
            nodes: vec![join],
            edges: vec![
                Edge::between(&sources[from], &PortRef::on(&join_id, "in1")),
                Edge::between(&sources[to], &PortRef::on(&join_id, "in2")),
                Edge::between(&output, &root.port),
            ],
        };
    }

    let mid = (from + to) / 2;
    let left = join_range(&root.branch(&join_id, "in1"), sources, from, mid);
    let right = join_range(&root.branch(&join_id, "in2"), sources, mid + 1, to);

    let mut out = Synthesized {
        nodes: vec![join],
        edges: Vec::new(),
    };
    out.nodes.extend(left.nodes);
    out.nodes.extend(right.nodes);
    out.edges.extend(left.edges);
    out.edges.extend(right.edges);
    out.edges.push(Edge::between(&output, &root.port));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeValue;
    use crate::primitives::{DUPLICATE, JOIN};
    use std::collections::HashMap;

    fn root(port_type: &str) -> TreeRoot {
        TreeRoot {
            port: PortRef::new("A", "output"),
            port_type: PortType::named(port_type),
            parent: None,
        }
    }

    fn peers(n: usize) -> Vec<PortRef> {
        (0..n).map(|i| PortRef::new(format!("S{i}"), "in")).collect()
    }

    /// Longest chain of tree nodes from the root port down to any leaf.
    fn depth(tree: &Synthesized, start: &PortRef) -> usize {
        let mut by_source: HashMap<&NodeId, Vec<&Edge>> = HashMap::new();
        for e in &tree.edges {
            by_source.entry(&e.source).or_default().push(e);
        }
        fn walk(node: &NodeId, by_source: &HashMap<&NodeId, Vec<&Edge>>) -> usize {
            match by_source.get(node) {
                None => 0,
                Some(edges) => {
                    1 + edges
                        .iter()
                        .map(|e| walk(&e.target, by_source))
                        .max()
                        .unwrap_or(0)
                }
            }
        }
        walk(&start.node, &by_source) - 1
    }

    #[test]
    fn two_sinks_make_one_duplicate() {
        let tree = duplicate_tree(&root("number"), &peers(2)).unwrap();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].id.as_str(), "A_output_DUPLICATE_0_1");
        let routes: Vec<String> = tree.edges.iter().map(|e| e.route().to_string()).collect();
        assert_eq!(
            routes,
            vec![
                "A_output_DUPLICATE_0_1:d1 -> S0:in",
                "A_output_DUPLICATE_0_1:d2 -> S1:in",
                "A:output -> A_output_DUPLICATE_0_1:in",
            ]
        );
    }

    #[test]
    fn three_sinks_split_left_heavy() {
        let tree = duplicate_tree(&root("number"), &peers(3)).unwrap();
        let ids: Vec<&str> = tree.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["A_output_DUPLICATE_0_2", "A_output_DUPLICATE_0_2_d1_DUPLICATE_0_1"]
        );
        let routes: Vec<String> = tree.edges.iter().map(|e| e.route().to_string()).collect();
        assert!(routes.contains(&"A_output_DUPLICATE_0_2:d2 -> S2:in".to_string()));
        assert_eq!(depth(&tree, &PortRef::new("A", "output")), 2);
    }

    #[test]
    fn single_peer_is_a_direct_edge() {
        let tree = duplicate_tree(&root("number"), &peers(1)).unwrap();
        assert!(tree.nodes.is_empty());
        assert_eq!(tree.edges.len(), 1);
    }

    #[test]
    fn node_count_and_depth_for_many_sinks() {
        for n in 2..=17 {
            let tree = duplicate_tree(&root("number"), &peers(n)).unwrap();
            assert_eq!(tree.nodes.len(), n - 1, "n = {n}");
            assert_eq!(tree.edges.len(), 2 * n - 1, "n = {n}");
            let expected = (n as f64).log2().ceil() as usize;
            assert_eq!(depth(&tree, &PortRef::new("A", "output")), expected, "n = {n}");
            assert!(tree.nodes.iter().all(|n| n.value.component() == DUPLICATE));
        }
    }

    #[test]
    fn join_tree_mirrors_duplicate_tree() {
        let mut r = root("string");
        r.port = PortRef::new("Z", "in");
        let tree = join_tree(&r, &peers(4)).unwrap();
        let ids: Vec<&str> = tree.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "Z_in_JOIN_0_3",
                "Z_in_JOIN_0_3_in1_JOIN_0_1",
                "Z_in_JOIN_0_3_in2_JOIN_2_3",
            ]
        );
        assert!(tree.nodes.iter().all(|n| n.value.component() == JOIN));
        assert!(tree
            .nodes
            .iter()
            .all(|n| n.value.settings().generic_type == Some(PortType::named("string"))));
        let last = tree.edges.last().unwrap();
        assert_eq!(last.route().to_string(), "Z_in_JOIN_0_3:to -> Z:in");
    }

    #[test]
    fn empty_peer_list_is_an_invariant_violation() {
        let err = duplicate_tree(&root("number"), &[]).unwrap_err();
        assert_eq!(err.code, Some(codes::E0100));
        let err = join_tree(&root("number"), &[]).unwrap_err();
        assert_eq!(err.code, Some(codes::E0100));
    }

    #[test]
    fn tree_nodes_share_the_root_scope() {
        let mut r = root("number");
        r.parent = Some(NodeId::new("P"));
        let tree = duplicate_tree(&r, &peers(5)).unwrap();
        assert!(tree
            .nodes
            .iter()
            .all(|n| n.parent == Some(NodeId::new("P"))));
    }

    #[test]
    fn root_scope_rules() {
        let mut g = PortGraph::new();
        let add = |g: &mut PortGraph, id: &str, parent: Option<&str>| {
            g.insert_node(Node::new(
                NodeId::new(id),
                NodeValue::default(),
                parent.map(NodeId::new),
            ));
        };
        add(&mut g, "P", None);
        add(&mut g, "A", Some("P"));
        add(&mut g, "B", Some("P"));
        add(&mut g, "C", Some("A"));
        let (p, a, b, c) = (
            NodeId::new("P"),
            NodeId::new("A"),
            NodeId::new("B"),
            NodeId::new("C"),
        );

        // siblings
        assert_eq!(root_scope(&g, &a, &b).unwrap(), Some(p.clone()));
        // child to its parent's boundary
        assert_eq!(root_scope(&g, &a, &p).unwrap(), Some(p.clone()));
        // compound into its own children
        assert_eq!(root_scope(&g, &a, &c).unwrap(), Some(a.clone()));
        // top level
        assert_eq!(root_scope(&g, &p, &p).unwrap(), None);

        let err = root_scope(&g, &a, &NodeId::new("missing")).unwrap_err();
        assert_eq!(err.code, Some(codes::E0101));
    }
}
