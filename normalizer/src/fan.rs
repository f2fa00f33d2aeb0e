// fan.rs — Fan detection and fan resolution
//
// Finds ports with more than one non-continuation edge (multi-out and
// multi-in bundles) and replaces each bundle with a duplicate tree or a join
// tree. All bundles are computed from the graph as it was before the pass, so
// splicing never feeds back into detection.
//
// Preconditions: the graph passed validation.
// Postconditions: no port has more than one non-continuation edge on a given
//                 side, except the fixed two-way ports of tree nodes.
// Failure modes: unresolved port type → E0103; tree synthesis/splice errors.
// Side effects: `resolve_fans` rewrites the graph's edge list and appends nodes.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::debug;

use crate::diag::{codes, Diagnostic};
use crate::graph::{Edge, EdgeRoute, PortGraph, PortRef, PortSide, PortType};
use crate::pass::PassStats;
use crate::port_index::PortIndex;
use crate::splice::splice;
use crate::tree::{duplicate_tree, join_tree, root_scope, Synthesized, TreeRoot};

// ── Bundles ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanDirection {
    /// One output port feeding several inputs.
    Out,
    /// Several outputs feeding one input port.
    In,
}

/// All non-continuation edges attached to one port on one side.
#[derive(Debug, Clone, PartialEq)]
pub struct FanBundle {
    pub direction: FanDirection,
    /// The shared port.
    pub anchor: PortRef,
    pub port_type: Option<PortType>,
    /// Opposite endpoints in edge order; this is the tree's leaf order.
    pub peers: Vec<PortRef>,
}

impl FanBundle {
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Routes of the edges this bundle replaces.
    pub fn routes(&self) -> impl Iterator<Item = EdgeRoute> + '_ {
        self.peers.iter().map(move |peer| match self.direction {
            FanDirection::Out => EdgeRoute {
                source: self.anchor.clone(),
                target: peer.clone(),
            },
            FanDirection::In => EdgeRoute {
                source: peer.clone(),
                target: self.anchor.clone(),
            },
        })
    }
}

/// Output ports with two or more outgoing data edges.
pub fn multiple_outs(graph: &PortGraph) -> Vec<FanBundle> {
    detect(graph, &PortIndex::build(graph), FanDirection::Out)
}

/// Input ports with two or more incoming data edges.
pub fn multiple_ins(graph: &PortGraph) -> Vec<FanBundle> {
    detect(graph, &PortIndex::build(graph), FanDirection::In)
}

fn detect(graph: &PortGraph, index: &PortIndex, direction: FanDirection) -> Vec<FanBundle> {
    let mut bundles = Vec::new();
    for node in graph.nodes() {
        let edges: Vec<&Edge> = match direction {
            FanDirection::Out => index.out_edges(graph, &node.id).collect(),
            FanDirection::In => index.in_edges(graph, &node.id).collect(),
        };

        let mut groups: IndexMap<&str, Vec<PortRef>> = IndexMap::new();
        for edge in edges.into_iter().filter(|e| !e.is_continuation()) {
            let (port, peer) = match direction {
                FanDirection::Out => (edge.value.out_port.as_str(), edge.target_port()),
                FanDirection::In => (edge.value.in_port.as_str(), edge.source_port()),
            };
            groups.entry(port).or_default().push(peer);
        }

        let side = match direction {
            FanDirection::Out => PortSide::Output,
            FanDirection::In => PortSide::Input,
        };
        for (port, peers) in groups {
            if peers.len() < 2 {
                continue;
            }
            bundles.push(FanBundle {
                direction,
                anchor: PortRef::on(&node.id, port),
                port_type: graph.port_type(&node.id, port, side).cloned(),
                peers,
            });
        }
    }
    bundles
}

// ── Resolution pass ─────────────────────────────────────────────────────────

/// Replace every fan bundle in `graph` with a duplicate or join tree.
///
/// An edge in both a fan-out and a fan-in bundle is routed through both
/// trees: the duplicate leaf that would reach the fan-in port feeds the join
/// tree instead.
pub fn resolve_fans(graph: &mut PortGraph) -> Result<PassStats, Diagnostic> {
    let index = PortIndex::build(graph);
    let outs = detect(graph, &index, FanDirection::Out);
    let ins = detect(graph, &index, FanDirection::In);

    let fanned_in: HashSet<EdgeRoute> = ins.iter().flat_map(|b| b.routes()).collect();

    // Duplicate leaves standing in for a fanned-in route, in leaf order.
    let mut feeds: HashMap<EdgeRoute, VecDeque<PortRef>> = HashMap::new();
    let mut duplicates = Synthesized::default();
    for bundle in &outs {
        let root = tree_root(graph, bundle)?;
        debug!(port = %bundle.anchor, fan_out = bundle.len(), "building duplicate tree");
        let mut tree = duplicate_tree(&root, &bundle.peers)?;
        tree.edges.retain(|edge| {
            let route = EdgeRoute {
                source: bundle.anchor.clone(),
                target: edge.target_port(),
            };
            if !fanned_in.contains(&route) {
                return true;
            }
            feeds.entry(route).or_default().push_back(edge.source_port());
            false
        });
        duplicates.append(tree);
    }

    let mut synthesized = Synthesized::default();
    for bundle in &ins {
        let root = tree_root(graph, bundle)?;
        debug!(port = %bundle.anchor, fan_in = bundle.len(), "building join tree");
        let sources: Vec<PortRef> = bundle
            .peers
            .iter()
            .zip(bundle.routes())
            .map(|(peer, route)| {
                feeds
                    .get_mut(&route)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_else(|| peer.clone())
            })
            .collect();
        synthesized.append(join_tree(&root, &sources)?);
    }
    synthesized.append(duplicates);

    let subsumed: HashSet<EdgeRoute> = outs
        .iter()
        .flat_map(|bundle| bundle.routes())
        .chain(fanned_in)
        .collect();

    splice(graph, &subsumed, synthesized)
}

fn tree_root(graph: &PortGraph, bundle: &FanBundle) -> Result<TreeRoot, Diagnostic> {
    let anchor = &bundle.anchor;
    let port_type = bundle.port_type.clone().ok_or_else(|| {
        Diagnostic::error(
            codes::E0103,
            format!("port {} has no declared type", anchor),
        )
        .at_port(&anchor.node, &anchor.port)
    })?;
    let last = bundle.peers.last().ok_or_else(|| {
        Diagnostic::error(codes::E0100, format!("fan bundle at {} is empty", anchor))
            .at_port(&anchor.node, &anchor.port)
    })?;
    Ok(TreeRoot {
        port: anchor.clone(),
        port_type,
        parent: root_scope(graph, &anchor.node, &last.node)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeId, NodeValue};

    fn atomic(id: &str, inputs: &[&str], outputs: &[&str]) -> Node {
        let mut value = NodeValue {
            component: Some("test/op".to_string()),
            atomic: Some(true),
            ..NodeValue::default()
        };
        for p in inputs {
            value
                .ports_mut(PortSide::Input)
                .insert(p.to_string(), PortType::named("number"));
        }
        for p in outputs {
            value
                .ports_mut(PortSide::Output)
                .insert(p.to_string(), PortType::named("number"));
        }
        Node::new(NodeId::new(id), value, None)
    }

    fn edge(from: &str, out: &str, to: &str, inp: &str) -> Edge {
        Edge::between(&PortRef::new(from, out), &PortRef::new(to, inp))
    }

    fn fan_out_graph(n: usize) -> PortGraph {
        let mut g = PortGraph::new();
        g.insert_node(atomic("A", &[], &["output"]));
        for i in 0..n {
            let id = format!("S{i}");
            g.insert_node(atomic(&id, &["in"], &[]));
            g.push_edge(edge("A", "output", &id, "in"));
        }
        g
    }

    #[test]
    fn detects_one_bundle_per_port() {
        let g = fan_out_graph(3);
        let outs = multiple_outs(&g);
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].len(), 3);
        assert_eq!(outs[0].anchor, PortRef::new("A", "output"));
        assert_eq!(outs[0].port_type, Some(PortType::named("number")));
        assert!(multiple_ins(&g).is_empty());
    }

    #[test]
    fn single_edges_are_not_bundles() {
        assert!(multiple_outs(&fan_out_graph(1)).is_empty());
    }

    #[test]
    fn continuation_edges_are_ignored() {
        let mut g = fan_out_graph(1);
        g.insert_node(atomic("K", &["in"], &[]));
        g.push_edge(edge("A", "output", "K", "in").as_continuation());
        assert!(multiple_outs(&g).is_empty());
    }

    #[test]
    fn detects_fan_in() {
        let mut g = PortGraph::new();
        g.insert_node(atomic("Z", &["in"], &[]));
        for i in 0..2 {
            let id = format!("P{i}");
            g.insert_node(atomic(&id, &[], &["out"]));
            g.push_edge(edge(&id, "out", "Z", "in"));
        }
        let ins = multiple_ins(&g);
        assert_eq!(ins.len(), 1);
        assert_eq!(
            ins[0].peers,
            vec![PortRef::new("P0", "out"), PortRef::new("P1", "out")]
        );
        let routes: Vec<String> = ins[0].routes().map(|r| r.to_string()).collect();
        assert_eq!(routes, vec!["P0:out -> Z:in", "P1:out -> Z:in"]);
    }

    #[test]
    fn resolve_replaces_bundle_edges() {
        let mut g = fan_out_graph(2);
        let stats = resolve_fans(&mut g).unwrap();
        assert_eq!(stats.nodes_added, 1);
        assert_eq!(stats.edges_removed, 2);
        assert_eq!(stats.edges_added, 3);
        assert!(g
            .edges()
            .iter()
            .all(|e| !(e.source.as_str() == "A" && e.target.as_str().starts_with('S'))));
        assert!(multiple_outs(&g).is_empty());
    }

    #[test]
    fn continuation_edges_survive_resolution() {
        let mut g = fan_out_graph(2);
        g.insert_node(atomic("K", &["in"], &[]));
        g.push_edge(edge("A", "output", "K", "in").as_continuation());
        resolve_fans(&mut g).unwrap();
        let kept: Vec<&Edge> = g.edges().iter().filter(|e| e.is_continuation()).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].route().to_string(), "A:output -> K:in");
    }

    #[test]
    fn crossing_fans_chain_duplicate_into_join() {
        let mut g = PortGraph::new();
        g.insert_node(atomic("A", &[], &["o"]));
        g.insert_node(atomic("B", &["i"], &[]));
        g.insert_node(atomic("C", &["i"], &[]));
        g.insert_node(atomic("D", &[], &["o"]));
        g.push_edge(edge("A", "o", "B", "i"));
        g.push_edge(edge("A", "o", "C", "i"));
        g.push_edge(edge("D", "o", "B", "i"));

        let stats = resolve_fans(&mut g).unwrap();
        assert_eq!(stats.nodes_added, 2);
        assert_eq!(stats.edges_removed, 3);
        assert_eq!(stats.edges_added, 5);

        let routes: Vec<String> = g.edges().iter().map(|e| e.route().to_string()).collect();
        assert_eq!(
            routes,
            vec![
                "A_o_DUPLICATE_0_1:d1 -> B_i_JOIN_0_1:in1",
                "D:o -> B_i_JOIN_0_1:in2",
                "B_i_JOIN_0_1:to -> B:i",
                "A_o_DUPLICATE_0_1:d2 -> C:i",
                "A:o -> A_o_DUPLICATE_0_1:in",
            ]
        );
        assert!(multiple_outs(&g).is_empty());
        assert!(multiple_ins(&g).is_empty());

        let again = resolve_fans(&mut g).unwrap();
        assert_eq!(again, PassStats::default());
    }

    #[test]
    fn parallel_crossing_edges_each_get_a_leaf() {
        let mut g = PortGraph::new();
        g.insert_node(atomic("A", &[], &["o"]));
        g.insert_node(atomic("B", &["i"], &[]));
        g.push_edge(edge("A", "o", "B", "i"));
        g.push_edge(edge("A", "o", "B", "i"));

        resolve_fans(&mut g).unwrap();
        let routes: Vec<String> = g.edges().iter().map(|e| e.route().to_string()).collect();
        assert_eq!(
            routes,
            vec![
                "A_o_DUPLICATE_0_1:d1 -> B_i_JOIN_0_1:in1",
                "A_o_DUPLICATE_0_1:d2 -> B_i_JOIN_0_1:in2",
                "B_i_JOIN_0_1:to -> B:i",
                "A:o -> A_o_DUPLICATE_0_1:in",
            ]
        );
        assert!(multiple_outs(&g).is_empty() && multiple_ins(&g).is_empty());
    }

    #[test]
    fn untyped_port_is_reported() {
        let mut g = PortGraph::new();
        g.insert_node(atomic("A", &[], &[]));
        g.insert_node(atomic("B", &["in"], &[]));
        g.insert_node(atomic("C", &["in"], &[]));
        g.push_edge(edge("A", "output", "B", "in"));
        g.push_edge(edge("A", "output", "C", "in"));
        let err = resolve_fans(&mut g).unwrap_err();
        assert_eq!(err.code, Some(codes::E0103));
    }
}
