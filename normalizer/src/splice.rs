// splice.rs — Apply a batch of fan rewrites to a graph
//
// Removes every data edge whose routing matches a subsumed route (matched by
// value, since several edge records can share one routing) and appends the
// synthesized nodes and edges. Continuation edges and edges outside any
// bundle pass through in their original order.
//
// Preconditions: synthesized node ids are unique among themselves.
// Postconditions: the batch is applied completely or not at all.
// Failure modes: a synthesized id collides with an existing node → E0102.
// Side effects: mutates `graph`.

use std::collections::HashSet;

use crate::diag::{codes, Diagnostic};
use crate::graph::{EdgeRoute, NodeId, PortGraph};
use crate::pass::PassStats;
use crate::tree::Synthesized;

pub fn splice(
    graph: &mut PortGraph,
    subsumed: &HashSet<EdgeRoute>,
    synthesized: Synthesized,
) -> Result<PassStats, Diagnostic> {
    // Check the whole batch before touching the graph.
    let mut fresh: HashSet<&NodeId> = HashSet::new();
    for node in &synthesized.nodes {
        if graph.contains_node(&node.id) || !fresh.insert(&node.id) {
            return Err(Diagnostic::error(
                codes::E0102,
                format!("synthesized node id '{}' is already in use", node.id),
            )
            .at_node(&node.id));
        }
    }

    let before = graph.edge_count();
    graph.retain_edges(|e| e.is_continuation() || !subsumed.contains(&e.route()));

    let stats = PassStats {
        nodes_added: synthesized.nodes.len(),
        edges_removed: before - graph.edge_count(),
        edges_added: synthesized.edges.len(),
    };

    for node in synthesized.nodes {
        graph.add_synthesized(node)?;
    }
    for edge in synthesized.edges {
        graph.push_edge(edge);
    }
    Ok(stats)
}
