// boundary.rs — Identity bridges for pass-through edges
//
// An edge whose source and target are the same node is a compound node's
// input port routed straight to its own output port. Each such self-loop is
// replaced by a `std/id` child of that node and two edges through it.
//
// Port types of the bridge are read crosswise from the looping node: the
// bridge input takes the node's output-port type named by the edge's
// `inPort`, the bridge output takes the node's input-port type named by the
// edge's `outPort`. Downstream tooling relies on exactly this assignment.
//
// Preconditions: fan resolution has run (if enabled).
// Postconditions: no edge has source == target.
// Failure modes: a looping port has no declared type → E0103.
// Side effects: mutates `graph`.

use std::collections::HashSet;

use tracing::debug;

use crate::diag::{codes, Diagnostic};
use crate::graph::{Edge, EdgeRoute, PortGraph, PortRef, PortType};
use crate::id;
use crate::pass::PassStats;
use crate::primitives;

pub fn rewrite_self_loops(graph: &mut PortGraph) -> Result<PassStats, Diagnostic> {
    let loops: Vec<EdgeRoute> = graph
        .edges()
        .iter()
        .filter(|e| e.is_self_loop())
        .map(Edge::route)
        .collect();
    if loops.is_empty() {
        return Ok(PassStats::default());
    }

    let mut stats = PassStats::default();
    let mut bridged: HashSet<&EdgeRoute> = HashSet::new();
    let mut bridges = Vec::new();
    let mut edges = Vec::new();
    for route in &loops {
        // Parallel self-loops with one routing share one bridge.
        if !bridged.insert(route) {
            continue;
        }
        let node = &route.source.node;
        let input_type = looping_port_type(graph, &route.target, true)?;
        let output_type = looping_port_type(graph, &route.source, false)?;

        let bridge_id = id::identity_id(route);
        debug!(node = %node, bridge = %bridge_id, "bridging self-loop");
        let bridge_in = PortRef::on(&bridge_id, "input");
        let bridge_out = PortRef::on(&bridge_id, "output");
        bridges.push(primitives::identity(
            bridge_id,
            input_type,
            output_type,
            node.clone(),
        ));
        edges.push(
            Edge::between(&route.source, &bridge_in)
                .with_name(id::edge_name(&route.source, &bridge_in)),
        );
        edges.push(
            Edge::between(&bridge_out, &route.target)
                .with_name(id::edge_name(&bridge_out, &route.target)),
        );
    }

    let before = graph.edge_count();
    graph.retain_edges(|e| !e.is_self_loop());
    stats.edges_removed = before - graph.edge_count();
    stats.nodes_added = bridges.len();
    stats.edges_added = edges.len();

    for bridge in bridges {
        graph.add_synthesized(bridge)?;
    }
    for edge in edges {
        graph.push_edge(edge);
    }
    Ok(stats)
}

/// `output_side` selects the looping node's output-port map.
fn looping_port_type<'g>(
    graph: &'g PortGraph,
    port: &PortRef,
    output_side: bool,
) -> Result<&'g PortType, Diagnostic> {
    let ty = graph.node(&port.node).and_then(|node| {
        if output_side {
            node.output_ports().get(&port.port)
        } else {
            node.input_ports().get(&port.port)
        }
    });
    ty.ok_or_else(|| {
        let side = if output_side { "output" } else { "input" };
        Diagnostic::error(
            codes::E0103,
            format!(
                "self-loop on '{}' names '{}', which is not a declared {} port",
                port.node, port.port, side
            ),
        )
        .at_port(&port.node, &port.port)
    })
}
