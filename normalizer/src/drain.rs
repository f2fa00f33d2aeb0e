// drain.rs — Sinks for unconsumed ports
//
// Two sweeps over the nodes present when the pass starts, in node order:
//   - output drain: every output port without a successor gets a top-level
//     `control/consume`, unless the node is a child of a lambda (lambda
//     bodies are bound at the call site);
//   - input drain: every input port of a compound or lambda node that is not
//     routed to any child gets a `control/consume` inside that node.
// Successor checks see the sinks attached earlier in the same pass.
//
// Preconditions: fan resolution and boundary rewriting have run (if enabled).
// Postconditions: every drained port has exactly one successor, the sink.
// Failure modes: synthesized id collides with an existing node → E0102.
// Side effects: mutates `graph`.

use std::collections::HashSet;

use tracing::debug;

use crate::diag::Diagnostic;
use crate::graph::{Edge, NodeId, PortGraph, PortRef, PortType};
use crate::id;
use crate::pass::PassStats;
use crate::port_index::PortIndex;
use crate::primitives;

/// A port the drain will attach a sink to.
#[derive(Debug, Clone, PartialEq)]
pub struct Unconsumed {
    pub port: PortRef,
    pub port_type: PortType,
    /// Scope of the sink: `None` for output ports, the node for input ports.
    pub sink_parent: Option<NodeId>,
}

/// Ports the drain would attach sinks to, in the order it would attach them.
pub fn unconsumed_ports(graph: &PortGraph) -> Vec<Unconsumed> {
    let index = PortIndex::build(graph);
    let mut drained: HashSet<PortRef> = HashSet::new();
    let mut found = Vec::new();

    for node in graph.nodes() {
        let lambda_child = node
            .parent
            .as_ref()
            .and_then(|p| graph.node(p))
            .is_some_and(|p| p.kind().is_lambda());

        if !lambda_child {
            for (port, ty) in node.output_ports() {
                let port = PortRef::on(&node.id, port);
                if index.out_degree(&port) == 0 && drained.insert(port.clone()) {
                    found.push(Unconsumed {
                        port,
                        port_type: ty.clone(),
                        sink_parent: None,
                    });
                }
            }
        }

        if node.kind().has_internal_graph() {
            for (port, ty) in node.input_ports() {
                let port = PortRef::on(&node.id, port);
                if index.out_degree(&port) == 0 && drained.insert(port.clone()) {
                    found.push(Unconsumed {
                        port,
                        port_type: ty.clone(),
                        sink_parent: Some(node.id.clone()),
                    });
                }
            }
        }
    }
    found
}

pub fn drain_ports(graph: &mut PortGraph) -> Result<PassStats, Diagnostic> {
    let ports = unconsumed_ports(graph);
    let mut stats = PassStats::default();
    for unconsumed in ports {
        let sink_id = id::consume_id(&unconsumed.port);
        debug!(port = %unconsumed.port, sink = %sink_id, "draining port");
        let sink_in = PortRef::on(&sink_id, "all");
        graph.add_synthesized(primitives::consume(
            sink_id,
            &unconsumed.port_type,
            unconsumed.sink_parent,
        ))?;
        graph.push_edge(
            Edge::between(&unconsumed.port, &sink_in)
                .with_name(id::edge_name(&unconsumed.port, &sink_in)),
        );
        stats.nodes_added += 1;
        stats.edges_added += 1;
    }
    Ok(stats)
}
