// validate.rs — Port graph shape check
//
// The normalizer refuses input that is not a network port graph. Which
// predicate decides that is up to the caller: anything implementing
// `PortGraphValidator` (including a plain closure) can be plugged in.
// `StructuralValidator` is the default and checks what the passes rely on.
//
// Preconditions: none.
// Postconditions: none.
// Failure modes: none (problems are returned as diagnostics).
// Side effects: none.

use std::collections::HashSet;

use crate::diag::{codes, Diagnostic};
use crate::graph::{NodeId, PortGraph};

/// Decides whether a graph may be normalized.
pub trait PortGraphValidator {
    fn is_well_formed(&self, graph: &PortGraph) -> bool;

    /// Details for a rejected graph. Defaults to nothing beyond the verdict.
    fn problems(&self, _graph: &PortGraph) -> Vec<Diagnostic> {
        Vec::new()
    }
}

impl<F> PortGraphValidator for F
where
    F: Fn(&PortGraph) -> bool,
{
    fn is_well_formed(&self, graph: &PortGraph) -> bool {
        self(graph)
    }
}

/// Checks that edges connect declared ports of existing nodes and that the
/// parent relation is a forest.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl PortGraphValidator for StructuralValidator {
    fn is_well_formed(&self, graph: &PortGraph) -> bool {
        self.problems(graph).is_empty()
    }

    fn problems(&self, graph: &PortGraph) -> Vec<Diagnostic> {
        let mut problems = Vec::new();
        check_parents(graph, &mut problems);
        check_edges(graph, &mut problems);
        problems
    }
}

fn check_parents(graph: &PortGraph, problems: &mut Vec<Diagnostic>) {
    for node in graph.nodes() {
        if let Some(parent) = &node.parent {
            if !graph.contains_node(parent) {
                problems.push(
                    Diagnostic::error(
                        codes::E0002,
                        format!("node '{}' has unknown parent '{}'", node.id, parent),
                    )
                    .at_node(&node.id),
                );
                continue;
            }
        }

        let mut seen: HashSet<&NodeId> = HashSet::from([&node.id]);
        let mut cursor = graph.parent(&node.id);
        while let Some(p) = cursor {
            if !seen.insert(p) {
                problems.push(
                    Diagnostic::error(
                        codes::E0002,
                        format!("node '{}' is its own ancestor", node.id),
                    )
                    .at_node(&node.id),
                );
                break;
            }
            cursor = graph.parent(p);
        }
    }
}

fn check_edges(graph: &PortGraph, problems: &mut Vec<Diagnostic>) {
    for edge in graph.edges() {
        for (end, port) in [
            (&edge.source, &edge.value.out_port),
            (&edge.target, &edge.value.in_port),
        ] {
            let Some(node) = graph.node(end) else {
                problems.push(
                    Diagnostic::error(
                        codes::E0002,
                        format!("edge {} references unknown node '{}'", edge.route(), end),
                    )
                    .at_node(end),
                );
                continue;
            };
            // Compound boundaries route ports in either direction.
            let declared = node.input_ports().contains_key(port)
                || node.output_ports().contains_key(port);
            if !declared {
                problems.push(
                    Diagnostic::error(
                        codes::E0002,
                        format!("edge {} uses undeclared port '{}'", edge.route(), port),
                    )
                    .at_port(end, port),
                );
            }
        }
    }
}
