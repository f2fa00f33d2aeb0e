// pipeline.rs — Normalization orchestration
//
// Validates the input, then runs the enabled passes in their fixed order on
// a private copy of the graph. The caller's graph is never modified and a
// failed run returns no graph at all.
//
// Preconditions: none (shape is checked here).
// Postconditions: on Ok, the returned graph satisfies the postconditions of
//   every enabled pass.
// Failure modes: validator rejects input → E0001 (no pass runs); any pass
//   error → `NormalizeError` naming that pass.
// Side effects: calls `on_pass_complete` after each pass; emits tracing events.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::boundary::rewrite_self_loops;
use crate::diag::{codes, Diagnostic, NormalizeError};
use crate::drain::drain_ports;
use crate::fan::resolve_fans;
use crate::graph::PortGraph;
use crate::pass::{descriptor, enabled_passes, NormalizeOptions, PassId, PassStats};
use crate::validate::{PortGraphValidator, StructuralValidator};

/// Normalize `graph` with the default structural validator.
pub fn normalize(graph: &PortGraph, options: &NormalizeOptions) -> Result<PortGraph, NormalizeError> {
    normalize_with(graph, options, &StructuralValidator, |_, _, _| {})
}

/// Normalize `graph`, checking its shape with `validator` and reporting each
/// completed pass to `on_pass_complete`.
pub fn normalize_with<V>(
    graph: &PortGraph,
    options: &NormalizeOptions,
    validator: &V,
    mut on_pass_complete: impl FnMut(PassId, &PassStats, Duration),
) -> Result<PortGraph, NormalizeError>
where
    V: PortGraphValidator + ?Sized,
{
    if !validator.is_well_formed(graph) {
        let mut diagnostics = vec![Diagnostic::error(
            codes::E0001,
            "cannot normalize a graph that is not a network port graph",
        )];
        diagnostics.extend(validator.problems(graph));
        return Err(NormalizeError {
            failing_pass: None,
            diagnostics,
        });
    }

    let mut work = graph.clone();
    for pass_id in enabled_passes(options) {
        let t = Instant::now();
        let stats = run_pass(pass_id, &mut work)
            .map_err(|diag| NormalizeError::in_pass(pass_id, diag))?;
        let elapsed = t.elapsed();

        let name = descriptor(pass_id).name;
        if stats.is_no_op() {
            debug!(pass = name, "nothing to rewrite");
        }
        info!(
            pass = name,
            nodes_added = stats.nodes_added,
            edges_removed = stats.edges_removed,
            edges_added = stats.edges_added,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "pass complete"
        );
        on_pass_complete(pass_id, &stats, elapsed);
    }
    Ok(work)
}

fn run_pass(pass_id: PassId, graph: &mut PortGraph) -> Result<PassStats, Diagnostic> {
    match pass_id {
        PassId::ResolveFans => resolve_fans(graph),
        PassId::RewriteBoundaries => rewrite_self_loops(graph),
        PassId::DrainPorts => drain_ports(graph),
    }
}
