// pass.rs — Pass descriptor module: metadata, option gating, execution order
//
// Declares the three normalization passes, the option that enables each, and
// what each guarantees on completion. The order in `ALL_PASSES` is the only
// order the pipeline runs them in: fan resolution first (later passes reason
// about "a port has a successor" on the bounded binary shape), then boundary
// rewriting, then draining.

use serde::Deserialize;

// ── Pass identifiers ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    ResolveFans,
    RewriteBoundaries,
    DrainPorts,
}

// ── Options ────────────────────────────────────────────────────────────────

/// Which passes run. Every pass is on unless switched off; missing keys in a
/// JSON options document also mean "on".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizeOptions {
    pub create_duplicates_and_joins: bool,
    pub create_id_nodes: bool,
    pub add_consume_nodes: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            create_duplicates_and_joins: true,
            create_id_nodes: true,
            add_consume_nodes: true,
        }
    }
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a normalization pass.
pub struct PassDescriptor {
    /// Human-readable name for diagnostics and logs.
    pub name: &'static str,
    /// Option key (camelCase, as in JSON) that enables the pass.
    pub option: &'static str,
    /// Postcondition, documentation only.
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::ResolveFans => PassDescriptor {
            name: "resolve_fans",
            option: "createDuplicatesAndJoins",
            invariants: "no port has more than one non-continuation edge per side",
        },
        PassId::RewriteBoundaries => PassDescriptor {
            name: "rewrite_boundaries",
            option: "createIdNodes",
            invariants: "no edge has equal source and target node",
        },
        PassId::DrainPorts => PassDescriptor {
            name: "drain_ports",
            option: "addConsumeNodes",
            invariants: "no unconsumed output (outside lambdas) or unrouted compound input",
        },
    }
}

/// All pass IDs in execution order.
pub const ALL_PASSES: [PassId; 3] = [
    PassId::ResolveFans,
    PassId::RewriteBoundaries,
    PassId::DrainPorts,
];

pub fn is_enabled(id: PassId, options: &NormalizeOptions) -> bool {
    match id {
        PassId::ResolveFans => options.create_duplicates_and_joins,
        PassId::RewriteBoundaries => options.create_id_nodes,
        PassId::DrainPorts => options.add_consume_nodes,
    }
}

/// The passes `options` enables, in execution order.
pub fn enabled_passes(options: &NormalizeOptions) -> Vec<PassId> {
    ALL_PASSES
        .iter()
        .copied()
        .filter(|&id| is_enabled(id, options))
        .collect()
}

// ── Pass results ───────────────────────────────────────────────────────────

/// What a pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub nodes_added: usize,
    pub edges_removed: usize,
    pub edges_added: usize,
}

impl PassStats {
    pub fn is_no_op(&self) -> bool {
        *self == PassStats::default()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
