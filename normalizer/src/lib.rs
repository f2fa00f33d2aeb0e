// npgn — network port graph normalizer
//
// Library root. One module per pass, plus the graph model, its JSON
// interchange, diagnostics and the pipeline that runs the passes.

pub mod boundary;
pub mod diag;
pub mod dot;
pub mod drain;
pub mod fan;
pub mod graph;
pub mod id;
pub mod interchange;
pub mod pass;
pub mod pipeline;
pub mod port_index;
pub mod primitives;
pub mod splice;
pub mod tree;
pub mod validate;

pub use diag::{Diagnostic, NormalizeError};
pub use graph::{Edge, Node, NodeId, NodeKind, PortGraph, PortRef, PortType};
pub use pass::{NormalizeOptions, PassId, PassStats};
pub use pipeline::{normalize, normalize_with};
pub use validate::{PortGraphValidator, StructuralValidator};
