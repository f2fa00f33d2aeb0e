// dot.rs — Graphviz DOT output for port graphs
//
// Renders a PortGraph for inspection with `dot`. Composite nodes with
// children become nested clusters; synthesized primitives get their own
// shapes so rewrites are easy to spot.
//
// Preconditions: none (dangling parents render at the top level).
// Postconditions: returns a DOT string with one statement per node and edge.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::graph::{Edge, Node, NodeId, PortGraph};
use crate::primitives::{CONSUME, DUPLICATE, IDENTITY, JOIN};

/// Emit the graph as a Graphviz DOT string.
pub fn emit_dot(graph: &PortGraph) -> String {
    let mut buf = String::new();
    // Writing to a String cannot fail.
    let _ = write_dot(&mut buf, graph);
    buf
}

fn write_dot(buf: &mut String, graph: &PortGraph) -> std::fmt::Result {
    writeln!(buf, "digraph npg {{")?;
    writeln!(buf, "    rankdir=LR;")?;
    writeln!(buf, "    compound=true;")?;
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];")?;
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];")?;

    for node in graph.nodes().filter(|n| is_top_level(graph, n)) {
        write_node(buf, graph, node, 1)?;
    }

    writeln!(buf)?;
    for edge in graph.edges() {
        write_edge(buf, edge)?;
    }
    writeln!(buf, "}}")
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn is_top_level(graph: &PortGraph, node: &Node) -> bool {
    match &node.parent {
        None => true,
        Some(parent) => !graph.contains_node(parent),
    }
}

/// Sanitize a name to valid DOT identifier characters.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Quoted DOT ID. Node ids are arbitrary strings, so they are never sanitized
/// (two ids could collapse to the same identifier).
fn quoted(id: &NodeId) -> String {
    let mut s = String::with_capacity(id.as_str().len() + 2);
    s.push('"');
    for c in id.as_str().chars() {
        if c == '"' || c == '\\' {
            s.push('\\');
        }
        s.push(c);
    }
    s.push('"');
    s
}

fn node_attrs(node: &Node) -> String {
    let component = node.value.component();
    let (shape, color) = match component {
        DUPLICATE => ("diamond", "lightyellow"),
        JOIN => ("invtriangle", "lightyellow"),
        IDENTITY => ("circle", "lightgreen"),
        CONSUME => ("octagon", "lightsalmon"),
        _ if node.kind().is_recursive() => ("box3d", "lightblue"),
        _ if node.kind().is_atomic() => ("box", "lightblue"),
        _ => ("component", "white"),
    };
    let label = format!("{}\\n{}", escape(node.id.as_str()), escape(component));
    format!("shape={shape}, style=filled, fillcolor={color}, label=\"{label}\"")
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn write_node(buf: &mut String, graph: &PortGraph, node: &Node, depth: usize) -> std::fmt::Result {
    let indent = "    ".repeat(depth);
    let mut children = graph.children(&node.id).peekable();
    if children.peek().is_none() {
        return writeln!(buf, "{indent}{} [{}];", quoted(&node.id), node_attrs(node));
    }

    writeln!(buf, "{indent}subgraph \"cluster_{}\" {{", escape(&sanitize(node.id.as_str())))?;
    writeln!(buf, "{indent}    label=\"{}\";", escape(node.id.as_str()))?;
    writeln!(buf, "{indent}    style=rounded;")?;
    writeln!(
        buf,
        "{indent}    color={};",
        if node.kind().is_lambda() { "purple" } else { "gray50" }
    )?;
    // The composite itself is drawn inside its cluster so edges to its
    // boundary ports have an endpoint.
    writeln!(buf, "{indent}    {} [{}];", quoted(&node.id), node_attrs(node))?;
    for child in children {
        write_node(buf, graph, child, depth + 1)?;
    }
    writeln!(buf, "{indent}}}")
}

fn write_edge(buf: &mut String, edge: &Edge) -> std::fmt::Result {
    let label = format!(
        "{} → {}",
        escape(&edge.value.out_port),
        escape(&edge.value.in_port)
    );
    let style = if edge.is_continuation() {
        ", style=dashed, color=gray50"
    } else {
        ""
    };
    writeln!(
        buf,
        "    {} -> {} [label=\"{label}\"{style}];",
        quoted(&edge.source),
        quoted(&edge.target)
    )
}
