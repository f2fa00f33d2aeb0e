// graph.rs — Network port graph model
//
// In-memory representation of a hierarchical, directed, typed-port dataflow
// graph: nodes with named input/output ports, a parent forest over nodes, and
// port-to-port edges. Node and edge payloads keep every key they were loaded
// with so untouched parts of a graph round-trip unchanged.
//
// Preconditions: none.
// Postconditions: node order and edge order are insertion order.
// Failure modes: inserting a synthesized node over an existing id → `Diagnostic`.
// Side effects: none.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diag::{codes, Diagnostic};

// ── Identifiers ─────────────────────────────────────────────────────────────

/// Identifier of a node, unique within a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A port on a node, addressed by name. Direction comes from context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub node: NodeId,
    pub port: String,
}

impl PortRef {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        PortRef {
            node: NodeId::new(node),
            port: port.into(),
        }
    }

    pub fn on(node: &NodeId, port: &str) -> Self {
        PortRef {
            node: node.clone(),
            port: port.to_string(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

// ── Port types ──────────────────────────────────────────────────────────────

/// Type of a port. Strings name a type; anything else is kept as structured JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortType {
    Named(String),
    Structured(Value),
}

impl PortType {
    pub fn named(name: impl Into<String>) -> Self {
        PortType::Named(name.into())
    }

    /// Named types mentioning `generic` are placeholders resolved at
    /// specialization time.
    pub fn is_generic(&self) -> bool {
        matches!(self, PortType::Named(name) if name.contains("generic"))
    }

    /// The type name when this is a concrete named type.
    pub fn concrete_name(&self) -> Option<&str> {
        match self {
            PortType::Named(name) if !self.is_generic() => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::Named(name) => f.write_str(name),
            PortType::Structured(value) => write!(f, "{}", value),
        }
    }
}

/// Port name → type, in declaration order.
pub type PortMap = IndexMap<String, PortType>;

/// Which port map of a node a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortSide {
    Input,
    Output,
}

// ── Nodes ───────────────────────────────────────────────────────────────────

/// Component name of lambda nodes.
pub const LAMBDA_COMPONENT: &str = "functional/lambda";

/// How the passes treat a node, as a set of independent capabilities.
/// Classified once, when the node is built. A node with none of them is a
/// plain compound defined by its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeKind {
    atomic: bool,
    recursive: bool,
    lambda: bool,
}

impl NodeKind {
    pub fn classify(value: &NodeValue) -> Self {
        NodeKind {
            atomic: value.atomic == Some(true),
            recursive: value.recursive == Some(true),
            lambda: value.component() == LAMBDA_COMPONENT,
        }
    }

    /// Primitive with no internal graph.
    pub fn is_atomic(self) -> bool {
        self.atomic
    }

    /// Body resolved elsewhere.
    pub fn is_recursive(self) -> bool {
        self.recursive
    }

    /// Children's outputs are bound at the call site.
    pub fn is_lambda(self) -> bool {
        self.lambda
    }

    /// Whether the node routes its own input ports through an internal graph.
    pub fn has_internal_graph(self) -> bool {
        !self.atomic && !self.recursive
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.lambda, "lambda"),
            (self.atomic, "atomic"),
            (self.recursive, "recursive"),
        ];
        let mut first = true;
        for (_, name) in flags.iter().filter(|(set, _)| *set) {
            if !first {
                f.write_str("+")?;
            }
            f.write_str(name)?;
            first = false;
        }
        if first {
            f.write_str("compound")?;
        }
        Ok(())
    }
}

/// Free-form node settings. Only the keys the normalizer writes are typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_ordering: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_generic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_type: Option<PortType>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    pub fn ordered(ports: &[&str]) -> Self {
        Settings {
            argument_ordering: Some(ports.iter().map(|p| p.to_string()).collect()),
            ..Settings::default()
        }
    }
}

/// Node payload as exchanged on the wire.
///
/// Keys are optional exactly as on the wire: an absent key stays absent on
/// export, a present one (even empty) is written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeValue {
    /// Component name, e.g. `control/duplicate`.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_ports: Option<PortMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ports: Option<PortMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atomic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_form: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn no_ports() -> &'static PortMap {
    static EMPTY: OnceLock<PortMap> = OnceLock::new();
    EMPTY.get_or_init(PortMap::new)
}

fn no_settings() -> &'static Settings {
    static EMPTY: OnceLock<Settings> = OnceLock::new();
    EMPTY.get_or_init(Settings::default)
}

impl NodeValue {
    /// Component name, empty when the key is absent.
    pub fn component(&self) -> &str {
        self.component.as_deref().unwrap_or("")
    }

    pub fn ports(&self, side: PortSide) -> &PortMap {
        let map = match side {
            PortSide::Input => &self.input_ports,
            PortSide::Output => &self.output_ports,
        };
        map.as_ref().unwrap_or_else(|| no_ports())
    }

    /// Port map of `side`, declaring it if it was absent.
    pub fn ports_mut(&mut self, side: PortSide) -> &mut PortMap {
        let map = match side {
            PortSide::Input => &mut self.input_ports,
            PortSide::Output => &mut self.output_ports,
        };
        map.get_or_insert_with(PortMap::new)
    }

    pub fn settings(&self) -> &Settings {
        self.settings.as_ref().unwrap_or_else(|| no_settings())
    }
}

/// A node: identity, position in the hierarchy, kind, and payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    kind: NodeKind,
    /// The entry carried an explicit `"parent": null`.
    pub(crate) null_parent: bool,
    pub value: NodeValue,
    /// Keys of the node entry other than `id`, `value`, `parent`.
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: NodeId, value: NodeValue, parent: Option<NodeId>) -> Self {
        Node {
            id,
            parent,
            kind: NodeKind::classify(&value),
            null_parent: false,
            value,
            extra: Map::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn input_ports(&self) -> &PortMap {
        self.value.ports(PortSide::Input)
    }

    pub fn output_ports(&self) -> &PortMap {
        self.value.ports(PortSide::Output)
    }
}

// ── Edges ───────────────────────────────────────────────────────────────────

/// Port pair carried by an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeValue {
    pub out_port: String,
    pub in_port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub value: EdgeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    /// A plain data edge between two ports.
    pub fn between(from: &PortRef, to: &PortRef) -> Self {
        Edge {
            source: from.node.clone(),
            target: to.node.clone(),
            value: EdgeValue {
                out_port: from.port.clone(),
                in_port: to.port.clone(),
                continuation: None,
                extra: Map::new(),
            },
            continuation: None,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn as_continuation(mut self) -> Self {
        self.continuation = Some(true);
        self
    }

    /// Continuation edges may be flagged on the edge or inside its value.
    pub fn is_continuation(&self) -> bool {
        self.continuation == Some(true) || self.value.continuation == Some(true)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn source_port(&self) -> PortRef {
        PortRef::on(&self.source, &self.value.out_port)
    }

    pub fn target_port(&self) -> PortRef {
        PortRef::on(&self.target, &self.value.in_port)
    }

    pub fn route(&self) -> EdgeRoute {
        EdgeRoute {
            source: self.source_port(),
            target: self.target_port(),
        }
    }
}

/// The routing of an edge, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeRoute {
    pub source: PortRef,
    pub target: PortRef,
}

impl fmt::Display for EdgeRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

// ── Graph ───────────────────────────────────────────────────────────────────

/// A network port graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortGraph {
    nodes: IndexMap<NodeId, Node>,
    edges: Vec<Edge>,
    /// Top-level document keys other than `nodes` and `edges`.
    pub meta: Map<String, Value>,
}

impl PortGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node, keeping its original position on replace.
    pub fn insert_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Add a node created by a normalization pass. Ids must be fresh.
    pub fn add_synthesized(&mut self, node: Node) -> Result<(), Diagnostic> {
        if self.nodes.contains_key(&node.id) {
            return Err(Diagnostic::error(
                codes::E0102,
                format!("synthesized node id '{}' is already in use", node.id),
            )
            .at_node(&node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn retain_edges(&mut self, keep: impl FnMut(&Edge) -> bool) {
        self.edges.retain(keep);
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.nodes.get(id).and_then(|n| n.parent.as_ref())
    }

    pub fn children<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .values()
            .filter(move |n| n.parent.as_ref() == Some(id))
    }

    /// Type of `port` on `node`, looked up on `side` first and then on the
    /// opposite side.
    pub fn port_type(&self, node: &NodeId, port: &str, side: PortSide) -> Option<&PortType> {
        let value = &self.nodes.get(node)?.value;
        let other = match side {
            PortSide::Input => PortSide::Output,
            PortSide::Output => PortSide::Input,
        };
        value
            .ports(side)
            .get(port)
            .or_else(|| value.ports(other).get(port))
    }
}

impl fmt::Display for PortGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PortGraph ({} nodes, {} edges)",
            self.nodes.len(),
            self.edges.len()
        )?;
        for node in self.nodes.values() {
            write!(
                f,
                "  node {} = {} [{}]",
                node.id,
                node.value.component(),
                node.kind
            )?;
            if let Some(parent) = &node.parent {
                write!(f, " in {}", parent)?;
            }
            writeln!(f)?;
        }
        for edge in &self.edges {
            write!(f, "  edge {}", edge.route())?;
            if edge.is_continuation() {
                write!(f, " (continuation)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
