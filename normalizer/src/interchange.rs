// interchange.rs — JSON interchange for port graphs
//
// Wire shape:
//   { "nodes": [ { "id", "value", "parent"? } ],
//     "edges": [ { "source", "target", "value": { "outPort", "inPort" },
//                  "continuation"?, "name"? } ],
//     ...other top-level keys }
// Keys the normalizer does not interpret are carried through unchanged, so a
// graph that no pass touches serializes back to an equivalent document.
//
// Also provides the canonical compact encoding and its SHA-256 fingerprint,
// used to compare normalization results.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::graph::{Edge, Node, NodeId, NodeValue, PortGraph};

/// A node as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: NodeId,
    #[serde(default)]
    pub value: NodeValue,
    /// `None` when the key is absent, `Some(None)` for an explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<Option<NodeId>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<NodeId>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NodeId>::deserialize(deserializer).map(Some)
}

/// A whole graph as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<NodeEntry> for Node {
    fn from(entry: NodeEntry) -> Self {
        let null_parent = matches!(entry.parent, Some(None));
        let mut node = Node::new(entry.id, entry.value, entry.parent.flatten());
        node.null_parent = null_parent;
        node.extra = entry.extra;
        node
    }
}

impl From<&Node> for NodeEntry {
    fn from(node: &Node) -> Self {
        NodeEntry {
            id: node.id.clone(),
            value: node.value.clone(),
            parent: match (&node.parent, node.null_parent) {
                (Some(parent), _) => Some(Some(parent.clone())),
                (None, true) => Some(None),
                (None, false) => None,
            },
            extra: node.extra.clone(),
        }
    }
}

impl From<GraphDocument> for PortGraph {
    fn from(doc: GraphDocument) -> Self {
        let mut graph = PortGraph::new();
        graph.meta = doc.extra;
        for entry in doc.nodes {
            graph.insert_node(entry.into());
        }
        for edge in doc.edges {
            graph.push_edge(edge);
        }
        graph
    }
}

impl From<&PortGraph> for GraphDocument {
    fn from(graph: &PortGraph) -> Self {
        GraphDocument {
            nodes: graph.nodes().map(NodeEntry::from).collect(),
            edges: graph.edges().to_vec(),
            extra: graph.meta.clone(),
        }
    }
}

impl PortGraph {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let doc: GraphDocument = serde_json::from_str(text)?;
        Ok(doc.into())
    }

    pub fn from_json_value(value: Value) -> Result<Self, serde_json::Error> {
        let doc: GraphDocument = serde_json::from_value(value)?;
        Ok(doc.into())
    }

    pub fn to_json_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(GraphDocument::from(self))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&GraphDocument::from(self))
    }
}

/// Compact JSON with node, edge and port order as stored.
pub fn canonical_json(graph: &PortGraph) -> Result<String, serde_json::Error> {
    serde_json::to_string(&GraphDocument::from(graph))
}

/// SHA-256 of `canonical_json`, hex encoded (64 characters).
pub fn fingerprint(graph: &PortGraph) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(graph)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(bytes_to_hex(&hasher.finalize()))
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PortType;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "options": {"directed": true, "multigraph": true, "compound": true},
            "nodes": [
                {"id": "A", "value": {
                    "id": "math/const", "version": "0.1.0", "atomic": true,
                    "inputPorts": {}, "outputPorts": {"output": "number"},
                    "params": {"value": 1}
                }},
                {"id": "B", "value": {
                    "id": "my/comp", "atomic": false,
                    "inputPorts": {"x": "number", "a": {"type": "list"}},
                    "outputPorts": {},
                    "settings": {"argumentOrdering": ["x", "a"], "other": 3}
                }, "parent": "P"},
                {"id": "P", "value": {"id": "functional/lambda", "inputPorts": {}, "outputPorts": {}}}
            ],
            "edges": [
                {"source": "A", "target": "B", "value": {"outPort": "output", "inPort": "x"}, "name": "e0"},
                {"source": "A", "target": "B", "value": {"outPort": "output", "inPort": "a", "continuation": true}}
            ]
        })
    }

    #[test]
    fn round_trip_is_lossless() {
        let graph = PortGraph::from_json_value(sample()).unwrap();
        assert_eq!(graph.to_json_value().unwrap(), sample());
    }

    #[test]
    fn round_trip_keeps_absent_and_empty_keys_apart() {
        let doc = json!({
            "nodes": [
                {"id": "A", "value": {"atomic": true, "inputPorts": {}, "settings": {}}},
                {"id": "B", "value": {"id": "my/comp", "outputPorts": {"o": "int"}}, "parent": null},
                {"id": "C", "value": {}, "parent": "B"}
            ],
            "edges": []
        });
        let graph = PortGraph::from_json_value(doc.clone()).unwrap();
        assert_eq!(graph.to_json_value().unwrap(), doc);

        let b = graph.node(&NodeId::new("B")).unwrap();
        assert!(b.parent.is_none());
        assert!(b.input_ports().is_empty());
        assert_eq!(graph.node(&NodeId::new("A")).unwrap().value.component(), "");
    }

    #[test]
    fn import_classifies_and_preserves_order() {
        let graph = PortGraph::from_json_value(sample()).unwrap();
        let ids: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "P"]);

        let b = graph.node(&NodeId::new("B")).unwrap();
        assert!(!b.kind().is_atomic() && !b.kind().is_lambda());
        assert_eq!(b.input_ports().keys().collect::<Vec<_>>(), vec!["x", "a"]);
        assert!(matches!(b.input_ports()["a"], PortType::Structured(_)));
        assert_eq!(graph.parent(&b.id), Some(&NodeId::new("P")));
        assert!(graph.node(&NodeId::new("P")).unwrap().kind().is_lambda());
        assert!(graph.edges()[1].is_continuation());
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let graph = PortGraph::from_json_value(sample()).unwrap();
        let first = fingerprint(&graph).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, fingerprint(&graph.clone()).unwrap());

        let mut changed = graph.clone();
        changed.retain_edges(|e| !e.is_continuation());
        assert_ne!(first, fingerprint(&changed).unwrap());
    }

    #[test]
    fn rejects_edges_without_ports() {
        let bad = json!({"nodes": [], "edges": [{"source": "A", "target": "B", "value": {}}]});
        assert!(PortGraph::from_json_value(bad).is_err());
    }
}
