use std::collections::HashMap;

use crate::graph::{Edge, NodeId, PortGraph, PortRef};

/// Edge positions grouped by node and by port, built once per pass over a
/// frozen graph so neighbourhood queries do not rescan the edge list.
#[derive(Debug, Clone, Default)]
pub struct PortIndex {
    out_by_node: HashMap<NodeId, Vec<usize>>,
    in_by_node: HashMap<NodeId, Vec<usize>>,
    out_by_port: HashMap<PortRef, Vec<usize>>,
}

impl PortIndex {
    pub fn build(graph: &PortGraph) -> Self {
        let mut index = PortIndex::default();
        for (i, edge) in graph.edges().iter().enumerate() {
            index
                .out_by_node
                .entry(edge.source.clone())
                .or_default()
                .push(i);
            index
                .in_by_node
                .entry(edge.target.clone())
                .or_default()
                .push(i);
            index
                .out_by_port
                .entry(edge.source_port())
                .or_default()
                .push(i);
        }
        index
    }

    pub fn out_edges<'a>(
        &'a self,
        graph: &'a PortGraph,
        node: &NodeId,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        positions(&self.out_by_node, node)
            .iter()
            .filter_map(move |&i| graph.edges().get(i))
    }

    pub fn in_edges<'a>(
        &'a self,
        graph: &'a PortGraph,
        node: &NodeId,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        positions(&self.in_by_node, node)
            .iter()
            .filter_map(move |&i| graph.edges().get(i))
    }

    /// Number of edges leaving `port`, continuation edges included.
    pub fn out_degree(&self, port: &PortRef) -> usize {
        self.out_by_port.get(port).map_or(0, Vec::len)
    }
}

fn positions<'a, K>(map: &'a HashMap<K, Vec<usize>>, key: &K) -> &'a [usize]
where
    K: std::hash::Hash + Eq,
{
    map.get(key).map(Vec::as_slice).unwrap_or(&[])
}
