//! Bridges the engine's `Edge` (which carries `sourceHandle`/`targetHandle`)
//! onto the `graph` crate's structural `Graph` (which only knows
//! source/target). `graph::Graph` does the topological-sort heavy lifting;
//! `GraphView` keeps the handle-bearing edges alongside it so gating logic
//! can still ask "which edges feed node X, in declaration order".

use std::collections::HashSet;

use graph::{Graph, GraphEdge, GraphError};

use crate::models::Edge;

pub struct GraphView {
    edges: Vec<Edge>,
    inner: Graph,
}

impl GraphView {
    pub fn new(node_ids: Vec<String>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let graph_edges =
            edges.iter().map(|e| GraphEdge { source: e.source.clone(), target: e.target.clone() }).collect();
        let inner = Graph::new(node_ids, graph_edges)?;
        Ok(Self { edges, inner })
    }

    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        self.inner.topological_sort()
    }

    pub fn terminal_nodes(&self) -> Vec<&str> {
        self.inner.terminal_nodes()
    }

    pub fn input_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.target == node_id).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new()).unwrap()
    }

    #[cfg(test)]
    pub fn from_edges(edges: Vec<Edge>) -> Self {
        let mut ids: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for e in &edges {
            if seen.insert(e.source.clone()) {
                ids.push(e.source.clone());
            }
            if seen.insert(e.target.clone()) {
                ids.push(e.target.clone());
            }
        }
        Self::new(ids, edges).unwrap()
    }
}
