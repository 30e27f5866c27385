//! `graph` crate — DAG construction, validation, and topological ordering.
//!
//! Generalizes the teacher's `engine::dag` module (a flat
//! `validate_dag(&Workflow) -> Vec<String>` function) into a standalone,
//! reusable `Graph` type with adjacency queries, so the execution engine
//! can ask "what feeds into node X" without re-deriving it from the raw
//! edge list on every lookup.

mod ring;

use std::collections::{HashMap, HashSet};

use ring::RingQueue;
use thiserror::Error;

/// A directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Errors raised while constructing or sorting a [`Graph`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    #[error("edge references unknown node '{node_id}' ({side} side)")]
    DanglingEdge { node_id: String, side: &'static str },

    #[error("workflow graph contains a cycle")]
    CycleDetected,
}

/// A validated directed graph over node ids, ready for topological
/// ordering and adjacency queries.
pub struct Graph {
    node_ids: Vec<String>,
    edges: Vec<GraphEdge>,
    adjacency: HashMap<String, Vec<usize>>,
    reverse_adjacency: HashMap<String, Vec<usize>>,
}

impl Graph {
    /// Build a graph from a node-id list and an edge list.
    ///
    /// O(V+E), no I/O. Only structural typing is validated here
    /// (uniqueness of ids, edge endpoints existing) — cycle detection
    /// happens in [`Graph::topological_sort`].
    pub fn new(node_ids: Vec<String>, edges: Vec<GraphEdge>) -> Result<Self, GraphError> {
        let mut seen = HashSet::with_capacity(node_ids.len());
        for id in &node_ids {
            if !seen.insert(id.as_str()) {
                return Err(GraphError::DuplicateNodeId(id.clone()));
            }
        }

        let node_set: HashSet<&str> = node_ids.iter().map(|s| s.as_str()).collect();
        for edge in &edges {
            if !node_set.contains(edge.source.as_str()) {
                return Err(GraphError::DanglingEdge {
                    node_id: edge.source.clone(),
                    side: "from",
                });
            }
            if !node_set.contains(edge.target.as_str()) {
                return Err(GraphError::DanglingEdge {
                    node_id: edge.target.clone(),
                    side: "to",
                });
            }
        }

        let mut adjacency: HashMap<String, Vec<usize>> =
            node_ids.iter().map(|id| (id.clone(), Vec::new())).collect();
        let mut reverse_adjacency: HashMap<String, Vec<usize>> =
            node_ids.iter().map(|id| (id.clone(), Vec::new())).collect();

        for (idx, edge) in edges.iter().enumerate() {
            adjacency.get_mut(&edge.source).unwrap().push(idx);
            reverse_adjacency.get_mut(&edge.target).unwrap().push(idx);
        }

        Ok(Self { node_ids, edges, adjacency, reverse_adjacency })
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Edges whose `target` is `id`, in declaration order.
    pub fn input_edges(&self, id: &str) -> Vec<&GraphEdge> {
        self.reverse_adjacency
            .get(id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.edges[idx])
            .collect()
    }

    /// Edges whose `source` is `id`, in declaration order.
    pub fn output_edges(&self, id: &str) -> Vec<&GraphEdge> {
        self.adjacency
            .get(id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.edges[idx])
            .collect()
    }

    /// Nodes with out-degree 0.
    pub fn terminal_nodes(&self) -> Vec<&str> {
        self.node_ids
            .iter()
            .filter(|id| self.adjacency.get(id.as_str()).map_or(true, Vec::is_empty))
            .map(String::as_str)
            .collect()
    }

    /// Nodes with in-degree 0 ("source nodes"), sorted lexicographically.
    pub fn source_nodes(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self
            .node_ids
            .iter()
            .filter(|id| self.reverse_adjacency.get(id.as_str()).map_or(true, Vec::is_empty))
            .map(String::as_str)
            .collect();
        sources.sort_unstable();
        sources
    }

    /// Kahn's algorithm with deterministic, lexicographically ordered
    /// tie-breaking among nodes that become ready simultaneously.
    ///
    /// This determinism is a documented contract: two runs of the same
    /// workflow always produce the same order, which is what makes
    /// snapshot/restore meaningful.
    ///
    /// # Errors
    /// [`GraphError::CycleDetected`] if fewer than `len()` nodes are
    /// emitted.
    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        let mut in_degree: HashMap<&str, usize> = self
            .node_ids
            .iter()
            .map(|id| (id.as_str(), self.reverse_adjacency[id].len()))
            .collect();

        let mut queue: RingQueue<String> = RingQueue::with_capacity(self.node_ids.len());
        for id in self.source_nodes() {
            queue.push_back(id.to_owned());
        }

        let mut order: Vec<String> = Vec::with_capacity(self.node_ids.len());
        // Nodes that become ready mid-sort are batched and flushed in
        // lexicographic order before the next dequeue, so ties are broken
        // the same way regardless of edge declaration order.
        let mut newly_ready: Vec<String> = Vec::new();

        while !queue.is_empty() || !newly_ready.is_empty() {
            if queue.is_empty() {
                newly_ready.sort_unstable();
                for id in newly_ready.drain(..) {
                    queue.push_back(id);
                }
            }

            let Some(node_id) = queue.pop_front() else { break };
            order.push(node_id.clone());

            for edge in self.output_edges(&node_id) {
                let degree = in_degree.get_mut(edge.target.as_str()).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    newly_ready.push(edge.target.clone());
                }
            }
        }

        if order.len() != self.node_ids.len() {
            return Err(GraphError::CycleDetected);
        }

        Ok(order)
    }
}
