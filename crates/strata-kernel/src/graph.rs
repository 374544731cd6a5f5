//! Dependency graph and deterministic topological ordering
//!
//! Nodes and edges live in a `petgraph` [`DiGraph`] and are addressed by
//! their insertion index. Edges are never removed, so edge indices record
//! discovery order. The Kahn traversal takes ready nodes first-in, first-out
//! and releases successors in that discovery order, which makes it
//! reproducible.

use crate::error::GraphError;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Directed graph over schedulable nodes
#[derive(Debug, Clone)]
pub struct TaskGraph<N> {
    graph: DiGraph<N, ()>,
}

impl<N> TaskGraph<N> {
    /// Create empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
        }
    }

    /// Build the producer → consumer graph over `items`.
    ///
    /// Each item is `(node, inputs, outputs)`. An edge runs from every node
    /// producing an artifact to every node consuming it. Edges are discovered
    /// per node in item order, then per output in position order, then per
    /// consumer in item order.
    #[must_use]
    pub fn from_artifacts<K, I>(items: I) -> Self
    where
        K: Eq + Hash,
        I: IntoIterator<Item = (N, Vec<K>, Vec<K>)>,
    {
        let mut graph = Self::new();
        let mut produced: Vec<(NodeIndex, Vec<K>)> = Vec::new();
        let mut consumers: HashMap<K, Vec<NodeIndex>> = HashMap::new();

        for (node, inputs, outputs) in items {
            let index = graph.graph.add_node(node);
            for input in inputs {
                let readers = consumers.entry(input).or_default();
                if readers.last() != Some(&index) {
                    readers.push(index);
                }
            }
            produced.push((index, outputs));
        }

        for (producer, outputs) in &produced {
            for output in outputs {
                for &consumer in consumers.get(output).into_iter().flatten() {
                    graph.push_edge(*producer, consumer);
                }
            }
        }
        graph
    }

    /// Append a node, returning its index
    pub fn add_node(&mut self, node: N) -> usize {
        self.graph.add_node(node).index()
    }

    /// Add edge `from -> to`. Returns `false` if the edge already existed.
    ///
    /// # Errors
    /// [`GraphError::NodeOutOfBounds`] if either endpoint is unknown
    pub fn add_edge(&mut self, from: usize, to: usize) -> Result<bool, GraphError> {
        let len = self.graph.node_count();
        for index in [from, to] {
            if index >= len {
                return Err(GraphError::NodeOutOfBounds { index, len });
            }
        }
        Ok(self.push_edge(NodeIndex::new(from), NodeIndex::new(to)))
    }

    fn push_edge(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Node at `index`
    #[inline]
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&N> {
        self.graph.node_weight(NodeIndex::new(index))
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.graph.node_weights()
    }

    /// Successors of `index` in discovery order
    #[must_use]
    pub fn successors(&self, index: usize) -> Vec<usize> {
        if index >= self.graph.node_count() {
            return Vec::new();
        }
        self.successor_indices(NodeIndex::new(index))
            .into_iter()
            .map(NodeIndex::index)
            .collect()
    }

    fn successor_indices(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Number of predecessors of `index`
    #[must_use]
    pub fn in_degree(&self, index: usize) -> usize {
        if index >= self.graph.node_count() {
            return 0;
        }
        self.graph
            .neighbors_directed(NodeIndex::new(index), Direction::Incoming)
            .count()
    }

    /// Nodes without predecessors, in index order
    #[must_use]
    pub fn ready(&self) -> Vec<usize> {
        (0..self.graph.node_count())
            .filter(|&i| self.in_degree(i) == 0)
            .collect()
    }

    /// Whether any dependency cycle exists
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if graph has no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of distinct edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Consume the graph, returning its nodes in index order
    #[must_use]
    pub fn into_nodes(self) -> Vec<N> {
        let (nodes, _) = self.graph.into_nodes_edges();
        nodes.into_iter().map(|node| node.weight).collect()
    }
}

impl<N: fmt::Display> TaskGraph<N> {
    /// Group nodes into dependency levels.
    ///
    /// Level 0 holds the initially ready nodes in index order; each following
    /// level holds the nodes whose last predecessor sat in the previous level,
    /// in the order they became ready.
    ///
    /// # Errors
    /// [`GraphError::GraphHasCycle`] naming every node that could not be placed
    pub fn levels(&self) -> Result<Vec<Vec<usize>>, GraphError> {
        let mut remaining: Vec<usize> = (0..self.len()).map(|i| self.in_degree(i)).collect();
        let mut current: Vec<NodeIndex> = self.ready().into_iter().map(NodeIndex::new).collect();
        let mut levels = Vec::new();
        let mut placed = 0;

        while !current.is_empty() {
            placed += current.len();
            let mut next = Vec::new();
            for &node in &current {
                for succ in self.successor_indices(node) {
                    let degree = &mut remaining[succ.index()];
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(succ);
                    }
                }
            }
            levels.push(current.iter().map(|i| i.index()).collect());
            current = next;
        }

        if placed < self.len() {
            let nodes = remaining
                .iter()
                .enumerate()
                .filter(|(_, degree)| **degree > 0)
                .filter_map(|(i, _)| self.node(i))
                .map(ToString::to_string)
                .collect();
            return Err(GraphError::GraphHasCycle { nodes });
        }

        tracing::trace!(nodes = self.len(), levels = levels.len(), "ordered graph");
        Ok(levels)
    }

    /// Topological order: the levels flattened.
    ///
    /// Equivalent to a first-in first-out Kahn traversal seeded with the
    /// ready nodes in index order.
    ///
    /// # Errors
    /// [`GraphError::GraphHasCycle`] if the graph is cyclic
    pub fn order(&self) -> Result<Vec<usize>, GraphError> {
        Ok(self.levels()?.into_iter().flatten().collect())
    }
}

impl<N> Default for TaskGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}
