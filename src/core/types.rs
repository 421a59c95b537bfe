//! Core type definitions for the precomputation pipeline
//!
//! The dependency graph is the moralised (undirected) graph of the underlying
//! graphical model, represented through paired directed edges with a
//! "source depends on target" semantic. Observed nodes have no outgoing
//! edges. Sample data is attached per directed edge as an ordered pair of
//! sample matrices, sampled once per undirected edge and shared by both
//! directions.

use nalgebra::DMatrix;
use std::collections::{BTreeMap, HashMap};

/// Vertex identifier, matching the consumer engine's vertex id type.
pub type NodeId = u32;

/// Map of observed nodes to their scalar observation value.
///
/// A `BTreeMap` so that iteration is ascending by node id, which the
/// pipeline relies on for reproducible output.
pub type Observations = BTreeMap<NodeId, f64>;

/// Directed edge (source, target): "message at source depends on target".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectedEdge {
    pub source: NodeId,
    pub target: NodeId,
}

impl DirectedEdge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    /// The same undirected edge traversed the other way.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target,
            target: self.source,
        }
    }
}

/// Moralised undirected graph with deterministically ordered adjacency.
///
/// Neighbor lists are kept sorted and deduplicated, and nodes iterate in
/// ascending id order, so every traversal over the graph is reproducible.
#[derive(Debug, Clone, Default)]
pub struct MoralGraph {
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
}

impl MoralGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from (node, neighbors) pairs.
    pub fn from_adjacency<I, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, N)>,
        N: IntoIterator<Item = NodeId>,
    {
        let mut graph = Self::new();
        for (node, neighbors) in entries {
            for neighbor in neighbors {
                graph.add_undirected_edge(node, neighbor);
            }
        }
        graph
    }

    /// Insert the undirected edge {a, b}, registering both endpoints.
    pub fn add_undirected_edge(&mut self, a: NodeId, b: NodeId) {
        for (node, neighbor) in [(a, b), (b, a)] {
            let neighbors = self.adjacency.entry(node).or_default();
            if let Err(pos) = neighbors.binary_search(&neighbor) {
                neighbors.insert(pos, neighbor);
            }
        }
    }

    /// Sorted neighbors of `node` (empty if unknown).
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate nodes and their sorted neighbor lists, ascending by node id.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[NodeId])> {
        self.adjacency
            .iter()
            .map(|(&node, neighbors)| (node, neighbors.as_slice()))
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Derive the directed edge list: both directions of every undirected
    /// edge, except edges whose source node is observed (observed nodes have
    /// no outgoing edges). Sorted by (source, target).
    pub fn directed_edges(&self, observations: &Observations) -> Vec<DirectedEdge> {
        let mut edges = Vec::new();
        for (node, neighbors) in self.iter() {
            if observations.contains_key(&node) {
                continue;
            }
            for &neighbor in neighbors {
                edges.push(DirectedEdge::new(node, neighbor));
            }
        }
        // adjacency iteration already yields (source, target) in sorted order
        edges
    }
}

/// Sample pair attached to a directed edge: one sample set drawn from the
/// source node's marginal and one from the target's. Rows are samples.
#[derive(Debug, Clone)]
pub struct SamplePair {
    pub source: DMatrix<f64>,
    pub target: DMatrix<f64>,
}

impl SamplePair {
    pub fn new(source: DMatrix<f64>, target: DMatrix<f64>) -> Self {
        Self { source, target }
    }
}

/// Per-directed-edge sample data.
///
/// Lookup-only; all deterministic iteration happens through the graph.
#[derive(Debug, Clone, Default)]
pub struct EdgeSampleMap {
    samples: HashMap<(NodeId, NodeId), SamplePair>,
}

impl EdgeSampleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach sample sets for the undirected edge {a, b}: edge (a, b) gets
    /// (samples_a, samples_b) and edge (b, a) the swapped pair, so both
    /// directions share the data drawn once for the undirected edge.
    pub fn insert_undirected(
        &mut self,
        a: NodeId,
        b: NodeId,
        samples_a: DMatrix<f64>,
        samples_b: DMatrix<f64>,
    ) {
        self.samples.insert(
            (b, a),
            SamplePair::new(samples_b.clone(), samples_a.clone()),
        );
        self.samples
            .insert((a, b), SamplePair::new(samples_a, samples_b));
    }

    pub fn get(&self, source: NodeId, target: NodeId) -> Option<&SamplePair> {
        self.samples.get(&(source, target))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
