//! Directed link multigraph over note names.
//!
//! Nodes are note names; one edge per link occurrence, so parallel edges are
//! allowed. Similarity and distance computations run over the undirected
//! projection, exposed here as deduplicated open neighborhoods.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Default, Debug)]
pub struct LinkGraph {
    graph: DiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name` as a node if absent, returning its index.
    pub fn ensure_node(&mut self, name: &str) -> NodeIndex {
        match self.indices.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.graph.add_node(name.to_string());
                self.indices.insert(name.to_string(), idx);
                idx
            }
        }
    }

    /// Record one `from → to` reference. Repeated calls add parallel edges.
    pub fn add_link(&mut self, from: &str, to: &str) {
        let a = self.ensure_node(from);
        let b = self.ensure_node(to);
        self.graph.add_edge(a, b, ());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node names, unsorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    /// Open neighborhood of `name` in the undirected projection, with
    /// parallel edges collapsed. Unknown names have an empty neighborhood.
    pub fn neighbors(&self, name: &str) -> HashSet<&str> {
        let Some(&idx) = self.indices.get(name) else {
            return HashSet::new();
        };

        self.graph
            .neighbors_undirected(idx)
            .filter(|&n| n != idx)
            .filter_map(|n| self.graph.node_weight(n))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_edges_counted_once_in_neighborhood() {
        let mut graph = LinkGraph::new();
        graph.add_link("A", "B");
        graph.add_link("A", "B");

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.neighbors("A"), HashSet::from(["B"]));
    }

    #[test]
    fn test_neighborhood_is_undirected() {
        let mut graph = LinkGraph::new();
        graph.add_link("A", "B");

        assert_eq!(graph.neighbors("B"), HashSet::from(["A"]));
    }

    #[test]
    fn test_unknown_name_has_empty_neighborhood() {
        let graph = LinkGraph::new();
        assert!(graph.neighbors("Nope").is_empty());
    }

    #[test]
    fn test_self_loop_excluded_from_open_neighborhood() {
        let mut graph = LinkGraph::new();
        graph.add_link("A", "A");
        graph.add_link("A", "B");

        assert_eq!(graph.neighbors("A"), HashSet::from(["B"]));
    }
}
