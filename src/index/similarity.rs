//! Pairwise Jaccard neighborhood-overlap index.
//!
//! Computed eagerly over the whole undirected projection at load time, so
//! query-time lookup is a map access rather than a graph traversal. A pair
//! is stored when the union of the two open neighborhoods is nonzero; pairs
//! where both neighborhoods are empty have an undefined coefficient and are
//! omitted.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::index::graph::LinkGraph;

pub struct SimilarityIndex {
    /// Flat pair list, `(a, b)` with `a < b`.
    pairs: Vec<(String, String, f64)>,
    /// Name-indexed symmetrized view into the pair list.
    by_name: HashMap<String, Vec<(String, f64)>>,
}

impl SimilarityIndex {
    /// Compute coefficients for every qualifying pair of graph nodes.
    /// Pair batches are independent, so the outer loop runs on rayon.
    pub fn build(graph: &LinkGraph) -> Self {
        let mut names: Vec<&str> = graph.names().collect();
        names.sort_unstable();

        let hoods: Vec<_> = names.iter().map(|name| graph.neighbors(name)).collect();

        let pairs: Vec<(String, String, f64)> = (0..names.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let names = &names;
                let hoods = &hoods;
                (i + 1..names.len()).filter_map(move |j| {
                    let inter = hoods[i].intersection(&hoods[j]).count();
                    let union = hoods[i].len() + hoods[j].len() - inter;
                    if union == 0 {
                        return None;
                    }
                    let jaccard = inter as f64 / union as f64;
                    Some((names[i].to_string(), names[j].to_string(), jaccard))
                })
            })
            .collect();

        let mut by_name: HashMap<String, Vec<(String, f64)>> = HashMap::new();
        for (a, b, jaccard) in &pairs {
            by_name
                .entry(a.clone())
                .or_default()
                .push((b.clone(), *jaccard));
            by_name
                .entry(b.clone())
                .or_default()
                .push((a.clone(), *jaccard));
        }

        SimilarityIndex { pairs, by_name }
    }

    /// All stored coefficients touching `name`, from either side of the pair.
    pub fn neighbors_of(&self, name: &str) -> &[(String, f64)] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pairs(&self) -> impl Iterator<Item = &(String, String, f64)> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
