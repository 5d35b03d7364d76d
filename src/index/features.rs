//! Feature engine: per-note scalar features, geodesic distances, and the
//! merged per-query feature table the relatedness pipeline consumes.

use std::collections::{HashMap, HashSet, VecDeque};

use regex::Regex;
use serde::Serialize;

use crate::index::graph::LinkGraph;
use crate::index::Snapshot;

/// Scalar features of a single note (or link-only graph node).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteFeatures {
    pub name_n_chars: usize,
    pub name_n_words: usize,
    pub plaintext_n_chars: usize,
    pub plaintext_n_words: usize,
    pub is_daily: bool,
    pub exists: bool,
}

/// One candidate row of the per-query feature table.
///
/// `distance: None` is the infinite sentinel for unreachable nodes;
/// `jaccard: None` means the pair is absent from the similarity index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub name: String,
    pub jaccard: Option<f64>,
    pub distance: Option<u32>,
    pub semantic: Option<f32>,
    #[serde(flatten)]
    pub features: NoteFeatures,
}

/// Scalar features for `name`, pure in the note plus graph/store membership.
/// Link-only nodes have no content, so their plaintext counts are zero.
pub fn note_features(name: &str, snapshot: &Snapshot, daily_re: &Regex) -> NoteFeatures {
    let plaintext = snapshot
        .notes
        .get(name)
        .map(|note| note.plaintext.as_str())
        .unwrap_or("");

    NoteFeatures {
        name_n_chars: name.chars().count(),
        name_n_words: name.split_whitespace().count(),
        plaintext_n_chars: plaintext.chars().count(),
        plaintext_n_words: plaintext.split_whitespace().count(),
        is_daily: is_daily(name, daily_re),
        exists: snapshot.notes.contains_key(name),
    }
}

/// True if the note name matches the daily-note pattern at its start.
pub fn is_daily(name: &str, daily_re: &Regex) -> bool {
    daily_re
        .find(name)
        .map(|m| m.start() == 0)
        .unwrap_or(false)
}

/// Single-source BFS over the undirected projection. The source maps to 0;
/// unreached nodes are absent from the result.
pub fn geodesic_distances(source: &str, graph: &LinkGraph) -> HashMap<String, u32> {
    let mut distances = HashMap::new();
    if !graph.contains(source) {
        return distances;
    }

    distances.insert(source.to_string(), 0);
    let mut queue = VecDeque::from([source.to_string()]);

    while let Some(current) = queue.pop_front() {
        let next = distances[&current] + 1;
        for neighbor in graph.neighbors(&current) {
            if !distances.contains_key(neighbor) {
                distances.insert(neighbor.to_string(), next);
                queue.push_back(neighbor.to_string());
            }
        }
    }

    distances
}

/// Build the merged feature table for one query note: the similarity index
/// rows outer-joined with geodesic distances and per-note scalar features,
/// left-joined with semantic scores when available. Rows exist for every
/// node that is reachable or has a stored coefficient; rows are sorted by
/// name so rebuilds are reproducible.
pub fn merged_feature_table(
    query: &str,
    snapshot: &Snapshot,
    semantic: Option<&HashMap<String, f32>>,
) -> Vec<FeatureRow> {
    let coefficients: HashMap<&str, f64> = snapshot
        .similarity
        .neighbors_of(query)
        .iter()
        .map(|(name, jaccard)| (name.as_str(), *jaccard))
        .collect();

    let distances = geodesic_distances(query, &snapshot.graph);

    let mut names: HashSet<&str> = coefficients.keys().copied().collect();
    names.extend(distances.keys().map(String::as_str));
    names.remove(query);

    let mut names: Vec<&str> = names.into_iter().collect();
    names.sort_unstable();

    names
        .into_iter()
        .map(|name| FeatureRow {
            name: name.to_string(),
            jaccard: coefficients.get(name).copied(),
            distance: distances.get(name).copied(),
            semantic: semantic.and_then(|scores| scores.get(name).copied()),
            features: note_features(name, snapshot, &snapshot.daily_re),
        })
        .collect()
}
