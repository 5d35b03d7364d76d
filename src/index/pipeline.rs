//! Relatedness pipeline: an ordered list of named category rules, each a
//! pure filter + sort + limit over the merged feature table, emitting a
//! titled section of recommendations.
//!
//! Every category requires `distance >= 2`: the query note (distance 0) and
//! its direct neighbors (distance 1) are never recommended, since directly
//! linked notes are already visible to the user. Missing jaccard, semantic,
//! or distance values fail every threshold clause.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::CategoryLimits;
use crate::index::features::{FeatureRow, NoteFeatures};

/// Minimum graph distance for a candidate in any category.
const MIN_DISTANCE: u32 = 2;

/// Word count below which a note's content is not considered substantive.
const MIN_SUBSTANTIVE_WORDS: usize = 10;

/// Name word count separating Short from Long candidates.
const SHORT_NAME_WORDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Long,
    Short,
    Daily,
    Nonexistent,
    Semantic,
}

/// One named filter+sort+limit rule.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub kind: CategoryKind,
    pub title: &'static str,
    pub limit: usize,
}

/// The fixed category sequence, in emission order.
pub fn categories(limits: &CategoryLimits, include_semantic: bool) -> Vec<Category> {
    let mut list = vec![
        Category {
            kind: CategoryKind::Long,
            title: "Long",
            limit: limits.long,
        },
        Category {
            kind: CategoryKind::Short,
            title: "Short",
            limit: limits.short,
        },
        Category {
            kind: CategoryKind::Daily,
            title: "Daily",
            limit: limits.daily,
        },
        Category {
            kind: CategoryKind::Nonexistent,
            title: "Nonexistent",
            limit: limits.nonexistent,
        },
    ];

    if include_semantic {
        list.push(Category {
            kind: CategoryKind::Semantic,
            title: "Semantic",
            limit: limits.semantic,
        });
    }

    list
}

impl CategoryKind {
    /// The full filter predicate for this category. Null-safe: rows with a
    /// missing jaccard, distance, or semantic score fail the corresponding
    /// clause instead of raising.
    pub fn matches(&self, row: &FeatureRow) -> bool {
        let f = &row.features;
        let indirect = matches!(row.distance, Some(d) if d >= MIN_DISTANCE);
        let linked = matches!(row.jaccard, Some(j) if j > 0.0);

        match self {
            CategoryKind::Long => {
                !f.is_daily
                    && f.name_n_words > SHORT_NAME_WORDS
                    && f.plaintext_n_words >= MIN_SUBSTANTIVE_WORDS
                    && indirect
                    && linked
            }
            CategoryKind::Short => {
                !f.is_daily
                    && f.name_n_words <= SHORT_NAME_WORDS
                    && f.plaintext_n_words >= MIN_SUBSTANTIVE_WORDS
                    && indirect
                    && linked
            }
            CategoryKind::Daily => f.is_daily && indirect && linked,
            CategoryKind::Nonexistent => {
                (!f.exists || f.plaintext_n_words < MIN_SUBSTANTIVE_WORDS) && indirect && linked
            }
            CategoryKind::Semantic => !f.is_daily && indirect && row.semantic.is_some(),
        }
    }

    /// The descending sort key, which is also the emitted score.
    pub fn score(&self, row: &FeatureRow) -> f64 {
        match self {
            CategoryKind::Semantic => row.semantic.map(f64::from).unwrap_or(0.0),
            _ => row.jaccard.unwrap_or(0.0),
        }
    }
}

/// One element of the ordered recommendation list: either a section-title
/// marker or an item row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelatedEntry {
    Section {
        #[serde(rename = "sectionTitle")]
        section_title: String,
    },
    Item(RelatedItem),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedItem {
    pub path: String,
    pub name: String,
    pub info: RelatedInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedInfo {
    pub score: f64,
    pub features: NoteFeatures,
}

/// Evaluate the category sequence over the feature table. Categories with
/// no matching rows are skipped entirely (no dangling titles); within a
/// category rows sort by score descending with the name as tie-break, so a
/// fixed snapshot always yields the same list.
pub fn run(
    table: &[FeatureRow],
    categories: &[Category],
    file_index: &HashMap<String, PathBuf>,
) -> Vec<RelatedEntry> {
    let mut entries = Vec::new();

    for category in categories {
        let mut rows: Vec<&FeatureRow> = table
            .iter()
            .filter(|row| category.kind.matches(row))
            .collect();

        rows.sort_by(|a, b| {
            let sa = category.kind.score(a);
            let sb = category.kind.score(b);
            sb.partial_cmp(&sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        rows.truncate(category.limit);

        if rows.is_empty() {
            continue;
        }

        entries.push(RelatedEntry::Section {
            section_title: category.title.to_string(),
        });
        entries.extend(rows.into_iter().map(|row| {
            RelatedEntry::Item(RelatedItem {
                path: candidate_path(&row.name, file_index),
                name: row.name.clone(),
                info: RelatedInfo {
                    score: category.kind.score(row),
                    features: row.features.clone(),
                },
            })
        }));
    }

    entries
}

/// Vault-relative path for a candidate; nonexistent notes get the path the
/// note would be created at.
fn candidate_path(name: &str, file_index: &HashMap<String, PathBuf>) -> String {
    match file_index.get(name) {
        Some(path) => path.to_string_lossy().into_owned(),
        None => format!("{name}.md"),
    }
}
