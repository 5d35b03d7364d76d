//! Vault parsing: walks a corpus root for markdown notes and turns their
//! `[[wikilinks]]` into a directed link multigraph plus a name → path index.
//!
//! Link targets that have no backing file stay in the graph as nonexistent
//! nodes; the graph's node set is always a superset of the file index keys.

pub mod plaintext;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::index::graph::LinkGraph;

static RE_WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("wikilink regex"));

#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    #[error("vault root {path} is not readable: {source}")]
    CorpusUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read note {path}: {source}")]
    NoteRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One parsed generation of the corpus: the link graph and the mapping from
/// note name to its path relative to the vault root.
#[derive(Debug)]
pub struct ParsedVault {
    pub graph: LinkGraph,
    pub file_index: HashMap<String, PathBuf>,
}

/// Parse the vault at `root`.
///
/// Every `*.md` file (dot-directories skipped) becomes a graph node named by
/// its file stem; every wikilink occurrence becomes one directed edge, so
/// repeated links between the same pair are kept as parallel edges.
pub fn parse(root: &Path) -> Result<ParsedVault, VaultError> {
    let meta = std::fs::metadata(root).map_err(|source| VaultError::CorpusUnavailable {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(VaultError::CorpusUnavailable {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        });
    }

    let mut file_index: HashMap<String, PathBuf> = HashMap::new();
    let mut files: Vec<(String, PathBuf)> = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !(entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with('.'))
                .unwrap_or(false))
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("skipping unreadable vault entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
            continue;
        }
        let name = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        if let Some(existing) = file_index.get(&name) {
            log::warn!(
                "duplicate note name \"{name}\" ({} vs {}), keeping the first",
                existing.display(),
                rel.display()
            );
            continue;
        }

        file_index.insert(name.clone(), rel);
        files.push((name, path.to_path_buf()));
    }

    // stable node insertion order keeps rebuilds deterministic
    files.sort();

    let mut graph = LinkGraph::new();
    for (name, path) in &files {
        graph.ensure_node(name);

        let raw = std::fs::read_to_string(path).map_err(|source| VaultError::NoteRead {
            path: path.clone(),
            source,
        })?;

        for target in extract_links(&raw) {
            graph.add_link(name, &target);
        }
    }

    log::info!(
        "parsed vault {}: {} notes, {} nodes, {} links",
        root.display(),
        file_index.len(),
        graph.node_count(),
        graph.edge_count()
    );

    Ok(ParsedVault { graph, file_index })
}

/// Extract wikilink targets from raw markdown, one entry per occurrence.
/// Alias (`|alias`) and heading (`#heading`) suffixes are stripped; fenced
/// code blocks are ignored.
pub fn extract_links(raw: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut in_fence = false;

    for line in raw.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        for caps in RE_WIKILINK.captures_iter(line) {
            let body = &caps[1];
            let target = body.split(['|', '#']).next().unwrap_or(body).trim();
            if !target.is_empty() {
                links.push(target.to_string());
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(format!("{name}.md")), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_extract_links_basic() {
        let links = extract_links("a [[B]] and [[C|alias]] and [[D#heading]]");
        assert_eq!(links, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_extract_links_counts_repeats() {
        let links = extract_links("[[B]] again [[B]]");
        assert_eq!(links, vec!["B", "B"]);
    }

    #[test]
    fn test_extract_links_skips_code_fences() {
        let links = extract_links("[[Real]]\n```\n[[NotReal]]\n```\n[[AlsoReal]]");
        assert_eq!(links, vec!["Real", "AlsoReal"]);
    }

    #[test]
    fn test_parse_builds_graph_and_index() {
        let dir = vault_with(&[("A", "[[B]] [[Ghost]]"), ("B", "[[A]]")]);
        let parsed = parse(dir.path()).unwrap();

        assert_eq!(parsed.file_index.len(), 2);
        assert!(parsed.graph.contains("A"));
        assert!(parsed.graph.contains("B"));
        // referenced but has no file: a nonexistent note
        assert!(parsed.graph.contains("Ghost"));
        assert!(!parsed.file_index.contains_key("Ghost"));
        assert_eq!(parsed.graph.edge_count(), 3);
    }

    #[test]
    fn test_parse_keeps_parallel_edges() {
        let dir = vault_with(&[("A", "[[B]] then [[B]] once more [[B]]")]);
        let parsed = parse(dir.path()).unwrap();
        assert_eq!(parsed.graph.edge_count(), 3);
    }

    #[test]
    fn test_parse_missing_root_is_corpus_unavailable() {
        let err = parse(Path::new("/nonexistent/vault/root")).unwrap_err();
        assert!(matches!(err, VaultError::CorpusUnavailable { .. }));
    }

    #[test]
    fn test_parse_skips_dot_directories() {
        let dir = vault_with(&[("A", "text")]);
        let hidden = dir.path().join(".obsidian");
        std::fs::create_dir(&hidden).unwrap();
        std::fs::write(hidden.join("Cache.md"), "[[A]]").unwrap();

        let parsed = parse(dir.path()).unwrap();
        assert!(!parsed.file_index.contains_key("Cache"));
        assert_eq!(parsed.graph.edge_count(), 0);
    }
}
