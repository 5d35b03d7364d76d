//! End-to-end tests of the vault index over real on-disk fixtures.

use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::index::pipeline::RelatedEntry;
use crate::index::{IndexError, VaultIndex};

fn test_config(base_dir: &std::path::Path, vault_dir: &std::path::Path) -> Arc<RwLock<Config>> {
    let mut config = Config::load_with(base_dir.to_str().unwrap());
    config.vault_path = vault_dir.to_str().unwrap().to_string();
    Arc::new(RwLock::new(config))
}

fn write_note(vault: &std::path::Path, name: &str, content: &str) {
    std::fs::write(vault.join(format!("{name}.md")), content).unwrap();
}

struct Fixture {
    _base: tempfile::TempDir,
    vault: tempfile::TempDir,
    config: Arc<RwLock<Config>>,
}

fn fixture(notes: &[(&str, &str)]) -> Fixture {
    let base = tempfile::tempdir().unwrap();
    let vault = tempfile::tempdir().unwrap();
    for (name, content) in notes {
        write_note(vault.path(), name, content);
    }
    let config = test_config(base.path(), vault.path());
    Fixture {
        _base: base,
        vault,
        config,
    }
}

fn section_titles(entries: &[RelatedEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            RelatedEntry::Section { section_title } => Some(section_title.clone()),
            RelatedEntry::Item(_) => None,
        })
        .collect()
}

fn item_names(entries: &[RelatedEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            RelatedEntry::Item(item) => Some(item.name.clone()),
            RelatedEntry::Section { .. } => None,
        })
        .collect()
}

#[test]
fn test_open_indexes_the_vault() {
    let fx = fixture(&[("A", "[[B]] hello"), ("B", "[[A]]")]);
    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();

    assert_eq!(index.note_count(), 2);
    assert_eq!(index.generation(), 1);

    let note = index.get_note("A").unwrap();
    assert_eq!(note.plaintext, "B hello");
}

#[test]
fn test_open_fails_on_missing_corpus() {
    let base = tempfile::tempdir().unwrap();
    let config = test_config(base.path(), std::path::Path::new("/nonexistent/vault"));

    let result = VaultIndex::open("/nonexistent/vault", config);
    assert!(matches!(result, Err(IndexError::CorpusUnavailable(_))));
}

#[test]
fn test_get_note_self_heals_with_exactly_one_reload() {
    let fx = fixture(&[("A", "existing note")]);
    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();
    assert_eq!(index.generation(), 1);

    // miss: one implicit reload, then NoteNotFound
    let result = index.get_note("Later");
    assert!(matches!(result, Err(IndexError::NoteNotFound(_))));
    assert_eq!(index.generation(), 2);

    // the note appears on disk after the last load: found via one reload
    write_note(fx.vault.path(), "Later", "created after the index was built");
    let note = index.get_note("Later").unwrap();
    assert_eq!(note.name, "Later");
    assert_eq!(index.generation(), 3);

    // a hit never reloads
    index.get_note("Later").unwrap();
    assert_eq!(index.generation(), 3);
}

#[test]
fn test_failed_reload_keeps_old_snapshot_serving() {
    let fx = fixture(&[("A", "some content here")]);
    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();

    std::fs::remove_dir_all(fx.vault.path()).unwrap();

    let result = index.reload(false);
    assert!(matches!(result, Err(IndexError::CorpusUnavailable(_))));

    // the previous generation still answers queries
    assert_eq!(index.get_note("A").unwrap().name, "A");
    assert_eq!(index.note_count(), 1);
}

#[test]
fn test_jaccard_pairs_are_symmetric_and_bounded() {
    let fx = fixture(&[
        ("Hub", "[[A]] [[B]] [[C]]"),
        ("A", "[[B]] [[Hub]]"),
        ("B", "[[C]]"),
        ("C", "plain leaf note"),
    ]);
    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();
    let snapshot = index.snapshot();

    assert!(!snapshot.similarity.is_empty());
    for (a, b, jaccard) in snapshot.similarity.pairs() {
        assert!((0.0..=1.0).contains(jaccard), "jaccard({a},{b}) = {jaccard}");

        let from_a = snapshot
            .similarity
            .neighbors_of(a)
            .iter()
            .find(|(other, _)| other == b)
            .map(|(_, j)| *j);
        let from_b = snapshot
            .similarity
            .neighbors_of(b)
            .iter()
            .find(|(other, _)| other == a)
            .map(|(_, j)| *j);
        assert_eq!(from_a, from_b);
        assert_eq!(from_a, Some(*jaccard));
    }
}

/// The distance floor excludes the query note and its direct neighbors from
/// every category, even when other attributes would qualify them.
#[test]
fn test_distance_floor_empties_all_sections_on_minimal_corpus() {
    let fx = fixture(&[
        ("A", "[[B]] [[2024-01-01]]\nalpha beta gamma"),
        ("B", "[[2024-01-01]]"),
        ("2024-01-01", "a dated note"),
        ("2024-02-02", "an isolated dated note"),
    ]);
    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();

    let entries = index.related_to("A").unwrap();
    assert!(
        entries.is_empty(),
        "expected no recommendations, got {entries:?}"
    );
}

/// Identical neighborhoods give jaccard 1.0 at distance 2; the candidate
/// lands in the name-length category matching its word count.
#[test]
fn test_identical_neighborhoods_rank_top_of_short() {
    let fx = fixture(&[
        ("X", "[[P]] [[Q]] [[R]]"),
        (
            "Y",
            "[[P]] [[Q]] [[R]]\nplenty of words in here to count as substantive content",
        ),
    ]);
    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();

    let snapshot = index.snapshot();
    let jaccard = snapshot
        .similarity
        .neighbors_of("X")
        .iter()
        .find(|(other, _)| other == "Y")
        .map(|(_, j)| *j);
    assert_eq!(jaccard, Some(1.0));

    let entries = index.related_to("X").unwrap();
    assert_eq!(section_titles(&entries), vec!["Short"]);
    assert_eq!(item_names(&entries), vec!["Y"]);

    match &entries[1] {
        RelatedEntry::Item(item) => {
            assert_eq!(item.info.score, 1.0);
            assert_eq!(item.path, "Y.md");
            assert!(item.info.features.exists);
        }
        other => panic!("expected item, got {other:?}"),
    }
}

#[test]
fn test_nonexistent_notes_are_recommended_as_ghosts() {
    // Query links two hubs; both hubs link the ghost, so the ghost sits at
    // distance 2 with a nonzero coefficient and no backing file.
    let fx = fixture(&[
        ("Query", "[[Hub One]] [[Hub Two]]"),
        ("Hub One", "[[Ghost Note]]"),
        ("Hub Two", "[[Ghost Note]]"),
    ]);
    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();

    let entries = index.related_to("Query").unwrap();
    assert!(section_titles(&entries).contains(&"Nonexistent".to_string()));
    assert!(item_names(&entries).contains(&"Ghost Note".to_string()));

    let ghost = entries
        .iter()
        .find_map(|entry| match entry {
            RelatedEntry::Item(item) if item.name == "Ghost Note" => Some(item),
            _ => None,
        })
        .unwrap();
    assert!(!ghost.info.features.exists);
    assert_eq!(ghost.path, "Ghost Note.md");
}

/// A fixed snapshot always produces the same list: reload on an unchanged
/// corpus reproduces section contents and ordering exactly.
#[test]
fn test_reload_is_deterministic_on_unchanged_corpus() {
    let fx = fixture(&[
        ("Hub", "[[One Long Note Name]] [[Two]] [[Three]]"),
        (
            "One Long Note Name",
            "[[Two]] [[Three]]\nenough words to be a substantive note for ranking purposes",
        ),
        (
            "Two",
            "[[Three]]\nalso enough words here to pass the substantive threshold easily",
        ),
        ("Three", "[[Hub]]\nshort"),
        ("2024-03-03", "[[Two]] [[Hub]] a dated entry"),
    ]);
    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();

    let first = index.related_to("Hub").unwrap();
    index.reload(false).unwrap();
    let second = index.related_to("Hub").unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn test_category_limits_come_from_config() {
    // Query links two hubs; every candidate links both hubs too, so each
    // candidate sits at distance 2 with a shared neighborhood.
    let mut notes: Vec<(String, String)> = vec![
        ("Query".into(), "[[Hub A]] [[Hub B]]".into()),
        ("Hub A".into(), String::new()),
        ("Hub B".into(), String::new()),
    ];
    for i in 0..6 {
        notes.push((
            format!("Candidate {i}"),
            "[[Hub A]] [[Hub B]]\nwords enough to clear the substantive threshold right here"
                .to_string(),
        ));
    }

    let as_refs: Vec<(&str, &str)> = notes
        .iter()
        .map(|(n, c)| (n.as_str(), c.as_str()))
        .collect();
    let fx = fixture(&as_refs);
    fx.config.write().unwrap().limits.short = 2;

    let index = VaultIndex::open(fx.vault.path(), fx.config.clone()).unwrap();
    let entries = index.related_to("Query").unwrap();

    let shorts = item_names(&entries);
    assert_eq!(shorts.len(), 2, "limit should cap the Short section");
}
