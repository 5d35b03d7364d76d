//! The vault index: coordinator over the link graph, note store, similarity
//! index and optional semantic index.
//!
//! One load generation lives in an immutable [`Snapshot`] behind
//! `RwLock<Arc<_>>`: queries clone the `Arc` and only ever observe a fully
//! built generation, while `reload` builds a fresh snapshot off to the side
//! and swaps it in atomically. The reload mutex keeps at most one load in
//! flight; a failed reload leaves the previous snapshot serving.

pub mod features;
pub mod graph;
pub mod pipeline;
pub mod similarity;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use regex::Regex;

use crate::config::Config;
use crate::notes::Note;
use crate::semantic::SemanticIndexService;
use crate::vault::{self, VaultError};

use self::graph::LinkGraph;
use self::pipeline::RelatedEntry;
use self::similarity::SimilarityIndex;

#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    #[error("corpus unavailable: {0}")]
    CorpusUnavailable(#[from] VaultError),

    #[error("note \"{0}\" not found")]
    NoteNotFound(String),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

/// One fully built load generation. Immutable; replaced wholesale.
pub struct Snapshot {
    pub generation: u64,
    pub graph: LinkGraph,
    pub notes: HashMap<String, Note>,
    pub file_index: HashMap<String, PathBuf>,
    pub similarity: SimilarityIndex,
    pub daily_re: Regex,
}

/// The aggregate root: owns the current snapshot and the optional semantic
/// index, and serializes loads against queries.
pub struct VaultIndex {
    vault_path: PathBuf,
    config: Arc<RwLock<Config>>,
    snapshot: RwLock<Arc<Snapshot>>,
    reload_lock: Mutex<()>,
    semantic: SemanticIndexService,
    generation: AtomicU64,
}

impl VaultIndex {
    /// Load the vault at `vault_path` and build the first snapshot.
    pub fn open(
        vault_path: impl Into<PathBuf>,
        config: Arc<RwLock<Config>>,
    ) -> Result<Self, IndexError> {
        Self::open_with(vault_path, config, false)
    }

    /// Like [`VaultIndex::open`], optionally forcing a semantic re-embed
    /// instead of reusing the vector cache.
    pub fn open_with(
        vault_path: impl Into<PathBuf>,
        config: Arc<RwLock<Config>>,
        force_semantic_reindex: bool,
    ) -> Result<Self, IndexError> {
        let vault_path = vault_path.into();

        let (semantic_config, base_path) = {
            let config = config.read().unwrap();
            (
                config.semantic_index.clone(),
                PathBuf::from(config.base_path()),
            )
        };
        let semantic = SemanticIndexService::new(semantic_config, base_path);

        let index = Self {
            vault_path,
            config,
            snapshot: RwLock::new(Arc::new(Snapshot {
                generation: 0,
                graph: LinkGraph::new(),
                notes: HashMap::new(),
                file_index: HashMap::new(),
                similarity: SimilarityIndex::build(&LinkGraph::new()),
                daily_re: Regex::new("$^").expect("empty-match regex"),
            })),
            reload_lock: Mutex::new(()),
            semantic,
            generation: AtomicU64::new(0),
        };

        {
            let _guard = index.reload_lock.lock().unwrap();
            index.do_load(force_semantic_reindex)?;
        }

        Ok(index)
    }

    /// Explicitly re-run the load. Serialized: a second caller blocks until
    /// the in-flight load finishes, then runs its own.
    pub fn reload(&self, force_semantic_reindex: bool) -> Result<(), IndexError> {
        let _guard = self.reload_lock.lock().unwrap();
        self.do_load(force_semantic_reindex)
    }

    /// The current snapshot. Cheap; callers hold the `Arc` for however long
    /// they need a consistent view.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().unwrap().clone()
    }

    /// Look up a note by name.
    ///
    /// On a miss this triggers exactly one implicit reload and retries once,
    /// so documents created after the last load are still found. A caller
    /// racing an in-flight reload waits for it and reuses its result rather
    /// than starting another. A second miss is `NoteNotFound`.
    pub fn get_note(&self, name: &str) -> Result<Note, IndexError> {
        if let Some(note) = self.snapshot().notes.get(name) {
            return Ok(note.clone());
        }

        {
            let _guard = self.reload_lock.lock().unwrap();
            // the reload we waited on may already have picked the note up
            if let Some(note) = self.snapshot().notes.get(name) {
                return Ok(note.clone());
            }
            self.do_load(false)?;
        }

        self.snapshot()
            .notes
            .get(name)
            .cloned()
            .ok_or_else(|| IndexError::NoteNotFound(name.to_string()))
    }

    /// The ordered, sectioned recommendation list for one query note.
    pub fn related_to(&self, name: &str) -> Result<Vec<RelatedEntry>, IndexError> {
        let note = self.get_note(name)?;
        let snapshot = self.snapshot();

        let semantic_scores = if self.semantic.is_enabled() && self.semantic.has_document(&note.name)
        {
            match self.semantic.similarities_from(&note.name) {
                Ok(scores) => Some(scores),
                Err(err) => {
                    log::warn!("semantic signal unavailable for \"{name}\": {err}");
                    None
                }
            }
        } else {
            None
        };

        let table = features::merged_feature_table(&note.name, &snapshot, semantic_scores.as_ref());

        let limits = self.config.read().unwrap().limits.clone();
        let categories = pipeline::categories(&limits, semantic_scores.is_some());

        Ok(pipeline::run(&table, &categories, &snapshot.file_index))
    }

    /// Load generation of the currently served snapshot.
    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    pub fn note_count(&self) -> usize {
        self.snapshot().notes.len()
    }

    pub fn similarity_pair_count(&self) -> usize {
        self.snapshot().similarity.len()
    }

    pub fn semantic_indexed_count(&self) -> usize {
        self.semantic.indexed_count()
    }

    /// Build and swap in a new snapshot. Caller holds the reload lock.
    fn do_load(&self, force_semantic_reindex: bool) -> Result<(), IndexError> {
        let daily_pattern = self.config.read().unwrap().daily_note_regex.clone();
        let daily_re = Regex::new(&daily_pattern)
            .map_err(|err| anyhow::anyhow!("daily_note_regex is not a valid regex: {err}"))?;

        let parsed = vault::parse(&self.vault_path)?;

        let mut notes = HashMap::with_capacity(parsed.file_index.len());
        for (name, rel_path) in &parsed.file_index {
            let note = Note::from_path(name, &self.vault_path.join(rel_path))?;
            notes.insert(name.clone(), note);
        }

        let similarity = SimilarityIndex::build(&parsed.graph);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        log::info!(
            "indexed vault generation {generation}: {} notes, {} similarity pairs",
            notes.len(),
            similarity.len()
        );

        let snapshot = Snapshot {
            generation,
            graph: parsed.graph,
            notes,
            file_index: parsed.file_index,
            similarity,
            daily_re,
        };

        // semantic failures degrade the signal, never the index
        if self.semantic.is_enabled() {
            match self.semantic.reindex(&snapshot.notes, force_semantic_reindex) {
                Ok(count) => log::info!("semantic index ready: {count} notes"),
                Err(err) => log::warn!("semantic index unavailable: {err}"),
            }
        }

        *self.snapshot.write().unwrap() = Arc::new(snapshot);

        Ok(())
    }
}
