//! High-level semantic index service.
//!
//! Owned by the vault index coordinator. An ordinary reload reuses the
//! vectors.bin cache when it matches the configured model; embedding runs
//! only when the cache is absent, incompatible, or a reindex is forced.
//! Every failure here is non-fatal to the caller: the coordinator drops the
//! semantic signal and the rest of the pipeline keeps working.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::SemanticIndexConfig;
use crate::notes::Note;
use crate::semantic::embeddings::{EmbeddingError, EmbeddingModel};
use crate::semantic::index::VectorIndex;
use crate::semantic::preprocess::{content_hash, embed_input};
use crate::semantic::storage::{VectorStorage, VectorStorageError};

#[derive(Debug, thiserror::Error)]
pub enum SemanticIndexError {
    #[error("semantic indexing is disabled")]
    Disabled,

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("storage error: {0}")]
    Storage(#[from] VectorStorageError),

    #[error("note \"{0}\" is not in the semantic index")]
    NotIndexed(String),

    #[error("semantic index not built yet")]
    NotBuilt,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic similarity service over one vault's notes.
pub struct SemanticIndexService {
    config: SemanticIndexConfig,
    base_path: PathBuf,
    index: Mutex<Option<VectorIndex>>,
}

impl SemanticIndexService {
    pub fn new(config: SemanticIndexConfig, base_path: PathBuf) -> Self {
        Self {
            config,
            base_path,
            index: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn indexed_count(&self) -> usize {
        self.index
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|index| index.len()))
            .unwrap_or(0)
    }

    pub fn has_document(&self, name: &str) -> bool {
        self.index
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|index| index.contains(name)))
            .unwrap_or(false)
    }

    /// Build or refresh the index for one load generation.
    ///
    /// Reuses the vectors.bin cache unless `force` is set or the cache does
    /// not match the configured model; otherwise embeds every note whose
    /// plaintext reaches the configured minimum length. Returns the number
    /// of indexed documents.
    pub fn reindex(
        &self,
        notes: &HashMap<String, Note>,
        force: bool,
    ) -> Result<usize, SemanticIndexError> {
        if !self.config.enabled {
            return Err(SemanticIndexError::Disabled);
        }

        let storage = VectorStorage::new(self.base_path.join("vectors.bin"));
        let model_id = EmbeddingModel::model_id_hash(&self.config.model);

        if !force && storage.exists() {
            match storage.load(&model_id) {
                Ok(index) => {
                    log::info!("loaded {} note vectors from cache", index.len());
                    let count = index.len();
                    self.replace_index(index)?;
                    return Ok(count);
                }
                Err(err) => {
                    log::warn!("semantic cache rejected ({err}), re-embedding vault");
                }
            }
        }

        // deterministic embedding order
        let mut eligible: Vec<(&str, String)> = notes
            .values()
            .filter_map(|note| {
                embed_input(&note.plaintext, self.config.min_plaintext_chars)
                    .map(|input| (note.name.as_str(), input))
            })
            .collect();
        eligible.sort();

        log::info!(
            "embedding {} of {} notes with {}",
            eligible.len(),
            notes.len(),
            self.config.model
        );

        let model = EmbeddingModel::new(&self.config.model, self.base_path.clone())?;
        let texts: Vec<String> = eligible.iter().map(|(_, input)| input.clone()).collect();
        let embeddings = model.embed_batch(&texts)?;

        let mut index = VectorIndex::with_capacity(model.dimensions(), eligible.len());
        for ((name, input), embedding) in eligible.iter().zip(embeddings) {
            if let Err(err) = index.insert(name, content_hash(input), embedding) {
                log::warn!("skipping vector for \"{name}\": {err}");
            }
        }

        storage.save(&index, &model_id)?;

        let count = index.len();
        self.replace_index(index)?;
        Ok(count)
    }

    /// Similarity of the query note's stored vector against every other
    /// indexed note.
    pub fn similarities_from(&self, name: &str) -> Result<HashMap<String, f32>, SemanticIndexError> {
        if !self.config.enabled {
            return Err(SemanticIndexError::Disabled);
        }

        let guard = self
            .index
            .lock()
            .map_err(|e| SemanticIndexError::Internal(format!("lock poisoned: {e}")))?;

        let index = guard.as_ref().ok_or(SemanticIndexError::NotBuilt)?;
        index
            .similarities_from(name)
            .ok_or_else(|| SemanticIndexError::NotIndexed(name.to_string()))
    }

    fn replace_index(&self, index: VectorIndex) -> Result<(), SemanticIndexError> {
        let mut guard = self
            .index
            .lock()
            .map_err(|e| SemanticIndexError::Internal(format!("lock poisoned: {e}")))?;
        *guard = Some(index);
        Ok(())
    }
}
