//! Embedding input preparation.
//!
//! The semantic index embeds note plaintext (wikilink markup is already
//! reduced to display text by the vault parser). Notes below the configured
//! minimum length carry too little signal and are skipped; long notes are
//! truncated to keep embedding input bounded.

/// Maximum embedding input length (characters, not tokens)
const MAX_CONTENT_LENGTH: usize = 2048;

/// Ellipsis suffix when content is truncated
const TRUNCATION_SUFFIX: &str = "...";

/// Prepare a note's plaintext for embedding.
///
/// Returns `None` when the trimmed plaintext is shorter than `min_chars`
/// (the note is not indexed at all).
pub fn embed_input(plaintext: &str, min_chars: usize) -> Option<String> {
    let text = plaintext.trim();
    if text.chars().count() < min_chars {
        return None;
    }

    if text.chars().count() <= MAX_CONTENT_LENGTH {
        return Some(text.to_string());
    }

    let max_chars = MAX_CONTENT_LENGTH - TRUNCATION_SUFFIX.chars().count();
    let truncated: String = text.chars().take(max_chars).collect();
    Some(format!("{truncated}{TRUNCATION_SUFFIX}"))
}

/// Hash of the embedded content, for change detection between reindexes.
pub fn content_hash(plaintext: &str) -> u64 {
    use std::hash::{Hash, Hasher};

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    plaintext.trim().hash(&mut hasher);
    hasher.finish()
}
