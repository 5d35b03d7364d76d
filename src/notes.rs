use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::vault::{plaintext, VaultError};

/// One document in the corpus. Identity is `name` (the file stem);
/// immutable once loaded.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub name: String,
    pub path: PathBuf,
    pub raw: String,
    pub plaintext: String,
}

impl Note {
    pub fn from_path(name: &str, path: &Path) -> Result<Note, VaultError> {
        let raw = std::fs::read_to_string(path).map_err(|source| VaultError::NoteRead {
            path: path.to_path_buf(),
            source,
        })?;
        let plaintext = plaintext::extract_plain_text(&raw);

        Ok(Note {
            name: name.to_string(),
            path: path.to_path_buf(),
            raw,
            plaintext,
        })
    }
}
