//! Binary storage for note embeddings: the semantic index's cached model.
//!
//! File format: vectors.bin
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated):
//! - name_len: u16 (little-endian), name: UTF-8 bytes
//! - content_hash: u64 (little-endian)
//! - embedding: [f32; dimensions] (little-endian)

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::semantic::index::VectorIndex;

/// Current file format version
const FORMAT_VERSION: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum VectorStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    #[error("version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("model mismatch: file was produced by a different model")]
    ModelMismatch,

    #[error("checksum mismatch: file may be corrupted")]
    ChecksumMismatch,
}

struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
    checksum: u32,
}

fn header_checksum(version: u8, model_id: &[u8; 32], dimensions: u16, entry_count: u64) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&[version]);
    hasher.update(model_id);
    hasher.update(&dimensions.to_le_bytes());
    hasher.update(&entry_count.to_le_bytes());
    hasher.finalize()
}

/// Storage manager for the vectors.bin cache.
pub struct VectorStorage {
    path: PathBuf,
}

impl VectorStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the vector index, rejecting caches written by a different model
    /// or format version.
    pub fn load(&self, expected_model_id: &[u8; 32]) -> Result<VectorIndex, VectorStorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        if header.version != FORMAT_VERSION {
            return Err(VectorStorageError::VersionMismatch(
                header.version,
                FORMAT_VERSION,
            ));
        }
        let expected_checksum = header_checksum(
            header.version,
            &header.model_id,
            header.dimensions,
            header.entry_count,
        );
        if header.checksum != expected_checksum {
            return Err(VectorStorageError::ChecksumMismatch);
        }
        if &header.model_id != expected_model_id {
            return Err(VectorStorageError::ModelMismatch);
        }

        let mut index =
            VectorIndex::with_capacity(header.dimensions as usize, header.entry_count as usize);

        for _ in 0..header.entry_count {
            let (name, content_hash, embedding) =
                read_entry(&mut reader, header.dimensions as usize)?;
            // skip entries the index rejects (e.g. zero norm)
            let _ = index.insert(&name, content_hash, embedding);
        }

        Ok(index)
    }

    /// Save the vector index. Atomic: temp file, then rename.
    pub fn save(
        &self,
        index: &VectorIndex,
        model_id: &[u8; 32],
    ) -> Result<(), VectorStorageError> {
        let temp_path = self.path.with_extension("tmp");

        let result = write_to_file(&temp_path, index, model_id);
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    pub fn delete(&self) -> Result<(), VectorStorageError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

fn write_to_file(
    path: &Path,
    index: &VectorIndex,
    model_id: &[u8; 32],
) -> Result<(), VectorStorageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let version = FORMAT_VERSION;
    let dimensions = index.dimensions() as u16;
    let entry_count = index.len() as u64;

    writer.write_all(&[version])?;
    writer.write_all(model_id)?;
    writer.write_all(&dimensions.to_le_bytes())?;
    writer.write_all(&entry_count.to_le_bytes())?;
    writer.write_all(&header_checksum(version, model_id, dimensions, entry_count).to_le_bytes())?;

    for (name, entry) in index.iter() {
        let name_bytes = name.as_bytes();
        writer.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
        writer.write_all(name_bytes)?;
        writer.write_all(&entry.content_hash.to_le_bytes())?;
        for value in &entry.embedding {
            writer.write_all(&value.to_le_bytes())?;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    Ok(())
}

fn read_header(reader: &mut impl Read) -> Result<Header, VectorStorageError> {
    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;

    let mut model_id = [0u8; 32];
    reader.read_exact(&mut model_id)?;

    let mut dimensions = [0u8; 2];
    reader.read_exact(&mut dimensions)?;

    let mut entry_count = [0u8; 8];
    reader.read_exact(&mut entry_count)?;

    let mut checksum = [0u8; 4];
    reader.read_exact(&mut checksum)?;

    Ok(Header {
        version: version[0],
        model_id,
        dimensions: u16::from_le_bytes(dimensions),
        entry_count: u64::from_le_bytes(entry_count),
        checksum: u32::from_le_bytes(checksum),
    })
}

fn read_entry(
    reader: &mut impl Read,
    dimensions: usize,
) -> Result<(String, u64, Vec<f32>), VectorStorageError> {
    let mut name_len = [0u8; 2];
    reader.read_exact(&mut name_len)?;
    let name_len = u16::from_le_bytes(name_len) as usize;

    let mut name_bytes = vec![0u8; name_len];
    reader.read_exact(&mut name_bytes)?;
    let name = String::from_utf8(name_bytes)
        .map_err(|e| VectorStorageError::InvalidFormat(format!("entry name not UTF-8: {e}")))?;

    let mut content_hash = [0u8; 8];
    reader.read_exact(&mut content_hash)?;

    let mut embedding = Vec::with_capacity(dimensions);
    let mut value = [0u8; 4];
    for _ in 0..dimensions {
        reader.read_exact(&mut value)?;
        embedding.push(f32::from_le_bytes(value));
    }

    Ok((name, u64::from_le_bytes(content_hash), embedding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::embeddings::EmbeddingModel;

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new(3);
        index.insert("Note A", 11, vec![1.0, 0.0, 0.0]).unwrap();
        index.insert("Note B", 22, vec![0.0, 1.0, 0.0]).unwrap();
        index
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));
        let model_id = EmbeddingModel::model_id_hash("bge-base-en-v1.5");

        storage.save(&sample_index(), &model_id).unwrap();
        assert!(storage.exists());

        let loaded = storage.load(&model_id).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(loaded.get("Note A").unwrap().content_hash, 11);
        assert_eq!(loaded.get("Note B").unwrap().embedding, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_model_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));

        let written = EmbeddingModel::model_id_hash("bge-base-en-v1.5");
        let expected = EmbeddingModel::model_id_hash("all-MiniLM-L6-v2");

        storage.save(&sample_index(), &written).unwrap();
        let result = storage.load(&expected);
        assert!(matches!(result, Err(VectorStorageError::ModelMismatch)));
    }

    #[test]
    fn test_corrupted_header_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let storage = VectorStorage::new(path.clone());
        let model_id = EmbeddingModel::model_id_hash("bge-base-en-v1.5");

        storage.save(&sample_index(), &model_id).unwrap();

        // flip one byte inside the dimensions field
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[33] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        let result = storage.load(&model_id);
        assert!(matches!(result, Err(VectorStorageError::ChecksumMismatch)));
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));
        assert!(storage.delete().is_ok());
    }
}
