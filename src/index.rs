//! Directory index: the ordered entry table at the head of a container
//!
//! The index is an insertion-ordered list of [`FileEntry`] records. Order
//! matters: the data block is the concatenation of entry payloads in index
//! order, and offsets are cumulative over that order. When persisted, the
//! index serializes to a UTF-8 JSON document which is itself compressed
//! before being written after the container magic.

use serde::{Deserialize, Serialize};

use crate::entry::FileEntry;
use crate::error::{PackError, Result};

/// Inner format discriminator carried by the serialized index document
pub const INDEX_HEADER: &str = "PACKFSIDX1.0";

/// On-disk shape of the index document
#[derive(Debug, Serialize, Deserialize)]
struct IndexDocument {
    header: String,
    entries: Vec<FileEntry>,
}

/// Ordered mapping from virtual path to file entry
///
/// Paths are unique; inserting an existing path replaces that entry in place
/// so the positions (and therefore offsets) of other entries are untouched.
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    entries: Vec<FileEntry>,
}

impl DirectoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        DirectoryIndex {
            entries: Vec::new(),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its normalized virtual path
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Mutable lookup by normalized virtual path
    pub fn get_mut(&mut self, path: &str) -> Option<&mut FileEntry> {
        self.entries.iter_mut().find(|e| e.path == path)
    }

    /// Insert an entry, replacing any existing entry with the same path
    ///
    /// Replacement keeps the original index position; a new path appends.
    pub fn insert(&mut self, entry: FileEntry) {
        match self.entries.iter_mut().find(|e| e.path == entry.path) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Remove an entry by path, returning it if present
    ///
    /// Offsets of the remaining entries are left as assigned; they are
    /// recomputed wholesale before the next save.
    pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
        let pos = self.entries.iter().position(|e| e.path == path)?;
        Some(self.entries.remove(pos))
    }

    /// Iterate entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    /// Iterate entries mutably in index order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FileEntry> {
        self.entries.iter_mut()
    }

    /// Total stored bytes over all entries
    ///
    /// This is also the next free offset for an appended entry.
    pub fn stored_size(&self) -> u64 {
        self.entries.iter().map(|e| e.stored_size()).sum()
    }

    /// Total uncompressed bytes over all entries
    pub fn uncompressed_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Reassign every offset cumulatively in index order
    ///
    /// Run immediately before writing the data block, so entries removed
    /// since they were encoded leave neither gaps nor stale offsets.
    pub fn recompute_offsets(&mut self) {
        let mut offset = 0u64;
        for entry in &mut self.entries {
            entry.offset = offset;
            offset += entry.stored_size();
        }
    }

    /// Serialize the index to its UTF-8 document form
    pub fn to_document(&self) -> Result<Vec<u8>> {
        let document = IndexDocument {
            header: INDEX_HEADER.to_string(),
            entries: self.entries.iter().map(|e| e.to_metadata()).collect(),
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }

    /// Parse and validate a document produced by [`DirectoryIndex::to_document`]
    ///
    /// Any structural problem (not UTF-8, unparsable JSON, wrong inner
    /// header, empty paths, duplicate paths, inconsistent sizes) is
    /// [`PackError::InvalidFormat`].
    pub fn from_document(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| PackError::InvalidFormat("index document is not UTF-8".to_string()))?;

        let document: IndexDocument = serde_json::from_str(text)
            .map_err(|e| PackError::InvalidFormat(format!("unparsable index document: {}", e)))?;

        if document.header != INDEX_HEADER {
            return Err(PackError::InvalidFormat(format!(
                "unknown index header '{}'",
                document.header
            )));
        }

        let index = DirectoryIndex {
            entries: document.entries,
        };
        index.validate()?;

        Ok(index)
    }

    /// Validate structural invariants over the current entry set
    fn validate(&self) -> Result<()> {
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.path.is_empty() {
                return Err(PackError::InvalidFormat(format!(
                    "index record {} has an empty path",
                    i
                )));
            }

            if entry.compressed && entry.compressed_size > entry.size {
                return Err(PackError::InvalidFormat(format!(
                    "entry '{}' is negatively compressed ({} > {})",
                    entry.path, entry.compressed_size, entry.size
                )));
            }

            if !entry.compressed && entry.compressed_size != entry.size {
                return Err(PackError::InvalidFormat(format!(
                    "entry '{}' is stored raw but sizes disagree ({} != {})",
                    entry.path, entry.compressed_size, entry.size
                )));
            }

            if self.entries[..i].iter().any(|e| e.path == entry.path) {
                return Err(PackError::InvalidFormat(format!(
                    "duplicate index path '{}'",
                    entry.path
                )));
            }
        }

        Ok(())
    }
}
