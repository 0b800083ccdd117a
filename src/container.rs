//! Archive container operations
//!
//! A [`PackArchive`] owns a directory index and (once opened or saved) the
//! path of the physical container file. Authoring appends entries in memory
//! via [`PackArchive::encode`]; [`PackArchive::save`] rewrites the whole
//! container; reading goes through [`PackArchive::open`] followed by lazy
//! [`PackArchive::load`]/[`PackArchive::decode`] calls.
//!
//! On-disk layout:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Magic: "PACKFS01.DEFLATE" (16 bytes ASCII)  │
//! ├─────────────────────────────────────────────┤
//! │ Index length: u32 little-endian             │
//! ├─────────────────────────────────────────────┤
//! │ Index: compressed UTF-8 JSON document       │
//! ├─────────────────────────────────────────────┤
//! │ Data block: entry payloads, index order     │
//! └─────────────────────────────────────────────┘
//! ```

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::compression;
use crate::entry::{self, FileEntry};
use crate::error::{PackError, Result};
use crate::index::DirectoryIndex;

/// Container magic tag, fixed ASCII at offset 0
pub const MAGIC: [u8; 16] = *b"PACKFS01.DEFLATE";

/// Packed virtual file system container
///
/// Single-threaded and synchronous: callers needing shared access must wrap
/// the whole archive in their own lock.
pub struct PackArchive {
    /// Backing container file, present after `open` or a non-empty `save`
    path: Option<PathBuf>,

    /// Ordered entry table
    index: DirectoryIndex,

    /// Byte position of the data block, immediately after header + index
    data_base_offset: u64,
}

impl PackArchive {
    /// Create an empty container with no backing file
    pub fn create_empty() -> Self {
        PackArchive {
            path: None,
            index: DirectoryIndex::new(),
            data_base_offset: 0,
        }
    }

    /// Open an existing container file
    ///
    /// Reads and validates the magic tag, decompresses and parses the
    /// directory index, and records where the data block starts. No entry
    /// payloads are read; those load lazily on demand.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;

        let mut magic = [0u8; 16];
        read_exact_or_invalid(&mut file, &mut magic, "magic tag")?;
        if magic != MAGIC {
            return Err(PackError::InvalidFormat(
                "not a packed file system container (bad magic tag)".to_string(),
            ));
        }

        let mut len_bytes = [0u8; 4];
        read_exact_or_invalid(&mut file, &mut len_bytes, "index length")?;
        let index_len = u32::from_le_bytes(len_bytes) as usize;

        let mut compressed_index = vec![0u8; index_len];
        read_exact_or_invalid(&mut file, &mut compressed_index, "index block")?;

        let document = compression::decompress(&compressed_index).map_err(|e| match e {
            PackError::CorruptData(msg) => {
                PackError::InvalidFormat(format!("index does not decompress: {}", msg))
            }
            other => other,
        })?;

        let index = DirectoryIndex::from_document(&document)?;
        let data_base_offset = (MAGIC.len() + 4 + index_len) as u64;

        tracing::debug!(
            entries = index.len(),
            data_base_offset,
            path = %path.display(),
            "opened container"
        );

        Ok(PackArchive {
            path: Some(path),
            index,
            data_base_offset,
        })
    }

    /// Encode a payload into the container under a virtual path
    ///
    /// The payload is compressed at maximum effort; if that does not make it
    /// smaller, the raw bytes are stored instead. The entry's offset is a
    /// tentative append position over the current entry set; `save`
    /// recomputes all offsets before writing.
    ///
    /// Encoding an existing path overwrites that entry in place; other
    /// entries are untouched. Returns a metadata copy of the new entry.
    pub fn encode(&mut self, virtual_path: &str, data: &[u8]) -> Result<FileEntry> {
        let path = entry::normalize(virtual_path).ok_or_else(|| PackError::Encode {
            path: virtual_path.to_string(),
            reason: "empty or invalid virtual path".to_string(),
        })?;

        let compressed = compression::compress(data).map_err(|e| PackError::Encode {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        // Store-if-smaller: fall back to the raw payload when compression
        // does not reduce size, so entries are never negatively compressed.
        let (stored, is_compressed) = if compressed.len() >= data.len() {
            tracing::trace!(path = %path, size = data.len(), "storing raw payload");
            (data.to_vec(), false)
        } else {
            (compressed, true)
        };

        let new_entry = FileEntry {
            path: path.clone(),
            size: data.len() as u64,
            compressed_size: stored.len() as u64,
            offset: self.index.stored_size(),
            compressed: is_compressed,
            file_date: Some(Utc::now()),
            cached_bytes: Some(stored),
        };

        let metadata = new_entry.to_metadata();
        self.index.insert(new_entry);

        Ok(metadata)
    }

    /// Decompress an entry's stored bytes
    ///
    /// The container's copy of the entry must already hold its stored bytes,
    /// either because it was just encoded or because `load` ran.
    pub fn decode(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        let live = self
            .index
            .get(&entry.path)
            .ok_or_else(|| PackError::EntryNotFound(entry.path.clone()))?;

        let stored = live
            .cached_bytes
            .as_ref()
            .ok_or_else(|| PackError::MissingEntryData(live.path.clone()))?;

        if live.compressed {
            compression::decompress(stored)
        } else {
            Ok(stored.clone())
        }
    }

    /// Load an entry's stored bytes from the backing file
    ///
    /// Returns the payload exactly as stored (still compressed when the
    /// entry is compressed) and caches it on the entry. Already-cached
    /// entries return without touching the file. The file handle is opened
    /// and released within this call so external readers of the same
    /// physical file are never locked out between loads.
    pub fn load(&mut self, virtual_path: &str) -> Result<Vec<u8>> {
        let normalized = lookup_path(virtual_path)?;
        self.load_raw(&normalized)?;

        let entry = self
            .index
            .get(&normalized)
            .ok_or_else(|| PackError::EntryNotFound(normalized.clone()))?;
        entry
            .cached_bytes
            .clone()
            .ok_or_else(|| PackError::MissingEntryData(normalized))
    }

    /// Read an entry's original bytes, loading and decoding as needed
    pub fn read(&mut self, virtual_path: &str) -> Result<Vec<u8>> {
        let normalized = lookup_path(virtual_path)?;
        self.load_raw(&normalized)?;

        let entry = self
            .index
            .get(&normalized)
            .ok_or_else(|| PackError::EntryNotFound(normalized.clone()))?;
        self.decode(entry)
    }

    /// Remove an entry, returning its metadata
    ///
    /// Remaining entries keep their assigned offsets; `save` recomputes the
    /// layout before anything is written.
    pub fn remove(&mut self, virtual_path: &str) -> Result<FileEntry> {
        let normalized = lookup_path(virtual_path)?;
        self.index
            .remove(&normalized)
            .map(|e| e.to_metadata())
            .ok_or(PackError::EntryNotFound(normalized))
    }

    /// Re-key an entry under a new virtual path
    ///
    /// The entry's decoded bytes are re-encoded under the destination path,
    /// then the source entry is removed. Requires the source bytes to be
    /// cached or loadable from the backing file.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<FileEntry> {
        let from_normalized = lookup_path(from)?;
        let to_normalized = entry::normalize(to).ok_or_else(|| PackError::Encode {
            path: to.to_string(),
            reason: "empty or invalid virtual path".to_string(),
        })?;

        if from_normalized == to_normalized {
            return Err(PackError::Encode {
                path: to_normalized,
                reason: "source and destination paths are the same".to_string(),
            });
        }

        let data = self.read(&from_normalized)?;
        let renamed = self.encode(&to_normalized, &data)?;
        self.remove(&from_normalized)?;

        Ok(renamed)
    }

    /// Rewrite the whole container at `destination`
    ///
    /// Rebuilds the index from the current entry set, recomputes every
    /// offset, and writes magic + compressed index + data block to a
    /// temporary file in the destination directory, atomically replacing the
    /// target on success. An interrupted save never leaves a partial
    /// container behind.
    ///
    /// Every entry must hold its stored bytes ([`PackError::MissingEntryData`]
    /// otherwise; see [`PackArchive::cache_all`]). Saving an empty container
    /// removes any existing file at the destination instead of writing a
    /// near-empty one.
    pub fn save<P: AsRef<Path>>(&mut self, destination: P) -> Result<()> {
        let dest = destination.as_ref();

        if self.index.is_empty() {
            match fs::remove_file(dest) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            if self.path.as_deref() == Some(dest) {
                self.path = None;
                self.data_base_offset = 0;
            }
            tracing::info!(path = %dest.display(), "saved empty container, destination removed");
            return Ok(());
        }

        for entry in self.index.iter() {
            if entry.cached_bytes.is_none() {
                return Err(PackError::MissingEntryData(entry.path.clone()));
            }
        }

        // Offsets assigned at encode time are tentative; removals since then
        // would otherwise leave gaps or point past the written block.
        self.index.recompute_offsets();

        let document = self.index.to_document()?;
        let compressed_index = compression::compress(&document)?;
        let index_len = u32::try_from(compressed_index.len()).map_err(|_| {
            PackError::InvalidFormat(format!(
                "compressed index exceeds the u32 length field ({} bytes)",
                compressed_index.len()
            ))
        })?;

        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        {
            let file = tmp.as_file_mut();
            file.write_all(&MAGIC)?;
            file.write_all(&index_len.to_le_bytes())?;
            file.write_all(&compressed_index)?;

            for entry in self.index.iter() {
                if let Some(stored) = &entry.cached_bytes {
                    file.write_all(stored)?;
                }
            }

            file.flush()?;
            file.sync_all()?;
        }
        tmp.persist(dest).map_err(|e| PackError::Io(e.error))?;

        self.data_base_offset = (MAGIC.len() + 4 + compressed_index.len()) as u64;
        self.path = Some(dest.to_path_buf());

        tracing::info!(
            entries = self.index.len(),
            bytes = self.index.stored_size(),
            path = %dest.display(),
            "saved container"
        );

        Ok(())
    }

    /// Load stored bytes for every entry that is not yet cached
    ///
    /// The usual precursor to `save` on a container that was opened rather
    /// than authored in memory.
    pub fn cache_all(&mut self) -> Result<()> {
        let pending: Vec<String> = self
            .index
            .iter()
            .filter(|e| e.cached_bytes.is_none())
            .map(|e| e.path.clone())
            .collect();

        for path in pending {
            self.load_raw(&path)?;
        }

        Ok(())
    }

    /// Drop every entry's cached bytes
    ///
    /// Safe after a successful `save`: the payloads are durable in the
    /// container file and reload on demand.
    pub fn evict_cache(&mut self) {
        for entry in self.index.iter_mut() {
            entry.cached_bytes = None;
        }
    }

    /// Metadata copies of all entries, in index order
    pub fn list_entries(&self) -> Vec<FileEntry> {
        self.index.iter().map(|e| e.to_metadata()).collect()
    }

    /// Metadata copy of one entry, if present
    pub fn entry(&self, virtual_path: &str) -> Option<FileEntry> {
        let normalized = entry::normalize(virtual_path)?;
        self.index.get(&normalized).map(|e| e.to_metadata())
    }

    /// Whether an entry exists under the given virtual path
    pub fn contains(&self, virtual_path: &str) -> bool {
        self.entry(virtual_path).is_some()
    }

    /// Locate an entry by its file name (final path segment)
    pub fn find_file(&self, file_name: &str) -> Option<FileEntry> {
        self.index
            .iter()
            .find(|e| e.file_name().eq_ignore_ascii_case(file_name))
            .map(|e| e.to_metadata())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the container holds no entries
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total bytes of the data block as stored
    pub fn stored_size(&self) -> u64 {
        self.index.stored_size()
    }

    /// Total uncompressed bytes over all entries
    pub fn uncompressed_size(&self) -> u64 {
        self.index.uncompressed_size()
    }

    /// Path of the backing container file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Fetch an entry's stored bytes into its cache
    fn load_raw(&mut self, normalized: &str) -> Result<()> {
        let already_cached = match self.index.get(normalized) {
            Some(e) => e.cached_bytes.is_some(),
            None => return Err(PackError::EntryNotFound(normalized.to_string())),
        };
        if already_cached {
            return Ok(());
        }

        let backing = self.path.clone().ok_or(PackError::NoBackingFile)?;
        let base = self.data_base_offset;

        let entry = self
            .index
            .get_mut(normalized)
            .ok_or_else(|| PackError::EntryNotFound(normalized.to_string()))?;
        let expected = entry.stored_size();

        let mut file = File::open(&backing)?;
        file.seek(SeekFrom::Start(base + entry.offset))?;

        let mut buf = vec![0u8; expected as usize];
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(PackError::TruncatedEntry {
                    path: entry.path.clone(),
                    expected,
                    actual: filled as u64,
                });
            }
            filled += n;
        }

        entry.cached_bytes = Some(buf);
        Ok(())
    }
}

impl Default for PackArchive {
    fn default() -> Self {
        Self::create_empty()
    }
}

/// Normalize a path for lookup, mapping failure to "not found"
fn lookup_path(virtual_path: &str) -> Result<String> {
    entry::normalize(virtual_path)
        .ok_or_else(|| PackError::EntryNotFound(virtual_path.to_string()))
}

/// Read exactly `buf.len()` bytes, reporting a short container as a format error
fn read_exact_or_invalid(file: &mut File, buf: &mut [u8], what: &str) -> Result<()> {
    file.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            PackError::InvalidFormat(format!("container ends before {}", what))
        } else {
            PackError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_compressible_payload() {
        let mut archive = PackArchive::create_empty();

        let entry = archive.encode("images/a.png", &vec![0u8; 50_000]).unwrap();
        assert!(entry.compressed);
        assert!(entry.compressed_size < 500);
        assert_eq!(entry.size, 50_000);
        assert_eq!(entry.offset, 0);
    }

    #[test]
    fn test_encode_incompressible_payload_stored_raw() {
        use rand::RngCore;

        let mut archive = PackArchive::create_empty();
        let mut data = vec![0u8; 4096];
        rand::thread_rng().fill_bytes(&mut data);

        let entry = archive.encode("data/random.bin", &data).unwrap();
        assert!(!entry.compressed);
        assert_eq!(entry.compressed_size, 4096);
        assert_eq!(entry.stored_size(), 4096);

        // Raw storage means decode hands back the identical bytes.
        assert_eq!(archive.read("data/random.bin").unwrap(), data);
    }

    #[test]
    fn test_encode_assigns_cumulative_offsets() {
        use rand::RngCore;

        let mut archive = PackArchive::create_empty();
        let mut incompressible = vec![0u8; 1000];
        rand::thread_rng().fill_bytes(&mut incompressible);

        let first = archive.encode("a.bin", &incompressible).unwrap();
        let second = archive.encode("b.bin", &incompressible).unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, first.stored_size());
    }

    #[test]
    fn test_encode_rejects_invalid_paths() {
        let mut archive = PackArchive::create_empty();

        assert!(matches!(
            archive.encode("", b"data"),
            Err(PackError::Encode { .. })
        ));
        assert!(matches!(
            archive.encode("dir/", b"data"),
            Err(PackError::Encode { .. })
        ));
        assert!(matches!(
            archive.encode("///", b"data"),
            Err(PackError::Encode { .. })
        ));
    }

    #[test]
    fn test_encode_normalizes_path() {
        let mut archive = PackArchive::create_empty();
        archive.encode("\\images\\ui\\a.png", b"payload").unwrap();

        assert!(archive.contains("images/ui/a.png"));
        assert!(archive.contains("/images//ui/a.png"));
    }

    #[test]
    fn test_duplicate_encode_overwrites_in_place() {
        let mut archive = PackArchive::create_empty();
        archive.encode("a.txt", b"first").unwrap();
        archive.encode("b.txt", b"second").unwrap();
        archive.encode("a.txt", b"replacement text").unwrap();

        assert_eq!(archive.len(), 2);
        let paths: Vec<_> = archive
            .list_entries()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
        assert_eq!(archive.read("a.txt").unwrap(), b"replacement text");
    }

    #[test]
    fn test_decode_without_cache_fails() {
        let mut archive = PackArchive::create_empty();
        let entry = archive.encode("a.txt", b"payload").unwrap();
        archive.evict_cache();

        assert!(matches!(
            archive.decode(&entry),
            Err(PackError::MissingEntryData(_))
        ));
    }

    #[test]
    fn test_load_without_backing_file_fails() {
        let mut archive = PackArchive::create_empty();
        archive.encode("a.txt", b"payload").unwrap();
        archive.evict_cache();

        assert!(matches!(
            archive.load("a.txt"),
            Err(PackError::NoBackingFile)
        ));
    }

    #[test]
    fn test_read_unknown_entry() {
        let mut archive = PackArchive::create_empty();
        assert!(matches!(
            archive.read("missing.bin"),
            Err(PackError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_remove() {
        let mut archive = PackArchive::create_empty();
        archive.encode("a.txt", b"payload").unwrap();

        let removed = archive.remove("a.txt").unwrap();
        assert_eq!(removed.path, "a.txt");
        assert!(archive.is_empty());
        assert!(matches!(
            archive.remove("a.txt"),
            Err(PackError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_rename() {
        let mut archive = PackArchive::create_empty();
        archive.encode("old/name.txt", b"the payload").unwrap();

        archive.rename("old/name.txt", "new/name.txt").unwrap();

        assert!(!archive.contains("old/name.txt"));
        assert_eq!(archive.read("new/name.txt").unwrap(), b"the payload");
    }

    #[test]
    fn test_rename_to_same_path_rejected() {
        let mut archive = PackArchive::create_empty();
        archive.encode("a.txt", b"payload").unwrap();

        assert!(matches!(
            archive.rename("a.txt", "/a.txt"),
            Err(PackError::Encode { .. })
        ));
    }

    #[test]
    fn test_save_requires_cached_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut archive = PackArchive::create_empty();
        archive.encode("a.txt", b"payload").unwrap();
        archive.evict_cache();

        assert!(matches!(
            archive.save(dir.path().join("out.pack")),
            Err(PackError::MissingEntryData(_))
        ));
    }

    #[test]
    fn test_find_file() {
        let mut archive = PackArchive::create_empty();
        archive.encode("images/ui/button.png", b"png").unwrap();
        archive.encode("sounds/click.wav", b"wav").unwrap();

        let found = archive.find_file("Button.png").unwrap();
        assert_eq!(found.path, "images/ui/button.png");
        assert!(archive.find_file("missing.png").is_none());
    }

    #[test]
    fn test_size_totals() {
        let mut archive = PackArchive::create_empty();
        archive.encode("a.bin", &vec![0u8; 10_000]).unwrap();
        archive.encode("b.bin", &vec![0u8; 5_000]).unwrap();

        assert_eq!(archive.uncompressed_size(), 15_000);
        assert!(archive.stored_size() < archive.uncompressed_size());
    }
}
