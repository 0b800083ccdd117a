//! File entries and virtual path handling

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logical file stored in a container
///
/// Carries the metadata persisted in the directory index plus an optional
/// in-memory copy of the stored bytes. The cached bytes are exactly what sits
/// in the data block: compressed when `compressed` is set, raw otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Forward-slash virtual path, unique within the container
    pub path: String,

    /// Original (uncompressed) byte length
    pub size: u64,

    /// Byte length as stored; equals `size` when `compressed` is false
    pub compressed_size: u64,

    /// Byte offset into the data block, relative to the end of the
    /// header + index. Assigned at encode time and recomputed during save.
    pub offset: u64,

    /// Whether the stored bytes are DEFLATE-compressed
    pub compressed: bool,

    /// File date recorded when the entry was encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_date: Option<DateTime<Utc>>,

    /// Stored bytes, present after encode (authoring) or load (reading)
    #[serde(skip)]
    pub cached_bytes: Option<Vec<u8>>,
}

impl FileEntry {
    /// Byte length of this entry's payload in the data block
    pub fn stored_size(&self) -> u64 {
        if self.compressed {
            self.compressed_size
        } else {
            self.size
        }
    }

    /// Final path segment (the file name)
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Copy of the entry's metadata without the cached payload
    ///
    /// Callers of the container API receive these copies; the container keeps
    /// exclusive ownership of the stored bytes.
    pub fn to_metadata(&self) -> FileEntry {
        FileEntry {
            path: self.path.clone(),
            size: self.size,
            compressed_size: self.compressed_size,
            offset: self.offset,
            compressed: self.compressed,
            file_date: self.file_date,
            cached_bytes: None,
        }
    }
}

/// Normalize a virtual path to its canonical stored form
///
/// Backslashes are treated as separators, duplicate separators collapse, and
/// leading/trailing separators are stripped. Returns `None` when the path
/// names no file: empty input, a bare separator, or a path ending in a
/// separator.
pub(crate) fn normalize(path: &str) -> Option<String> {
    let replaced = path.replace('\\', "/");

    // A trailing separator means a directory reference, not a file.
    if replaced.ends_with('/') {
        return None;
    }

    let segments: Vec<&str> = replaced.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }

    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, size: u64, compressed_size: u64, compressed: bool) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            size,
            compressed_size,
            offset: 0,
            compressed,
            file_date: None,
            cached_bytes: Some(vec![1, 2, 3]),
        }
    }

    #[test]
    fn test_stored_size() {
        assert_eq!(entry("a", 100, 40, true).stored_size(), 40);
        assert_eq!(entry("a", 100, 100, false).stored_size(), 100);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(entry("images/ui/a.png", 1, 1, false).file_name(), "a.png");
        assert_eq!(entry("top.bin", 1, 1, false).file_name(), "top.bin");
    }

    #[test]
    fn test_to_metadata_drops_cache() {
        let meta = entry("a", 3, 3, false).to_metadata();
        assert!(meta.cached_bytes.is_none());
        assert_eq!(meta.path, "a");
        assert_eq!(meta.size, 3);
    }

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("images/a.png").as_deref(), Some("images/a.png"));
        assert_eq!(normalize("/images/a.png").as_deref(), Some("images/a.png"));
        assert_eq!(normalize("images//a.png").as_deref(), Some("images/a.png"));
        assert_eq!(
            normalize("images\\ui\\a.png").as_deref(),
            Some("images/ui/a.png")
        );
    }

    #[test]
    fn test_normalize_rejects_non_files() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("/"), None);
        assert_eq!(normalize("images/"), None);
        assert_eq!(normalize("\\"), None);
        assert_eq!(normalize("///"), None);
    }
}
