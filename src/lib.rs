//! # PackFS - Packed Virtual File System
//!
//! `packfs` stores many logical files inside one physical container file,
//! with per-entry DEFLATE compression and a compressed directory index at
//! the head of the container.
//!
//! ## Features
//!
//! - **Single-file containers**: one archive file holds a whole virtual
//!   file tree, addressed by forward-slash paths
//! - **Store-if-smaller compression**: payloads are DEFLATE-compressed at
//!   maximum effort, falling back to raw storage when compression does not
//!   reduce size
//! - **Lazy reads**: opening a container parses only the index; entry
//!   payloads load on demand by byte offset
//! - **Atomic saves**: the container is rewritten through a temporary file
//!   and renamed into place, so an interrupted save never corrupts the
//!   archive
//! - **Named providers**: hosts pick a container format from a registry of
//!   factories instead of reflecting over plug-ins
//!
//! ## Container layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Magic: "PACKFS01.DEFLATE"                   │
//! │ Index length (u32 LE)                       │
//! │ Compressed JSON directory index             │
//! ├─────────────────────────────────────────────┤
//! │ Data block                                  │
//! │  - entry payloads, concatenated in          │
//! │    index order (compressed or raw)          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use packfs::PackArchive;
//!
//! # fn main() -> packfs::Result<()> {
//! // Author a container in memory
//! let mut archive = PackArchive::create_empty();
//! archive.encode("images/logo.png", &std::fs::read("logo.png")?)?;
//! archive.encode("config/settings.json", b"{\"volume\": 0.8}")?;
//! archive.save("assets.pack")?;
//!
//! // Reopen and read entries lazily
//! let mut archive = PackArchive::open("assets.pack")?;
//! let settings = archive.read("config/settings.json")?;
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod container;
pub mod entry;
pub mod error;
pub mod index;
pub mod provider;

// Re-export commonly used types
pub use container::{PackArchive, MAGIC};
pub use entry::FileEntry;
pub use error::{PackError, Result};
pub use index::{DirectoryIndex, INDEX_HEADER};
pub use provider::{FormatProvider, ProviderRegistry, PACKFS_PROVIDER_ID};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
