//! Named container-format providers
//!
//! Host applications select a container implementation by name from a
//! registry of factories. This replaces runtime plug-in discovery with plain
//! data: a provider is an id, some picker metadata, and two function
//! pointers.

use std::collections::HashMap;
use std::path::Path;

use crate::container::PackArchive;
use crate::error::Result;

/// Provider id of the built-in packed DEFLATE format
pub const PACKFS_PROVIDER_ID: &str = "packfs.deflate";

/// Factory functions and display metadata for one container format
#[derive(Clone)]
pub struct FormatProvider {
    /// Stable identifier hosts select by
    pub id: &'static str,

    /// Human-readable description for file pickers
    pub description: &'static str,

    /// File extension (without dot) conventionally used by the format
    pub extension: &'static str,

    /// Construct an empty, unbacked container
    pub create: fn() -> PackArchive,

    /// Open an existing container file
    pub open: fn(&Path) -> Result<PackArchive>,
}

/// Registry of named container-format factories
pub struct ProviderRegistry {
    providers: HashMap<&'static str, FormatProvider>,
}

impl ProviderRegistry {
    /// Create a registry with no providers
    pub fn new() -> Self {
        ProviderRegistry {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its id, replacing any previous registration
    pub fn register(&mut self, provider: FormatProvider) {
        tracing::debug!(id = provider.id, "registered container format");
        self.providers.insert(provider.id, provider);
    }

    /// Look up a provider by id
    pub fn get(&self, id: &str) -> Option<&FormatProvider> {
        self.providers.get(id)
    }

    /// Registered provider ids, sorted for stable presentation
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.providers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ProviderRegistry {
    /// Registry with the built-in packed DEFLATE format registered
    fn default() -> Self {
        let mut registry = ProviderRegistry::new();
        registry.register(FormatProvider {
            id: PACKFS_PROVIDER_ID,
            description: "Packed file system (DEFLATE)",
            extension: "pack",
            create: PackArchive::create_empty,
            open: open_packfs,
        });
        registry
    }
}

fn open_packfs(path: &Path) -> Result<PackArchive> {
    PackArchive::open(path)
}
