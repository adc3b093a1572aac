//! Artifact stores for externalized raw content.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stixgraph_core::{ArtifactStore, StoreError};

/// Artifacts as files in one directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open (and create if needed) the artifact directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StoreError::Artifact {
                name: name.to_string(),
                message: "not a plain file name".to_string(),
            });
        }
        Ok(self.root.join(name))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.path(name)?.is_file())
    }

    fn save(&mut self, name: &str, content: &[u8]) -> Result<(), StoreError> {
        let path = self.path(name)?;
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "saved artifact");
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path(name)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path(name)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::Artifact {
                name: name.to_string(),
                message: "no such artifact".to_string(),
            },
            _ => StoreError::Io(e),
        })
    }
}

/// Artifacts held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.blobs.contains_key(name))
    }

    fn save(&mut self, name: &str, content: &[u8]) -> Result<(), StoreError> {
        self.blobs.insert(name.to_string(), content.to_vec());
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        self.blobs.remove(name);
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::Artifact {
                name: name.to_string(),
                message: "no such artifact".to_string(),
            })
    }
}
