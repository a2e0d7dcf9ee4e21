//! Durable key-value store on the local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, instrument, warn};

use fellowship_core::Result;
use fellowship_core::error::{Error, StorageError};
use fellowship_core::traits::KeyValueStore;

use crate::store::digest_name;

/// On-disk form of an entry. The key is kept so a file can be matched back
/// to the key that wrote it.
#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    key: String,
    value: String,
}

/// One file per key under a directory.
///
/// Files are named by a SHA-256 digest of the key, so keys of any length
/// fit. Writes go through a temp file and a rename, leaving either the old
/// value or the new one on disk.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// A store in its own subdirectory of `root`, one per `scope`.
    ///
    /// Stores opened with different scopes never see each other's keys;
    /// clearing `root` removes them all.
    pub fn scoped(root: impl AsRef<Path>, scope: &str) -> Self {
        Self::new(root.as_ref().join(digest_name(scope)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.val", digest_name(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let content = match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: Entry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Ignoring unreadable entry");
                return Ok(None);
            }
        };

        if entry.key != key {
            warn!(key, stored = %entry.key, "Entry file holds another key");
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    async fn set(&self, key: &str, value: String) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let entry = Entry {
            key: key.to_string(),
            value,
        };
        let content = serde_json::to_string(&entry).map_err(|e| {
            Error::Storage(StorageError::Serialization {
                message: e.to_string(),
            })
        })?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &path).await?;
        debug!("Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                debug!("Cleared store");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
