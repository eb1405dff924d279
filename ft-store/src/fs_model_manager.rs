use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Hands out paths inside the data directory and does the JSON document
/// plumbing for the file-backed stores.
///
/// Every document is pretty-printed JSON in its own file, so the on-disk
/// state stays inspectable with a text editor and any single document can
/// be deleted to reset just that piece of state.
#[derive(Debug, Clone)]
pub struct FsModelManager {
    root: PathBuf,
}

impl FsModelManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and decode a document. A missing file is `Ok(None)`, a file
    /// that exists but doesn't decode is an error.
    pub async fn load<T: DeserializeOwned>(&self, relative_path: &str) -> Result<Option<T>> {
        let path = self.root.join(relative_path);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let value = serde_json::from_slice(&bytes).with_context(|| format!("decoding {}", path.display()))?;
        Ok(Some(value))
    }

    /// Encode and write a document, creating parent directories as needed.
    pub async fn store<T: Serialize>(&self, relative_path: &str, value: &T) -> Result<()> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
