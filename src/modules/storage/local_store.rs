//! Local filesystem blob store for attachment namespaces.
//!
//! Each record owns one namespace (a directory named after its surrogate
//! key) holding the current file per slot plus archived prior versions.
//! Archival is rename-only; nothing under a namespace is ever deleted.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::core::error::{AppError, Result};

/// Storage collaborator for attachment files. Any durable, path-addressable
/// store satisfies this; the core only needs these four operations.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `namespace/name`, creating the namespace if needed.
    async fn write(&self, namespace: &str, name: &str, data: &[u8]) -> Result<()>;

    /// Rename a file within its namespace (used for archival, never copy).
    async fn rename(&self, namespace: &str, from: &str, to: &str) -> Result<()>;

    /// Names in a namespace starting with `prefix`, sorted ascending.
    /// An unknown namespace is an empty listing, not an error.
    async fn list_names(&self, namespace: &str, prefix: &str) -> Result<Vec<String>>;

    /// Read a file's full contents.
    async fn read(&self, namespace: &str, name: &str) -> Result<Vec<u8>>;
}

/// Filesystem-backed blob store rooted at a base directory.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    fn file_path(&self, namespace: &str, name: &str) -> Result<PathBuf> {
        // Names are produced by the attachment service, but reject anything
        // that would resolve outside the namespace regardless.
        if !is_plain_name(namespace) || !is_plain_name(name) {
            return Err(AppError::InvalidFile(format!(
                "invalid blob path component: {}/{}",
                namespace, name
            )));
        }
        Ok(self.namespace_dir(namespace).join(name))
    }
}

fn is_plain_name(component: &str) -> bool {
    !component.is_empty()
        && component != "."
        && component != ".."
        && !component.contains(['/', '\\'])
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn write(&self, namespace: &str, name: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(namespace, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        debug!(namespace, name, size = data.len(), "blob store: write");
        fs::write(&path, data).await?;
        Ok(())
    }

    async fn rename(&self, namespace: &str, from: &str, to: &str) -> Result<()> {
        let from_path = self.file_path(namespace, from)?;
        let to_path = self.file_path(namespace, to)?;
        debug!(namespace, from, to, "blob store: rename");
        fs::rename(&from_path, &to_path).await?;
        Ok(())
    }

    async fn list_names(&self, namespace: &str, prefix: &str) -> Result<Vec<String>> {
        let dir = self.namespace_dir(namespace);
        if !Path::new(&dir).exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(prefix) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read(&self, namespace: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.file_path(namespace, name)?;
        Ok(fs::read(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let (_dir, store) = store();
        store.write("ns1", "a.pdf", b"hello").await.unwrap();
        assert_eq!(store.read("ns1", "a.pdf").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_rename_moves_not_copies() {
        let (_dir, store) = store();
        store.write("ns1", "a.pdf", b"v1").await.unwrap();
        store.rename("ns1", "a.pdf", "OLD_a.pdf").await.unwrap();
        assert_eq!(store.read("ns1", "OLD_a.pdf").await.unwrap(), b"v1");
        assert!(store.read("ns1", "a.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_list_names_filters_by_prefix() {
        let (_dir, store) = store();
        store.write("ns1", "HO_1.pdf", b"x").await.unwrap();
        store.write("ns1", "OLD_HO_1.pdf", b"x").await.unwrap();
        store.write("ns1", "OLD_HO_2.pdf", b"x").await.unwrap();
        let names = store.list_names("ns1", "OLD_HO_").await.unwrap();
        assert_eq!(names, vec!["OLD_HO_1.pdf", "OLD_HO_2.pdf"]);
    }

    #[tokio::test]
    async fn test_unknown_namespace_lists_empty() {
        let (_dir, store) = store();
        assert!(store.list_names("missing", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_traversal_components() {
        let (_dir, store) = store();
        assert!(store.write("..", "a.pdf", b"x").await.is_err());
        assert!(store.write("ns1", "../a.pdf", b"x").await.is_err());
    }
}
