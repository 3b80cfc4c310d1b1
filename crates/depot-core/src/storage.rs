//! Storage backend abstraction for the release bucket.
//!
//! This module defines the object-store contract the reconciler runs
//! against. The contract is intentionally small: list a prefix, read an
//! object, delete objects. Cloud backends (S3, GCS) implement this
//! trait outside of this workspace; depot ships an in-memory double for
//! tests and a local-filesystem backend for operating on an on-disk
//! mirror of the bucket.
//!
//! Two contract points matter to callers:
//!
//! - `list` returns an empty vector when nothing matches the prefix,
//!   never an error.
//! - `delete`/`delete_batch` are idempotent; deleting a missing key
//!   succeeds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Object path (key).
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification timestamp, when the backend knows it.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage backend trait for the release bucket.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads an entire object as text-capable bytes.
    ///
    /// Returns `Error::NotFound` if the object doesn't exist.
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Writes an object unconditionally.
    async fn put(&self, path: &str, data: Bytes) -> Result<()>;

    /// Deletes an object.
    ///
    /// Succeeds even if the object doesn't exist (idempotent).
    async fn delete(&self, path: &str) -> Result<()>;

    /// Deletes a batch of objects.
    ///
    /// Missing keys are not errors. The default implementation issues
    /// sequential deletes; backends with a native bulk-delete call
    /// should override it.
    async fn delete_batch(&self, paths: &[String]) -> Result<()> {
        for path in paths {
            self.delete(path).await?;
        }
        Ok(())
    }

    /// Lists objects with the given prefix.
    ///
    /// Returns an empty vec if no objects match.
    ///
    /// **Ordering**: results are returned in arbitrary order. Callers
    /// requiring deterministic order should sort (e.g., by `path`).
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if the object doesn't exist.
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>>;
}

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Clones share the same object map. Not
/// suitable for production.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(format!("object not found: {path}")))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .insert(
                path.to_string(),
                StoredObject {
                    data,
                    last_modified: Utc::now(),
                },
            );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(path, obj)| ObjectMeta {
                path: path.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        Ok(objects.get(path).map(|obj| ObjectMeta {
            path: path.to_string(),
            size: obj.data.len() as u64,
            last_modified: Some(obj.last_modified),
        }))
    }
}

/// Local-filesystem storage backend.
///
/// Treats slash-separated object keys as paths relative to a root
/// directory, so the reconciler can operate on an on-disk mirror of
/// the release bucket.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Creates a backend rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/').filter(|s| !s.is_empty() && *s != "..") {
            path.push(segment);
        }
        path
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<&str> = rel.iter().filter_map(std::ffi::OsStr::to_str).collect();
        Some(segments.join("/"))
    }
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("object not found: {path}")))
            }
            Err(e) => Err(Error::storage_with_source(format!("read {path}"), e)),
        }
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage_with_source(format!("mkdir for {path}"), e))?;
        }
        tokio::fs::write(&full, &data)
            .await
            .map_err(|e| Error::storage_with_source(format!("write {path}"), e))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_with_source(format!("delete {path}"), e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let mut results = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::storage_with_source(
                        format!("list {}", dir.display()),
                        e,
                    ));
                }
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Error::storage_with_source("read dir entry", e))?
            {
                let path = entry.path();
                let meta = entry
                    .metadata()
                    .await
                    .map_err(|e| Error::storage_with_source("stat dir entry", e))?;

                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Some(key) = self.key_for(&path) else {
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }

                let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
                results.push(ObjectMeta {
                    path: key,
                    size: meta.len(),
                    last_modified,
                });
            }
        }

        Ok(results)
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let full = self.resolve(path);
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(Some(ObjectMeta {
                path: path.to_string(),
                size: meta.len(),
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage_with_source(format!("head {path}"), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        let data = Bytes::from("hello world");

        backend
            .put("test/file.txt", data.clone())
            .await
            .expect("put should succeed");

        let retrieved = backend
            .get("test/file.txt")
            .await
            .expect("get should succeed");
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn memory_backend_get_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("nope.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn memory_backend_list_with_prefix() {
        let backend = MemoryBackend::new();

        backend.put("a/1.txt", Bytes::from("a1")).await.unwrap();
        backend.put("a/2.txt", Bytes::from("a2")).await.unwrap();
        backend.put("b/1.txt", Bytes::from("b1")).await.unwrap();

        let list_a = backend.list("a/").await.expect("should succeed");
        assert_eq!(list_a.len(), 2);

        let list_none = backend.list("c/").await.expect("should succeed");
        assert!(list_none.is_empty());
    }

    #[tokio::test]
    async fn memory_backend_delete_is_idempotent() {
        let backend = MemoryBackend::new();

        backend.put("del.txt", Bytes::from("data")).await.unwrap();
        backend.delete("del.txt").await.expect("should succeed");
        assert!(backend.head("del.txt").await.unwrap().is_none());

        // Second delete of a missing key succeeds too.
        backend.delete("del.txt").await.expect("should succeed");
    }

    #[tokio::test]
    async fn memory_backend_delete_batch() {
        let backend = MemoryBackend::new();
        backend.put("x/1", Bytes::from("1")).await.unwrap();
        backend.put("x/2", Bytes::from("2")).await.unwrap();

        backend
            .delete_batch(&["x/1".to_string(), "x/2".to_string(), "x/3".to_string()])
            .await
            .expect("batch delete should succeed");

        assert!(backend.list("x/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fs_backend_roundtrip_and_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FsBackend::new(dir.path());

        backend
            .put("nightly/build-1.tgz", Bytes::from("tar data"))
            .await
            .expect("put");
        backend
            .put("nightly/build-1.tgz.md5", Bytes::from("digest"))
            .await
            .expect("put");
        backend
            .put("release/build.exe", Bytes::from("exe"))
            .await
            .expect("put");

        let nightly = backend.list("nightly/").await.expect("list");
        assert_eq!(nightly.len(), 2);
        assert!(nightly.iter().all(|m| m.path.starts_with("nightly/")));

        let body = backend.get("nightly/build-1.tgz").await.expect("get");
        assert_eq!(body, Bytes::from("tar data"));
    }

    #[tokio::test]
    async fn fs_backend_missing_root_lists_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FsBackend::new(dir.path().join("does-not-exist"));

        let listed = backend.list("").await.expect("list");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn fs_backend_delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FsBackend::new(dir.path());

        backend.put("a/b.txt", Bytes::from("x")).await.unwrap();
        backend.delete("a/b.txt").await.expect("delete");
        backend.delete("a/b.txt").await.expect("second delete");
        assert!(backend.head("a/b.txt").await.unwrap().is_none());
    }
}
