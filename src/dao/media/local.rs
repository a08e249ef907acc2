use std::path::{Component, Path, PathBuf};

use futures::future::BoxFuture;
use tracing::debug;

use super::{MediaBackend, MediaRef, sanitize_filename};
use crate::dao::storage::{StorageError, StorageResult};

/// Stores uploads as plain files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalMedia {
    root: PathBuf,
}

impl LocalMedia {
    /// Backend rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of a relative reference, refusing anything that
    /// would escape the root.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }

    /// Like [`resolve`](Self::resolve) but only when the file exists.
    pub fn existing(&self, relative: &str) -> Option<PathBuf> {
        self.resolve(relative).filter(|path| path.is_file())
    }
}

impl MediaBackend for LocalMedia {
    fn put(
        &self,
        subdir: &str,
        filename: &str,
        body: Vec<u8>,
    ) -> BoxFuture<'static, StorageResult<MediaRef>> {
        let subdir = subdir.trim_matches('/').to_owned();
        let filename = sanitize_filename(filename);
        let dir = self.root.join(&subdir);

        Box::pin(async move {
            tokio::fs::create_dir_all(&dir).await.map_err(|source| {
                StorageError::unavailable(format!("create {}", dir.display()), source)
            })?;
            let path = dir.join(&filename);
            tokio::fs::write(&path, &body).await.map_err(|source| {
                StorageError::unavailable(format!("write {}", path.display()), source)
            })?;
            debug!(path = %path.display(), bytes = body.len(), "stored local upload");

            let relative = if subdir.is_empty() {
                filename
            } else {
                format!("{subdir}/{filename}")
            };
            Ok(MediaRef::Local(relative))
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_file_and_returns_local_ref() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMedia::new(dir.path());

        let media = store
            .put("hints", "../evil/hint_01.jpg", b"jpeg".to_vec())
            .await
            .unwrap();

        assert_eq!(media, MediaRef::Local("hints/hint_01.jpg".into()));
        let on_disk = store.existing("hints/hint_01.jpg").unwrap();
        assert_eq!(std::fs::read(on_disk).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn put_overwrites_previous_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMedia::new(dir.path());
        store.put("audio", "01.mp3", b"one".to_vec()).await.unwrap();
        store.put("audio", "01.mp3", b"two".to_vec()).await.unwrap();

        let path = store.existing("audio/01.mp3").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"two");
    }

    #[test]
    fn resolve_rejects_traversal() {
        let store = LocalMedia::new("/srv/uploads");
        assert!(store.resolve("../secret").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert_eq!(
            store.resolve("audio/a.mp3"),
            Some(PathBuf::from("/srv/uploads/audio/a.mp3"))
        );
        assert!(store.existing("audio/missing.mp3").is_none());
    }
}
