use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::host::FileStore;
use crate::model::{FileRef, StoredFile};
use crate::storage::sha256_hex;

/// Component artifacts are filed under once a task takes ownership of them.
pub const ARTIFACT_COMPONENT: &str = "archivingmod_quiz";
/// File area of task artifacts.
pub const ARTIFACT_FILEAREA: &str = "artifact";

/// Move a file from `src` to `dst`. Uses `rename` first (fast, atomic on same
/// filesystem). Falls back to copy + delete when rename fails, e.g. across devices.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\')
        && !segment.contains('\0')
}

/// File store laid out as
/// `{root}/{contextid}/{component}/{filearea}/{itemid}{filepath}{filename}`.
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of a reference. Rejects anything that could
    /// escape the root.
    pub fn path_for(&self, reference: &FileRef) -> Result<PathBuf, StorageError> {
        let invalid = |what: &str| {
            StorageError::InvalidReference(format!("{} in {:?}", what, reference))
        };

        for segment in [&reference.component, &reference.filearea, &reference.filename] {
            if !is_safe_segment(segment) {
                return Err(invalid("unsafe path segment"));
            }
        }
        if !reference.filepath.starts_with('/') || !reference.filepath.ends_with('/') {
            return Err(invalid("filepath must start and end with '/'"));
        }

        let mut path = self
            .root
            .join(reference.context_id.to_string())
            .join(&reference.component)
            .join(&reference.filearea)
            .join(reference.item_id.to_string());
        for segment in reference.filepath.split('/').filter(|s| !s.is_empty()) {
            if !is_safe_segment(segment) {
                return Err(invalid("unsafe filepath segment"));
            }
            path.push(segment);
        }
        path.push(&reference.filename);
        Ok(path)
    }

    /// Writes a new file. Fails if it already exists.
    pub fn put(&self, reference: &FileRef, content: &[u8]) -> Result<StoredFile, StorageError> {
        let path = self.path_for(reference)?;
        if let Some(parent) = path.parent() {
            self.ensure_directory(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::FileExists(path.clone())
                } else {
                    StorageError::WriteFile {
                        path: path.clone(),
                        source: e,
                    }
                }
            })?;
        file.write_all(content)
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;

        Ok(describe(reference.clone(), &path, content))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

fn describe(reference: FileRef, path: &Path, content: &[u8]) -> StoredFile {
    let mimetype = mime_guess::from_path(path)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    StoredFile {
        reference,
        filesize: content.len() as u64,
        mimetype,
        contenthash: sha256_hex(content),
    }
}

impl FileStore for FileSystemStore {
    fn get_file(&self, reference: &FileRef) -> Result<Option<StoredFile>, StorageError> {
        let path = self.path_for(reference)?;
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read(&path).map_err(|e| StorageError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(describe(reference.clone(), &path, &content)))
    }

    fn read(&self, file: &StoredFile) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(&file.reference)?;
        std::fs::read(&path).map_err(|e| StorageError::ReadFile { path, source: e })
    }

    fn delete(&self, file: &StoredFile) -> Result<(), StorageError> {
        let path = self.path_for(&file.reference)?;
        std::fs::remove_file(&path).map_err(|e| StorageError::DeleteFile { path, source: e })
    }

    fn store_artifact(&self, draft: &StoredFile, task_id: i64) -> Result<StoredFile, StorageError> {
        let src = self.path_for(&draft.reference)?;
        let target = FileRef::new(
            draft.reference.context_id,
            ARTIFACT_COMPONENT,
            ARTIFACT_FILEAREA,
            task_id,
            "/",
            draft.reference.filename.clone(),
        );
        let dst = self.path_for(&target)?;
        if dst.exists() {
            return Err(StorageError::FileExists(dst));
        }
        if let Some(parent) = dst.parent() {
            self.ensure_directory(parent)?;
        }

        move_file(&src, &dst)?;
        log::debug!("Moved artifact of task {} to {}", task_id, dst.display());

        Ok(StoredFile {
            reference: target,
            ..draft.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(name: &str) -> FileRef {
        FileRef::new(5, "user", "draft", 77, "/", name)
    }

    #[test]
    fn test_put_and_get() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());

        let stored = store.put(&draft("result.png"), b"png-bytes").unwrap();
        assert_eq!(stored.mimetype, "image/png");
        assert_eq!(stored.filesize, 9);

        let found = store.get_file(&draft("result.png")).unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(store.read(&found).unwrap(), b"png-bytes");
        assert!(temp.path().join("5/user/draft/77/result.png").exists());
    }

    #[test]
    fn test_get_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        assert!(store.get_file(&draft("missing.txt")).unwrap().is_none());
    }

    #[test]
    fn test_put_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        store.put(&draft("a.txt"), b"one").unwrap();
        assert!(matches!(
            store.put(&draft("a.txt"), b"two"),
            Err(StorageError::FileExists(_))
        ));
    }

    #[test]
    fn test_nested_filepath() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        let reference = FileRef::new(1, "mod_quiz", "intro", 0, "/img/", "a.gif");
        store.put(&reference, b"gif").unwrap();
        assert!(temp.path().join("1/mod_quiz/intro/0/img/a.gif").exists());
    }

    #[test]
    fn test_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        for reference in [
            FileRef::new(1, "..", "draft", 0, "/", "a"),
            FileRef::new(1, "user", "draft", 0, "/../", "a"),
            FileRef::new(1, "user", "draft", 0, "/", "../a"),
            FileRef::new(1, "user", "draft", 0, "nested", "a"),
        ] {
            assert!(matches!(
                store.path_for(&reference),
                Err(StorageError::InvalidReference(_))
            ));
        }
    }

    #[test]
    fn test_store_artifact_moves_draft() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        let stored = store.put(&draft("archive.tar.gz"), b"archive").unwrap();

        let artifact = store.store_artifact(&stored, 12).unwrap();
        assert_eq!(artifact.reference.component, ARTIFACT_COMPONENT);
        assert_eq!(artifact.reference.item_id, 12);
        assert_eq!(artifact.contenthash, stored.contenthash);
        assert!(store.get_file(&draft("archive.tar.gz")).unwrap().is_none());
        assert_eq!(store.read(&artifact).unwrap(), b"archive");
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp.path());
        let stored = store.put(&draft("x.bin"), b"x").unwrap();
        store.delete(&stored).unwrap();
        assert!(store.get_file(&draft("x.bin")).unwrap().is_none());
        assert!(matches!(
            store.delete(&stored),
            Err(StorageError::DeleteFile { .. })
        ));
    }
}
