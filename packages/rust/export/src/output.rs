//! Per-request output directories and the files written into them.
//!
//! Every export gets its own `<root>/<uuid>/` directory, so the fixed
//! artifact names never collide between concurrent requests.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use nobestudy_shared::{FileType, NobestudyError, Result};

/// A directory owned by exactly one export request.
#[derive(Debug)]
pub struct RequestDir {
    id: Uuid,
    path: PathBuf,
}

impl RequestDir {
    /// Create a fresh, uniquely named directory under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        let id = Uuid::now_v7();
        let path = root.join(id.to_string());
        std::fs::create_dir_all(&path).map_err(|e| NobestudyError::io(&path, e))?;
        debug!(path = %path.display(), "created request directory");
        Ok(Self { id, path })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the artifact for `file_type` atomically (temp file, then rename).
    /// On failure the whole directory is removed before the error is returned.
    pub fn write_artifact(self, file_type: FileType, bytes: &[u8]) -> Result<ExportedFile> {
        let filename = file_type.artifact_name();
        let target = self.path.join(filename);

        if let Err(e) = self.persist(filename, &target, bytes) {
            self.discard();
            return Err(e);
        }

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        info!(
            file = %target.display(),
            size = bytes.len(),
            "wrote export artifact"
        );

        Ok(ExportedFile {
            request_id: self.id,
            dir: self.path,
            path: target,
            file_type,
            sha256,
            size_bytes: bytes.len(),
            created_at: Utc::now(),
        })
    }

    fn persist(&self, filename: &str, target: &Path, bytes: &[u8]) -> Result<()> {
        let temp = self.path.join(format!(".{filename}.tmp"));
        std::fs::write(&temp, bytes).map_err(|e| NobestudyError::io(&temp, e))?;
        std::fs::rename(&temp, target).map_err(|e| NobestudyError::io(target, e))
    }

    fn discard(self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed unfinished request directory"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove unfinished request directory"
            ),
        }
    }
}

/// A persisted export. Owns its request directory until [`cleanup`](Self::cleanup).
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub request_id: Uuid,
    dir: PathBuf,
    pub path: PathBuf,
    pub file_type: FileType,
    pub sha256: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

impl ExportedFile {
    /// The fixed artifact name, used as the attachment file name on delivery.
    pub fn file_name(&self) -> &'static str {
        self.file_type.artifact_name()
    }

    /// Read the file back for delivery to the caller.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| NobestudyError::io(&self.path, e))
    }

    /// Copy the file to `dest`, returning the number of bytes copied.
    pub fn copy_to(&self, dest: &Path) -> Result<u64> {
        std::fs::copy(&self.path, dest).map_err(|e| NobestudyError::io(dest, e))
    }

    /// Copy the file to `dest` for delivery. Unless `keep_dir` is set the
    /// request directory is removed afterwards, whether or not the copy
    /// succeeded. Returns the number of bytes copied.
    pub fn deliver_to(self, dest: &Path, keep_dir: bool) -> Result<u64> {
        let copied = self.copy_to(dest);
        if keep_dir {
            info!(path = %self.path.display(), "keeping request directory");
            return copied;
        }
        let removed = self.cleanup();
        let bytes = copied?;
        removed?;
        Ok(bytes)
    }

    /// Remove the request directory and everything in it.
    pub fn cleanup(self) -> Result<()> {
        std::fs::remove_dir_all(&self.dir).map_err(|e| NobestudyError::io(&self.dir, e))?;
        debug!(path = %self.dir.display(), "removed request directory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root() -> PathBuf {
        std::env::temp_dir().join(format!("nobestudy-output-test-{}", Uuid::now_v7()))
    }

    #[test]
    fn artifact_lands_under_fixed_name_in_unique_dir() {
        let root = scratch_root();
        let dir = RequestDir::create(&root).unwrap();
        let id = dir.id();
        assert!(dir.path().ends_with(id.to_string()));
        let first = dir.write_artifact(FileType::Pdf, b"%PDF-1.5 first").unwrap();
        assert_eq!(first.request_id, id);
        let second = RequestDir::create(&root)
            .unwrap()
            .write_artifact(FileType::Pdf, b"%PDF-1.5 second")
            .unwrap();

        assert_eq!(first.path.file_name().unwrap(), "output.pdf");
        assert_eq!(second.path.file_name().unwrap(), "output.pdf");
        assert_ne!(first.path, second.path);
        assert_eq!(first.read_bytes().unwrap(), b"%PDF-1.5 first");
        assert_eq!(second.read_bytes().unwrap(), b"%PDF-1.5 second");
        assert_eq!(first.sha256.len(), 64);
        assert_eq!(first.size_bytes, 14);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let root = scratch_root();
        let file = RequestDir::create(&root)
            .unwrap()
            .write_artifact(FileType::Docx, b"PK")
            .unwrap();
        let entries: Vec<_> = std::fs::read_dir(file.path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, ["Nobestudy.docx"]);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn cleanup_removes_request_dir() {
        let root = scratch_root();
        let file = RequestDir::create(&root)
            .unwrap()
            .write_artifact(FileType::Ppt, b"PK")
            .unwrap();
        let dir = file.path.parent().unwrap().to_path_buf();
        assert!(dir.exists());

        file.cleanup().unwrap();
        assert!(!dir.exists());
        assert!(root.exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn failed_rename_removes_request_dir() {
        let root = scratch_root();
        let dir = RequestDir::create(&root).unwrap();
        let req_path = dir.path().to_path_buf();
        // A non-empty directory at the target name makes the rename fail.
        std::fs::create_dir_all(req_path.join("output.pdf").join("occupied")).unwrap();

        let err = dir.write_artifact(FileType::Pdf, b"%PDF").unwrap_err();
        assert!(matches!(err, NobestudyError::Io { .. }));
        assert!(!req_path.exists());
        assert!(root.exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn failed_delivery_still_removes_request_dir() {
        let root = scratch_root();
        let file = RequestDir::create(&root)
            .unwrap()
            .write_artifact(FileType::Pdf, b"%PDF")
            .unwrap();
        let dir = file.path.parent().unwrap().to_path_buf();
        let dest = root.join("missing").join("out.pdf");

        let err = file.deliver_to(&dest, false).unwrap_err();
        assert!(matches!(err, NobestudyError::Io { ref path, .. } if *path == dest));
        assert!(!dir.exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn delivery_copies_and_honours_keep_dir() {
        let root = scratch_root();
        let dest = root.join("delivered.docx");

        let kept = RequestDir::create(&root)
            .unwrap()
            .write_artifact(FileType::Docx, b"PK kept")
            .unwrap();
        let kept_dir = kept.path.parent().unwrap().to_path_buf();
        assert_eq!(kept.deliver_to(&dest, true).unwrap(), 7);
        assert!(kept_dir.exists());

        let dropped = RequestDir::create(&root)
            .unwrap()
            .write_artifact(FileType::Docx, b"PK")
            .unwrap();
        let dropped_dir = dropped.path.parent().unwrap().to_path_buf();
        assert_eq!(dropped.deliver_to(&dest, false).unwrap(), 2);
        assert!(!dropped_dir.exists());
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK");

        let _ = std::fs::remove_dir_all(&root);
    }
}
