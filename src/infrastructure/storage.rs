use crate::domain::error::{AppError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Upload-dir subdirectory holding digests computed at save time.
const DIGEST_DIR: &str = ".digests";

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::IoError(msg.into())
}

/// An uploaded dataset persisted on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDataset {
    pub file_name: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Local storage for uploads and generated DDL scripts.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    upload_dir: PathBuf,
    ddl_dir: PathBuf,
}

impl DatasetStore {
    pub fn new(upload_dir: impl Into<PathBuf>, ddl_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            ddl_dir: ddl_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn ddl_dir(&self) -> &Path {
        &self.ddl_dir
    }

    pub fn ensure(&self) -> Result<()> {
        ensure_dir(&self.upload_dir)?;
        ensure_dir(&self.ddl_dir)?;
        Ok(())
    }

    /// Persist an upload under its own file name, replacing an older copy.
    pub fn save_upload(&self, file_name: &str, bytes: &[u8]) -> Result<StoredDataset> {
        let file_name = safe_file_name(file_name)?;
        let path = self.upload_dir.join(&file_name);
        atomic_write_bytes(&path, bytes)?;

        let stored = StoredDataset {
            file_name,
            path,
            sha256: sha256_hex(bytes),
            size_bytes: bytes.len() as u64,
        };
        self.write_digest(&stored)?;
        info!(
            file = %stored.file_name,
            size_bytes = stored.size_bytes,
            sha256 = %stored.sha256,
            "Stored uploaded dataset"
        );
        Ok(stored)
    }

    /// Path of a previously stored upload.
    pub fn find_upload(&self, file_name: &str) -> Result<PathBuf> {
        let path = self.upload_dir.join(safe_file_name(file_name)?);
        if !path.is_file() {
            return Err(AppError::NotFound(format!("Dataset '{}'", file_name)));
        }
        Ok(path)
    }

    /// Raw bytes of a previously stored upload.
    pub fn read_upload(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.find_upload(file_name)?;
        fs::read(&path).map_err(|e| io_err(format!("Failed to read {}: {e}", path.display())))
    }

    pub fn list_uploads(&self) -> Result<Vec<StoredDataset>> {
        if !self.upload_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.upload_dir).map_err(|e| {
            io_err(format!(
                "Failed to list {}: {e}",
                self.upload_dir.display()
            ))
        })?;

        let mut datasets = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // leftovers of interrupted writes
            if file_name.contains(".tmp-") || file_name.contains(".bak-") {
                continue;
            }
            let size_bytes = entry
                .metadata()
                .map_err(|e| io_err(format!("Failed to stat {}: {e}", path.display())))?
                .len();
            let file_name = file_name.to_string();
            let sha256 = match self.read_digest(&file_name, size_bytes) {
                Some(sha256) => sha256,
                None => {
                    let bytes = fs::read(&path)
                        .map_err(|e| io_err(format!("Failed to read {}: {e}", path.display())))?;
                    let stored = StoredDataset {
                        file_name: file_name.clone(),
                        path: path.clone(),
                        sha256: sha256_hex(&bytes),
                        size_bytes: bytes.len() as u64,
                    };
                    if let Err(e) = self.write_digest(&stored) {
                        warn!(file = %file_name, error = %e, "Failed to cache dataset digest");
                    }
                    stored.sha256
                }
            };
            datasets.push(StoredDataset {
                file_name,
                path,
                sha256,
                size_bytes,
            });
        }

        datasets.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(datasets)
    }

    fn digest_path(&self, file_name: &str) -> PathBuf {
        self.upload_dir
            .join(DIGEST_DIR)
            .join(format!("{}.sha256", file_name))
    }

    /// Sidecar line format: `<sha256> <size_bytes>`.
    fn write_digest(&self, stored: &StoredDataset) -> Result<()> {
        let line = format!("{} {}\n", stored.sha256, stored.size_bytes);
        atomic_write_bytes(&self.digest_path(&stored.file_name), line.as_bytes())
    }

    /// Cached digest, or `None` when missing or recorded for a different size.
    fn read_digest(&self, file_name: &str, size_bytes: u64) -> Option<String> {
        let text = fs::read_to_string(self.digest_path(file_name)).ok()?;
        let mut parts = text.split_whitespace();
        let sha256 = parts.next()?;
        let recorded: u64 = parts.next()?.parse().ok()?;
        if recorded != size_bytes || sha256.len() != 64 {
            return None;
        }
        Some(sha256.to_string())
    }
}

/// Strip any directory components from a client-supplied file name.
fn safe_file_name(file_name: &str) -> Result<String> {
    let name = Path::new(file_name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if name.is_empty() || name.starts_with('.') {
        return Err(AppError::InputError(format!(
            "Invalid upload file name '{}'",
            file_name
        )));
    }
    Ok(name.to_string())
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| io_err(format!("Failed to create dir {}: {e}", path.display())))?;
    Ok(())
}

pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            io_err(format!(
                "Failed to create temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.write_all(bytes).map_err(|e| {
            io_err(format!(
                "Failed to write temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.sync_all().ok();
    }

    // Windows cannot rename over an existing file, so move the old one aside first.
    if path.exists() {
        let backup = path.with_extension(format!("bak-{}", Uuid::new_v4()));
        fs::rename(path, &backup).map_err(|e| {
            io_err(format!(
                "Failed to move existing file {} to {}: {e}",
                path.display(),
                backup.display()
            ))
        })?;

        fs::rename(&tmp_path, path).map_err(|e| {
            io_err(format!(
                "Failed to rename temp file {} to {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })?;

        let _ = fs::remove_file(&backup);
    } else {
        fs::rename(&tmp_path, path).map_err(|e| {
            io_err(format!(
                "Failed to rename temp file {} to {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })?;
    }
    Ok(())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read a text file, treating a missing file as empty.
pub fn read_optional_text(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "File not found, using empty content");
            Ok(String::new())
        }
        Err(e) => Err(io_err(format!("Failed to read {}: {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_list_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("uploads"), dir.path().join("ddl"));
        store.ensure().unwrap();

        let stored = store.save_upload("sales.csv", b"id\n1\n").unwrap();
        assert_eq!(stored.file_name, "sales.csv");
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(fs::read(&stored.path).unwrap(), b"id\n1\n");

        // overwrite keeps a single copy
        store.save_upload("sales.csv", b"id\n2\n").unwrap();
        let listed = store.list_uploads().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sha256, sha256_hex(b"id\n2\n"));
    }

    #[test]
    fn test_list_uses_digest_from_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("uploads"), dir.path().join("ddl"));
        let stored = store.save_upload("sales.csv", b"id\n1\n").unwrap();

        // replace the cached digest with a marker of the right size
        let marker = "f".repeat(64);
        fs::write(
            store.digest_path("sales.csv"),
            format!("{} {}\n", marker, stored.size_bytes),
        )
        .unwrap();
        let listed = store.list_uploads().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sha256, marker);
        assert_eq!(listed[0].size_bytes, 5);

        // a size change invalidates the cached digest
        fs::write(&stored.path, b"id\n10\n").unwrap();
        let listed = store.list_uploads().unwrap();
        assert_eq!(listed[0].sha256, sha256_hex(b"id\n10\n"));
        assert_eq!(listed[0].size_bytes, 6);

        // missing sidecar falls back to hashing and is recreated
        fs::remove_file(store.digest_path("sales.csv")).unwrap();
        let listed = store.list_uploads().unwrap();
        assert_eq!(listed[0].sha256, sha256_hex(b"id\n10\n"));
        assert!(store.digest_path("sales.csv").is_file());
    }

    #[test]
    fn test_read_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("uploads"), dir.path().join("ddl"));
        store.save_upload("sales.csv", b"id\n1\n").unwrap();

        assert_eq!(store.read_upload("sales.csv").unwrap(), b"id\n1\n");
        assert!(matches!(
            store.read_upload("missing.csv"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_upload_name_cannot_escape_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("uploads"), dir.path().join("ddl"));

        let stored = store.save_upload("../../etc/evil.csv", b"a\n").unwrap();
        assert_eq!(stored.path, dir.path().join("uploads").join("evil.csv"));

        assert!(matches!(
            store.save_upload("..", b"a\n"),
            Err(AppError::InputError(_))
        ));
    }

    #[test]
    fn test_list_uploads_without_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("missing"), dir.path().join("ddl"));
        assert!(store.list_uploads().unwrap().is_empty());
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_read_optional_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        assert_eq!(read_optional_text(&path).unwrap(), "");
        fs::write(&path, "CREATE TABLE t (a INT);").unwrap();
        assert_eq!(read_optional_text(&path).unwrap(), "CREATE TABLE t (a INT);");
    }
}
