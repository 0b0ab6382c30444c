//! Staged writes into a case directory.
//!
//! Derived files are first written under a private staging root, then
//! published together. A failed publish restores whatever it replaced.
use crate::error::{CaseError, CaseResult};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A transaction directory holding `staging/` and `backup/`.
pub struct Staging {
    txn: TempDir,
}

impl Staging {
    pub fn new() -> CaseResult<Self> {
        let txn = tempfile::Builder::new()
            .prefix("elm-case-txn")
            .tempdir()
            .map_err(|source| CaseError::io("create", std::env::temp_dir(), source))?;
        Ok(Self { txn })
    }

    pub fn root(&self) -> PathBuf {
        self.txn.path().join("staging")
    }

    pub fn write_text(&self, rel_path: &str, text: &str) -> CaseResult<()> {
        write_staged_bytes(&self.root(), rel_path, text.as_bytes())
    }

    /// Publish every staged file under `dest_root`, returning the written paths.
    pub fn publish(self, dest_root: &Path) -> CaseResult<Vec<PathBuf>> {
        publish_staging(&self.root(), dest_root)
    }
}

fn write_staged_bytes(staging_root: &Path, rel_path: &str, bytes: &[u8]) -> CaseResult<()> {
    let staging_path = staging_root.join(rel_path);
    if let Some(parent) = staging_path.parent() {
        fs::create_dir_all(parent).map_err(|source| CaseError::io("create", parent, source))?;
    }
    fs::write(&staging_path, bytes).map_err(|source| CaseError::io("write", &staging_path, source))
}

fn publish_staging(staging_root: &Path, dest_root: &Path) -> CaseResult<Vec<PathBuf>> {
    if !staging_root.exists() {
        return Ok(Vec::new());
    }
    let files = collect_files_recursive(staging_root)?;
    let backup_root = staging_root
        .parent()
        .map(|txn| txn.join("backup"))
        .ok_or_else(|| CaseError::precondition("staging root has no parent"))?;
    let mut published = Vec::new();
    let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
    for file in files {
        let Ok(rel) = file.strip_prefix(staging_root) else {
            continue;
        };
        let dest = dest_root.join(rel);
        if dest.exists() {
            let backup = backup_root.join(rel);
            if let Some(parent) = backup.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| CaseError::io("create", parent, source))?;
            }
            fs::copy(&dest, &backup).map_err(|source| CaseError::io("back up", &dest, source))?;
            backups.push((dest.clone(), backup));
        }

        if let Err(err) = publish_file(&file, &dest) {
            rollback_publish(&published, &backups);
            return Err(err);
        }
        published.push(dest);
    }
    Ok(published)
}

fn collect_files_recursive(root: &Path) -> CaseResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(root).map_err(|source| CaseError::io("read", root, source))?;
    for entry in entries {
        let path = entry
            .map_err(|source| CaseError::io("read", root, source))?
            .path();
        if path.is_dir() {
            files.extend(collect_files_recursive(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn publish_file(source: &Path, dest: &Path) -> CaseResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|err| CaseError::io("create", parent, err))?;
    }
    let file_name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("staged");
    let tmp_path = dest
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"));
    fs::copy(source, &tmp_path).map_err(|err| CaseError::io("publish", dest, err))?;
    fs::rename(&tmp_path, dest).map_err(|err| CaseError::io("publish", dest, err))
}

fn rollback_publish(published: &[PathBuf], backups: &[(PathBuf, PathBuf)]) {
    for path in published {
        let _ = fs::remove_file(path);
    }
    for (dest, backup) in backups {
        let _ = fs::copy(backup, dest);
    }
}
