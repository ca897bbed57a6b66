//! File-backed checkpoint storage.
//!
//! Each checkpoint is a regular file named after the checkpoint inside the
//! state directory. Writes go to a hidden temp file in the same directory,
//! are fsynced, then renamed over the target.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{validate_name, CheckpointError, CheckpointManager};

/// Checkpoint manager storing one file per checkpoint.
#[derive(Debug, Clone)]
pub struct FileCheckpointManager {
    dir: PathBuf,
}

impl FileCheckpointManager {
    /// Open a manager rooted at `dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, CheckpointError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        if !dir.is_dir() {
            return Err(CheckpointError::Io(io::Error::other(format!(
                "{} is not a directory",
                dir.display()
            ))));
        }

        Ok(Self { dir })
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint file for `name`.
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!(".{name}.tmp"))
    }
}

/// Write and fsync the temp file.
fn write_temp(temp_path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)?;

    file.write_all(data)?;
    file.sync_all()
}

impl CheckpointManager for FileCheckpointManager {
    fn create_checkpoint(&self, name: &str, data: &[u8]) -> Result<(), CheckpointError> {
        validate_name(name)?;

        let path = self.checkpoint_path(name);
        let temp_path = self.temp_path(name);

        if let Err(e) = write_temp(&temp_path, data) {
            fs::remove_file(&temp_path).ok();
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            fs::remove_file(&temp_path).ok();
            return Err(e.into());
        }

        // Persist the rename itself
        File::open(&self.dir)?.sync_all()?;

        debug!(path = %path.display(), bytes = data.len(), "Wrote checkpoint");
        Ok(())
    }

    fn get_checkpoint(&self, name: &str) -> Result<Vec<u8>, CheckpointError> {
        validate_name(name)?;

        let path = self.checkpoint_path(name);
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(CheckpointError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remove_checkpoint(&self, name: &str) -> Result<(), CheckpointError> {
        validate_name(name)?;

        match fs::remove_file(self.checkpoint_path(name)) {
            Ok(()) => {
                debug!(name = %name, "Removed checkpoint");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_checkpoints(&self) -> Result<Vec<String>, CheckpointError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("state");

        let manager = FileCheckpointManager::new(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(manager.dir(), dir.as_path());
    }

    #[test]
    fn test_new_fails_on_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        assert!(FileCheckpointManager::new(&file).is_err());
    }

    #[test]
    fn test_create_and_get() {
        let temp = TempDir::new().unwrap();
        let manager = FileCheckpointManager::new(temp.path()).unwrap();

        manager.create_checkpoint("state", b"hello").unwrap();
        assert_eq!(manager.get_checkpoint("state").unwrap(), b"hello");

        // Replace
        manager.create_checkpoint("state", b"world").unwrap();
        assert_eq!(manager.get_checkpoint("state").unwrap(), b"world");

        // No temp file left behind
        assert!(!temp.path().join(".state.tmp").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let manager = FileCheckpointManager::new(temp.path()).unwrap();

        // A directory in the way of the temp file makes the open fail
        fs::create_dir(temp.path().join(".state.tmp")).unwrap();
        assert!(manager.create_checkpoint("state", b"hello").is_err());
        assert!(manager.get_checkpoint("state").unwrap_err().is_not_found());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        let manager = FileCheckpointManager::new(temp.path()).unwrap();

        // A non-empty directory at the target makes the rename fail
        fs::create_dir(temp.path().join("state")).unwrap();
        fs::write(temp.path().join("state").join("keep"), b"x").unwrap();

        assert!(manager.create_checkpoint("state", b"hello").is_err());
        assert!(!temp.path().join(".state.tmp").exists());
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let manager = FileCheckpointManager::new(temp.path()).unwrap();

        let err = manager.get_checkpoint("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_get_directory_is_not_not_found() {
        let temp = TempDir::new().unwrap();
        let manager = FileCheckpointManager::new(temp.path()).unwrap();
        fs::create_dir(temp.path().join("state")).unwrap();

        let err = manager.get_checkpoint("state").unwrap_err();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_remove_and_list() {
        let temp = TempDir::new().unwrap();
        let manager = FileCheckpointManager::new(temp.path()).unwrap();

        manager.create_checkpoint("b", b"2").unwrap();
        manager.create_checkpoint("a", b"1").unwrap();
        fs::write(temp.path().join(".a.tmp"), b"partial").unwrap();

        assert_eq!(manager.list_checkpoints().unwrap(), vec!["a", "b"]);

        manager.remove_checkpoint("a").unwrap();
        manager.remove_checkpoint("a").unwrap();
        assert_eq!(manager.list_checkpoints().unwrap(), vec!["b"]);
        assert!(manager.get_checkpoint("a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let temp = TempDir::new().unwrap();
        let manager = FileCheckpointManager::new(temp.path()).unwrap();

        assert!(matches!(
            manager.create_checkpoint("../escape", b"x"),
            Err(CheckpointError::InvalidName { .. })
        ));
        assert!(matches!(
            manager.get_checkpoint(""),
            Err(CheckpointError::InvalidName { .. })
        ));
    }
}
