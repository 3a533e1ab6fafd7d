use std::path::{Path, PathBuf};

use crate::error::ExecutionError;

pub fn backup_path(tracked: &Path) -> PathBuf {
    let mut backup = tracked.to_path_buf();
    let name = format!(
        ".{}.patmut.bak",
        tracked.file_name().unwrap_or_default().to_string_lossy()
    );
    backup.set_file_name(name);
    backup
}

/// Check if a backup file exists from a previous interrupted run.
pub fn check_interrupted_run(tracked: &Path) -> Option<PathBuf> {
    let bak = backup_path(tracked);
    if bak.exists() { Some(bak) } else { None }
}

/// Restore the tracked file from a leftover backup and remove the backup.
pub fn restore_from_backup(tracked: &Path, backup: &Path) -> std::io::Result<()> {
    std::fs::copy(backup, tracked)?;
    std::fs::remove_file(backup)?;
    Ok(())
}

/// Holds the pristine content of the tracked file while a mutant occupies it.
///
/// The snapshot lives in memory and in a sibling `.patmut.bak` file so a
/// killed process can still be recovered by [`check_interrupted_run`].
/// Call [`BackupGuard::restore`] to put the file back and learn whether that
/// worked; dropping an unreleased guard restores on a best-effort basis.
#[derive(Debug)]
pub struct BackupGuard {
    tracked: PathBuf,
    backup: PathBuf,
    /// `None` when the tracked file did not exist before.
    original: Option<Vec<u8>>,
    released: bool,
}

impl BackupGuard {
    pub fn acquire(tracked: &Path) -> Result<Self, ExecutionError> {
        let backup = backup_path(tracked);
        let original = match std::fs::read(tracked) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(ExecutionError::Backup {
                    path: tracked.to_path_buf(),
                    source,
                });
            }
        };
        if let Some(bytes) = &original {
            std::fs::write(&backup, bytes).map_err(|source| ExecutionError::Backup {
                path: backup.clone(),
                source,
            })?;
        }
        Ok(BackupGuard {
            tracked: tracked.to_path_buf(),
            backup,
            original,
            released: false,
        })
    }

    pub fn tracked(&self) -> &Path {
        &self.tracked
    }

    /// Put the original bytes back and confirm they are on disk.
    pub fn restore(mut self) -> Result<(), ExecutionError> {
        self.released = true;
        self.put_back()
    }

    fn put_back(&self) -> Result<(), ExecutionError> {
        let failure = |reason: String| ExecutionError::RestoreFailure {
            path: self.tracked.clone(),
            reason,
        };

        match &self.original {
            Some(bytes) => {
                std::fs::write(&self.tracked, bytes).map_err(|e| failure(e.to_string()))?;
                let on_disk = std::fs::read(&self.tracked).map_err(|e| failure(e.to_string()))?;
                if &on_disk != bytes {
                    return Err(failure("content differs from backup after restore".into()));
                }
            }
            None => match std::fs::remove_file(&self.tracked) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(failure(e.to_string())),
            },
        }

        if self.backup.exists() {
            if let Err(e) = std::fs::remove_file(&self.backup) {
                log::warn!("could not remove backup {}: {}", self.backup.display(), e);
            }
        }
        Ok(())
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.put_back() {
            log::error!("{e}");
        }
    }
}
