//! Timestamped, rotating copies of the document file.
//!
//! Before the first write of a session the current on-disk document is copied
//! to `<backup_dir>/<file name>.<YYYYMMDD_HHMMSS>.bak`. Once the copy is made,
//! backups of the same file beyond the retention count are deleted oldest
//! first (by modification time).

use crate::constants::{BACKUP_EXTENSION, BACKUP_TIMESTAMP_FORMAT};
use crate::errors::{AppResult, PersistenceError};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Backup policy for one document file.
#[derive(Debug, Clone)]
pub struct Backups {
    dir: PathBuf,
    max_backups: usize,
}

impl Backups {
    pub fn new(dir: impl Into<PathBuf>, max_backups: usize) -> Self {
        Backups {
            dir: dir.into(),
            max_backups: max_backups.max(1),
        }
    }

    /// Copies `source` into the backup directory and prunes old copies.
    ///
    /// Returns `Ok(None)` when there is nothing to back up.
    pub fn create(&self, source: &Path) -> AppResult<Option<PathBuf>> {
        self.create_at(source, Local::now())
    }

    /// Same as [`Backups::create`] with an explicit timestamp.
    pub fn create_at(&self, source: &Path, at: DateTime<Local>) -> AppResult<Option<PathBuf>> {
        if !source.is_file() {
            debug!("No existing document at {:?}, skipping backup", source);
            return Ok(None);
        }
        let Some(base) = file_name(source) else {
            return Ok(None);
        };

        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::Copy {
            path: self.dir.clone(),
            source: e,
        })?;

        let target = self.dir.join(format!(
            "{}.{}{}",
            base,
            at.format(BACKUP_TIMESTAMP_FORMAT),
            BACKUP_EXTENSION
        ));
        fs::copy(source, &target).map_err(|e| PersistenceError::Copy {
            path: target.clone(),
            source: e,
        })?;
        info!("Backup created: {:?}", target);

        let removed = self.prune(&base)?;
        if removed > 0 {
            debug!("Removed {} old backups of {}", removed, base);
        }
        Ok(Some(target))
    }

    /// Backups of the file named `base`, oldest first.
    pub fn list(&self, base: &str) -> Vec<PathBuf> {
        let prefix = format!("{}.", base);
        let mut found: Vec<(SystemTime, PathBuf)> = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy();
                name.starts_with(&prefix) && name.ends_with(BACKUP_EXTENSION)
            })
            .map(|e| {
                let modified = e
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, e.into_path())
            })
            .collect();
        found.sort();
        found.into_iter().map(|(_, path)| path).collect()
    }

    /// Deletes the oldest backups of `base` beyond the retention count.
    ///
    /// Individual deletion failures are logged and skipped.
    pub fn prune(&self, base: &str) -> AppResult<usize> {
        let backups = self.list(base);
        let surplus = backups.len().saturating_sub(self.max_backups);
        let mut removed = 0;
        for path in backups.into_iter().take(surplus) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Deleted old backup {:?}", path);
                    removed += 1;
                }
                Err(e) => warn!("Failed to delete old backup {:?}: {}", path, e),
            }
        }
        Ok(removed)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn stamp(second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, 14, 30, second)
            .single()
            .unwrap()
    }

    #[test]
    fn test_backup_name_and_content() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("notes.json");
        fs::write(&doc, "{\"v\":1}").unwrap();

        let backups = Backups::new(dir.path().join("backups"), 3);
        let path = backups.create_at(&doc, stamp(5)).unwrap().unwrap();

        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "notes.json.20240309_143005.bak"
        );
        assert_eq!(fs::read_to_string(path).unwrap(), "{\"v\":1}");
    }

    #[test]
    fn test_missing_source_is_skipped() {
        let dir = tempdir().unwrap();
        let backups = Backups::new(dir.path().join("backups"), 3);
        let result = backups.create(&dir.path().join("absent.json")).unwrap();
        assert!(result.is_none());
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn test_rotation_keeps_newest() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("notes.json");
        let backups = Backups::new(dir.path().join("backups"), 3);

        for second in 0..6 {
            fs::write(&doc, format!("version {}", second)).unwrap();
            backups.create_at(&doc, stamp(second)).unwrap();
        }

        let kept = backups.list("notes.json");
        assert_eq!(kept.len(), 3);
        let contents: Vec<String> = kept
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();
        assert_eq!(contents, vec!["version 3", "version 4", "version 5"]);
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = tempdir().unwrap();
        let backup_dir = dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();
        fs::write(backup_dir.join("other.json.20240101_000000.bak"), "x").unwrap();
        fs::write(backup_dir.join("notes.json.txt"), "x").unwrap();

        let doc = dir.path().join("notes.json");
        fs::write(&doc, "current").unwrap();
        let backups = Backups::new(&backup_dir, 1);
        backups.create_at(&doc, stamp(0)).unwrap();
        backups.create_at(&doc, stamp(1)).unwrap();

        assert_eq!(backups.list("notes.json").len(), 1);
        assert!(backup_dir.join("other.json.20240101_000000.bak").exists());
        assert!(backup_dir.join("notes.json.txt").exists());
    }

    #[test]
    fn test_longer_file_names_are_not_pruned() {
        let dir = tempdir().unwrap();
        let backup_dir = dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();
        let sibling = backup_dir.join("notes.json5.20240101_000000.bak");
        fs::write(&sibling, "other document").unwrap();

        let doc = dir.path().join("notes.json");
        fs::write(&doc, "current").unwrap();
        let backups = Backups::new(&backup_dir, 1);
        backups.create_at(&doc, stamp(0)).unwrap();

        let kept = backups.list("notes.json");
        assert_eq!(kept, vec![backup_dir.join("notes.json.20240309_143000.bak")]);
        assert!(sibling.exists());
        assert_eq!(backups.list("notes.json5"), vec![sibling]);
    }
}
