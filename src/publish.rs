//! Atomic publication of the output tree.
//!
//! Every run writes into a sibling staging directory (`<output>2`). Only when the whole tree is
//! complete is it swapped in: the live tree is renamed to `<output>.bak`, staging is renamed to
//! `<output>`, and the backup is removed. A run that stops before [`Staging::publish`] leaves the
//! published tree untouched.

use crate::registry::COMPONENT_DIR;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The live, staging and backup locations of one output directory.
#[derive(Debug, Clone)]
pub struct Staging {
    live: PathBuf,
    staging: PathBuf,
    backup: PathBuf,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl Staging {
    pub fn new(output: &Path) -> Self {
        // drop trailing separators so `swagger/` stages into `swagger2`, not `swagger/2`
        let live: PathBuf = output.components().collect();
        Self {
            staging: sibling(&live, "2"),
            backup: sibling(&live, ".bak"),
            live,
        }
    }

    /// The published tree
    pub fn live_dir(&self) -> &Path {
        &self.live
    }

    /// Where this run writes
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup
    }

    /// Restores a backup left behind by a run that stopped between the two publish renames.
    ///
    /// Returns whether anything was restored.
    pub fn recover(&self) -> Result<bool> {
        if !self.backup.is_dir() {
            return Ok(false);
        }
        if self.live.exists() {
            debug!("Removing stale backup {}", self.backup.display());
            fs::remove_dir_all(&self.backup)
                .with_context(|| format!("Failed to remove stale backup: {}", self.backup.display()))?;
            return Ok(false);
        }

        warn!(
            "Restoring {} from backup left by an interrupted run",
            self.live.display()
        );
        fs::rename(&self.backup, &self.live)
            .with_context(|| format!("Failed to restore backup: {}", self.backup.display()))?;
        Ok(true)
    }

    /// Creates a fresh staging directory seeded with the published `component/` tree.
    pub fn prepare(&self) -> Result<()> {
        if self.staging.exists() {
            debug!("Removing leftover staging directory {}", self.staging.display());
            fs::remove_dir_all(&self.staging)
                .with_context(|| format!("Failed to remove staging directory: {}", self.staging.display()))?;
        }
        fs::create_dir_all(&self.staging)
            .with_context(|| format!("Failed to create staging directory: {}", self.staging.display()))?;

        let components = self.live.join(COMPONENT_DIR);
        if components.is_dir() {
            copy_dir_all(&components, &self.staging.join(COMPONENT_DIR))?;
        }
        Ok(())
    }

    /// Swaps the staging tree in as the published tree.
    pub fn publish(&self) -> Result<()> {
        let had_live = self.live.exists();
        if had_live {
            if self.backup.exists() {
                fs::remove_dir_all(&self.backup)
                    .with_context(|| format!("Failed to remove old backup: {}", self.backup.display()))?;
            }
            fs::rename(&self.live, &self.backup)
                .with_context(|| format!("Failed to move {} aside", self.live.display()))?;
        }

        if let Err(e) = fs::rename(&self.staging, &self.live) {
            warn!(
                "Rename of {} failed ({}), copying instead",
                self.staging.display(),
                e
            );
            if let Err(copy_err) = copy_dir_all(&self.staging, &self.live) {
                self.restore_backup(had_live);
                return Err(copy_err).with_context(|| format!("Failed to publish {}", self.live.display()));
            }
            if let Err(e) = fs::remove_dir_all(&self.staging) {
                warn!("Failed to remove staging directory {}: {}", self.staging.display(), e);
            }
        }

        if had_live {
            fs::remove_dir_all(&self.backup)
                .with_context(|| format!("Failed to remove backup: {}", self.backup.display()))?;
        }
        info!("Published {}", self.live.display());
        Ok(())
    }

    /// Throws the staging tree away.
    pub fn discard(&self) -> Result<()> {
        if self.staging.exists() {
            fs::remove_dir_all(&self.staging)
                .with_context(|| format!("Failed to remove staging directory: {}", self.staging.display()))?;
        }
        Ok(())
    }

    fn restore_backup(&self, had_live: bool) {
        if self.live.exists() {
            if let Err(e) = fs::remove_dir_all(&self.live) {
                warn!("Failed to remove partial output {}: {}", self.live.display(), e);
            }
        }
        if had_live {
            if let Err(e) = fs::rename(&self.backup, &self.live) {
                warn!("Failed to restore backup {}: {}", self.backup.display(), e);
            }
        }
    }
}

/// Recursively copies the directory `from` to `to`.
pub fn copy_dir_all(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", from.display()))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}
