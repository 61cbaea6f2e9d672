//! Scoped switch of the process working directory.
use log::*;
use std::{
    env, io,
    path::{Path, PathBuf},
};

/// Switches the process current directory on creation and switches it back
/// when dropped, so the original directory is restored on success, on error
/// and while unwinding.
#[derive(Debug)]
pub struct WorkdirGuard {
    original: PathBuf,
}

impl WorkdirGuard {
    /// Save the current directory and enter `target`. The current directory
    /// is untouched if `target` cannot be entered.
    pub fn enter(target: &Path) -> io::Result<Self> {
        let original = env::current_dir()?;
        env::set_current_dir(target)?;
        debug!(
            "entered {} (was {})",
            target.display(),
            original.display()
        );
        Ok(Self { original })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        // Drop must not panic; a failed restore is reported and left alone
        if let Err(err) = env::set_current_dir(&self.original) {
            error!(
                "failed to restore working directory {}: {err}",
                self.original.display()
            );
        }
    }
}
