//! Output staging.
//!
//! The sink writes the container header as soon as it is opened, long before
//! the pipeline knows whether a key frame will ever be encoded. With
//! [`OutputStaging::Staged`] the sink writes to a hidden sibling of the
//! requested path instead, and [`StagedOutput::commit`] renames it into place
//! once the image is complete. A failed extraction leaves nothing behind.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process,
};

/// Where the sink writes while an extraction is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStaging {
    /// Write to a hidden sibling file and rename it on success. The
    /// requested path is untouched when the extraction fails.
    #[default]
    Staged,
    /// Write straight to the requested path. A failed extraction can leave
    /// a header-only file behind.
    Direct,
}

/// Guard over the path the sink writes to.
///
/// Dropping an uncommitted staged output removes the partial file.
#[derive(Debug)]
pub struct StagedOutput {
    target: PathBuf,
    working: PathBuf,
    committed: bool,
}

impl StagedOutput {
    /// Prepare the working path for `target`.
    ///
    /// Locators with a URL scheme are always written directly.
    pub fn prepare(target: &Path, staging: OutputStaging) -> Self {
        let working = match staging {
            OutputStaging::Staged if !is_url(target) => {
                staging_path(target).unwrap_or_else(|| target.to_path_buf())
            }
            _ => target.to_path_buf(),
        };

        Self {
            target: target.to_path_buf(),
            working,
            committed: false,
        }
    }

    /// Path the sink should open.
    pub fn path(&self) -> &Path {
        &self.working
    }

    /// Path the caller asked for.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Returns `true` when the sink writes somewhere other than the target.
    pub fn is_staged(&self) -> bool {
        self.working != self.target
    }

    /// Move the finished output into place.
    pub fn commit(mut self) -> std::io::Result<PathBuf> {
        if self.is_staged() {
            fs::rename(&self.working, &self.target)?;
            log::debug!(
                "Committed {} -> {}",
                self.working.display(),
                self.target.display()
            );
        }
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if self.committed || !self.is_staged() {
            return;
        }
        match fs::remove_file(&self.working) {
            Ok(()) => log::debug!("Removed partial output {}", self.working.display()),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => log::warn!(
                "Could not remove partial output {}: {error}",
                self.working.display()
            ),
        }
    }
}

fn is_url(path: &Path) -> bool {
    path.to_str().is_some_and(|locator| locator.contains("://"))
}

// `.name.keyshot-<pid>.ext` next to the target. The extension is kept so the
// muxer is still guessed from it.
fn staging_path(target: &Path) -> Option<PathBuf> {
    let stem = target.file_stem()?.to_str()?;
    let mut name = format!(".{stem}.keyshot-{}", process::id());
    if let Some(extension) = target.extension().and_then(|extension| extension.to_str()) {
        name.push('.');
        name.push_str(extension);
    }
    Some(target.with_file_name(name))
}
