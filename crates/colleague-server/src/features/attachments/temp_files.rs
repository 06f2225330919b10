//! Request-scoped temporary files for staged upload content
//!
//! Every path reserved through [`TempFiles`] is deleted when the guard is
//! dropped, whether the request succeeded, failed, or was cancelled.

use std::{
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use uuid::Uuid;

pub const TEMP_FILE_PREFIX: &str = "temp_attachment_";

#[derive(Debug)]
pub struct TempFiles {
    dir: PathBuf,
    paths: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            paths: Vec::new(),
        }
    }

    /// Reserve a fresh path in the temp directory, creating the directory if
    /// needed. The path is tracked for deletion before anything is written.
    pub async fn reserve(&mut self) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self
            .dir
            .join(format!("{}{}", TEMP_FILE_PREFIX, Uuid::new_v4().simple()));
        self.paths.push(path.clone());
        Ok(path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        // Synchronous so cleanup also runs when the request future is
        // cancelled; each call is a single unlink.
        for path in self.paths.drain(..) {
            remove_temp_file(&path);
        }
    }
}

/// Delete a staged file. Failures are logged and never propagated.
fn remove_temp_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temp attachment file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => info!(
            path = %path.display(),
            error = %e,
            "Could not delete temp attachment file"
        ),
    }
}
