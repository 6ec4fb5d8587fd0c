//! Ownership of a batch's temporary files.

use super::types::UploadedFile;
use std::io::ErrorKind;

/// Temporary uploads belonging to one batch.
///
/// [`TempFiles::release`] removes them once the batch completes. A guard dropped without being
/// released, for example when a request is cancelled, removes them synchronously instead.
/// Removal failures are logged and never surface to the caller.
#[derive(Debug, Default)]
pub struct TempFiles {
    files: Vec<UploadedFile>,
    released: bool,
}

impl TempFiles {
    /// Empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a stored upload.
    pub fn push(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    /// Stored uploads in submission order.
    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// Remove every temporary file.
    pub async fn release(mut self) {
        self.released = true;
        for file in &self.files {
            match tokio::fs::remove_file(&file.path).await {
                Ok(()) => tracing::debug!(path = %file.path.display(), "Temporary file removed"),
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(error) => tracing::warn!(
                    path = %file.path.display(),
                    error = %error,
                    "Failed to remove temporary file"
                ),
            }
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for file in &self.files {
            match std::fs::remove_file(&file.path) {
                Ok(()) => {}
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(error) => tracing::warn!(
                    path = %file.path.display(),
                    error = %error,
                    "Failed to remove temporary file"
                ),
            }
        }
    }
}
