//! Upload validation and temporary storage.

use super::cleanup::TempFiles;
use super::types::{IncomingFile, ProcessingError, UploadedFile, ValidationError};
use std::path::Path;
use uuid::Uuid;

/// Extensions accepted for OCR, lowercased with the leading dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".png", ".jpg", ".jpeg"];

/// Limits applied to every upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Maximum size of a single file in bytes.
    pub max_file_size: usize,
    /// Maximum number of files per request.
    pub max_files: usize,
    /// Accepted extensions, lowercased with the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    /// Policy accepting [`ALLOWED_EXTENSIONS`] under the given limits.
    pub fn new(max_file_size: usize, max_files: usize) -> Self {
        Self {
            max_file_size,
            max_files,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    /// Reject a file whose extension is not on the allow-list.
    pub fn check_type(&self, file_name: &str) -> Result<(), ValidationError> {
        let extension = extension_of(file_name);
        if self.allowed_extensions.iter().any(|allowed| *allowed == extension) {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedType {
                file_name: file_name.to_string(),
                extension,
                allowed: self.allowed_extensions.join(", "),
            })
        }
    }

    /// Reject a file larger than the per-file limit.
    pub fn check_size(&self, file_name: &str, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                file_name: file_name.to_string(),
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Validate a whole request. Nothing is stored unless every file passes.
    pub fn validate(&self, files: &[IncomingFile]) -> Result<(), ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::NoFiles);
        }
        if files.len() > self.max_files {
            return Err(ValidationError::TooManyFiles {
                limit: self.max_files,
            });
        }
        for file in files {
            if file.original_name.trim().is_empty() {
                return Err(ValidationError::MissingFileName);
            }
            self.check_type(&file.original_name)?;
            self.check_size(&file.original_name, file.bytes.len())?;
            if file.bytes.is_empty() {
                return Err(ValidationError::EmptyFile {
                    file_name: file.original_name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Lowercased extension including the dot, or an empty string.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Reduce a client-supplied name to a safe single path component.
pub fn storage_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}", Uuid::new_v4(), cleaned)
}

/// Write validated uploads under `dir`, returning a guard that owns the temporary copies.
///
/// Each path is owned by the guard before it is written, so a failed write drops the guard and
/// removes every file created so far, including a partially written one.
pub async fn persist(dir: &Path, files: Vec<IncomingFile>) -> Result<TempFiles, ProcessingError> {
    persist_named(dir, files, storage_name).await
}

async fn persist_named(
    dir: &Path,
    files: Vec<IncomingFile>,
    name_for: impl Fn(&str) -> String,
) -> Result<TempFiles, ProcessingError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ProcessingError::Storage {
            file_name: dir.display().to_string(),
            source,
        })?;

    let mut temp_files = TempFiles::new();
    for file in files {
        let path = dir.join(name_for(&file.original_name));
        let size_bytes = file.bytes.len() as u64;
        temp_files.push(UploadedFile {
            path: path.clone(),
            original_name: file.original_name.clone(),
            size_bytes,
            content_type: file.content_type,
        });
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|source| ProcessingError::Storage {
                file_name: file.original_name.clone(),
                source,
            })?;
        tracing::debug!(
            file = %file.original_name,
            path = %path.display(),
            bytes = size_bytes,
            "Upload stored"
        );
    }
    Ok(temp_files)
}
