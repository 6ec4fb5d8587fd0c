//! Core data types and error definitions for the processing pipeline.

use crate::ocr::OcrError;
use crate::summarization::{SummarizationClientError, SummaryResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Request-level rejections raised before any file is stored or processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The request carried no files.
    #[error("No files uploaded")]
    NoFiles,
    /// More files than the per-request limit.
    #[error("Too many files; at most {limit} files are accepted per request")]
    TooManyFiles {
        /// Configured limit.
        limit: usize,
    },
    /// A file part had no usable file name.
    #[error("Uploaded file is missing a file name")]
    MissingFileName,
    /// The file extension is not on the allow-list.
    #[error("File type '{extension}' is not supported. Allowed types: {allowed}")]
    UnsupportedType {
        /// Offending file name.
        file_name: String,
        /// Lowercased extension including the dot, or empty when absent.
        extension: String,
        /// Comma-separated allow-list.
        allowed: String,
    },
    /// The file exceeds the per-file size limit.
    #[error("File '{file_name}' exceeds the maximum size of {limit} bytes")]
    FileTooLarge {
        /// Offending file name.
        file_name: String,
        /// Configured limit in bytes.
        limit: usize,
    },
    /// The file has no content.
    #[error("File '{file_name}' is empty")]
    EmptyFile {
        /// Offending file name.
        file_name: String,
    },
    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    Malformed(String),
}

/// Errors emitted by the document processing pipeline at request level.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The upload was rejected before processing started.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An upload could not be written to temporary storage.
    #[error("Failed to store upload '{file_name}': {source}")]
    Storage {
        /// File being written.
        file_name: String,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The OCR engine could not be constructed.
    #[error("Failed to configure OCR engine: {0}")]
    OcrSetup(#[from] OcrError),
    /// A summarization provider could not be constructed.
    #[error("Failed to configure summarization: {0}")]
    SummarySetup(#[from] SummarizationClientError),
}

/// Per-file failure, recorded on that file's outcome and never raised out of a batch.
#[derive(Debug, Error)]
pub enum FileError {
    /// OCR failed after exhausting its retries.
    #[error(transparent)]
    Ocr(#[from] OcrError),
    /// The file's pipeline failed unexpectedly.
    #[error("Internal error while processing file: {0}")]
    Internal(String),
}

/// A file received from a client, held in memory until validation passes.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// File name supplied by the client.
    pub original_name: String,
    /// Content type supplied by the client, if any.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// An upload persisted to temporary storage for the duration of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Location of the temporary copy.
    pub path: PathBuf,
    /// File name supplied by the client.
    pub original_name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Content type supplied by the client, if any.
    pub content_type: Option<String>,
}

impl UploadedFile {
    /// Temporary file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Successful per-file record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    /// File name supplied by the client.
    pub file_name: String,
    /// Uppercased extension without the dot, e.g. `PDF`.
    pub document_type: String,
    /// Text extracted by OCR.
    pub extracted_text: String,
    /// Generated or degraded summary.
    pub summary: SummaryResult,
    /// Word count reported by OCR.
    pub word_count: usize,
    /// Character count reported by OCR.
    pub character_count: usize,
    /// Base64 PNG with detection boxes, when the engine rendered one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
    /// OCR confidence, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// OCR image quality assessment, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_check: Option<String>,
}

/// Failed per-file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedFile {
    /// File name supplied by the client.
    pub file_name: String,
    /// Human-readable failure description.
    pub error: String,
}

/// Terminal record for one uploaded file; every file yields exactly one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    /// OCR succeeded; the summary may still be degraded.
    Processed(ProcessedFile),
    /// The file's pipeline failed.
    Failed(FailedFile),
}

impl FileOutcome {
    /// File name this outcome belongs to.
    pub fn file_name(&self) -> &str {
        match self {
            Self::Processed(file) => &file.file_name,
            Self::Failed(file) => &file.file_name,
        }
    }

    /// Whether the file was processed.
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

/// Batch result: one outcome per submitted file, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    /// Per-file outcomes.
    pub files: Vec<FileOutcome>,
}
