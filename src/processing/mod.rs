//! Document processing pipeline: upload intake, per-file OCR and summarization, assembly.

pub mod assemble;
mod cleanup;
pub mod intake;
mod service;
pub mod types;

pub use cleanup::TempFiles;
pub use intake::{ALLOWED_EXTENSIONS, UploadPolicy};
pub use service::{ProcessingApi, ProcessingService};
pub use types::{
    BatchResponse, FailedFile, FileError, FileOutcome, IncomingFile, ProcessedFile,
    ProcessingError, UploadedFile, ValidationError,
};
