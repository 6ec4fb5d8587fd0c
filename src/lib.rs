#![deny(missing_docs)]

//! Core library for docdigest: OCR extraction and AI summaries for uploaded documents.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Batch processing counters.
pub mod metrics;
/// OCR engines and the retrying invoker.
pub mod ocr;
/// Upload intake, per-file pipelines and result assembly.
pub mod processing;
/// Retry schedules shared by OCR and summarization.
pub mod retry;
/// Summarization providers and the fallback cascade.
pub mod summarization;
