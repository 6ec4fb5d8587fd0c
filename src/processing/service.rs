//! Batch orchestration: validate, store, run one pipeline per file, assemble, clean up.

use crate::{
    config::Config,
    metrics::{BatchMetrics, MetricsSnapshot},
    ocr::OcrInvoker,
    processing::{
        assemble,
        intake::{self, UploadPolicy},
        types::{
            BatchResponse, FileError, FileOutcome, IncomingFile, ProcessingError, UploadedFile,
            ValidationError,
        },
    },
    retry::RetryPolicy,
    summarization::{SummaryProvider, build_clients, prompt::describe_document},
};
use async_trait::async_trait;
use futures_util::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs every uploaded file through OCR and summarization concurrently.
///
/// Each file gets its own task; a failure or panic in one file's pipeline is recorded on that
/// file's outcome and never affects its siblings. Outcomes are returned in submission order.
/// Construct the service once near process start and share it through an `Arc`.
pub struct ProcessingService {
    ocr: Arc<OcrInvoker>,
    summarizer: Arc<SummaryProvider>,
    policy: UploadPolicy,
    upload_dir: PathBuf,
    metrics: Arc<BatchMetrics>,
}

/// Abstraction over the processing pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Validate, store, and process a batch of uploads.
    async fn process_uploads(
        &self,
        files: Vec<IncomingFile>,
    ) -> Result<BatchResponse, ProcessingError>;

    /// Limits applied to incoming uploads.
    fn upload_policy(&self) -> &UploadPolicy;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Assemble a service from already-built components.
    pub fn new(
        ocr: OcrInvoker,
        summarizer: SummaryProvider,
        policy: UploadPolicy,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ocr: Arc::new(ocr),
            summarizer: Arc::new(summarizer),
            policy,
            upload_dir: upload_dir.into(),
            metrics: Arc::new(BatchMetrics::new()),
        }
    }

    /// Build the OCR engine and provider cascade described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ProcessingError> {
        tracing::info!(engine = ?config.ocr.engine, "Initializing OCR engine");
        let ocr = OcrInvoker::from_settings(
            &config.ocr,
            RetryPolicy::linear(config.max_retries, config.retry_delay),
        )?;

        let clients = build_clients(&config.summary)?;
        let summarizer = SummaryProvider::new(
            clients,
            RetryPolicy::exponential(config.max_retries, config.retry_delay),
        );
        let names = summarizer.provider_names();
        if names.is_empty() {
            tracing::warn!("No summarization providers available; summaries will be degraded");
        } else {
            tracing::info!(providers = ?names, "Summarization cascade ready");
        }

        Ok(Self::new(
            ocr,
            summarizer,
            UploadPolicy::new(config.max_file_size, config.max_files),
            config.upload_dir.clone(),
        ))
    }

    /// Validate and store `files`, process them, and remove the temporary copies.
    pub async fn process_uploads(
        &self,
        files: Vec<IncomingFile>,
    ) -> Result<BatchResponse, ProcessingError> {
        self.policy.validate(&files)?;
        let temp_files = intake::persist(&self.upload_dir, files).await?;
        let response = self.process_batch(temp_files.files()).await;
        temp_files.release().await;
        response
    }

    /// Process already-stored files, one concurrent pipeline per file.
    ///
    /// Returns exactly one outcome per input, in input order. The caller owns the files.
    pub async fn process_batch(
        &self,
        files: &[UploadedFile],
    ) -> Result<BatchResponse, ProcessingError> {
        if files.is_empty() {
            return Err(ValidationError::NoFiles.into());
        }
        tracing::info!(files = files.len(), "Processing batch");

        let handles = files.iter().cloned().map(|file| {
            let ocr = Arc::clone(&self.ocr);
            let summarizer = Arc::clone(&self.summarizer);
            tokio::spawn(async move { run_pipeline(&ocr, &summarizer, &file).await })
        });

        let outcomes: Vec<FileOutcome> = join_all(handles)
            .await
            .into_iter()
            .zip(files)
            .map(|(joined, file)| match joined {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    tracing::error!(
                        file = %file.original_name,
                        error = %join_error,
                        "File pipeline aborted"
                    );
                    assemble::failed(file, &FileError::Internal(join_error.to_string()))
                }
            })
            .collect();

        self.metrics.record_batch(&outcomes);
        let processed = outcomes.iter().filter(|outcome| outcome.is_processed()).count();
        tracing::info!(
            processed,
            failed = outcomes.len() - processed,
            "Batch complete"
        );
        Ok(BatchResponse { files: outcomes })
    }

    /// Limits applied to incoming uploads.
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }
}

async fn run_pipeline(
    ocr: &OcrInvoker,
    summarizer: &SummaryProvider,
    file: &UploadedFile,
) -> FileOutcome {
    match process_file(ocr, summarizer, file).await {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::warn!(file = %file.original_name, error = %error, "File processing failed");
            assemble::failed(file, &error)
        }
    }
}

async fn process_file(
    ocr: &OcrInvoker,
    summarizer: &SummaryProvider,
    file: &UploadedFile,
) -> Result<FileOutcome, FileError> {
    let ocr_result = ocr.extract(file.path()).await?;
    tracing::debug!(
        file = %file.original_name,
        words = ocr_result.word_count,
        "OCR complete"
    );
    let context = describe_document(
        &assemble::document_type(&file.original_name),
        ocr_result.word_count,
        ocr_result.character_count,
    );
    let summary = summarizer
        .summarize(&ocr_result.extracted_text, &context)
        .await;
    Ok(assemble::assemble(file, ocr_result, summary))
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn process_uploads(
        &self,
        files: Vec<IncomingFile>,
    ) -> Result<BatchResponse, ProcessingError> {
        ProcessingService::process_uploads(self, files).await
    }

    fn upload_policy(&self) -> &UploadPolicy {
        &self.policy
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrEngine, OcrError, OcrResult};
    use crate::summarization::{SummarizationClient, SummarizationClientError, SummarizationRequest};
    use std::path::Path;
    use std::time::Duration;

    /// Reads the stored file and echoes its contents as the extracted text.
    struct EchoEngine;

    #[async_trait]
    impl OcrEngine for EchoEngine {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn run(&self, path: &Path) -> Result<OcrResult, OcrError> {
            let text = tokio::fs::read_to_string(path).await?;
            if text.starts_with("panic") {
                panic!("engine crashed");
            }
            if text.starts_with("fail") {
                return Err(OcrError::Engine("Unable to read image file".into()));
            }
            if text.starts_with("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(OcrResult {
                word_count: text.split_whitespace().count(),
                character_count: text.chars().count(),
                extracted_text: text,
                annotated_image: None,
                confidence: None,
                quality_check: None,
            })
        }
    }

    struct UpperCaseSummarizer;

    #[async_trait]
    impl SummarizationClient for UpperCaseSummarizer {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            let text = request
                .prompt
                .lines()
                .find_map(|line| line.strip_prefix("Extracted Text: "))
                .unwrap_or_default();
            Ok(text.to_uppercase())
        }
    }

    fn service(upload_dir: &Path, providers: Vec<Arc<dyn SummarizationClient>>) -> ProcessingService {
        let retry = RetryPolicy::linear(2, Duration::from_millis(1));
        ProcessingService::new(
            OcrInvoker::new(Box::new(EchoEngine), retry),
            SummaryProvider::new(providers, RetryPolicy::exponential(2, Duration::from_millis(1))),
            UploadPolicy::new(1024, 5),
            upload_dir,
        )
    }

    fn incoming(name: &str, content: &str) -> IncomingFile {
        IncomingFile {
            original_name: name.into(),
            content_type: None,
            bytes: content.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn outcomes_follow_submission_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path(), vec![Arc::new(UpperCaseSummarizer)]);

        let response = service
            .process_uploads(vec![
                incoming("first.png", "slow first"),
                incoming("second.pdf", "second"),
                incoming("third.jpg", "third"),
            ])
            .await
            .expect("batch");

        let names: Vec<_> = response.files.iter().map(FileOutcome::file_name).collect();
        assert_eq!(names, vec!["first.png", "second.pdf", "third.jpg"]);
        let FileOutcome::Processed(second) = &response.files[1] else {
            panic!("expected processed outcome");
        };
        assert_eq!(second.document_type, "PDF");
        assert_eq!(second.summary.text, "SECOND");
        assert_eq!(second.summary.provider.as_deref(), Some("fake"));
    }

    #[tokio::test]
    async fn failing_and_panicking_files_do_not_affect_siblings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path(), vec![Arc::new(UpperCaseSummarizer)]);

        let response = service
            .process_uploads(vec![
                incoming("ok.png", "fine"),
                incoming("bad.png", "fail"),
                incoming("crash.png", "panic"),
            ])
            .await
            .expect("batch");

        assert_eq!(response.files.len(), 3);
        assert!(response.files[0].is_processed());
        match &response.files[1] {
            FileOutcome::Failed(failed) => {
                assert!(failed.error.contains("Unable to read image file"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        match &response.files[2] {
            FileOutcome::Failed(failed) => assert!(failed.error.starts_with("Internal error")),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.files_processed, 1);
        assert_eq!(snapshot.files_failed, 2);
    }

    #[tokio::test]
    async fn temporary_files_are_removed_after_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path(), vec![Arc::new(UpperCaseSummarizer)]);

        service
            .process_uploads(vec![incoming("a.png", "alpha"), incoming("b.png", "fail")])
            .await
            .expect("batch");

        assert_eq!(std::fs::read_dir(dir.path()).expect("dir").count(), 0);
    }

    #[tokio::test]
    async fn missing_providers_degrade_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path(), vec![]);

        let response = service
            .process_uploads(vec![incoming("scan.jpeg", "raw words")])
            .await
            .expect("batch");

        let FileOutcome::Processed(file) = &response.files[0] else {
            panic!("expected processed outcome");
        };
        assert!(file.summary.is_degraded());
        assert_eq!(file.summary.extracted_text.as_deref(), Some("raw words"));
        assert_eq!(service.metrics_snapshot().degraded_summaries, 1);
    }

    #[tokio::test]
    async fn validation_failure_stores_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path(), vec![]);

        let error = service
            .process_uploads(vec![incoming("ok.png", "fine"), incoming("notes.docx", "x")])
            .await
            .expect_err("rejected");

        assert!(matches!(
            error,
            ProcessingError::Validation(ValidationError::UnsupportedType { .. })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).expect("dir").count(), 0);
        assert_eq!(service.metrics_snapshot().batches, 0);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = service(dir.path(), vec![])
            .process_batch(&[])
            .await
            .expect_err("empty");
        assert!(matches!(error, ProcessingError::Validation(ValidationError::NoFiles)));
    }
}
