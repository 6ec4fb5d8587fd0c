use crate::processing::FileOutcome;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing batch processing activity.
#[derive(Default)]
pub struct BatchMetrics {
    batches: AtomicU64,
    files_processed: AtomicU64,
    files_failed: AtomicU64,
    degraded_summaries: AtomicU64,
}

impl BatchMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed batch and tally its per-file outcomes.
    pub fn record_batch(&self, outcomes: &[FileOutcome]) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        for outcome in outcomes {
            match outcome {
                FileOutcome::Processed(file) => {
                    self.files_processed.fetch_add(1, Ordering::Relaxed);
                    if file.summary.is_degraded() {
                        self.degraded_summaries.fetch_add(1, Ordering::Relaxed);
                    }
                }
                FileOutcome::Failed(_) => {
                    self.files_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            degraded_summaries: self.degraded_summaries.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of processing counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Batches handled since startup.
    pub batches: u64,
    /// Files whose OCR succeeded.
    pub files_processed: u64,
    /// Files that ended in a failure record.
    pub files_failed: u64,
    /// Processed files whose summary fell back to the placeholder.
    pub degraded_summaries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{FailedFile, ProcessedFile};
    use crate::summarization::{SummaryError, SummaryResult};

    fn processed(summary: SummaryResult) -> FileOutcome {
        FileOutcome::Processed(ProcessedFile {
            file_name: "a.png".into(),
            document_type: "PNG".into(),
            extracted_text: "text".into(),
            summary,
            word_count: 1,
            character_count: 4,
            annotated_image: None,
            confidence: None,
            quality_check: None,
        })
    }

    #[test]
    fn records_outcomes_per_batch() {
        let metrics = BatchMetrics::new();
        metrics.record_batch(&[
            processed(SummaryResult::generated("ok".into(), "openai")),
            processed(SummaryResult::degraded("text", &SummaryError::NoProviders)),
            FileOutcome::Failed(FailedFile {
                file_name: "b.pdf".into(),
                error: "boom".into(),
            }),
        ]);
        metrics.record_batch(&[]);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.files_processed, 2);
        assert_eq!(snapshot.files_failed, 1);
        assert_eq!(snapshot.degraded_summaries, 1);
    }

    #[test]
    fn fresh_metrics_are_zero() {
        assert_eq!(BatchMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
