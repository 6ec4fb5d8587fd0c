//! Shape per-file outcomes from pipeline results. Pure mapping, no I/O.

use super::types::{FailedFile, FileError, FileOutcome, ProcessedFile, UploadedFile};
use crate::ocr::OcrResult;
use crate::summarization::SummaryResult;
use std::path::Path;

/// Uppercased extension without the dot (`scan.jpeg` → `JPEG`); empty when there is none.
pub fn document_type(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|extension| extension.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// Combine OCR and summary results into the file's success record.
pub fn assemble(file: &UploadedFile, ocr: OcrResult, summary: SummaryResult) -> FileOutcome {
    FileOutcome::Processed(ProcessedFile {
        file_name: file.original_name.clone(),
        document_type: document_type(&file.original_name),
        extracted_text: ocr.extracted_text,
        summary,
        word_count: ocr.word_count,
        character_count: ocr.character_count,
        annotated_image: ocr.annotated_image,
        confidence: ocr.confidence,
        quality_check: ocr.quality_check,
    })
}

/// Record a failure for `file`.
pub fn failed(file: &UploadedFile, error: &FileError) -> FileOutcome {
    FileOutcome::Failed(FailedFile {
        file_name: file.original_name.clone(),
        error: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrError;
    use std::path::PathBuf;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile {
            path: PathBuf::from(format!("uploads/abc-{name}")),
            original_name: name.into(),
            size_bytes: 10,
            content_type: None,
        }
    }

    #[test]
    fn document_type_is_uppercased_extension() {
        assert_eq!(document_type("scan.jpeg"), "JPEG");
        assert_eq!(document_type("report.final.Pdf"), "PDF");
        assert_eq!(document_type("README"), "");
    }

    #[test]
    fn assemble_copies_results_through() {
        let ocr = OcrResult {
            extracted_text: "Total 42".into(),
            word_count: 2,
            character_count: 8,
            annotated_image: Some("aW1n".into()),
            confidence: Some(0.9),
            quality_check: None,
        };
        let summary = SummaryResult::generated("A receipt.".into(), "openai");

        let outcome = assemble(&upload("receipt.png"), ocr, summary.clone());

        let FileOutcome::Processed(file) = outcome else {
            panic!("expected processed outcome");
        };
        assert_eq!(file.file_name, "receipt.png");
        assert_eq!(file.document_type, "PNG");
        assert_eq!(file.extracted_text, "Total 42");
        assert_eq!(file.summary, summary);
        assert_eq!(file.annotated_image.as_deref(), Some("aW1n"));
    }

    #[test]
    fn failure_serializes_only_name_and_error() {
        let outcome = failed(
            &upload("broken.pdf"),
            &FileError::Ocr(OcrError::Engine("Unable to read image file".into())),
        );

        let value = serde_json::to_value(&outcome).expect("json");
        let object = value.as_object().expect("object");
        assert_eq!(object.len(), 2);
        assert_eq!(value["fileName"], "broken.pdf");
        assert!(value["error"].as_str().unwrap().contains("Unable to read image file"));
    }
}
