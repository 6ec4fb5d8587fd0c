//! Prompt construction for document summaries.

/// Short context line describing the document handed to the summarizer.
pub fn describe_document(document_type: &str, word_count: usize, character_count: usize) -> String {
    format!(
        "This is a {document_type} document with {word_count} words and {character_count} characters."
    )
}

/// Build the summarization prompt embedding the extracted text and its context line.
pub fn build_prompt(extracted_text: &str, context: &str) -> String {
    format!(
        "Please provide a concise summary of the following document. Include key points and any notable information.\n\n\
         Extracted Text: {extracted_text}\n\n\
         Image Content Description: {context}\n\n\
         Please format the summary in a clear, readable way."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_line_reports_type_and_counts() {
        assert_eq!(
            describe_document("PDF", 120, 640),
            "This is a PDF document with 120 words and 640 characters."
        );
    }

    #[test]
    fn prompt_embeds_text_and_context() {
        let prompt = build_prompt("Total due: 42 EUR", "This is a PNG document with 4 words and 17 characters.");
        assert!(prompt.starts_with("Please provide a concise summary"));
        assert!(prompt.contains("Extracted Text: Total due: 42 EUR\n"));
        assert!(prompt.contains("Image Content Description: This is a PNG document"));
    }
}
