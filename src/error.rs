// Error types shared by the compositing pipeline and the CLI

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("Failed to read record: {0}")]
    RecordError(String),
    #[error("Failed to load image {source_ref}: {reason}")]
    ImageError { source_ref: String, reason: String },
    #[error("Failed to load font: {0}")]
    FontError(String),
    #[error("Contract violation: {0}")]
    ContractViolation(String),
    #[error("No pages were composed, nothing to export")]
    NothingToExport,
    #[error("Partial export: {produced} of {expected} pages composed")]
    PartialExport { produced: usize, expected: usize },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    pub(crate) fn image(source_ref: &str, reason: impl std::fmt::Display) -> Self {
        AppError::ImageError {
            source_ref: abbreviate(source_ref),
            reason: reason.to_string(),
        }
    }
}

/// Data URLs can be megabytes long; keep error messages readable.
fn abbreviate(source_ref: &str) -> String {
    const MAX: usize = 64;
    if source_ref.chars().count() <= MAX {
        source_ref.to_string()
    } else {
        let head: String = source_ref.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_data_urls_are_shortened_in_messages() {
        let url = format!("data:image/png;base64,{}", "A".repeat(500));
        let err = AppError::image(&url, "bad header");
        let msg = err.to_string();
        assert!(msg.len() < 200, "message too long: {}", msg.len());
        assert!(msg.ends_with("...: bad header"));
    }

    #[test]
    fn partial_export_message_names_counts() {
        let err = AppError::PartialExport { produced: 1, expected: 2 };
        assert_eq!(err.to_string(), "Partial export: 1 of 2 pages composed");
    }
}
