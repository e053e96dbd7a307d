// inspection-report: error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("End date {end} is before start date {start}")]
    InvalidDateRange { start: String, end: String },
    #[error("Invalid date format: {0}")]
    DateError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate form field name: {0}")]
    DuplicateField(String),
    #[error("Failed to load image: {0}")]
    ImageError(String),
    #[error("Invalid report template: {0}")]
    TemplateError(String),
    #[error("Failed to read report input: {0}")]
    InputError(String),
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

impl From<lopdf::Error> for ReportError {
    fn from(err: lopdf::Error) -> Self {
        ReportError::PdfError(err.to_string())
    }
}
