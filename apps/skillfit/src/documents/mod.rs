//! Document text extraction for CV and offer attachments.

pub mod clean;
pub mod docx;
pub mod pdf;

use std::path::Path;

use thiserror::Error;

pub use clean::clean_text;

/// CV text shorter than this (in characters) carries nothing worth extracting.
pub const MIN_CV_TEXT_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported document type: {0}")]
    Unsupported(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX archive error: {0}")]
    Docx(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Kind from a file name's extension, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(DocumentKind::Pdf)
        } else if lower.ends_with(".docx") {
            Some(DocumentKind::Docx)
        } else {
            None
        }
    }
}

/// Extracts the plain text of a PDF or DOCX file, trimmed.
pub fn extract_text(path: &Path) -> Result<String, DocumentError> {
    let name = path.to_string_lossy();
    let text = match DocumentKind::from_name(&name) {
        Some(DocumentKind::Pdf) => pdf::extract_pdf_text(path)?,
        Some(DocumentKind::Docx) => docx::extract_docx_text(path)?,
        None => return Err(DocumentError::Unsupported(name.into_owned())),
    };
    Ok(text.trim().to_string())
}

pub fn is_too_short(text: &str) -> bool {
    text.chars().count() < MIN_CV_TEXT_CHARS
}
