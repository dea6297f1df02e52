use std::path::Path;

use tracing::warn;

use crate::documents::DocumentError;

/// Text of every page, in order.
///
/// Malformed files can make the parser panic; that is reported as an
/// extraction error instead of taking the batch down.
pub fn extract_pdf_text(path: &Path) -> Result<String, DocumentError> {
    let bytes = std::fs::read(path)?;
    extract_pdf_text_from_bytes(&bytes).inspect_err(|e| {
        warn!(path = %path.display(), error = %e, "PDF text extraction failed");
    })
}

pub fn extract_pdf_text_from_bytes(bytes: &[u8]) -> Result<String, DocumentError> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::Pdf(e.to_string())),
        Err(_) => Err(DocumentError::Pdf("parser panicked on malformed PDF".to_string())),
    }
}
