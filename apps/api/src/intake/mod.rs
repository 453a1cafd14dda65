//! CV Intake — extracts plain text from an uploaded document.
//!
//! A failed extraction aborts session creation; nothing is persisted for a
//! CV that cannot be read. PDF parsing is CPU-bound and runs in
//! `tokio::task::spawn_blocking`.

use bytes::Bytes;

use crate::errors::AppError;

/// Accepted upload formats, by extension.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Checks the extension allow-list (case-insensitive).
pub fn allowed_file(filename: &str) -> bool {
    extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension(filename: &str) -> Option<String> {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Extracts plain text from an uploaded CV, failing with a validation error
/// on unsupported or unreadable content.
pub async fn extract_text(data: Bytes, filename: &str) -> Result<String, AppError> {
    let ext = extension(filename).ok_or_else(|| {
        AppError::Validation(format!("File '{filename}' has no extension"))
    })?;

    let text = match ext.as_str() {
        "pdf" => {
            let text = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&data)
            })
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("extraction task panicked: {e}")))?
            .map_err(|e| {
                AppError::Validation(format!("Could not extract text from PDF: {e}"))
            })?;
            text
        }
        "txt" | "md" => String::from_utf8(data.to_vec())
            .map_err(|_| AppError::Validation("File is not valid UTF-8 text".to_string()))?,
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported file type '.{other}' — allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )))
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation(
            "No text could be extracted from the uploaded CV".to_string(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file_accepts_listed_extensions() {
        assert!(allowed_file("cv.pdf"));
        assert!(allowed_file("cv.txt"));
        assert!(allowed_file("notes.md"));
        assert!(allowed_file("CV.PDF"));
    }

    #[test]
    fn test_allowed_file_rejects_everything_else() {
        assert!(!allowed_file("cv.docx"));
        assert!(!allowed_file("cv.exe"));
        assert!(!allowed_file("cv"));
        assert!(!allowed_file(""));
    }

    #[tokio::test]
    async fn test_extract_text_from_plain_text() {
        let data = Bytes::from_static(b"  A plain text CV body.  ");
        let text = extract_text(data, "cv.txt").await.unwrap();
        assert_eq!(text, "A plain text CV body.");
    }

    #[tokio::test]
    async fn test_extract_text_rejects_empty_content() {
        let data = Bytes::from_static(b"   \n  ");
        let err = extract_text(data, "cv.txt").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_extract_text_rejects_unsupported_extension() {
        let data = Bytes::from_static(b"binary");
        let err = extract_text(data, "cv.docx").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_extract_text_rejects_invalid_utf8() {
        let data = Bytes::from_static(&[0xff, 0xfe, 0x00]);
        let err = extract_text(data, "cv.txt").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
