//! Report Renderer — turns (analysis, Q&A transcript, summary text) into a
//! paginated PDF artifact stored in S3.
//!
//! The renderer is the one collaborator whose failure is NOT masked by a
//! fallback: a document artifact cannot be synthesized as plain text, so
//! Finalize surfaces the failure and the caller retries.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::session::{CvAnalysis, QaRecord};

pub mod layout;
pub mod markup;
pub mod pdf;

pub use pdf::PdfReportRenderer;

/// Handle to a rendered artifact: the S3 key it can be retrieved under.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub s3_key: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF composition failed: {0}")]
    Compose(String),

    #[error("artifact upload failed: {0}")]
    Upload(String),
}

#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Renders the full assessment report and stores it, returning a handle.
    /// Each call produces a fresh artifact; earlier ones are never retracted.
    async fn render(
        &self,
        session_id: Uuid,
        analysis: &CvAnalysis,
        history: &[QaRecord],
        summary: &str,
    ) -> Result<ReportArtifact, RenderError>;
}
