//! Analysis Adapter — the LLM-backed collaborator that turns a CV into a
//! structured analysis, generates interview questions, and writes the final
//! narrative summary.
//!
//! Every operation is fallible; the orchestrator owns the policy of what to
//! do on failure (deterministic fallbacks — see `fallback`). Implementations
//! never substitute defaults themselves, so the fallback branch stays visible
//! in the state machine.
//!
//! Carried in the orchestrator as `Arc<dyn AnalysisAdapter>`, injected at
//! construction so tests can swap in scripted fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::models::session::{CvAnalysis, QaRecord};

pub mod claude;
pub mod fallback;
pub mod prompts;

pub use claude::ClaudeAnalysisAdapter;

/// Failure of any adapter operation. Absorbed by the orchestrator, only logged.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("adapter returned an empty result")]
    Empty,
}

#[async_trait]
pub trait AnalysisAdapter: Send + Sync {
    /// Structured analysis of raw CV text.
    async fn analyze(&self, cv_text: &str) -> Result<CvAnalysis, AdapterError>;

    /// Personalized opening question derived from the analysis.
    async fn first_question(&self, analysis: &CvAnalysis) -> Result<String, AdapterError>;

    /// Next question given the analysis and the full Q&A history so far.
    /// Implementations are expected to use at least the most recent entry;
    /// the full history is passed for extensibility.
    async fn followup_question(
        &self,
        analysis: &CvAnalysis,
        history: &[QaRecord],
    ) -> Result<String, AdapterError>;

    /// Final narrative summary over the analysis and the complete transcript.
    /// May contain lightweight markup (`##` headings, `*` bullets, emphasis)
    /// consumed by the report renderer.
    async fn final_summary(
        &self,
        analysis: &CvAnalysis,
        history: &[QaRecord],
    ) -> Result<String, AdapterError>;
}
