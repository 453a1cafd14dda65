//! Production Analysis Adapter backed by the Claude API.
//!
//! `analyze` uses strict JSON mode; the question and summary calls are plain
//! text. Temperatures follow the call's purpose: questions are generated
//! warmer (0.7), the final report cooler (0.3).

use async_trait::async_trait;

use crate::analysis::prompts::{
    ANALYZE_PROMPT_TEMPLATE, ANALYZE_SYSTEM, FIRST_QUESTION_PROMPT_TEMPLATE,
    FOLLOWUP_PROMPT_TEMPLATE, QUESTION_SYSTEM, SUMMARY_PROMPT_TEMPLATE, SUMMARY_SYSTEM,
};
use crate::analysis::{AdapterError, AnalysisAdapter};
use crate::llm_client::LlmClient;
use crate::models::session::{CvAnalysis, QaRecord};

const QUESTION_TEMPERATURE: f32 = 0.7;
const SUMMARY_TEMPERATURE: f32 = 0.3;

pub struct ClaudeAnalysisAdapter {
    llm: LlmClient,
}

impl ClaudeAnalysisAdapter {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AnalysisAdapter for ClaudeAnalysisAdapter {
    async fn analyze(&self, cv_text: &str) -> Result<CvAnalysis, AdapterError> {
        let prompt = ANALYZE_PROMPT_TEMPLATE.replace("{cv_text}", cv_text);
        let analysis: CvAnalysis = self.llm.call_json(&prompt, ANALYZE_SYSTEM).await?;
        Ok(analysis)
    }

    async fn first_question(&self, analysis: &CvAnalysis) -> Result<String, AdapterError> {
        let prompt = FIRST_QUESTION_PROMPT_TEMPLATE
            .replace("{summary}", &analysis.summary)
            .replace("{career_stage}", &analysis.career_stage)
            .replace("{key_skills}", &analysis.key_skills.join(", "));
        let question = self
            .llm
            .call_text(&prompt, QUESTION_SYSTEM, Some(QUESTION_TEMPERATURE))
            .await?;
        Ok(question)
    }

    async fn followup_question(
        &self,
        analysis: &CvAnalysis,
        history: &[QaRecord],
    ) -> Result<String, AdapterError> {
        // The prompt keys off the most recent exchange; the count keeps the
        // model aware of interview progress.
        let last = history.last().ok_or(AdapterError::Empty)?;
        let prompt = FOLLOWUP_PROMPT_TEMPLATE
            .replace("{summary}", &analysis.summary)
            .replace("{career_stage}", &analysis.career_stage)
            .replace("{last_question}", &last.question)
            .replace("{last_answer}", &last.answer)
            .replace("{qa_count}", &history.len().to_string());
        let question = self
            .llm
            .call_text(&prompt, QUESTION_SYSTEM, Some(QUESTION_TEMPERATURE))
            .await?;
        Ok(question)
    }

    async fn final_summary(
        &self,
        analysis: &CvAnalysis,
        history: &[QaRecord],
    ) -> Result<String, AdapterError> {
        let prompt = SUMMARY_PROMPT_TEMPLATE
            .replace("{summary}", &analysis.summary)
            .replace("{career_stage}", &analysis.career_stage)
            .replace("{experience_years}", &analysis.experience_years.to_string())
            .replace("{qa_transcript}", &render_transcript(history));
        let summary = self
            .llm
            .call_text(&prompt, SUMMARY_SYSTEM, Some(SUMMARY_TEMPERATURE))
            .await?;
        Ok(summary)
    }
}

fn render_transcript(history: &[QaRecord]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(i, qa)| format!("Q{}: {}\nA{}: {}", i + 1, qa.question, i + 1, qa.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_render_transcript_numbers_entries_in_order() {
        let history = vec![
            QaRecord {
                question: "First?".to_string(),
                answer: "Yes".to_string(),
                asked_at: Utc::now(),
            },
            QaRecord {
                question: "Second?".to_string(),
                answer: "Also yes".to_string(),
                asked_at: Utc::now(),
            },
        ];
        let transcript = render_transcript(&history);
        assert!(transcript.contains("Q1: First?"));
        assert!(transcript.contains("A2: Also yes"));
        let q1 = transcript.find("Q1").unwrap();
        let q2 = transcript.find("Q2").unwrap();
        assert!(q1 < q2);
    }

    #[test]
    fn test_render_transcript_empty_history() {
        assert_eq!(render_transcript(&[]), "");
    }
}
