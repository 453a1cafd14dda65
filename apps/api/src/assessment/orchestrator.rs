//! Assessment Orchestrator — owns the session state machine:
//! start → analyze/open → bounded ask/collect loop → complete → summarize →
//! report.
//!
//! Resilience contract: no operation that produces an analysis or a question
//! propagates adapter failure. Every adapter call sits in an explicit `match`
//! whose `Err` arm substitutes a fixed value from `analysis::fallback`, so
//! the flow always progresses. The only failures that surface are structural
//! (validation, unknown session, wrong state) and report rendering.
//!
//! All collaborators are injected at construction — no process-global client
//! state — so tests drive the full flow with scripted fakes.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{fallback, AnalysisAdapter};
use crate::assessment::store::SessionStore;
use crate::errors::AppError;
use crate::models::session::{
    AnswerOutcome, AssessmentSession, CvAnalysis, ReportRow, SessionStatus, QUESTION_CAP,
};
use crate::report::ReportRenderer;

/// Result of SubmitAnswer: either the interview continues with a concrete
/// next question, or it just completed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum NextStep {
    NextQuestion { text: String, number: usize },
    Finished { total: usize },
}

/// Result of Finalize: the persisted report record (summary text + artifact key).
#[derive(Debug, Clone)]
pub struct FinalizedReport {
    pub report: ReportRow,
}

pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    adapter: Arc<dyn AnalysisAdapter>,
    renderer: Arc<dyn ReportRenderer>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        adapter: Arc<dyn AnalysisAdapter>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            store,
            adapter,
            renderer,
        }
    }

    /// StartAssessment: creates and persists a fresh `Created` session.
    pub async fn start_assessment(
        &self,
        cv_filename: String,
        cv_text: String,
    ) -> Result<AssessmentSession, AppError> {
        if cv_text.trim().is_empty() {
            return Err(AppError::Validation(
                "CV text must not be empty".to_string(),
            ));
        }
        let session = AssessmentSession::new(cv_filename, cv_text, Utc::now());
        self.store.insert(&session).await?;
        Ok(session)
    }

    /// AnalyzeAndOpen: analyzes the CV and produces the opening question.
    ///
    /// Has no externally-visible failure mode beyond preconditions: adapter
    /// failures degrade to the fixed default analysis/question.
    pub async fn analyze_and_open(&self, id: Uuid) -> Result<(CvAnalysis, String), AppError> {
        let session = self.store.fetch(id).await?;
        if session.status != SessionStatus::Created {
            return Err(AppError::State(format!(
                "session is {}, expected created",
                session.status
            )));
        }

        let analysis = match self.adapter.analyze(&session.cv_text).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("CV analysis failed for session {id}, using fallback: {e}");
                fallback::default_analysis()
            }
        };

        let first_question = match self.adapter.first_question(&analysis).await {
            Ok(question) => question,
            Err(e) => {
                warn!("First question generation failed for session {id}, using fallback: {e}");
                fallback::OPENING_QUESTION.to_string()
            }
        };

        let session = self.store.open_with_analysis(id, &analysis).await?;
        info!("Session {id} opened, status={}", session.status);
        Ok((analysis, first_question))
    }

    /// SubmitAnswer: records one exchange and decides the next step.
    ///
    /// The append/increment/flip happens atomically in the store under
    /// per-session exclusion; this method only validates input and chooses
    /// the next question afterwards.
    pub async fn submit_answer(
        &self,
        id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<NextStep, AppError> {
        if question.trim().is_empty() || answer.trim().is_empty() {
            return Err(AppError::Validation(
                "Question and answer are required".to_string(),
            ));
        }

        let (session, outcome) = self.store.append_answer(id, question, answer).await?;

        let answered = match outcome {
            AnswerOutcome::Finished => {
                info!(
                    "Session {id} completed after {} answers",
                    session.qa_history.len()
                );
                return Ok(NextStep::Finished {
                    total: session.qa_history.len(),
                });
            }
            AnswerOutcome::Continue { answered } => answered,
        };

        // Invariant: the session was opened before any answer, so the
        // analysis is always present here.
        let analysis = session.cv_analysis.as_ref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session {id} in progress without analysis"))
        })?;

        let text = match self
            .adapter
            .followup_question(analysis, &session.qa_history)
            .await
        {
            Ok(question) => question,
            Err(e) => {
                warn!("Followup generation failed for session {id}, using fallback: {e}");
                fallback::followup_question(answered).to_string()
            }
        };

        Ok(NextStep::NextQuestion {
            text,
            number: answered + 1,
        })
    }

    /// Finalize: summary + report artifact for a completed session.
    ///
    /// Repeatable — each call regenerates the artifact; session data is never
    /// mutated. Renderer failure is the one unmasked error (`ReportGeneration`),
    /// and the caller retries.
    pub async fn finalize(&self, id: Uuid) -> Result<FinalizedReport, AppError> {
        let session = self.store.fetch(id).await?;
        if !session.is_completed() {
            return Err(AppError::State(format!(
                "session is {}, expected completed",
                session.status
            )));
        }
        let analysis = session.cv_analysis.as_ref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session {id} completed without analysis"))
        })?;

        let summary = match self
            .adapter
            .final_summary(analysis, &session.qa_history)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Final summary generation failed for session {id}, using fallback: {e}");
                fallback::final_summary(session.qa_history.len(), Utc::now())
            }
        };

        let artifact = self
            .renderer
            .render(id, analysis, &session.qa_history, &summary)
            .await
            .map_err(|e| AppError::ReportGeneration(e.to_string()))?;

        let report = self
            .store
            .insert_report(id, &artifact.s3_key, &summary)
            .await?;
        info!("Session {id} finalized, report {}", report.id);
        Ok(FinalizedReport { report })
    }

    /// Current session state, for status endpoints.
    pub async fn session(&self, id: Uuid) -> Result<AssessmentSession, AppError> {
        self.store.fetch(id).await
    }

    /// The fixed interview length.
    pub fn question_cap(&self) -> usize {
        QUESTION_CAP
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests — full state machine against an in-memory store and scripted fakes
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::analysis::AdapterError;
    use crate::llm_client::LlmError;
    use crate::models::session::QaRecord;
    use crate::report::{RenderError, ReportArtifact};

    /// In-memory store. The mutex is held across each read-modify-write, so
    /// it gives the same per-session serialization the Postgres store gets
    /// from `SELECT … FOR UPDATE`.
    #[derive(Default)]
    struct MemoryStore {
        sessions: Mutex<HashMap<Uuid, AssessmentSession>>,
        reports: Mutex<Vec<ReportRow>>,
    }

    #[async_trait]
    impl SessionStore for MemoryStore {
        async fn insert(&self, session: &AssessmentSession) -> Result<(), AppError> {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.id, session.clone());
            Ok(())
        }

        async fn fetch(&self, id: Uuid) -> Result<AssessmentSession, AppError> {
            self.sessions
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
        }

        async fn open_with_analysis(
            &self,
            id: Uuid,
            analysis: &CvAnalysis,
        ) -> Result<AssessmentSession, AppError> {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
            session.open(analysis.clone(), Utc::now())?;
            Ok(session.clone())
        }

        async fn append_answer(
            &self,
            id: Uuid,
            question: &str,
            answer: &str,
        ) -> Result<(AssessmentSession, AnswerOutcome), AppError> {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
            let outcome =
                session.record_answer(question.to_string(), answer.to_string(), Utc::now())?;
            Ok((session.clone(), outcome))
        }

        async fn insert_report(
            &self,
            session_id: Uuid,
            s3_key: &str,
            summary: &str,
        ) -> Result<ReportRow, AppError> {
            let report = ReportRow {
                id: Uuid::new_v4(),
                session_id,
                s3_key: s3_key.to_string(),
                summary_text: summary.to_string(),
                created_at: Utc::now(),
            };
            self.reports.lock().unwrap().push(report.clone());
            Ok(report)
        }
    }

    /// Adapter whose every operation fails — exercises the full fallback path.
    struct FailingAdapter;

    #[async_trait]
    impl AnalysisAdapter for FailingAdapter {
        async fn analyze(&self, _cv_text: &str) -> Result<CvAnalysis, AdapterError> {
            Err(AdapterError::Llm(LlmError::EmptyContent))
        }
        async fn first_question(&self, _analysis: &CvAnalysis) -> Result<String, AdapterError> {
            Err(AdapterError::Empty)
        }
        async fn followup_question(
            &self,
            _analysis: &CvAnalysis,
            _history: &[QaRecord],
        ) -> Result<String, AdapterError> {
            Err(AdapterError::Empty)
        }
        async fn final_summary(
            &self,
            _analysis: &CvAnalysis,
            _history: &[QaRecord],
        ) -> Result<String, AdapterError> {
            Err(AdapterError::Empty)
        }
    }

    /// Adapter that always succeeds with recognizable output.
    struct ScriptedAdapter;

    #[async_trait]
    impl AnalysisAdapter for ScriptedAdapter {
        async fn analyze(&self, _cv_text: &str) -> Result<CvAnalysis, AdapterError> {
            Ok(CvAnalysis {
                summary: "Scripted analysis".to_string(),
                key_skills: vec!["Rust".to_string()],
                experience_years: 7,
                career_stage: "Senior".to_string(),
                notable_achievements: vec![],
                potential_areas_for_growth: vec![],
            })
        }
        async fn first_question(&self, _analysis: &CvAnalysis) -> Result<String, AdapterError> {
            Ok("Scripted opening question?".to_string())
        }
        async fn followup_question(
            &self,
            _analysis: &CvAnalysis,
            history: &[QaRecord],
        ) -> Result<String, AdapterError> {
            Ok(format!("Scripted followup {}?", history.len() + 1))
        }
        async fn final_summary(
            &self,
            _analysis: &CvAnalysis,
            history: &[QaRecord],
        ) -> Result<String, AdapterError> {
            Ok(format!("## Scripted summary over {} answers", history.len()))
        }
    }

    /// Renderer that succeeds and counts invocations.
    #[derive(Default)]
    struct CountingRenderer {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl ReportRenderer for CountingRenderer {
        async fn render(
            &self,
            session_id: Uuid,
            _analysis: &CvAnalysis,
            _history: &[QaRecord],
            _summary: &str,
        ) -> Result<ReportArtifact, RenderError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            Ok(ReportArtifact {
                s3_key: format!("reports/{session_id}/assessment_{calls}.pdf"),
            })
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl ReportRenderer for FailingRenderer {
        async fn render(
            &self,
            _session_id: Uuid,
            _analysis: &CvAnalysis,
            _history: &[QaRecord],
            _summary: &str,
        ) -> Result<ReportArtifact, RenderError> {
            Err(RenderError::Upload("bucket unreachable".to_string()))
        }
    }

    fn orchestrator(
        adapter: Arc<dyn AnalysisAdapter>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> (Orchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (
            Orchestrator::new(store.clone(), adapter, renderer),
            store,
        )
    }

    async fn started(orch: &Orchestrator) -> Uuid {
        orch.start_assessment("cv.pdf".to_string(), "Some CV text".to_string())
            .await
            .unwrap()
            .id
    }

    async fn in_progress(orch: &Orchestrator) -> Uuid {
        let id = started(orch).await;
        orch.analyze_and_open(id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_start_assessment_rejects_empty_cv_text() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));
        let err = orch
            .start_assessment("cv.pdf".to_string(), "   ".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_start_assessment_identities_are_unique() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));
        let a = started(&orch).await;
        let b = started(&orch).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_analyze_and_open_never_fails_on_adapter_errors() {
        let (orch, _) = orchestrator(Arc::new(FailingAdapter), Arc::new(CountingRenderer::default()));
        let id = started(&orch).await;

        let (analysis, question) = orch.analyze_and_open(id).await.unwrap();
        assert_eq!(analysis.summary, fallback::default_analysis().summary);
        assert_eq!(question, fallback::OPENING_QUESTION);

        let session = orch.session(id).await.unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert!(session.cv_analysis.is_some());
    }

    #[tokio::test]
    async fn test_analyze_and_open_requires_created_state() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));
        let id = in_progress(&orch).await;
        let err = orch.analyze_and_open(id).await.unwrap_err();
        assert!(matches!(err, AppError::State(_)));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));
        let err = orch.analyze_and_open(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_answer_rejects_empty_answer_without_mutation() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));
        let id = in_progress(&orch).await;

        let err = orch.submit_answer(id, "A question?", "  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let session = orch.session(id).await.unwrap();
        assert!(session.qa_history.is_empty());
        assert_eq!(session.question_index, 0);
    }

    #[tokio::test]
    async fn test_submit_answer_numbers_questions_and_finishes_at_cap() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));
        let id = in_progress(&orch).await;

        for n in 1..=QUESTION_CAP {
            let step = orch.submit_answer(id, "q", "a").await.unwrap();
            if n == QUESTION_CAP {
                assert_eq!(step, NextStep::Finished { total: QUESTION_CAP });
            } else {
                assert_eq!(
                    step,
                    NextStep::NextQuestion {
                        text: format!("Scripted followup {}?", n + 1),
                        number: n + 1,
                    }
                );
            }
            let session = orch.session(id).await.unwrap();
            assert_eq!(session.qa_history.len(), n);
        }

        let session = orch.session(id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_submit_answer_after_completion_is_rejected() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));
        let id = in_progress(&orch).await;
        for _ in 0..QUESTION_CAP {
            orch.submit_answer(id, "q", "a").await.unwrap();
        }

        let err = orch.submit_answer(id, "q", "a").await.unwrap_err();
        assert!(matches!(err, AppError::State(_)));
        assert_eq!(
            orch.session(id).await.unwrap().qa_history.len(),
            QUESTION_CAP
        );
    }

    #[tokio::test]
    async fn test_fallback_question_sequence_is_deterministic() {
        let (orch, _) = orchestrator(Arc::new(FailingAdapter), Arc::new(CountingRenderer::default()));
        let id = in_progress(&orch).await;

        for n in 1..QUESTION_CAP {
            let step = orch.submit_answer(id, "q", "a").await.unwrap();
            let expected = fallback::FALLBACK_QUESTIONS[n.min(QUESTION_CAP - 1)];
            assert_eq!(
                step,
                NextStep::NextQuestion {
                    text: expected.to_string(),
                    number: n + 1,
                }
            );
        }
        let step = orch.submit_answer(id, "q", "a").await.unwrap();
        assert_eq!(step, NextStep::Finished { total: QUESTION_CAP });
    }

    #[tokio::test]
    async fn test_finalize_before_completion_is_rejected() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));

        let created = started(&orch).await;
        assert!(matches!(
            orch.finalize(created).await.unwrap_err(),
            AppError::State(_)
        ));

        let open = in_progress(&orch).await;
        assert!(matches!(
            orch.finalize(open).await.unwrap_err(),
            AppError::State(_)
        ));
    }

    #[tokio::test]
    async fn test_finalize_twice_produces_two_artifacts_and_preserves_data() {
        let renderer = Arc::new(CountingRenderer::default());
        let (orch, store) = orchestrator(Arc::new(ScriptedAdapter), renderer.clone());
        let id = in_progress(&orch).await;
        for _ in 0..QUESTION_CAP {
            orch.submit_answer(id, "q", "a").await.unwrap();
        }

        let before = orch.session(id).await.unwrap();
        let first = orch.finalize(id).await.unwrap();
        let second = orch.finalize(id).await.unwrap();
        assert_ne!(first.report.id, second.report.id);
        assert_ne!(first.report.s3_key, second.report.s3_key);
        assert_eq!(*renderer.calls.lock().unwrap(), 2);
        assert_eq!(store.reports.lock().unwrap().len(), 2);

        let after = orch.session(id).await.unwrap();
        assert_eq!(after.qa_history.len(), before.qa_history.len());
        assert_eq!(
            after.cv_analysis.as_ref().unwrap().summary,
            before.cv_analysis.as_ref().unwrap().summary
        );
    }

    #[tokio::test]
    async fn test_finalize_surfaces_renderer_failure_and_keeps_data() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(FailingRenderer));
        let id = in_progress(&orch).await;
        for _ in 0..QUESTION_CAP {
            orch.submit_answer(id, "q", "a").await.unwrap();
        }

        let err = orch.finalize(id).await.unwrap_err();
        assert!(matches!(err, AppError::ReportGeneration(_)));

        // Q&A data preserved regardless of render outcome; retry is possible.
        let session = orch.session(id).await.unwrap();
        assert_eq!(session.qa_history.len(), QUESTION_CAP);
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_all_fallback_end_to_end_scenario() {
        // Start → analyze (fails) → 8 answers (adapter fails every time) →
        // finalize (renderer succeeds): completes on fallback text alone.
        let (orch, _) = orchestrator(Arc::new(FailingAdapter), Arc::new(CountingRenderer::default()));
        let id = started(&orch).await;

        let (analysis, first) = orch.analyze_and_open(id).await.unwrap();
        assert_eq!(analysis.experience_years, 5);
        assert_eq!(first, fallback::OPENING_QUESTION);

        for _ in 0..QUESTION_CAP {
            orch.submit_answer(id, "q", "a").await.unwrap();
        }

        let finalized = orch.finalize(id).await.unwrap();
        assert!(finalized
            .report
            .summary_text
            .contains("8 interview questions"));
        assert!(!finalized.report.s3_key.is_empty());
        assert_eq!(
            orch.session(id).await.unwrap().status,
            SessionStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_concurrent_submits_for_last_slot_serialize() {
        let (orch, _) = orchestrator(Arc::new(ScriptedAdapter), Arc::new(CountingRenderer::default()));
        let orch = Arc::new(orch);
        let id = in_progress(&orch).await;
        for _ in 0..QUESTION_CAP - 1 {
            orch.submit_answer(id, "q", "a").await.unwrap();
        }

        // One slot left — exactly one of two racing submits may take it.
        let a = tokio::spawn({
            let orch = orch.clone();
            async move { orch.submit_answer(id, "q-a", "answer-a").await }
        });
        let b = tokio::spawn({
            let orch = orch.clone();
            async move { orch.submit_answer(id, "q-b", "answer-b").await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let finished = results
            .iter()
            .filter(|r| matches!(r, Ok(NextStep::Finished { .. })))
            .count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::State(_))))
            .count();
        assert_eq!(finished, 1, "exactly one submit must take the last slot");
        assert_eq!(rejected, 1, "the other must be rejected after serializing");

        let session = orch.session(id).await.unwrap();
        assert_eq!(session.qa_history.len(), QUESTION_CAP);
        assert_eq!(session.status, SessionStatus::Completed);
    }
}
