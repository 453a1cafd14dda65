//! Session Record Store — all session mutation goes through here.
//!
//! The Postgres implementation serializes per-session mutation with a
//! single-writer transaction: `SELECT … FOR UPDATE` on the session row around
//! the whole read-modify-write, so concurrent SubmitAnswer calls for one
//! session cannot both append (cross-session traffic proceeds in parallel).
//! Lifecycle rules are NOT duplicated here — the locked row is decoded into
//! the domain type and its methods decide.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::{
    AnswerOutcome, AssessmentSession, CvAnalysis, ReportRow, SessionRow,
};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a freshly created session.
    async fn insert(&self, session: &AssessmentSession) -> Result<(), AppError>;

    /// Loads a session; `NotFound` if the identity is unknown.
    async fn fetch(&self, id: Uuid) -> Result<AssessmentSession, AppError>;

    /// `Created → InProgress` with the analysis, atomically.
    async fn open_with_analysis(
        &self,
        id: Uuid,
        analysis: &CvAnalysis,
    ) -> Result<AssessmentSession, AppError>;

    /// Appends one Q&A record, advances the counter, and flips the status if
    /// the cap is reached — as one atomic unit under per-session exclusion.
    /// Returns the post-append session and the outcome.
    async fn append_answer(
        &self,
        id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<(AssessmentSession, AnswerOutcome), AppError>;

    /// Records a generated report artifact. Sessions accumulate one row per
    /// Finalize call; earlier rows are never removed.
    async fn insert_report(
        &self,
        session_id: Uuid,
        s3_key: &str,
        summary: &str,
    ) -> Result<ReportRow, AppError>;
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &AssessmentSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO assessment_sessions
                (id, cv_filename, cv_text, cv_analysis, qa_history,
                 question_index, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id)
        .bind(&session.cv_filename)
        .bind(&session.cv_text)
        .bind(None::<serde_json::Value>)
        .bind(serde_json::json!([]))
        .bind(session.question_index)
        .bind(session.status.as_str())
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        info!("Created assessment session {}", session.id);
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<AssessmentSession, AppError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM assessment_sessions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let row = row.ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        Ok(AssessmentSession::from_row(row)?)
    }

    async fn open_with_analysis(
        &self,
        id: Uuid,
        analysis: &CvAnalysis,
    ) -> Result<AssessmentSession, AppError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM assessment_sessions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let row = row.ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;

        let mut session = AssessmentSession::from_row(row)?;
        session.open(analysis.clone(), Utc::now())?;

        sqlx::query(
            r#"
            UPDATE assessment_sessions
            SET cv_analysis = $2, status = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(
            serde_json::to_value(analysis)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize analysis: {e}")))?,
        )
        .bind(session.status.as_str())
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Session {id} analyzed and opened");
        Ok(session)
    }

    async fn append_answer(
        &self,
        id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<(AssessmentSession, AnswerOutcome), AppError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM assessment_sessions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let row = row.ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;

        let mut session = AssessmentSession::from_row(row)?;
        let outcome = session.record_answer(question.to_string(), answer.to_string(), Utc::now())?;

        sqlx::query(
            r#"
            UPDATE assessment_sessions
            SET qa_history = $2, question_index = $3, status = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(
            serde_json::to_value(&session.qa_history)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize history: {e}")))?,
        )
        .bind(session.question_index)
        .bind(session.status.as_str())
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((session, outcome))
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
        sqlx::query(
            r#"
            INSERT INTO reports (id, session_id, s3_key, summary_text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(report.id)
        .bind(report.session_id)
        .bind(&report.s3_key)
        .bind(&report.summary_text)
        .bind(report.created_at)
        .execute(&self.pool)
        .await?;

        info!("Recorded report {} for session {}", report.id, session_id);
        Ok(report)
    }
}
