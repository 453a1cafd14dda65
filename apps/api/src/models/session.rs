//! Session record model — the sole stateful entity of the assessment flow.
//!
//! `SessionRow` is the raw Postgres row (JSONB columns as `serde_json::Value`).
//! `AssessmentSession` is the typed domain view; decoding fails closed on
//! malformed stored data. All lifecycle invariants live in the domain methods
//! so every store backend enforces them identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Maximum number of interview questions per session.
///
/// Enforced in two places that must agree: the completion check in
/// `record_answer` and the fallback-question index clamp in `analysis::fallback`.
pub const QUESTION_CAP: usize = 8;

// ────────────────────────────────────────────────────────────────────────────
// Status
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of an assessment session.
/// Transitions are monotonic: `Created → InProgress → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }

    /// Parses a stored status string. Unknown values are an error, never a
    /// silent default — a corrupt row must not re-enter the state machine.
    pub fn parse(s: &str) -> Result<Self, SessionDataError> {
        match s {
            "created" => Ok(SessionStatus::Created),
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(SessionDataError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Value objects
// ────────────────────────────────────────────────────────────────────────────

/// One question/answer exchange. Immutable once appended to the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

/// Structured CV analysis produced by the Analysis Adapter (or its fallback).
/// Set once per session and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvAnalysis {
    pub summary: String,
    pub key_skills: Vec<String>,
    pub experience_years: i64,
    pub career_stage: String,
    pub notable_achievements: Vec<String>,
    pub potential_areas_for_growth: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Decode failures for persisted session data. Always fail closed: a row that
/// does not parse is rejected, never patched up or evaluated dynamically.
#[derive(Debug, Error)]
pub enum SessionDataError {
    #[error("unknown session status '{0}'")]
    UnknownStatus(String),

    #[error("malformed cv_analysis: {0}")]
    BadAnalysis(serde_json::Error),

    #[error("malformed qa_history: {0}")]
    BadHistory(serde_json::Error),
}

/// Lifecycle violations raised by the domain methods.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionStateError {
    #[error("session is {actual}, expected {expected}")]
    WrongStatus {
        expected: SessionStatus,
        actual: SessionStatus,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Rows
// ────────────────────────────────────────────────────────────────────────────

/// Raw `assessment_sessions` row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub cv_filename: String,
    pub cv_text: String,
    pub cv_analysis: Option<Value>,
    pub qa_history: Value,
    pub question_index: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `audio_files` row — one stored TTS output or answer recording.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AudioFileRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub s3_key: String,
    pub transcription: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `reports` row — one generated report artifact. Finalize may be re-invoked,
/// so a session can accumulate several rows; prior artifacts are kept.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub s3_key: String,
    pub summary_text: String,
    pub created_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Domain view
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of recording an answer, decided at append time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The cap was reached on this answer; the session is now `Completed`.
    Finished,
    /// More questions remain. `answered` is the history length after append.
    Continue { answered: usize },
}

/// Typed view of a session row. Mutations go through the lifecycle methods
/// below, which are the single source of truth for the state machine.
#[derive(Debug, Clone)]
pub struct AssessmentSession {
    pub id: Uuid,
    pub cv_filename: String,
    pub cv_text: String,
    pub cv_analysis: Option<CvAnalysis>,
    pub qa_history: Vec<QaRecord>,
    pub question_index: i32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssessmentSession {
    /// Creates a fresh session in state `Created`.
    pub fn new(cv_filename: String, cv_text: String, now: DateTime<Utc>) -> Self {
        AssessmentSession {
            id: Uuid::new_v4(),
            cv_filename,
            cv_text,
            cv_analysis: None,
            qa_history: Vec::new(),
            question_index: 0,
            status: SessionStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }

    /// Decodes a raw row, failing closed on any malformed column.
    pub fn from_row(row: SessionRow) -> Result<Self, SessionDataError> {
        let status = SessionStatus::parse(&row.status)?;
        let cv_analysis = row
            .cv_analysis
            .map(serde_json::from_value)
            .transpose()
            .map_err(SessionDataError::BadAnalysis)?;
        let qa_history: Vec<QaRecord> =
            serde_json::from_value(row.qa_history).map_err(SessionDataError::BadHistory)?;
        Ok(AssessmentSession {
            id: row.id,
            cv_filename: row.cv_filename,
            cv_text: row.cv_text,
            cv_analysis,
            qa_history,
            question_index: row.question_index,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// `Created → InProgress`: stores the (possibly fallback) analysis exactly once.
    pub fn open(&mut self, analysis: CvAnalysis, now: DateTime<Utc>) -> Result<(), SessionStateError> {
        if self.status != SessionStatus::Created {
            return Err(SessionStateError::WrongStatus {
                expected: SessionStatus::Created,
                actual: self.status,
            });
        }
        self.cv_analysis = Some(analysis);
        self.status = SessionStatus::InProgress;
        self.updated_at = now;
        Ok(())
    }

    /// Appends an answer and advances the counter; flips to `Completed` on the
    /// exact call that reaches `QUESTION_CAP`. The append, the increment, and
    /// the status flip are one unit — callers persist all three together.
    pub fn record_answer(
        &mut self,
        question: String,
        answer: String,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SessionStateError> {
        if self.status != SessionStatus::InProgress {
            return Err(SessionStateError::WrongStatus {
                expected: SessionStatus::InProgress,
                actual: self.status,
            });
        }
        self.qa_history.push(QaRecord {
            question,
            answer,
            asked_at: now,
        });
        self.question_index += 1;
        self.updated_at = now;

        let answered = self.qa_history.len();
        if answered >= QUESTION_CAP {
            self.status = SessionStatus::Completed;
            Ok(AnswerOutcome::Finished)
        } else {
            Ok(AnswerOutcome::Continue { answered })
        }
    }

    /// True once the session has reached its terminal state.
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
