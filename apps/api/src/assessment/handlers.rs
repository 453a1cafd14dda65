//! Axum route handlers for the Assessment API.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::NextStep;
use crate::errors::AppError;
use crate::intake;
use crate::models::session::{CvAnalysis, ReportRow};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StartAssessmentResponse {
    pub session_id: Uuid,
    pub cv_filename: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub cv_analysis: CvAnalysis,
    pub first_question: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: Uuid,
    pub status: String,
    pub questions_answered: usize,
    pub question_cap: usize,
    pub cv_filename: String,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub report_id: Uuid,
    pub summary: String,
    pub report_url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/assessments
///
/// Multipart CV upload (`cv_file` field). Extracts text and starts a session.
/// A failed extraction aborts before any session exists.
pub async fn handle_start_assessment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StartAssessmentResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("cv_file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation("cv_file must have a filename".to_string()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, data));
        }
    }

    let (filename, data) = upload.ok_or_else(|| {
        AppError::Validation("Multipart field 'cv_file' is required".to_string())
    })?;

    if !intake::allowed_file(&filename) {
        return Err(AppError::Validation(format!(
            "Invalid file type — allowed: {}",
            intake::ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let cv_text = intake::extract_text(data, &filename).await?;
    let session = state
        .orchestrator
        .start_assessment(filename, cv_text)
        .await?;

    Ok(Json(StartAssessmentResponse {
        session_id: session.id,
        cv_filename: session.cv_filename,
        status: session.status.to_string(),
    }))
}

/// POST /api/v1/assessments/:id/analyze
///
/// Analyzes the CV and returns the opening question. Degrades to fixed
/// defaults on adapter failure — never 5xx because of the LLM.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let (cv_analysis, first_question) = state.orchestrator.analyze_and_open(id).await?;
    Ok(Json(AnalyzeResponse {
        cv_analysis,
        first_question,
    }))
}

/// POST /api/v1/assessments/:id/answers
///
/// Records one answer and returns either the next question or completion.
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    let step = state
        .orchestrator
        .submit_answer(id, &request.question, &request.answer)
        .await?;

    let response = match step {
        NextStep::Finished { .. } => SubmitAnswerResponse {
            completed: true,
            next_question: None,
            question_number: None,
            message: Some("Assessment completed successfully".to_string()),
        },
        NextStep::NextQuestion { text, number } => SubmitAnswerResponse {
            completed: false,
            next_question: Some(text),
            question_number: Some(number),
            message: None,
        },
    };
    Ok(Json(response))
}

/// GET /api/v1/assessments/:id
pub async fn handle_session_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let session = state.orchestrator.session(id).await?;
    Ok(Json(SessionStatusResponse {
        session_id: session.id,
        status: session.status.to_string(),
        questions_answered: session.qa_history.len(),
        question_cap: state.orchestrator.question_cap(),
        cv_filename: session.cv_filename,
    }))
}

/// POST /api/v1/assessments/:id/report
///
/// Finalize: generates the summary and the PDF artifact. Retryable — a
/// renderer failure loses no session data, and repeated calls produce fresh
/// artifacts.
pub async fn handle_finalize(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinalizeResponse>, AppError> {
    let finalized = state.orchestrator.finalize(id).await?;
    Ok(Json(FinalizeResponse {
        report_url: format!("/api/v1/reports/{}", finalized.report.id),
        report_id: finalized.report.id,
        summary: finalized.report.summary_text,
    }))
}

/// GET /api/v1/reports/:id
///
/// Streams a generated report PDF from S3 as an attachment.
pub async fn handle_download_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<([(header::HeaderName, String); 2], Bytes), AppError> {
    let report: Option<ReportRow> = sqlx::query_as("SELECT * FROM reports WHERE id = $1")
        .bind(report_id)
        .fetch_optional(&state.db)
        .await?;
    let report =
        report.ok_or_else(|| AppError::NotFound(format!("Report {report_id} not found")))?;

    let object = state
        .s3
        .get_object()
        .bucket(&state.config.s3_bucket)
        .key(&report.s3_key)
        .send()
        .await
        .map_err(|e| AppError::S3(e.to_string()))?;
    let data = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::S3(e.to_string()))?
        .into_bytes();

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"assessment_report_{}.pdf\"",
                    report.session_id
                ),
            ),
        ],
        data,
    ))
}
