//! Axum route handlers for audio synthesis, serving, and transcription.
//!
//! Audio artifacts live in S3 under `audio/{session_id}/…` with one
//! `audio_files` row each, mirroring how report artifacts are stored.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::AudioFileRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub session_id: Uuid,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    pub audio_id: Uuid,
    pub audio_url: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub audio_id: Uuid,
    pub transcript: String,
}

/// POST /api/v1/audio/synthesize
///
/// Converts question text to speech, stores the MP3, and returns a serving URL.
pub async fn handle_synthesize(
    State(state): State<AppState>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Json<SynthesizeResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("No text provided".to_string()));
    }
    // The session must exist before we store audio against it.
    state.orchestrator.session(request.session_id).await?;

    let audio = state
        .voice
        .synthesize(&request.text)
        .await
        .map_err(|e| AppError::Voice(e.to_string()))?;

    let row = store_audio(&state, request.session_id, "question", audio, None).await?;
    Ok(Json(SynthesizeResponse {
        audio_url: format!("/api/v1/audio/{}", row.id),
        audio_id: row.id,
    }))
}

/// GET /api/v1/audio/:id
///
/// Serves a stored audio file.
pub async fn handle_serve_audio(
    State(state): State<AppState>,
    Path(audio_id): Path<Uuid>,
) -> Result<([(header::HeaderName, String); 1], Bytes), AppError> {
    let row: Option<AudioFileRow> = sqlx::query_as("SELECT * FROM audio_files WHERE id = $1")
        .bind(audio_id)
        .fetch_optional(&state.db)
        .await?;
    let row = row.ok_or_else(|| AppError::NotFound(format!("Audio {audio_id} not found")))?;

    let object = state
        .s3
        .get_object()
        .bucket(&state.config.s3_bucket)
        .key(&row.s3_key)
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
        [(header::CONTENT_TYPE, "audio/mpeg".to_string())],
        data,
    ))
}

/// POST /api/v1/audio/transcribe
///
/// Multipart answer recording (`audio` file field, `session_id` text field).
/// Stores the recording and returns its transcript.
pub async fn handle_transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, AppError> {
    let mut session_id: Option<Uuid> = None;
    let mut audio: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("session_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {e}")))?;
                session_id = Some(text.parse().map_err(|_| {
                    AppError::Validation("session_id must be a valid UUID".to_string())
                })?);
            }
            Some("audio") => {
                let filename = field
                    .file_name()
                    .unwrap_or("recording.webm")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
                audio = Some((filename, data));
            }
            _ => {}
        }
    }

    let session_id = session_id
        .ok_or_else(|| AppError::Validation("Multipart field 'session_id' is required".to_string()))?;
    let (filename, data) = audio
        .ok_or_else(|| AppError::Validation("Multipart field 'audio' is required".to_string()))?;
    state.orchestrator.session(session_id).await?;

    let transcript = state
        .voice
        .transcribe(data.clone(), &filename)
        .await
        .map_err(|e| AppError::Voice(e.to_string()))?;

    let row = store_audio(&state, session_id, "answer", data, Some(&transcript)).await?;
    Ok(Json(TranscribeResponse {
        audio_id: row.id,
        transcript,
    }))
}

/// Uploads audio bytes to S3 and records the `audio_files` row.
async fn store_audio(
    state: &AppState,
    session_id: Uuid,
    kind: &str,
    data: Bytes,
    transcription: Option<&str>,
) -> Result<AudioFileRow, AppError> {
    let id = Uuid::new_v4();
    let s3_key = format!("audio/{session_id}/{kind}_{id}.mp3");

    state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(&s3_key)
        .body(aws_sdk_s3::primitives::ByteStream::from(data.to_vec()))
        .content_type("audio/mpeg")
        .send()
        .await
        .map_err(|e| AppError::S3(e.to_string()))?;

    let row = AudioFileRow {
        id,
        session_id,
        s3_key,
        transcription: transcription.map(str::to_string),
        created_at: Utc::now(),
    };
    sqlx::query(
        r#"
        INSERT INTO audio_files (id, session_id, s3_key, transcription, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(row.id)
    .bind(row.session_id)
    .bind(&row.s3_key)
    .bind(&row.transcription)
    .bind(row.created_at)
    .execute(&state.db)
    .await?;

    Ok(row)
}
