//! Voice I/O adapters — text-to-speech and speech-to-text.
//!
//! Thin glue around the ElevenLabs API. Not part of the orchestration
//! contract: the surrounding application calls these independently, and the
//! orchestrator only ever sees transcribed answers as opaque strings.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

pub mod handlers;

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";
const TTS_MODEL: &str = "eleven_turbo_v2_5";
const STT_MODEL: &str = "scribe_v1";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Synthesizes speech for a question text; returns MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Bytes, VoiceError>;

    /// Transcribes recorded speech to text.
    async fn transcribe(&self, audio: Bytes, filename: &str) -> Result<String, VoiceError>;
}

#[derive(Clone)]
pub struct ElevenLabsVoice {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
}

impl ElevenLabsVoice {
    pub fn new(api_key: String, voice_id: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            voice_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl VoiceGateway for ElevenLabsVoice {
    async fn synthesize(&self, text: &str) -> Result<Bytes, VoiceError> {
        let url = format!("{ELEVENLABS_API_URL}/text-to-speech/{}", self.voice_id);
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&serde_json::json!({
                "text": text,
                "model_id": TTS_MODEL,
                "voice_settings": { "stability": 0.5, "similarity_boost": 0.5 }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.bytes().await?)
    }

    async fn transcribe(&self, audio: Bytes, filename: &str) -> Result<String, VoiceError> {
        let url = format!("{ELEVENLABS_API_URL}/speech-to-text");
        let form = reqwest::multipart::Form::new()
            .text("model_id", STT_MODEL)
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name(filename.to_string()),
            );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let transcription: TranscriptionResponse = response.json().await?;
        Ok(transcription.text)
    }
}
