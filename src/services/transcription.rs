use std::path::Path;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};

use crate::app_config::TranscriptionConfig;
use crate::errors::ServiceError;
use crate::language_utils;
use crate::services::client::ApiClient;
use crate::services::Transcriber;
use crate::transcript::Transcript;

/// Speech-to-text over `POST /audio/transcriptions` (Whisper verbose JSON)
#[derive(Debug, Clone)]
pub struct HttpTranscriber {
    api: ApiClient,
}

impl HttpTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            api: ApiClient::new(&config.connection)?,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Transcript, ServiceError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());
        debug!("Uploading {} ({} bytes) for transcription", file_name, bytes.len());

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("model", self.api.model().to_string())
            .text("response_format", "verbose_json");
        if let Ok(hint) = language_utils::language_hint(language) {
            form = form.text("language", hint);
        }

        let request = self.api.post("audio/transcriptions")?.multipart(form);
        let response = self.api.send(request, "Transcription").await?;
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::ParseError(e.to_string()))?;

        parse_transcription(&body)
    }
}

/// Decode a verbose JSON transcription body
pub fn parse_transcription(body: &str) -> Result<Transcript, ServiceError> {
    let transcript: Transcript = serde_json::from_str(body)
        .map_err(|e| ServiceError::ParseError(format!("Invalid transcription response: {}", e)))?;
    if transcript.segments.is_empty() {
        return Err(ServiceError::EmptyResponse("transcription".to_string()));
    }
    Ok(transcript)
}
