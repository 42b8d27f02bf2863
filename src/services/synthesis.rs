use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use serde::Serialize;

use crate::app_config::SynthesisConfig;
use crate::errors::ServiceError;
use crate::services::client::ApiClient;
use crate::services::Synthesizer;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// Text handed to the voice: commas make synthesized speech pause too long
pub fn prepare_speech_text(text: &str) -> String {
    text.replace(',', "")
}

/// Text-to-speech over `POST /audio/speech`
#[derive(Debug, Clone)]
pub struct HttpSynthesizer {
    api: ApiClient,
    voice: String,
    speed: f32,
}

impl HttpSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            api: ApiClient::new(&config.connection)?,
            voice: config.voice.clone(),
            speed: config.speed,
        })
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<(), ServiceError> {
        let input = prepare_speech_text(text);
        let format = output
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "mp3".to_string());
        debug!("Synthesizing {} characters of {} speech as {}", input.len(), language, format);

        let request = SpeechRequest {
            model: self.api.model(),
            input: &input,
            voice: &self.voice,
            speed: self.speed,
            response_format: &format,
        };

        let builder = self.api.post("audio/speech")?.json(&request);
        let response = self.api.send(builder, "Synthesis").await?;
        let audio: Bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::ParseError(format!("Failed to read synthesized audio: {}", e)))?;

        if audio.is_empty() {
            return Err(ServiceError::EmptyResponse("synthesis".to_string()));
        }

        tokio::fs::write(output, &audio).await?;
        Ok(())
    }
}
