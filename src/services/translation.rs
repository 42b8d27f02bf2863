use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::app_config::TranslationConfig;
use crate::errors::ServiceError;
use crate::language_utils;
use crate::services::client::ApiClient;
use crate::services::Translator;

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Split a transcript into chunks of at most `chunk_words` words
pub fn split_into_chunks(text: &str, chunk_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(chunk_words.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Fill `{source_language}` and `{target_language}` with language names
pub fn render_system_prompt(template: &str, source_language: &str, target_language: &str) -> String {
    let source = language_utils::get_language_name(source_language).unwrap_or_else(|_| source_language.to_string());
    let target = language_utils::get_language_name(target_language).unwrap_or_else(|_| target_language.to_string());
    template
        .replace("{source_language}", &source)
        .replace("{target_language}", &target)
}

/// Machine translation over `POST /chat/completions`
///
/// Long transcripts are translated chunk by chunk, several chunks in flight
/// at once, and re-joined in their original order.
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    api: ApiClient,
    chunk_words: usize,
    concurrent_requests: usize,
    system_prompt: String,
    temperature: f32,
}

impl HttpTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            api: ApiClient::new(&config.connection)?,
            chunk_words: config.chunk_words,
            concurrent_requests: config.concurrent_requests.max(1),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
        })
    }

    async fn translate_chunk(&self, chunk: String, system_prompt: &str) -> Result<String, ServiceError> {
        let request = ChatRequest {
            model: self.api.model().to_string(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: system_prompt.to_string() },
                ChatMessage { role: "user".to_string(), content: chunk },
            ],
            temperature: self.temperature,
        };

        let builder = self.api.post("chat/completions")?.json(&request);
        let response = self.api.send(builder, "Translation").await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ParseError(format!("Invalid translation response: {}", e)))?;

        extract_text(&body)
    }
}

/// First choice's text, trimmed; empty output is a failure
pub fn extract_text(response: &ChatResponse) -> Result<String, ServiceError> {
    let text = response
        .choices
        .first()
        .map(|c| c.message.content.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(ServiceError::EmptyResponse("translation".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String, ServiceError> {
        let chunks = split_into_chunks(text, self.chunk_words);
        if chunks.is_empty() {
            return Ok(String::new());
        }
        debug!("Translating {} chunk(s) of up to {} words", chunks.len(), self.chunk_words);

        let system_prompt = render_system_prompt(&self.system_prompt, source_language, target_language);
        let translated: Vec<String> = stream::iter(chunks)
            .map(|chunk| self.translate_chunk(chunk, &system_prompt))
            .buffered(self.concurrent_requests)
            .try_collect()
            .await?;

        Ok(translated.join(" "))
    }
}
