/*!
 * Service handles for the external speech and language collaborators.
 *
 * The controller never reaches for a global model instance: it receives
 * one handle per collaborator and calls it through these traits.
 * - `transcription`: speech-to-text
 * - `translation`: machine translation
 * - `synthesis`: text-to-speech
 *
 * The bundled implementations talk to an OpenAI-compatible HTTP API.
 */

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::app_config::ServicesConfig;
use crate::errors::ServiceError;
use crate::transcript::Transcript;

pub mod client;
pub mod transcription;
pub mod translation;
pub mod synthesis;

/// Speech-to-text collaborator
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into timed segments
    ///
    /// # Arguments
    /// * `audio` - Audio extracted from the input video
    /// * `language` - Language hint for the recognizer
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Transcript, ServiceError>;
}

/// Machine translation collaborator
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a whole transcript into the target language
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String, ServiceError>;
}

/// Text-to-speech collaborator
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speak `text` and write the audio to `output`
    async fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<(), ServiceError>;
}

/// The three collaborators a dubbing job needs
#[derive(Clone)]
pub struct ServiceHandles {
    pub transcriber: Arc<dyn Transcriber>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl ServiceHandles {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self { transcriber, translator, synthesizer }
    }

    /// HTTP clients for every service in the configuration
    pub fn from_config(config: &ServicesConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            transcriber: Arc::new(transcription::HttpTranscriber::new(&config.transcription)?),
            translator: Arc::new(translation::HttpTranslator::new(&config.translation)?),
            synthesizer: Arc::new(synthesis::HttpSynthesizer::new(&config.synthesis)?),
        })
    }
}
