use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::tempo::{OutOfRangePolicy, TempoLimits, DEFAULT_TEMPO_BIAS};
use crate::timing::TimingPolicy;

/// Application configuration module
/// This module handles loading, validating and saving the dubbing settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language spoken in the input video (ISO)
    pub source_language: String,

    /// Language of the dubbed output (ISO)
    pub target_language: String,

    /// Subtitle timing settings
    #[serde(default)]
    pub timing: TimingConfig,

    /// Audio tempo reconciliation settings
    #[serde(default)]
    pub tempo: TempoConfig,

    /// ffmpeg/ffprobe settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Remote speech and translation services
    #[serde(default)]
    pub services: ServicesConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Subtitle timing configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TimingConfig {
    /// Naive reuses the transcript timing, paced recomputes it from the speaking rate
    #[serde(default)]
    pub policy: TimingPolicy,
}

/// Tempo reconciliation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TempoConfig {
    /// Multiplier applied on top of the audio/video duration ratio
    #[serde(default = "default_tempo_bias")]
    pub bias: f64,

    /// Slowest tempo handed to the audio filter
    #[serde(default = "default_min_tempo")]
    pub min_tempo: f64,

    /// Fastest tempo handed to the audio filter
    #[serde(default = "default_max_tempo")]
    pub max_tempo: f64,

    /// Clamp or reject tempos outside [min_tempo, max_tempo]
    #[serde(default)]
    pub out_of_range: OutOfRangePolicy,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            bias: default_tempo_bias(),
            min_tempo: default_min_tempo(),
            max_tempo: default_max_tempo(),
            out_of_range: OutOfRangePolicy::default(),
        }
    }
}

impl TempoConfig {
    pub fn limits(&self) -> TempoLimits {
        TempoLimits::new(self.min_tempo, self.max_tempo, self.out_of_range)
    }
}

/// Media tooling configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaConfig {
    /// ffmpeg binary
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// ffprobe binary
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Timeout for a single tool invocation in seconds
    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,

    /// `force_style` passed to the subtitles filter
    #[serde(default = "default_subtitle_style")]
    pub subtitle_style: String,

    /// Output video codec
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Output audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Container extension of the dubbed video, must hold the configured codecs
    #[serde(default = "default_output_container")]
    pub output_container: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_media_timeout_secs(),
            subtitle_style: default_subtitle_style(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            output_container: default_output_container(),
        }
    }
}

/// Connection settings shared by every remote service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "String::new")]
    pub model: String,

    /// API key, empty for local servers
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

impl EndpointConfig {
    fn with_model(model: &str) -> Self {
        Self {
            endpoint: default_endpoint(),
            model: model.to_string(),
            api_key: String::new(),
            timeout_secs: default_service_timeout_secs(),
        }
    }
}

/// Speech-to-text service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    #[serde(flatten)]
    pub connection: EndpointConfig,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            connection: EndpointConfig::with_model(&default_transcription_model()),
        }
    }
}

/// Machine translation service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(flatten)]
    pub connection: EndpointConfig,

    /// Maximum words sent in one translation request
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Maximum concurrent translation requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// System prompt template
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            connection: EndpointConfig::with_model(&default_translation_model()),
            chunk_words: default_chunk_words(),
            concurrent_requests: default_concurrent_requests(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
        }
    }
}

/// Text-to-speech service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(flatten)]
    pub connection: EndpointConfig,

    /// Voice identifier
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speaking speed requested from the service
    #[serde(default = "default_speech_speed")]
    pub speed: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            connection: EndpointConfig::with_model(&default_synthesis_model()),
            voice: default_voice(),
            speed: default_speech_speed(),
        }
    }
}

/// All remote collaborators
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ServicesConfig {
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

impl ServicesConfig {
    /// Use one API key for every service that has none configured
    pub fn apply_api_key(&mut self, api_key: &str) {
        for connection in [
            &mut self.transcription.connection,
            &mut self.translation.connection,
            &mut self.synthesis.connection,
        ] {
            if connection.api_key.is_empty() {
                connection.api_key = api_key.to_string();
            }
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_tempo_bias() -> f64 {
    DEFAULT_TEMPO_BIAS
}

fn default_min_tempo() -> f64 {
    0.5
}

fn default_max_tempo() -> f64 {
    4.0
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_media_timeout_secs() -> u64 {
    1800 // encoding a full-length video can take a while
}

fn default_subtitle_style() -> String {
    "FontSize=24,PrimaryColour=&H00FFFF&".to_string()
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_output_container() -> String {
    "mp4".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_service_timeout_secs() -> u64 {
    300
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_translation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_synthesis_model() -> String {
    "tts-1".to_string()
}

fn default_chunk_words() -> usize {
    500
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_system_prompt() -> String {
    "You are a professional translator. Translate the following transcript from {source_language} to {target_language}. Return only the translation, without notes or quotes.".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_speech_speed() -> f32 {
    1.0
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::get_language_name(&self.source_language)
            .context("Invalid source language")?;
        crate::language_utils::get_language_name(&self.target_language)
            .context("Invalid target language")?;

        let tempo = &self.tempo;
        if !tempo.bias.is_finite() || tempo.bias <= 0.0 {
            return Err(anyhow!("Tempo bias must be a positive number, got {}", tempo.bias));
        }
        if !(tempo.min_tempo > 0.0 && tempo.min_tempo <= tempo.max_tempo && tempo.max_tempo.is_finite()) {
            return Err(anyhow!(
                "Tempo range must satisfy 0 < min_tempo <= max_tempo, got [{}, {}]",
                tempo.min_tempo, tempo.max_tempo
            ));
        }

        if self.media.timeout_secs == 0 {
            return Err(anyhow!("Media timeout must be at least one second"));
        }
        let container = self.media.output_container.trim_start_matches('.');
        if container.is_empty() || container.contains(['/', '\\']) {
            return Err(anyhow!("Invalid output container: {:?}", self.media.output_container));
        }

        for (service, connection) in [
            ("transcription", &self.services.transcription.connection),
            ("translation", &self.services.translation.connection),
            ("synthesis", &self.services.synthesis.connection),
        ] {
            if connection.model.trim().is_empty() {
                return Err(anyhow!("No model configured for the {} service", service));
            }
        }

        let translation = &self.services.translation;
        if translation.chunk_words == 0 {
            return Err(anyhow!("Translation chunk size must be at least one word"));
        }
        if translation.concurrent_requests == 0 {
            return Err(anyhow!("Translation concurrency must be at least 1"));
        }

        Ok(())
    }

    /// Whether the job needs translation and a synthesized voice at all
    pub fn needs_dubbing(&self) -> bool {
        !crate::language_utils::language_codes_match(&self.source_language, &self.target_language)
    }

    /// Load a configuration file, writing the defaults there first if it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            return serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()));
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
            }
        }
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// `conf.json` in the working directory if present, else the user config dir
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("conf.json");
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("dubsync").join("conf.json"))
            .unwrap_or(local)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "ru".to_string(),
            target_language: "en".to_string(),
            timing: TimingConfig::default(),
            tempo: TempoConfig::default(),
            media: MediaConfig::default(),
            services: ServicesConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
