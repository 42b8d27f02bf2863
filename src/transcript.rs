use std::path::Path;
use anyhow::{Result, Context, anyhow};
use serde::{Deserialize, Serialize};

use crate::subtitle_processor::SubtitleCollection;
use crate::timing::Segment;

// @module: Source-language transcript as produced by speech recognition

// @struct: One recognized utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Recognized text
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self { start, end, text: text.into() }
    }
}

/// Full transcript: running text plus its timed segments
///
/// Deserializes directly from Whisper's verbose JSON output, which carries
/// many more per-segment fields that are ignored here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, segments: Vec<TranscriptSegment>) -> Self {
        Self {
            text: text.into(),
            language: None,
            segments,
        }
    }

    /// Build a transcript from segments alone, joining their text
    pub fn from_segments(segments: Vec<TranscriptSegment>) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self::new(text, segments)
    }

    /// Timing segments with whitespace word counts
    pub fn to_segments(&self) -> Vec<Segment> {
        self.segments
            .iter()
            .map(|s| Segment::from_text(s.start, s.end, &s.text))
            .collect()
    }

    /// Text to translate; falls back to the joined segments when the
    /// recognizer returned no running text
    pub fn full_text(&self) -> String {
        if self.text.trim().is_empty() {
            Self::from_segments(self.segments.clone()).text
        } else {
            self.text.trim().to_string()
        }
    }

    pub fn word_count(&self) -> usize {
        self.segments.iter().map(|s| s.text.split_whitespace().count()).sum()
    }

    /// Parse Whisper verbose JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        let transcript: Transcript = serde_json::from_str(content)
            .context("Failed to parse transcript JSON")?;
        if transcript.segments.is_empty() {
            return Err(anyhow!("Transcript contains no segments"));
        }
        Ok(transcript)
    }

    /// Load a transcript from a `.json` (Whisper) or `.srt` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "json" => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
                Self::from_json_str(&content)
                    .with_context(|| format!("Invalid transcript file: {}", path.display()))
            }
            "srt" => {
                let collection = SubtitleCollection::read_srt(path, "auto")?;
                let segments = collection
                    .entries
                    .into_iter()
                    .map(|e| TranscriptSegment::new(e.start, e.end, e.content.replace('\n', " ")))
                    .collect();
                Ok(Self::from_segments(segments))
            }
            _ => Err(anyhow!("Unsupported transcript format: {}", path.display())),
        }
    }

    /// Persist as JSON next to the job artifacts
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize transcript")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write transcript: {}", path.as_ref().display()))
    }
}
