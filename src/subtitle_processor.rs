use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};

// @module: SRT subtitle model, persistence and parsing

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("static timestamp pattern is valid")
});

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: 1-based position in the track
    pub index: usize,

    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Displayed text, may be empty
    pub content: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(index: usize, start: f64, end: f64, content: impl Into<String>) -> Self {
        SubtitleEntry {
            index,
            start,
            end,
            content: content.into(),
        }
    }

    /// Whether the cue carries no visible text
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Parse an SRT timestamp (`HH:MM:SS,mmm`) to seconds
    pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        let total_ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis;
        Ok(total_ms as f64 / 1000.0)
    }

    /// Format a time in seconds as an SRT timestamp (HH:MM:SS,mmm)
    ///
    /// Rounds to the nearest millisecond. Negative and non-finite values
    /// are written as zero.
    pub fn format_timestamp(seconds: f64) -> String {
        let ms = if seconds.is_finite() && seconds > 0.0 {
            (seconds * 1000.0).round() as u64
        } else {
            0
        };
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let secs = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }

    /// Start time as an SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start)
    }

    /// End time as an SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.content)?;
        writeln!(f)
    }
}

/// Ordered subtitle track with the language it is written in
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// File the track came from or will be written to
    pub source_file: PathBuf,

    /// Subtitle entries in display order
    pub entries: Vec<SubtitleEntry>,

    /// Language of the subtitle text
    pub language: String,
}

impl SubtitleCollection {
    /// Create a collection from already computed entries
    pub fn from_entries(source_file: PathBuf, language: impl Into<String>, entries: Vec<SubtitleEntry>) -> Self {
        SubtitleCollection {
            source_file,
            entries,
            language: language.into(),
        }
    }

    /// Load and parse an SRT file
    pub fn read_srt<P: AsRef<Path>>(path: P, language: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;

        Ok(Self::from_entries(path.to_path_buf(), language, entries))
    }

    /// Render the whole track in SRT format
    pub fn to_srt_string(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
        }
        out
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        // Render first so a failure never leaves a half-written file behind
        let rendered = self.to_srt_string();

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
        file.write_all(rendered.as_bytes())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        debug!("Wrote {} subtitle entries to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Count consecutive pairs whose intervals overlap
    pub fn count_overlaps(&self) -> usize {
        self.entries
            .windows(2)
            .filter(|pair| pair[0].end > pair[1].start)
            .count()
    }

    /// Parse SRT format string into subtitle entries
    ///
    /// Entries without text are skipped, the rest are sorted by start time
    /// and renumbered from 1.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
        let mut entries = Vec::new();

        let mut current_index: Option<usize> = None;
        let mut current_times: Option<(f64, f64)> = None;
        let mut current_text = String::new();

        let mut finish_entry = |index: usize, times: (f64, f64), text: &str| {
            if text.trim().is_empty() {
                debug!("Skipping empty subtitle entry {}", index);
                return;
            }
            if times.1 < times.0 {
                warn!("Skipping subtitle entry {} with end before start", index);
                return;
            }
            entries.push(SubtitleEntry::new(index, times.0, times.1, text.trim()));
        };

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim().trim_start_matches('\u{feff}');

            if trimmed.is_empty() {
                // A blank line after the timestamp closes the cue, even a textless one
                if let (Some(index), Some(times)) = (current_index, current_times) {
                    finish_entry(index, times, &current_text);
                    current_index = None;
                    current_times = None;
                    current_text.clear();
                }
                continue;
            }

            if current_index.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_index = Some(num);
                    continue;
                }
            }

            if current_index.is_some() && current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_times = Some((Self::captured_seconds(&caps, 1), Self::captured_seconds(&caps, 5)));
                    continue;
                }
            }

            if current_index.is_some() && current_times.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_no + 1, trimmed);
            }
        }

        if let (Some(index), Some(times)) = (current_index, current_times) {
            if !current_text.is_empty() {
                finish_entry(index, times, &current_text);
            }
        }

        if entries.is_empty() {
            return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
        }

        entries.sort_by(|a, b| a.start.total_cmp(&b.start));
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.index = i + 1;
        }

        Ok(entries)
    }

    fn captured_seconds(caps: &regex::Captures, start_idx: usize) -> f64 {
        let field = |offset: usize| -> u64 {
            caps.get(start_idx + offset)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        let ms = (field(0) * 3600 + field(1) * 60 + field(2)) * 1000 + field(3);
        ms as f64 / 1000.0
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Language: {}", self.language)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
