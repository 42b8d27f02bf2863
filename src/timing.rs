/*!
 * Word allocation and subtitle timing.
 *
 * Maps a flat stream of translated words back onto the time segments of the
 * original utterance. Segment `i` receives exactly `word_count_i` words from
 * the stream, in order; once the stream runs dry the remaining segments get
 * empty cues. Word order and count rarely line up between languages, so the
 * allocation is an approximation of the proportional translation.
 *
 * Cue timings come from a [`TimingPolicy`]:
 * - `Naive` reuses each segment's original interval
 * - `Paced` recomputes each end time from a global words-per-second rate
 *   and clamps it to the next segment's start so cues never overlap
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::TimingError;
use crate::subtitle_processor::SubtitleEntry;

/// Rate used when the segments span no time at all
pub const FALLBACK_WORDS_PER_SECOND: f64 = 1.0;

/// One contiguous span of original speech
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Number of whitespace separated words spoken in the span
    pub word_count: usize,
}

impl Segment {
    pub fn new(start: f64, end: f64, word_count: usize) -> Self {
        Self { start, end, word_count }
    }

    /// Build a segment from the source text spoken in it
    pub fn from_text(start: f64, end: f64, text: &str) -> Self {
        Self::new(start, end, text.split_whitespace().count())
    }
}

/// Reject segment sequences the timer cannot work with.
///
/// Times must be finite and non-negative, every segment must satisfy
/// `start <= end`, and starts must be non-decreasing.
pub fn validate_segments(segments: &[Segment]) -> Result<(), TimingError> {
    let mut previous_start: Option<f64> = None;

    for (position, segment) in segments.iter().enumerate() {
        if !segment.start.is_finite() || !segment.end.is_finite() {
            return Err(TimingError::MalformedInput {
                position,
                reason: format!("non-finite time ({} -> {})", segment.start, segment.end),
            });
        }
        if segment.start < 0.0 {
            return Err(TimingError::MalformedInput {
                position,
                reason: format!("negative start time {}", segment.start),
            });
        }
        if segment.start > segment.end {
            return Err(TimingError::MalformedInput {
                position,
                reason: format!("start {} is after end {}", segment.start, segment.end),
            });
        }
        if let Some(prev) = previous_start {
            if segment.start < prev {
                return Err(TimingError::MalformedInput {
                    position,
                    reason: format!("start {} precedes previous start {}", segment.start, prev),
                });
            }
        }
        previous_start = Some(segment.start);
    }

    Ok(())
}

/// Translated transcript consumed left to right, each word exactly once
#[derive(Debug, Clone)]
pub struct WordStream<'a> {
    words: Vec<&'a str>,
    cursor: usize,
}

impl<'a> WordStream<'a> {
    /// Tokenize on any whitespace
    pub fn new(text: &'a str) -> Self {
        Self {
            words: text.split_whitespace().collect(),
            cursor: 0,
        }
    }

    /// Take the next `count` words joined by single spaces.
    ///
    /// Returns fewer words, or an empty string, once the stream is exhausted.
    pub fn take(&mut self, count: usize) -> String {
        let end = self.cursor.saturating_add(count).min(self.words.len());
        let taken = self.words[self.cursor..end].join(" ");
        self.cursor = end;
        taken
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.words.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.words.len()
    }
}

/// How cue intervals are derived from segments
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimingPolicy {
    /// Reuse each segment's original start and end
    Naive,
    /// Derive each end from the global speaking rate
    #[default]
    Paced,
}

impl std::fmt::Display for TimingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Naive => write!(f, "naive"),
            Self::Paced => write!(f, "paced"),
        }
    }
}

impl std::str::FromStr for TimingPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "naive" => Ok(Self::Naive),
            "paced" => Ok(Self::Paced),
            _ => Err(anyhow::anyhow!("Invalid timing policy: {}", s)),
        }
    }
}

/// Global speaking rate over a segment sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechRate {
    pub words_per_second: f64,
    /// True when the fallback rate was used
    pub degenerate: bool,
}

impl SpeechRate {
    /// `total_words / (last.end - first.start)`, or the fallback rate when
    /// that span is not positive or no words were spoken.
    pub fn measure(segments: &[Segment]) -> Self {
        let (first, last) = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Self::fallback(),
        };

        let total_duration = last.end - first.start;
        let total_words: usize = segments.iter().map(|s| s.word_count).sum();

        if total_duration <= 0.0 || total_words == 0 {
            return Self::fallback();
        }

        Self {
            words_per_second: total_words as f64 / total_duration,
            degenerate: false,
        }
    }

    fn fallback() -> Self {
        Self {
            words_per_second: FALLBACK_WORDS_PER_SECOND,
            degenerate: true,
        }
    }
}

/// Subtitle cues plus what happened while building them
#[derive(Debug, Clone)]
pub struct TimedSubtitles {
    pub entries: Vec<SubtitleEntry>,
    pub policy: TimingPolicy,
    /// Rate used by the paced policy, `None` for naive timing
    pub rate: Option<SpeechRate>,
    /// Words taken from the translated stream
    pub words_consumed: usize,
    /// Words left over after the last segment
    pub words_unused: usize,
    /// Segments that wanted words but found the stream exhausted
    pub starved_segments: usize,
}

impl TimedSubtitles {
    /// True when the paced rate fell back because the input spans no time
    pub fn has_degenerate_rate(&self) -> bool {
        self.rate.is_some_and(|r| r.degenerate)
    }
}

/// Builds one subtitle cue per segment under a timing policy
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtitleTimer {
    policy: TimingPolicy,
}

impl SubtitleTimer {
    pub fn new(policy: TimingPolicy) -> Self {
        Self { policy }
    }

    /// Allocate the translated words over `segments` and time the cues.
    ///
    /// The segments are validated first; nothing is produced for malformed
    /// input. Output has the same length and order as `segments`, indexed
    /// from 1.
    pub fn build(&self, segments: &[Segment], translated_text: &str) -> Result<TimedSubtitles, TimingError> {
        validate_segments(segments)?;

        let rate = match self.policy {
            TimingPolicy::Naive => None,
            TimingPolicy::Paced => Some(SpeechRate::measure(segments)),
        };

        let mut stream = WordStream::new(translated_text);
        let mut entries = Vec::with_capacity(segments.len());
        let mut starved_segments = 0;

        for (i, segment) in segments.iter().enumerate() {
            if segment.word_count > 0 && stream.is_exhausted() {
                starved_segments += 1;
            }
            let content = stream.take(segment.word_count);

            let end = match rate {
                None => segment.end,
                Some(rate) => Self::paced_end(segment, segments.get(i + 1), rate.words_per_second),
            };

            entries.push(SubtitleEntry::new(i + 1, segment.start, end, content));
        }

        if starved_segments > 0 {
            debug!(
                "Translated text ran out: {} of {} segments left without words",
                starved_segments,
                segments.len()
            );
        }
        if rate.is_some_and(|r| r.degenerate) && !segments.is_empty() {
            debug!("Segments span no time, pacing at {} word/s", FALLBACK_WORDS_PER_SECOND);
        }

        let words_consumed = stream.consumed();
        let words_unused = stream.remaining();
        if words_unused > 0 {
            debug!("{} translated words were not allocated to any segment", words_unused);
        }

        Ok(TimedSubtitles {
            entries,
            policy: self.policy,
            rate,
            words_consumed,
            words_unused,
            starved_segments,
        })
    }

    // Validated input has non-decreasing starts, so clamping to the next
    // start can never pull the end before this segment's own start.
    fn paced_end(segment: &Segment, next: Option<&Segment>, words_per_second: f64) -> f64 {
        let paced = segment.start + segment.word_count as f64 / words_per_second;
        match next {
            Some(next) if paced > next.start => next.start,
            _ => paced,
        }
    }
}
