/*!
 * Duration reconciliation between a dubbed audio track and its video.
 *
 * The synthesized voice rarely lasts exactly as long as the picture it has
 * to fit. [`reconcile`] turns the two probed durations into a playback tempo
 * multiplier; [`TempoLimits`] decides whether that multiplier can be handed
 * to the audio tempo filter, and [`atempo_filter`] renders it as an ffmpeg
 * filter expression.
 */

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::TempoError;

/// Bias toward faster playback; synthesized speech tends to run long
pub const DEFAULT_TEMPO_BIAS: f64 = 1.2;

/// Range accepted by a single ffmpeg `atempo` stage
pub const ATEMPO_STAGE_MIN: f64 = 0.5;
pub const ATEMPO_STAGE_MAX: f64 = 2.0;

/// Probed durations of the source video and the dubbed audio, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationPair {
    pub video_duration: f64,
    pub audio_duration: f64,
}

impl DurationPair {
    pub fn new(video_duration: f64, audio_duration: f64) -> Self {
        Self { video_duration, audio_duration }
    }
}

/// Playback rate multiplier; above 1 speeds audio up, below 1 slows it down
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TempoFactor(f64);

impl TempoFactor {
    /// Identity tempo
    pub const UNCHANGED: TempoFactor = TempoFactor(1.0);

    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Duration of a track of `duration` seconds once played at this tempo
    pub fn adjusted_duration(self, duration: f64) -> f64 {
        duration / self.0
    }
}

impl fmt::Display for TempoFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Outcome of comparing the two durations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub tempo: TempoFactor,
    /// True when the video duration was unusable and the identity tempo was returned
    pub degenerate: bool,
}

/// `tempo = (audio / video) * bias`.
///
/// A video duration that is not a positive finite number yields the
/// identity tempo with `degenerate` set; the caller decides how loudly to
/// report it. No range clamping happens here.
pub fn reconcile(pair: DurationPair, bias: f64) -> Reconciliation {
    if !pair.video_duration.is_finite() || pair.video_duration <= 0.0 {
        return Reconciliation {
            tempo: TempoFactor::UNCHANGED,
            degenerate: true,
        };
    }

    Reconciliation {
        tempo: TempoFactor((pair.audio_duration / pair.video_duration) * bias),
        degenerate: false,
    }
}

/// What to do with a tempo outside the allowed range
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    /// Pull the tempo back to the nearest bound
    #[default]
    Clamp,
    /// Fail the job
    Reject,
}

/// Operating range of the tempo adjustment step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoLimits {
    pub min: f64,
    pub max: f64,
    pub policy: OutOfRangePolicy,
}

impl Default for TempoLimits {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 4.0,
            policy: OutOfRangePolicy::Clamp,
        }
    }
}

impl TempoLimits {
    pub fn new(min: f64, max: f64, policy: OutOfRangePolicy) -> Self {
        Self { min, max, policy }
    }

    /// Check a tempo before it is handed to the filter.
    ///
    /// Non-positive and non-finite tempos are always rejected.
    pub fn apply(&self, tempo: TempoFactor) -> Result<TempoFactor, TempoError> {
        let value = tempo.value();
        if !value.is_finite() || value <= 0.0 {
            return Err(TempoError::Invalid(value));
        }
        if value >= self.min && value <= self.max {
            return Ok(tempo);
        }

        match self.policy {
            OutOfRangePolicy::Reject => Err(TempoError::OutOfRange {
                tempo: value,
                min: self.min,
                max: self.max,
            }),
            OutOfRangePolicy::Clamp => {
                let clamped = value.clamp(self.min, self.max);
                warn!("Tempo {:.3} outside [{:.2}, {:.2}], clamped to {:.3}", value, self.min, self.max, clamped);
                Ok(TempoFactor(clamped))
            }
        }
    }
}

/// Render a tempo as an ffmpeg audio filter.
///
/// Ratios beyond one stage's range are split into a chain of `atempo`
/// stages whose product equals the requested tempo.
pub fn atempo_filter(tempo: TempoFactor) -> Result<String, TempoError> {
    let mut remaining = tempo.value();
    if !remaining.is_finite() || remaining <= 0.0 {
        return Err(TempoError::Invalid(remaining));
    }

    let mut stages = Vec::new();
    while remaining > ATEMPO_STAGE_MAX {
        stages.push(ATEMPO_STAGE_MAX);
        remaining /= ATEMPO_STAGE_MAX;
    }
    while remaining < ATEMPO_STAGE_MIN {
        stages.push(ATEMPO_STAGE_MIN);
        remaining /= ATEMPO_STAGE_MIN;
    }
    stages.push(remaining);

    Ok(stages
        .iter()
        .map(|stage| format!("atempo={}", format_stage(*stage)))
        .collect::<Vec<_>>()
        .join(","))
}

fn format_stage(stage: f64) -> String {
    let text = format!("{:.6}", stage);
    let text = text.trim_end_matches('0');
    if text.ends_with('.') {
        format!("{}0", text)
    } else {
        text.to_string()
    }
}
