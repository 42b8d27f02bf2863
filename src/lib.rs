/*!
 * # dubsync - video dubbing with synchronized subtitles
 *
 * A Rust library that dubs a video into another language and keeps the
 * subtitles and the new voice in step with the picture.
 *
 * ## Features
 *
 * - Allocate a translated transcript across the original speech segments
 * - Time subtitle cues naively or from the measured speaking rate, never overlapping
 * - Reconcile the synthesized voice's duration with the video through an audio tempo factor
 * - Drive ffmpeg/ffprobe for extraction, tempo adjustment and muxing
 * - Pluggable transcription, translation and synthesis services
 *
 * ## Architecture
 *
 * - `timing`: word allocation and subtitle timing policies
 * - `tempo`: duration reconciliation and tempo validation
 * - `subtitle_processor`: SRT model, writing and parsing
 * - `transcript`: recognized speech segments
 * - `media`: ffmpeg/ffprobe invocations
 * - `services`: transcription, translation and synthesis handles
 * - `app_controller`: job orchestration
 * - `app_config`: configuration management
 * - `file_utils`: file system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod services;
pub mod subtitle_processor;
pub mod tempo;
pub mod timing;
pub mod transcript;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, JobReport};
pub use errors::{MediaError, ServiceError, TempoError, TimingError};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use tempo::{reconcile, DurationPair, TempoFactor, TempoLimits};
pub use timing::{Segment, SubtitleTimer, TimingPolicy};
pub use transcript::{Transcript, TranscriptSegment};
