/*!
 * ffmpeg/ffprobe invocations.
 *
 * Every call is a child process raced against the configured timeout.
 * Failures are returned as [`MediaError`] and abort the job; nothing here
 * substitutes default values for a failed probe.
 */

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use log::{debug, error};
use tokio::process::Command;

use crate::app_config::MediaConfig;
use crate::errors::MediaError;
use crate::tempo::{atempo_filter, TempoFactor};

/// Handle on the external media tools
#[derive(Debug, Clone)]
pub struct MediaTools {
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
    subtitle_style: String,
    video_codec: String,
    audio_codec: String,
}

impl MediaTools {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            subtitle_style: config.subtitle_style.clone(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }

    /// Container duration in seconds as reported by ffprobe
    pub async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        ensure_exists(path)?;

        let args = vec![
            "-v".to_string(), "error".to_string(),
            "-show_entries".to_string(), "format=duration".to_string(),
            "-of".to_string(), "default=noprint_wrappers=1:nokey=1".to_string(),
            path.to_string_lossy().to_string(),
        ];
        let output = self.run(&self.ffprobe, &args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        parse_duration(&stdout).ok_or_else(|| MediaError::UnexpectedOutput {
            tool: self.ffprobe.clone(),
            output: stdout.trim().to_string(),
        })
    }

    /// Extract the audio stream of a video at best VBR quality
    pub async fn extract_audio(&self, video: &Path, output: &Path) -> Result<(), MediaError> {
        ensure_exists(video)?;

        let args = vec![
            "-y".to_string(),
            "-i".to_string(), video.to_string_lossy().to_string(),
            "-q:a".to_string(), "0".to_string(),
            "-map".to_string(), "a".to_string(),
            output.to_string_lossy().to_string(),
        ];
        self.run(&self.ffmpeg, &args).await?;
        Ok(())
    }

    /// Re-time an audio file by `tempo` without changing its pitch
    pub async fn adjust_tempo(&self, audio: &Path, tempo: TempoFactor, output: &Path) -> Result<(), MediaError> {
        ensure_exists(audio)?;

        let filter = atempo_filter(tempo).map_err(|e| MediaError::UnexpectedOutput {
            tool: self.ffmpeg.clone(),
            output: e.to_string(),
        })?;
        debug!("Adjusting audio tempo with filter {}", filter);

        let args = vec![
            "-y".to_string(),
            "-i".to_string(), audio.to_string_lossy().to_string(),
            "-filter:a".to_string(), filter,
            output.to_string_lossy().to_string(),
        ];
        self.run(&self.ffmpeg, &args).await?;
        Ok(())
    }

    /// Burn subtitles into the video and replace its audio track
    pub async fn mux(&self, video: &Path, audio: &Path, subtitles: &Path, output: &Path) -> Result<(), MediaError> {
        ensure_exists(video)?;
        ensure_exists(audio)?;
        ensure_exists(subtitles)?;

        let args = self.mux_args(video, audio, subtitles, output);
        self.run(&self.ffmpeg, &args).await?;
        Ok(())
    }

    /// Arguments of the final muxing invocation
    pub fn mux_args(&self, video: &Path, audio: &Path, subtitles: &Path, output: &Path) -> Vec<String> {
        let filter = format!(
            "subtitles={}:force_style='{}'",
            escape_filter_path(subtitles),
            self.subtitle_style
        );

        vec![
            "-y".to_string(),
            "-i".to_string(), video.to_string_lossy().to_string(),
            "-i".to_string(), audio.to_string_lossy().to_string(),
            "-vf".to_string(), filter,
            "-c:v".to_string(), self.video_codec.clone(),
            "-c:a".to_string(), self.audio_codec.clone(),
            "-map".to_string(), "0:v:0".to_string(),
            "-map".to_string(), "1:a:0".to_string(),
            "-shortest".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    async fn run(&self, tool: &str, args: &[String]) -> Result<Output, MediaError> {
        debug!("Running {} {}", tool, args.join(" "));

        let future = Command::new(tool).args(args).kill_on_drop(true).output();

        let output = tokio::select! {
            result = future => {
                result.map_err(|e| MediaError::Spawn {
                    tool: tool.to_string(),
                    message: e.to_string(),
                })?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(MediaError::Timeout {
                    tool: tool.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = filter_ffmpeg_stderr(&stderr);
            error!("{} failed: {}", tool, filtered);
            return Err(MediaError::ToolFailed {
                tool: tool.to_string(),
                stderr: filtered,
            });
        }

        Ok(output)
    }
}

fn ensure_exists(path: &Path) -> Result<(), MediaError> {
    if path.exists() {
        Ok(())
    } else {
        Err(MediaError::MissingInput(path.display().to_string()))
    }
}

/// First line of ffprobe output parsed as seconds
pub fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Escape a path for use as a filter option value inside a filtergraph
///
/// ffmpeg unescapes twice: once when splitting the filtergraph and again when
/// parsing the filter's options, so the path is escaped for each level.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let option_level = escape_chars(&raw, &['\\', ':', '\'']);
    escape_chars(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(input: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Keep only meaningful ffmpeg error lines, dropping the version banner,
/// build configuration and stream metadata
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "title",
        "encoder",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
