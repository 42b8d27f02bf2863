use anyhow::{Result, Context};
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @const: Container formats accepted as dubbing input
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v",
    "mpg", "mpeg", "ogv", "ts", "mts", "m2ts",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: `<base>_<YYYYmmddHHMMSS><extension>`
    pub fn timestamped_name(base_name: &str, extension: &str, at: DateTime<Local>) -> String {
        format!("{}_{}{}", base_name, at.format("%Y%m%d%H%M%S"), extension)
    }

    // @generates: Output path for the dubbed video of `input_file`
    // The input's own container is ignored: the muxed codecs decide what can hold them
    pub fn dubbed_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
        container: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default().to_string_lossy();
        let extension = container.trim_start_matches('.');

        output_dir
            .as_ref()
            .join(format!("{}.{}.dubbed.{}", stem, target_language, extension))
    }

    // @generates: Subtitle path placed next to the dubbed video
    pub fn subtitle_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default().to_string_lossy();
        output_dir.as_ref().join(format!("{}.{}.srt", stem, target_language))
    }

    /// Sidecar transcript for a video (`movie.mp4` -> `movie.json` or `movie.srt`)
    pub fn find_sidecar_transcript<P: AsRef<Path>>(video: P) -> Option<PathBuf> {
        let video = video.as_ref();
        ["json", "srt"]
            .iter()
            .map(|ext| video.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }

    /// Find video files below a directory, sorted for a stable processing order
    pub fn find_video_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && Self::detect_file_type(path) == FileType::Video {
                if Self::is_dubbed_output(path) {
                    continue;
                }
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    fn is_dubbed_output(path: &Path) -> bool {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().ends_with(".dubbed"))
            .unwrap_or(false)
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Classify a path by its extension
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> FileType {
        let ext = match path.as_ref().extension() {
            Some(ext) => ext.to_string_lossy().to_lowercase(),
            None => return FileType::Unknown,
        };

        if ext == "srt" {
            FileType::Subtitle
        } else if ext == "json" {
            FileType::Transcript
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Video
        } else {
            FileType::Unknown
        }
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// Subtitle file (SRT)
    Subtitle,
    /// Transcript in Whisper JSON format
    Transcript,
    /// Video file supported by ffmpeg
    Video,
    /// Unknown file type
    Unknown,
}
