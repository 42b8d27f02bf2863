/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use chrono::{Local, TimeZone};
use std::path::Path;
use dubsync::file_utils::{FileManager, FileType};
use crate::common;

/// Test file existence check
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file_path = common::create_test_file(temp_dir.path(), "test.txt", "content")?;

    assert!(FileManager::file_exists(&file_path));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.txt")));
    // Directories are not files
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}

/// Timestamped artifact names follow `<base>_<YYYYmmddHHMMSS><ext>`
#[test]
fn test_timestamped_name_withFixedTime_shouldFormatSuffix() {
    let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
    assert_eq!(
        FileManager::timestamped_name("translated_audio", ".mp3", at),
        "translated_audio_20240309070501.mp3"
    );
}

/// Output paths carry the target language
#[test]
fn test_output_paths_withValidInputs_shouldCreateCorrectPaths() {
    let input = Path::new("/videos/movie.mkv");
    let out_dir = Path::new("/out");

    assert_eq!(
        FileManager::dubbed_output_path(input, out_dir, "en", "mkv"),
        Path::new("/out/movie.en.dubbed.mkv")
    );
    assert_eq!(
        FileManager::subtitle_output_path(input, out_dir, "en"),
        Path::new("/out/movie.en.srt")
    );
}

/// WebM cannot hold H.264/AAC, so the output uses the configured container
#[test]
fn test_dubbed_output_path_withWebmInput_shouldUseConfiguredContainer() {
    let input = Path::new("/v/clip.webm");

    assert_eq!(
        FileManager::dubbed_output_path(input, "/v", "en", "mp4"),
        Path::new("/v/clip.en.dubbed.mp4")
    );
    assert_eq!(
        FileManager::dubbed_output_path(input, "/v", "en", ".mov"),
        Path::new("/v/clip.en.dubbed.mov")
    );
}

/// Sidecar transcripts prefer JSON over SRT
#[test]
fn test_find_sidecar_transcript_withBothFormats_shouldPreferJson() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_file(temp_dir.path(), "clip.mp4", "")?;

    assert_eq!(FileManager::find_sidecar_transcript(&video), None);

    common::create_test_subtitle(temp_dir.path(), "clip.srt")?;
    assert_eq!(FileManager::find_sidecar_transcript(&video), Some(temp_dir.path().join("clip.srt")));

    common::create_test_file(temp_dir.path(), "clip.json", common::sample_transcript_json())?;
    assert_eq!(FileManager::find_sidecar_transcript(&video), Some(temp_dir.path().join("clip.json")));
    Ok(())
}

/// Directory scans find videos but skip previous dubbed outputs
#[test]
fn test_find_video_files_withMixedFiles_shouldSkipDubbedOutputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("season1");
    FileManager::ensure_dir(&nested)?;

    common::create_test_file(temp_dir.path(), "b.mp4", "")?;
    common::create_test_file(&nested, "a.MKV", "")?;
    common::create_test_file(temp_dir.path(), "b.en.dubbed.mp4", "")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "")?;
    common::create_test_subtitle(temp_dir.path(), "b.srt")?;

    let files = FileManager::find_video_files(temp_dir.path())?;

    assert_eq!(files.len(), 2);
    assert!(files.contains(&temp_dir.path().join("b.mp4")));
    assert!(files.contains(&nested.join("a.MKV")));
    Ok(())
}

/// File classification by extension
#[test]
fn test_detect_file_type_withKnownExtensions_shouldClassify() {
    assert_eq!(FileManager::detect_file_type("a.srt"), FileType::Subtitle);
    assert_eq!(FileManager::detect_file_type("a.json"), FileType::Transcript);
    assert_eq!(FileManager::detect_file_type("a.webm"), FileType::Video);
    assert_eq!(FileManager::detect_file_type("a.doc"), FileType::Unknown);
    assert_eq!(FileManager::detect_file_type("noext"), FileType::Unknown);
}

/// Log lines are appended, not overwritten
#[test]
fn test_append_to_log_file_calledTwice_shouldKeepBothLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log_path = temp_dir.path().join("logs").join("dubsync.log");

    FileManager::append_to_log_file(&log_path, "first")?;
    FileManager::append_to_log_file(&log_path, "second")?;

    let content = std::fs::read_to_string(&log_path)?;
    assert_eq!(content.lines().count(), 2);
    assert!(content.lines().next().unwrap().ends_with("] first"));
    Ok(())
}
