/*!
 * Integration tests for the dubbing controller
 *
 * Jobs run end to end against mock services. On unix the media tools are
 * replaced by tiny shell scripts: the fake ffmpeg creates its output file and
 * the fake ffprobe reports a fixed duration.
 */

use anyhow::Result;
use std::path::{Path, PathBuf};

use dubsync::app_config::Config;
use dubsync::app_controller::{reconcile_tempo, Controller};
use dubsync::tempo::{DurationPair, OutOfRangePolicy};
use crate::common;
use crate::common::mock_services::MockServices;

/// Tempo from a duration pair uses the configured bias
#[test]
fn test_reconcile_tempo_withDefaultConfig_shouldApplyBias() -> Result<()> {
    let mocks = MockServices::new(common::sample_transcript());
    let controller = Controller::new(Config::default(), mocks.handles.clone());

    let tempo = controller.reconcile_tempo(DurationPair::new(40.0, 60.0))?;
    assert!((tempo.value() - 1.8).abs() < 1e-9);

    let unchanged = controller.reconcile_tempo(DurationPair::new(0.0, 60.0))?;
    assert_eq!(unchanged.value(), 1.0);
    Ok(())
}

/// Out-of-range tempos follow the configured policy
#[test]
fn test_reconcile_tempo_withRejectPolicy_shouldFailOutOfRange() {
    let mocks = MockServices::new(common::sample_transcript());
    let mut config = Config::default();
    config.tempo.out_of_range = OutOfRangePolicy::Reject;
    let controller = Controller::new(config, mocks.handles.clone());

    assert!(controller.reconcile_tempo(DurationPair::new(10.0, 100.0)).is_err());

    let mut config = Config::default();
    config.tempo.out_of_range = OutOfRangePolicy::Clamp;
    let controller = Controller::new(config, mocks.handles.clone());
    let clamped = controller.reconcile_tempo(DurationPair::new(10.0, 100.0)).unwrap();
    assert_eq!(clamped.value(), 4.0);
}

/// A zero video duration keeps the audio tempo, also without a controller
#[test]
fn test_reconcile_tempo_withZeroVideoDuration_shouldKeepTempo() -> Result<()> {
    common::init_test_logging();
    let config = Config::default();

    assert_eq!(reconcile_tempo(&config, DurationPair::new(0.0, 12.0))?.value(), 1.0);
    assert_eq!(reconcile_tempo(&config, DurationPair::new(f64::NAN, 12.0))?.value(), 1.0);
    assert!((reconcile_tempo(&config, DurationPair::new(10.0, 10.0))?.value() - 1.2).abs() < 1e-9);
    Ok(())
}

/// Missing inputs fail before anything runs
#[tokio::test]
async fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mocks = MockServices::new(common::sample_transcript());
    let controller = Controller::new(Config::default(), mocks.handles.clone());

    let result = controller
        .run(temp_dir.path().join("missing.mp4"), temp_dir.path().to_path_buf(), false)
        .await;

    assert!(result.is_err());
    assert_eq!(mocks.transcriber.lock().unwrap().call_count, 0);
    Ok(())
}

/// Existing outputs are skipped unless forced
#[tokio::test]
async fn test_run_withExistingOutput_shouldSkip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_file(temp_dir.path(), "clip.mp4", "")?;
    common::create_test_file(temp_dir.path(), "clip.en.dubbed.mp4", "")?;

    let mocks = MockServices::new(common::sample_transcript());
    let controller = Controller::new(Config::default(), mocks.handles.clone());

    let report = controller.run(video, temp_dir.path().to_path_buf(), false).await?;

    assert!(report.is_none());
    assert_eq!(mocks.transcriber.lock().unwrap().call_count, 0);
    Ok(())
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Config whose media tools are fake scripts in `tools_dir`
#[cfg(unix)]
fn config_with_fake_tools(tools_dir: &Path, probed_seconds: f64) -> Result<Config> {
    // The last argument is always the output file
    let ffmpeg = write_script(tools_dir, "fake-ffmpeg", "for last; do :; done\ntouch \"$last\"")?;
    let ffprobe = write_script(tools_dir, "fake-ffprobe", &format!("echo {}", probed_seconds))?;

    let mut config = Config::default();
    config.media.ffmpeg_path = ffmpeg.to_string_lossy().to_string();
    config.media.ffprobe_path = ffprobe.to_string_lossy().to_string();
    config.media.timeout_secs = 30;
    Ok(config)
}

/// A full job calls every service once and writes video and subtitles
#[cfg(unix)]
#[tokio::test]
async fn test_run_withMockServices_shouldProduceOutputs() -> Result<()> {
    common::init_test_logging();
    let tools_dir = common::create_temp_dir()?;
    let work_dir = common::create_temp_dir()?;
    let video = common::create_test_file(work_dir.path(), "clip.mp4", "")?;
    let out_dir = work_dir.path().join("out");

    let config = config_with_fake_tools(tools_dir.path(), 10.0)?;
    let mocks = MockServices::new(common::sample_transcript());
    let controller = Controller::new(config, mocks.handles.clone());

    let report = controller
        .run(video, out_dir.clone(), false)
        .await?
        .expect("job should not be skipped");

    assert_eq!(report.output_video, out_dir.join("clip.en.dubbed.mp4"));
    assert!(report.output_video.exists());
    assert!(report.subtitle_path.exists());
    assert_eq!(report.subtitle_count, 3);
    // Equal durations: the tempo is the bias
    assert!((report.tempo.unwrap().value() - 1.2).abs() < 1e-9);

    assert_eq!(mocks.transcriber.lock().unwrap().call_count, 1);
    assert_eq!(mocks.translator.tracker().lock().unwrap().call_count, 1);
    let synthesized = mocks.synthesizer.lock().unwrap().last_input.clone().unwrap();
    assert!(synthesized.starts_with("en:Привет"));

    let srt = std::fs::read_to_string(&report.subtitle_path)?;
    assert!(srt.contains("en:Привет en:всем."));
    Ok(())
}

/// Sidecar transcripts replace the transcription service
#[cfg(unix)]
#[tokio::test]
async fn test_run_withSidecarTranscript_shouldNotCallTranscriber() -> Result<()> {
    common::init_test_logging();
    let tools_dir = common::create_temp_dir()?;
    let work_dir = common::create_temp_dir()?;
    let video = common::create_test_file(work_dir.path(), "clip.mp4", "")?;
    common::create_test_file(work_dir.path(), "clip.json", common::sample_transcript_json())?;

    let config = config_with_fake_tools(tools_dir.path(), 10.0)?;
    let mocks = MockServices::new(common::sample_transcript());
    let controller = Controller::new(config, mocks.handles.clone());

    let report = controller.run(video, work_dir.path().to_path_buf(), false).await?;

    assert!(report.is_some());
    assert_eq!(mocks.transcriber.lock().unwrap().call_count, 0);
    assert_eq!(mocks.translator.tracker().lock().unwrap().call_count, 1);
    Ok(())
}

/// Same source and target language skip translation, synthesis and tempo
#[cfg(unix)]
#[tokio::test]
async fn test_run_withSameLanguage_shouldKeepOriginalAudio() -> Result<()> {
    common::init_test_logging();
    let tools_dir = common::create_temp_dir()?;
    let work_dir = common::create_temp_dir()?;
    let video = common::create_test_file(work_dir.path(), "clip.mp4", "")?;

    let mut config = config_with_fake_tools(tools_dir.path(), 10.0)?;
    config.source_language = "en".to_string();
    config.target_language = "eng".to_string();
    let mocks = MockServices::new(common::sample_transcript());
    let controller = Controller::new(config, mocks.handles.clone());

    let report = controller
        .run(video, work_dir.path().to_path_buf(), false)
        .await?
        .expect("job should not be skipped");

    assert!(report.tempo.is_none());
    assert_eq!(mocks.translator.tracker().lock().unwrap().call_count, 0);
    assert_eq!(mocks.synthesizer.lock().unwrap().call_count, 0);
    let srt = std::fs::read_to_string(&report.subtitle_path)?;
    assert!(srt.contains("Привет всем."));
    Ok(())
}

/// A failing collaborator aborts the job with its error
#[cfg(unix)]
#[tokio::test]
async fn test_run_withFailingTranslator_shouldPropagateError() -> Result<()> {
    common::init_test_logging();
    let tools_dir = common::create_temp_dir()?;
    let work_dir = common::create_temp_dir()?;
    let video = common::create_test_file(work_dir.path(), "clip.mp4", "")?;

    let config = config_with_fake_tools(tools_dir.path(), 10.0)?;
    let mocks = MockServices::new(common::sample_transcript());
    mocks.translator.fail_next_call();
    let controller = Controller::new(config, mocks.handles.clone());

    let error = controller
        .run(video, work_dir.path().to_path_buf(), false)
        .await
        .expect_err("translation failure should abort the job");

    assert!(format!("{:#}", error).contains("mock translator unavailable"));
    assert_eq!(mocks.synthesizer.lock().unwrap().call_count, 0);
    assert!(!work_dir.path().join("clip.en.dubbed.mp4").exists());
    Ok(())
}

/// Folder runs count processed and failed videos
#[cfg(unix)]
#[tokio::test]
async fn test_run_folder_withTwoVideos_shouldSummarize() -> Result<()> {
    common::init_test_logging();
    let tools_dir = common::create_temp_dir()?;
    let work_dir = common::create_temp_dir()?;
    common::create_test_file(work_dir.path(), "a.mp4", "")?;
    common::create_test_file(work_dir.path(), "b.mkv", "")?;

    let config = config_with_fake_tools(tools_dir.path(), 10.0)?;
    let mocks = MockServices::new(common::sample_transcript());
    let controller = Controller::new(config, mocks.handles.clone());

    let summary = controller.run_folder(work_dir.path().to_path_buf(), false).await?;
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert!(work_dir.path().join("dubsync.log").exists());

    // Second pass finds the outputs and skips both
    let summary = controller.run_folder(work_dir.path().to_path_buf(), false).await?;
    assert_eq!(summary.skipped, 2);
    Ok(())
}
