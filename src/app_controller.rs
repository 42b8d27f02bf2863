use anyhow::{Result, Context, anyhow};
use chrono::Local;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::media::MediaTools;
use crate::services::ServiceHandles;
use crate::subtitle_processor::SubtitleCollection;
use crate::tempo::{reconcile, DurationPair, TempoFactor};
use crate::timing::SubtitleTimer;
use crate::transcript::Transcript;

// @module: Dubbing job orchestration

// @const: Stages shown on the job progress bar
const JOB_STAGES: u64 = 7;

/// What a finished job produced
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Final video with new audio and burned-in subtitles
    pub output_video: PathBuf,
    /// Persisted subtitle track
    pub subtitle_path: PathBuf,
    /// Number of subtitle cues written
    pub subtitle_count: usize,
    /// Durations that drove the tempo, absent when no voice was synthesized
    pub durations: Option<DurationPair>,
    /// Tempo applied to the dubbed audio
    pub tempo: Option<TempoFactor>,
    /// Wall-clock time of the job
    pub elapsed: Duration,
}

/// Outcome counts of a folder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Allocate translated words to the transcript segments and time the cues.
///
/// Nothing is returned for malformed segments.
pub fn build_subtitles(config: &Config, transcript: &Transcript, translated_text: &str) -> Result<SubtitleCollection> {
    let segments = transcript.to_segments();
    let timed = SubtitleTimer::new(config.timing.policy)
        .build(&segments, translated_text)
        .context("Transcript segments are malformed")?;

    if timed.has_degenerate_rate() && !segments.is_empty() {
        warn!("Transcript segments span no time, subtitles paced at 1 word per second");
    }
    if timed.starved_segments > 0 {
        warn!(
            "Translation is shorter than the transcript: {} subtitle(s) left empty",
            timed.starved_segments
        );
    }
    if let Some(rate) = timed.rate {
        debug!("Pacing subtitles at {:.2} words/s", rate.words_per_second);
    }

    Ok(SubtitleCollection::from_entries(
        PathBuf::new(),
        config.target_language.clone(),
        timed.entries,
    ))
}

/// Build subtitles and persist them as SRT
pub fn write_subtitles(config: &Config, transcript: &Transcript, translated_text: &str, path: &Path) -> Result<SubtitleCollection> {
    let mut subtitles = build_subtitles(config, transcript, translated_text)?;
    subtitles.source_file = path.to_path_buf();
    subtitles.write_to_srt(path)?;
    Ok(subtitles)
}

/// Tempo for a duration pair, validated against the configured range
pub fn reconcile_tempo(config: &Config, pair: DurationPair) -> Result<TempoFactor> {
    let reconciliation = reconcile(pair, config.tempo.bias);
    if reconciliation.degenerate {
        warn!(
            "Video duration {} is not usable, leaving the audio tempo unchanged",
            pair.video_duration
        );
    }

    let tempo = config.tempo.limits().apply(reconciliation.tempo)?;
    debug!(
        "Audio {:.2}s vs video {:.2}s -> tempo {}",
        pair.audio_duration, pair.video_duration, tempo
    );
    Ok(tempo)
}

/// Runs dubbing jobs against explicit service handles
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Speech and translation collaborators
    services: ServiceHandles,
    // @field: ffmpeg/ffprobe handle
    media: MediaTools,
}

impl Controller {
    /// Create a controller with caller-provided service handles
    pub fn new(config: Config, services: ServiceHandles) -> Self {
        let media = MediaTools::new(&config.media);
        Self { config, services, media }
    }

    /// Create a controller talking to the HTTP services named in the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let services = ServiceHandles::from_config(&config.services)
            .context("Failed to create service clients")?;
        Ok(Self::new(config, services))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// [`write_subtitles`] with this controller's configuration
    pub fn write_subtitles(&self, transcript: &Transcript, translated_text: &str, path: &Path) -> Result<SubtitleCollection> {
        write_subtitles(&self.config, transcript, translated_text, path)
    }

    pub fn reconcile_tempo(&self, pair: DurationPair) -> Result<TempoFactor> {
        reconcile_tempo(&self.config, pair)
    }

    /// Probe both files and compute the tempo the audio needs
    pub async fn measure_tempo(&self, video: &Path, audio: &Path) -> Result<(DurationPair, TempoFactor)> {
        let video_duration = self.media.probe_duration(video).await
            .with_context(|| format!("Failed to probe video duration: {}", video.display()))?;
        let audio_duration = self.media.probe_duration(audio).await
            .with_context(|| format!("Failed to probe audio duration: {}", audio.display()))?;

        let pair = DurationPair::new(video_duration, audio_duration);
        let tempo = self.reconcile_tempo(pair)?;
        Ok((pair, tempo))
    }

    /// Run the dubbing workflow for one video
    ///
    /// Returns `None` when the output already exists and `force_overwrite` is off.
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<Option<JobReport>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, &multi_progress, force_overwrite).await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<Option<JobReport>> {
        let start_time = Instant::now();

        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        FileManager::ensure_dir(output_dir)?;

        let target_language = &self.config.target_language;
        let output_video = FileManager::dubbed_output_path(
            input_file,
            output_dir,
            target_language,
            &self.config.media.output_container,
        );
        let subtitle_path = FileManager::subtitle_output_path(input_file, output_dir, target_language);
        if output_video.exists() && !force_overwrite {
            warn!("Skipping {}, dubbed output already exists (use -f to force overwrite)", input_file.display());
            return Ok(None);
        }

        // Intermediate audio lives here and is removed when the job ends
        let workspace = tempfile::Builder::new()
            .prefix("dubsync-")
            .tempdir()
            .context("Failed to create job workspace")?;
        let job_started = Local::now();
        let artifact = |base: &str, ext: &str| workspace.path().join(FileManager::timestamped_name(base, ext, job_started));

        let progress = multi_progress.add(ProgressBar::new(JOB_STAGES));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("█▓▒░"));

        progress.set_message("Extracting audio");
        let extracted_audio = artifact("extracted_audio", ".mp3");
        self.media.extract_audio(input_file, &extracted_audio).await
            .context("Audio extraction failed")?;
        progress.inc(1);

        progress.set_message("Transcribing");
        let transcript = match FileManager::find_sidecar_transcript(input_file) {
            Some(sidecar) => {
                info!("Using transcript {}", sidecar.display());
                Transcript::load(&sidecar)?
            }
            None => self.services.transcriber
                .transcribe(&extracted_audio, &self.config.source_language)
                .await
                .context("Transcription failed")?,
        };
        debug!("Transcript: {} segments, {} words", transcript.segments.len(), transcript.word_count());
        progress.inc(1);

        let dubbing = self.config.needs_dubbing();
        let original_text = transcript.full_text();

        progress.set_message("Translating");
        let translated_text = if dubbing {
            self.services.translator
                .translate(&original_text, &self.config.source_language, target_language)
                .await
                .context("Translation failed")?
        } else {
            info!("Source and target language match, keeping the original transcript");
            original_text.clone()
        };
        progress.inc(1);

        progress.set_message("Timing subtitles");
        let subtitles = self.write_subtitles(&transcript, &translated_text, &subtitle_path)?;
        progress.inc(1);

        progress.set_message("Synthesizing voice");
        let (final_audio, durations, tempo) = if dubbing {
            let voice = artifact("translated_audio", ".mp3");
            self.services.synthesizer
                .synthesize(&translated_text, target_language, &voice)
                .await
                .context("Speech synthesis failed")?;
            progress.inc(1);

            progress.set_message("Reconciling tempo");
            let (pair, tempo) = self.measure_tempo(input_file, &voice).await?;
            let adjusted = artifact("adjusted_audio", ".mp3");
            self.media.adjust_tempo(&voice, tempo, &adjusted).await
                .context("Tempo adjustment failed")?;
            progress.inc(1);

            (adjusted, Some(pair), Some(tempo))
        } else {
            progress.inc(2);
            (extracted_audio, None, None)
        };

        progress.set_message("Muxing");
        self.media.mux(input_file, &final_audio, &subtitle_path, &output_video).await
            .context("Muxing failed")?;
        progress.inc(1);
        progress.finish_and_clear();

        // Dropping the workspace deletes the intermediate audio
        workspace.close().context("Failed to remove job workspace")?;

        let elapsed = start_time.elapsed();
        info!("Success: {} ({})", output_video.display(), Self::format_duration(elapsed));

        Ok(Some(JobReport {
            output_video,
            subtitle_path,
            subtitle_count: subtitles.entries.len(),
            durations,
            tempo,
            elapsed,
        }))
    }

    /// Dub every video below a directory; outputs land next to each input
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let video_files = FileManager::find_video_files(&input_dir)?;
        if video_files.is_empty() {
            return Err(anyhow!("No video files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(video_files.len() as u64));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(style.progress_chars("█▓▒░"));

        let mut summary = FolderSummary::default();

        for video_file in &video_files {
            let file_name = video_file.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let output_dir = video_file.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| input_dir.clone());

            match self.run_with_progress(video_file, &output_dir, &multi_progress, force_overwrite).await {
                Ok(Some(_)) => summary.processed += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        let message = format!(
            "Folder processing completed: {} processed, {} skipped, {} errors - Duration: {}",
            summary.processed, summary.skipped, summary.failed,
            Self::format_duration(start_time.elapsed())
        );
        info!("{}", message);

        let log_path = input_dir.join("dubsync.log");
        if let Err(e) = FileManager::append_to_log_file(&log_path, &message) {
            warn!("Failed to write folder log: {}", e);
        }

        Ok(summary)
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
