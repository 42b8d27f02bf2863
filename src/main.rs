// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use clap::{Args, Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use dubsync::app_config::{self, Config};
use dubsync::app_controller::{reconcile_tempo, write_subtitles, Controller};
use dubsync::media::MediaTools;
use dubsync::tempo::DurationPair;
use dubsync::timing::TimingPolicy;
use dubsync::transcript::Transcript;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for TimingPolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTimingPolicy {
    Naive,
    Paced,
}

impl From<CliTimingPolicy> for TimingPolicy {
    fn from(cli_policy: CliTimingPolicy) -> Self {
        match cli_policy {
            CliTimingPolicy::Naive => TimingPolicy::Naive,
            CliTimingPolicy::Paced => TimingPolicy::Paced,
        }
    }
}

/// Options available to every command
#[derive(Args, Debug, Clone)]
struct GlobalArgs {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// API key used by services without one in the config
    #[arg(long, env = "DUBSYNC_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,
}

/// Overrides for the job settings in the config file
#[derive(Args, Debug, Clone, Default)]
struct JobArgs {
    /// Language spoken in the video (e.g., 'ru', 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Language of the dub (e.g., 'en', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Subtitle timing policy
    #[arg(long, value_enum)]
    policy: Option<CliTimingPolicy>,

    /// Tempo bias applied on top of the audio/video duration ratio
    #[arg(long)]
    bias: Option<f64>,
}

#[derive(Args, Debug)]
struct DubArgs {
    /// Input video file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Directory for the outputs (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    job: JobArgs,
}

#[derive(Args, Debug)]
struct SubtitleArgs {
    /// Transcript in Whisper JSON or SRT format
    #[arg(long)]
    transcript: PathBuf,

    /// Text file holding the translated transcript
    #[arg(long)]
    translation: PathBuf,

    /// Output SRT file
    #[arg(long)]
    output: PathBuf,

    #[command(flatten)]
    job: JobArgs,
}

#[derive(Args, Debug)]
struct TempoArgs {
    /// Source video
    #[arg(long)]
    video: PathBuf,

    /// Dubbed audio track
    #[arg(long)]
    audio: PathBuf,

    /// Tempo bias applied on top of the audio/video duration ratio
    #[arg(long)]
    bias: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dub a video file or every video in a directory (default command)
    Dub(DubArgs),

    /// Re-time a translated transcript into an SRT file without touching media
    Subtitles(SubtitleArgs),

    /// Print the tempo factor that fits an audio track to a video
    Tempo(TempoArgs),

    /// Generate shell completions for dubsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// dubsync - dub videos with synchronized subtitles
#[derive(Parser, Debug)]
#[command(name = "dubsync")]
#[command(version)]
#[command(about = "Dub videos into another language with synchronized subtitles")]
#[command(long_about = "dubsync transcribes a video, translates the transcript, synthesizes a new voice, \
re-times the subtitles to the translation and fits the voice to the video's duration.

EXAMPLES:
    dubsync movie.mp4                                   # Dub using the default config
    dubsync -s ru -t en movie.mp4                       # Dub from Russian to English
    dubsync dub --policy naive /videos/                 # Dub a directory, keep transcript timing
    dubsync subtitles --transcript t.json --translation t.txt --output t.srt
    dubsync tempo --video movie.mp4 --audio voice.mp3   # Show the tempo correction
    dubsync completions bash > dubsync.bash

CONFIGURATION:
    Configuration is read from conf.json in the working directory, or from the user
    config directory. A default file is created when none exists.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,

    /// Input video file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Directory for the outputs (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    job: JobArgs,
}

// @struct: Stderr logger with timestamps and coloured levels
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let (colour, tag) = Self::style_for_level(record.level());
        let _ = writeln!(
            std::io::stderr(),
            "\x1B[{}m{} {} {}\x1B[0m",
            colour, now, tag, record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    let global = cli.global.clone();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "dubsync", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Dub(args)) => run_dub(&global, args).await,
        Some(Commands::Subtitles(args)) => run_subtitles(&global, args),
        Some(Commands::Tempo(args)) => run_tempo(&global, args).await,
        None => {
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;
            let args = DubArgs {
                input_path,
                output_dir: cli.output_dir,
                force_overwrite: cli.force_overwrite,
                job: cli.job,
            };
            run_dub(&global, args).await
        }
    }
}

/// Load the config, apply CLI overrides, validate it and set the log level
fn load_config(global: &GlobalArgs, job: &JobArgs) -> Result<Config> {
    if let Some(level) = &global.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = global.config_path.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    if let Some(source_language) = &job.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &job.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(policy) = &job.policy {
        config.timing.policy = policy.clone().into();
    }
    if let Some(bias) = job.bias {
        config.tempo.bias = bias;
    }
    if let Some(api_key) = &global.api_key {
        config.services.apply_api_key(api_key);
    }
    if let Some(level) = &global.log_level {
        config.log_level = level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if global.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

async fn run_dub(global: &GlobalArgs, args: DubArgs) -> Result<()> {
    let config = load_config(global, &args.job)?;
    let controller = Controller::with_config(config)?;

    if args.input_path.is_file() {
        let output_dir = args.output_dir.clone().unwrap_or_else(|| {
            args.input_path.parent().unwrap_or(Path::new(".")).to_path_buf()
        });
        controller.run(args.input_path.clone(), output_dir, args.force_overwrite).await?;
    } else if args.input_path.is_dir() {
        let summary = controller.run_folder(args.input_path.clone(), args.force_overwrite).await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} of {} videos failed", summary.failed,
                summary.processed + summary.skipped + summary.failed));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", args.input_path));
    }

    Ok(())
}

fn run_subtitles(global: &GlobalArgs, args: SubtitleArgs) -> Result<()> {
    let config = load_config(global, &args.job)?;

    let transcript = Transcript::load(&args.transcript)?;
    let translated_text = std::fs::read_to_string(&args.translation)
        .with_context(|| format!("Failed to read translation: {}", args.translation.display()))?;

    let subtitles = write_subtitles(&config, &transcript, &translated_text, &args.output)?;

    info!("Success: {} ({} cues)", args.output.display(), subtitles.entries.len());
    Ok(())
}

async fn run_tempo(global: &GlobalArgs, args: TempoArgs) -> Result<()> {
    let job = JobArgs { bias: args.bias, ..JobArgs::default() };
    let config = load_config(global, &job)?;
    let media = MediaTools::new(&config.media);

    let video_duration = media.probe_duration(&args.video).await?;
    let audio_duration = media.probe_duration(&args.audio).await?;
    let pair = DurationPair::new(video_duration, audio_duration);

    let tempo = reconcile_tempo(&config, pair)?;

    info!("Video {:.3}s, audio {:.3}s, tempo {}", video_duration, audio_duration, tempo);
    println!("{}", tempo);
    Ok(())
}
