use std::{io::IsTerminal, path::Path, time::Duration};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use keyshot::{FfmpegLogLevel, MuxPolicy, OutputStaging, Screenshot, ShotOptions, ShotReport};

const CLI_AFTER_HELP: &str = "Examples:\n  keyshot input.mp4 frame.jpg\n  keyshot rtsp://camera.local/stream camera.png --encoder png --timeout-ms 5000\n  keyshot input.mkv thumb.jpg --filter scale=320:-1 --json\n  keyshot --completions zsh > _keyshot";

#[derive(Debug, Parser)]
#[command(
    name = "keyshot",
    version,
    about = "Save the first key frame of a video as an image",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input media path or URL.
    #[arg(required_unless_present = "completions")]
    input: Option<String>,

    /// Output image path. The container is guessed from the extension.
    #[arg(required_unless_present = "completions")]
    output: Option<String>,

    /// FFmpeg encoder name (mjpeg, png, bmp, libwebp...).
    #[arg(long, default_value = keyshot::DEFAULT_IMAGE_ENCODER)]
    encoder: String,

    /// Source connect/read timeout in milliseconds. 0 disables it.
    #[arg(long, default_value_t = 0)]
    timeout_ms: u64,

    /// FFmpeg filter graph applied between decoder and encoder.
    #[arg(long)]
    filter: Option<String>,

    /// Write every unit the encoder produced, not just the first.
    #[arg(long)]
    all_units: bool,

    /// Write straight to the output path instead of staging and renaming.
    #[arg(long)]
    direct: bool,

    /// Allow overwriting an existing output file.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<FfmpegLogLevel>,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Print the extraction report as JSON.
    #[arg(long)]
    json: bool,

    /// Print a shell completion script and exit.
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

impl Cli {
    fn options(&self) -> ShotOptions {
        let mut options = ShotOptions::new()
            .with_encoder(&self.encoder)
            .with_timeout(Duration::from_millis(self.timeout_ms));
        if let Some(filter) = &self.filter {
            options = options.with_filter(filter);
        }
        if self.all_units {
            options = options.with_mux_policy(MuxPolicy::AllQueued);
        }
        if self.direct {
            options = options.with_staging(OutputStaging::Direct);
        }
        options
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn spinner(input: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Looking for a key frame in {input}"));
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn report_json(input: &str, report: &ShotReport) -> serde_json::Value {
    json!({
        "input": input,
        "output": report.output.display().to_string(),
        "video_stream_index": report.video_stream_index,
        "units_read": report.units_read,
        "video_units": report.video_units,
        "key_frames": report.key_frames,
        "units_written": report.units_written,
    })
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "keyshot", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);
    if let Some(level) = cli.log_level {
        keyshot::set_ffmpeg_log_level(level);
    }

    let (Some(input), Some(output)) = (cli.input.as_deref(), cli.output.as_deref()) else {
        return Err("INPUT and OUTPUT are required".into());
    };
    let output = Path::new(output);
    ensure_writable_path(output, cli.overwrite)?;

    let progress = if !cli.json && std::io::stderr().is_terminal() {
        Some(spinner(input)?)
    } else {
        None
    };

    let result = Screenshot::new(input).with_options(cli.options()).save(output);
    if let Some(progress) = &progress {
        progress.finish_and_clear();
    }
    let report = result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report_json(input, &report))?);
    } else {
        println!("{} {}", "saved".green().bold(), report.output.display());
        if cli.verbose {
            eprintln!(
                "{} read {} unit(s), {} from stream {}, wrote {}",
                "info:".cyan().bold(),
                report.units_read,
                report.video_units,
                report.video_stream_index,
                report.units_written
            );
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use keyshot::{FfmpegLogLevel, MuxPolicy, OutputStaging};

    use super::Cli;

    #[test]
    fn positional_arguments_are_required() {
        assert!(Cli::try_parse_from(["keyshot"]).is_err());
        assert!(Cli::try_parse_from(["keyshot", "input.mp4"]).is_err());
        assert!(Cli::try_parse_from(["keyshot", "--completions", "bash"]).is_ok());
    }

    #[test]
    fn defaults_match_the_library() {
        let cli = Cli::try_parse_from(["keyshot", "input.mp4", "frame.jpg"]).unwrap();
        let options = cli.options();
        assert_eq!(options.encoder_name(), "mjpeg");
        assert_eq!(options.timeout(), None);
        assert_eq!(options.filter_spec(), None);
        assert_eq!(options.mux_policy(), MuxPolicy::FirstUnit);
        assert_eq!(options.staging(), OutputStaging::Staged);
    }

    #[test]
    fn flags_map_onto_options() {
        let cli = Cli::try_parse_from([
            "keyshot",
            "rtsp://camera/stream",
            "frame.png",
            "--encoder",
            "png",
            "--timeout-ms",
            "2500",
            "--filter",
            "scale=320:-1",
            "--all-units",
            "--direct",
            "--log-level",
            "error",
        ])
        .unwrap();
        let options = cli.options();
        assert_eq!(options.encoder_name(), "png");
        assert_eq!(options.timeout().map(|timeout| timeout.as_millis()), Some(2500));
        assert_eq!(options.filter_spec(), Some("scale=320:-1"));
        assert_eq!(options.mux_policy(), MuxPolicy::AllQueued);
        assert_eq!(options.staging(), OutputStaging::Direct);
        assert_eq!(cli.log_level, Some(FfmpegLogLevel::Error));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(
            Cli::try_parse_from(["keyshot", "a.mp4", "b.jpg", "--log-level", "loud"]).is_err()
        );
    }
}
