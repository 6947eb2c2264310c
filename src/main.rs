use std::path::PathBuf;

use anyhow::{bail, Context};
use sysinfo::System;

use hoop_highlights::config::{app_dir, AppConfig};
use hoop_highlights::messaging::{FanoutSink, JsonLinesSink, TracingSink};
use hoop_highlights::pipeline::RegionTracking;
use hoop_highlights::{
    detect_makes, AppResult, CancelToken, ExecutionBudget, NormBox, Recording, ShotRuleEngine,
};

const LOG_TARGET_STARTUP: &str = "hoop_highlights::startup";

const USAGE: &str = "\
Usage: hoop-highlights <recording.jsonl> [options]

Replays recorded ball/hoop detections through the make detector and prints
the made-basket events as JSON.

Options:
  --config <path>      Configuration file (default: <config dir>/HoopHighlights/config.json)
  --fps <n>            Sampling rate in frames per second
  --start <seconds>    Skip the beginning of the recording
  --duration <secs>    Only analyse this many seconds
  --region <x,y,w,h>   Region of interest in normalized coordinates
  --follow-hoop        Snap the region onto the hoop inside it and follow it
  --out <path>         Write events to a file instead of stdout
  --trace <path>       Write the per-frame reasoning trail as JSON lines
  -h, --help           Show this help";

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    recording: Option<PathBuf>,
    config: Option<PathBuf>,
    fps: Option<f64>,
    start: Option<f64>,
    duration: Option<f64>,
    region: Option<NormBox>,
    follow_hoop: bool,
    out: Option<PathBuf>,
    trace: Option<PathBuf>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> AppResult<CliArgs> {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{} needs a value", flag));

        match arg.as_str() {
            "-h" | "--help" => cli.help = true,
            "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--fps" => cli.fps = Some(parse_number("--fps", &value("--fps")?)?),
            "--start" => cli.start = Some(parse_number("--start", &value("--start")?)?),
            "--duration" => cli.duration = Some(parse_number("--duration", &value("--duration")?)?),
            "--region" => cli.region = Some(parse_region(&value("--region")?)?),
            "--follow-hoop" => cli.follow_hoop = true,
            "--out" => cli.out = Some(PathBuf::from(value("--out")?)),
            "--trace" => cli.trace = Some(PathBuf::from(value("--trace")?)),
            flag if flag.starts_with('-') => bail!("Unknown option: {}", flag),
            path => {
                if cli.recording.is_some() {
                    bail!("Only one recording can be replayed at a time");
                }
                cli.recording = Some(PathBuf::from(path));
            }
        }
    }

    Ok(cli)
}

fn parse_number(flag: &str, raw: &str) -> AppResult<f64> {
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("{} expects a number, got '{}'", flag, raw))
}

/// `x,y,w,h` in normalized coordinates
fn parse_region(raw: &str) -> AppResult<NormBox> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("--region expects x,y,w,h, got '{}'", raw))?;

    match parts.as_slice() {
        [x, y, w, h] => Ok(NormBox::new(*x, *y, *w, *h)),
        _ => bail!("--region expects exactly four values, got {}", parts.len()),
    }
}

/// Initialize tracing with file rotation
///
/// Logs are written to:
/// - macOS: ~/Library/Application Support/HoopHighlights/logs/
/// - Windows: %APPDATA%/HoopHighlights/logs/
/// - Linux: ~/.config/HoopHighlights/logs/
///
/// Console output goes to stderr so stdout stays reserved for events.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = app_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    // Files named hoop-highlights.log.YYYY-MM-DD
    let file_appender = rolling::daily(&log_dir, "hoop-highlights.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry().with(filter).with(file_layer).init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn log_runtime_environment() {
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_cpu();

    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());
    let architecture = std::env::consts::ARCH;

    tracing::info!(target: LOG_TARGET_STARTUP, "Starting Hoop Highlights v{} on ({})", version, architecture);
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "CPUs: {}, memory: {:.1} / {:.1} GiB available",
        system.cpus().len(),
        system.available_memory() as f64 / (1u64 << 30) as f64,
        system.total_memory() as f64 / (1u64 << 30) as f64
    );
}

fn load_config(cli: &CliArgs) -> AppResult<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load_default().context("Failed to load default config")?,
    };

    // Command line overrides the file
    if let Some(fps) = cli.fps {
        config.pipeline.target_fps = fps;
    }
    if let Some(start) = cli.start {
        config.pipeline.start_offset = start;
    }
    if let Some(duration) = cli.duration {
        config.pipeline.max_duration = Some(duration);
    }
    if let Some(region) = cli.region {
        config.pipeline.region = Some(region);
    }
    if cli.follow_hoop {
        config.pipeline.region_tracking = RegionTracking::FollowHoop;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(cli: CliArgs) -> AppResult<()> {
    let Some(recording_path) = cli.recording.clone() else {
        bail!("No recording given\n\n{}", USAGE);
    };

    let config = load_config(&cli)?;
    let recording = Recording::load(&recording_path)
        .with_context(|| format!("Failed to load recording {}", recording_path.display()))?;
    let (mut source, mut detector) = recording.into_replay();

    let mut sink = FanoutSink::new().with(Box::new(TracingSink));
    if let Some(trace_path) = &cli.trace {
        let trail = JsonLinesSink::create(trace_path)
            .with_context(|| format!("Failed to create trace file {}", trace_path.display()))?;
        sink = sink.with(Box::new(trail));
        tracing::info!("Writing reasoning trail to {}", trace_path.display());
    }
    let mut engine = ShotRuleEngine::with_sink(config.engine.clone(), Box::new(sink));

    let report = detect_makes(
        &mut source,
        &mut detector,
        &mut engine,
        &config.pipeline,
        &ExecutionBudget::detect(),
        &CancelToken::new(),
        |progress| {
            if let Some(make) = progress.make {
                tracing::info!("Make at {:.2}s ({:.0}% analysed)", make.time, progress.fraction * 100.0);
            }
        },
    )
    .context("Detection session failed")?;

    let json = serde_json::to_string_pretty(&report.events).context("Failed to serialize events")?;
    match &cli.out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} events to {}", report.events.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn main() -> AppResult<()> {
    let cli = parse_args(std::env::args().skip(1))?;
    if cli.help {
        println!("{}", USAGE);
        return Ok(());
    }

    initialize_tracing();
    log_runtime_environment();

    if let Err(e) = run(cli) {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
