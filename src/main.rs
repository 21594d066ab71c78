//! Binary entrypoint for jpeg-autorotate.
//!
//! Expands the arguments, rotates every file on the blocking pool and rewrites
//! it in place. One line per file goes to stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use jpeg_autorotate::scan::{self, ScanOptions};
use jpeg_autorotate::{AutorotateConfig, Orientation, RotateOptions, rotate_with_timeout};
use tokio::runtime::Runtime;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Rotates JPEG files according to their EXIF orientation
#[derive(Debug, Parser)]
#[command(name = "jpeg-autorotate", version)]
struct Cli {
    /// Files, directories or glob patterns (`{a,b}` alternations included)
    #[arg(value_name = "FILE", required = true)]
    files: Vec<String>,

    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JPEG quality for the re-encoded image (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Drop every EXIF tag except the orientation
    #[arg(long)]
    strip_exif: bool,

    /// Number of files processed at once
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Give up on a single file after this long (e.g. "30s")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Descend into sub-directories of directory arguments
    #[arg(short, long)]
    recursive: bool,

    /// Report what would happen without writing any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Result<AutorotateConfig> {
        let mut cfg = match &self.config {
            Some(path) => config_model::from_yaml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => AutorotateConfig::default(),
        };
        if let Some(quality) = self.quality {
            cfg.rotate.quality = quality;
        }
        if self.strip_exif {
            cfg.rotate.keep_exif = false;
        }
        if let Some(jobs) = self.jobs {
            cfg.jobs = jobs;
        }
        if let Some(timeout) = self.timeout {
            cfg.timeout = timeout;
        }
        cfg.recursive |= self.recursive;
        cfg.validate().context("validating configuration")?;
        Ok(cfg)
    }
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // stdout carries the per-file report, so default to warnings only
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("jpeg_autorotate={level}").parse()?)
        .add_directive(format!("config_model={level}").parse()?);
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Outcome for one file.
struct Report {
    path: PathBuf,
    outcome: Result<Orientation, String>,
}

impl Report {
    fn line(&self) -> String {
        match &self.outcome {
            Ok(orientation) => format!(
                "{}: Processed (Orientation was {orientation})",
                self.path.display()
            ),
            Err(message) => format!("{}: {message}", self.path.display()),
        }
    }
}

async fn process(
    path: PathBuf,
    options: RotateOptions,
    timeout: Duration,
    dry_run: bool,
) -> Report {
    let outcome = match rotate_with_timeout(path.clone(), options, timeout).await {
        Ok(done) if dry_run => {
            debug!(path = %path.display(), "dry run; not writing");
            Ok(done.orientation)
        }
        Ok(done) => match write_in_place(&path, &done.buffer).await {
            Ok(()) => Ok(done.orientation),
            Err(err) => Err(format!("{err:#}")),
        },
        Err(err) => Err(format!("{err} [{}]", err.code())),
    };
    Report { path, outcome }
}

async fn write_in_place(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    let tmp = path.with_file_name(format!(".{}.autorotate.tmp", name.to_string_lossy()));
    let written = async {
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;
    if let Err(err) = written {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err).with_context(|| format!("Could not write file {}", path.display()));
    }
    info!(path = %path.display(), "rewritten");
    Ok(())
}

fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")
}

/// Drive `fut` to completion, then drop the runtime without joining
/// blocking workers that outlived their timeout.
fn run_to_completion<F: Future>(rt: Runtime, fut: F) -> F::Output {
    let out = rt.block_on(fut);
    rt.shutdown_background();
    out
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    let cfg = cli.load_config()?;
    Ok(run_to_completion(runtime()?, run(&cli, cfg)))
}

async fn run(cli: &Cli, cfg: AutorotateConfig) -> ExitCode {
    let scan_opts = ScanOptions {
        recursive: cfg.recursive,
        ..ScanOptions::default()
    };
    let mut failures = 0usize;
    let mut files = Vec::new();
    for target in scan::expand_args(&cli.files, &scan_opts) {
        match target {
            Ok(path) => files.push(path),
            Err(err) => {
                println!("{err}");
                failures += 1;
            }
        }
    }
    info!(count = files.len(), jobs = cfg.jobs, "processing files");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing files in flight");
                cancel.cancel();
            }
        }
    });

    let mut queue = files.into_iter();
    let mut tasks: JoinSet<Report> = JoinSet::new();
    loop {
        while tasks.len() < cfg.jobs && !cancel.is_cancelled() {
            let Some(path) = queue.next() else { break };
            tasks.spawn(process(path, cfg.rotate.clone(), cfg.timeout, cli.dry_run));
        }
        let Some(joined) = tasks.join_next().await else {
            break;
        };
        match joined {
            Ok(report) => {
                println!("{}", report.line());
                if report.outcome.is_err() {
                    failures += 1;
                }
            }
            Err(err) => {
                error!("file task failed: {err}");
                failures += 1;
            }
        }
    }

    let skipped = queue.count();
    if skipped > 0 {
        warn!(skipped, "interrupted before every file was processed");
        failures += skipped;
    }
    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
