//! capture - record frames from a video source to disk
//!
//! Loads configuration from `FRAMEGRAB_CONFIG` / environment, applies CLI
//! overrides, then records interval-gated frames until the source is
//! exhausted or SIGINT arrives. `--probe` prints the backend-reported
//! properties instead of recording.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use framegrab::{CancelToken, GrabConfig, IntervalRecorder, Session};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video source: a stub:// URL, device node, or numeric device index.
    #[arg(long, env = "FRAMEGRAB_SOURCE")]
    source: Option<String>,
    /// Directory to write frames into.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Minimum seconds between saved frames. 0 saves every frame.
    #[arg(long)]
    interval_secs: Option<f64>,
    /// Filename prefix for saved frames.
    #[arg(long)]
    prefix: Option<String>,
    /// Requested frame width (applied best-effort).
    #[arg(long)]
    width: Option<u32>,
    /// Requested frame height (applied best-effort).
    #[arg(long)]
    height: Option<u32>,
    /// Requested frame rate (applied best-effort).
    #[arg(long)]
    fps: Option<f64>,
    /// Convert frames from BGR to RGB ordering on read.
    #[arg(long)]
    convert_to_rgb: bool,
    /// Print the backend-reported width/height/fps and exit.
    #[arg(long)]
    probe: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = GrabConfig::load()?;
    if let Some(source) = args.source {
        cfg.capture.source = source;
    }
    if let Some(dir) = args.output_dir {
        cfg.recorder.output_dir = dir;
    }
    if let Some(interval) = args.interval_secs {
        cfg.recorder.interval_secs = interval;
    }
    if let Some(prefix) = args.prefix {
        cfg.recorder.prefix = prefix;
    }
    if args.width.is_some() {
        cfg.capture.width = args.width;
    }
    if args.height.is_some() {
        cfg.capture.height = args.height;
    }
    if args.fps.is_some() {
        cfg.capture.fps = args.fps;
    }
    if args.convert_to_rgb {
        cfg.capture.convert_to_rgb = true;
    }
    cfg.validate()?;

    let mut session = Session::new(cfg.capture.clone());

    if args.probe {
        let (width, height, fps) = session.actual_properties()?;
        println!("source: {}", cfg.capture.source);
        println!("width: {width}");
        println!("height: {height}");
        println!("fps: {fps}");
        return Ok(());
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, finishing up");
        handler_token.cancel();
    })
    .context("install interrupt handler")?;

    log::info!(
        "recording {} -> {} (interval {}s, prefix {})",
        cfg.capture.source,
        cfg.recorder.output_dir.display(),
        cfg.recorder.interval_secs,
        cfg.recorder.prefix
    );

    let mut recorder = IntervalRecorder::new(cfg.recorder.output_dir.clone())
        .with_interval(Duration::from_secs_f64(cfg.recorder.interval_secs))
        .with_prefix(cfg.recorder.prefix.clone())
        .with_observer(Box::new(|frame| {
            log::debug!("captured {}x{} frame", frame.width(), frame.height());
        }));
    let result = recorder.run(&mut session, &cancel)?;
    session.close();

    println!(
        "saved {} frames to {}",
        result.saved_count,
        result.directory.display()
    );
    Ok(())
}
