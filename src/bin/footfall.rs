use anyhow::{Context, Result};
use clap::Parser;
use footfall::{read_frames, Config, FootfallCounter};
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Replay per-frame detections through the tracker and line counter.
#[derive(Parser)]
#[command(
    name = "footfall",
    about = "Count people crossing a line from per-frame detections",
    version
)]
struct Args {
    /// JSON-lines file with one detection list per frame:
    /// `[{"bbox": [x1, y1, x2, y2], "confidence": c}, ...]`
    #[arg(short, long)]
    input: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Y-coordinate of the counting line, overrides the config
    #[arg(long)]
    line_y: Option<i32>,

    /// Frame height in pixels; the line defaults to its middle
    #[arg(long)]
    frame_height: Option<u32>,

    /// Write one JSON frame report per line to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(line_y) = args.line_y {
        cfg.counter.line_y = Some(line_y);
    }

    let mut pipeline = FootfallCounter::from_config(&cfg, args.frame_height)
        .context("pass --line-y or --frame-height when the config has no counting line")?;
    info!("counting line at y = {}", pipeline.counter().line_y());

    let input = File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let mut writer = match &args.output {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => None,
    };

    for detections in read_frames(BufReader::new(input)) {
        let detections =
            detections.with_context(|| format!("failed to read {}", args.input.display()))?;

        let report = pipeline.process_frame(&detections)?;
        debug!(
            "frame {}: {} detections, {} tracks, in {} out {}",
            report.frame,
            detections.len(),
            report.tracks.len(),
            report.counts.count_in,
            report.counts.count_out
        );

        if let Some(w) = writer.as_mut() {
            serde_json::to_writer(&mut *w, &report)?;
            w.write_all(b"\n")?;
        }
    }
    if let Some(mut w) = writer {
        w.flush()?;
    }

    let counts = pipeline.counts();
    info!("processed {} frames", pipeline.tracker().frame_count());
    println!("\nFinal Counts:");
    println!("Entries: {}", counts.count_in);
    println!("Exits: {}", counts.count_out);
    println!("Currently Inside: {}", counts.net());
    Ok(())
}
