use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use inkblot_visualizer::audio::OfflineBackend;
use inkblot_visualizer::effects::FrameStats;
use inkblot_visualizer::graphics::{DrawingSurface, PixelCanvas, Viewport};
use inkblot_visualizer::scheduler::SteppedClock;
use inkblot_visualizer::VisualizerSession;

#[derive(Parser)]
#[command(name = "inkblot-probe")]
#[command(about = "Render the inkblot offline for an audio file and report frame statistics as JSON")]
struct Args {
    /// Audio file to analyze (WAV, MP3, OGG, FLAC, M4A)
    audio_file: PathBuf,

    /// Output JSON file path
    #[arg(long, short, default_value = "probe_results.json")]
    output: PathBuf,

    /// Canvas width in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value = "600")]
    height: u32,

    /// Simulated frame rate
    #[arg(long, default_value = "60")]
    fps: f32,

    /// Stop after this many frames (0 = until the audio ends)
    #[arg(long, default_value = "0")]
    frames: usize,

    /// Include per-frame records in the report
    #[arg(long)]
    frame_by_frame: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    min: f32,
    max: f32,
    mean: f32,
}

impl Summary {
    fn of(values: &[f32]) -> Summary {
        if values.is_empty() {
            return Summary { min: 0.0, max: 0.0, mean: 0.0 };
        }
        Summary {
            min: values.iter().copied().fold(f32::INFINITY, f32::min),
            max: values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            mean: values.iter().sum::<f32>() / values.len() as f32,
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameRecord {
    #[serde(flatten)]
    stats: FrameStats,
    /// Fraction of canvas pixels painted
    coverage: f32,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    audio_file: PathBuf,
    width: u32,
    height: u32,
    fps: f32,
    frames_rendered: usize,
    duration_seconds: f64,
    energy: Summary,
    scale: Summary,
    coverage: Summary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    frame_data: Vec<FrameRecord>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.width == 0 || args.height == 0 {
        bail!("canvas size must be non-zero, got {}x{}", args.width, args.height);
    }

    info!("Inkblot probe: {:?} at {}x{}, {} fps", args.audio_file, args.width, args.height, args.fps);

    let mut session = VisualizerSession::new(
        PixelCanvas::new(1, 1),
        OfflineBackend::new(args.fps)?,
        SteppedClock::new(args.fps as f64),
        args.audio_file.clone(),
    );
    session.start(Viewport::new(args.width, args.height))?;

    let total_pixels = (args.width as f32) * (args.height as f32);
    let mut records = Vec::new();
    loop {
        if args.frames > 0 && records.len() >= args.frames {
            break;
        }
        if args.frames == 0 && session.graph().map_or(true, |graph| graph.is_finished()) {
            break;
        }

        let Some(stats) = session.pump() else {
            break;
        };
        let coverage = session
            .surface()
            .map_or(0.0, |canvas| canvas.painted_pixels() as f32 / total_pixels);
        records.push(FrameRecord { stats, coverage });

        if records.len() % 600 == 0 {
            info!("Rendered {} frames", records.len());
        }
    }
    session.stop();

    let column = |f: fn(&FrameRecord) -> f32| records.iter().map(f).collect::<Vec<f32>>();
    let report = ProbeReport {
        audio_file: args.audio_file.clone(),
        width: session.surface().map_or(args.width, |canvas| canvas.width()),
        height: session.surface().map_or(args.height, |canvas| canvas.height()),
        fps: args.fps,
        frames_rendered: records.len(),
        duration_seconds: records.last().map_or(0.0, |r| r.stats.elapsed_ms / 1000.0),
        energy: Summary::of(&column(|r| r.stats.energy)),
        scale: Summary::of(&column(|r| r.stats.scale)),
        coverage: Summary::of(&column(|r| r.coverage)),
        frame_data: if args.frame_by_frame { records } else { Vec::new() },
    };

    info!(
        "Rendered {} frames: energy mean {:.1}, scale {:.3}-{:.3}",
        report.frames_rendered, report.energy.mean, report.scale.min, report.scale.max
    );

    let json_output = serde_json::to_string_pretty(&report)?;
    let mut file = File::create(&args.output)?;
    file.write_all(json_output.as_bytes())?;
    info!("Report written to {:?}", args.output);

    Ok(())
}
