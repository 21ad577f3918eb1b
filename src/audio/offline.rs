use anyhow::{bail, Context, Result};
use log::{debug, info};
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::{AudioBackend, AudioGraph, FrequencyAnalyser};

/// Decode a media file and mix it down to mono.
pub fn decode_mono<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let file = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
    );
    let source = Decoder::new(file)
        .with_context(|| format!("Unsupported audio format: {}", path.display()))?;

    let sample_rate = source.sample_rate();
    let channels = source.channels().max(1) as usize;
    let samples: Vec<f32> = source.convert_samples::<f32>().collect();

    let mono: Vec<f32> = samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    info!(
        "Decoded {:?} ({}Hz, {} channels, {} frames)",
        path,
        sample_rate,
        channels,
        mono.len()
    );
    Ok((mono, sample_rate))
}

/// Backend that decodes media up front and advances in lockstep with frames
/// instead of a sound card. Nothing is audible.
pub struct OfflineBackend {
    frame_rate: f32,
}

impl OfflineBackend {
    pub fn new(frame_rate: f32) -> Result<Self> {
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            bail!("frame rate must be positive, got {}", frame_rate);
        }
        Ok(Self { frame_rate })
    }
}

impl AudioBackend for OfflineBackend {
    type Graph = OfflineGraph;

    fn build_graph(&mut self, media: &Path, fft_size: usize) -> Result<OfflineGraph> {
        let (samples, sample_rate) = decode_mono(media)?;
        OfflineGraph::from_samples(samples, sample_rate, fft_size, self.frame_rate)
    }
}

/// Pre-decoded audio feeding an analyser one frame's worth of samples per read.
pub struct OfflineGraph {
    samples: Vec<f32>,
    position: usize,
    samples_per_frame: usize,
    started: bool,
    analyser: FrequencyAnalyser,
}

impl OfflineGraph {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, fft_size: usize, frame_rate: f32) -> Result<Self> {
        let samples_per_frame = ((sample_rate as f32 / frame_rate).round() as usize).max(1);
        Ok(Self {
            samples,
            position: 0,
            samples_per_frame,
            started: false,
            analyser: FrequencyAnalyser::new(fft_size)?,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.samples.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl AudioGraph for OfflineGraph {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn frequency_bin_count(&self) -> usize {
        self.analyser.frequency_bin_count()
    }

    /// Advance one frame. Past the end of the media the analyser is fed
    /// silence, so the spectrum decays instead of freezing.
    fn read_frequency_data(&mut self, out: &mut [u8]) {
        if self.started {
            if self.is_finished() {
                self.analyser.push_samples(&vec![0.0; self.samples_per_frame]);
            } else {
                let end = (self.position + self.samples_per_frame).min(self.samples.len());
                self.analyser.push_samples(&self.samples[self.position..end]);
                self.position = end;
            }
        }
        self.analyser.byte_frequency_data(out);
    }

    fn close(self) {
        debug!("Offline graph closed at sample {}", self.position);
    }
}
