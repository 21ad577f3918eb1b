use anyhow::{Context, Result};
use log::info;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::{analyser_tap, AnalyserNode, AudioBackend, AudioGraph};

/// Plays media on the default output device.
pub struct RodioBackend {
    #[allow(dead_code)]
    stream: OutputStream,
    stream_handle: OutputStreamHandle,
}

impl RodioBackend {
    pub fn new() -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .context("Failed to open the default audio output")?;

        Ok(Self {
            stream,
            stream_handle,
        })
    }
}

impl AudioBackend for RodioBackend {
    type Graph = PlaybackGraph;

    /// decoder -> analyser tap -> sink on the output stream. The sink starts
    /// paused until [`AudioGraph::start`].
    fn build_graph(&mut self, media: &Path, fft_size: usize) -> Result<PlaybackGraph> {
        let file = BufReader::new(
            File::open(media).with_context(|| format!("Failed to open {}", media.display()))?,
        );
        let source = Decoder::new(file)
            .with_context(|| format!("Unsupported audio format: {}", media.display()))?;
        let (sample_rate, channels) = (source.sample_rate(), source.channels());

        let (tap, analyser) = analyser_tap(source.convert_samples::<f32>(), fft_size)?;

        let sink = Sink::try_new(&self.stream_handle)?;
        sink.append(tap);
        sink.pause();

        info!(
            "Built audio graph for {:?} ({}Hz, {} channels, fft size {})",
            media, sample_rate, channels, fft_size
        );

        Ok(PlaybackGraph { sink, analyser })
    }
}

pub struct PlaybackGraph {
    sink: Sink,
    analyser: AnalyserNode,
}

impl AudioGraph for PlaybackGraph {
    fn start(&mut self) -> Result<()> {
        self.sink.play();
        info!("Audio playback started");
        Ok(())
    }

    fn frequency_bin_count(&self) -> usize {
        self.analyser.frequency_bin_count()
    }

    fn read_frequency_data(&mut self, out: &mut [u8]) {
        self.analyser.read_frequency_data(out);
    }

    fn close(self) {
        self.sink.stop();
        info!("Audio graph closed");
    }
}
