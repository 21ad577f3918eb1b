pub mod analyser;
pub mod offline;
pub mod playback;
pub mod tap;

pub use analyser::{FrequencyAnalyser, FFT_SIZE};
pub use offline::{decode_mono, OfflineBackend, OfflineGraph};
pub use playback::{PlaybackGraph, RodioBackend};
pub use tap::{analyser_tap, AnalyserNode, AnalyserTap};

use anyhow::Result;
use std::path::Path;

/// An audio-processing graph for one play session: a media source feeding a
/// frequency analyser on its way to the output.
pub trait AudioGraph {
    /// Begin playback.
    fn start(&mut self) -> Result<()>;

    /// Length of the buffer [`AudioGraph::read_frequency_data`] fills.
    fn frequency_bin_count(&self) -> usize;

    /// Copy the current spectrum into `out`, one byte (0-255) per bin.
    fn read_frequency_data(&mut self, out: &mut [u8]);

    /// Stop playback and release the graph's resources.
    fn close(self);
}

/// Builds [`AudioGraph`]s from media files.
pub trait AudioBackend {
    type Graph: AudioGraph;

    fn build_graph(&mut self, media: &Path, fft_size: usize) -> Result<Self::Graph>;
}
