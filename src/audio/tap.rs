use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::warn;
use rodio::Source;
use std::time::Duration;

use super::FrequencyAnalyser;

/// Mono samples per block sent from the audio thread.
const TAP_BLOCK_SIZE: usize = 512;
/// Blocks buffered between the audio thread and the next frame.
const TAP_CHANNEL_CAPACITY: usize = 64;

/// Split `source` into a pass-through source for the output device and the
/// analyser that observes it.
pub fn analyser_tap<S>(source: S, fft_size: usize) -> Result<(AnalyserTap<S>, AnalyserNode)>
where
    S: Source<Item = f32>,
{
    let analyser = FrequencyAnalyser::new(fft_size)?;
    let (sender, receiver) = crossbeam_channel::bounded(TAP_CHANNEL_CAPACITY);

    let tap = AnalyserTap {
        inner: source,
        sender,
        block: Vec::with_capacity(TAP_BLOCK_SIZE),
        frame_sum: 0.0,
        frame_fill: 0,
        dropped_blocks: 0,
    };

    Ok((tap, AnalyserNode { analyser, receiver }))
}

/// Pass-through source that mixes what it yields down to mono and forwards
/// it in blocks to an [`AnalyserNode`].
///
/// Runs on the output device's mixer thread, so it never blocks: blocks are
/// dropped when the analyser side falls behind.
pub struct AnalyserTap<S> {
    inner: S,
    sender: Sender<Vec<f32>>,
    block: Vec<f32>,
    frame_sum: f32,
    frame_fill: u16,
    dropped_blocks: u64,
}

impl<S> AnalyserTap<S>
where
    S: Source<Item = f32>,
{
    fn flush(&mut self) {
        if self.block.is_empty() {
            return;
        }
        let block = std::mem::replace(&mut self.block, Vec::with_capacity(TAP_BLOCK_SIZE));
        match self.sender.try_send(block) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped_blocks += 1;
                if self.dropped_blocks % 100 == 1 {
                    warn!("Analyser is not keeping up, dropped {} audio blocks", self.dropped_blocks);
                }
            }
            // Analyser side closed; keep playing.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl<S> Iterator for AnalyserTap<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let Some(sample) = self.inner.next() else {
            self.flush();
            return None;
        };

        let channels = self.inner.channels().max(1);
        self.frame_sum += sample;
        self.frame_fill += 1;
        if self.frame_fill >= channels {
            self.block.push(self.frame_sum / channels as f32);
            self.frame_sum = 0.0;
            self.frame_fill = 0;
            if self.block.len() >= TAP_BLOCK_SIZE {
                self.flush();
            }
        }

        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Source for AnalyserTap<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// Frame-side half of the tap: drains forwarded audio into a
/// [`FrequencyAnalyser`].
pub struct AnalyserNode {
    analyser: FrequencyAnalyser,
    receiver: Receiver<Vec<f32>>,
}

impl AnalyserNode {
    pub fn frequency_bin_count(&self) -> usize {
        self.analyser.frequency_bin_count()
    }

    pub fn read_frequency_data(&mut self, out: &mut [u8]) {
        while let Ok(block) = self.receiver.try_recv() {
            self.analyser.push_samples(&block);
        }
        self.analyser.byte_frequency_data(out);
    }
}
