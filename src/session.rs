use anyhow::{anyhow, Result};
use log::{debug, info, trace, warn};
use std::path::PathBuf;

use crate::audio::{AudioBackend, AudioGraph, FFT_SIZE};
use crate::effects::{render_frame, FrameStats};
use crate::graphics::{DrawingSurface, Viewport};
use crate::scheduler::{FrameHandle, FrameScheduler};

/// Frames between periodic debug logs (~2 seconds at 60fps).
const LOG_EVERY_FRAMES: u64 = 120;

/// One start-to-stop lifetime of the visualizer.
///
/// Owns the drawing surface handle, at most one audio graph, and at most one
/// pending frame request. Dropping a playing session stops it.
pub struct VisualizerSession<S, B, F>
where
    S: DrawingSurface,
    B: AudioBackend,
    F: FrameScheduler,
{
    surface: Option<S>,
    backend: B,
    scheduler: F,
    media: PathBuf,
    graph: Option<B::Graph>,
    playing: bool,
    pending_frame: Option<FrameHandle>,
    frequency_data: Vec<u8>,
    frames_rendered: u64,
}

impl<S, B, F> VisualizerSession<S, B, F>
where
    S: DrawingSurface,
    B: AudioBackend,
    F: FrameScheduler,
{
    pub fn new(surface: S, backend: B, scheduler: F, media: impl Into<PathBuf>) -> Self {
        Self {
            surface: Some(surface),
            backend,
            scheduler,
            media: media.into(),
            graph: None,
            playing: false,
            pending_frame: None,
            frequency_data: Vec::new(),
            frames_rendered: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Install a surface, returning the one it replaces.
    pub fn attach_surface(&mut self, surface: S) -> Option<S> {
        self.surface.replace(surface)
    }

    /// Remove the surface. A running loop halts at its next frame.
    pub fn detach_surface(&mut self) -> Option<S> {
        self.surface.take()
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }

    pub fn graph(&self) -> Option<&B::Graph> {
        self.graph.as_ref()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Size the surface, build and start the audio graph, and request the
    /// first frame.
    ///
    /// Returns `Ok(false)` without doing anything if already playing.
    pub fn start(&mut self, viewport: Viewport) -> Result<bool> {
        if self.playing {
            debug!("Start ignored, session already playing");
            return Ok(false);
        }

        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| anyhow!("No drawing surface attached"))?;
        surface.resize(viewport.width, viewport.height);

        let mut graph = self.backend.build_graph(&self.media, FFT_SIZE)?;
        if let Err(e) = graph.start() {
            graph.close();
            return Err(e);
        }

        self.frequency_data = vec![0; graph.frequency_bin_count()];
        self.graph = Some(graph);
        self.playing = true;
        self.frames_rendered = 0;
        self.pending_frame = Some(self.scheduler.request_frame());

        info!(
            "Visualizer started: {:?} on {}x{}",
            self.media, viewport.width, viewport.height
        );
        Ok(true)
    }

    /// Cancel the pending frame and release the audio graph.
    ///
    /// Returns `false` without doing anything if not playing.
    pub fn stop(&mut self) -> bool {
        if !self.playing {
            return false;
        }

        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        // A halted loop leaves nothing to cancel; time must still restart.
        self.scheduler.reset();
        self.playing = false;
        if let Some(graph) = self.graph.take() {
            graph.close();
        }

        info!("Visualizer stopped after {} frames", self.frames_rendered);
        true
    }

    /// Frame callback for `handle`.
    ///
    /// Renders one frame and requests the next. Handles that are no longer
    /// pending (cancelled by [`Self::stop`]) are ignored. Without a surface
    /// the frame is skipped and no further frame is requested, halting the
    /// loop until it is restarted.
    pub fn run_frame(&mut self, handle: FrameHandle, elapsed_ms: f64) -> Option<FrameStats> {
        if self.pending_frame != Some(handle) {
            trace!("Ignoring stale frame {:?}", handle);
            return None;
        }
        self.pending_frame = None;

        let Some(surface) = self.surface.as_mut() else {
            warn!("No drawing surface, visualization halted");
            return None;
        };
        let graph = self.graph.as_mut()?;

        graph.read_frequency_data(&mut self.frequency_data);
        let stats = render_frame(surface, &self.frequency_data, elapsed_ms);

        self.frames_rendered += 1;
        if self.frames_rendered % LOG_EVERY_FRAMES == 0 {
            debug!(
                "Frame {}: t={:.0}ms energy={:.1} scale={:.3}",
                self.frames_rendered, stats.elapsed_ms, stats.energy, stats.scale
            );
        }

        self.pending_frame = Some(self.scheduler.request_frame());
        Some(stats)
    }

    /// Fire the scheduler's due frame, if any.
    pub fn pump(&mut self) -> Option<FrameStats> {
        let (handle, elapsed_ms) = self.scheduler.take_due()?;
        self.run_frame(handle, elapsed_ms)
    }
}

impl<S, B, F> Drop for VisualizerSession<S, B, F>
where
    S: DrawingSurface,
    B: AudioBackend,
    F: FrameScheduler,
{
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineBackend;
    use crate::graphics::{DrawCommand, PixelCanvas, RecordingSurface};
    use crate::scheduler::SteppedClock;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct GraphEvents {
        built: usize,
        started: usize,
        closed: usize,
        reads: usize,
    }

    struct FakeBackend {
        events: Rc<RefCell<GraphEvents>>,
        level: u8,
        fail_build: bool,
    }

    struct FakeGraph {
        events: Rc<RefCell<GraphEvents>>,
        level: u8,
    }

    impl AudioGraph for FakeGraph {
        fn start(&mut self) -> Result<()> {
            self.events.borrow_mut().started += 1;
            Ok(())
        }

        fn frequency_bin_count(&self) -> usize {
            FFT_SIZE / 2
        }

        fn read_frequency_data(&mut self, out: &mut [u8]) {
            self.events.borrow_mut().reads += 1;
            out.fill(self.level);
        }

        fn close(self) {
            self.events.borrow_mut().closed += 1;
        }
    }

    impl AudioBackend for FakeBackend {
        type Graph = FakeGraph;

        fn build_graph(&mut self, _media: &Path, fft_size: usize) -> Result<FakeGraph> {
            assert_eq!(fft_size, 2048);
            if self.fail_build {
                return Err(anyhow!("decoder exploded"));
            }
            self.events.borrow_mut().built += 1;
            Ok(FakeGraph {
                events: Rc::clone(&self.events),
                level: self.level,
            })
        }
    }

    type TestSession = VisualizerSession<RecordingSurface, FakeBackend, SteppedClock>;

    fn session(level: u8) -> (TestSession, Rc<RefCell<GraphEvents>>) {
        let events = Rc::new(RefCell::new(GraphEvents::default()));
        let backend = FakeBackend {
            events: Rc::clone(&events),
            level,
            fail_build: false,
        };
        let session = VisualizerSession::new(
            RecordingSurface::default(),
            backend,
            SteppedClock::new(60.0),
            "song.mp3",
        );
        (session, events)
    }

    const VIEWPORT: Viewport = Viewport { width: 800, height: 600 };

    #[test]
    fn test_start_builds_graph_and_requests_frame() {
        let (mut session, events) = session(0);
        assert!(session.start(VIEWPORT).unwrap());

        assert!(session.is_playing());
        assert!(session.pending_frame().is_some());
        assert_eq!(session.scheduler().requested(), 1);
        assert_eq!(events.borrow().built, 1);
        assert_eq!(events.borrow().started, 1);

        let surface = session.surface().unwrap();
        assert_eq!(surface.viewport(), VIEWPORT);
        assert_eq!(surface.commands()[0], DrawCommand::Resize { width: 800, height: 600 });
    }

    #[test]
    fn test_start_while_playing_is_ignored() {
        let (mut session, events) = session(0);
        assert!(session.start(VIEWPORT).unwrap());
        assert!(!session.start(VIEWPORT).unwrap());

        assert_eq!(events.borrow().built, 1);
        assert_eq!(session.scheduler().requested(), 1);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (mut session, events) = session(0);
        assert!(!session.stop());
        assert!(!session.is_playing());
        assert_eq!(events.borrow().closed, 0);
        assert_eq!(session.scheduler().cancelled(), 0);
    }

    #[test]
    fn test_start_then_stop_renders_nothing() {
        let (mut session, events) = session(255);
        session.start(VIEWPORT).unwrap();
        assert!(session.stop());

        assert!(session.pump().is_none());
        assert_eq!(session.frames_rendered(), 0);
        assert_eq!(events.borrow().closed, 1);
        assert_eq!(session.scheduler().cancelled(), 1);
        assert!(session.pending_frame().is_none());
        assert!(session.graph().is_none());
    }

    #[test]
    fn test_frame_fired_after_stop_is_ignored() {
        let (mut session, events) = session(255);
        session.start(VIEWPORT).unwrap();
        let (handle, elapsed) = session.scheduler_mut().take_due().unwrap();
        session.stop();

        assert!(session.run_frame(handle, elapsed).is_none());
        assert_eq!(events.borrow().reads, 0);
    }

    #[test]
    fn test_loop_renders_once_per_frame() {
        let (mut session, events) = session(255);
        session.start(VIEWPORT).unwrap();

        let stats: Vec<FrameStats> = (0..3).filter_map(|_| session.pump()).collect();
        assert_eq!(stats.len(), 3);
        assert!(stats.windows(2).all(|w| w[1].elapsed_ms > w[0].elapsed_ms));
        assert!(stats.iter().all(|s| (s.scale - 1.1).abs() < 1e-6));

        assert_eq!(session.frames_rendered(), 3);
        assert_eq!(events.borrow().reads, 3);
        assert_eq!(session.scheduler().requested(), 4);
        let fills = session.surface().unwrap().count(|c| *c == DrawCommand::Fill);
        assert_eq!(fills, 3);
    }

    #[test]
    fn test_silent_audio_renders_unscaled() {
        let (mut session, _) = session(0);
        session.start(VIEWPORT).unwrap();
        let stats = session.pump().unwrap();
        assert_eq!(stats.energy, 0.0);
        assert_eq!(stats.scale, 1.0);
    }

    #[test]
    fn test_missing_surface_halts_loop() {
        let (mut session, events) = session(10);
        session.start(VIEWPORT).unwrap();
        assert!(session.detach_surface().is_some());

        assert!(session.pump().is_none());
        assert!(session.pending_frame().is_none());
        assert!(!session.scheduler().has_pending());
        assert_eq!(events.borrow().reads, 0);
        assert!(session.is_playing());

        assert!(session.stop());
        assert_eq!(events.borrow().closed, 1);
    }

    #[test]
    fn test_start_without_surface_fails() {
        let (mut session, events) = session(0);
        session.detach_surface();

        assert!(session.start(VIEWPORT).is_err());
        assert!(!session.is_playing());
        assert_eq!(events.borrow().built, 0);
    }

    #[test]
    fn test_failed_graph_build_leaves_session_idle() {
        let (mut session, _) = session(0);
        let events = Rc::new(RefCell::new(GraphEvents::default()));
        session.backend = FakeBackend {
            events,
            level: 0,
            fail_build: true,
        };

        let err = session.start(VIEWPORT).unwrap_err();
        assert!(err.to_string().contains("decoder exploded"));
        assert!(!session.is_playing());
        assert!(session.pending_frame().is_none());
        assert_eq!(session.scheduler().requested(), 0);
    }

    #[test]
    fn test_restart_after_stop() {
        let (mut session, events) = session(0);
        session.start(VIEWPORT).unwrap();
        session.pump();
        session.stop();

        assert!(session.start(VIEWPORT).unwrap());
        assert!(session.pump().is_some());
        assert_eq!(events.borrow().built, 2);
        assert_eq!(events.borrow().closed, 1);
    }

    #[test]
    fn test_restart_after_halted_loop_starts_time_at_zero() {
        let (mut session, _) = session(0);
        session.start(VIEWPORT).unwrap();
        let first = session.pump().unwrap();

        let surface = session.detach_surface().unwrap();
        assert!(session.pump().is_none());
        assert!(session.stop());

        session.attach_surface(surface);
        session.start(VIEWPORT).unwrap();
        let restarted = session.pump().unwrap();
        assert_eq!(restarted.elapsed_ms, first.elapsed_ms);
    }

    #[test]
    fn test_stop_between_take_and_run_restarts_time() {
        let (mut session, _) = session(0);
        session.start(VIEWPORT).unwrap();
        let first = session.pump().unwrap();
        session.scheduler_mut().take_due().unwrap();
        session.stop();

        session.start(VIEWPORT).unwrap();
        assert_eq!(session.pump().unwrap().elapsed_ms, first.elapsed_ms);
    }

    #[test]
    fn test_drop_while_playing_releases_graph() {
        let (mut session, events) = session(0);
        session.start(VIEWPORT).unwrap();
        drop(session);
        assert_eq!(events.borrow().closed, 1);
    }

    #[test]
    fn test_drop_when_idle_releases_nothing() {
        let (session, events) = session(0);
        drop(session);
        assert_eq!(events.borrow().closed, 0);
    }

    #[test]
    fn test_offline_pipeline_paints_canvas() {
        let wav = crate::audio::offline::tests::write_tone_wav(2, 1.0);
        let mut session = VisualizerSession::new(
            PixelCanvas::new(1, 1),
            OfflineBackend::new(60.0).unwrap(),
            SteppedClock::new(60.0),
            wav.path(),
        );

        session.start(Viewport::new(240, 180)).unwrap();
        let stats: Vec<FrameStats> = (0..10).filter_map(|_| session.pump()).collect();
        session.stop();

        assert_eq!(stats.len(), 10);
        let last = stats.last().unwrap();
        assert!(last.energy > 0.0);
        assert!(last.scale > 1.0 && last.scale <= 1.1);

        let canvas = session.surface().unwrap();
        assert_eq!(canvas.viewport(), Viewport::new(240, 180));
        assert!(canvas.painted_pixels() > 0);
    }
}
