use std::time::Instant;

/// Identifies one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// "Call me on the next frame" primitive driving the render loop.
///
/// At most one request is outstanding at a time: the loop only asks for the
/// next frame from inside the current one.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;

    /// Withdraw a request. Unknown or already fired handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Host side: take the outstanding request, with the elapsed
    /// milliseconds since the loop started.
    fn take_due(&mut self) -> Option<(FrameHandle, f64)>;

    /// Drop any outstanding request and restart elapsed time at zero.
    fn reset(&mut self);
}

/// Wall-clock scheduler for windowed playback. The host calls
/// [`FrameScheduler::take_due`] once per redraw.
#[derive(Debug, Default)]
pub struct FrameClock {
    origin: Option<Instant>,
    next_id: u64,
    pending: Option<FrameHandle>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl FrameScheduler for FrameClock {
    fn request_frame(&mut self) -> FrameHandle {
        self.origin.get_or_insert_with(Instant::now);
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            // next request starts a new loop
            self.origin = None;
        }
    }

    fn take_due(&mut self) -> Option<(FrameHandle, f64)> {
        let handle = self.pending.take()?;
        let elapsed_ms = self
            .origin
            .map_or(0.0, |origin| origin.elapsed().as_secs_f64() * 1000.0);
        Some((handle, elapsed_ms))
    }

    fn reset(&mut self) {
        self.pending = None;
        self.origin = None;
    }
}

/// Deterministic scheduler: every fired frame advances time by a fixed
/// interval. Used for offline rendering and tests.
#[derive(Debug)]
pub struct SteppedClock {
    frame_ms: f64,
    elapsed_ms: f64,
    next_id: u64,
    pending: Option<FrameHandle>,
    requested: u64,
    cancelled: u64,
}

impl SteppedClock {
    pub fn new(frames_per_second: f64) -> Self {
        Self {
            frame_ms: 1000.0 / frames_per_second,
            elapsed_ms: 0.0,
            next_id: 0,
            pending: None,
            requested: 0,
            cancelled: 0,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Total requests made so far.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Requests withdrawn before they fired.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl FrameScheduler for SteppedClock {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        self.requested += 1;
        let handle = FrameHandle(self.next_id);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
            self.elapsed_ms = 0.0;
        }
    }

    fn take_due(&mut self) -> Option<(FrameHandle, f64)> {
        let handle = self.pending.take()?;
        self.elapsed_ms += self.frame_ms;
        Some((handle, self.elapsed_ms))
    }

    fn reset(&mut self) {
        self.pending = None;
        self.elapsed_ms = 0.0;
    }
}
