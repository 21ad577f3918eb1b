use serde::Serialize;

use super::inkblot_shape;
use crate::graphics::{DrawingSurface, RadialGradient, Rgba, Viewport};

/// Inner radius of the fill gradient, in pixels.
pub const GRADIENT_INNER_RADIUS: f32 = 10.0;
/// Extra size at full audio energy (0.1 = 10% larger).
pub const MAX_ENERGY_SCALE: f32 = 0.1;

/// Values derived while rendering one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStats {
    pub elapsed_ms: f64,
    pub energy: f32,
    pub scale: f32,
}

/// Arithmetic mean of the frequency bins, 0.0-255.0.
///
/// Callers always pass the analyser's full bin buffer; an empty slice reads
/// as silence in release builds.
pub fn average_energy(samples: &[u8]) -> f32 {
    debug_assert!(!samples.is_empty(), "frequency buffer must not be empty");
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.iter().map(|&s| s as u64).sum();
    (sum as f64 / samples.len() as f64) as f32
}

/// Map average energy to a uniform scale in [1.0, 1.1].
pub fn energy_scale(energy: f32) -> f32 {
    1.0 + (energy.clamp(0.0, 255.0) / 255.0) * MAX_ENERGY_SCALE
}

/// Fill gradient for a frame. Colors cycle with wall-clock time only.
///
/// The outer radius follows the width alone, so tall viewports clip the
/// gradient vertically.
pub fn frame_gradient(viewport: Viewport, elapsed_ms: f64) -> RadialGradient {
    let cycle = elapsed_ms.rem_euclid(255.0) as f32;
    RadialGradient::new(viewport.center(), GRADIENT_INNER_RADIUS, viewport.width as f32 / 2.0)
        .with_stop(0.0, Rgba::new(cycle, 0.0, 0.0, 0.8))
        .with_stop(1.0, Rgba::new(0.0, 0.0, 255.0 - cycle, 0.2))
}

/// Draw one frame of the visualizer onto `surface`.
///
/// The blot is filled under a scale about the viewport center derived from
/// the frequency data; the transform is restored before returning.
pub fn render_frame<S: DrawingSurface + ?Sized>(surface: &mut S, samples: &[u8], elapsed_ms: f64) -> FrameStats {
    let viewport = surface.viewport();
    let (width, height) = (viewport.width as f32, viewport.height as f32);

    surface.clear_rect(0.0, 0.0, width, height);
    surface.set_fill_style(frame_gradient(viewport, elapsed_ms));

    inkblot_shape(viewport, elapsed_ms / 1000.0).trace(surface);

    let energy = average_energy(samples);
    let scale = energy_scale(energy);

    let center = viewport.center();
    surface.save();
    surface.translate(center.x, center.y);
    surface.scale(scale, scale);
    surface.translate(-center.x, -center.y);
    surface.fill();
    surface.restore();

    FrameStats {
        elapsed_ms,
        energy,
        scale,
    }
}
