use glam::Vec2;

use super::RadialGradient;

/// Pixel dimensions of the drawing surface, fixed when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}

/// A 2D immediate-mode drawing context in the style of an HTML canvas.
///
/// Paths are recorded in user space. The transform that is current when
/// [`DrawingSurface::fill`] runs is applied to both the path and the fill
/// style, so a scale set up between path construction and `fill` grows the
/// filled shape around the transform origin.
pub trait DrawingSurface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Resize the backing store. Clears all content and resets state.
    fn resize(&mut self, width: u32, height: u32);

    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);

    fn begin_path(&mut self);

    fn move_to(&mut self, point: Vec2);

    fn bezier_curve_to(&mut self, control1: Vec2, control2: Vec2, end: Vec2);

    fn set_fill_style(&mut self, gradient: RadialGradient);

    /// Push the current transform and fill style.
    fn save(&mut self);

    /// Pop the state pushed by the matching [`DrawingSurface::save`].
    fn restore(&mut self);

    fn translate(&mut self, dx: f32, dy: f32);

    fn scale(&mut self, sx: f32, sy: f32);

    /// Fill the current path with the current fill style (non-zero winding).
    fn fill(&mut self);

    fn viewport(&self) -> Viewport {
        Viewport::new(self.width(), self.height())
    }
}
