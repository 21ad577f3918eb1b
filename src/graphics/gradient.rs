use glam::Vec2;

/// Straight (non-premultiplied) color. Channels are 0-255 like CSS `rgba()`,
/// alpha is 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn lerp(self, other: Rgba, t: f32) -> Rgba {
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba,
}

/// Radial gradient between two concentric circles.
///
/// Points inside the inner circle take the first stop's color and points
/// outside the outer circle take the last stop's color.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub center: Vec2,
    pub inner_radius: f32,
    pub outer_radius: f32,
    stops: Vec<ColorStop>,
}

impl RadialGradient {
    pub fn new(center: Vec2, inner_radius: f32, outer_radius: f32) -> Self {
        Self {
            center,
            inner_radius,
            outer_radius,
            stops: Vec::new(),
        }
    }

    /// Stops are kept sorted by offset; equal offsets keep insertion order.
    pub fn add_color_stop(&mut self, offset: f32, color: Rgba) {
        let offset = offset.clamp(0.0, 1.0);
        let index = self.stops.partition_point(|stop| stop.offset <= offset);
        self.stops.insert(index, ColorStop { offset, color });
    }

    pub fn with_stop(mut self, offset: f32, color: Rgba) -> Self {
        self.add_color_stop(offset, color);
        self
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at `point`, or `None` where the gradient paints nothing
    /// (no stops, or both circles have the same radius).
    pub fn color_at(&self, point: Vec2) -> Option<Rgba> {
        let first = self.stops.first()?;
        let span = self.outer_radius - self.inner_radius;
        if span == 0.0 {
            return None;
        }

        let t = ((point.distance(self.center) - self.inner_radius) / span).clamp(0.0, 1.0);
        if t <= first.offset {
            return Some(first.color);
        }

        for pair in self.stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t <= hi.offset {
                let width = hi.offset - lo.offset;
                if width <= f32::EPSILON {
                    return Some(hi.color);
                }
                return Some(lo.color.lerp(hi.color, (t - lo.offset) / width));
            }
        }

        self.stops.last().map(|stop| stop.color)
    }
}
