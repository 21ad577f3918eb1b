use glam::Vec2;

use crate::graphics::{DrawingSurface, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub control1: Vec2,
    pub control2: Vec2,
    pub end: Vec2,
}

/// One side of the blot: a subpath of three cubic segments that starts and
/// ends at the top of the center line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlotHalf {
    pub start: Vec2,
    pub segments: [CubicSegment; 3],
}

impl BlotHalf {
    pub fn end(&self) -> Vec2 {
        self.segments[2].end
    }

    /// Start point followed by every control and end point, in path order.
    pub fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        std::iter::once(self.start).chain(
            self.segments
                .iter()
                .flat_map(|seg| [seg.control1, seg.control2, seg.end]),
        )
    }
}

/// Outline of the blot for one point in time. `halves[1]` is `halves[0]`
/// reflected across `x = center_x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkblotShape {
    pub center_x: f32,
    pub halves: [BlotHalf; 2],
}

impl InkblotShape {
    /// Replace the surface's current path with this outline.
    pub fn trace<S: DrawingSurface + ?Sized>(&self, surface: &mut S) {
        surface.begin_path();
        for half in &self.halves {
            surface.move_to(half.start);
            for seg in &half.segments {
                surface.bezier_curve_to(seg.control1, seg.control2, seg.end);
            }
        }
    }
}

/// Build the blot outline for `t` seconds of elapsed time.
///
/// Control points are smooth periodic functions of `t`, so successive frames
/// morph without jumps. Every horizontal term is an offset from the center
/// line, and the second half negates those offsets.
pub fn inkblot_shape(viewport: Viewport, t: f64) -> InkblotShape {
    let (s, c) = (t.sin() as f32, t.cos() as f32);
    let center = viewport.center();
    let (cx, cy) = (center.x, center.y);
    let height = viewport.height as f32;

    // (x offset from center, absolute y) for control1, control2, end
    let outline: [[(f32, f32); 3]; 3] = [
        [
            (100.0 * s, cy - 100.0 * c),
            (-150.0 * c, cy + 100.0 * s),
            (0.0, height),
        ],
        [
            (80.0 * c, cy + 80.0 * s),
            (150.0 * s, cy - 50.0 * c),
            (50.0 * c, cy - 150.0 * s),
        ],
        [
            (20.0 * s, cy - 180.0 * c),
            (-60.0 * c, cy - 120.0 * s),
            (0.0, 0.0),
        ],
    ];

    let half = |mirror: f32| {
        let point = |(dx, y): (f32, f32)| Vec2::new(cx + mirror * dx, y);
        BlotHalf {
            start: Vec2::new(cx, 0.0),
            segments: outline.map(|[c1, c2, end]| CubicSegment {
                control1: point(c1),
                control2: point(c2),
                end: point(end),
            }),
        }
    };

    InkblotShape {
        center_x: cx,
        halves: [half(1.0), half(-1.0)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{DrawCommand, RecordingSurface};
    use proptest::prelude::*;

    const EPSILON: f32 = 1e-3;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < EPSILON
    }

    proptest! {
        #[test]
        fn prop_halves_mirror_across_center(
            t in -1.0e4f64..1.0e4,
            width in 1u32..4096,
            height in 1u32..4096,
        ) {
            let shape = inkblot_shape(Viewport::new(width, height), t);
            let cx = shape.center_x;

            for (left, right) in shape.halves[0].points().zip(shape.halves[1].points()) {
                let mirrored = Vec2::new(2.0 * cx - left.x, left.y);
                // rounding grows with the size of the coordinates
                prop_assert!((mirrored - right).abs().max_element() < 1e-2, "{:?} vs {:?}", left, right);
            }
        }

        #[test]
        fn prop_each_half_starts_and_ends_at_top_center(
            t in -1.0e4f64..1.0e4,
            width in 1u32..4096,
            height in 1u32..4096,
        ) {
            let viewport = Viewport::new(width, height);
            let top_center = Vec2::new(viewport.center().x, 0.0);
            for half in &inkblot_shape(viewport, t).halves {
                prop_assert_eq!(half.start, top_center);
                prop_assert_eq!(half.end(), top_center);
            }
        }
    }

    #[test]
    fn test_800x600_at_time_zero() {
        let shape = inkblot_shape(Viewport::new(800, 600), 0.0);
        let first = &shape.halves[0];

        assert_eq!(first.start, Vec2::new(400.0, 0.0));
        assert_eq!(first.end(), Vec2::new(400.0, 0.0));
        assert_eq!(first.segments[0].end, Vec2::new(400.0, 600.0));

        // sin(0) = 0 and cos(0) = 1
        assert_eq!(first.segments[0].control1, Vec2::new(400.0, 200.0));
        assert_eq!(first.segments[0].control2, Vec2::new(250.0, 300.0));
        assert_eq!(first.segments[1].end, Vec2::new(450.0, 300.0));
        assert_eq!(first.segments[2].control1, Vec2::new(400.0, 120.0));

        assert_eq!(shape.halves[1].segments[0].control2, Vec2::new(550.0, 300.0));
        assert_eq!(shape.halves[1].segments[1].end, Vec2::new(350.0, 300.0));
    }

    #[test]
    fn test_shape_is_periodic() {
        let viewport = Viewport::new(800, 600);
        let a = inkblot_shape(viewport, 1.25);
        let b = inkblot_shape(viewport, 1.25 + std::f64::consts::TAU);
        for (p, q) in a.halves[0].points().zip(b.halves[0].points()) {
            assert!(close(p, q));
        }
    }

    #[test]
    fn test_trace_emits_two_subpaths() {
        let viewport = Viewport::new(800, 600);
        let shape = inkblot_shape(viewport, 2.0);
        let mut surface = RecordingSurface::new(800, 600);
        shape.trace(&mut surface);

        let commands = surface.commands();
        assert_eq!(commands.len(), 1 + 2 * 4);
        assert_eq!(commands[0], DrawCommand::BeginPath);
        assert_eq!(commands[1], DrawCommand::MoveTo(Vec2::new(400.0, 0.0)));
        assert_eq!(commands[5], DrawCommand::MoveTo(Vec2::new(400.0, 0.0)));
        assert_eq!(
            surface.count(|c| matches!(c, DrawCommand::BezierCurveTo { .. })),
            6
        );
        assert_eq!(
            commands[2],
            DrawCommand::BezierCurveTo {
                control1: shape.halves[0].segments[0].control1,
                control2: shape.halves[0].segments[0].control2,
                end: shape.halves[0].segments[0].end,
            }
        );
    }
}
