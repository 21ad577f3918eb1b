use glam::{Affine2, Vec2};

use super::{DrawingSurface, RadialGradient, Rgba};

/// Line segments used to approximate each cubic bezier.
const CURVE_SEGMENTS: usize = 24;

#[derive(Debug, Clone)]
struct CanvasState {
    transform: Affine2,
    fill_style: Option<RadialGradient>,
}

/// Software RGBA8 drawing surface.
///
/// Pixels are stored row-major, top-left origin, with straight alpha. Fills
/// sample each pixel at its center (no anti-aliasing) and composite with
/// source-over.
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    subpaths: Vec<Vec<Vec2>>,
    state: CanvasState,
    saved: Vec<CanvasState>,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; Self::buffer_len(width, height)],
            subpaths: Vec::new(),
            state: CanvasState {
                transform: Affine2::IDENTITY,
                fill_style: None,
            },
            saved: Vec::new(),
        }
    }

    fn buffer_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[index..index + 4]);
        Some(out)
    }

    /// Number of pixels with non-zero alpha.
    pub fn painted_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[3] > 0).count()
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba) {
        let src_a = color.a.clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }

        let index = (y as usize * self.width as usize + x as usize) * 4;
        let dst = &mut self.pixels[index..index + 4];
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);

        let src = [color.r, color.g, color.b];
        for (channel, src_c) in dst.iter_mut().take(3).zip(src) {
            let value = (src_c.clamp(0.0, 255.0) * src_a + *channel as f32 * dst_a * (1.0 - src_a)) / out_a;
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (out_a * 255.0).round() as u8;
    }

    fn flatten_cubic(p0: Vec2, c1: Vec2, c2: Vec2, end: Vec2, out: &mut Vec<Vec2>) {
        for i in 1..=CURVE_SEGMENTS {
            let t = i as f32 / CURVE_SEGMENTS as f32;
            let mt = 1.0 - t;
            let point = p0 * (mt * mt * mt)
                + c1 * (3.0 * mt * mt * t)
                + c2 * (3.0 * mt * t * t)
                + end * (t * t * t);
            out.push(point);
        }
    }

    fn fill_span(&mut self, row: u32, x0: f32, x1: f32, gradient: &RadialGradient, inverse: &Affine2) {
        let start = (x0 - 0.5).ceil().max(0.0);
        let end = (x1 - 0.5).ceil().min(self.width as f32);
        if start >= end {
            return;
        }

        let sample_y = row as f32 + 0.5;
        for x in start as u32..end as u32 {
            let user = inverse.transform_point2(Vec2::new(x as f32 + 0.5, sample_y));
            if let Some(color) = gradient.color_at(user) {
                self.blend(x, row, color);
            }
        }
    }
}

impl DrawingSurface for PixelCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        // Only translate/scale are exposed, so the transformed rect stays axis-aligned.
        let a = self.state.transform.transform_point2(Vec2::new(x, y));
        let b = self.state.transform.transform_point2(Vec2::new(x + width, y + height));
        let (min, max) = (a.min(b), a.max(b));

        let x0 = min.x.round().clamp(0.0, self.width as f32) as usize;
        let x1 = max.x.round().clamp(0.0, self.width as f32) as usize;
        let y0 = min.y.round().clamp(0.0, self.height as f32) as usize;
        let y1 = max.y.round().clamp(0.0, self.height as f32) as usize;

        let stride = self.width as usize * 4;
        for row in y0..y1 {
            self.pixels[row * stride + x0 * 4..row * stride + x1 * 4].fill(0);
        }
    }

    fn begin_path(&mut self) {
        self.subpaths.clear();
    }

    fn move_to(&mut self, point: Vec2) {
        self.subpaths.push(vec![point]);
    }

    fn bezier_curve_to(&mut self, control1: Vec2, control2: Vec2, end: Vec2) {
        if self.subpaths.is_empty() {
            self.subpaths.push(vec![control1]);
        }
        if let Some(subpath) = self.subpaths.last_mut() {
            let start = subpath.last().copied().unwrap_or(control1);
            Self::flatten_cubic(start, control1, control2, end, subpath);
        }
    }

    fn set_fill_style(&mut self, gradient: RadialGradient) {
        self.state.fill_style = Some(gradient);
    }

    fn save(&mut self) {
        self.saved.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.state.transform = self.state.transform * Affine2::from_translation(Vec2::new(dx, dy));
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.state.transform = self.state.transform * Affine2::from_scale(Vec2::new(sx, sy));
    }

    fn fill(&mut self) {
        let Some(gradient) = self.state.fill_style.clone() else {
            return;
        };
        let transform = self.state.transform;
        let inverse = transform.inverse();

        let polygons: Vec<Vec<Vec2>> = self
            .subpaths
            .iter()
            .filter(|subpath| subpath.len() >= 2)
            .map(|subpath| subpath.iter().map(|&p| transform.transform_point2(p)).collect())
            .collect();
        if polygons.is_empty() {
            return;
        }

        let (min_y, max_y) = polygons
            .iter()
            .flatten()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let first_row = (min_y - 0.5).ceil().max(0.0) as u32;
        let last_row = (max_y - 0.5).ceil().clamp(0.0, self.height as f32) as u32;

        let mut crossings: Vec<(f32, i32)> = Vec::new();
        for row in first_row..last_row {
            let sample_y = row as f32 + 0.5;
            crossings.clear();

            for polygon in &polygons {
                // Subpaths close implicitly, so the last edge wraps to the first point.
                for (i, &a) in polygon.iter().enumerate() {
                    let b = polygon[(i + 1) % polygon.len()];
                    if (a.y <= sample_y) != (b.y <= sample_y) {
                        let t = (sample_y - a.y) / (b.y - a.y);
                        let winding = if b.y > a.y { 1 } else { -1 };
                        crossings.push((a.x + t * (b.x - a.x), winding));
                    }
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for i in 0..crossings.len().saturating_sub(1) {
                winding += crossings[i].1;
                if winding != 0 {
                    let (x0, x1) = (crossings[i].0, crossings[i + 1].0);
                    self.fill_span(row, x0, x1, &gradient, &inverse);
                }
            }
        }
    }
}
