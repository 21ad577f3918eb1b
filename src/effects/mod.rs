pub mod inkblot;
pub mod renderer;

pub use inkblot::{inkblot_shape, BlotHalf, CubicSegment, InkblotShape};
pub use renderer::{average_energy, energy_scale, frame_gradient, render_frame, FrameStats};
