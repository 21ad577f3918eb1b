//! Audio-reactive inkblot visualizer.
//!
//! A [`session::VisualizerSession`] plays a media file through an audio
//! graph, and on every scheduled frame draws a mirrored bezier blot whose
//! size follows the average spectral energy.

pub mod audio;
pub mod effects;
pub mod graphics;
pub mod scheduler;
pub mod session;

pub use session::VisualizerSession;
