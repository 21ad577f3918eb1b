pub mod canvas;
pub mod engine;
pub mod gradient;
pub mod recording;
pub mod surface;
pub mod texture;
pub mod vertex;

pub use canvas::PixelCanvas;
pub use engine::GraphicsEngine;
pub use gradient::{ColorStop, RadialGradient, Rgba};
pub use recording::{DrawCommand, RecordingSurface};
pub use surface::{DrawingSurface, Viewport};
pub use texture::CanvasTexture;
pub use vertex::{Vertex, VertexBuffer};
