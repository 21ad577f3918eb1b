use anyhow::Result;
use log::{debug, info};
use std::sync::Arc;
use winit::window::Window;

use super::{CanvasTexture, DrawingSurface, PixelCanvas, Vertex, VertexBuffer};

const BLIT_SHADER: &str = include_str!("../../shaders/blit.wgsl");
const BLIT_VERTEX_ENTRY: &str = "vs_main";
const BLIT_FRAGMENT_ENTRY: &str = "fs_main";

/// Presents a [`PixelCanvas`] in a window.
///
/// The canvas is uploaded to a texture and drawn as a fullscreen quad,
/// composited over a white page background.
pub struct GraphicsEngine {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,

    blit_pipeline: wgpu::RenderPipeline,
    canvas_layout: wgpu::BindGroupLayout,
    canvas_texture: Option<CanvasTexture>,
    vertex_buffer: VertexBuffer,
}

impl GraphicsEngine {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find an appropriate adapter"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no texture formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let canvas_layout = CanvasTexture::bind_group_layout(&device);

        let blit_pipeline = Self::create_blit_pipeline(&device, surface_format, &canvas_layout);

        let vertex_buffer = VertexBuffer::new(&device, &Vertex::fullscreen_quad());

        info!("Graphics engine ready ({:?}, {}x{})", surface_format, config.width, config.height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            blit_pipeline,
            canvas_layout,
            canvas_texture: None,
            vertex_buffer,
        })
    }

    /// Opaque pipeline drawing the canvas quad; the shader does the
    /// compositing over white.
    fn create_blit_pipeline(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        canvas_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Canvas Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canvas Blit Pipeline Layout"),
            bind_group_layouts: &[canvas_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Canvas Blit Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: BLIT_VERTEX_ENTRY,
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: BLIT_FRAGMENT_ENTRY,
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    /// Reconfigure the swapchain. The canvas keeps its own size and is
    /// stretched to the window.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn ensure_canvas_texture(&mut self, width: u32, height: u32) {
        let matches = self
            .canvas_texture
            .as_ref()
            .is_some_and(|texture| texture.width == width && texture.height == height);
        if !matches {
            debug!("Allocating canvas texture {}x{}", width, height);
            self.canvas_texture = Some(CanvasTexture::new(&self.device, &self.canvas_layout, width, height));
        }
    }

    pub fn present(&mut self, canvas: &PixelCanvas) -> Result<()> {
        let (width, height) = (canvas.width(), canvas.height());
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.ensure_canvas_texture(width, height);
        if let Some(texture) = &self.canvas_texture {
            texture.upload(&self.queue, canvas.pixels());
        }

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(texture) = &self.canvas_texture {
                render_pass.set_pipeline(&self.blit_pipeline);
                render_pass.set_bind_group(0, &texture.bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.buffer.slice(..));
                render_pass.draw(0..self.vertex_buffer.vertex_count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
