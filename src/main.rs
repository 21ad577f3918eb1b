use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use winit::{
    event::{ElementState, Event, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

use inkblot_visualizer::audio::RodioBackend;
use inkblot_visualizer::graphics::{GraphicsEngine, PixelCanvas, Viewport};
use inkblot_visualizer::scheduler::FrameClock;
use inkblot_visualizer::VisualizerSession;

#[derive(Parser)]
#[command(name = "inkblot-visualizer")]
#[command(about = "Audio-reactive inkblot visualizer. Enter starts, Space stops, Escape quits.")]
struct Args {
    /// Audio file to play (WAV, MP3, OGG, FLAC, M4A)
    #[arg(default_value = "sample.mp3")]
    audio_file: PathBuf,

    /// Start playing as soon as the window opens
    #[arg(long)]
    autostart: bool,
}

fn viewport_of(window: &Window) -> Viewport {
    let size = window.inner_size();
    Viewport::new(size.width.max(1), size.height.max(1))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    info!("Starting Inkblot Visualizer");

    let event_loop = EventLoop::new()?;
    let window = Arc::new(WindowBuilder::new()
        .with_title("Inkblot Visualizer")
        .with_inner_size(winit::dpi::LogicalSize::new(1200, 800))
        .build(&event_loop)?);

    let mut graphics_engine = pollster::block_on(GraphicsEngine::new(Arc::clone(&window)))?;
    let mut session = VisualizerSession::new(
        PixelCanvas::new(1, 1),
        RodioBackend::new()?,
        FrameClock::new(),
        args.audio_file,
    );

    if args.autostart {
        if let Err(e) = session.start(viewport_of(&window)) {
            error!("Failed to start visualizer: {:#}", e);
        }
    }

    info!("Visualizer initialized successfully");

    let window_clone = Arc::clone(&window);
    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    info!("Close requested");
                    session.stop();
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            info!("Escape pressed");
                            session.stop();
                            elwt.exit();
                        }
                        PhysicalKey::Code(KeyCode::Enter) => {
                            match session.start(viewport_of(&window_clone)) {
                                Ok(true) => window_clone.request_redraw(),
                                Ok(false) => {}
                                Err(e) => error!("Failed to start visualizer: {:#}", e),
                            }
                        }
                        PhysicalKey::Code(KeyCode::Space) => {
                            session.stop();
                        }
                        _ => {}
                    }
                }
                WindowEvent::Resized(physical_size) => {
                    graphics_engine.resize(physical_size);
                }
                WindowEvent::RedrawRequested => {
                    session.pump();
                    if let Some(canvas) = session.surface() {
                        if let Err(e) = graphics_engine.present(canvas) {
                            error!("Render error: {}", e);
                        }
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if session.scheduler().has_pending() {
                    window_clone.request_redraw();
                }
            }
            _ => {}
        }
    })?;

    Ok(())
}
