//! Popwave - additive sound-particle instrument
//!
//! Click, drag or play the keyboard to release particles. Every particle is
//! an oscillator: it sounds while it bounces and fades out as it shrinks.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use popwave::audio::AudioSystem;
use popwave::cli::Args;
use popwave::error::Result;
use popwave::input::{waveform_for_digit, InputMapper};
use popwave::oscillator::Waveform;
use popwave::params::{AppConfig, RecordingConfig};
use popwave::particles::{Bounds, ParticlePool, ParticleView};
use popwave::rendering::RenderSystem;

/// Seconds between window title refreshes
const TITLE_INTERVAL_S: f32 = 0.5;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Engine
    pool: Arc<ParticlePool>,
    audio: Option<AudioSystem>,
    input: InputMapper,

    // Configuration
    config: AppConfig,
    recording: Option<RecordingConfig>,

    // Interaction state
    waveform: Waveform,
    cursor: Vec2,
    pointer_down: bool,

    // Per-frame scratch buffers
    views: Vec<ParticleView>,
    scope: Vec<f32>,

    // Time tracking
    start_time: Instant,
    last_frame: Instant,
    frame: u64,
    fps_frames: u32,
    fps_since: Instant,
    fps: f32,

    /// First fatal error, reported after the event loop exits
    error: Option<popwave::Error>,
}

impl App {
    fn new(config: AppConfig, recording: Option<RecordingConfig>) -> Self {
        let pool = Arc::new(ParticlePool::from_config(&config));
        let input = InputMapper::new(config.input.clone(), config.particle.voice.clone());
        let now = Instant::now();

        Self {
            window: None,
            render_system: None,
            views: Vec::with_capacity(pool.capacity()),
            pool,
            audio: None,
            input,
            config,
            recording,
            waveform: Waveform::default(),
            cursor: Vec2::ZERO,
            pointer_down: false,
            scope: Vec::new(),
            start_time: now,
            last_frame: now,
            frame: 0,
            fps_frames: 0,
            fps_since: now,
            fps: 0.0,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Popwave")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.render.window_width,
                self.config.render.window_height,
            ));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.config.render.clone(),
            self.pool.capacity(),
        ))?;

        let audio = AudioSystem::new(
            &self.config.audio,
            Arc::clone(&self.pool),
            self.recording.as_ref(),
        )?;

        log::info!(
            "running: {} Hz, {} channels, capacity {}",
            audio.sample_rate_hz(),
            audio.channels(),
            self.pool.capacity()
        );
        log::info!("keys: 1-4 waveform, A-L / W-P notes, space clears, esc quits");

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.audio = Some(audio);
        self.start_time = Instant::now();
        self.last_frame = self.start_time;
        self.fps_since = self.start_time;
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: popwave::Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    fn bounds(&self) -> Option<Bounds> {
        self.render_system.as_ref().map(RenderSystem::bounds)
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: &Key) {
        match key {
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Named(NamedKey::Space) => {
                self.pool.clear();
                log::debug!("cleared all particles");
            }
            Key::Character(text) => {
                let Some(c) = text.chars().next() else {
                    return;
                };
                if let Some(waveform) = waveform_for_digit(c) {
                    self.waveform = waveform;
                    log::debug!("waveform: {waveform}");
                    return;
                }
                let Some(bounds) = self.bounds() else {
                    return;
                };
                if let Some(request) =
                    self.input
                        .key_spawn(c, self.waveform, bounds, &mut rand::thread_rng())
                {
                    self.pool.spawn(request);
                }
            }
            _ => {}
        }
    }

    fn spawn_at_cursor(&self) {
        if let Some(bounds) = self.bounds() {
            self.pool.spawn(self.input.pointer_spawn(self.cursor, bounds));
        }
    }

    /// Advance, draw and account a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.pointer_down && self.input.drag_spawns_on(self.frame) {
            self.spawn_at_cursor();
        }

        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };
        let bounds = render_system.bounds();

        self.pool.advance(dt, bounds);
        self.pool.render(&mut self.views);
        if let Some(audio) = &self.audio {
            audio.sink().waveform_into(&mut self.scope);
        }

        match render_system.render(&self.views, &self.scope) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                render_system.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(
                    event_loop,
                    popwave::Error::Render("surface out of memory".to_string()),
                );
                return;
            }
            Err(e) => log::warn!("render error: {e:?}"),
        }

        self.frame += 1;
        self.update_title(now);

        if let Some(recording) = &self.recording {
            if self.start_time.elapsed().as_secs_f32() >= recording.duration_secs {
                log::info!("recording complete ({}s)", recording.duration_secs);
                event_loop.exit();
            }
        }
    }

    fn update_title(&mut self, now: Instant) {
        self.fps_frames += 1;
        let elapsed = now.duration_since(self.fps_since).as_secs_f32();
        if elapsed < TITLE_INTERVAL_S {
            return;
        }
        self.fps = self.fps_frames as f32 / elapsed;
        self.fps_frames = 0;
        self.fps_since = now;

        if let Some(window) = &self.window {
            window.set_title(&format!(
                "Popwave - {} - {}/{} particles - {:.0} FPS",
                self.waveform,
                self.pool.count(),
                self.pool.capacity(),
                self.fps
            ));
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        repeat: false,
                        logical_key,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, &logical_key),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.pointer_down = state == ElementState::Pressed;
                if self.pointer_down {
                    self.spawn_at_cursor();
                }
            }
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.app_config()?;
    let recording = args.recording_config();
    if let Some(recording) = &recording {
        log::info!(
            "recording {}s to {}",
            recording.duration_secs,
            recording.audio_path().display()
        );
    }

    let mut app = App::new(config, recording);
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    if let Some(audio) = app.audio.take() {
        let sink = audio.sink();
        log::info!(
            "audio: {} buffers, {} silenced",
            sink.buffers_processed(),
            sink.buffers_silenced()
        );
        audio.finish()?;
    }

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
