//! Rendering system with wgpu pipelines for particles, zone guides and the scope.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::oscillator::Waveform;
use crate::params::RenderConfig;
use crate::particles::{Bounds, ParticleView};

/// Longest waveform drawn without decimation (samples)
const MAX_SCOPE_POINTS: usize = 4096;

/// Scope trace color (sRGB)
const SCOPE_TRACE: [f32; 4] = [0.0, 1.0, 128.0 / 255.0, 1.0];
const SCOPE_PANEL: [f32; 4] = [20.0 / 255.0, 20.0 / 255.0, 30.0 / 255.0, 1.0];
const SCOPE_CENTER: [f32; 4] = [50.0 / 255.0, 50.0 / 255.0, 50.0 / 255.0, 1.0];

/// Uniform buffer shared by both shaders
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ScreenUniforms {
    pub size: [f32; 2],
    pub glow_scale: f32,
    pub _padding: f32,
}

/// Flat colored vertex in pixel coordinates
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// Screen rectangle in pixels
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    particle_pipeline: wgpu::RenderPipeline,
    fill_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    screen_buffer: wgpu::Buffer,
    screen_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    fill_buffer: wgpu::Buffer,
    line_buffer: wgpu::Buffer,
    fills: Vec<ColorVertex>,
    lines: Vec<ColorVertex>,
    render_config: RenderConfig,
}

impl RenderSystem {
    /// Create new rendering system able to draw `max_particles` at once
    pub async fn new(
        window: Arc<winit::window::Window>,
        render_config: RenderConfig,
        max_particles: usize,
    ) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Render(format!("failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::Render("failed to find a suitable GPU adapter".to_string()))?;

        log::info!("renderer: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| Error::Render(format!("failed to request device: {e}")))?;

        // Palette colors are sRGB bytes: prefer a non-sRGB target so they pass through
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| Error::Render("surface has no supported formats".to_string()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
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
        surface.configure(&device, &surface_config);

        let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("particles.wgsl").into()),
        });
        let overlay_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("overlay.wgsl").into()),
        });

        let screen = ScreenUniforms {
            size: [surface_config.width as f32, surface_config.height as f32],
            glow_scale: render_config.glow_scale,
            _padding: 0.0,
        };
        let screen_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Uniform Buffer"),
            contents: bytemuck::cast_slice(&[screen]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let screen_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Screen Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let screen_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Screen Bind Group"),
            layout: &screen_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: screen_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&screen_bind_group_layout],
            push_constant_ranges: &[],
        });

        let instance_attributes =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32, 2 => Float32, 3 => Float32x4];
        let particle_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleView>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &instance_attributes,
        };

        let color_attributes = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];
        let color_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColorVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &color_attributes,
        };

        let particle_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &particle_shader,
            particle_layout,
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            format,
            "Particle Pipeline",
        );
        let fill_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &overlay_shader,
            color_layout.clone(),
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::ALPHA_BLENDING,
            format,
            "Fill Pipeline",
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &overlay_shader,
            color_layout,
            wgpu::PrimitiveTopology::LineList,
            wgpu::BlendState::ALPHA_BLENDING,
            format,
            "Line Pipeline",
        );

        let instance_capacity = max_particles.max(1);
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Instance Buffer"),
            size: (instance_capacity * std::mem::size_of::<ParticleView>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // 4 zone strips + scope panel, 6 vertices each
        let fill_capacity = (Waveform::ALL.len() + 1) * 6;
        let fill_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fill Vertex Buffer"),
            size: (fill_capacity * std::mem::size_of::<ColorVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Center line + one segment per scope point
        let line_capacity = 2 + MAX_SCOPE_POINTS * 2;
        let line_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Line Vertex Buffer"),
            size: (line_capacity * std::mem::size_of::<ColorVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            particle_pipeline,
            fill_pipeline,
            line_pipeline,
            screen_buffer,
            screen_bind_group,
            instance_buffer,
            instance_capacity,
            fill_buffer,
            line_buffer,
            fills: Vec::with_capacity(fill_capacity),
            lines: Vec::with_capacity(line_capacity),
            render_config,
        })
    }

    /// Current drawable area in pixels
    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            self.surface_config.width as f32,
            self.surface_config.height as f32,
        )
    }

    /// Reconfigure the surface after a window resize (zero sizes are ignored)
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reconfigure with the current size (after a lost/outdated surface)
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Draw one frame: zone guides, particles, then the scope of `waveform`
    pub fn render(
        &mut self,
        particles: &[ParticleView],
        waveform: &[f32],
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let bounds = self.bounds();
        let screen = ScreenUniforms {
            size: [bounds.width, bounds.height],
            glow_scale: self.render_config.glow_scale,
            _padding: 0.0,
        };
        self.queue
            .write_buffer(&self.screen_buffer, 0, bytemuck::cast_slice(&[screen]));

        let particle_count = particles.len().min(self.instance_capacity);
        if particle_count > 0 {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&particles[..particle_count]),
            );
        }

        let scope = Rect {
            x: 0.0,
            y: bounds.height - self.render_config.scope_height,
            w: bounds.width,
            h: self.render_config.scope_height,
        };

        self.fills.clear();
        zone_strips(bounds, self.render_config.zone_alpha, &mut self.fills);
        let zone_vertices = self.fills.len() as u32;
        push_rect(&mut self.fills, scope, SCOPE_PANEL);
        self.queue
            .write_buffer(&self.fill_buffer, 0, bytemuck::cast_slice(&self.fills));

        self.lines.clear();
        scope_lines(waveform, scope, &mut self.lines);
        self.queue
            .write_buffer(&self.line_buffer, 0, bytemuck::cast_slice(&self.lines));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b] = self.render_config.background_rgb;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64 / 255.0,
                            g: g as f64 / 255.0,
                            b: b as f64 / 255.0,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.screen_bind_group, &[]);

            // Zone guides first, behind everything
            render_pass.set_pipeline(&self.fill_pipeline);
            render_pass.set_vertex_buffer(0, self.fill_buffer.slice(..));
            render_pass.draw(0..zone_vertices, 0..1);

            if particle_count > 0 {
                render_pass.set_pipeline(&self.particle_pipeline);
                render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
                render_pass.draw(0..6, 0..particle_count as u32);
            }

            // Scope panel over the particles, then its trace
            render_pass.set_pipeline(&self.fill_pipeline);
            render_pass.set_vertex_buffer(0, self.fill_buffer.slice(..));
            render_pass.draw(zone_vertices..self.fills.len() as u32, 0..1);

            if !self.lines.is_empty() {
                render_pass.set_pipeline(&self.line_pipeline);
                render_pass.set_vertex_buffer(0, self.line_buffer.slice(..));
                render_pass.draw(0..self.lines.len() as u32, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    buffer: wgpu::VertexBufferLayout<'_>,
    topology: wgpu::PrimitiveTopology,
    blend: wgpu::BlendState,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[buffer],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Two triangles covering `rect`
fn push_rect(out: &mut Vec<ColorVertex>, rect: Rect, color: [f32; 4]) {
    let (x0, y0, x1, y1) = (rect.x, rect.y, rect.x + rect.w, rect.y + rect.h);
    for position in [[x0, y0], [x1, y0], [x0, y1], [x0, y1], [x1, y0], [x1, y1]] {
        out.push(ColorVertex { position, color });
    }
}

/// Faint vertical strips marking the waveform zones
fn zone_strips(bounds: Bounds, alpha: f32, out: &mut Vec<ColorVertex>) {
    let zone_width = bounds.width / Waveform::ALL.len() as f32;
    for (i, waveform) in Waveform::ALL.iter().enumerate() {
        let mut color = waveform.color();
        color[3] = alpha;
        let rect = Rect {
            x: zone_width * i as f32,
            y: 0.0,
            w: zone_width,
            h: bounds.height,
        };
        push_rect(out, rect, color);
    }
}

/// Center line plus the waveform trace as line segments inside `rect`
///
/// Long waveforms are decimated to at most `MAX_SCOPE_POINTS` points.
fn scope_lines(waveform: &[f32], rect: Rect, out: &mut Vec<ColorVertex>) {
    let mid = rect.y + rect.h * 0.5;
    out.push(ColorVertex {
        position: [rect.x, mid],
        color: SCOPE_CENTER,
    });
    out.push(ColorVertex {
        position: [rect.x + rect.w, mid],
        color: SCOPE_CENTER,
    });

    if waveform.len() < 2 {
        return;
    }

    let stride = waveform.len().div_ceil(MAX_SCOPE_POINTS);
    let len = waveform.len() as f32;
    let point = |i: usize| ColorVertex {
        position: [
            rect.x + i as f32 / len * rect.w,
            mid - waveform[i] * rect.h * 0.45,
        ],
        color: SCOPE_TRACE,
    };

    let mut prev = 0;
    for i in (stride..waveform.len()).step_by(stride) {
        out.push(point(prev));
        out.push(point(i));
        prev = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: Rect = Rect {
        x: 0.0,
        y: 700.0,
        w: 1280.0,
        h: 100.0,
    };

    #[test]
    fn test_instance_layout_matches_shader() {
        // position (8) + radius (4) + alpha (4) + color (16)
        assert_eq!(std::mem::size_of::<ParticleView>(), 32);
        assert_eq!(std::mem::size_of::<ScreenUniforms>(), 16);
    }

    #[test]
    fn test_zone_strips_cover_width() {
        let mut out = Vec::new();
        zone_strips(Bounds::new(1280.0, 800.0), 0.05, &mut out);

        assert_eq!(out.len(), 4 * 6);
        assert!(out.iter().all(|v| v.color[3] == 0.05));
        let max_x = out.iter().map(|v| v.position[0]).fold(0.0, f32::max);
        assert_eq!(max_x, 1280.0);
        assert_eq!(out[0].color[..3], Waveform::Sine.color()[..3]);
    }

    #[test]
    fn test_scope_maps_samples_into_panel() {
        let mut out = Vec::new();
        scope_lines(&[1.0, 0.0, -1.0, 0.0], SCOPE, &mut out);

        // center line + 3 segments
        assert_eq!(out.len(), 2 + 3 * 2);
        assert_eq!(out[0].position, [0.0, 750.0]);
        assert_eq!(out[2].position, [0.0, 750.0 - 45.0]);
        assert_eq!(out[5].position, [640.0, 750.0 + 45.0]);
        assert!(out[2..]
            .iter()
            .all(|v| v.position[1] >= SCOPE.y && v.position[1] <= SCOPE.y + SCOPE.h));
    }

    #[test]
    fn test_scope_with_short_waveform_draws_only_center() {
        let mut out = Vec::new();
        scope_lines(&[0.5], SCOPE, &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_scope_decimates_long_waveforms() {
        let mut out = Vec::new();
        let waveform = vec![0.0; MAX_SCOPE_POINTS * 3];
        scope_lines(&waveform, SCOPE, &mut out);
        assert!(out.len() <= 2 + MAX_SCOPE_POINTS * 2);
    }
}
