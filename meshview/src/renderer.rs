//! WGPU rendering backend
use std::ops::Range;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use meshview_core::{Backend, ModelGeometry, WindowSize};
use nalgebra::Matrix4;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0xd4 as f64 / 255.0,
    g: 0xd9 as f64 / 255.0,
    b: 0xde as f64 / 255.0,
    a: 1.0,
};

/// Maps OpenGL clip depth (`[-1, 1]`) onto WGPU's (`[0, 1]`)
#[rustfmt::skip]
fn opengl_to_wgpu() -> Matrix4<f64> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Matrix uniform with its bind group
struct Uniform {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Uniform {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Matrix Uniform Buffer"),
            size: std::mem::size_of::<[f32; 16]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Matrix Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn write(&self, queue: &wgpu::Queue, matrix: &Matrix4<f64>) {
        let m: Matrix4<f32> = (opengl_to_wgpu() * matrix).cast();
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(m.as_slice()));
    }
}

/// GPU resources for one model
pub struct GpuModel {
    mesh: wgpu::Buffer,
    mesh_vertices: u32,
    /// `None` when the model has no slice outlines
    outlines: Option<wgpu::Buffer>,
    slices: Vec<Vec<Range<u32>>>,
    mesh_uniform: Uniform,
    slice_uniform: Uniform,
}

/// Frame being recorded between `begin_frame` and `end_frame`
struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// Draws models into a window surface
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: wgpu::TextureView,
    uniform_layout: wgpu::BindGroupLayout,
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    frame: Option<Frame>,
}

impl Renderer {
    /// Sets up the surface, device and pipelines for `window`
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("could not create surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("could not open GPU device")?;

        // Colors are written as-is, without sRGB encoding
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface has no supported formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });
        let uniform_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Matrix Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Pipeline Layout"),
                bind_group_layouts: &[&uniform_layout],
                push_constant_ranges: &[],
            });

        let mesh_pipeline = Self::pipeline(
            &device,
            &layout,
            &shader,
            format,
            "fs_mesh",
            wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
        );
        let line_pipeline = Self::pipeline(
            &device,
            &layout,
            &shader,
            format,
            "fs_line",
            wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineStrip,
                ..Default::default()
            },
        );
        let depth = Self::depth_view(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth,
            uniform_layout,
            mesh_pipeline,
            line_pipeline,
            frame: None,
        })
    }

    fn pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        fragment_entry: &str,
        primitive: wgpu::PrimitiveState,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(fragment_entry),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: fragment_entry,
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive,
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    fn depth_view(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Size the surface is currently configured for
    pub fn surface_size(&self) -> WindowSize {
        WindowSize::new(self.config.width, self.config.height)
    }
}

/// Starts a render pass that keeps what earlier passes drew
fn load_pass<'a>(
    frame: &'a mut Frame,
    depth: &'a wgpu::TextureView,
) -> wgpu::RenderPass<'a> {
    frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Draw Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &frame.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

impl Backend for Renderer {
    type Handle = GpuModel;
    type Error = wgpu::SurfaceError;

    fn upload(&mut self, geometry: &ModelGeometry) -> GpuModel {
        let mesh = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&geometry.mesh),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let outlines = (!geometry.outlines.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Slice Vertex Buffer"),
                    contents: bytemuck::cast_slice(&geometry.outlines),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });
        GpuModel {
            mesh,
            mesh_vertices: geometry.mesh_vertex_count(),
            outlines,
            slices: geometry.slices.clone(),
            mesh_uniform: Uniform::new(&self.device, &self.uniform_layout),
            slice_uniform: Uniform::new(&self.device, &self.uniform_layout),
        }
    }

    fn release(&mut self, handle: GpuModel) {
        handle.mesh.destroy();
        if let Some(b) = &handle.outlines {
            b.destroy();
        }
        handle.mesh_uniform.buffer.destroy();
        handle.slice_uniform.buffer.destroy();
    }

    fn resize(&mut self, size: WindowSize) {
        // A minimized window reports a zero size; keep the old surface
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth = Self::depth_view(&self.device, &self.config);
        }
    }

    fn begin_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(
                wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                },
            ),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.frame = Some(Frame {
            output,
            view,
            encoder,
        });
        Ok(())
    }

    fn draw_mesh(&mut self, handle: &GpuModel, matrix: &Matrix4<f64>) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        handle.mesh_uniform.write(&self.queue, matrix);
        let mut pass = load_pass(frame, &self.depth);
        pass.set_pipeline(&self.mesh_pipeline);
        pass.set_bind_group(0, &handle.mesh_uniform.bind_group, &[]);
        pass.set_vertex_buffer(0, handle.mesh.slice(..));
        pass.draw(0..handle.mesh_vertices, 0..1);
    }

    fn draw_slice(
        &mut self,
        handle: &GpuModel,
        index: usize,
        matrix: &Matrix4<f64>,
    ) {
        let (Some(frame), Some(outlines)) =
            (self.frame.as_mut(), handle.outlines.as_ref())
        else {
            return;
        };
        let Some(paths) = handle.slices.get(index) else {
            return;
        };
        handle.slice_uniform.write(&self.queue, matrix);
        let mut pass = load_pass(frame, &self.depth);
        pass.set_pipeline(&self.line_pipeline);
        pass.set_bind_group(0, &handle.slice_uniform.bind_group, &[]);
        pass.set_vertex_buffer(0, outlines.slice(..));
        for path in paths {
            pass.draw(path.clone(), 0..1);
        }
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.queue.submit(Some(frame.encoder.finish()));
            frame.output.present();
        }
    }
}
