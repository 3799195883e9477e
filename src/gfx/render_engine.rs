//! WGPU-based rendering engine
//!
//! Draws every visible scene drawable with instanced matcap shading, then
//! hands the frame to an optional UI overlay before presenting.

use std::{iter, sync::Arc};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::{Buffer, DepthStencilState, RenderPipeline, TextureFormat};

use super::{
    camera::{camera_utils::CameraUniform, PerspectiveCamera},
    geometry::{GeometryData, Vertex3D},
    scene::{GeometryId, Scene, VariantHandle},
    texture::{DepthBuffer, MatcapTexture},
};
use crate::assets::MatcapImage;
use crate::error::{DonutError, Result};

/// Per-instance model matrix
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    /// Vertex buffer layout for instance data, after position(0) and normal(1)
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            2 => Float32x4,
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

struct GpuMesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, data: &GeometryData, label: &str) -> Self {
        let vertices: Vec<Vertex3D> = data.to_vertices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }
}

/// A run of consecutive instances sharing mesh and matcap
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub geometry: GeometryId,
    pub matcap: VariantHandle,
    pub instances: std::ops::Range<u32>,
}

/// Groups visible drawables by (geometry, matcap) and flattens their transforms
pub fn build_batches(scene: &Scene) -> (Vec<InstanceRaw>, Vec<DrawBatch>) {
    let mut items: Vec<(GeometryId, VariantHandle, InstanceRaw)> = scene
        .visible_drawables()
        .map(|drawable| {
            (
                drawable.geometry,
                drawable.material.borrow().matcap,
                InstanceRaw {
                    model: drawable.transform.to_matrix().into(),
                },
            )
        })
        .collect();
    items.sort_by_key(|(geometry, matcap, _)| (geometry.0, matcap.0));

    let mut instances = Vec::with_capacity(items.len());
    let mut batches: Vec<DrawBatch> = Vec::new();
    for (geometry, matcap, raw) in items {
        let index = instances.len() as u32;
        instances.push(raw);
        match batches.last_mut() {
            Some(batch) if batch.geometry == geometry && batch.matcap == matcap => {
                batch.instances.end = index + 1;
            }
            _ => batches.push(DrawBatch {
                geometry,
                matcap,
                instances: index..index + 1,
            }),
        }
    }
    (instances, batches)
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: DepthBuffer,
    format: TextureFormat,
    pipeline: RenderPipeline,

    camera_buffer: Buffer,
    camera_bind_group: wgpu::BindGroup,

    matcap_layout: wgpu::BindGroupLayout,
    matcaps: Vec<wgpu::BindGroup>,

    meshes: Vec<GpuMesh>,
    instance_buffer: Buffer,
    instance_capacity: usize,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// # Arguments
    /// * `window` - Window surface target for rendering
    /// * `width` - Initial surface width in pixels
    /// * `height` - Initial surface height in pixels
    /// * `vsync` - Present with FIFO instead of the fastest available mode
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| DonutError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| DonutError::AdapterUnavailable)?;
        log::info!("Using GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| DonutError::Surface("surface reports no formats".into()))?;

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_texture = DepthBuffer::new(&device, &config);

        // Camera uniform, group 0
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
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
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Matcap texture + sampler, group 1
        let matcap_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Matcap Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Matcap Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/matcap.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Matcap Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &matcap_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Matcap Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex3D::desc(), InstanceRaw::desc()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
                unclipped_depth: false,
            },
            depth_stencil: Some(DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        let instance_capacity = 128;
        let instance_buffer = Self::create_instance_buffer(&device, instance_capacity);

        log::info!(
            "Render engine ready ({}x{}, {:?}, {:?})",
            config.width,
            config.height,
            format,
            present_mode
        );

        Ok(RenderEngine {
            surface,
            device: device.into(),
            queue: queue.into(),
            config,
            depth_texture,
            format,
            pipeline,
            camera_buffer,
            camera_bind_group,
            matcap_layout,
            matcaps: Vec::new(),
            meshes: Vec::new(),
            instance_buffer,
            instance_capacity,
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (capacity * std::mem::size_of::<InstanceRaw>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Uploads matcaps in order; slot `i` is addressed by `VariantHandle(i)`
    pub fn upload_matcaps(&mut self, images: &[MatcapImage]) -> Vec<VariantHandle> {
        images
            .iter()
            .map(|image| {
                let slot = self.matcaps.len();
                let texture = MatcapTexture::upload(
                    &self.device,
                    &self.queue,
                    image,
                    &format!("Matcap {}", slot + 1),
                );
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Matcap Bind Group"),
                    layout: &self.matcap_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&texture.sampler),
                        },
                    ],
                });
                self.matcaps.push(bind_group);
                VariantHandle(slot as u32)
            })
            .collect()
    }

    /// Uploads scene geometries that are not on the GPU yet
    fn sync_meshes(&mut self, scene: &Scene) {
        for (index, data) in scene.geometries().iter().enumerate().skip(self.meshes.len()) {
            log::debug!(
                "Uploading geometry {} ({} vertices, {} triangles)",
                index,
                data.vertex_count(),
                data.triangle_count()
            );
            self.meshes
                .push(GpuMesh::new(&self.device, data, &format!("Geometry {index}")));
        }
    }

    fn write_instances(&mut self, instances: &[InstanceRaw]) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = Self::create_instance_buffer(&self.device, self.instance_capacity);
        }
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    /// Renders the scene, then runs `ui_callback` on the same target before presenting
    pub fn render_frame_with_ui<F>(&mut self, scene: &Scene, camera: &PerspectiveCamera, ui_callback: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        self.render_frame(scene, camera, Some(ui_callback));
    }

    /// Renders one frame
    pub fn render_frame<F>(&mut self, scene: &Scene, camera: &PerspectiveCamera, ui_callback: Option<F>)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(err) => {
                log::warn!("Dropping frame: {}", err);
                return;
            }
        };

        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera.uniform()]),
        );
        self.sync_meshes(scene);
        let (instances, batches) = build_batches(scene);
        self.write_instances(&instances);

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.format),
                ..Default::default()
            });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            for batch in &batches {
                let (Some(mesh), Some(matcap)) = (
                    self.meshes.get(batch.geometry.0),
                    self.matcaps.get(batch.matcap.0 as usize),
                ) else {
                    // texture not uploaded yet
                    continue;
                };
                render_pass.set_bind_group(1, matcap, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, batch.instances.clone());
            }
        }

        if let Some(ui_callback) = ui_callback {
            ui_callback(&self.device, &self.queue, &mut encoder, &view);
        }

        self.queue.submit(iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Resizes the surface and recreates the depth buffer. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = DepthBuffer::new(&self.device, &self.config);
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_torus;
    use crate::gfx::scene::{shared_material, SceneBackend, Transform};

    #[test]
    fn test_batches_skip_hidden_drawables() {
        let mut scene = Scene::new();
        let torus = scene.add_geometry(generate_torus(0.3, 0.2, 8, 12));
        let material = shared_material("matcap", VariantHandle(2));

        let shown = scene.create_drawable(torus, &material);
        scene.create_drawable(torus, &material);
        scene.add_to_scene(shown);

        let (instances, batches) = build_batches(&scene);
        assert_eq!(instances.len(), 1);
        assert_eq!(
            batches,
            vec![DrawBatch {
                geometry: torus,
                matcap: VariantHandle(2),
                instances: 0..1,
            }]
        );
    }

    #[test]
    fn test_shared_material_gives_single_batch() {
        let mut scene = Scene::new();
        let torus = scene.add_geometry(generate_torus(0.3, 0.2, 8, 12));
        let material = shared_material("matcap", VariantHandle(0));

        for i in 0..10 {
            let handle = scene.create_drawable(torus, &material);
            scene.set_transform(
                handle,
                Transform {
                    position: cgmath::Vector3::new(i as f32, 0.0, 0.0),
                    ..Transform::default()
                },
            );
            scene.add_to_scene(handle);
        }
        material.borrow_mut().matcap = VariantHandle(4);

        let (instances, batches) = build_batches(&scene);
        assert_eq!(instances.len(), 10);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].matcap, VariantHandle(4));
        assert_eq!(batches[0].instances, 0..10);
        // column-major: translation lives in the last column
        assert_eq!(instances[0].model[3][0], 0.0);
        assert_eq!(instances[9].model[3][0], 9.0);
    }

    #[test]
    fn test_instance_layout_size() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 64);
        assert_eq!(InstanceRaw::desc().attributes.len(), 4);
    }
}
