use crate::camera::EyeView;
use crate::frame::{DrawCommand, PanelKind};
use crate::overlay::{OverlayBatch, OverlayVertex, MAX_OVERLAY_VERTICES};
use crate::panel::PanelMesh;
use crate::pipeline::{create_depth_texture, GpuSetupError, RenderPipelines, Uniforms};
use crate::scene::PanelScene;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

/// Background behind the panels.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// Most eyes drawn in one frame (stereo).
const MAX_EYES: usize = 2;

/// GPU resources for a single panel (mesh + texture).
pub struct PanelGpuResources {
    mesh: Option<MeshBuffers>,
    texture: wgpu::Texture,
    texture_bind_group: wgpu::BindGroup,
    pub resolution: (u32, u32),
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct EyeUniforms {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Draws a frame's command list into one surface, once per eye viewport.
///
/// Stereo output is side-by-side: each eye renders into its half of the
/// surface within a single render pass. Mono output is a single full-size
/// eye. Overlay geometry lives in one persistent vertex buffer rewritten
/// every frame.
pub struct StereoRenderer {
    pipelines: RenderPipelines,
    main: PanelGpuResources,
    control: PanelGpuResources,
    overlay_buffer: wgpu::Buffer,
    eyes: Vec<EyeUniforms>,
    depth_view: wgpu::TextureView,
    /// Scene generation the uploaded meshes were built from.
    mesh_generation: Option<u64>,
}

impl StereoRenderer {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        main_resolution: (u32, u32),
        control_resolution: (u32, u32),
    ) -> Result<Self, GpuSetupError> {
        let pipelines = RenderPipelines::new(device, color_format)?;

        let main = create_panel_resources(device, &pipelines, "main_panel", main_resolution);
        let control =
            create_panel_resources(device, &pipelines, "control_panel", control_resolution);

        let overlay_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("overlay_vertex_buffer"),
            size: (MAX_OVERLAY_VERTICES * std::mem::size_of::<OverlayVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let eyes = (0..MAX_EYES)
            .map(|_| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("eye_uniform_buffer"),
                    size: std::mem::size_of::<Uniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = pipelines.create_uniform_bind_group(device, &buffer);
                EyeUniforms { buffer, bind_group }
            })
            .collect();

        let depth_view = create_depth_texture(device, pipelines.depth_format, width, height);

        Ok(Self {
            pipelines,
            main,
            control,
            overlay_buffer,
            eyes,
            depth_view,
            mesh_generation: None,
        })
    }

    /// Recreate the depth texture (call on resize).
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = create_depth_texture(device, self.pipelines.depth_format, width, height);
    }

    /// Upload panel meshes if the scene was rebuilt since the last sync.
    pub fn sync_meshes(&mut self, device: &wgpu::Device, scene: &PanelScene) {
        let Some(build) = scene.build() else {
            self.main.mesh = None;
            self.control.mesh = None;
            self.mesh_generation = None;
            return;
        };
        if self.mesh_generation == Some(scene.generation()) {
            return;
        }

        self.main.mesh = Some(upload_mesh(device, "main_panel", &build.main));
        self.control.mesh = Some(upload_mesh(device, "control_panel", &build.control));
        self.mesh_generation = Some(scene.generation());
        debug!(
            generation = scene.generation(),
            main_indices = build.main.indices.len(),
            "Panel meshes uploaded"
        );
    }

    /// Upload a finished bitmap to a panel's texture, resizing the texture
    /// if the bitmap size changed.
    pub fn upload_bitmap(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        kind: PanelKind,
        data: &[u8],
        width: u32,
        height: u32,
    ) {
        if data.len() != (width * height * 4) as usize {
            warn!(?kind, width, height, len = data.len(), "Ignoring malformed bitmap");
            return;
        }

        let label = match kind {
            PanelKind::Main => "main_panel",
            PanelKind::Control => "control_panel",
        };
        let resources = match kind {
            PanelKind::Main => &mut self.main,
            PanelKind::Control => &mut self.control,
        };
        if resources.resolution != (width, height) {
            debug!(?kind, width, height, "Panel texture resized");
            let mesh = resources.mesh.take();
            *resources = create_panel_resources(device, &self.pipelines, label, (width, height));
            resources.mesh = mesh;
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &resources.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Overwrite the overlay vertex buffer with this frame's rays and cursors.
    pub fn write_overlay(&self, queue: &wgpu::Queue, overlay: &OverlayBatch) {
        if overlay.vertices.is_empty() {
            return;
        }
        let count = overlay.vertices.len().min(MAX_OVERLAY_VERTICES);
        queue.write_buffer(
            &self.overlay_buffer,
            0,
            bytemuck::cast_slice(&overlay.vertices[..count]),
        );
    }

    /// Record one frame: clear `target`, then run `commands` in every eye's
    /// viewport. With no eyes the frame is just cleared.
    pub fn render_frame(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        eyes: &[EyeView],
        commands: &[DrawCommand],
    ) -> wgpu::CommandBuffer {
        for (slot, eye) in self.eyes.iter().zip(eyes) {
            let uniforms = Uniforms::new(eye.view, eye.projection);
            queue.write_buffer(&slot.buffer, 0, bytemuck::cast_slice(&[uniforms]));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("panel_render"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("panel_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (slot, eye) in self.eyes.iter().zip(eyes) {
                let vp = eye.viewport;
                pass.set_viewport(vp.x, vp.y, vp.width, vp.height, 0.0, 1.0);
                for command in commands {
                    self.draw(&mut pass, slot, command);
                }
            }
        }

        encoder.finish()
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, eye: &EyeUniforms, command: &DrawCommand) {
        match command {
            // The pass load op already cleared the whole surface, and eyes
            // never overlap.
            DrawCommand::Clear => {}
            DrawCommand::Panel { kind, depth_write } => {
                let resources = match kind {
                    PanelKind::Main => &self.main,
                    PanelKind::Control => &self.control,
                };
                let Some(mesh) = &resources.mesh else {
                    return;
                };
                pass.set_pipeline(self.pipelines.panel(*depth_write));
                pass.set_bind_group(0, &eye.bind_group, &[]);
                pass.set_bind_group(1, &resources.texture_bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
            DrawCommand::Ray { vertices } => {
                pass.set_pipeline(&self.pipelines.ray);
                pass.set_bind_group(0, &eye.bind_group, &[]);
                pass.set_vertex_buffer(0, self.overlay_buffer.slice(..));
                pass.draw(vertices.clone(), 0..1);
            }
            DrawCommand::Cursor { vertices } => {
                pass.set_pipeline(&self.pipelines.cursor);
                pass.set_bind_group(0, &eye.bind_group, &[]);
                pass.set_vertex_buffer(0, self.overlay_buffer.slice(..));
                pass.draw(vertices.clone(), 0..1);
            }
        }
    }
}

fn create_panel_resources(
    device: &wgpu::Device,
    pipelines: &RenderPipelines,
    label: &str,
    resolution: (u32, u32),
) -> PanelGpuResources {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("{}_texture", label)),
        size: wgpu::Extent3d {
            width: resolution.0,
            height: resolution.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&Default::default());
    let texture_bind_group = pipelines.create_texture_bind_group(device, &view);

    PanelGpuResources {
        mesh: None,
        texture,
        texture_bind_group,
        resolution,
    }
}

fn upload_mesh(device: &wgpu::Device, label: &str, mesh: &PanelMesh) -> MeshBuffers {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{}_vertex_buffer", label)),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{}_index_buffer", label)),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    MeshBuffers {
        vertex_buffer,
        index_buffer,
        index_count: mesh.indices.len() as u32,
    }
}
