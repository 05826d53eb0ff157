use crate::pose::{extract_basis, PoseBasis};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use xrpanel_config::PanelConfig;
use xrpanel_input::ray::PanelBounds;

/// Horizontal subdivisions of a curved panel.
pub const CURVE_SEGMENTS: u32 = 40;
/// Control panel height (meters).
pub const CONTROL_PANEL_HEIGHT: f32 = 0.15;
/// Gap between the main panel's bottom edge and the control panel (meters).
pub const CONTROL_PANEL_GAP: f32 = 0.05;

/// Vertex format for panel meshes: `[x, y, z, u, v]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PanelVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl PanelVertex {
    fn new(position: Vec3, u: f32, v: f32) -> Self {
        Self {
            position: position.to_array(),
            uv: [u, v],
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // uv
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// A generated panel mesh (vertices + indices), already in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelMesh {
    pub vertices: Vec<PanelVertex>,
    pub indices: Vec<u16>,
}

/// Output of one panel rebuild: the main panel and the control panel
/// attached beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelBuild {
    pub main: PanelMesh,
    pub main_bounds: PanelBounds,
    pub control: PanelMesh,
    pub control_bounds: PanelBounds,
}

/// Generate both panels for a viewer pose and config.
///
/// The main panel sits `distance` ahead of the viewer along the level
/// forward direction. Curved panels are a strip of a cylinder centered on
/// the viewer, so every column is equally far from the eyes. The control
/// panel is always flat and hangs below the main panel's flat footprint.
pub fn build_panel(viewer_pose: &Mat4, config: &PanelConfig) -> PanelBuild {
    let basis = extract_basis(viewer_pose);
    let center = basis.position + basis.forward * config.distance;
    let main_bounds = PanelBounds::new(center, basis.right, basis.up, config.width, config.height);

    let main = if config.curved {
        generate_curved_mesh(&basis, config)
    } else {
        generate_flat_mesh(&main_bounds)
    };

    let control_center = center
        - basis.up * (config.height / 2.0 + CONTROL_PANEL_GAP + CONTROL_PANEL_HEIGHT / 2.0);
    let control_bounds = PanelBounds::new(
        control_center,
        basis.right,
        basis.up,
        config.width,
        CONTROL_PANEL_HEIGHT,
    );
    let control = generate_flat_mesh(&control_bounds);

    PanelBuild {
        main,
        main_bounds,
        control,
        control_bounds,
    }
}

/// Flat quad covering `bounds`. UV origin is the top-left corner.
pub fn generate_flat_mesh(bounds: &PanelBounds) -> PanelMesh {
    let half_right = bounds.right * (bounds.width / 2.0);
    let half_up = bounds.up * (bounds.height / 2.0);
    let c = bounds.center;

    let vertices = vec![
        PanelVertex::new(c - half_right + half_up, 0.0, 0.0), // top-left
        PanelVertex::new(c - half_right - half_up, 0.0, 1.0), // bottom-left
        PanelVertex::new(c + half_right - half_up, 1.0, 1.0), // bottom-right
        PanelVertex::new(c + half_right + half_up, 1.0, 0.0), // top-right
    ];

    let indices = vec![0, 1, 2, 0, 2, 3];

    PanelMesh { vertices, indices }
}

fn generate_curved_mesh(basis: &PoseBasis, config: &PanelConfig) -> PanelMesh {
    let radius = config.distance;
    let half_h = config.height / 2.0;

    // Arc length equals the requested width.
    let arc_angle = config.width / radius;
    let step = arc_angle / CURVE_SEGMENTS as f32;

    let cols = CURVE_SEGMENTS + 1;
    let mut vertices = Vec::with_capacity((cols * 2) as usize);

    for i in 0..cols {
        let theta = -arc_angle / 2.0 + i as f32 * step;
        let u = i as f32 / CURVE_SEGMENTS as f32;

        let local_x = theta.sin() * radius;
        let local_z = theta.cos() * radius;
        let column = basis.position + basis.right * local_x + basis.forward * local_z;

        // Top and bottom share the column's U.
        vertices.push(PanelVertex::new(column + basis.up * half_h, u, 0.0));
        vertices.push(PanelVertex::new(column - basis.up * half_h, u, 1.0));
    }

    // Same winding as the flat quad: (top-left, bottom-left, top-right),
    // (bottom-left, bottom-right, top-right).
    let mut indices = Vec::with_capacity((CURVE_SEGMENTS * 6) as usize);
    for i in 0..CURVE_SEGMENTS as u16 {
        let tl = i * 2;
        let bl = tl + 1;
        let tr = tl + 2;
        let br = tl + 3;

        indices.extend_from_slice(&[tl, bl, tr, bl, br, tr]);
    }

    PanelMesh { vertices, indices }
}
