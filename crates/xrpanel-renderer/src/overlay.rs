use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::ops::Range;
use xrpanel_input::controller::PointerVisual;
use xrpanel_input::ray::PanelBounds;
use xrpanel_input::PointerId;

/// Pointers drawn per frame; the overlay vertex buffer is sized for this.
pub const MAX_POINTERS: usize = 4;
/// Segments of the cursor ring.
pub const CURSOR_SEGMENTS: u32 = 8;
/// Cursor ring radius (meters).
pub const CURSOR_RADIUS: f32 = 0.02;

pub const RAY_START_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
pub const RAY_END_COLOR: [f32; 3] = [0.3, 0.3, 1.0];
pub const CURSOR_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

const RAY_VERTICES: u32 = 2;
const CURSOR_VERTICES: u32 = CURSOR_SEGMENTS + 1;
pub const MAX_OVERLAY_VERTICES: usize = MAX_POINTERS * (RAY_VERTICES + CURSOR_VERTICES) as usize;

/// Vertex format for rays and cursors: `[x, y, z, r, g, b]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl OverlayVertex {
    fn new(position: Vec3, color: [f32; 3]) -> Self {
        Self {
            position: position.to_array(),
            color,
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Vertex ranges of one pointer inside an `OverlayBatch`.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayDraw {
    pub pointer: PointerId,
    /// Line list, two vertices.
    pub ray: Range<u32>,
    /// Closed line strip, present only when the ray hits the control panel.
    pub cursor: Option<Range<u32>>,
}

/// All overlay geometry for one frame, in world space. Shared by both eyes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayBatch {
    pub vertices: Vec<OverlayVertex>,
    pub draws: Vec<OverlayDraw>,
}

impl OverlayBatch {
    /// Build rays and cursors for this frame's pointers. Pointers beyond
    /// `MAX_POINTERS` are not drawn.
    pub fn build(visuals: &[PointerVisual], control: Option<&PanelBounds>) -> Self {
        let mut batch = Self::default();
        for visual in visuals.iter().take(MAX_POINTERS) {
            let ray = batch.push_ray(visual);
            let cursor = match (visual.hit, control) {
                (Some(hit), Some(bounds)) => Some(batch.push_cursor(hit.point, bounds)),
                _ => None,
            };
            batch.draws.push(OverlayDraw {
                pointer: visual.pointer,
                ray,
                cursor,
            });
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    fn push_ray(&mut self, visual: &PointerVisual) -> Range<u32> {
        let start = self.vertices.len() as u32;
        let tip = visual.ray.at(visual.length);
        self.vertices.push(OverlayVertex::new(visual.ray.origin, RAY_START_COLOR));
        self.vertices.push(OverlayVertex::new(tip, RAY_END_COLOR));
        start..start + RAY_VERTICES
    }

    /// Ring around `center`, lying in the panel plane. The first vertex is
    /// repeated at the end to close the strip.
    fn push_cursor(&mut self, center: Vec3, bounds: &PanelBounds) -> Range<u32> {
        let start = self.vertices.len() as u32;
        for i in 0..=CURSOR_SEGMENTS {
            let angle = (i % CURSOR_SEGMENTS) as f32 / CURSOR_SEGMENTS as f32 * std::f32::consts::TAU;
            let offset = bounds.right * angle.cos() + bounds.up * angle.sin();
            self.vertices
                .push(OverlayVertex::new(center + offset * CURSOR_RADIUS, CURSOR_COLOR));
        }
        start..start + CURSOR_VERTICES
    }
}
