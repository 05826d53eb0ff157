use crate::pose::invert;
use glam::{Mat4, Vec3};
use tracing::warn;

/// Which eye a view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    /// Single full-window view from between the eyes.
    Mono,
    Left,
    Right,
}

/// Pixel rectangle of the surface an eye renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// One eye's matrices and target rectangle for a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub eye: Eye,
    pub viewport: Viewport,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Camera for rendering the panels from the tracked viewer.
///
/// The viewer transform comes from the pose source every frame. For stereo
/// output each eye is offset by half the IPD along the viewer's local X
/// axis and rendered into its half of the surface.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Interpupillary distance in meters.
    pub ipd: f32,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Near clipping plane (meters).
    pub near: f32,
    /// Far clipping plane (meters).
    pub far: f32,
}

impl Camera {
    pub fn new(ipd_mm: f32, fov_y_degrees: f32) -> Self {
        Self {
            ipd: ipd_mm / 1000.0, // Convert mm to meters.
            fov_y_degrees,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            aspect_ratio,
            self.near,
            self.far,
        )
    }

    /// World transform of an eye.
    pub fn eye_transform(&self, viewer: &Mat4, eye: Eye) -> Mat4 {
        let offset = match eye {
            Eye::Mono => 0.0,
            Eye::Left => -self.ipd / 2.0,
            Eye::Right => self.ipd / 2.0,
        };
        *viewer * Mat4::from_translation(Vec3::new(offset, 0.0, 0.0))
    }

    /// Views to render this frame for a `width` x `height` surface.
    ///
    /// Eyes whose transform cannot be inverted are left out; the rest of
    /// the frame still renders.
    pub fn eye_views(&self, viewer: &Mat4, stereo: bool, width: u32, height: u32) -> Vec<EyeView> {
        let (w, h) = (width as f32, height as f32);
        let eyes: &[(Eye, Viewport)] = if stereo {
            &[
                (
                    Eye::Left,
                    Viewport { x: 0.0, y: 0.0, width: w / 2.0, height: h },
                ),
                (
                    Eye::Right,
                    Viewport { x: w / 2.0, y: 0.0, width: w / 2.0, height: h },
                ),
            ]
        } else {
            &[(Eye::Mono, Viewport { x: 0.0, y: 0.0, width: w, height: h })]
        };

        eyes.iter()
            .filter_map(|&(eye, viewport)| {
                let view = match invert(&self.eye_transform(viewer, eye)) {
                    Ok(view) => view,
                    Err(e) => {
                        warn!(?eye, %e, "Skipping eye with singular transform");
                        return None;
                    }
                };
                Some(EyeView {
                    eye,
                    viewport,
                    view,
                    projection: self.projection_matrix(viewport.aspect_ratio()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec4};

    #[test]
    fn mono_view_fills_surface() {
        let camera = Camera::new(63.0, 90.0);
        let views = camera.eye_views(&Mat4::IDENTITY, false, 1920, 1080);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].eye, Eye::Mono);
        assert_eq!(views[0].viewport.width, 1920.0);
        assert!(views[0].view.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn stereo_splits_surface_and_offsets_eyes() {
        let camera = Camera::new(64.0, 90.0);
        let viewer = Mat4::from_rotation_translation(
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 1.6, 0.0),
        );
        let views = camera.eye_views(&viewer, true, 3840, 1080);
        assert_eq!(views.len(), 2);
        assert_eq!(views[1].viewport.x, 1920.0);
        assert!((views[0].viewport.aspect_ratio() - 1920.0 / 1080.0).abs() < 1e-6);

        // Facing -X, the viewer's right is -Z: the left eye sits at +Z.
        let left_eye = views[0].view.inverse() * Vec4::W;
        let right_eye = views[1].view.inverse() * Vec4::W;
        assert!((left_eye.z - 0.032).abs() < 1e-5);
        assert!((right_eye.z + 0.032).abs() < 1e-5);
        assert!((left_eye.y - 1.6).abs() < 1e-5);
    }

    #[test]
    fn singular_viewer_yields_no_views() {
        let camera = Camera::new(63.0, 90.0);
        assert!(camera.eye_views(&Mat4::ZERO, true, 3840, 1080).is_empty());
    }
}
