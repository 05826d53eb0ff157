use crate::{PointerEvent, PointerId, TrackedPointer};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use winit::event::{ElementState, MouseButton};

/// Pointer id used for the mouse-driven pointer.
pub const MOUSE_POINTER: PointerId = PointerId(0);

/// Emulates a tracked pointer with the desktop mouse.
///
/// The pointer ray starts at the eye and passes through the cursor, so
/// whatever is under the cursor is what the pointer targets. Left button
/// press/release produce select events.
pub struct DesktopPointer {
    /// Current cursor position in normalized device coords.
    cursor_ndc: Vec2,
    /// Window size for NDC conversion.
    window_size: Vec2,
    /// Whether the cursor is inside the window.
    inside: bool,
    pressed: bool,
    pending: Vec<PointerEvent>,
}

impl DesktopPointer {
    pub fn new(window_width: f32, window_height: f32) -> Self {
        Self {
            cursor_ndc: Vec2::ZERO,
            window_size: Vec2::new(window_width, window_height),
            inside: false,
            pressed: false,
            pending: Vec::new(),
        }
    }

    pub fn set_window_size(&mut self, width: f32, height: f32) {
        self.window_size = Vec2::new(width.max(1.0), height.max(1.0));
    }

    pub fn cursor_ndc(&self) -> Vec2 {
        self.cursor_ndc
    }

    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        // Convert pixel coords to NDC (-1..1).
        self.cursor_ndc = Vec2::new(
            (x as f32 / self.window_size.x) * 2.0 - 1.0,
            1.0 - (y as f32 / self.window_size.y) * 2.0, // Flip Y.
        );
        self.inside = true;
    }

    pub fn on_cursor_left(&mut self) {
        self.inside = false;
        self.pressed = false;
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left || !self.inside {
            return;
        }
        match state {
            ElementState::Pressed => {
                self.pressed = true;
                self.pending.push(PointerEvent::SelectStart(MOUSE_POINTER));
            }
            ElementState::Released => {
                if self.pressed {
                    self.pending.push(PointerEvent::Select(MOUSE_POINTER));
                }
                self.pressed = false;
            }
        }
    }

    /// Take the events queued since the last frame.
    pub fn drain_events(&mut self) -> Vec<PointerEvent> {
        std::mem::take(&mut self.pending)
    }

    /// The mouse pointer as a tracked pointer for this frame, or `None`
    /// when the cursor is outside the window.
    pub fn tracked_pointer(&self, inv_view_proj: Mat4) -> Option<TrackedPointer> {
        if !self.inside {
            return None;
        }
        Some(TrackedPointer {
            id: MOUSE_POINTER,
            transform: cursor_ray_transform(self.cursor_ndc, inv_view_proj)?,
            targeting: true,
        })
    }
}

/// Unproject an NDC cursor into a pointer transform whose -Z axis runs
/// through the cursor.
pub fn cursor_ray_transform(cursor_ndc: Vec2, inv_view_proj: Mat4) -> Option<Mat4> {
    let near = inv_view_proj * Vec4::new(cursor_ndc.x, cursor_ndc.y, 0.0, 1.0);
    let far = inv_view_proj * Vec4::new(cursor_ndc.x, cursor_ndc.y, 1.0, 1.0);
    if near.w.abs() < f32::EPSILON || far.w.abs() < f32::EPSILON {
        return None;
    }

    let near = near.truncate() / near.w;
    let far = far.truncate() / far.w;
    let direction = (far - near).try_normalize()?;

    let rotation = Quat::from_rotation_arc(Vec3::NEG_Z, direction);
    Some(Mat4::from_rotation_translation(rotation, near))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv_view_proj() -> Mat4 {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        let view = Mat4::from_translation(Vec3::new(0.0, -1.6, 0.0));
        (proj * view).inverse()
    }

    #[test]
    fn centered_cursor_points_straight_ahead() {
        let transform = cursor_ray_transform(Vec2::ZERO, inv_view_proj()).unwrap();
        let dir = -transform.z_axis.truncate();
        assert!((dir - Vec3::NEG_Z).length() < 1e-4, "dir={dir}");
        let origin = transform.w_axis.truncate();
        assert!((origin.y - 1.6).abs() < 1e-3);
    }

    #[test]
    fn click_produces_select_on_release() {
        let mut pointer = DesktopPointer::new(800.0, 600.0);
        pointer.on_cursor_moved(400.0, 300.0);
        pointer.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        pointer.on_mouse_button(MouseButton::Left, ElementState::Released);
        assert_eq!(
            pointer.drain_events(),
            vec![
                PointerEvent::SelectStart(MOUSE_POINTER),
                PointerEvent::Select(MOUSE_POINTER)
            ]
        );
        assert!(pointer.drain_events().is_empty());
    }

    #[test]
    fn cursor_outside_window_has_no_pointer() {
        let mut pointer = DesktopPointer::new(800.0, 600.0);
        assert!(pointer.tracked_pointer(inv_view_proj()).is_none());
        pointer.on_cursor_moved(10.0, 10.0);
        assert!(pointer.tracked_pointer(inv_view_proj()).is_some());
        pointer.on_cursor_left();
        assert!(pointer.tracked_pointer(inv_view_proj()).is_none());
    }
}
