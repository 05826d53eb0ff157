pub mod head;

use glam::Mat4;
use head::SimulatedHead;
use xrpanel_input::mouse::DesktopPointer;
use xrpanel_input::{PointerEvent, TrackedPointer};

/// Everything the host reports for one display refresh.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Viewer (head) transform, `None` when tracking has no pose this frame.
    pub viewer: Option<Mat4>,
    pub pointers: Vec<TrackedPointer>,
    /// Discrete pointer events received since the previous frame.
    pub events: Vec<PointerEvent>,
}

/// A host runtime that supplies poses once per frame.
pub trait PoseSource {
    fn poll(&mut self, dt: f32) -> FrameInput;
}

/// Desktop stand-in for an XR runtime: keyboard head, mouse pointer.
pub struct DesktopTracker {
    pub head: SimulatedHead,
    pub pointer: DesktopPointer,
    projection: Mat4,
}

impl DesktopTracker {
    pub fn new(window_width: f32, window_height: f32, projection: Mat4) -> Self {
        Self {
            head: SimulatedHead::default(),
            pointer: DesktopPointer::new(window_width, window_height),
            projection,
        }
    }

    /// Projection of the view the mouse cursor lives in.
    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }
}

impl PoseSource for DesktopTracker {
    fn poll(&mut self, dt: f32) -> FrameInput {
        self.head.advance(dt);
        let viewer = self.head.transform();

        // Without a head pose there is no view to unproject the cursor through.
        let pointers = viewer
            .and_then(|head| {
                let inv_view_proj = head * self.projection.inverse();
                self.pointer.tracked_pointer(inv_view_proj)
            })
            .into_iter()
            .collect();

        FrameInput {
            viewer,
            pointers,
            events: self.pointer.drain_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use winit::event::{ElementState, MouseButton};
    use winit::keyboard::KeyCode;

    fn tracker() -> DesktopTracker {
        let projection = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        DesktopTracker::new(800.0, 800.0, projection)
    }

    #[test]
    fn cursor_in_center_follows_head_forward() {
        let mut tracker = tracker();
        tracker.pointer.on_cursor_moved(400.0, 400.0);
        let input = tracker.poll(0.016);
        assert!(input.viewer.is_some());
        assert_eq!(input.pointers.len(), 1);
        let dir = -input.pointers[0].transform.z_axis.truncate();
        assert!((dir - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn lost_tracking_reports_nothing_but_events() {
        let mut tracker = tracker();
        tracker.pointer.on_cursor_moved(400.0, 400.0);
        tracker.head.on_key(KeyCode::KeyP, ElementState::Pressed);
        tracker.pointer.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        let input = tracker.poll(0.016);
        assert!(input.viewer.is_none());
        assert!(input.pointers.is_empty());
        assert_eq!(input.events.len(), 1);
    }
}
