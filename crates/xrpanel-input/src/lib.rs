pub mod controller;
pub mod mouse;
pub mod ray;

use glam::Mat4;

/// Host-assigned identity of a tracked pointer (controller, hand, mouse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

/// A tracked pointer as reported by the host for one frame.
#[derive(Debug, Clone, Copy)]
pub struct TrackedPointer {
    pub id: PointerId,
    /// World transform of the pointer's target ray. The ray leaves the
    /// origin along the transform's -Z axis.
    pub transform: Mat4,
    /// Whether this source emits a targeting ray. Gaze and screen sources
    /// report `false` and are ignored.
    pub targeting: bool,
}

/// Discrete pointer events delivered between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// Trigger pressed. Informational only.
    SelectStart(PointerId),
    /// Trigger released: the confirmed "click".
    Select(PointerId),
}
