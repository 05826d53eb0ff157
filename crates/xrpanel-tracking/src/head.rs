use glam::{EulerRot, Mat4, Quat, Vec3};
use tracing::info;
use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Standing eye height used for the simulated head (meters).
pub const EYE_HEIGHT: f32 = 1.6;
/// Turn rate while an arrow key is held (radians per second).
const TURN_RATE: f32 = 1.2;
/// Pitch is limited short of straight up/down.
const MAX_PITCH: f32 = 1.4;

/// Keyboard-driven head pose for desktop runs.
///
/// Arrow keys turn the head; `P` toggles simulated tracking loss so the
/// pose-unavailable path can be exercised without hardware.
#[derive(Debug, Clone)]
pub struct SimulatedHead {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    turning: TurnKeys,
    tracking_lost: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct TurnKeys {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl Default for SimulatedHead {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, EYE_HEIGHT, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            turning: TurnKeys::default(),
            tracking_lost: false,
        }
    }
}

impl SimulatedHead {
    /// Feed a key event. Returns `true` if the key was consumed.
    pub fn on_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        let pressed = state == ElementState::Pressed;
        match key {
            KeyCode::ArrowLeft => self.turning.left = pressed,
            KeyCode::ArrowRight => self.turning.right = pressed,
            KeyCode::ArrowUp => self.turning.up = pressed,
            KeyCode::ArrowDown => self.turning.down = pressed,
            KeyCode::KeyP if pressed => {
                self.tracking_lost = !self.tracking_lost;
                info!(lost = self.tracking_lost, "Simulated tracking loss toggled");
            }
            _ => return false,
        }
        true
    }

    /// Integrate held keys over `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let yaw_input = self.turning.left as i32 - self.turning.right as i32;
        let pitch_input = self.turning.up as i32 - self.turning.down as i32;
        self.yaw += yaw_input as f32 * TURN_RATE * dt;
        self.pitch = (self.pitch + pitch_input as f32 * TURN_RATE * dt).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Head transform, or `None` while tracking is lost.
    pub fn transform(&self) -> Option<Mat4> {
        if self.tracking_lost {
            return None;
        }
        Some(Mat4::from_rotation_translation(self.orientation(), self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_key_turns_head() {
        let mut head = SimulatedHead::default();
        head.on_key(KeyCode::ArrowLeft, ElementState::Pressed);
        head.advance(0.5);
        assert!((head.yaw - 0.6).abs() < 1e-6);
        head.on_key(KeyCode::ArrowLeft, ElementState::Released);
        head.advance(0.5);
        assert!((head.yaw - 0.6).abs() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut head = SimulatedHead::default();
        head.on_key(KeyCode::ArrowUp, ElementState::Pressed);
        head.advance(10.0);
        assert_eq!(head.pitch, MAX_PITCH);
    }

    #[test]
    fn tracking_loss_hides_pose() {
        let mut head = SimulatedHead::default();
        assert!(head.transform().is_some());
        assert!(head.on_key(KeyCode::KeyP, ElementState::Pressed));
        assert!(head.transform().is_none());
    }

    #[test]
    fn default_pose_looks_down_negative_z() {
        let head = SimulatedHead::default();
        let m = head.transform().unwrap();
        assert!((-m.z_axis.truncate() - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(m.w_axis.truncate(), Vec3::new(0.0, EYE_HEIGHT, 0.0));
    }
}
