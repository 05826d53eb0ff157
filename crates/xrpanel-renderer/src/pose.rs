use glam::{Mat4, Vec3};
use thiserror::Error;

/// Determinants smaller than this are treated as singular.
pub const SINGULAR_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PoseError {
    #[error("Transform is singular (determinant {0})")]
    SingularTransform(f32),
}

/// Build a transform from 16 column-major floats, as hosts report them.
pub fn transform_from_cols(cols: [f32; 16]) -> Mat4 {
    Mat4::from_cols_array(&cols)
}

/// Invert a 4x4 transform.
///
/// Fails instead of producing NaNs when the matrix is (numerically)
/// singular; callers skip whatever depended on the inverse.
pub fn invert(m: &Mat4) -> Result<Mat4, PoseError> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(PoseError::SingularTransform(det));
    }
    Ok(m.inverse())
}

/// Yaw-only placement frame derived from a viewer transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseBasis {
    pub position: Vec3,
    /// Horizontal unit vector the viewer faces.
    pub forward: Vec3,
    /// Always world up.
    pub up: Vec3,
    /// `forward x up`.
    pub right: Vec3,
}

/// Extract a level basis from a viewer transform.
///
/// Pitch and roll are discarded: forward is the viewer's -Z axis flattened
/// onto the horizontal plane, up is world up. A panel placed with this
/// basis stays upright whatever the head was doing at the time.
pub fn extract_basis(m: &Mat4) -> PoseBasis {
    let position = m.w_axis.truncate();
    let look = -m.z_axis.truncate();

    // Looking straight up or down leaves no usable heading.
    let flat = Vec3::new(look.x, 0.0, look.z);
    let forward = if flat.length() > 1e-3 {
        flat.normalize()
    } else {
        Vec3::NEG_Z
    };
    let up = Vec3::Y;
    let right = forward.cross(up).normalize();

    PoseBasis {
        position,
        forward,
        up,
        right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn invert_round_trips() {
        let m = Mat4::from_rotation_translation(
            Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.2),
            Vec3::new(0.3, 1.6, -0.4),
        );
        let inv = invert(&m).unwrap();
        let id = m * inv;
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let m = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(invert(&m), Err(PoseError::SingularTransform(_))));
        assert!(invert(&Mat4::ZERO).is_err());
        assert!(invert(&Mat4::NAN).is_err());
    }

    #[test]
    fn basis_ignores_pitch_and_roll() {
        let yaw = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let tilted = yaw * Quat::from_rotation_x(0.6) * Quat::from_rotation_z(0.3);
        let basis = extract_basis(&Mat4::from_rotation_translation(tilted, Vec3::new(0.0, 1.6, 0.0)));

        // Yawed 90 degrees left: facing -X.
        assert!((basis.forward - Vec3::NEG_X).length() < 1e-5, "forward={}", basis.forward);
        assert_eq!(basis.up, Vec3::Y);
        assert!((basis.right - Vec3::NEG_Z).length() < 1e-5, "right={}", basis.right);
        assert_eq!(basis.position, Vec3::new(0.0, 1.6, 0.0));
    }

    #[test]
    fn identity_faces_negative_z() {
        let basis = extract_basis(&Mat4::IDENTITY);
        assert_eq!(basis.forward, Vec3::NEG_Z);
        assert_eq!(basis.right, Vec3::X);
    }

    #[test]
    fn looking_straight_down_falls_back() {
        let m = Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2);
        let basis = extract_basis(&m);
        assert_eq!(basis.forward, Vec3::NEG_Z);
        assert!((basis.right.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn column_major_input() {
        let mut cols = [0.0; 16];
        cols[0] = 1.0;
        cols[5] = 1.0;
        cols[10] = 1.0;
        cols[15] = 1.0;
        cols[12] = 2.0;
        cols[13] = 3.0;
        cols[14] = 4.0;
        let m = transform_from_cols(cols);
        assert_eq!(m.w_axis.truncate(), Vec3::new(2.0, 3.0, 4.0));
    }
}
