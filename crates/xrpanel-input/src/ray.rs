use glam::{Mat4, Vec3};

/// Rays closer to parallel than this (|dir . normal|) never hit.
pub const PARALLEL_EPSILON: f32 = 1e-4;

/// Slack on the extent test (meters). Rays aimed exactly at an edge or
/// corner still land after rounding.
pub const EXTENT_EPSILON: f32 = 1e-4;

/// A ray in world space. `direction` is not required to be unit length;
/// intersection distances are expressed in multiples of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// The target ray of a tracked transform: translation column as origin,
    /// negated third column (local -Z) as direction.
    pub fn from_transform(transform: &Mat4) -> Self {
        Self {
            origin: transform.w_axis.truncate(),
            direction: -transform.z_axis.truncate(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// World-space rectangle of a panel: center, orthonormal basis and extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelBounds {
    pub center: Vec3,
    /// Unit vector toward increasing U.
    pub right: Vec3,
    /// Unit vector toward decreasing V (texture top).
    pub up: Vec3,
    /// Unit normal, `right x up`. Points back toward the viewer.
    pub forward: Vec3,
    pub width: f32,
    pub height: f32,
}

impl PanelBounds {
    pub fn new(center: Vec3, right: Vec3, up: Vec3, width: f32, height: f32) -> Self {
        Self {
            center,
            right,
            up,
            forward: right.cross(up),
            width,
            height,
        }
    }

    /// World position of a UV coordinate on the panel.
    pub fn point_at_uv(&self, u: f32, v: f32) -> Vec3 {
        self.center + self.right * ((u - 0.5) * self.width) + self.up * ((0.5 - v) * self.height)
    }
}

/// A ray hit on a panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub point: Vec3,
    pub u: f32,
    pub v: f32,
    /// Ray parameter of the hit.
    pub distance: f32,
}

/// Intersect a ray with a panel rectangle.
///
/// Returns `None` when the ray is parallel to the panel plane, the plane is
/// behind the ray origin, or the hit falls outside the panel extents.
pub fn intersect_ray_panel(ray: &Ray, bounds: &PanelBounds) -> Option<Intersection> {
    let denom = ray.direction.dot(bounds.forward);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let t = (bounds.center - ray.origin).dot(bounds.forward) / denom;
    if t < 0.0 {
        return None;
    }

    let point = ray.at(t);
    let to_hit = point - bounds.center;
    let offset_right = to_hit.dot(bounds.right);
    let offset_up = to_hit.dot(bounds.up);

    let half_width = bounds.width / 2.0 + EXTENT_EPSILON;
    let half_height = bounds.height / 2.0 + EXTENT_EPSILON;
    if offset_right.abs() > half_width || offset_up.abs() > half_height {
        return None;
    }

    Some(Intersection {
        point,
        u: (offset_right / bounds.width + 0.5).clamp(0.0, 1.0),
        // Texture origin is top-left, so V grows downward.
        v: (0.5 - offset_up / bounds.height).clamp(0.0, 1.0),
        distance: t,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x1 panel two meters down -Z, facing the origin.
    fn panel() -> PanelBounds {
        PanelBounds::new(Vec3::new(0.0, 0.0, -2.0), Vec3::X, Vec3::Y, 2.0, 1.0)
    }

    fn ray_to(target: Vec3) -> Ray {
        Ray::new(Vec3::ZERO, target.normalize())
    }

    #[test]
    fn center_hit_is_mid_uv() {
        let hit = intersect_ray_panel(&ray_to(Vec3::new(0.0, 0.0, -2.0)), &panel()).unwrap();
        assert!((hit.u - 0.5).abs() < 1e-6);
        assert!((hit.v - 0.5).abs() < 1e-6);
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert!((hit.point - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn corners_map_to_uv_extremes() {
        let bounds = panel();
        let top_left = bounds.point_at_uv(0.0, 0.0);
        let hit = intersect_ray_panel(&ray_to(top_left), &bounds).unwrap();
        assert!(hit.u.abs() < 1e-3, "u={}", hit.u);
        assert!(hit.v.abs() < 1e-3, "v={}", hit.v);

        let bottom_right = bounds.point_at_uv(1.0, 1.0);
        let hit = intersect_ray_panel(&ray_to(bottom_right), &bounds).unwrap();
        assert!((hit.u - 1.0).abs() < 1e-3, "u={}", hit.u);
        assert!((hit.v - 1.0).abs() < 1e-3, "v={}", hit.v);
    }

    #[test]
    fn exact_corners_hit_from_rotated_viewers() {
        for step in 0..36 {
            let yaw = step as f32 * std::f32::consts::TAU / 36.0;
            let rotation = glam::Quat::from_rotation_y(yaw);
            let eye = Vec3::new(0.3, 1.6, -0.7);
            let right = rotation * Vec3::X;
            let forward = rotation * Vec3::NEG_Z;
            let bounds = PanelBounds::new(eye + forward * 2.5, right, Vec3::Y, 2.5, 2.5 * 9.0 / 16.0);

            for (u, v) in [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)] {
                let corner = bounds.point_at_uv(u, v);
                let hit = intersect_ray_panel(&Ray::new(eye, corner - eye), &bounds)
                    .unwrap_or_else(|| panic!("yaw={yaw} corner=({u}, {v}) missed"));
                assert!((hit.u - u).abs() < 1e-3, "u={} expected {u}", hit.u);
                assert!((hit.v - v).abs() < 1e-3, "v={} expected {v}", hit.v);
                assert!((0.0..=1.0).contains(&hit.u) && (0.0..=1.0).contains(&hit.v));
            }
        }
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::X);
        assert!(intersect_ray_panel(&ray, &panel()).is_none());

        let grazing = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, -0.5e-4));
        assert!(intersect_ray_panel(&grazing, &panel()).is_none());
    }

    #[test]
    fn ray_pointing_away_misses() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(intersect_ray_panel(&ray, &panel()).is_none());
    }

    #[test]
    fn hit_outside_extent_misses() {
        let ray = ray_to(Vec3::new(1.5, 0.0, -2.0));
        assert!(intersect_ray_panel(&ray, &panel()).is_none());
        let ray = ray_to(Vec3::new(0.0, 0.6, -2.0));
        assert!(intersect_ray_panel(&ray, &panel()).is_none());
        let ray = ray_to(Vec3::new(1.001, 0.0, -2.0));
        assert!(intersect_ray_panel(&ray, &panel()).is_none());
    }

    #[test]
    fn ray_from_transform_points_down_negative_z() {
        let transform = Mat4::from_translation(Vec3::new(0.1, 1.6, 0.0));
        let ray = Ray::from_transform(&transform);
        assert_eq!(ray.origin, Vec3::new(0.1, 1.6, 0.0));
        assert_eq!(ray.direction, Vec3::NEG_Z);
    }

    #[test]
    fn point_at_uv_inverts_intersection() {
        let bounds = panel();
        let target = bounds.point_at_uv(0.25, 0.75);
        let hit = intersect_ray_panel(&ray_to(target), &bounds).unwrap();
        assert!((hit.u - 0.25).abs() < 1e-5);
        assert!((hit.v - 0.75).abs() < 1e-5);
    }
}
