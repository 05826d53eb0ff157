use crate::ray::{intersect_ray_panel, Intersection, PanelBounds, Ray};
use crate::{PointerId, TrackedPointer};
use std::collections::BTreeMap;
use tracing::{debug, info};
use xrpanel_config::{ButtonAction, ControlLayout, PanelConfig};

/// Per-pointer interaction state, advanced once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PointerState {
    /// No targeting pointer.
    Idle,
    /// Pointer present, ray misses the control panel.
    RayTracking,
    /// Ray hits the control panel this frame.
    Hovering,
    /// A select was confirmed on a button since the last update.
    Selected,
}

/// Everything the renderer needs to draw one pointer this frame.
#[derive(Debug, Clone, Copy)]
pub struct PointerVisual {
    pub pointer: PointerId,
    pub ray: Ray,
    /// Rendered ray length: hit distance on a hit, the default otherwise.
    pub length: f32,
    pub hit: Option<Intersection>,
    pub state: PointerState,
}

/// Result of a confirmed select event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The pointer had no intersection with the control panel.
    NoIntersection,
    /// The pointer hit the panel but not a button.
    Missed,
    /// A button action was applied. `Recenter` must be carried out by the
    /// caller on the next frame; every other action already changed the
    /// config.
    Applied(ButtonAction),
}

#[derive(Debug, Clone, Copy)]
struct PointerTrack {
    state: PointerState,
    hit: Option<Intersection>,
}

/// Tracks pointer rays against the control panel and turns select events
/// into panel config changes.
///
/// Intersections are kept per pointer so two hands can never trigger each
/// other's buttons.
pub struct InteractionController {
    layout: ControlLayout,
    ray_length: f32,
    pointers: BTreeMap<PointerId, PointerTrack>,
}

impl InteractionController {
    pub fn new(layout: ControlLayout, ray_length: f32) -> Self {
        Self {
            layout,
            ray_length,
            pointers: BTreeMap::new(),
        }
    }

    pub fn layout(&self) -> &ControlLayout {
        &self.layout
    }

    /// Aggregate state: the most engaged state over all pointers.
    pub fn state(&self) -> PointerState {
        self.pointers
            .values()
            .map(|p| p.state)
            .max()
            .unwrap_or(PointerState::Idle)
    }

    pub fn pointer_state(&self, id: PointerId) -> PointerState {
        self.pointers
            .get(&id)
            .map_or(PointerState::Idle, |p| p.state)
    }

    /// The intersection remembered for a pointer from the latest update.
    pub fn last_intersection(&self, id: PointerId) -> Option<Intersection> {
        self.pointers.get(&id).and_then(|p| p.hit)
    }

    /// Per-frame update: cast every targeting pointer against the control
    /// panel and remember its hit. Pointers that vanished fall back to Idle.
    pub fn update(
        &mut self,
        pointers: &[TrackedPointer],
        control: Option<&PanelBounds>,
    ) -> Vec<PointerVisual> {
        let mut visuals = Vec::with_capacity(pointers.len());
        let mut tracks = BTreeMap::new();

        for pointer in pointers.iter().filter(|p| p.targeting) {
            let ray = Ray::from_transform(&pointer.transform);
            let hit = control.and_then(|bounds| intersect_ray_panel(&ray, bounds));
            let state = if hit.is_some() {
                PointerState::Hovering
            } else {
                PointerState::RayTracking
            };

            let previous = self.pointer_state(pointer.id);
            if previous != state && previous != PointerState::Selected {
                debug!(pointer = pointer.id.0, ?previous, ?state, "Pointer state changed");
            }

            tracks.insert(pointer.id, PointerTrack { state, hit });
            visuals.push(PointerVisual {
                pointer: pointer.id,
                ray,
                length: hit.map_or(self.ray_length, |h| h.distance),
                hit,
                state,
            });
        }

        self.pointers = tracks;
        visuals
    }

    /// Handle a confirmed select from `id` using its most recent hit.
    pub fn select(&mut self, id: PointerId, config: &mut PanelConfig) -> SelectOutcome {
        let Some(track) = self.pointers.get_mut(&id) else {
            return SelectOutcome::NoIntersection;
        };
        let Some(hit) = track.hit else {
            return SelectOutcome::NoIntersection;
        };

        let Some(action) = self.layout.hit_test(hit.u, hit.v) else {
            debug!(pointer = id.0, u = hit.u, v = hit.v, "Select missed all buttons");
            return SelectOutcome::Missed;
        };

        apply_action(action, config);
        track.state = PointerState::Selected;
        info!(
            pointer = id.0,
            ?action,
            distance = config.distance,
            width = config.width,
            curved = config.curved,
            "Control panel action"
        );
        SelectOutcome::Applied(action)
    }
}

/// Apply a button action to the panel config. `Recenter` leaves the config
/// untouched.
pub fn apply_action(action: ButtonAction, config: &mut PanelConfig) {
    match action {
        ButtonAction::DecreaseDistance => config.adjust_distance(-1),
        ButtonAction::IncreaseDistance => config.adjust_distance(1),
        ButtonAction::DecreaseWidth => config.adjust_width(-1),
        ButtonAction::IncreaseWidth => config.adjust_width(1),
        ButtonAction::ToggleCurved => config.toggle_curved(),
        ButtonAction::Recenter => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Quat, Vec3};

    fn control_bounds() -> PanelBounds {
        PanelBounds::new(Vec3::new(0.0, 0.0, -2.0), Vec3::X, Vec3::Y, 2.0, 0.15)
    }

    /// A pointer at the origin aimed at a UV of the control panel.
    fn pointer_at(id: u32, u: f32, v: f32) -> TrackedPointer {
        let target = control_bounds().point_at_uv(u, v);
        let rotation = Quat::from_rotation_arc(Vec3::NEG_Z, target.normalize());
        TrackedPointer {
            id: PointerId(id),
            transform: Mat4::from_rotation_translation(rotation, Vec3::ZERO),
            targeting: true,
        }
    }

    fn controller() -> InteractionController {
        InteractionController::new(ControlLayout::default(), 3.0)
    }

    #[test]
    fn select_without_hit_is_noop() {
        let mut controller = controller();
        let mut config = PanelConfig::default();
        assert_eq!(
            controller.select(PointerId(0), &mut config),
            SelectOutcome::NoIntersection
        );
        assert_eq!(config, PanelConfig::default());
    }

    #[test]
    fn width_plus_scenario() {
        let mut controller = controller();
        let mut config = PanelConfig::new(2.5, 2.5, false);
        let bounds = control_bounds();

        controller.update(&[pointer_at(0, 0.42, 0.7)], Some(&bounds));
        assert_eq!(controller.state(), PointerState::Hovering);

        let outcome = controller.select(PointerId(0), &mut config);
        assert_eq!(outcome, SelectOutcome::Applied(ButtonAction::IncreaseWidth));
        assert!((config.width - 2.6).abs() < 1e-5);
        assert!((config.height - 2.6 * 9.0 / 16.0).abs() < 1e-5);
        assert_eq!(controller.state(), PointerState::Selected);
    }

    #[test]
    fn distance_plus_at_left_section() {
        let mut controller = controller();
        let mut config = PanelConfig::default();
        controller.update(&[pointer_at(0, 0.18, 0.7)], Some(&control_bounds()));
        assert_eq!(
            controller.select(PointerId(0), &mut config),
            SelectOutcome::Applied(ButtonAction::IncreaseDistance)
        );
        assert!((config.distance - 2.6).abs() < 1e-5);
    }

    #[test]
    fn select_outside_buttons_is_missed() {
        let mut controller = controller();
        let mut config = PanelConfig::default();
        controller.update(&[pointer_at(0, 0.6, 0.1)], Some(&control_bounds()));
        assert_eq!(
            controller.select(PointerId(0), &mut config),
            SelectOutcome::Missed
        );
        assert_eq!(config, PanelConfig::default());
    }

    #[test]
    fn recenter_leaves_config_alone() {
        let mut controller = controller();
        let mut config = PanelConfig::default();
        controller.update(&[pointer_at(0, 0.9, 0.6)], Some(&control_bounds()));
        assert_eq!(
            controller.select(PointerId(0), &mut config),
            SelectOutcome::Applied(ButtonAction::Recenter)
        );
        assert_eq!(config, PanelConfig::default());
    }

    #[test]
    fn hits_are_kept_per_pointer() {
        let mut controller = controller();
        let mut config = PanelConfig::default();
        let mut away = pointer_at(1, 0.5, 0.5);
        away.transform = Mat4::from_rotation_y(std::f32::consts::PI);

        let visuals = controller.update(&[pointer_at(0, 0.62, 0.6), away], Some(&control_bounds()));
        assert!(visuals[0].hit.is_some());
        assert!(visuals[1].hit.is_none());
        assert_eq!(visuals[1].length, 3.0);
        assert!((visuals[0].length - visuals[0].hit.unwrap().distance).abs() < 1e-6);

        // The pointer aimed away must not fire the other pointer's button.
        assert_eq!(
            controller.select(PointerId(1), &mut config),
            SelectOutcome::NoIntersection
        );
        assert!(!config.curved);
        assert_eq!(
            controller.select(PointerId(0), &mut config),
            SelectOutcome::Applied(ButtonAction::ToggleCurved)
        );
        assert!(config.curved);
    }

    #[test]
    fn non_targeting_and_vanished_pointers_are_idle() {
        let mut controller = controller();
        let mut gaze = pointer_at(0, 0.5, 0.5);
        gaze.targeting = false;
        let visuals = controller.update(&[gaze], Some(&control_bounds()));
        assert!(visuals.is_empty());
        assert_eq!(controller.state(), PointerState::Idle);

        controller.update(&[pointer_at(1, 0.5, 0.5)], Some(&control_bounds()));
        assert_eq!(controller.pointer_state(PointerId(1)), PointerState::Hovering);
        controller.update(&[], Some(&control_bounds()));
        assert_eq!(controller.pointer_state(PointerId(1)), PointerState::Idle);
    }

    #[test]
    fn missing_control_panel_means_ray_tracking() {
        let mut controller = controller();
        let visuals = controller.update(&[pointer_at(0, 0.5, 0.5)], None);
        assert_eq!(visuals[0].state, PointerState::RayTracking);
        assert_eq!(visuals[0].length, 3.0);
    }
}
