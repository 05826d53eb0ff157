use crate::panel::{build_panel, PanelBuild};
use glam::Mat4;
use tracing::debug;
use xrpanel_config::PanelConfig;
use xrpanel_input::ray::PanelBounds;

/// The placed panels: the viewer pose they were anchored to and the
/// geometry last built from it.
#[derive(Debug, Default)]
pub struct PanelScene {
    reference_pose: Option<Mat4>,
    build: Option<PanelBuild>,
    /// Bumped on every rebuild so GPU resources know to re-upload.
    generation: u64,
}

impl PanelScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor the panels to a new viewer pose and rebuild them.
    pub fn place(&mut self, viewer_pose: Mat4, config: &PanelConfig) {
        self.reference_pose = Some(viewer_pose);
        self.rebuild(config);
    }

    /// Rebuild against the current reference pose. Returns `false` when
    /// nothing has been placed yet.
    ///
    /// Meshes and bounds are replaced together, so hit testing never sees
    /// bounds that disagree with what is drawn.
    pub fn rebuild(&mut self, config: &PanelConfig) -> bool {
        let Some(pose) = self.reference_pose else {
            return false;
        };
        self.build = Some(build_panel(&pose, config));
        self.generation += 1;
        debug!(
            generation = self.generation,
            distance = config.distance,
            width = config.width,
            curved = config.curved,
            "Panels rebuilt"
        );
        true
    }

    /// Drop geometry and anchor.
    pub fn clear(&mut self) {
        self.reference_pose = None;
        self.build = None;
    }

    pub fn is_placed(&self) -> bool {
        self.build.is_some()
    }

    pub fn reference_pose(&self) -> Option<&Mat4> {
        self.reference_pose.as_ref()
    }

    pub fn build(&self) -> Option<&PanelBuild> {
        self.build.as_ref()
    }

    pub fn control_bounds(&self) -> Option<&PanelBounds> {
        self.build.as_ref().map(|b| &b.control_bounds)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn rebuild_without_placement_is_noop() {
        let mut scene = PanelScene::new();
        assert!(!scene.rebuild(&PanelConfig::default()));
        assert!(scene.build().is_none());
        assert_eq!(scene.generation(), 0);
    }

    #[test]
    fn rebuild_keeps_reference_pose() {
        let mut scene = PanelScene::new();
        let pose = Mat4::from_translation(Vec3::new(0.0, 1.6, 0.0));
        scene.place(pose, &PanelConfig::default());
        let before = scene.control_bounds().copied().unwrap();

        let mut config = PanelConfig::default();
        config.adjust_distance(5);
        assert!(scene.rebuild(&config));

        assert_eq!(scene.reference_pose(), Some(&pose));
        assert_eq!(scene.generation(), 2);
        let after = scene.control_bounds().unwrap();
        assert!((before.center.z - after.center.z - 0.5).abs() < 1e-5);
    }

    #[test]
    fn clear_drops_everything() {
        let mut scene = PanelScene::new();
        scene.place(Mat4::IDENTITY, &PanelConfig::default());
        scene.clear();
        assert!(!scene.is_placed());
        assert!(scene.reference_pose().is_none());
        assert!(scene.control_bounds().is_none());
    }
}
