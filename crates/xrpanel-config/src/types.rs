use serde::{Deserialize, Serialize};

/// Smallest allowed panel distance and width (meters).
pub const MIN_EXTENT: f32 = 1.0;
/// Largest allowed panel distance and width (meters).
pub const MAX_EXTENT: f32 = 5.0;
/// Increment applied by one press of a +/- button (meters).
pub const ADJUST_STEP: f32 = 0.1;
/// Panel height / width. Matches the 2048x1152 main panel bitmap.
pub const ASPECT_RATIO: f32 = 9.0 / 16.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Initial panel placement and size.
    pub panel: PanelConfig,
    /// Interpupillary distance in millimeters (typically 55-75mm).
    pub ipd_mm: f32,
    /// Vertical field of view of each eye in degrees.
    pub fov_y_degrees: f32,
    /// Length of a pointer ray that hits nothing (meters).
    pub ray_length: f32,
    /// Number of posed frames to wait before the panel is first placed.
    /// Tracking is often unsettled on the very first frame.
    pub settle_frames: u32,
    /// Start in side-by-side stereo output instead of mono.
    pub stereo: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            panel: PanelConfig::default(),
            ipd_mm: 63.0,
            fov_y_degrees: 90.0,
            ray_length: 3.0,
            settle_frames: 2,
            stereo: false,
        }
    }
}

/// Size and placement of the main panel.
///
/// Fields are public for reading; writes should go through the setters so
/// the limits and the 16:9 aspect lock hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Distance from the viewer to the panel center (meters).
    pub distance: f32,
    /// Panel width (meters). For curved panels this is the arc length.
    pub width: f32,
    /// Panel height (meters), always `width * ASPECT_RATIO`.
    pub height: f32,
    /// Cylindrical strip instead of a flat quad.
    pub curved: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            distance: 2.5,
            width: 2.5,
            height: 2.5 * ASPECT_RATIO,
            curved: false,
        }
    }
}

impl PanelConfig {
    pub fn new(distance: f32, width: f32, curved: bool) -> Self {
        let mut config = Self {
            curved,
            ..Self::default()
        };
        config.set_distance(distance);
        config.set_width(width);
        config
    }

    /// Re-apply limits and aspect lock to every field.
    pub fn normalized(self) -> Self {
        Self::new(self.distance, self.width, self.curved)
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = clamp_extent(distance);
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = clamp_extent(width);
        self.height = self.width * ASPECT_RATIO;
    }

    pub fn set_curved(&mut self, curved: bool) {
        self.curved = curved;
    }

    /// Step the distance by `steps` increments of `ADJUST_STEP`.
    pub fn adjust_distance(&mut self, steps: i32) {
        self.set_distance(self.distance + steps as f32 * ADJUST_STEP);
    }

    /// Step the width by `steps` increments of `ADJUST_STEP`.
    pub fn adjust_width(&mut self, steps: i32) {
        self.set_width(self.width + steps as f32 * ADJUST_STEP);
    }

    pub fn toggle_curved(&mut self) {
        self.curved = !self.curved;
    }
}

fn clamp_extent(value: f32) -> f32 {
    if value.is_nan() {
        return MIN_EXTENT;
    }
    value.clamp(MIN_EXTENT, MAX_EXTENT)
}
