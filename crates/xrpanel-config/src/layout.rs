//! Pixel layout of the control panel bitmap.
//!
//! The painter fills these rectangles and the interaction controller maps
//! pointer UVs back onto them, so both sides read the same table.

use serde::{Deserialize, Serialize};

/// What a control panel button does when selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonAction {
    DecreaseDistance,
    IncreaseDistance,
    DecreaseWidth,
    IncreaseWidth,
    ToggleCurved,
    Recenter,
}

/// The four equal-width columns of the control panel, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSection {
    Distance,
    Width,
    Curved,
    Recenter,
}

impl ControlSection {
    pub const ALL: [ControlSection; 4] = [
        ControlSection::Distance,
        ControlSection::Width,
        ControlSection::Curved,
        ControlSection::Recenter,
    ];

    /// Section containing a horizontal texture coordinate.
    pub fn from_u(u: f32) -> Self {
        if u < 0.25 {
            ControlSection::Distance
        } else if u < 0.50 {
            ControlSection::Width
        } else if u < 0.75 {
            ControlSection::Curved
        } else {
            ControlSection::Recenter
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl ButtonAction {
    pub fn section(self) -> ControlSection {
        match self {
            ButtonAction::DecreaseDistance | ButtonAction::IncreaseDistance => {
                ControlSection::Distance
            }
            ButtonAction::DecreaseWidth | ButtonAction::IncreaseWidth => ControlSection::Width,
            ButtonAction::ToggleCurved => ControlSection::Curved,
            ButtonAction::Recenter => ControlSection::Recenter,
        }
    }
}

/// Axis-aligned rectangle in bitmap pixels, origin top-left, Y down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Strict interior test; edges belong to no button.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.left as f32 && x < self.right as f32 && y > self.top as f32 && y < self.bottom as f32
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// A fixed button rectangle bound to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonRegion {
    pub action: ButtonAction,
    pub rect: PixelRect,
}

/// Bitmap size and button table of the control panel.
#[derive(Debug, Clone)]
pub struct ControlLayout {
    pub width: u32,
    pub height: u32,
    pub buttons: Vec<ButtonRegion>,
}

impl Default for ControlLayout {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 300,
            buttons: vec![
                ButtonRegion {
                    action: ButtonAction::DecreaseDistance,
                    rect: PixelRect::new(45, 165, 225, 255),
                },
                ButtonRegion {
                    action: ButtonAction::IncreaseDistance,
                    rect: PixelRect::new(285, 165, 465, 255),
                },
                ButtonRegion {
                    action: ButtonAction::DecreaseWidth,
                    rect: PixelRect::new(557, 165, 737, 255),
                },
                ButtonRegion {
                    action: ButtonAction::IncreaseWidth,
                    rect: PixelRect::new(797, 165, 977, 255),
                },
                ButtonRegion {
                    action: ButtonAction::ToggleCurved,
                    rect: PixelRect::new(1130, 120, 1430, 255),
                },
                ButtonRegion {
                    action: ButtonAction::Recenter,
                    rect: PixelRect::new(1642, 120, 1942, 255),
                },
            ],
        }
    }
}

impl ControlLayout {
    /// Width of one section column in pixels.
    pub fn section_width(&self) -> u32 {
        self.width / ControlSection::ALL.len() as u32
    }

    /// Convert a panel UV into bitmap pixel coordinates.
    pub fn uv_to_pixel(&self, u: f32, v: f32) -> (f32, f32) {
        (u * self.width as f32, v * self.height as f32)
    }

    /// Find the button under a UV coordinate.
    ///
    /// Only buttons of the section column containing `u` are considered.
    pub fn hit_test(&self, u: f32, v: f32) -> Option<ButtonAction> {
        let section = ControlSection::from_u(u);
        let (x, y) = self.uv_to_pixel(u, v);
        self.buttons
            .iter()
            .filter(|b| b.action.section() == section)
            .find(|b| b.rect.contains(x, y))
            .map(|b| b.action)
    }

    pub fn button(&self, action: ButtonAction) -> Option<&ButtonRegion> {
        self.buttons.iter().find(|b| b.action == action)
    }
}
