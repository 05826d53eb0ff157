pub mod control;
pub mod placeholder;
pub mod worker;

use anyhow::Result;
use xrpanel_config::PanelConfig;

/// Main panel bitmap size (16:9).
pub const MAIN_PANEL_SIZE: (u32, u32) = (2048, 1152);

/// An RGBA8 bitmap, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Bitmap {
    /// A bitmap filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Self {
            data,
            width,
            height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Fill the half-open pixel rectangle `[left, right) x [top, bottom)`,
    /// clipped to the bitmap.
    pub fn fill_rect(&mut self, left: u32, top: u32, right: u32, bottom: u32, rgba: [u8; 4]) {
        let right = right.min(self.width);
        let bottom = bottom.min(self.height);
        for y in top..bottom {
            let row = (y * self.width) as usize * 4;
            for x in left..right {
                let i = row + x as usize * 4;
                self.data[i..i + 4].copy_from_slice(&rgba);
            }
        }
    }
}

/// Which panel a bitmap is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaintTarget {
    Main,
    Control,
}

/// A request to repaint one panel for the given config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintRequest {
    pub target: PaintTarget,
    pub config: PanelConfig,
}

/// Texture-generation collaborator: turns a panel config into a bitmap.
pub trait PanelPainter: Send {
    fn paint(&mut self, config: &PanelConfig) -> Result<Bitmap>;
}
