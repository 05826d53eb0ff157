use crate::{Bitmap, PanelPainter, MAIN_PANEL_SIZE};
use anyhow::Result;
use tracing::info;
use xrpanel_config::PanelConfig;

/// Checkerboard stand-in for the main panel content.
///
/// Real content comes from an external renderer; this keeps the panel
/// visible (and its orientation obvious) without one. The pattern is
/// generated once and reused for every repaint.
pub struct CheckerboardPainter {
    cached: Bitmap,
}

impl CheckerboardPainter {
    pub fn new(width: u32, height: u32) -> Self {
        info!(width, height, "Checkerboard placeholder painter initialized");

        let (r, g, b) = (40u8, 80u8, 160u8);
        let checker_size = 64u32;
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let is_light = ((x / checker_size) + (y / checker_size)) % 2 == 0;
                let factor = if is_light { 1.0_f32 } else { 0.7 };
                data.push((r as f32 * factor) as u8);
                data.push((g as f32 * factor) as u8);
                data.push((b as f32 * factor) as u8);
                data.push(255);
            }
        }

        let mut cached = Bitmap {
            data,
            width,
            height,
        };
        // Orange marker in the top-left corner so a flipped texture is
        // obvious at a glance.
        cached.fill_rect(0, 0, checker_size, checker_size, [255, 152, 0, 255]);

        Self { cached }
    }
}

impl Default for CheckerboardPainter {
    fn default() -> Self {
        Self::new(MAIN_PANEL_SIZE.0, MAIN_PANEL_SIZE.1)
    }
}

impl PanelPainter for CheckerboardPainter {
    fn paint(&mut self, _config: &PanelConfig) -> Result<Bitmap> {
        Ok(self.cached.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_and_marks_top_left() {
        let bitmap = CheckerboardPainter::new(256, 128)
            .paint(&PanelConfig::default())
            .unwrap();
        assert_eq!(bitmap.data.len(), 256 * 128 * 4);
        assert_eq!(bitmap.pixel(0, 0), [255, 152, 0, 255]);
        let dark = |c: u8| (c as f32 * 0.7) as u8;
        assert_eq!(bitmap.pixel(64, 0), [dark(40), dark(80), dark(160), 255]);
        assert_eq!(bitmap.pixel(128, 0), [40, 80, 160, 255]);
    }
}
