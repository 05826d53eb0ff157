use crate::{Bitmap, PanelPainter};
use anyhow::Result;
use xrpanel_config::{
    ButtonAction, ControlLayout, ControlSection, PanelConfig, MAX_EXTENT, MIN_EXTENT,
};

const BACKGROUND: [u8; 4] = [0, 0, 0, 230];
const DIVIDER: [u8; 4] = [0x44, 0x44, 0x44, 255];
const BUTTON: [u8; 4] = [0x55, 0x55, 0x55, 255];
const GLYPH: [u8; 4] = [255, 255, 255, 255];
const DISTANCE_ACCENT: [u8; 4] = [0x4C, 0xAF, 0x50, 255];
const WIDTH_ACCENT: [u8; 4] = [0x21, 0x96, 0xF3, 255];
const RECENTER_ACCENT: [u8; 4] = [0xFF, 0x98, 0x00, 255];

const DIVIDER_WIDTH: u32 = 3;
/// Vertical span of the value gauges above the +/- buttons.
const GAUGE_TOP: u32 = 95;
const GAUGE_BOTTOM: u32 = 125;
/// Thickness of the +/- glyph strokes.
const STROKE: u32 = 12;

/// Paints the control panel bitmap from the shared button layout.
///
/// Values are shown as gauges rather than text: the fraction of the
/// distance/width range currently in use.
pub struct ControlPanelPainter {
    layout: ControlLayout,
}

impl ControlPanelPainter {
    pub fn new(layout: ControlLayout) -> Self {
        Self { layout }
    }

    fn paint_dividers(&self, bitmap: &mut Bitmap) {
        let section_width = self.layout.section_width();
        for i in 1..ControlSection::ALL.len() as u32 {
            let x = i * section_width;
            let half = DIVIDER_WIDTH / 2;
            bitmap.fill_rect(x - half, 0, x - half + DIVIDER_WIDTH, self.layout.height, DIVIDER);
        }
    }

    fn paint_gauge(&self, bitmap: &mut Bitmap, section: ControlSection, value: f32, color: [u8; 4]) {
        let section_left = section.index() as u32 * self.layout.section_width();
        let left = section_left + 45;
        let right = section_left + self.layout.section_width() - 45;
        let fraction = ((value - MIN_EXTENT) / (MAX_EXTENT - MIN_EXTENT)).clamp(0.0, 1.0);
        let filled = left + ((right - left) as f32 * fraction).round() as u32;
        bitmap.fill_rect(left, GAUGE_TOP, right, GAUGE_BOTTOM, BUTTON);
        bitmap.fill_rect(left, GAUGE_TOP, filled, GAUGE_BOTTOM, color);
    }

    fn paint_button(&self, bitmap: &mut Bitmap, action: ButtonAction, config: &PanelConfig) {
        let Some(button) = self.layout.button(action) else {
            return;
        };
        let r = button.rect;
        let fill = match action {
            ButtonAction::ToggleCurved if config.curved => DISTANCE_ACCENT,
            ButtonAction::Recenter => RECENTER_ACCENT,
            _ => BUTTON,
        };
        bitmap.fill_rect(r.left, r.top, r.right, r.bottom, fill);

        // Minus/plus glyphs centered in the button.
        let cx = (r.left + r.right) / 2;
        let cy = (r.top + r.bottom) / 2;
        let arm = r.height() / 3;
        match action {
            ButtonAction::DecreaseDistance | ButtonAction::DecreaseWidth => {
                bitmap.fill_rect(cx - arm, cy - STROKE / 2, cx + arm, cy + STROKE / 2, GLYPH);
            }
            ButtonAction::IncreaseDistance | ButtonAction::IncreaseWidth => {
                bitmap.fill_rect(cx - arm, cy - STROKE / 2, cx + arm, cy + STROKE / 2, GLYPH);
                bitmap.fill_rect(cx - STROKE / 2, cy - arm, cx + STROKE / 2, cy + arm, GLYPH);
            }
            ButtonAction::ToggleCurved | ButtonAction::Recenter => {}
        }
    }
}

impl PanelPainter for ControlPanelPainter {
    fn paint(&mut self, config: &PanelConfig) -> Result<Bitmap> {
        let mut bitmap = Bitmap::filled(self.layout.width, self.layout.height, BACKGROUND);
        self.paint_dividers(&mut bitmap);
        self.paint_gauge(&mut bitmap, ControlSection::Distance, config.distance, DISTANCE_ACCENT);
        self.paint_gauge(&mut bitmap, ControlSection::Width, config.width, WIDTH_ACCENT);
        for button in &self.layout.buttons {
            self.paint_button(&mut bitmap, button.action, config);
        }
        Ok(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paint(config: &PanelConfig) -> Bitmap {
        ControlPanelPainter::new(ControlLayout::default())
            .paint(config)
            .unwrap()
    }

    #[test]
    fn bitmap_matches_layout_size() {
        let bitmap = paint(&PanelConfig::default());
        assert_eq!((bitmap.width, bitmap.height), (2048, 300));
        assert_eq!(bitmap.data.len(), 2048 * 300 * 4);
    }

    #[test]
    fn buttons_are_painted_where_the_layout_says() {
        let bitmap = paint(&PanelConfig::default());
        // Corner pixels of distance "-" (45,165)-(225,255).
        assert_eq!(bitmap.pixel(46, 166), BUTTON);
        assert_eq!(bitmap.pixel(224, 254), BUTTON);
        assert_eq!(bitmap.pixel(44, 166), BACKGROUND);
        assert_eq!(bitmap.pixel(1700, 130), RECENTER_ACCENT);
    }

    #[test]
    fn curved_toggle_lights_up() {
        let off = paint(&PanelConfig::default());
        let on = paint(&PanelConfig::new(2.5, 2.5, true));
        assert_eq!(off.pixel(1140, 130), BUTTON);
        assert_eq!(on.pixel(1140, 130), DISTANCE_ACCENT);
    }

    #[test]
    fn gauge_tracks_value() {
        let min = paint(&PanelConfig::new(1.0, 1.0, false));
        let max = paint(&PanelConfig::new(5.0, 5.0, false));
        assert_eq!(min.pixel(460, 110), BUTTON);
        assert_eq!(max.pixel(460, 110), DISTANCE_ACCENT);
        assert_eq!(max.pixel(512 + 460, 110), WIDTH_ACCENT);
    }

    #[test]
    fn dividers_split_sections() {
        let bitmap = paint(&PanelConfig::default());
        assert_eq!(bitmap.pixel(512, 10), DIVIDER);
        assert_eq!(bitmap.pixel(1536, 290), DIVIDER);
    }
}
