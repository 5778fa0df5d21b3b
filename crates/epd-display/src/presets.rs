//! Board presets
//!
//! Ready-made configurations for the M5Stack PaperS3, a 540x960 portrait
//! panel that both libraries describe natively as 960x540 landscape.

use std::sync::Arc;

use crate::backend::epdiy::MODE_GC16;
use crate::backend::fastepd::{CLEAR_FAST, PANEL_M5PAPERS3};
use crate::config::{
    Configuration, DEFAULT_BUS_SPEED_HZ, DEFAULT_TEMPERATURE, GraphicsMode, PanelId, RenderMode,
};
use crate::hal::TouchDevice;
use crate::rotation::Rotation;

/// Panel width in portrait orientation
pub const PAPER_S3_WIDTH: u16 = 540;
/// Panel height in portrait orientation
pub const PAPER_S3_HEIGHT: u16 = 960;

/// EPDiy board definition for the PaperS3 with its ED047TC2 panel
pub const EPDIY_M5PAPERS3: PanelId = PanelId::new(0, "M5Paper S3 (ED047TC2)");

/// PaperS3 on EPDiy, portrait, 16-level gray
pub fn m5paper_s3_epdiy(touch: Option<Arc<dyn TouchDevice>>) -> Configuration {
    Configuration {
        panel: EPDIY_M5PAPERS3,
        bus_speed_hz: DEFAULT_BUS_SPEED_HZ,
        // Native Portrait
        rotation: Rotation::Rotate270,
        graphics_mode: GraphicsMode::Gray4,
        draw_mode: MODE_GC16,
        temperature: DEFAULT_TEMPERATURE,
        partial_passes: 3,
        full_passes: 5,
        render_mode: RenderMode::Partial,
        touch,
    }
}

/// PaperS3 on FastEPD
///
/// Landscape (960x540) unless `portrait`, which rotates by 90 degrees.
pub fn m5paper_s3_fastepd(
    touch: Option<Arc<dyn TouchDevice>>,
    graphics_mode: GraphicsMode,
    portrait: bool,
) -> Configuration {
    Configuration {
        panel: PANEL_M5PAPERS3,
        bus_speed_hz: DEFAULT_BUS_SPEED_HZ,
        rotation: if portrait {
            Rotation::Rotate90
        } else {
            Rotation::Rotate0
        },
        graphics_mode,
        draw_mode: CLEAR_FAST,
        temperature: DEFAULT_TEMPERATURE,
        partial_passes: 3,
        full_passes: 5,
        render_mode: RenderMode::Partial,
        touch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::{EpdiyRotation, EpdiyRotationMap, RotationMapper};

    #[test]
    fn epdiy_preset_is_native_portrait() {
        let config = m5paper_s3_epdiy(None);
        assert_eq!(
            EpdiyRotationMap::to_native(config.rotation),
            EpdiyRotation::Portrait
        );
        assert_eq!(config.draw_mode, MODE_GC16);
    }

    #[test]
    fn fastepd_preset_orientation() {
        let landscape = m5paper_s3_fastepd(None, GraphicsMode::Gray4, false);
        let portrait = m5paper_s3_fastepd(None, GraphicsMode::Monochrome, true);
        assert_eq!(landscape.rotation, Rotation::Rotate0);
        assert_eq!(portrait.rotation, Rotation::Rotate90);
        assert_eq!(portrait.graphics_mode, GraphicsMode::Monochrome);
        assert_eq!((portrait.partial_passes, portrait.full_passes), (3, 5));
    }
}
