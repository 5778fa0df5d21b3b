//! EPDiy backend
//!
//! EPDiy keeps a front and back framebuffer in its high-level state and
//! refreshes areas quickly enough that flushed rectangles are refreshed
//! straight away ([`FlushPolicy::Immediate`]). It only takes 4-bit gray, so
//! the compositor always renders 8-bit gray which is scaled and packed two
//! pixels per byte.

use core::fmt::Debug;
use core::ops::RangeInclusive;

use log::{error, info};

use super::{Backend, FlushPolicy};
use crate::config::{Configuration, DrawMode, GraphicsMode, PanelId};
use crate::power::PowerRail;
use crate::rect::Rect;
use crate::rotation::{EpdiyRotation, EpdiyRotationMap, RotationMapper};
use crate::transcode::{Intensity, NativePixel, PixelFormat, Transcoding};

/// Direct update, black/white only
pub const MODE_DU: DrawMode = DrawMode::new(0x01);
/// 16-level gray waveform
pub const MODE_GC16: DrawMode = DrawMode::new(0x02);
/// Faster 16-level gray waveform
pub const MODE_GC16_FAST: DrawMode = DrawMode::new(0x03);
/// Fast black/white animation waveform
pub const MODE_A2: DrawMode = DrawMode::new(0x06);
/// Flag: source pixels are packed two per byte
pub const MODE_PACKING_2PPB: u32 = 0x80;

/// Framebuffer byte for a white pixel; `draw_pixel` takes the level in the
/// high nibble
const WHITE: u8 = 0xF0;
const BLACK: u8 = 0x00;

/// Native EPDiy high-level API
///
/// Implemented by the board support crate over the C library.
pub trait Epdiy: Send {
    type Error: Debug + Send;

    /// `epd_init` for a board/display pair
    fn init(&mut self, panel: &PanelId);

    fn deinit(&mut self);

    fn set_rotation(&mut self, rotation: EpdiyRotation);

    /// `epd_hl_init`: allocates the high-level framebuffers
    fn hl_init(&mut self) -> Result<(), Self::Error>;

    /// Native (unrotated) width
    fn width(&self) -> u16;

    /// Native (unrotated) height
    fn height(&self) -> u16;

    fn rotated_width(&self) -> u16;

    fn rotated_height(&self) -> u16;

    /// Write `color` (level in the high nibble) at rotated coordinates
    fn draw_pixel(&mut self, x: i32, y: i32, color: u8);

    /// Clear the whole panel to white, physically
    fn clear(&mut self);

    fn clear_area(&mut self, area: Rect);

    fn set_all_white(&mut self);

    /// Fill the whole framebuffer with `color`
    fn fill(&mut self, color: u8);

    fn update_screen(&mut self, mode: DrawMode, temperature: i32) -> Result<(), Self::Error>;

    fn update_area(
        &mut self,
        mode: DrawMode,
        temperature: i32,
        area: Rect,
    ) -> Result<(), Self::Error>;

    fn power_on(&mut self);

    fn power_off(&mut self);
}

/// [`Backend`] adapter over an [`Epdiy`] library handle
pub struct EpdiyBackend<P> {
    panel: P,
}

impl<P: Epdiy> EpdiyBackend<P> {
    /// Wrap an EPDiy binding
    pub fn new(panel: P) -> Self {
        Self { panel }
    }

    /// Access the native handle
    pub fn panel(&self) -> &P {
        &self.panel
    }
}

impl<P: Epdiy> PowerRail for EpdiyBackend<P> {
    fn power_on(&mut self) {
        self.panel.power_on();
    }

    fn power_off(&mut self) {
        self.panel.power_off();
    }
}

impl<P: Epdiy> Backend for EpdiyBackend<P> {
    type Error = P::Error;
    type Rotation = EpdiyRotationMap;

    const NAME: &'static str = "EPDiy";
    const DESCRIPTION: &'static str = "E-Ink display powered by the EPDiy library";
    const TAG: &'static str = "EPDIY";
    const FLUSH_POLICY: FlushPolicy = FlushPolicy::Immediate;
    const SUPPORTS_DISPLAY_DRIVER: bool = false;

    fn surface_format(_mode: GraphicsMode) -> Option<PixelFormat> {
        Some(PixelFormat::L8)
    }

    fn transcoding(format: PixelFormat) -> Option<Transcoding> {
        match format {
            PixelFormat::L8 => Some(Transcoding::PackedGray4),
            PixelFormat::I1 => None,
        }
    }

    fn flush_mode(mode: DrawMode) -> DrawMode {
        mode.with_flags(MODE_PACKING_2PPB)
    }

    fn init(&mut self, config: &Configuration) -> Result<(), Self::Error> {
        self.panel.init(&config.panel);

        // Rotation has to be in place before the high-level state exists
        let rotation = EpdiyRotationMap::to_native(config.rotation);
        self.panel.set_rotation(rotation);
        info!("[EPDIY] rotation set to {:?}", rotation);

        if let Err(e) = self.panel.hl_init() {
            error!("[EPDIY] failed to initialize high-level state: {:?}", e);
            self.panel.deinit();
            return Err(e);
        }

        info!(
            "[EPDIY] initialized ({}x{} native, {}x{} rotated)",
            self.panel.width(),
            self.panel.height(),
            self.panel.rotated_width(),
            self.panel.rotated_height()
        );
        Ok(())
    }

    fn deinit(&mut self) {
        // The high-level framebuffers live until system shutdown; the
        // library has no call to release them.
        self.panel.deinit();
    }

    fn width(&self) -> u16 {
        self.panel.rotated_width()
    }

    fn height(&self) -> u16 {
        self.panel.rotated_height()
    }

    fn set_rotation(&mut self, rotation: EpdiyRotation) {
        self.panel.set_rotation(rotation);
    }

    fn draw_pixel(&mut self, x: i32, y: i32, pixel: NativePixel) {
        let color = match pixel {
            NativePixel::Gray4(level) => level << 4,
            NativePixel::Mono(Intensity::White) => WHITE,
            NativePixel::Mono(Intensity::Black) => BLACK,
        };
        self.panel.draw_pixel(x, y, color);
    }

    fn clear(
        &mut self,
        intensity: Intensity,
        mode: DrawMode,
        temperature: i32,
    ) -> Result<(), Self::Error> {
        match intensity {
            Intensity::White => {
                self.panel.clear();
                self.panel.set_all_white();
                Ok(())
            }
            Intensity::Black => {
                self.panel.fill(BLACK);
                self.panel.update_screen(mode, temperature)
            }
        }
    }

    fn clear_area(&mut self, area: Rect) {
        self.panel.clear_area(area);
    }

    fn set_all_white(&mut self) {
        self.panel.set_all_white();
    }

    fn refresh_area(
        &mut self,
        area: Rect,
        mode: DrawMode,
        temperature: i32,
    ) -> Result<(), Self::Error> {
        self.panel.update_area(mode, temperature, area)
    }

    fn refresh_full(&mut self, mode: DrawMode, temperature: i32) -> Result<(), Self::Error> {
        self.panel.update_screen(mode, temperature)
    }

    fn refresh_rows(
        &mut self,
        rows: RangeInclusive<u16>,
        mode: DrawMode,
        temperature: i32,
    ) -> Result<(), Self::Error> {
        // Rows past the bottom edge mean "to the bottom"
        let last_row = self.panel.rotated_height().saturating_sub(1);
        let (start, end) = (*rows.start(), (*rows.end()).min(last_row));
        if end < start {
            return Ok(());
        }
        let area = Rect::new(
            0,
            i32::from(start),
            self.panel.rotated_width(),
            end - start + 1,
        );
        self.panel.update_area(mode, temperature, area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, CallLog, MockEpdiy};

    #[test]
    fn flushes_refresh_with_packed_pixels() {
        let mode = EpdiyBackend::<MockEpdiy>::flush_mode(MODE_GC16);
        assert_eq!(mode.raw(), 0x82);
    }

    #[test]
    fn only_gray_sources_are_accepted() {
        assert_eq!(
            EpdiyBackend::<MockEpdiy>::transcoding(PixelFormat::L8),
            Some(Transcoding::PackedGray4)
        );
        assert_eq!(EpdiyBackend::<MockEpdiy>::transcoding(PixelFormat::I1), None);
    }

    #[test]
    fn levels_are_shifted_into_the_high_nibble() {
        let log = CallLog::new();
        let mut backend = EpdiyBackend::new(MockEpdiy::new(&log));
        backend.draw_pixel(1, 2, NativePixel::Gray4(0x0A));
        backend.draw_pixel(1, 3, NativePixel::Mono(Intensity::White));
        assert_eq!(log.last_pixel(1, 2), Some(0xA0));
        assert_eq!(log.last_pixel(1, 3), Some(0xF0));
    }

    #[test]
    fn row_refresh_spans_the_rotated_width() {
        let log = CallLog::new();
        let mut backend = EpdiyBackend::new(MockEpdiy::new(&log));
        backend.refresh_rows(10..=19, MODE_DU, 20).unwrap();
        assert_eq!(
            log.calls(),
            vec![Call::UpdateArea {
                mode: 0x01,
                temperature: 20,
                area: Rect::new(0, 10, 960, 10)
            }]
        );
    }

    #[test]
    fn row_refresh_stops_at_the_bottom_edge() {
        let log = CallLog::new();
        let mut backend = EpdiyBackend::new(MockEpdiy::new(&log));
        backend.refresh_rows(500..=u16::MAX, MODE_DU, 20).unwrap();
        backend.refresh_rows(600..=700, MODE_DU, 20).unwrap();
        assert_eq!(
            log.calls(),
            vec![Call::UpdateArea {
                mode: 0x01,
                temperature: 20,
                area: Rect::new(0, 500, 960, 40)
            }]
        );
    }
}
