//! FastEPD backend
//!
//! FastEPD keeps a single framebuffer and its refreshes take long enough to
//! stall the compositor's redraw thread, so flushes only write pixels
//! ([`FlushPolicy::Deferred`]) and the application refreshes explicitly.
//! It also hands out the lower-level pixel driver for direct bitmap blits.

use core::fmt::Debug;
use core::ops::RangeInclusive;

use log::info;

use super::{Backend, FlushPolicy};
use crate::config::{Configuration, DrawMode, GraphicsMode, PanelId};
use crate::power::PowerRail;
use crate::rect::Rect;
use crate::rotation::{FastEpdRotation, FastEpdRotationMap, RotationMapper};
use crate::transcode::{Intensity, NativePixel, PixelFormat, Transcoding};

/// Full update without a clearing pass
pub const CLEAR_NONE: DrawMode = DrawMode::new(0);
pub const CLEAR_FAST: DrawMode = DrawMode::new(1);
pub const CLEAR_SLOW: DrawMode = DrawMode::new(2);
pub const CLEAR_WHITE: DrawMode = DrawMode::new(3);
pub const CLEAR_BLACK: DrawMode = DrawMode::new(4);

/// M5Stack PaperS3 panel code
pub const PANEL_M5PAPERS3: PanelId = PanelId::new(1, "M5Paper S3");

pub const BLACK: u8 = 0x00;

/// Native framebuffer bit depth
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FastEpdMode {
    OneBpp,
    FourBpp,
}

impl FastEpdMode {
    /// Value of a white pixel in this mode
    pub const fn white(self) -> u8 {
        match self {
            FastEpdMode::OneBpp => 0x01,
            FastEpdMode::FourBpp => 0x0F,
        }
    }
}

impl From<GraphicsMode> for FastEpdMode {
    fn from(mode: GraphicsMode) -> Self {
        match mode {
            GraphicsMode::Monochrome => FastEpdMode::OneBpp,
            GraphicsMode::Gray4 => FastEpdMode::FourBpp,
        }
    }
}

/// Native FastEPD API
///
/// Implemented by the board support crate over the C++ library.
pub trait FastEpd: Send {
    type Error: Debug + Send;

    fn init_panel(&mut self, panel: &PanelId, bus_speed_hz: u32) -> Result<(), Self::Error>;

    fn set_mode(&mut self, mode: FastEpdMode);

    fn set_rotation(&mut self, degrees: i32);

    fn set_passes(&mut self, partial: u8, full: u8);

    /// Width after rotation
    fn width(&self) -> u16;

    /// Height after rotation
    fn height(&self) -> u16;

    fn fill_screen(&mut self, color: u8);

    fn fill_rect(&mut self, area: Rect, color: u8);

    /// Unchecked pixel write at rotated coordinates
    fn draw_pixel_fast(&mut self, x: i32, y: i32, color: u8);

    fn full_update(
        &mut self,
        clear_mode: DrawMode,
        keep_on: bool,
        area: Option<Rect>,
    ) -> Result<(), Self::Error>;

    fn partial_update(
        &mut self,
        keep_on: bool,
        start_row: u16,
        end_row: u16,
    ) -> Result<(), Self::Error>;

    fn eink_power(&mut self, on: bool);

    fn deinit(&mut self);
}

/// [`Backend`] adapter over a [`FastEpd`] library handle
pub struct FastEpdBackend<P> {
    panel: P,
    mode: FastEpdMode,
}

impl<P: FastEpd> FastEpdBackend<P> {
    /// Wrap a FastEPD binding
    pub fn new(panel: P) -> Self {
        Self {
            panel,
            mode: FastEpdMode::FourBpp,
        }
    }

    /// Access the native handle
    pub fn panel(&self) -> &P {
        &self.panel
    }

    fn color(&self, intensity: Intensity) -> u8 {
        match intensity {
            Intensity::White => self.mode.white(),
            Intensity::Black => BLACK,
        }
    }
}

impl<P: FastEpd> PowerRail for FastEpdBackend<P> {
    fn power_on(&mut self) {
        self.panel.eink_power(true);
    }

    fn power_off(&mut self) {
        self.panel.eink_power(false);
    }
}

// The power sequencer owns the rail, so every native refresh runs with
// keep_on set and the sequencer decides when to power down.
impl<P: FastEpd> Backend for FastEpdBackend<P> {
    type Error = P::Error;
    type Rotation = FastEpdRotationMap;

    const NAME: &'static str = "FastEPD";
    const DESCRIPTION: &'static str = "E-Ink display powered by FastEPD library";
    const TAG: &'static str = "FASTEPD";
    const FLUSH_POLICY: FlushPolicy = FlushPolicy::Deferred;
    const SUPPORTS_DISPLAY_DRIVER: bool = true;

    fn surface_format(mode: GraphicsMode) -> Option<PixelFormat> {
        match mode {
            GraphicsMode::Monochrome => Some(PixelFormat::I1),
            GraphicsMode::Gray4 => Some(PixelFormat::L8),
        }
    }

    fn transcoding(format: PixelFormat) -> Option<Transcoding> {
        match format {
            PixelFormat::L8 => Some(Transcoding::HighNibble),
            PixelFormat::I1 => Some(Transcoding::Monochrome),
        }
    }

    fn init(&mut self, config: &Configuration) -> Result<(), Self::Error> {
        info!(
            "[FASTEPD] panel {} ({}), bus speed {} Hz",
            config.panel.name, config.panel.code, config.bus_speed_hz
        );
        self.panel.init_panel(&config.panel, config.bus_speed_hz)?;
        info!(
            "[FASTEPD] native dimensions {}x{}",
            self.panel.width(),
            self.panel.height()
        );

        self.mode = config.graphics_mode.into();
        info!("[FASTEPD] graphics mode {:?}", self.mode);
        self.panel.set_mode(self.mode);

        let rotation = FastEpdRotationMap::to_native(config.rotation);
        if rotation != FastEpdRotation::Deg0 {
            self.panel.set_rotation(rotation.degrees());
            info!(
                "[FASTEPD] rotated {} degrees, now {}x{}",
                rotation.degrees(),
                self.panel.width(),
                self.panel.height()
            );
        }

        info!(
            "[FASTEPD] passes partial {}, full {}",
            config.partial_passes, config.full_passes
        );
        self.panel
            .set_passes(config.partial_passes, config.full_passes);
        Ok(())
    }

    fn deinit(&mut self) {
        self.panel.deinit();
    }

    fn width(&self) -> u16 {
        self.panel.width()
    }

    fn height(&self) -> u16 {
        self.panel.height()
    }

    fn set_rotation(&mut self, rotation: FastEpdRotation) {
        self.panel.set_rotation(rotation.degrees());
    }

    fn draw_pixel(&mut self, x: i32, y: i32, pixel: NativePixel) {
        let color = match pixel {
            NativePixel::Gray4(level) => level,
            NativePixel::Mono(intensity) => self.color(intensity),
        };
        self.panel.draw_pixel_fast(x, y, color);
    }

    fn clear(
        &mut self,
        intensity: Intensity,
        _mode: DrawMode,
        _temperature: i32,
    ) -> Result<(), Self::Error> {
        let clear_mode = match intensity {
            Intensity::White => CLEAR_WHITE,
            Intensity::Black => CLEAR_BLACK,
        };
        self.panel.fill_screen(self.color(intensity));
        self.panel.full_update(clear_mode, true, None)
    }

    fn clear_area(&mut self, area: Rect) {
        let white = self.mode.white();
        self.panel.fill_rect(area, white);
    }

    fn set_all_white(&mut self) {
        let white = self.mode.white();
        self.panel.fill_screen(white);
    }

    fn refresh_area(
        &mut self,
        area: Rect,
        mode: DrawMode,
        _temperature: i32,
    ) -> Result<(), Self::Error> {
        self.panel.full_update(mode, true, Some(area))
    }

    fn refresh_full(&mut self, mode: DrawMode, _temperature: i32) -> Result<(), Self::Error> {
        self.panel.full_update(mode, true, None)
    }

    fn refresh_rows(
        &mut self,
        rows: RangeInclusive<u16>,
        _mode: DrawMode,
        _temperature: i32,
    ) -> Result<(), Self::Error> {
        self.panel.partial_update(true, *rows.start(), *rows.end())
    }
}
