//! Backend seam between the shared device code and a panel library
//!
//! The device, frame sink and pixel driver are written once against
//! [`Backend`]. Each panel library gets an adapter that owns the native
//! handle and translates the shared operations into native calls:
//!
//! - [`EpdiyBackend`] over the [`Epdiy`] high-level API: 4-bit packed
//!   writes, flushed areas refreshed immediately
//! - [`FastEpdBackend`] over [`FastEpd`]: 1-bit or 4-bit writes, refresh
//!   deferred to the application, pixel driver available
//!
//! Native calls are synchronous and not reentrant. The shared code only
//! calls into a backend while holding the device mutex.

use core::fmt::Debug;
use core::ops::RangeInclusive;

use crate::config::{Configuration, DrawMode, GraphicsMode};
use crate::power::PowerRail;
use crate::rect::Rect;
use crate::rotation::RotationMapper;
use crate::transcode::{Intensity, NativePixel, PixelFormat, Transcoding};

pub mod epdiy;
pub mod fastepd;

pub use epdiy::{Epdiy, EpdiyBackend};
pub use fastepd::{FastEpd, FastEpdBackend};

/// What a compositor flush does after the pixels reach the framebuffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Refresh the flushed rectangle before returning to the compositor.
    /// Only viable when the panel's area refresh is quick next to the redraw
    /// cadence.
    Immediate,
    /// Mark the framebuffer dirty; the application decides when to refresh
    Deferred,
}

/// A panel library adapted to the shared device code
pub trait Backend: PowerRail + Send {
    /// Native failure type
    type Error: Debug + Send;
    /// Rotation mapping for this library
    type Rotation: RotationMapper;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    /// Log tag
    const TAG: &'static str;
    const FLUSH_POLICY: FlushPolicy;
    /// Whether a lower-level pixel driver can be issued
    const SUPPORTS_DISPLAY_DRIVER: bool;

    /// Compositor format for a framebuffer graphics mode
    fn surface_format(mode: GraphicsMode) -> Option<PixelFormat>;

    /// Conversion used for pixels arriving in `format`
    fn transcoding(format: PixelFormat) -> Option<Transcoding>;

    /// Waveform used when refreshing a flushed area
    fn flush_mode(mode: DrawMode) -> DrawMode {
        mode
    }

    /// Bring the panel up and apply `config`.
    ///
    /// On failure the adapter releases whatever it already acquired.
    fn init(&mut self, config: &Configuration) -> Result<(), Self::Error>;

    fn deinit(&mut self);

    /// Width in the rotated coordinate space
    fn width(&self) -> u16;

    /// Height in the rotated coordinate space
    fn height(&self) -> u16;

    fn set_rotation(&mut self, rotation: <Self::Rotation as RotationMapper>::Native);

    /// Write one pixel; the native primitive applies the panel rotation
    fn draw_pixel(&mut self, x: i32, y: i32, pixel: NativePixel);

    /// Fill the framebuffer with `intensity` and refresh the whole panel
    fn clear(
        &mut self,
        intensity: Intensity,
        mode: DrawMode,
        temperature: i32,
    ) -> Result<(), Self::Error>;

    /// Clear an area of the panel without a following refresh
    fn clear_area(&mut self, area: Rect);

    /// Reset the framebuffer to white, no hardware transfer
    fn set_all_white(&mut self);

    fn refresh_area(&mut self, area: Rect, mode: DrawMode, temperature: i32)
    -> Result<(), Self::Error>;

    fn refresh_full(&mut self, mode: DrawMode, temperature: i32) -> Result<(), Self::Error>;

    fn refresh_rows(
        &mut self,
        rows: RangeInclusive<u16>,
        mode: DrawMode,
        temperature: i32,
    ) -> Result<(), Self::Error>;
}
