//! Graphics support via embedded-graphics
//!
//! [`Canvas`] holds the device mutex for as long as it lives and implements
//! [`DrawTarget`](embedded_graphics_core::draw_target::DrawTarget) over the
//! panel framebuffer, so a burst of primitives is drawn without the
//! compositor or another thread interleaving.
//!
//! ## Example
//!
//! ```rust,ignore
//! use embedded_graphics::{
//!     pixelcolor::BinaryColor,
//!     prelude::*,
//!     primitives::{PrimitiveStyle, Rectangle},
//! };
//!
//! let driver = display.display_driver();
//! let mut canvas = driver.canvas();
//!
//! Rectangle::new(Point::new(10, 10), Size::new(50, 30))
//!     .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
//!     .draw(&mut canvas)?;
//!
//! // Push the framebuffer to the panel and power down
//! canvas.refresh(false)?;
//! ```

use std::sync::MutexGuard;

use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
    pixelcolor::BinaryColor,
    prelude::Pixel,
};

use crate::backend::Backend;
use crate::error::Error;
use crate::sink::DeviceState;
use crate::transcode::{Intensity, NativePixel};

/// Exclusive drawing surface over the panel framebuffer
///
/// `BinaryColor::On` draws black ink, `BinaryColor::Off` white. Pixels
/// outside the rotated panel bounds are skipped.
pub struct Canvas<'a, B: Backend> {
    state: MutexGuard<'a, DeviceState<B>>,
}

impl<'a, B: Backend> Canvas<'a, B> {
    pub(crate) fn new(state: MutexGuard<'a, DeviceState<B>>) -> Self {
        Self { state }
    }

    /// Refresh the whole panel with the configured draw mode; power off
    /// afterwards unless `keep_powered`
    pub fn refresh(&mut self, keep_powered: bool) -> Result<(), Error<B::Error>> {
        self.state.full_refresh(None, None, keep_powered)
    }

    /// Whether anything drawn is not on the panel yet
    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }
}

impl<B: Backend> DrawTarget for Canvas<'_, B> {
    type Color = BinaryColor;
    type Error = Error<B::Error>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.state.ready()?;
        self.state.ensure_powered();

        let state = &mut *self.state;
        let width = state.backend.width() as i32;
        let height = state.backend.height() as i32;
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 || point.x >= width || point.y >= height {
                continue;
            }
            let intensity = match color {
                BinaryColor::On => Intensity::Black,
                BinaryColor::Off => Intensity::White,
            };
            state
                .backend
                .draw_pixel(point.x, point.y, NativePixel::Mono(intensity));
        }
        state.dirty = true;
        Ok(())
    }
}

impl<B: Backend> OriginDimensions for Canvas<'_, B> {
    fn size(&self) -> Size {
        Size::new(
            self.state.backend.width() as u32,
            self.state.backend.height() as u32,
        )
    }
}
