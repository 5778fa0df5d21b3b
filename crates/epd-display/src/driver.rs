//! Lower-level pixel driver for direct bitmap blits
//!
//! Issued by devices whose backend supports it, and only while no
//! compositor surface is attached. The driver shares the device mutex
//! through its [`FrameSink`] rather than taking a second lock.

use log::{debug, error};

use crate::backend::Backend;
use crate::error::Error;
use crate::rect::Rect;
use crate::sink::FrameSink;
use crate::transcode::PixelFormat;

/// Direct 1-bit bitmap access to the panel framebuffer
///
/// Writes land in the framebuffer only; refreshing is up to the caller.
pub struct PixelDriver<B> {
    sink: FrameSink<B>,
}

impl<B: Backend> PixelDriver<B> {
    pub(crate) fn new(sink: FrameSink<B>) -> Self {
        Self { sink }
    }

    /// Format [`draw_bitmap`](Self::draw_bitmap) expects
    pub fn color_format(&self) -> PixelFormat {
        PixelFormat::I1
    }

    /// Panel width in the current rotation
    pub fn pixel_width(&self) -> u16 {
        self.sink.width()
    }

    /// Panel height in the current rotation
    pub fn pixel_height(&self) -> u16 {
        self.sink.height()
    }

    /// Blit a packed 1-bit bitmap, MSB first, set bit = white.
    ///
    /// End coordinates are exclusive, so the bitmap is
    /// `(x_end - x_start) x (y_end - y_start)` pixels with rows padded to
    /// whole bytes.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidBitmap` if the rectangle is empty, inverted or
    ///   wider than `u16::MAX` pixels
    /// - `Error::BufferTooSmall` if `pixels` does not cover it
    /// - `Error::NotReady` if the device is not started
    pub fn draw_bitmap(
        &self,
        x_start: i32,
        y_start: i32,
        x_end: i32,
        y_end: i32,
        pixels: &[u8],
    ) -> Result<(), Error<B::Error>> {
        let (Some(width), Some(height)) = (extent(x_start, x_end), extent(y_start, y_end)) else {
            let width = x_end.saturating_sub(x_start);
            let height = y_end.saturating_sub(y_start);
            error!("[{}] invalid bitmap dimensions: {}x{}", B::TAG, width, height);
            return Err(Error::InvalidBitmap { width, height });
        };
        debug!(
            "[{}] bitmap x={}..{}, y={}..{}",
            B::TAG,
            x_start,
            x_end,
            y_start,
            y_end
        );

        let area = Rect::new(x_start, y_start, width, height);
        self.sink.write_region(area, pixels, PixelFormat::I1)
    }

    /// The write path this driver shares with the device
    pub fn frame_sink(&self) -> &FrameSink<B> {
        &self.sink
    }

    /// Lock the device and draw with embedded-graphics
    #[cfg(feature = "graphics")]
    pub fn canvas(&self) -> crate::graphics::Canvas<'_, B> {
        crate::graphics::Canvas::new(self.sink.lock())
    }
}

/// Width of the exclusive span `start..end`, if it is a usable bitmap side
fn extent(start: i32, end: i32) -> Option<u16> {
    end.checked_sub(start)
        .and_then(|span| u16::try_from(span).ok())
        .filter(|&span| span > 0)
}
