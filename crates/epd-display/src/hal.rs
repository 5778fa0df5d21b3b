//! Contracts with the host HAL and the compositor
//!
//! The host HAL drives every display through [`DisplayDevice`]. The
//! compositor is reached through [`Compositor`]: the device asks it for a
//! surface and hands it a [`FrameSink`] to flush into. Touch controllers and
//! draw-buffer allocation are pluggable as well.

use std::sync::Arc;

use log::warn;

use crate::backend::Backend;
use crate::config::RenderMode;
use crate::rotation::Rotation;
use crate::sink::FrameSink;
use crate::transcode::PixelFormat;

/// Device lifecycle, power and capability contract of the host HAL
pub trait DisplayDevice {
    type Error;
    /// Compositor surface handle
    type Surface;
    /// Lower-level pixel driver handle
    type Driver;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Initialise the panel. Idempotent.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Tear the panel down. Idempotent, and a no-op before `start`.
    fn stop(&mut self) -> Result<(), Self::Error>;

    fn set_power_on(&mut self, on: bool);

    fn is_powered_on(&self) -> bool;

    fn supports_power_control(&self) -> bool;

    fn touch_device(&self) -> Option<Arc<dyn TouchDevice>>;

    fn supports_lvgl(&self) -> bool;

    /// Attach to the compositor. Idempotent.
    fn start_lvgl(&mut self) -> Result<(), Self::Error>;

    /// Detach from the compositor. Idempotent.
    fn stop_lvgl(&mut self);

    fn lvgl_display(&self) -> Option<&Self::Surface>;

    fn supports_display_driver(&self) -> bool;

    /// Issue the lower-level pixel driver.
    ///
    /// # Panics
    ///
    /// If the backend has no pixel driver, or a compositor surface is attached.
    fn display_driver(&mut self) -> Self::Driver;
}

/// Everything the compositor needs to create a display surface
#[derive(Debug)]
pub struct SurfaceSpec {
    pub width: u16,
    pub height: u16,
    /// Format the compositor must render in
    pub format: PixelFormat,
    pub render_mode: RenderMode,
    pub rotation: Rotation,
    /// Draw buffer; ownership passes to the compositor
    pub buffer: Vec<u8>,
}

/// The compositor side of the flush protocol
///
/// The compositor keeps the [`FrameSink`] and calls
/// [`FrameSink::flush`] from its redraw thread for every dirty area, then
/// acknowledges the flush itself once that call returns. Rotation changes are
/// reported through [`FrameSink::handle_rotation_change`].
pub trait Compositor<B: Backend> {
    type Surface;

    /// Create a surface; `None` if the compositor cannot
    fn create_surface(&mut self, spec: SurfaceSpec, target: FrameSink<B>) -> Option<Self::Surface>;

    /// Delete a surface and free its draw buffer
    fn delete_surface(&mut self, surface: Self::Surface);
}

/// Touch controller sharing the panel's compositor surface
pub trait TouchDevice: Send + Sync {
    fn supports_lvgl(&self) -> bool;

    /// Register with the compositor; `false` on failure
    fn start_lvgl(&self) -> bool;

    fn stop_lvgl(&self);
}

/// Memory the draw buffer can be placed in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Wide external RAM (PSRAM)
    External,
    /// DMA-capable internal RAM
    DmaInternal,
}

/// Allocates draw buffers in a specific memory region
pub trait BufferAllocator {
    /// A zeroed buffer of `size` bytes, or `None` if the region is exhausted
    fn allocate(&self, size: usize, region: MemoryRegion) -> Option<Vec<u8>>;
}

/// Allocator backed by the global heap, for targets where the heap already
/// lives in the preferred memory
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, size: usize, _region: MemoryRegion) -> Option<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).ok()?;
        buffer.resize(size, 0);
        Some(buffer)
    }
}

/// Try external RAM first, then DMA-capable internal RAM
pub(crate) fn allocate_draw_buffer<A: BufferAllocator + ?Sized>(
    allocator: &A,
    size: usize,
) -> Option<(Vec<u8>, MemoryRegion)> {
    if let Some(buffer) = allocator.allocate(size, MemoryRegion::External) {
        return Some((buffer, MemoryRegion::External));
    }
    warn!("[EPD] external RAM exhausted, falling back to internal RAM for {size} bytes");
    allocator
        .allocate(size, MemoryRegion::DmaInternal)
        .map(|buffer| (buffer, MemoryRegion::DmaInternal))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct InternalOnly;

    impl BufferAllocator for InternalOnly {
        fn allocate(&self, size: usize, region: MemoryRegion) -> Option<Vec<u8>> {
            (region == MemoryRegion::DmaInternal).then(|| vec![0; size])
        }
    }

    #[test]
    fn prefers_external_ram() {
        let (buffer, region) = allocate_draw_buffer(&HeapAllocator, 64).unwrap();
        assert_eq!(buffer.len(), 64);
        assert_eq!(region, MemoryRegion::External);
    }

    #[test]
    fn falls_back_to_internal_ram() {
        let (buffer, region) = allocate_draw_buffer(&InternalOnly, 16).unwrap();
        assert_eq!(buffer.len(), 16);
        assert_eq!(region, MemoryRegion::DmaInternal);
    }
}
