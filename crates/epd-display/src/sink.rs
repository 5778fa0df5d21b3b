//! Mutex-guarded write path into the panel framebuffer
//!
//! Every operation that touches native state goes through [`DeviceState`]
//! while the device mutex is held: compositor flushes, explicit
//! application refreshes, pixel driver blits and power transitions. The
//! [`FrameSink`] handle is what the compositor keeps as its flush target.

use core::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};

use crate::backend::{Backend, FlushPolicy};
use crate::config::{Configuration, DrawMode};
use crate::device::LifecycleState;
use crate::error::Error;
use crate::power::PowerSequencer;
use crate::rect::Rect;
use crate::rotation::{Rotation, RotationMapper};
use crate::transcode::{Intensity, PixelFormat, transcode};

/// Everything guarded by the device mutex
pub(crate) struct DeviceState<B> {
    pub(crate) backend: B,
    pub(crate) config: Configuration,
    pub(crate) power: PowerSequencer,
    pub(crate) lifecycle: LifecycleState,
    /// Compositor format while a surface is attached
    pub(crate) attached: Option<PixelFormat>,
    /// Framebuffer holds pixels the panel has not shown yet
    pub(crate) dirty: bool,
}

/// Log a native failure and wrap it
fn native<B: Backend>(result: Result<(), B::Error>, operation: &str) -> Result<(), Error<B::Error>> {
    result.map_err(|e| {
        error!("[{}] {} failed: {:?}", B::TAG, operation, e);
        Error::Native(e)
    })
}

impl<B: Backend> DeviceState<B> {
    pub(crate) fn new(backend: B, config: Configuration) -> Self {
        Self {
            backend,
            config,
            power: PowerSequencer::new(),
            lifecycle: LifecycleState::Uninitialized,
            attached: None,
            dirty: false,
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.lifecycle == LifecycleState::Initialized
    }

    pub(crate) fn ready(&self) -> Result<(), Error<B::Error>> {
        if self.is_initialized() {
            Ok(())
        } else {
            error!("[{}] display not initialized", B::TAG);
            Err(Error::NotReady)
        }
    }

    pub(crate) fn ensure_powered(&mut self) {
        self.power.ensure_on(&mut self.backend);
    }

    pub(crate) fn set_power_on(&mut self, on: bool) {
        self.power.set_power_on(&mut self.backend, on);
    }

    /// Fill the framebuffer with one intensity and refresh the whole panel
    pub(crate) fn clear_all(&mut self, intensity: Intensity) -> Result<(), Error<B::Error>> {
        self.ready()?;
        self.ensure_powered();
        let result = self
            .backend
            .clear(intensity, self.config.draw_mode, self.config.temperature);
        native::<B>(result, "clear")?;
        self.dirty = false;
        Ok(())
    }

    pub(crate) fn clear_region(&mut self, area: Rect) -> Result<(), Error<B::Error>> {
        self.ready()?;
        if area.is_empty() {
            return Ok(());
        }
        self.ensure_powered();
        self.backend.clear_area(area);
        if B::FLUSH_POLICY == FlushPolicy::Deferred {
            self.dirty = true;
        }
        Ok(())
    }

    /// Transcode `pixels` into the framebuffer one pixel at a time, then
    /// apply the backend's flush policy
    pub(crate) fn write_region(
        &mut self,
        area: Rect,
        pixels: &[u8],
        format: PixelFormat,
    ) -> Result<(), Error<B::Error>> {
        self.ready()?;
        if area.is_empty() {
            return Ok(());
        }

        let Some(transcoding) = B::transcoding(format) else {
            error!("[{}] no conversion for {:?} pixels", B::TAG, format);
            return Err(Error::UnsupportedFormat);
        };
        let required = format.buffer_len(area.width, area.height);
        if pixels.len() < required {
            error!(
                "[{}] flush buffer too small: {} < {} bytes",
                B::TAG,
                pixels.len(),
                required
            );
            return Err(Error::BufferTooSmall {
                required,
                provided: pixels.len(),
            });
        }

        self.ensure_powered();
        let backend = &mut self.backend;
        transcode(transcoding, area.width, area.height, pixels, |col, row, pixel| {
            backend.draw_pixel(
                area.x.saturating_add(i32::from(col)),
                area.y.saturating_add(i32::from(row)),
                pixel,
            );
        })?;
        debug!(
            "[{}] wrote {}x{} at ({}, {})",
            B::TAG,
            area.width,
            area.height,
            area.x,
            area.y
        );

        match B::FLUSH_POLICY {
            FlushPolicy::Immediate => {
                let mode = B::flush_mode(self.config.draw_mode);
                let result = self
                    .backend
                    .refresh_area(area, mode, self.config.temperature);
                native::<B>(result, "area refresh")
            }
            FlushPolicy::Deferred => {
                self.dirty = true;
                Ok(())
            }
        }
    }

    /// Compositor flush: pixels arrive in the attached surface's format
    pub(crate) fn flush(&mut self, area: Rect, pixels: &[u8]) -> Result<(), Error<B::Error>> {
        let Some(format) = self.attached else {
            error!("[{}] flush without an attached surface", B::TAG);
            return Err(Error::NotReady);
        };
        self.write_region(area, pixels, format)
    }

    pub(crate) fn full_refresh(
        &mut self,
        mode: Option<DrawMode>,
        temperature: Option<i32>,
        keep_powered: bool,
    ) -> Result<(), Error<B::Error>> {
        self.ready()?;
        self.ensure_powered();
        let result = self.backend.refresh_full(
            mode.unwrap_or(self.config.draw_mode),
            temperature.unwrap_or(self.config.temperature),
        );
        if !keep_powered {
            self.set_power_on(false);
        }
        native::<B>(result, "full refresh")?;
        self.dirty = false;
        Ok(())
    }

    pub(crate) fn partial_refresh(
        &mut self,
        rows: RangeInclusive<u16>,
        keep_powered: bool,
    ) -> Result<(), Error<B::Error>> {
        self.ready()?;
        if rows.is_empty() {
            return Ok(());
        }
        self.ensure_powered();
        let result =
            self.backend
                .refresh_rows(rows, self.config.draw_mode, self.config.temperature);
        if !keep_powered {
            self.set_power_on(false);
        }
        native::<B>(result, "partial refresh")
    }

    pub(crate) fn refresh_area(
        &mut self,
        area: Rect,
        mode: Option<DrawMode>,
        temperature: Option<i32>,
    ) -> Result<(), Error<B::Error>> {
        self.ready()?;
        if area.is_empty() {
            return Ok(());
        }
        self.ensure_powered();
        let result = self.backend.refresh_area(
            area,
            mode.unwrap_or(self.config.draw_mode),
            temperature.unwrap_or(self.config.temperature),
        );
        native::<B>(result, "area refresh")
    }

    pub(crate) fn set_all_white(&mut self) -> Result<(), Error<B::Error>> {
        self.ready()?;
        self.backend.set_all_white();
        self.dirty = true;
        Ok(())
    }

    /// Record a compositor rotation and push it to the panel
    pub(crate) fn rotate(&mut self, rotation: Rotation) {
        self.config.rotation = rotation;
        let native = B::Rotation::to_native(rotation);
        if self.is_initialized() {
            self.backend.set_rotation(native);
        }
        info!(
            "[{}] rotation {} degrees, native {:?}",
            B::TAG,
            rotation.degrees(),
            native
        );
    }
}

/// Shared handle to a device's write path
///
/// Clones share one mutex. The compositor keeps one as its flush target; the
/// pixel driver keeps another.
pub struct FrameSink<B> {
    state: Arc<Mutex<DeviceState<B>>>,
}

impl<B> Clone for FrameSink<B> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<B: Backend> FrameSink<B> {
    pub(crate) fn new(state: DeviceState<B>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Take the device mutex. Native calls always run to completion, so
    /// the state behind a poisoned lock is still usable.
    pub(crate) fn lock(&self) -> MutexGuard<'_, DeviceState<B>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fill the panel with `intensity` and run a full refresh
    pub fn clear_all(&self, intensity: Intensity) -> Result<(), Error<B::Error>> {
        self.lock().clear_all(intensity)
    }

    /// Clear `area` without a following refresh
    pub fn clear_region(&self, area: Rect) -> Result<(), Error<B::Error>> {
        self.lock().clear_region(area)
    }

    /// Write a region of `format` pixels into the framebuffer
    ///
    /// # Errors
    ///
    /// - `Error::NotReady` before `start` or after `stop`; nothing is touched
    /// - `Error::UnsupportedFormat` if the backend has no conversion for
    ///   `format`
    /// - `Error::BufferTooSmall` if `pixels` does not cover `area`
    /// - `Error::Native` if an immediate area refresh fails
    pub fn write_region(
        &self,
        area: Rect,
        pixels: &[u8],
        format: PixelFormat,
    ) -> Result<(), Error<B::Error>> {
        self.lock().write_region(area, pixels, format)
    }

    /// Flush entry point for the compositor's redraw thread.
    ///
    /// `pixels` are in the format the surface was created with. The
    /// compositor acknowledges the flush once this returns, whatever the
    /// outcome.
    pub fn flush(&self, area: Rect, pixels: &[u8]) -> Result<(), Error<B::Error>> {
        self.lock().flush(area, pixels)
    }

    /// Refresh the whole panel; power off afterwards unless `keep_powered`
    pub fn full_refresh(
        &self,
        mode: Option<DrawMode>,
        temperature: Option<i32>,
        keep_powered: bool,
    ) -> Result<(), Error<B::Error>> {
        self.lock().full_refresh(mode, temperature, keep_powered)
    }

    /// Refresh a band of rows; power off afterwards unless `keep_powered`
    pub fn partial_refresh(
        &self,
        rows: RangeInclusive<u16>,
        keep_powered: bool,
    ) -> Result<(), Error<B::Error>> {
        self.lock().partial_refresh(rows, keep_powered)
    }

    /// Refresh `area` without touching the power state.
    ///
    /// # Arguments
    ///
    /// * `mode` - draw mode, or `None` for the configured one
    /// * `temperature` - temperature in Celsius, or `None` for the configured one
    pub fn refresh_area(
        &self,
        area: Rect,
        mode: Option<DrawMode>,
        temperature: Option<i32>,
    ) -> Result<(), Error<B::Error>> {
        self.lock().refresh_area(area, mode, temperature)
    }

    /// Reset the framebuffer to white without refreshing or powering up
    pub fn set_all_white(&self) -> Result<(), Error<B::Error>> {
        self.lock().set_all_white()
    }

    /// Rotation-change notification from the compositor
    pub fn handle_rotation_change(&self, rotation: Rotation) {
        self.lock().rotate(rotation);
    }

    /// Current rotation in compositor terms
    pub fn rotation(&self) -> Rotation {
        self.lock().config.rotation
    }

    /// Drive the panel power rail; a no-op if it is already in that state
    pub fn set_power_on(&self, on: bool) {
        self.lock().set_power_on(on);
    }

    pub fn is_powered_on(&self) -> bool {
        self.lock().power.is_on()
    }

    /// Whether the framebuffer holds pixels the panel has not shown yet
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Lifecycle state of the owning device
    pub fn lifecycle(&self) -> LifecycleState {
        self.lock().lifecycle
    }

    /// Width in the rotated coordinate space
    pub fn width(&self) -> u16 {
        self.lock().backend.width()
    }

    /// Height in the rotated coordinate space
    pub fn height(&self) -> u16 {
        self.lock().backend.height()
    }
}
