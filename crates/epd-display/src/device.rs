//! The public display device
//!
//! [`EpdDisplay`] implements the host HAL's [`DisplayDevice`] contract for any
//! [`Backend`]. It owns the lifecycle state machine:
//!
//! ```text
//! Uninitialized --start--> Initialized --stop--> Deinitialized
//!                               ^                      |
//!                               +--------start---------+
//! ```
//!
//! While initialized the device is either attached to the compositor
//! (`start_lvgl`) or not. An attached surface and an issued pixel driver
//! both write through the same native framebuffer, so holding both at once
//! is a contract violation and panics.
//!
//! ## Example
//!
//! ```
//! use epd_display::backend::EpdiyBackend;
//! use epd_display::hal::DisplayDevice;
//! use epd_display::mock::{CallLog, MockCompositor, MockEpdiy};
//! use epd_display::presets;
//! use epd_display::EpdDisplay;
//!
//! let log = CallLog::new();
//! let backend = EpdiyBackend::new(MockEpdiy::new(&log));
//! let mut display = EpdDisplay::new(backend, presets::m5paper_s3_epdiy(None), MockCompositor::new());
//!
//! display.start().unwrap();
//! display.start_lvgl().unwrap();
//! assert!(display.lvgl_display().is_some());
//!
//! display.stop_lvgl();
//! display.stop().unwrap();
//! ```

use std::sync::Arc;

use log::{error, info, warn};

use crate::backend::Backend;
use crate::config::{Configuration, DrawMode};
use crate::driver::PixelDriver;
use crate::error::Error;
use crate::hal::{
    BufferAllocator, Compositor, DisplayDevice, HeapAllocator, SurfaceSpec, TouchDevice,
    allocate_draw_buffer,
};
use crate::rect::Rect;
use crate::rotation::Rotation;
use crate::sink::{DeviceState, FrameSink};
use crate::transcode::Intensity;

/// Device lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized,
    Deinitialized,
}

/// E-paper display device over a panel [`Backend`]
///
/// ## Type Parameters
///
/// * `B` - Panel backend
/// * `C` - Compositor the device attaches to
/// * `A` - Draw buffer allocator
pub struct EpdDisplay<B, C, A = HeapAllocator>
where
    B: Backend,
    C: Compositor<B>,
    A: BufferAllocator,
{
    sink: FrameSink<B>,
    compositor: C,
    allocator: A,
    surface: Option<C::Surface>,
    driver: Option<Arc<PixelDriver<B>>>,
    touch: Option<Arc<dyn TouchDevice>>,
}

impl<B, C> EpdDisplay<B, C, HeapAllocator>
where
    B: Backend,
    C: Compositor<B>,
{
    /// Create a device. Nothing touches the hardware until [`start`](DisplayDevice::start).
    pub fn new(backend: B, config: Configuration, compositor: C) -> Self {
        Self::with_allocator(backend, config, compositor, HeapAllocator)
    }
}

impl<B, C, A> EpdDisplay<B, C, A>
where
    B: Backend,
    C: Compositor<B>,
    A: BufferAllocator,
{
    /// Create a device with a custom draw buffer allocator
    pub fn with_allocator(backend: B, config: Configuration, compositor: C, allocator: A) -> Self {
        let touch = config.touch.clone();
        Self {
            sink: FrameSink::new(DeviceState::new(backend, config)),
            compositor,
            allocator,
            surface: None,
            driver: None,
            touch,
        }
    }

    /// The shared write path
    pub fn frame_sink(&self) -> &FrameSink<B> {
        &self.sink
    }

    /// The compositor this device attaches to
    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    /// Mutable access to the compositor
    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> LifecycleState {
        self.sink.lifecycle()
    }

    /// `true` between a successful `start` and the next `stop`
    pub fn is_initialized(&self) -> bool {
        self.lifecycle() == LifecycleState::Initialized
    }

    /// Current rotation in compositor terms
    pub fn rotation(&self) -> Rotation {
        self.sink.rotation()
    }

    /// Width in the rotated coordinate space
    pub fn width(&self) -> u16 {
        self.sink.width()
    }

    /// Height in the rotated coordinate space
    pub fn height(&self) -> u16 {
        self.sink.height()
    }

    /// Clear the panel to white; power off afterwards unless `keep_powered`
    pub fn clear_white(&self, keep_powered: bool) -> Result<(), Error<B::Error>> {
        self.clear(Intensity::White, keep_powered)
    }

    /// Clear the panel to black; power off afterwards unless `keep_powered`
    pub fn clear_black(&self, keep_powered: bool) -> Result<(), Error<B::Error>> {
        self.clear(Intensity::Black, keep_powered)
    }

    fn clear(&self, intensity: Intensity, keep_powered: bool) -> Result<(), Error<B::Error>> {
        let mut state = self.sink.lock();
        let result = state.clear_all(intensity);
        if !keep_powered {
            state.set_power_on(false);
        }
        result
    }

    /// Clear `area` without refreshing it
    pub fn clear_area(&self, area: Rect) -> Result<(), Error<B::Error>> {
        self.sink.clear_region(area)
    }

    /// Refresh the whole panel, keeping it powered.
    ///
    /// `None` uses the configured draw mode or temperature.
    pub fn update_screen(
        &self,
        mode: Option<DrawMode>,
        temperature: Option<i32>,
    ) -> Result<(), Error<B::Error>> {
        self.sink.full_refresh(mode, temperature, true)
    }

    /// Refresh `area`, keeping the panel powered
    pub fn update_area(
        &self,
        area: Rect,
        mode: Option<DrawMode>,
        temperature: Option<i32>,
    ) -> Result<(), Error<B::Error>> {
        self.sink.refresh_area(area, mode, temperature)
    }

    /// Reset the framebuffer to white without a refresh
    pub fn set_all_white(&self) -> Result<(), Error<B::Error>> {
        self.sink.set_all_white()
    }

    /// Drop the cached pixel driver.
    ///
    /// # Panics
    ///
    /// If a clone of the driver is still held outside the device.
    fn release_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            let holders = Arc::strong_count(&driver);
            assert!(
                holders == 1,
                "pixel driver still in use ({} holders); the native framebuffer would be accessed after release",
                holders - 1
            );
        }
    }
}

impl<B, C, A> DisplayDevice for EpdDisplay<B, C, A>
where
    B: Backend,
    C: Compositor<B>,
    A: BufferAllocator,
{
    type Error = Error<B::Error>;
    type Surface = C::Surface;
    type Driver = Arc<PixelDriver<B>>;

    fn name(&self) -> &str {
        B::NAME
    }

    fn description(&self) -> &str {
        B::DESCRIPTION
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        let mut guard = self.sink.lock();
        let state = &mut *guard;
        if state.is_initialized() {
            warn!("[{}] already initialized", B::TAG);
            return Ok(());
        }

        info!("[{}] initializing {}", B::TAG, state.config.panel.name);
        if let Err(e) = state.backend.init(&state.config) {
            error!("[{}] panel init failed: {:?}", B::TAG, e);
            return Err(Error::Native(e));
        }
        state.lifecycle = LifecycleState::Initialized;
        info!(
            "[{}] ready, {}x{} at {} degrees",
            B::TAG,
            state.backend.width(),
            state.backend.height(),
            state.config.rotation.degrees()
        );

        // Known visual state after power-up
        if let Err(e) = state.clear_all(Intensity::White) {
            warn!("[{}] initial clear failed: {}", B::TAG, e);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        if !self.is_initialized() {
            return Ok(());
        }

        self.stop_lvgl();
        self.release_driver();

        let mut state = self.sink.lock();
        state.set_power_on(false);
        state.backend.deinit();
        state.lifecycle = LifecycleState::Deinitialized;
        state.dirty = false;
        info!("[{}] deinitialized", B::TAG);
        Ok(())
    }

    fn set_power_on(&mut self, on: bool) {
        self.sink.set_power_on(on);
    }

    fn is_powered_on(&self) -> bool {
        self.sink.is_powered_on()
    }

    fn supports_power_control(&self) -> bool {
        true
    }

    fn touch_device(&self) -> Option<Arc<dyn TouchDevice>> {
        self.touch.clone()
    }

    fn supports_lvgl(&self) -> bool {
        true
    }

    fn start_lvgl(&mut self) -> Result<(), Self::Error> {
        if self.surface.is_some() {
            warn!("[{}] compositor surface already attached", B::TAG);
            return Ok(());
        }
        self.release_driver();

        let spec_base = {
            let state = self.sink.lock();
            if !state.is_initialized() {
                error!("[{}] cannot attach compositor: not initialized", B::TAG);
                return Err(Error::NotReady);
            }
            let Some(format) = B::surface_format(state.config.graphics_mode) else {
                error!(
                    "[{}] no compositor format for {:?}",
                    B::TAG,
                    state.config.graphics_mode
                );
                return Err(Error::UnsupportedFormat);
            };
            (
                state.backend.width(),
                state.backend.height(),
                format,
                state.config.render_mode,
                state.config.rotation,
            )
        };
        let (width, height, format, render_mode, rotation) = spec_base;

        let size = format.buffer_len(width, height);
        let Some((buffer, region)) = allocate_draw_buffer(&self.allocator, size) else {
            error!("[{}] failed to allocate {} byte draw buffer", B::TAG, size);
            return Err(Error::Allocation { required: size });
        };
        info!(
            "[{}] draw buffer {} bytes in {:?}, format {:?}",
            B::TAG,
            size,
            region,
            format
        );

        // Flushes may start as soon as the surface exists
        self.sink.lock().attached = Some(format);
        let spec = SurfaceSpec {
            width,
            height,
            format,
            render_mode,
            rotation,
            buffer,
        };
        let Some(surface) = self.compositor.create_surface(spec, self.sink.clone()) else {
            error!("[{}] compositor refused to create a surface", B::TAG);
            self.sink.lock().attached = None;
            return Err(Error::Compositor);
        };
        self.surface = Some(surface);
        info!("[{}] compositor surface created", B::TAG);

        if let Some(touch) = &self.touch {
            if touch.supports_lvgl() && !touch.start_lvgl() {
                warn!("[{}] touch device failed to attach", B::TAG);
            }
        }
        Ok(())
    }

    fn stop_lvgl(&mut self) {
        let Some(surface) = self.surface.take() else {
            return;
        };

        if let Some(touch) = &self.touch {
            if touch.supports_lvgl() {
                touch.stop_lvgl();
            }
        }
        self.sink.lock().attached = None;
        self.compositor.delete_surface(surface);
        info!("[{}] compositor surface deleted", B::TAG);
    }

    fn lvgl_display(&self) -> Option<&Self::Surface> {
        self.surface.as_ref()
    }

    fn supports_display_driver(&self) -> bool {
        B::SUPPORTS_DISPLAY_DRIVER
    }

    fn display_driver(&mut self) -> Self::Driver {
        assert!(
            B::SUPPORTS_DISPLAY_DRIVER,
            "{} does not provide a pixel driver",
            B::NAME
        );
        assert!(
            self.surface.is_none(),
            "pixel driver requested while the compositor is attached; call stop_lvgl first"
        );
        let sink = &self.sink;
        let driver = self
            .driver
            .get_or_insert_with(|| Arc::new(PixelDriver::new(sink.clone())));
        Arc::clone(driver)
    }
}

impl<B, C, A> Drop for EpdDisplay<B, C, A>
where
    B: Backend,
    C: Compositor<B>,
    A: BufferAllocator,
{
    fn drop(&mut self) {
        self.stop_lvgl();
        if let Err(e) = self.stop() {
            warn!("[{}] stop during drop failed: {}", B::TAG, e);
        }
        self.release_driver();
    }
}
