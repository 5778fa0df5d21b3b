//! Display configuration types and builder

use core::fmt;
use std::sync::Arc;

pub use crate::error::BuilderError;
use crate::hal::TouchDevice;
use crate::rotation::Rotation;

/// Default panel bus speed (20 MHz)
pub const DEFAULT_BUS_SPEED_HZ: u32 = 20_000_000;

/// Default temperature compensation value, in degrees Celsius
pub const DEFAULT_TEMPERATURE: i32 = 25;

/// Panel/board identity handed to the native init primitive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelId {
    /// Backend-specific panel or board code
    pub code: i32,
    /// Human-readable name, used in logs
    pub name: &'static str,
}

impl PanelId {
    /// Identify a panel by its native library code and a display name
    pub const fn new(code: i32, name: &'static str) -> Self {
        Self { code, name }
    }
}

/// Native graphics mode of the panel framebuffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GraphicsMode {
    /// 1 bit per pixel
    Monochrome,
    /// 4 bits per pixel, 16 gray levels
    #[default]
    Gray4,
}

/// How the compositor renders into its draw buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Only dirty areas are rendered and flushed
    #[default]
    Partial,
    /// The whole screen is rendered and flushed every time
    Full,
}

/// Refresh waveform selector, passed through to the panel library untouched
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawMode(u32);

impl DrawMode {
    /// Wrap a raw native draw mode value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value handed to the native library
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Same mode with extra library flag bits set
    pub const fn with_flags(self, flags: u32) -> Self {
        Self(self.0 | flags)
    }
}

/// Display configuration
///
/// Owned by the display device for its whole lifetime. Only `rotation` ever
/// changes after construction, when the compositor reports a new
/// orientation. Use [`Builder`] to create one.
#[derive(Clone)]
pub struct Configuration {
    /// Panel or board identity
    pub panel: PanelId,
    /// Native bus speed in Hz
    pub bus_speed_hz: u32,
    /// Compositor-visible rotation
    pub rotation: Rotation,
    /// Framebuffer bit depth
    pub graphics_mode: GraphicsMode,
    /// Default refresh waveform
    pub draw_mode: DrawMode,
    /// Default temperature compensation value
    pub temperature: i32,
    /// Passes for a partial refresh
    pub partial_passes: u8,
    /// Passes for a full refresh
    pub full_passes: u8,
    /// Compositor render mode
    pub render_mode: RenderMode,
    /// Touch controller attached to the same panel, if any
    pub touch: Option<Arc<dyn TouchDevice>>,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("panel", &self.panel)
            .field("bus_speed_hz", &self.bus_speed_hz)
            .field("rotation", &self.rotation)
            .field("graphics_mode", &self.graphics_mode)
            .field("draw_mode", &self.draw_mode)
            .field("temperature", &self.temperature)
            .field("partial_passes", &self.partial_passes)
            .field("full_passes", &self.full_passes)
            .field("render_mode", &self.render_mode)
            .field("touch", &self.touch.is_some())
            .finish()
    }
}

/// Builder for constructing display configuration
///
/// # Example
///
/// ```
/// use epd_display::config::{Builder, PanelId};
/// use epd_display::rotation::Rotation;
///
/// let config = Builder::new()
///     .panel(PanelId::new(1, "M5Paper S3"))
///     .rotation(Rotation::Rotate90)
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.partial_passes, 3);
/// ```
pub struct Builder {
    /// Panel identity (required)
    panel: Option<PanelId>,
    bus_speed_hz: u32,
    rotation: Rotation,
    graphics_mode: GraphicsMode,
    draw_mode: DrawMode,
    temperature: i32,
    partial_passes: u8,
    full_passes: u8,
    render_mode: RenderMode,
    touch: Option<Arc<dyn TouchDevice>>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            panel: None,
            bus_speed_hz: DEFAULT_BUS_SPEED_HZ,
            rotation: Rotation::Rotate0,
            graphics_mode: GraphicsMode::Gray4,
            draw_mode: DrawMode::default(),
            temperature: DEFAULT_TEMPERATURE,
            partial_passes: 3,
            full_passes: 5,
            render_mode: RenderMode::Partial,
            touch: None,
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the panel identity (required)
    pub fn panel(mut self, panel: PanelId) -> Self {
        self.panel = Some(panel);
        self
    }

    /// Set the panel bus clock in Hz
    ///
    /// Only the FastEPD backend uses it.
    pub fn bus_speed_hz(mut self, hz: u32) -> Self {
        self.bus_speed_hz = hz;
        self
    }

    /// Set the initial display rotation
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the framebuffer bit depth
    pub fn graphics_mode(mut self, mode: GraphicsMode) -> Self {
        self.graphics_mode = mode;
        self
    }

    /// Set the default refresh waveform
    pub fn draw_mode(mut self, mode: DrawMode) -> Self {
        self.draw_mode = mode;
        self
    }

    /// Set the default temperature compensation value
    pub fn temperature(mut self, celsius: i32) -> Self {
        self.temperature = celsius;
        self
    }

    /// Set the pass counts for partial and full refreshes
    pub fn passes(mut self, partial: u8, full: u8) -> Self {
        self.partial_passes = partial;
        self.full_passes = full;
        self
    }

    /// Set how the compositor renders into the draw buffer
    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Attach a touch controller
    pub fn touch(mut self, touch: Arc<dyn TouchDevice>) -> Self {
        self.touch = Some(touch);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// - `BuilderError::MissingPanel` if no panel was set
    /// - `BuilderError::InvalidPasses` if either pass count is zero
    /// - `BuilderError::InvalidBusSpeed` if the bus speed is zero
    pub fn build(self) -> Result<Configuration, BuilderError> {
        let panel = self.panel.ok_or(BuilderError::MissingPanel)?;
        if self.partial_passes == 0 || self.full_passes == 0 {
            return Err(BuilderError::InvalidPasses {
                partial: self.partial_passes,
                full: self.full_passes,
            });
        }
        if self.bus_speed_hz == 0 {
            return Err(BuilderError::InvalidBusSpeed(self.bus_speed_hz));
        }

        Ok(Configuration {
            panel,
            bus_speed_hz: self.bus_speed_hz,
            rotation: self.rotation,
            graphics_mode: self.graphics_mode,
            draw_mode: self.draw_mode,
            temperature: self.temperature,
            partial_passes: self.partial_passes,
            full_passes: self.full_passes,
            render_mode: self.render_mode,
            touch: self.touch,
        })
    }
}
