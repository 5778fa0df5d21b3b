//! E-paper display device layer
//!
//! Bridges a compositor's flush protocol to e-ink panels driven by the EPDiy
//! or FastEPD libraries. One [`EpdDisplay`] per panel implements the host
//! HAL's [`DisplayDevice`](hal::DisplayDevice) contract; a [`FrameSink`]
//! serializes every framebuffer write, refresh and power transition behind
//! the device mutex.

#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod backend;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
#[cfg(feature = "graphics")]
pub mod graphics;
pub mod hal;
pub mod mock;
pub mod power;
pub mod presets;
pub mod rect;
pub mod rotation;
pub mod sink;
pub mod transcode;

pub use backend::{Backend, EpdiyBackend, FastEpdBackend, FlushPolicy};
pub use config::{Builder, Configuration, DrawMode, GraphicsMode, PanelId, RenderMode};
pub use device::{EpdDisplay, LifecycleState};
pub use driver::PixelDriver;
pub use error::{BuilderError, Error};
#[cfg(feature = "graphics")]
pub use graphics::Canvas;
pub use rect::Rect;
pub use rotation::{Rotation, RotationMapper};
pub use sink::FrameSink;
pub use transcode::{Intensity, PixelFormat};
