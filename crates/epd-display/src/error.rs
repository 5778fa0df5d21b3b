//! Error types for the driver
//!
//! This module defines error types for configuration building ([`BuilderError`])
//! and display operations ([`Error`]).
//!
//! ## Error Types
//!
//! - [`BuilderError`] - Errors during configuration construction
//! - [`Error`] - Runtime errors during display operations, generic over the
//!   native panel library's error type
//!
//! Misuse that would let two paths write through the same framebuffer
//! (tearing the device down under a live pixel driver, attaching the
//! compositor while a pixel driver is out) is not an error value: it panics.
//!
//! ## Example
//!
//! ```
//! use epd_display::config::{Builder, BuilderError};
//!
//! // Missing panel identity
//! let result = Builder::new().build();
//! assert!(matches!(result, Err(BuilderError::MissingPanel)));
//! ```

use core::fmt::Debug;

use crate::transcode::ShortBuffer;

/// Errors that can occur when interacting with the display
///
/// Generic over the native library's error type so callers can match on the
/// underlying failure code.
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// The device is not started (or already stopped). No hardware was touched.
    NotReady,
    /// The native panel library reported a failure
    Native(E),
    /// A framebuffer or draw buffer could not be allocated
    Allocation {
        /// Requested size in bytes
        required: usize,
    },
    /// The configured graphics mode or source format has no conversion on
    /// this backend
    UnsupportedFormat,
    /// The compositor refused to create a surface
    Compositor,
    /// A pixel buffer is too small for its region
    BufferTooSmall {
        /// Required buffer size in bytes
        required: usize,
        /// Provided buffer size in bytes
        provided: usize,
    },
    /// Bitmap corners describe an empty or inverted rectangle
    InvalidBitmap { width: i32, height: i32 },
}

impl<E> From<ShortBuffer> for Error<E> {
    fn from(short: ShortBuffer) -> Self {
        Error::BufferTooSmall {
            required: short.required,
            provided: short.provided,
        }
    }
}

impl<E: Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotReady => write!(f, "Display not initialized"),
            Error::Native(e) => write!(f, "Panel library error: {e:?}"),
            Error::Allocation { required } => {
                write!(f, "Failed to allocate {required} byte buffer")
            }
            Error::UnsupportedFormat => write!(f, "Unsupported pixel format"),
            Error::Compositor => write!(f, "Compositor refused to create a surface"),
            Error::BufferTooSmall { required, provided } => {
                write!(
                    f,
                    "Buffer too small: required {required} bytes, provided {provided}"
                )
            }
            Error::InvalidBitmap { width, height } => {
                write!(f, "Invalid bitmap dimensions: {width}x{height}")
            }
        }
    }
}

impl<E: Debug> core::error::Error for Error<E> {}

/// Errors that can occur when building configuration
///
/// These errors occur during the builder pattern before the display is created.
#[derive(Debug, PartialEq)]
pub enum BuilderError {
    /// Panel identity was not specified
    ///
    /// [`Builder::panel()`](crate::config::Builder::panel) must be called before building.
    MissingPanel,
    /// Pass counts must be non-zero
    InvalidPasses { partial: u8, full: u8 },
    /// Bus speed must be non-zero
    InvalidBusSpeed(u32),
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BuilderError::MissingPanel => write!(f, "Panel must be specified"),
            BuilderError::InvalidPasses { partial, full } => write!(
                f,
                "Invalid pass counts (partial {partial}, full {full}), both must be non-zero"
            ),
            BuilderError::InvalidBusSpeed(hz) => write!(f, "Invalid bus speed {hz} Hz"),
        }
    }
}

impl core::error::Error for BuilderError {}
