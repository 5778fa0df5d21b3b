//! Rotation mapping between the compositor and the native panel libraries
//!
//! The compositor describes rotation as one of four clockwise steps
//! ([`Rotation`]). Each panel library has its own notion of rotation, so
//! every backend carries a [`RotationMapper`] that converts in both
//! directions. The native enumerations are never unified with each other.
//!
//! ## Example
//!
//! ```
//! use epd_display::rotation::{EpdiyRotation, EpdiyRotationMap, Rotation, RotationMapper};
//!
//! assert_eq!(EpdiyRotationMap::to_native(Rotation::Rotate270), EpdiyRotation::Portrait);
//! assert_eq!(EpdiyRotationMap::to_compositor(EpdiyRotation::Portrait), Rotation::Rotate270);
//!
//! // Unknown raw values fall back to the identity rotation
//! assert_eq!(Rotation::from_raw(7), Rotation::Rotate0);
//! ```

use core::fmt::Debug;

/// Compositor-visible rotation, clockwise
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    /// No rotation
    #[default]
    Rotate0,
    /// Rotate 90 degrees clockwise
    Rotate90,
    /// Rotate 180 degrees
    Rotate180,
    /// Rotate 270 degrees clockwise
    Rotate270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Rotate0,
        Rotation::Rotate90,
        Rotation::Rotate180,
        Rotation::Rotate270,
    ];

    /// Decode the compositor's rotation index (0..=3).
    ///
    /// Anything else maps to [`Rotation::Rotate0`]: a wrong but valid
    /// orientation beats refusing to draw.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Rotation::Rotate90,
            2 => Rotation::Rotate180,
            3 => Rotation::Rotate270,
            _ => Rotation::Rotate0,
        }
    }

    /// Index into the four-element rotation domain
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Clockwise rotation in degrees
    pub const fn degrees(self) -> u16 {
        match self {
            Rotation::Rotate0 => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

/// Bidirectional lookup between [`Rotation`] and a backend's native rotation
pub trait RotationMapper {
    /// The panel library's rotation type
    type Native: Copy + Debug + PartialEq;

    fn to_native(rotation: Rotation) -> Self::Native;

    fn to_compositor(native: Self::Native) -> Rotation;
}

/// EPDiy's rotation enumeration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum EpdiyRotation {
    #[default]
    Landscape = 0,
    /// 90 degrees clockwise from the panel's point of view
    Portrait = 1,
    InvertedLandscape = 2,
    /// 270 degrees clockwise from the panel's point of view
    InvertedPortrait = 3,
}

impl EpdiyRotation {
    /// Decode a raw `EpdRotation` value, falling back to landscape
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => EpdiyRotation::Portrait,
            2 => EpdiyRotation::InvertedLandscape,
            3 => EpdiyRotation::InvertedPortrait,
            _ => EpdiyRotation::Landscape,
        }
    }
}

/// EPDiy rotates the panel clockwise, the compositor rotates the content:
/// the two portrait orientations swap.
pub struct EpdiyRotationMap;

impl RotationMapper for EpdiyRotationMap {
    type Native = EpdiyRotation;

    fn to_native(rotation: Rotation) -> EpdiyRotation {
        const TABLE: [EpdiyRotation; 4] = [
            EpdiyRotation::Landscape,
            EpdiyRotation::InvertedPortrait,
            EpdiyRotation::InvertedLandscape,
            EpdiyRotation::Portrait,
        ];
        TABLE[rotation.index()]
    }

    fn to_compositor(native: EpdiyRotation) -> Rotation {
        const TABLE: [Rotation; 4] = [
            Rotation::Rotate0,
            Rotation::Rotate270,
            Rotation::Rotate180,
            Rotation::Rotate90,
        ];
        TABLE[native as usize]
    }
}

/// FastEPD's rotation, expressed in degrees
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FastEpdRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl FastEpdRotation {
    /// Decode a degree value, falling back to 0 for anything off the grid
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees {
            90 => FastEpdRotation::Deg90,
            180 => FastEpdRotation::Deg180,
            270 => FastEpdRotation::Deg270,
            _ => FastEpdRotation::Deg0,
        }
    }

    /// Degrees handed to the panel's `set_rotation`
    pub const fn degrees(self) -> i32 {
        match self {
            FastEpdRotation::Deg0 => 0,
            FastEpdRotation::Deg90 => 90,
            FastEpdRotation::Deg180 => 180,
            FastEpdRotation::Deg270 => 270,
        }
    }
}

/// FastEPD rotates in the same direction as the compositor.
pub struct FastEpdRotationMap;

impl RotationMapper for FastEpdRotationMap {
    type Native = FastEpdRotation;

    fn to_native(rotation: Rotation) -> FastEpdRotation {
        const TABLE: [FastEpdRotation; 4] = [
            FastEpdRotation::Deg0,
            FastEpdRotation::Deg90,
            FastEpdRotation::Deg180,
            FastEpdRotation::Deg270,
        ];
        TABLE[rotation.index()]
    }

    fn to_compositor(native: FastEpdRotation) -> Rotation {
        const TABLE: [Rotation; 4] = [
            Rotation::Rotate0,
            Rotation::Rotate90,
            Rotation::Rotate180,
            Rotation::Rotate270,
        ];
        TABLE[native as usize]
    }
}
