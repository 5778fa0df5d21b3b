//! Rectangular regions in the rotated (compositor-facing) coordinate space

/// A rectangle with its top-left corner at `(x, y)`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from inclusive corner coordinates, the way the
    /// compositor describes dirty areas.
    ///
    /// Inverted corners produce an empty rectangle; spans wider than
    /// `u16::MAX` are clamped.
    ///
    /// ## Example
    ///
    /// ```
    /// use epd_display::Rect;
    ///
    /// let area = Rect::from_corners(10, 20, 19, 21);
    /// assert_eq!((area.width, area.height), (10, 2));
    /// ```
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(x1, y1, inclusive_span(x1, x2), inclusive_span(y1, y2))
    }

    /// `true` if the rectangle covers no pixels
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn inclusive_span(first: i32, last: i32) -> u16 {
    (i64::from(last) - i64::from(first) + 1).clamp(0, i64::from(u16::MAX)) as u16
}
