//! Pixel conversion between compositor buffers and native panel values
//!
//! Pure logic (no hardware) so it can be unit-tested on the host.
//!
//! The compositor hands over either 8-bit grayscale (one byte per pixel) or
//! packed 1-bit monochrome (eight pixels per byte, MSB first). Panels take
//! 4-bit gray levels or black/white. A backend picks one [`Transcoding`] per
//! source format and receives every pixel as a [`NativePixel`].

/// Pixel format of a compositor-supplied buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit grayscale, one byte per pixel
    L8,
    /// 1-bit monochrome, eight pixels per byte, MSB first, set bit = white
    I1,
}

impl PixelFormat {
    /// Bytes in one row of `width` pixels
    pub const fn row_bytes(self, width: u16) -> usize {
        match self {
            PixelFormat::L8 => width as usize,
            PixelFormat::I1 => (width as usize).div_ceil(8),
        }
    }

    /// Bytes needed for a `width` x `height` buffer
    pub const fn buffer_len(self, width: u16, height: u16) -> usize {
        self.row_bytes(width) * height as usize
    }
}

/// Full-intensity pixel value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intensity {
    Black,
    White,
}

/// A pixel ready for a native draw primitive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativePixel {
    /// Gray level 0 (black) ..= 15 (white)
    Gray4(u8),
    Mono(Intensity),
}

/// Conversion applied to a compositor buffer before it reaches the panel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transcoding {
    /// 8-bit gray scaled evenly onto 16 levels (`v / 17`) and packed two
    /// pixels per byte before being written out
    PackedGray4,
    /// 8-bit gray truncated to its high nibble. Lossy.
    HighNibble,
    /// 1-bit packed monochrome
    Monochrome,
}

impl Transcoding {
    /// Compositor format this conversion consumes
    pub const fn source_format(self) -> PixelFormat {
        match self {
            Transcoding::PackedGray4 | Transcoding::HighNibble => PixelFormat::L8,
            Transcoding::Monochrome => PixelFormat::I1,
        }
    }
}

/// A source buffer shorter than its region requires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShortBuffer {
    pub required: usize,
    pub provided: usize,
}

/// Scale an 8-bit gray value onto 16 levels
pub const fn gray8_to_gray4(value: u8) -> u8 {
    value / 17
}

/// Keep only the high nibble of an 8-bit gray value
pub const fn high_nibble(value: u8) -> u8 {
    value >> 4
}

/// Pack two 4-bit levels, first pixel in the high nibble
pub const fn pack_gray4(first: u8, second: u8) -> u8 {
    ((first & 0x0F) << 4) | (second & 0x0F)
}

/// Split a packed byte back into its (first, second) levels
pub const fn unpack_gray4(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

/// Convert 8-bit gray to packed 4-bit, two pixels per byte.
///
/// An odd pixel count pads the last low nibble with 0.
pub fn pack_gray8(source: &[u8]) -> Vec<u8> {
    source
        .chunks(2)
        .map(|pair| {
            let first = gray8_to_gray4(pair[0]);
            let second = pair.get(1).map_or(0, |&v| gray8_to_gray4(v));
            pack_gray4(first, second)
        })
        .collect()
}

/// Level of pixel `index` in a packed 4-bit buffer
pub fn packed_level(packed: &[u8], index: usize) -> u8 {
    let (first, second) = unpack_gray4(packed[index / 2]);
    if index % 2 == 0 { first } else { second }
}

/// Read one pixel of a packed monochrome buffer
pub fn mono_pixel(source: &[u8], width: u16, col: u16, row: u16) -> Intensity {
    let row_bytes = PixelFormat::I1.row_bytes(width);
    let byte = source[row as usize * row_bytes + col as usize / 8];
    let bit = 7 - (col % 8);
    if byte & (1 << bit) != 0 {
        Intensity::White
    } else {
        Intensity::Black
    }
}

/// Run `transcoding` over a `width` x `height` source buffer, handing every
/// pixel to `emit` in row-major order as `(col, row, pixel)`.
///
/// An empty region is a no-op. The buffer length is checked before any pixel
/// is emitted.
pub fn transcode<F>(
    transcoding: Transcoding,
    width: u16,
    height: u16,
    source: &[u8],
    mut emit: F,
) -> Result<(), ShortBuffer>
where
    F: FnMut(u16, u16, NativePixel),
{
    if width == 0 || height == 0 {
        return Ok(());
    }

    let required = transcoding.source_format().buffer_len(width, height);
    if source.len() < required {
        return Err(ShortBuffer {
            required,
            provided: source.len(),
        });
    }
    let source = &source[..required];

    match transcoding {
        Transcoding::PackedGray4 => {
            let packed = pack_gray8(source);
            for row in 0..height {
                for col in 0..width {
                    let index = row as usize * width as usize + col as usize;
                    emit(col, row, NativePixel::Gray4(packed_level(&packed, index)));
                }
            }
        }
        Transcoding::HighNibble => {
            for row in 0..height {
                for col in 0..width {
                    let value = source[row as usize * width as usize + col as usize];
                    emit(col, row, NativePixel::Gray4(high_nibble(value)));
                }
            }
        }
        Transcoding::Monochrome => {
            for row in 0..height {
                for col in 0..width {
                    emit(col, row, NativePixel::Mono(mono_pixel(source, width, col, row)));
                }
            }
        }
    }

    Ok(())
}
