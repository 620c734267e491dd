//! Decoding of pointer PDUs into RGBA bitmaps ready for consumers.
//!
//! RDP describes a pointer with two masks. The XOR mask carries the base
//! color of each pixel; the AND mask selects full transparency
//! (`and == 1`, black), pixel inversion (`and == 1`, white) or plain opacity
//! (`and == 0`). XOR masks come in 1, 16, 24 or 32 bits per pixel; the AND
//! mask is always one bit per pixel. Scanlines of both masks are padded to
//! 16-bit boundaries, and color pointers are stored bottom-up.

use autordp_core::ReadCursor;
use autordp_pdu::pointer::{ColorPointerAttribute, LargePointerAttribute, PointerAttribute};
use thiserror::Error;

use crate::color_conversion::rdp_16bit_to_rgb;

#[derive(Debug, Error)]
pub enum PointerError {
    #[error("invalid pointer xorMask size: expected {expected}, actual {actual}")]
    InvalidXorMaskSize { expected: usize, actual: usize },
    #[error("invalid pointer andMask size: expected {expected}, actual {actual}")]
    InvalidAndMaskSize { expected: usize, actual: usize },
    #[error("unsupported pointer bpp: {bpp}")]
    UnsupportedBpp { bpp: usize },
}

/// A pointer image in decoded form: premultiplied RGBA, top-down rows.
///
/// Fully transparent white (`[255, 255, 255, 0]`) marks pixels which invert
/// the screen under them; a color with zero alpha is otherwise invisible, so
/// the encoding cannot collide with a real pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPointer {
    pub width: usize,
    pub height: usize,
    pub hotspot_x: usize,
    pub hotspot_y: usize,
    pub rgba_data: Vec<u8>,
}

impl DecodedPointer {
    pub fn decode_pointer_attribute(src: &PointerAttribute<'_>) -> Result<Self, PointerError> {
        Self::decode_pointer(PointerData {
            width: usize::from(src.color_pointer.width),
            height: usize::from(src.color_pointer.height),
            xor_bpp: usize::from(src.xor_bpp),
            xor_mask: src.color_pointer.xor_mask,
            and_mask: src.color_pointer.and_mask,
            hotspot_x: usize::from(src.color_pointer.hot_spot.x),
            hotspot_y: usize::from(src.color_pointer.hot_spot.y),
        })
    }

    pub fn decode_color_pointer_attribute(src: &ColorPointerAttribute<'_>) -> Result<Self, PointerError> {
        Self::decode_pointer(PointerData {
            width: usize::from(src.width),
            height: usize::from(src.height),
            xor_bpp: 24,
            xor_mask: src.xor_mask,
            and_mask: src.and_mask,
            hotspot_x: usize::from(src.hot_spot.x),
            hotspot_y: usize::from(src.hot_spot.y),
        })
    }

    pub fn decode_large_pointer_attribute(src: &LargePointerAttribute<'_>) -> Result<Self, PointerError> {
        Self::decode_pointer(PointerData {
            width: usize::from(src.width),
            height: usize::from(src.height),
            xor_bpp: usize::from(src.xor_bpp),
            xor_mask: src.xor_mask,
            and_mask: src.and_mask,
            hotspot_x: usize::from(src.hot_spot.x),
            hotspot_y: usize::from(src.hot_spot.y),
        })
    }

    fn decode_pointer(data: PointerData<'_>) -> Result<Self, PointerError> {
        const SUPPORTED_XOR_BPP: [usize; 4] = [1, 16, 24, 32];

        if data.width == 0 || data.height == 0 {
            return Ok(Self {
                width: 0,
                height: 0,
                hotspot_x: 0,
                hotspot_y: 0,
                rgba_data: Vec::new(),
            });
        }

        if !SUPPORTED_XOR_BPP.contains(&data.xor_bpp) {
            // 8 bpp indexed pointers would need the color palette plumbed in.
            return Err(PointerError::UnsupportedBpp { bpp: data.xor_bpp });
        }

        // Monochrome pointers are stored top-down, color pointers bottom-up.
        let flip_vertical = data.xor_bpp != 1;

        let and_stride = Stride::from_bits(data.width);
        let xor_stride = Stride::from_bits(data.width * data.xor_bpp);

        if data.xor_mask.len() != xor_stride.length * data.height {
            return Err(PointerError::InvalidXorMaskSize {
                expected: xor_stride.length * data.height,
                actual: data.xor_mask.len(),
            });
        }

        if data.and_mask.len() != and_stride.length * data.height {
            return Err(PointerError::InvalidAndMaskSize {
                expected: and_stride.length * data.height,
                actual: data.and_mask.len(),
            });
        }

        let mut rgba_data = Vec::with_capacity(data.width * data.height * 4);

        for row_idx in 0..data.height {
            let src_row = if flip_vertical { data.height - row_idx - 1 } else { row_idx };

            let mut xor_cursor = ReadCursor::new(&data.xor_mask[src_row * xor_stride.length..]);
            let mut and_cursor = ReadCursor::new(&data.and_mask[src_row * and_stride.length..]);

            let mut color_reader = ColorStrideReader::new(data.xor_bpp);
            let mut bitmask_reader = BitmaskStrideReader::new();

            for _ in 0..data.width {
                let and_bit = bitmask_reader.next_bit(&mut and_cursor);
                let color = color_reader.next_pixel(&mut xor_cursor);

                if and_bit == 1 && color == [0, 0, 0, 0xFF] {
                    // The only way a non-32-bit pointer expresses transparency.
                    rgba_data.extend_from_slice(&[0, 0, 0, 0]);
                } else if and_bit == 1 && color == [0xFF, 0xFF, 0xFF, 0xFF] {
                    // Inverted pixel.
                    rgba_data.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0x00]);
                } else {
                    let premultiplied = [
                        ((u16::from(color[0]) * u16::from(color[3])) >> 8) as u8,
                        ((u16::from(color[1]) * u16::from(color[3])) >> 8) as u8,
                        ((u16::from(color[2]) * u16::from(color[3])) >> 8) as u8,
                        color[3],
                    ];
                    rgba_data.extend_from_slice(&premultiplied);
                }
            }
        }

        Ok(Self {
            width: data.width,
            height: data.height,
            hotspot_x: data.hotspot_x,
            hotspot_y: data.hotspot_y,
            rgba_data,
        })
    }
}

/// Message-agnostic pointer data.
struct PointerData<'a> {
    width: usize,
    height: usize,
    xor_bpp: usize,
    xor_mask: &'a [u8],
    and_mask: &'a [u8],
    hotspot_x: usize,
    hotspot_y: usize,
}

#[derive(Clone, Copy)]
struct Stride {
    length: usize,
}

impl Stride {
    fn from_bits(bits: usize) -> Stride {
        Stride {
            length: bits.div_ceil(16) * 2,
        }
    }
}

struct BitmaskStrideReader {
    current_byte: u8,
    read_bits: usize,
}

impl BitmaskStrideReader {
    fn new() -> Self {
        Self {
            current_byte: 0,
            read_bits: 8,
        }
    }

    fn next_bit(&mut self, cursor: &mut ReadCursor<'_>) -> u8 {
        if self.read_bits == 8 {
            self.read_bits = 0;
            self.current_byte = cursor.read_u8();
        }

        let bit = (self.current_byte >> (7 - self.read_bits)) & 1;
        self.read_bits += 1;
        bit
    }
}

enum ColorStrideReader {
    Color { bpp: usize },
    Bitmask(BitmaskStrideReader),
}

impl ColorStrideReader {
    fn new(bpp: usize) -> Self {
        match bpp {
            1 => Self::Bitmask(BitmaskStrideReader::new()),
            bpp => Self::Color { bpp },
        }
    }

    /// Reads the next pixel as non-premultiplied RGBA.
    fn next_pixel(&mut self, cursor: &mut ReadCursor<'_>) -> [u8; 4] {
        match self {
            ColorStrideReader::Color { bpp } => match bpp {
                16 => {
                    let [r, g, b] = rdp_16bit_to_rgb(cursor.read_u16());
                    [r, g, b, 0xFF]
                }
                24 => {
                    let bgr = cursor.read_array::<3>();
                    [bgr[2], bgr[1], bgr[0], 0xFF]
                }
                32 => {
                    let bgra = cursor.read_array::<4>();
                    [bgra[2], bgra[1], bgra[0], bgra[3]]
                }
                _ => unreachable!("validated by the caller"),
            },
            ColorStrideReader::Bitmask(bitmask) => {
                if bitmask.next_bit(cursor) == 1 {
                    [0xFF, 0xFF, 0xFF, 0xFF]
                } else {
                    [0, 0, 0, 0xFF]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use autordp_pdu::pointer::Point16;

    use super::*;

    #[test]
    fn color_pointer_decodes_to_rgba() {
        // 2×2 pointer, 24 bpp, bottom-up. Bottom row red then green, top row
        // blue then transparent.
        let xor_mask = [
            0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, // bottom row: red, green (BGR)
            0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, // top row: blue, black
        ];
        // AND mask: one bit per pixel, 16-bit-padded rows. Bottom row 00,
        // top row 01 (second pixel transparent).
        let and_mask = [
            0b0000_0000, 0x00, // bottom row
            0b0100_0000, 0x00, // top row
        ];

        let attribute = ColorPointerAttribute {
            cache_index: 0,
            hot_spot: Point16 { x: 1, y: 1 },
            width: 2,
            height: 2,
            xor_mask: &xor_mask,
            and_mask: &and_mask,
        };

        let decoded = DecodedPointer::decode_color_pointer_attribute(&attribute).unwrap();

        assert_eq!(decoded.width, 2);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.hotspot_x, 1);
        assert_eq!(decoded.hotspot_y, 1);
        assert_eq!(
            decoded.rgba_data,
            [
                0, 0, 254, 255, /* top-left: blue */
                0, 0, 0, 0, /* top-right: transparent */
                254, 0, 0, 255, /* bottom-left: red */
                0, 254, 0, 255, /* bottom-right: green */
            ]
        );
    }

    #[test]
    fn monochrome_pointer_inversion() {
        // 1×1 monochrome pointer: and=1, xor=1 -> inverted pixel.
        let xor_mask = [0b1000_0000, 0x00];
        let and_mask = [0b1000_0000, 0x00];

        let attribute = PointerAttribute {
            xor_bpp: 1,
            color_pointer: ColorPointerAttribute {
                cache_index: 0,
                hot_spot: Point16 { x: 0, y: 0 },
                width: 1,
                height: 1,
                xor_mask: &xor_mask,
                and_mask: &and_mask,
            },
        };

        let decoded = DecodedPointer::decode_pointer_attribute(&attribute).unwrap();
        assert_eq!(decoded.rgba_data, [0xFF, 0xFF, 0xFF, 0x00]);
    }

    #[test]
    fn empty_pointer_is_invisible() {
        let attribute = ColorPointerAttribute {
            cache_index: 0,
            hot_spot: Point16 { x: 0, y: 0 },
            width: 0,
            height: 0,
            xor_mask: &[],
            and_mask: &[],
        };

        let decoded = DecodedPointer::decode_color_pointer_attribute(&attribute).unwrap();
        assert_eq!(decoded.width, 0);
        assert!(decoded.rgba_data.is_empty());
    }
}
