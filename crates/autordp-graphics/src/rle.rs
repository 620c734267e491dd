//! Interleaved Run-Length Encoding (RLE) bitmap codec
//! ([MS-RDPBCGR] 2.2.9.1.1.3.1.2.4 and the decompression pseudo-code in
//! 3.1.9).
//!
//! The stream is a sequence of orders. Background runs copy the pixel from
//! the scanline above (black on the first line); a background run directly
//! following another background run first emits one pixel XOR-ed with the
//! current foreground color. Foreground runs and fg/bg images XOR the
//! foreground color into the previous scanline.

use core::fmt;
use core::ops::BitXor;

use autordp_core::{ReadCursor, WriteCursor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RlePixelFormat {
    Rgb24,
    Rgb16,
    Rgb15,
    Rgb8,
}

impl RlePixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgb16 | Self::Rgb15 => 2,
            Self::Rgb8 => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RleError {
    InvalidBpp { bpp: usize },
    BadOrderCode { code: u8 },
    UnexpectedZeroLength,
    NotEnoughBytes { expected: usize, actual: usize },
    OutputOverrun { maximum_additional: usize, required_additional: usize },
    OutputUnderrun { written: usize, expected: usize },
    EmptyImage,
}

impl fmt::Display for RleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RleError::InvalidBpp { bpp } => write!(f, "invalid bits per pixel: {bpp}"),
            RleError::BadOrderCode { code } => write!(f, "bad RLE order code: 0x{code:02X}"),
            RleError::UnexpectedZeroLength => write!(f, "unexpected zero-length RLE order"),
            RleError::NotEnoughBytes { expected, actual } => {
                write!(f, "not enough bytes: expected {expected} bytes, but got {actual}")
            }
            RleError::OutputOverrun {
                maximum_additional,
                required_additional,
            } => write!(
                f,
                "order runs past the advertised image size: output can receive at most {maximum_additional} additional bytes, but {required_additional} are required"
            ),
            RleError::OutputUnderrun { written, expected } => {
                write!(f, "compressed stream ended early: {written} of {expected} bytes decoded")
            }
            RleError::EmptyImage => write!(f, "height or width is zero"),
        }
    }
}

impl std::error::Error for RleError {}

/// Decompresses an RLE compressed bitmap into `dst`, in the native pixel
/// depth of the stream.
///
/// `dst` is resized to `width * height` pixels; rows are produced bottom-up
/// like the wire format.
pub fn decompress(
    src: &[u8],
    dst: &mut Vec<u8>,
    width: usize,
    height: usize,
    bpp: usize,
) -> Result<RlePixelFormat, RleError> {
    match bpp {
        24 => decompress_as::<Depth24>(src, dst, width, height),
        16 => decompress_as::<Depth16>(src, dst, width, height),
        15 => decompress_as::<Depth15>(src, dst, width, height),
        8 => decompress_as::<Depth8>(src, dst, width, height),
        invalid => Err(RleError::InvalidBpp { bpp: invalid }),
    }
}

fn decompress_as<D: Depth>(src: &[u8], dst: &mut Vec<u8>, width: usize, height: usize) -> Result<RlePixelFormat, RleError> {
    if width == 0 || height == 0 {
        return Err(RleError::EmptyImage);
    }

    let row_delta = D::BYTES_PER_PIXEL * width;
    dst.clear();
    dst.resize(row_delta * height, 0);
    decompress_impl::<D>(src, dst, row_delta)?;

    Ok(D::FORMAT)
}

macro_rules! ensure_bytes {
    (from: $src:ident, size: $expected:expr) => {{
        let actual = $src.len();
        let expected = $expected;
        if expected > actual {
            return Err(RleError::NotEnoughBytes { expected, actual });
        }
    }};
    (into: $dst:ident, size: $required_additional:expr) => {{
        let maximum_additional = $dst.len();
        let required_additional = $required_additional;
        if required_additional > maximum_additional {
            return Err(RleError::OutputOverrun {
                maximum_additional,
                required_additional,
            });
        }
    }};
}

fn decompress_impl<D: Depth>(src: &[u8], dst: &mut [u8], row_delta: usize) -> Result<(), RleError> {
    let expected = dst.len();
    let mut src = ReadCursor::new(src);
    let mut dst = WriteCursor::new(dst);

    let mut fg = D::WHITE;
    let mut insert_fg_pel = false;
    let mut first_line = true;

    while !src.eof() {
        // Watch out for the end of the first scanline.
        if first_line && dst.pos() >= row_delta {
            first_line = false;
            insert_fg_pel = false;
        }

        ensure_bytes!(from: src, size: 1);
        let header = src.read_u8();
        let order = Order::classify(header)?;
        let run_length = order.run_length(header, &mut src)?;

        match order.kind {
            OrderKind::BgRun => {
                ensure_bytes!(into: dst, size: run_length * D::BYTES_PER_PIXEL);

                let remaining = if insert_fg_pel {
                    let pixel = if first_line {
                        fg
                    } else {
                        D::pixel_above(&dst, row_delta) ^ fg
                    };
                    D::write_pixel(&mut dst, pixel);
                    run_length - 1
                } else {
                    run_length
                };

                if first_line {
                    for _ in 0..remaining {
                        D::write_pixel(&mut dst, D::BLACK);
                    }
                } else {
                    for _ in 0..remaining {
                        let above = D::pixel_above(&dst, row_delta);
                        D::write_pixel(&mut dst, above);
                    }
                }

                // A follow-on background run needs a foreground pel inserted.
                insert_fg_pel = true;
                continue;
            }
            OrderKind::FgRun { set_fg } => {
                if set_fg {
                    ensure_bytes!(from: src, size: D::BYTES_PER_PIXEL);
                    fg = D::read_pixel(&mut src);
                }

                ensure_bytes!(into: dst, size: run_length * D::BYTES_PER_PIXEL);

                if first_line {
                    for _ in 0..run_length {
                        D::write_pixel(&mut dst, fg);
                    }
                } else {
                    for _ in 0..run_length {
                        let above = D::pixel_above(&dst, row_delta);
                        D::write_pixel(&mut dst, above ^ fg);
                    }
                }
            }
            OrderKind::DitheredRun => {
                ensure_bytes!(from: src, size: 2 * D::BYTES_PER_PIXEL);
                let pixel_a = D::read_pixel(&mut src);
                let pixel_b = D::read_pixel(&mut src);

                ensure_bytes!(into: dst, size: run_length * 2 * D::BYTES_PER_PIXEL);

                for _ in 0..run_length {
                    D::write_pixel(&mut dst, pixel_a);
                    D::write_pixel(&mut dst, pixel_b);
                }
            }
            OrderKind::ColorRun => {
                ensure_bytes!(from: src, size: D::BYTES_PER_PIXEL);
                let pixel = D::read_pixel(&mut src);

                ensure_bytes!(into: dst, size: run_length * D::BYTES_PER_PIXEL);

                for _ in 0..run_length {
                    D::write_pixel(&mut dst, pixel);
                }
            }
            OrderKind::FgBgImage { set_fg } => {
                if set_fg {
                    ensure_bytes!(from: src, size: D::BYTES_PER_PIXEL);
                    fg = D::read_pixel(&mut src);
                }

                let mut remaining = run_length;
                while remaining > 0 {
                    let bit_count = remaining.min(8);

                    ensure_bytes!(from: src, size: 1);
                    let bitmask = src.read_u8();

                    write_fg_bg_bits::<D>(&mut dst, row_delta, first_line, bitmask, fg, bit_count)?;

                    remaining -= bit_count;
                }
            }
            OrderKind::ColorImage => {
                let byte_count = run_length * D::BYTES_PER_PIXEL;

                ensure_bytes!(from: src, size: byte_count);
                ensure_bytes!(into: dst, size: byte_count);

                dst.write_slice(src.read_slice(byte_count));
            }
            OrderKind::SpecialFgBg1 => {
                write_fg_bg_bits::<D>(&mut dst, row_delta, first_line, 0x03, fg, 8)?;
            }
            OrderKind::SpecialFgBg2 => {
                write_fg_bg_bits::<D>(&mut dst, row_delta, first_line, 0x05, fg, 8)?;
            }
            OrderKind::White => {
                ensure_bytes!(into: dst, size: D::BYTES_PER_PIXEL);
                D::write_pixel(&mut dst, D::WHITE);
            }
            OrderKind::Black => {
                ensure_bytes!(into: dst, size: D::BYTES_PER_PIXEL);
                D::write_pixel(&mut dst, D::BLACK);
            }
        }

        // Only a background run directly after another background run gets a
        // foreground pel inserted.
        insert_fg_pel = false;
    }

    if !dst.is_empty() {
        return Err(RleError::OutputUnderrun {
            written: dst.pos(),
            expected,
        });
    }

    Ok(())
}

fn write_fg_bg_bits<D: Depth>(
    dst: &mut WriteCursor<'_>,
    row_delta: usize,
    first_line: bool,
    bitmask: u8,
    fg: D::Pixel,
    bit_count: usize,
) -> Result<(), RleError> {
    ensure_bytes!(into: dst, size: bit_count * D::BYTES_PER_PIXEL);

    let mut mask = 0x01;

    for _ in 0..bit_count {
        let pixel = if first_line {
            if bitmask & mask != 0 {
                fg
            } else {
                D::BLACK
            }
        } else {
            let above = D::pixel_above(dst, row_delta);
            if bitmask & mask != 0 {
                above ^ fg
            } else {
                above
            }
        };

        D::write_pixel(dst, pixel);
        mask <<= 1;
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OrderKind {
    BgRun,
    FgRun { set_fg: bool },
    DitheredRun,
    ColorRun,
    FgBgImage { set_fg: bool },
    ColorImage,
    SpecialFgBg1,
    SpecialFgBg2,
    White,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LengthForm {
    /// Low 5 bits; zero selects an 8-bit supplement + 32.
    Regular,
    /// Low 5 bits times eight; zero selects an 8-bit supplement + 1.
    RegularFgBg,
    /// Low 4 bits; zero selects an 8-bit supplement + 16.
    Lite,
    /// Low 4 bits times eight; zero selects an 8-bit supplement + 1.
    LiteFgBg,
    /// 16-bit supplement; zero is malformed.
    MegaMega,
    /// No run length field.
    None,
}

#[derive(Clone, Copy, Debug)]
struct Order {
    kind: OrderKind,
    length_form: LengthForm,
}

impl Order {
    fn classify(header: u8) -> Result<Self, RleError> {
        let order = if (header & 0xC0) != 0xC0 {
            // Regular orders (0b000x_xxxx .. 0b100x_xxxx).
            match header >> 5 {
                0x00 => Self {
                    kind: OrderKind::BgRun,
                    length_form: LengthForm::Regular,
                },
                0x01 => Self {
                    kind: OrderKind::FgRun { set_fg: false },
                    length_form: LengthForm::Regular,
                },
                0x02 => Self {
                    kind: OrderKind::FgBgImage { set_fg: false },
                    length_form: LengthForm::RegularFgBg,
                },
                0x03 => Self {
                    kind: OrderKind::ColorRun,
                    length_form: LengthForm::Regular,
                },
                0x04 => Self {
                    kind: OrderKind::ColorImage,
                    length_form: LengthForm::Regular,
                },
                _ => return Err(RleError::BadOrderCode { code: header }),
            }
        } else if (header & 0xF0) == 0xF0 {
            // MEGA_MEGA and single-byte orders.
            match header {
                0xF0 => Self {
                    kind: OrderKind::BgRun,
                    length_form: LengthForm::MegaMega,
                },
                0xF1 => Self {
                    kind: OrderKind::FgRun { set_fg: false },
                    length_form: LengthForm::MegaMega,
                },
                0xF2 => Self {
                    kind: OrderKind::FgBgImage { set_fg: false },
                    length_form: LengthForm::MegaMega,
                },
                0xF3 => Self {
                    kind: OrderKind::ColorRun,
                    length_form: LengthForm::MegaMega,
                },
                0xF4 => Self {
                    kind: OrderKind::ColorImage,
                    length_form: LengthForm::MegaMega,
                },
                0xF6 => Self {
                    kind: OrderKind::FgRun { set_fg: true },
                    length_form: LengthForm::MegaMega,
                },
                0xF7 => Self {
                    kind: OrderKind::FgBgImage { set_fg: true },
                    length_form: LengthForm::MegaMega,
                },
                0xF8 => Self {
                    kind: OrderKind::DitheredRun,
                    length_form: LengthForm::MegaMega,
                },
                0xF9 => Self {
                    kind: OrderKind::SpecialFgBg1,
                    length_form: LengthForm::None,
                },
                0xFA => Self {
                    kind: OrderKind::SpecialFgBg2,
                    length_form: LengthForm::None,
                },
                0xFD => Self {
                    kind: OrderKind::White,
                    length_form: LengthForm::None,
                },
                0xFE => Self {
                    kind: OrderKind::Black,
                    length_form: LengthForm::None,
                },
                _ => return Err(RleError::BadOrderCode { code: header }),
            }
        } else {
            // Lite orders (0b1100_xxxx .. 0b1110_xxxx).
            match header >> 4 {
                0x0C => Self {
                    kind: OrderKind::FgRun { set_fg: true },
                    length_form: LengthForm::Lite,
                },
                0x0D => Self {
                    kind: OrderKind::FgBgImage { set_fg: true },
                    length_form: LengthForm::LiteFgBg,
                },
                0x0E => Self {
                    kind: OrderKind::DitheredRun,
                    length_form: LengthForm::Lite,
                },
                _ => return Err(RleError::BadOrderCode { code: header }),
            }
        };

        Ok(order)
    }

    fn run_length(&self, header: u8, src: &mut ReadCursor<'_>) -> Result<usize, RleError> {
        match self.length_form {
            LengthForm::Regular => match header & 0x1F {
                0 => {
                    ensure_bytes!(from: src, size: 1);
                    Ok(usize::from(src.read_u8()) + 32)
                }
                run_length => Ok(usize::from(run_length)),
            },
            LengthForm::RegularFgBg => match header & 0x1F {
                0 => {
                    ensure_bytes!(from: src, size: 1);
                    Ok(usize::from(src.read_u8()) + 1)
                }
                run_length => Ok(usize::from(run_length) * 8),
            },
            LengthForm::Lite => match header & 0x0F {
                0 => {
                    ensure_bytes!(from: src, size: 1);
                    Ok(usize::from(src.read_u8()) + 16)
                }
                run_length => Ok(usize::from(run_length)),
            },
            LengthForm::LiteFgBg => match header & 0x0F {
                0 => {
                    ensure_bytes!(from: src, size: 1);
                    Ok(usize::from(src.read_u8()) + 1)
                }
                run_length => Ok(usize::from(run_length) * 8),
            },
            LengthForm::MegaMega => {
                ensure_bytes!(from: src, size: 2);
                let run_length = usize::from(src.read_u16());

                if run_length == 0 {
                    Err(RleError::UnexpectedZeroLength)
                } else {
                    Ok(run_length)
                }
            }
            LengthForm::None => Ok(0),
        }
    }
}

trait Depth {
    type Pixel: Copy + BitXor<Output = Self::Pixel>;

    const BYTES_PER_PIXEL: usize;
    const FORMAT: RlePixelFormat;
    const BLACK: Self::Pixel;
    const WHITE: Self::Pixel;

    fn read_pixel(src: &mut ReadCursor<'_>) -> Self::Pixel;

    fn write_pixel(dst: &mut WriteCursor<'_>, pixel: Self::Pixel);

    /// The already-written pixel one scanline above the write position.
    fn pixel_above(dst: &WriteCursor<'_>, row_delta: usize) -> Self::Pixel {
        Self::pixel_at(dst.inner(), dst.pos() - row_delta)
    }

    fn pixel_at(buf: &[u8], pos: usize) -> Self::Pixel;
}

struct Depth8;

impl Depth for Depth8 {
    type Pixel = u8;

    const BYTES_PER_PIXEL: usize = 1;
    const FORMAT: RlePixelFormat = RlePixelFormat::Rgb8;
    const BLACK: Self::Pixel = 0x00;
    const WHITE: Self::Pixel = 0xFF;

    fn read_pixel(src: &mut ReadCursor<'_>) -> Self::Pixel {
        src.read_u8()
    }

    fn write_pixel(dst: &mut WriteCursor<'_>, pixel: Self::Pixel) {
        dst.write_u8(pixel);
    }

    fn pixel_at(buf: &[u8], pos: usize) -> Self::Pixel {
        buf[pos]
    }
}

struct Depth15;

impl Depth for Depth15 {
    type Pixel = u16;

    const BYTES_PER_PIXEL: usize = 2;
    const FORMAT: RlePixelFormat = RlePixelFormat::Rgb15;
    const BLACK: Self::Pixel = 0x0000;
    // Five bits per component.
    const WHITE: Self::Pixel = 0x7FFF;

    fn read_pixel(src: &mut ReadCursor<'_>) -> Self::Pixel {
        src.read_u16()
    }

    fn write_pixel(dst: &mut WriteCursor<'_>, pixel: Self::Pixel) {
        dst.write_u16(pixel);
    }

    fn pixel_at(buf: &[u8], pos: usize) -> Self::Pixel {
        u16::from_le_bytes([buf[pos], buf[pos + 1]])
    }
}

struct Depth16;

impl Depth for Depth16 {
    type Pixel = u16;

    const BYTES_PER_PIXEL: usize = 2;
    const FORMAT: RlePixelFormat = RlePixelFormat::Rgb16;
    const BLACK: Self::Pixel = 0x0000;
    const WHITE: Self::Pixel = 0xFFFF;

    fn read_pixel(src: &mut ReadCursor<'_>) -> Self::Pixel {
        src.read_u16()
    }

    fn write_pixel(dst: &mut WriteCursor<'_>, pixel: Self::Pixel) {
        dst.write_u16(pixel);
    }

    fn pixel_at(buf: &[u8], pos: usize) -> Self::Pixel {
        u16::from_le_bytes([buf[pos], buf[pos + 1]])
    }
}

struct Depth24;

impl Depth for Depth24 {
    type Pixel = u32;

    const BYTES_PER_PIXEL: usize = 3;
    const FORMAT: RlePixelFormat = RlePixelFormat::Rgb24;
    const BLACK: Self::Pixel = 0x00_0000;
    const WHITE: Self::Pixel = 0xFF_FFFF;

    fn read_pixel(src: &mut ReadCursor<'_>) -> Self::Pixel {
        let bytes = src.read_array::<3>();
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0])
    }

    fn write_pixel(dst: &mut WriteCursor<'_>, pixel: Self::Pixel) {
        dst.write_slice(&pixel.to_le_bytes()[..3]);
    }

    fn pixel_at(buf: &[u8], pos: usize) -> Self::Pixel {
        u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], 0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_then_color_run_on_first_line() {
        // Six background pixels (black on the first line) followed by six
        // literal gray pixels, at 24 bpp.
        let compressed = [0x06, 0x66, 0xF0, 0xF0, 0xF0];

        let mut output = Vec::new();
        let format = decompress(&compressed, &mut output, 12, 1, 24).unwrap();

        assert_eq!(format, RlePixelFormat::Rgb24);

        let mut expected = vec![0u8; 18];
        expected.extend_from_slice(&[0xF0; 18]);
        assert_eq!(output, expected);
    }

    #[test]
    fn consecutive_background_runs_insert_foreground_pel() {
        // Line 1: 4 literal pixels. Line 2: BG_RUN(2), BG_RUN(2): the second
        // run starts with above ^ fg (fg defaults to white).
        let compressed = [
            0x84, 0x01, 0x02, 0x03, 0x04, // COLOR_IMAGE, 4 pixels
            0x02, // BG_RUN 2
            0x02, // BG_RUN 2 (fg pel inserted)
        ];

        let mut output = Vec::new();
        decompress(&compressed, &mut output, 4, 2, 8).unwrap();

        assert_eq!(output, [0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03 ^ 0xFF, 0x04]);
    }

    #[test]
    fn fg_run_xors_previous_line() {
        let compressed = [
            0x84, 0x10, 0x20, 0x30, 0x40, // COLOR_IMAGE, 4 pixels
            0xC4, 0x0F, // LITE_SET_FG_FG_RUN, length 4, fg = 0x0F
        ];

        let mut output = Vec::new();
        decompress(&compressed, &mut output, 4, 2, 8).unwrap();

        assert_eq!(output, [0x10, 0x20, 0x30, 0x40, 0x1F, 0x2F, 0x3F, 0x4F]);
    }

    #[test]
    fn fgbg_image_uses_bitmask() {
        let compressed = [
            0x84, 0xAA, 0xAA, 0xAA, 0xAA, // COLOR_IMAGE, 4 pixels
            0xD1, 0x55, 0x05, // LITE_SET_FG_FGBG, 1 * 8 -> clipped by dst, fg = 0x55, mask = 0x05
        ];

        let mut output = Vec::new();
        let result = decompress(&compressed, &mut output, 4, 2, 8);

        // The mask describes 8 pixels but only 4 fit on the line.
        assert!(matches!(result, Err(RleError::OutputOverrun { .. })));
    }

    #[test]
    fn fgbg_image_exact_width() {
        let compressed = [
            0x84, 0xAA, 0xAA, 0xAA, 0xAA, // COLOR_IMAGE, 4 pixels
            0x84, 0xBB, 0xBB, 0xBB, 0xBB, // COLOR_IMAGE, 4 pixels
            0xD0, 0x07, 0x55, 0x05, // LITE_SET_FG_FGBG, supplement 7 + 1 = 8 bits, fg = 0x55, mask = 0x05
        ];

        let mut output = Vec::new();
        decompress(&compressed, &mut output, 8, 2, 8).unwrap();

        assert_eq!(
            output,
            [
                0xAA, 0xAA, 0xAA, 0xAA, 0xBB, 0xBB, 0xBB, 0xBB, //
                0xAA ^ 0x55, 0xAA, 0xAA ^ 0x55, 0xAA, 0xBB, 0xBB, 0xBB, 0xBB,
            ]
        );
    }

    #[test]
    fn white_and_black_orders() {
        let compressed = [0xFD, 0xFE, 0xFD, 0xFE];

        let mut output = Vec::new();
        decompress(&compressed, &mut output, 4, 1, 16).unwrap();

        assert_eq!(output, [0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn mega_mega_run_length() {
        // MEGA_MEGA color run: 300 pixels of 0x42.
        let compressed = [0xF3, 0x2C, 0x01, 0x42];

        let mut output = Vec::new();
        decompress(&compressed, &mut output, 300, 1, 8).unwrap();

        assert_eq!(output, vec![0x42; 300]);
    }

    #[test]
    fn zero_mega_mega_length_is_rejected() {
        let compressed = [0xF3, 0x00, 0x00, 0x42];

        let mut output = Vec::new();
        let result = decompress(&compressed, &mut output, 4, 1, 8);
        assert_eq!(result, Err(RleError::UnexpectedZeroLength));
    }

    #[test]
    fn truncated_stream_is_reported() {
        // Fills only half of the advertised image.
        let compressed = [0x82, 0x01, 0x02];

        let mut output = Vec::new();
        let result = decompress(&compressed, &mut output, 2, 2, 8);
        assert_eq!(
            result,
            Err(RleError::OutputUnderrun {
                written: 2,
                expected: 4
            })
        );
    }

    #[test]
    fn unknown_bpp_is_rejected() {
        let mut output = Vec::new();
        assert_eq!(
            decompress(&[0x00], &mut output, 1, 1, 32),
            Err(RleError::InvalidBpp { bpp: 32 })
        );
    }

    #[test]
    fn dithered_run_alternates_colors() {
        // Line 1: literal; line 2: LITE_DITHERED_RUN length 2 -> 4 pixels.
        let compressed = [
            0x84, 0x00, 0x00, 0x00, 0x00, // COLOR_IMAGE, 4 pixels
            0xE2, 0x11, 0x22, // dithered run, 2 pairs
        ];

        let mut output = Vec::new();
        decompress(&compressed, &mut output, 4, 2, 8).unwrap();

        assert_eq!(output, [0x00, 0x00, 0x00, 0x00, 0x11, 0x22, 0x11, 0x22]);
    }
}
