//! Pointer updates ([MS-RDPBCGR] 2.2.9.1.1.4, 2.2.9.1.2.1.5 – 2.2.9.1.2.1.11).

use autordp_core::{
    ensure_fixed_part_size, ensure_size, invalid_field_err, read_padding, Decode, DecodeResult, Encode, EncodeResult,
    ReadCursor, WriteCursor,
};

/// TS_POINT16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point16 {
    pub x: u16,
    pub y: u16,
}

impl Point16 {
    const NAME: &'static str = "TS_POINT16";

    const FIXED_PART_SIZE: usize = 2 + 2;
}

impl Encode for Point16 {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.x);
        dst.write_u16(self.y);
        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode<'_> for Point16 {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let x = src.read_u16();
        let y = src.read_u16();

        Ok(Self { x, y })
    }
}

/// TS_POINTERPOSATTRIBUTE has the same layout as TS_POINT16.
pub type PointerPositionAttribute = Point16;

/// TS_COLORPOINTERATTRIBUTE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPointerAttribute<'a> {
    pub cache_index: u16,
    pub hot_spot: Point16,
    pub width: u16,
    pub height: u16,
    pub xor_mask: &'a [u8],
    pub and_mask: &'a [u8],
}

impl ColorPointerAttribute<'_> {
    const NAME: &'static str = "TS_COLORPOINTERATTRIBUTE";

    const FIXED_PART_SIZE: usize = 2 * 5 + Point16::FIXED_PART_SIZE;

    fn check_masks_alignment(and_mask: &[u8], xor_mask: &[u8], pointer_height: u16) -> DecodeResult<()> {
        let check_mask = |mask: &[u8], field: &'static str| {
            if pointer_height == 0 {
                return Err(invalid_field_err(Self::NAME, field, "pointer height cannot be zero"));
            }
            if mask.len() % usize::from(pointer_height) != 0 {
                return Err(invalid_field_err(Self::NAME, field, "pointer mask has incomplete scanlines"));
            }
            if (mask.len() / usize::from(pointer_height)) % 2 != 0 {
                return Err(invalid_field_err(
                    Self::NAME,
                    field,
                    "pointer mask scanlines must be aligned to 16 bits",
                ));
            }
            Ok(())
        };

        check_mask(and_mask, "lengthAndMask")?;
        check_mask(xor_mask, "lengthXorMask")
    }
}

impl Encode for ColorPointerAttribute<'_> {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u16(self.cache_index);
        self.hot_spot.encode(dst)?;
        dst.write_u16(self.width);
        dst.write_u16(self.height);

        dst.write_u16(self.and_mask.len() as u16);
        dst.write_u16(self.xor_mask.len() as u16);
        // The masks are written in reverse order of their length fields;
        // that is how the message is defined.
        dst.write_slice(self.xor_mask);
        dst.write_slice(self.and_mask);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.xor_mask.len() + self.and_mask.len()
    }
}

impl<'a> Decode<'a> for ColorPointerAttribute<'a> {
    fn decode(src: &mut ReadCursor<'a>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let cache_index = src.read_u16();
        let hot_spot = Point16::decode(src)?;
        let width = src.read_u16();
        let height = src.read_u16();
        let length_and_mask = usize::from(src.read_u16());
        let length_xor_mask = usize::from(src.read_u16());

        ensure_size!(in: src, size: length_and_mask + length_xor_mask);

        let xor_mask = src.read_slice(length_xor_mask);
        let and_mask = src.read_slice(length_and_mask);

        Self::check_masks_alignment(and_mask, xor_mask, height)?;

        Ok(Self {
            cache_index,
            hot_spot,
            width,
            height,
            xor_mask,
            and_mask,
        })
    }
}

/// TS_POINTERATTRIBUTE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerAttribute<'a> {
    pub xor_bpp: u16,
    pub color_pointer: ColorPointerAttribute<'a>,
}

impl PointerAttribute<'_> {
    const NAME: &'static str = "TS_POINTERATTRIBUTE";

    const FIXED_PART_SIZE: usize = 2;
}

impl Encode for PointerAttribute<'_> {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u16(self.xor_bpp);
        self.color_pointer.encode(dst)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.color_pointer.size()
    }
}

impl<'a> Decode<'a> for PointerAttribute<'a> {
    fn decode(src: &mut ReadCursor<'a>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let xor_bpp = src.read_u16();
        let color_pointer = ColorPointerAttribute::decode(src)?;

        Ok(Self { xor_bpp, color_pointer })
    }
}

/// TS_CACHEDPOINTERATTRIBUTE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedPointerAttribute {
    pub cache_index: u16,
}

impl CachedPointerAttribute {
    const NAME: &'static str = "TS_CACHEDPOINTERATTRIBUTE";

    const FIXED_PART_SIZE: usize = 2;
}

impl Encode for CachedPointerAttribute {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.cache_index);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode<'_> for CachedPointerAttribute {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let cache_index = src.read_u16();

        Ok(Self { cache_index })
    }
}

/// TS_FP_LARGEPOINTERATTRIBUTE, identical to TS_POINTERATTRIBUTE except for
/// 32-bit mask length fields to fit pointers up to 384×384.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargePointerAttribute<'a> {
    pub xor_bpp: u16,
    pub cache_index: u16,
    pub hot_spot: Point16,
    pub width: u16,
    pub height: u16,
    pub xor_mask: &'a [u8],
    pub and_mask: &'a [u8],
}

impl LargePointerAttribute<'_> {
    const NAME: &'static str = "TS_FP_LARGEPOINTERATTRIBUTE";

    const FIXED_PART_SIZE: usize = 4 * 2 + 2 * 4 + Point16::FIXED_PART_SIZE;
}

impl Encode for LargePointerAttribute<'_> {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u16(self.xor_bpp);
        dst.write_u16(self.cache_index);
        self.hot_spot.encode(dst)?;
        dst.write_u16(self.width);
        dst.write_u16(self.height);

        dst.write_u32(self.and_mask.len() as u32);
        dst.write_u32(self.xor_mask.len() as u32);
        dst.write_slice(self.xor_mask);
        dst.write_slice(self.and_mask);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.xor_mask.len() + self.and_mask.len()
    }
}

impl<'a> Decode<'a> for LargePointerAttribute<'a> {
    fn decode(src: &mut ReadCursor<'a>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let xor_bpp = src.read_u16();
        let cache_index = src.read_u16();
        let hot_spot = Point16::decode(src)?;
        let width = src.read_u16();
        let height = src.read_u16();
        let length_and_mask = src.read_u32() as usize;
        let length_xor_mask = src.read_u32() as usize;

        ensure_size!(in: src, size: length_and_mask + length_xor_mask);

        let xor_mask = src.read_slice(length_xor_mask);
        let and_mask = src.read_slice(length_and_mask);

        ColorPointerAttribute::check_masks_alignment(and_mask, xor_mask, height)?;

        Ok(Self {
            xor_bpp,
            cache_index,
            hot_spot,
            width,
            height,
            xor_mask,
            and_mask,
        })
    }
}

/// A decoded pointer update, fast-path or slow-path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerUpdateData<'a> {
    SetHidden,
    SetDefault,
    SetPosition(PointerPositionAttribute),
    Color(ColorPointerAttribute<'a>),
    Cached(CachedPointerAttribute),
    New(PointerAttribute<'a>),
    Large(LargePointerAttribute<'a>),
}

const SLOW_PATH_POINTER_SYSTEM: u16 = 0x0001;
const SLOW_PATH_POINTER_POSITION: u16 = 0x0003;
const SLOW_PATH_POINTER_COLOR: u16 = 0x0006;
const SLOW_PATH_POINTER_CACHED: u16 = 0x0007;
const SLOW_PATH_POINTER_NEW: u16 = 0x0008;
const SLOW_PATH_POINTER_LARGE: u16 = 0x0009;

const SYSTEM_POINTER_NULL: u32 = 0x0000_0000;
const SYSTEM_POINTER_DEFAULT: u32 = 0x0000_7F00;

/// Decodes a slow-path pointer update: `messageType(u16)` + `pad2Octets(u16)`
/// followed by the type-specific body ([MS-RDPBCGR] 2.2.9.1.1.4).
pub fn decode_slow_path_pointer<'a>(src: &mut ReadCursor<'a>) -> DecodeResult<PointerUpdateData<'a>> {
    ensure_size!(in: src, size: 4);
    let message_type = src.read_u16();
    read_padding!(src, 2);

    match message_type {
        SLOW_PATH_POINTER_SYSTEM => {
            ensure_size!(in: src, size: 4);
            match src.read_u32() {
                SYSTEM_POINTER_NULL => Ok(PointerUpdateData::SetHidden),
                SYSTEM_POINTER_DEFAULT => Ok(PointerUpdateData::SetDefault),
                _ => Err(invalid_field_err!("systemPointerType", "unknown system pointer type")),
            }
        }
        SLOW_PATH_POINTER_POSITION => Ok(PointerUpdateData::SetPosition(PointerPositionAttribute::decode(src)?)),
        SLOW_PATH_POINTER_COLOR => Ok(PointerUpdateData::Color(ColorPointerAttribute::decode(src)?)),
        SLOW_PATH_POINTER_CACHED => Ok(PointerUpdateData::Cached(CachedPointerAttribute::decode(src)?)),
        SLOW_PATH_POINTER_NEW => Ok(PointerUpdateData::New(PointerAttribute::decode(src)?)),
        SLOW_PATH_POINTER_LARGE => Ok(PointerUpdateData::Large(LargePointerAttribute::decode(src)?)),
        _ => Err(invalid_field_err!("messageType", "unknown slow-path pointer message type")),
    }
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;

    #[test]
    fn color_pointer_round_trip() {
        // 16×16 pointer: AND mask 2 bytes per row, XOR 24bpp 48 bytes per row.
        let and_mask = vec![0u8; 2 * 16];
        let xor_mask = vec![0u8; 48 * 16];

        let attribute = ColorPointerAttribute {
            cache_index: 3,
            hot_spot: Point16 { x: 1, y: 2 },
            width: 16,
            height: 16,
            xor_mask: &xor_mask,
            and_mask: &and_mask,
        };

        let encoded = encode_vec(&attribute).unwrap();
        assert_eq!(encoded.len(), attribute.size());

        let decoded: ColorPointerAttribute<'_> = decode(&encoded).unwrap();
        assert_eq!(decoded, attribute);
    }

    #[test]
    fn slow_path_system_pointer_decodes() {
        let hidden = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut src = ReadCursor::new(&hidden);
        assert_eq!(decode_slow_path_pointer(&mut src).unwrap(), PointerUpdateData::SetHidden);

        let default = [0x01, 0x00, 0x00, 0x00, 0x00, 0x7F, 0x00, 0x00];
        let mut src = ReadCursor::new(&default);
        assert_eq!(decode_slow_path_pointer(&mut src).unwrap(), PointerUpdateData::SetDefault);
    }

    #[test]
    fn slow_path_position_decodes() {
        let bytes = [0x03, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x14, 0x00];
        let mut src = ReadCursor::new(&bytes);
        assert_eq!(
            decode_slow_path_pointer(&mut src).unwrap(),
            PointerUpdateData::SetPosition(Point16 { x: 10, y: 20 })
        );
    }
}
