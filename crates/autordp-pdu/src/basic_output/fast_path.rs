//! Fast-path output framing ([MS-RDPBCGR] 2.2.9.1.2).
//!
//! One fast-path PDU carries a sequence of update PDUs, each with its own
//! `{updateHeader, compression, size}` prefix. Updates may also be fragmented
//! across several fast-path PDUs.

use bit_field::BitField as _;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use autordp_core::{
    cast_length, ensure_fixed_part_size, ensure_size, invalid_field_err, other_err, Decode, DecodeResult, Encode,
    EncodeResult, ReadCursor, WriteCursor,
};

use crate::basic_output::bitmap::BitmapUpdateData;
use crate::basic_output::palette::PaletteUpdateData;
use crate::basic_output::pointer::{
    CachedPointerAttribute, ColorPointerAttribute, LargePointerAttribute, PointerAttribute, PointerPositionAttribute,
    PointerUpdateData,
};
use crate::per;

/// TS_FP_UPDATE_PDU header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastPathHeader {
    /// Length of the data that follows the header.
    pub data_length: usize,
    /// Keep a two-byte length field even when one byte would do, preserving
    /// the layout of a received header on re-encode.
    pub forced_long_length: bool,
}

impl FastPathHeader {
    const NAME: &'static str = "FastPathHeader";

    const FIXED_PART_SIZE: usize = 1;

    pub fn new(data_length: usize) -> Self {
        Self {
            data_length,
            forced_long_length: false,
        }
    }

    fn minimal_size(&self) -> usize {
        let short_total = Self::FIXED_PART_SIZE + 1 + self.data_length;
        let length_field = if short_total > 0x7F { 2 } else { 1 };
        Self::FIXED_PART_SIZE + length_field
    }
}

impl Encode for FastPathHeader {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        let mut header = 0u8;
        header.set_bits(0..2, 0); // action
        dst.write_u8(header);

        let total_length: u16 = cast_length!("length", self.data_length + self.size())?;
        if self.forced_long_length {
            dst.write_u8(0x80 | (total_length >> 8) as u8);
            dst.write_u8(total_length as u8);
        } else {
            per::write_length(dst, total_length);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        if self.forced_long_length {
            Self::FIXED_PART_SIZE + 2
        } else {
            self.minimal_size()
        }
    }
}

impl<'de> Decode<'de> for FastPathHeader {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let header = src.read_u8();
        let flags = header.get_bits(6..8);

        if flags != 0 {
            return Err(invalid_field_err!("flags", "encrypted fast-path output is not supported"));
        }

        let (length, sizeof_length) = per::read_length(src).map_err(|e| other_err!("fpLength", source: e))?;
        if usize::from(length) < sizeof_length + 1 {
            return Err(invalid_field_err!("length", "fast-path length too small"));
        }

        let data_length = usize::from(length) - sizeof_length - 1;
        // Watch out for non-minimal length packing.
        let forced_long_length = per::sizeof_length(length) != sizeof_length;

        Ok(FastPathHeader {
            data_length,
            forced_long_length,
        })
    }
}

/// TS_FP_UPDATE: the per-update prefix inside a fast-path PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastPathUpdatePdu<'a> {
    pub fragmentation: Fragmentation,
    pub update_code: UpdateCode,
    pub data: &'a [u8],
}

impl FastPathUpdatePdu<'_> {
    const NAME: &'static str = "TS_FP_UPDATE";

    const FIXED_PART_SIZE: usize = 1 /* updateHeader */ + 2 /* size */;
}

impl Encode for FastPathUpdatePdu<'_> {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        let mut header = 0u8;
        header.set_bits(0..4, self.update_code.to_u8().unwrap());
        header.set_bits(4..6, self.fragmentation.to_u8().unwrap());

        dst.write_u8(header);
        dst.write_u16(cast_length!("size", self.data.len())?);
        dst.write_slice(self.data);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.data.len()
    }
}

impl<'de> Decode<'de> for FastPathUpdatePdu<'de> {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let header = src.read_u8();

        let update_code = header.get_bits(0..4);
        let update_code = UpdateCode::from_u8(update_code)
            .ok_or_else(|| invalid_field_err!("updateCode", "invalid fast-path update code"))?;

        let fragmentation = header.get_bits(4..6);
        let fragmentation = Fragmentation::from_u8(fragmentation)
            .ok_or_else(|| invalid_field_err!("fragmentation", "invalid fast-path fragmentation"))?;

        let compression = header.get_bits(6..8);
        if compression & 0x02 != 0 {
            // compressionFlags byte present; bulk compression is never
            // advertised by this client.
            ensure_size!(in: src, size: 1);
            let _compression_flags = src.read_u8();
        }

        let data_length = usize::from(src.read_u16());
        ensure_size!(in: src, size: data_length);
        let data = src.read_slice(data_length);

        Ok(Self {
            fragmentation,
            update_code,
            data,
        })
    }
}

/// A fully decoded fast-path update body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastPathUpdate<'a> {
    /// Drawing orders; accepted and ignored.
    Orders(&'a [u8]),
    Bitmap(BitmapUpdateData<'a>),
    Palette(PaletteUpdateData),
    Synchronize,
    Pointer(PointerUpdateData<'a>),
    /// A recognized update code without a decoder (surface commands).
    Unsupported(UpdateCode),
}

impl<'a> FastPathUpdate<'a> {
    const NAME: &'static str = "FastPathUpdate";

    /// Decodes the update body for the given update code.
    pub fn decode_with_code(buffer: &'a [u8], code: UpdateCode) -> DecodeResult<Self> {
        let src = &mut ReadCursor::new(buffer);

        match code {
            UpdateCode::Orders => Ok(Self::Orders(src.read_remaining())),
            UpdateCode::Bitmap => Ok(Self::Bitmap(BitmapUpdateData::decode(src)?)),
            UpdateCode::Palette => Ok(Self::Palette(PaletteUpdateData::decode(src)?)),
            UpdateCode::Synchronize => Ok(Self::Synchronize),
            UpdateCode::HiddenPointer => Ok(Self::Pointer(PointerUpdateData::SetHidden)),
            UpdateCode::DefaultPointer => Ok(Self::Pointer(PointerUpdateData::SetDefault)),
            UpdateCode::PositionPointer => Ok(Self::Pointer(PointerUpdateData::SetPosition(
                PointerPositionAttribute::decode(src)?,
            ))),
            UpdateCode::ColorPointer => Ok(Self::Pointer(PointerUpdateData::Color(ColorPointerAttribute::decode(
                src,
            )?))),
            UpdateCode::CachedPointer => Ok(Self::Pointer(PointerUpdateData::Cached(
                CachedPointerAttribute::decode(src)?,
            ))),
            UpdateCode::NewPointer => Ok(Self::Pointer(PointerUpdateData::New(PointerAttribute::decode(src)?))),
            UpdateCode::LargePointer => Ok(Self::Pointer(PointerUpdateData::Large(LargePointerAttribute::decode(
                src,
            )?))),
            UpdateCode::SurfaceCommands => Ok(Self::Unsupported(code)),
        }
    }

    pub fn as_short_name(&self) -> &'static str {
        match self {
            Self::Orders(_) => "orders",
            Self::Bitmap(_) => "bitmap",
            Self::Palette(_) => "palette",
            Self::Synchronize => "synchronize",
            Self::Pointer(_) => "pointer",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum UpdateCode {
    Orders = 0x0,
    Bitmap = 0x1,
    Palette = 0x2,
    Synchronize = 0x3,
    SurfaceCommands = 0x4,
    HiddenPointer = 0x5,
    DefaultPointer = 0x6,
    PositionPointer = 0x8,
    ColorPointer = 0x9,
    CachedPointer = 0xA,
    NewPointer = 0xB,
    LargePointer = 0xC,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum Fragmentation {
    Single = 0x0,
    Last = 0x1,
    First = 0x2,
    Next = 0x3,
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;

    #[test]
    fn header_round_trip() {
        let header = FastPathHeader::new(125);

        let encoded = encode_vec(&header).unwrap();
        assert_eq!(encoded, [0x00, 0x7F]);

        let decoded: FastPathHeader = decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_long_length_round_trip() {
        let header = FastPathHeader::new(1000);

        let encoded = encode_vec(&header).unwrap();
        assert_eq!(encoded, [0x00, 0x83, 0xEB]);

        let decoded: FastPathHeader = decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn non_minimal_length_is_preserved() {
        // Length 16 packed in the long form.
        let bytes = [0x00, 0x80, 0x10];

        let decoded: FastPathHeader = decode(&bytes).unwrap();
        assert!(decoded.forced_long_length);
        assert_eq!(decoded.data_length, 16 - 3);

        let encoded = encode_vec(&decoded).unwrap();
        assert_eq!(encoded, bytes);
    }

    #[test]
    fn update_pdu_round_trip() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        let pdu = FastPathUpdatePdu {
            fragmentation: Fragmentation::Single,
            update_code: UpdateCode::Bitmap,
            data: &data,
        };

        let encoded = encode_vec(&pdu).unwrap();
        assert_eq!(encoded, [0x01, 0x04, 0x00, 0xDE, 0xAD, 0xBE, 0xEF]);

        let decoded: FastPathUpdatePdu<'_> = decode(&encoded).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn pointer_position_update_decodes() {
        let body = [0x0A, 0x00, 0x14, 0x00];
        let update = FastPathUpdate::decode_with_code(&body, UpdateCode::PositionPointer).unwrap();

        assert_eq!(
            update,
            FastPathUpdate::Pointer(PointerUpdateData::SetPosition(PointerPositionAttribute {
                x: 10,
                y: 20
            }))
        );
    }
}
