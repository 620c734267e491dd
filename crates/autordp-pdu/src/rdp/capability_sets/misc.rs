//! The small fixed-size capability sets: brush, sound, font, virtual channel
//! and multifragment update.

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use autordp_core::{
    ensure_fixed_part_size, invalid_field_err, read_padding, write_padding, Decode, DecodeResult, Encode, EncodeResult,
    ReadCursor, WriteCursor,
};

/// TS_BRUSH_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brush {
    pub support_level: BrushSupportLevel,
}

impl Brush {
    const NAME: &'static str = "Brush";

    const FIXED_PART_SIZE: usize = 4;
}

impl Encode for Brush {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u32(self.support_level.to_u32().unwrap());

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for Brush {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let support_level = BrushSupportLevel::from_u32(src.read_u32())
            .ok_or_else(|| invalid_field_err!("brushSupportLevel", "invalid brush support level"))?;

        Ok(Self { support_level })
    }
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum BrushSupportLevel {
    Default = 0,
    Color8x8 = 1,
    ColorFull = 2,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct SoundFlags: u16 {
        const BEEPS = 1;
    }
}

/// TS_SOUND_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sound {
    pub flags: SoundFlags,
}

impl Sound {
    const NAME: &'static str = "Sound";

    const FIXED_PART_SIZE: usize = 2 /* soundFlags */ + 2 /* pad */;
}

impl Encode for Sound {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.flags.bits());
        write_padding!(dst, 2);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for Sound {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let flags = SoundFlags::from_bits_truncate(src.read_u16());
        read_padding!(src, 2);

        Ok(Self { flags })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct FontSupportFlags: u16 {
        const FONTSUPPORT_FONTLIST = 0x0001;
    }
}

/// TS_FONT_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub flags: FontSupportFlags,
}

impl Font {
    const NAME: &'static str = "Font";

    const FIXED_PART_SIZE: usize = 2 /* fontSupportFlags */ + 2 /* pad */;
}

impl Encode for Font {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.flags.bits());
        write_padding!(dst, 2);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for Font {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        // Both halves are optional in practice.
        let flags = match src.try_read_u16() {
            Ok(bits) => FontSupportFlags::from_bits_truncate(bits),
            Err(_) => FontSupportFlags::empty(),
        };
        if src.len() >= 2 {
            read_padding!(src, 2);
        }

        Ok(Self { flags })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct VirtualChannelFlags: u32 {
        const NO_COMPRESSION = 0;
        const COMPRESSION_SERVER_TO_CLIENT = 1;
        const COMPRESSION_CLIENT_TO_SERVER_8K = 2;
    }
}

/// TS_VIRTUALCHANNEL_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualChannel {
    pub flags: VirtualChannelFlags,
    /// Server-only field; ignored when sent by the client.
    pub chunk_size: Option<u32>,
}

impl VirtualChannel {
    const NAME: &'static str = "VirtualChannel";

    const FIXED_PART_SIZE: usize = 4;
}

impl Encode for VirtualChannel {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u32(self.flags.bits());

        if let Some(chunk_size) = self.chunk_size {
            autordp_core::ensure_size!(in: dst, size: 4);
            dst.write_u32(chunk_size);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.chunk_size.map_or(0, |_| 4)
    }
}

impl<'de> Decode<'de> for VirtualChannel {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let flags = VirtualChannelFlags::from_bits_truncate(src.read_u32());
        let chunk_size = src.try_read_u32().ok();

        Ok(Self { flags, chunk_size })
    }
}

/// TS_MULTIFRAGMENTUPDATE_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultifragmentUpdate {
    pub max_request_size: u32,
}

impl MultifragmentUpdate {
    const NAME: &'static str = "MultifragmentUpdate";

    const FIXED_PART_SIZE: usize = 4;
}

impl Encode for MultifragmentUpdate {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u32(self.max_request_size);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for MultifragmentUpdate {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let max_request_size = src.read_u32();

        Ok(Self { max_request_size })
    }
}
