use bitflags::bitflags;

use autordp_core::{ensure_fixed_part_size, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

/// TS_POINTER_CAPABILITYSET
///
/// A non-zero cache size is what tells the server it may send color pointer
/// updates and refer back to slots with cached-pointer updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    pub color_pointer_cache_size: u16,
    pub pointer_cache_size: u16,
}

impl Pointer {
    const NAME: &'static str = "Pointer";

    const FIXED_PART_SIZE: usize = 2 /* colorPointerFlag */ + 2 /* colorPointerCacheSize */ + 2 /* pointerCacheSize */;
}

impl Encode for Pointer {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(1); // colorPointerFlag, always supported
        dst.write_u16(self.color_pointer_cache_size);
        dst.write_u16(self.pointer_cache_size);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for Pointer {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        // The pointerCacheSize field is optional.
        autordp_core::ensure_size!(in: src, size: 4);

        let _color_pointer_flag = src.read_u16();
        let color_pointer_cache_size = src.read_u16();
        let pointer_cache_size = src.try_read_u16().unwrap_or(0);

        Ok(Self {
            color_pointer_cache_size,
            pointer_cache_size,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct LargePointerSupportFlags: u16 {
        const UP_TO_96X96_PIXELS = 1;
        const UP_TO_384X384_PIXELS = 2;
    }
}

/// TS_LARGE_POINTER_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargePointer {
    pub flags: LargePointerSupportFlags,
}

impl LargePointer {
    const NAME: &'static str = "LargePointer";

    const FIXED_PART_SIZE: usize = 2;
}

impl Encode for LargePointer {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.flags.bits());

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for LargePointer {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let flags = LargePointerSupportFlags::from_bits_truncate(src.read_u16());

        Ok(Self { flags })
    }
}
