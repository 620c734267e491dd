use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use autordp_core::{
    ensure_fixed_part_size, invalid_field_err, read_padding, write_padding, Decode, DecodeResult, Encode, EncodeResult,
    ReadCursor, WriteCursor,
};

pub const BITMAP_CACHE_ENTRIES_NUM: usize = 3;
pub const GLYPH_CACHE_NUM: usize = 10;

const BITMAP_CACHE_PAD_SIZE: usize = 24;

/// TS_BITMAPCACHE_CAPABILITYSET (revision 1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapCache {
    pub caches: [CacheEntry; BITMAP_CACHE_ENTRIES_NUM],
}

impl BitmapCache {
    const NAME: &'static str = "BitmapCache";

    const FIXED_PART_SIZE: usize = BITMAP_CACHE_PAD_SIZE + BITMAP_CACHE_ENTRIES_NUM * 4;
}

impl Encode for BitmapCache {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        write_padding!(dst, BITMAP_CACHE_PAD_SIZE);

        for cache in self.caches.iter() {
            dst.write_u16(cache.entries);
            dst.write_u16(cache.max_cell_size);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for BitmapCache {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        read_padding!(src, BITMAP_CACHE_PAD_SIZE);

        let mut caches = [CacheEntry {
            entries: 0,
            max_cell_size: 0,
        }; BITMAP_CACHE_ENTRIES_NUM];

        for cache in caches.iter_mut() {
            cache.entries = src.read_u16();
            cache.max_cell_size = src.read_u16();
        }

        Ok(Self { caches })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub entries: u16,
    pub max_cell_size: u16,
}

/// TS_CACHE_DEFINITION
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheDefinition {
    pub entries: u16,
    pub max_cell_size: u16,
}

/// TS_GLYPHCACHE_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphCache {
    pub glyph_cache: [CacheDefinition; GLYPH_CACHE_NUM],
    pub frag_cache: CacheDefinition,
    pub glyph_support_level: GlyphSupportLevel,
}

impl GlyphCache {
    const NAME: &'static str = "GlyphCache";

    const FIXED_PART_SIZE: usize = GLYPH_CACHE_NUM * 4 + 4 /* fragCache */ + 2 /* supportLevel */ + 2 /* pad */;
}

impl Encode for GlyphCache {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        for cache in self.glyph_cache.iter() {
            dst.write_u16(cache.entries);
            dst.write_u16(cache.max_cell_size);
        }
        dst.write_u16(self.frag_cache.entries);
        dst.write_u16(self.frag_cache.max_cell_size);
        dst.write_u16(self.glyph_support_level.to_u16().unwrap());
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

impl<'de> Decode<'de> for GlyphCache {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let mut glyph_cache = [CacheDefinition {
            entries: 0,
            max_cell_size: 0,
        }; GLYPH_CACHE_NUM];

        for cache in glyph_cache.iter_mut() {
            cache.entries = src.read_u16();
            cache.max_cell_size = src.read_u16();
        }

        let frag_cache = CacheDefinition {
            entries: src.read_u16(),
            max_cell_size: src.read_u16(),
        };
        let glyph_support_level = GlyphSupportLevel::from_u16(src.read_u16())
            .ok_or_else(|| invalid_field_err!("glyphSupportLevel", "invalid glyph support level"))?;
        read_padding!(src, 2);

        Ok(Self {
            glyph_cache,
            frag_cache,
            glyph_support_level,
        })
    }
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum GlyphSupportLevel {
    None = 0,
    Partial = 1,
    Full = 2,
    Encode = 3,
}

/// TS_OFFSCREEN_CAPABILITYSET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffscreenBitmapCache {
    pub is_supported: bool,
    pub cache_size: u16,
    pub cache_entries: u16,
}

impl OffscreenBitmapCache {
    const NAME: &'static str = "OffscreenBitmapCache";

    const FIXED_PART_SIZE: usize = 4 /* supportLevel */ + 2 /* cacheSize */ + 2 /* cacheEntries */;
}

impl Encode for OffscreenBitmapCache {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u32(u32::from(self.is_supported));
        dst.write_u16(self.cache_size);
        dst.write_u16(self.cache_entries);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for OffscreenBitmapCache {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let is_supported = src.read_u32() != 0;
        let cache_size = src.read_u16();
        let cache_entries = src.read_u16();

        Ok(Self {
            is_supported,
            cache_size,
            cache_entries,
        })
    }
}
