//! Palette update ([MS-RDPBCGR] 2.2.9.1.1.3.1.1), required to interpret
//! 8 bpp bitmap data.

use autordp_core::{
    cast_length, ensure_fixed_part_size, ensure_size, invalid_field_err, read_padding, write_padding, Decode,
    DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor,
};

const PALETTE_UPDATE_TYPE: u16 = 0x0002;
const MAX_PALETTE_COLORS: usize = 256;

/// TS_PALETTE_ENTRY, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaletteEntry {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// TS_UPDATE_PALETTE_DATA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteUpdateData {
    pub entries: Vec<PaletteEntry>,
}

impl PaletteUpdateData {
    const NAME: &'static str = "TS_UPDATE_PALETTE_DATA";

    const FIXED_PART_SIZE: usize = 2 /* updateType */ + 2 /* pad */ + 4 /* numberColors */;
}

impl Encode for PaletteUpdateData {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u16(PALETTE_UPDATE_TYPE);
        write_padding!(dst, 2);
        dst.write_u32(cast_length!("numberColors", self.entries.len())?);

        for entry in self.entries.iter() {
            dst.write_u8(entry.red);
            dst.write_u8(entry.green);
            dst.write_u8(entry.blue);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.entries.len() * 3
    }
}

impl<'de> Decode<'de> for PaletteUpdateData {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let update_type = src.read_u16();
        if update_type != PALETTE_UPDATE_TYPE {
            return Err(invalid_field_err!("updateType", "invalid palette update type"));
        }

        read_padding!(src, 2);
        let number_colors = src.read_u32() as usize;

        if number_colors > MAX_PALETTE_COLORS {
            return Err(invalid_field_err!("numberColors", "too many palette entries"));
        }

        ensure_size!(in: src, size: number_colors * 3);

        let entries = (0..number_colors)
            .map(|_| PaletteEntry {
                red: src.read_u8(),
                green: src.read_u8(),
                blue: src.read_u8(),
            })
            .collect();

        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;

    #[test]
    fn palette_round_trip() {
        let palette = PaletteUpdateData {
            entries: (0..=255u8)
                .map(|i| PaletteEntry {
                    red: i,
                    green: i.wrapping_mul(2),
                    blue: i.wrapping_mul(3),
                })
                .collect(),
        };

        let encoded = encode_vec(&palette).unwrap();
        assert_eq!(encoded.len(), palette.size());

        let decoded: PaletteUpdateData = decode(&encoded).unwrap();
        assert_eq!(decoded, palette);
    }

    #[test]
    fn oversized_palette_is_rejected(){
        let mut bytes = vec![0x02, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&300u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 900]);

        assert!(decode::<PaletteUpdateData>(&bytes).is_err());
    }
}
