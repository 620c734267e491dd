//! Slow-path graphics updates ([MS-RDPBCGR] 2.2.9.1.1.3).
//!
//! These arrive inside `ShareDataPdu::Update`; the inner payload structures
//! are identical to their fast-path counterparts.

use autordp_core::{ensure_size, invalid_field_err, read_padding, Decode, DecodeResult, ReadCursor};

use crate::basic_output::bitmap::BitmapUpdateData;
use crate::basic_output::palette::PaletteUpdateData;

/// TS_UPDATE_HDR dispatch for slow-path graphics updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<'a> {
    /// Drawing orders; accepted and ignored.
    Orders(&'a [u8]),
    Bitmap(BitmapUpdateData<'a>),
    Palette(PaletteUpdateData),
    Synchronize,
}

impl<'de> Decode<'de> for Update<'de> {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_size!(in: src, size: 2);

        // The palette layout carries a single updateType field of its own;
        // bitmap updates duplicate it (TS_UPDATE_BITMAP wraps a complete
        // TS_UPDATE_BITMAP_DATA), so the header is consumed here for every
        // other type.
        let update_type = src.peek_u16();

        if update_type == 0x0002 {
            return Ok(Update::Palette(PaletteUpdateData::decode(src)?));
        }

        src.advance(2);

        // pad2Octets historically follows, but some servers omit it. When the
        // next two bytes are zero they are consumed as padding.
        if src.len() >= 2 && src.peek_u16() == 0 {
            read_padding!(src, 2);
        }

        match update_type {
            0x0000 => Ok(Update::Orders(src.read_remaining())),
            0x0001 => Ok(Update::Bitmap(BitmapUpdateData::decode(src)?)),
            0x0003 => Ok(Update::Synchronize),
            _ => Err(invalid_field_err!("updateType", "unknown slow-path update type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;
    use crate::bitmap::{BitmapData, Compression};
    use crate::geometry::InclusiveRectangle;

    #[test]
    fn slow_path_bitmap_update_decodes() {
        let payload = [0x11; 6];
        let inner = BitmapUpdateData {
            rectangles: vec![BitmapData {
                rectangle: InclusiveRectangle {
                    left: 4,
                    top: 4,
                    right: 5,
                    bottom: 4,
                },
                width: 2,
                height: 1,
                bits_per_pixel: 24,
                compression_flags: Compression::empty(),
                compressed_data_header: None,
                bitmap_data: &payload,
            }],
        };

        // Outer updateType + pad2Octets, then TS_UPDATE_BITMAP_DATA.
        let mut bytes = vec![0x01, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&encode_vec(&inner).unwrap());

        let update: Update<'_> = decode(&bytes).unwrap();
        assert_eq!(update, Update::Bitmap(inner));
    }

    #[test]
    fn slow_path_synchronize_decodes() {
        let bytes = [0x03, 0x00, 0x00, 0x00];
        let update: Update<'_> = decode(&bytes).unwrap();
        assert_eq!(update, Update::Synchronize);
    }

    #[test]
    fn slow_path_palette_has_a_single_header() {
        use crate::palette::{PaletteEntry, PaletteUpdateData};

        // TS_UPDATE_PALETTE: updateType + pad2Octets + numberColors + entries,
        // with no duplicated header.
        let inner = PaletteUpdateData {
            entries: vec![PaletteEntry {
                red: 1,
                green: 2,
                blue: 3,
            }],
        };
        let bytes = encode_vec(&inner).unwrap();

        let update: Update<'_> = decode(&bytes).unwrap();
        assert_eq!(update, Update::Palette(inner));
    }
}
