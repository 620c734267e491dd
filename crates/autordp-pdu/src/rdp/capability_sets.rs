//! Capability sets and the Demand Active / Confirm Active PDUs carrying them
//! ([MS-RDPBCGR] 2.2.1.13).

mod bitmap;
mod cache;
mod general;
mod input;
mod misc;
mod order;
mod pointer;

pub use self::bitmap::{Bitmap, BitmapDrawingFlags};
pub use self::cache::{BitmapCache, CacheDefinition, CacheEntry, GlyphCache, GlyphSupportLevel, OffscreenBitmapCache,
    BITMAP_CACHE_ENTRIES_NUM, GLYPH_CACHE_NUM};
pub use self::general::{General, GeneralExtraFlags, MajorPlatformType, MinorPlatformType, PROTOCOL_VER};
pub use self::input::{Input, InputFlags};
pub use self::misc::{
    Brush, BrushSupportLevel, Font, FontSupportFlags, MultifragmentUpdate, Sound, SoundFlags, VirtualChannel,
    VirtualChannelFlags,
};
pub use self::order::{Order, OrderFlags, OrderSupportExFlags, OrderSupportIndex};
pub use self::pointer::{LargePointer, LargePointerSupportFlags, Pointer};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use autordp_core::{
    cast_length, decode, ensure_fixed_part_size, ensure_size, invalid_field_err, read_padding, write_padding, Decode,
    DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor,
};

/// The well-known channel id servers use as the `pduSource` of their PDUs.
pub const SERVER_CHANNEL_ID: u16 = 0x03EA;

const SOURCE_DESCRIPTOR_LENGTH_FIELD_SIZE: usize = 2;
const COMBINED_CAPABILITIES_LENGTH_FIELD_SIZE: usize = 2;
const NUMBER_CAPABILITIES_FIELD_SIZE: usize = 2;
const PADDING_SIZE: usize = 2;
const SESSION_ID_FIELD_SIZE: usize = 4;
const CAPABILITY_SET_TYPE_FIELD_SIZE: usize = 2;
const CAPABILITY_SET_LENGTH_FIELD_SIZE: usize = 2;
const CAPABILITY_SET_HEADER_SIZE: usize = CAPABILITY_SET_TYPE_FIELD_SIZE + CAPABILITY_SET_LENGTH_FIELD_SIZE;
const ORIGINATOR_ID_FIELD_SIZE: usize = 2;

/// 2.2.1.13.1 Server Demand Active PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDemandActive {
    pub pdu: DemandActive,
}

impl ServerDemandActive {
    const NAME: &'static str = "ServerDemandActive";
}

impl Encode for ServerDemandActive {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        self.pdu.encode(dst)?;
        dst.write_u32(0); // sessionId, ignored by the client

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        self.pdu.size() + SESSION_ID_FIELD_SIZE
    }
}

impl<'de> Decode<'de> for ServerDemandActive {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let pdu = DemandActive::decode(src)?;

        ensure_size!(in: src, size: SESSION_ID_FIELD_SIZE);
        let _session_id = src.read_u32();

        Ok(Self { pdu })
    }
}

/// 2.2.1.13.2 Client Confirm Active PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfirmActive {
    /// The Microsoft client takes this value from the server's `pduSource`.
    pub originator_id: u16,
    pub pdu: DemandActive,
}

impl ClientConfirmActive {
    const NAME: &'static str = "ClientConfirmActive";

    const FIXED_PART_SIZE: usize = ORIGINATOR_ID_FIELD_SIZE;
}

impl Encode for ClientConfirmActive {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.originator_id);

        self.pdu.encode(dst)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.pdu.size()
    }
}

impl<'de> Decode<'de> for ClientConfirmActive {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let originator_id = src.read_u16();
        let pdu = DemandActive::decode(src)?;

        Ok(Self { originator_id, pdu })
    }
}

/// 2.2.1.13.1.1 Demand Active PDU Data (TS_DEMAND_ACTIVE_PDU)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandActive {
    pub source_descriptor: String,
    pub capability_sets: Vec<CapabilitySet>,
}

impl DemandActive {
    const NAME: &'static str = "DemandActive";

    const FIXED_PART_SIZE: usize = SOURCE_DESCRIPTOR_LENGTH_FIELD_SIZE + COMBINED_CAPABILITIES_LENGTH_FIELD_SIZE;
}

impl Encode for DemandActive {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        let combined_length = self.capability_sets.iter().map(Encode::size).sum::<usize>()
            + NUMBER_CAPABILITIES_FIELD_SIZE
            + PADDING_SIZE;

        dst.write_u16(cast_length!("sourceDescriptorLen", self.source_descriptor.len() + 1)?);
        dst.write_u16(cast_length!("combinedLen", combined_length)?);
        dst.write_slice(self.source_descriptor.as_ref());
        dst.write_u8(0); // null terminator
        dst.write_u16(cast_length!("numberCapabilities", self.capability_sets.len())?);
        write_padding!(dst, 2);

        for capability_set in self.capability_sets.iter() {
            capability_set.encode(dst)?;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
            + self.source_descriptor.len()
            + 1
            + NUMBER_CAPABILITIES_FIELD_SIZE
            + PADDING_SIZE
            + self.capability_sets.iter().map(Encode::size).sum::<usize>()
    }
}

impl<'de> Decode<'de> for DemandActive {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let source_descriptor_length = usize::from(src.read_u16());
        // Combined size of numberCapabilities, pad2Octets and capabilitySets.
        let _combined_capabilities_length = usize::from(src.read_u16());

        ensure_size!(in: src, size: source_descriptor_length);
        let source_descriptor = String::from_utf8_lossy(src.read_slice(source_descriptor_length))
            .trim_end_matches('\u{0}')
            .to_owned();

        ensure_size!(in: src, size: NUMBER_CAPABILITIES_FIELD_SIZE + PADDING_SIZE);
        let capability_sets_count = usize::from(src.read_u16());
        read_padding!(src, 2);

        let mut capability_sets = Vec::with_capacity(capability_sets_count);
        for _ in 0..capability_sets_count {
            capability_sets.push(CapabilitySet::decode(src)?);
        }

        Ok(Self {
            source_descriptor,
            capability_sets,
        })
    }
}

/// A single capability set, keyed by its 2-byte type.
///
/// Sets this client does not interpret survive decode/encode as raw payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilitySet {
    General(General),
    Bitmap(Bitmap),
    Order(Order),
    BitmapCache(BitmapCache),
    Pointer(Pointer),
    Sound(Sound),
    Input(Input),
    Brush(Brush),
    GlyphCache(GlyphCache),
    OffscreenBitmapCache(OffscreenBitmapCache),
    VirtualChannel(VirtualChannel),
    Font(Font),
    MultiFragmentUpdate(MultifragmentUpdate),
    LargePointer(LargePointer),
    Unknown { set_type: u16, data: Vec<u8> },
}

impl CapabilitySet {
    const NAME: &'static str = "CapabilitySet";

    const FIXED_PART_SIZE: usize = CAPABILITY_SET_HEADER_SIZE;

    fn set_type(&self) -> u16 {
        match self {
            CapabilitySet::General(_) => CapabilitySetType::General.to_u16().unwrap(),
            CapabilitySet::Bitmap(_) => CapabilitySetType::Bitmap.to_u16().unwrap(),
            CapabilitySet::Order(_) => CapabilitySetType::Order.to_u16().unwrap(),
            CapabilitySet::BitmapCache(_) => CapabilitySetType::BitmapCache.to_u16().unwrap(),
            CapabilitySet::Pointer(_) => CapabilitySetType::Pointer.to_u16().unwrap(),
            CapabilitySet::Sound(_) => CapabilitySetType::Sound.to_u16().unwrap(),
            CapabilitySet::Input(_) => CapabilitySetType::Input.to_u16().unwrap(),
            CapabilitySet::Brush(_) => CapabilitySetType::Brush.to_u16().unwrap(),
            CapabilitySet::GlyphCache(_) => CapabilitySetType::GlyphCache.to_u16().unwrap(),
            CapabilitySet::OffscreenBitmapCache(_) => CapabilitySetType::OffscreenBitmapCache.to_u16().unwrap(),
            CapabilitySet::VirtualChannel(_) => CapabilitySetType::VirtualChannel.to_u16().unwrap(),
            CapabilitySet::Font(_) => CapabilitySetType::Font.to_u16().unwrap(),
            CapabilitySet::MultiFragmentUpdate(_) => CapabilitySetType::MultiFragmentUpdate.to_u16().unwrap(),
            CapabilitySet::LargePointer(_) => CapabilitySetType::LargePointer.to_u16().unwrap(),
            CapabilitySet::Unknown { set_type, .. } => *set_type,
        }
    }

    fn body_size(&self) -> usize {
        match self {
            CapabilitySet::General(capset) => capset.size(),
            CapabilitySet::Bitmap(capset) => capset.size(),
            CapabilitySet::Order(capset) => capset.size(),
            CapabilitySet::BitmapCache(capset) => capset.size(),
            CapabilitySet::Pointer(capset) => capset.size(),
            CapabilitySet::Sound(capset) => capset.size(),
            CapabilitySet::Input(capset) => capset.size(),
            CapabilitySet::Brush(capset) => capset.size(),
            CapabilitySet::GlyphCache(capset) => capset.size(),
            CapabilitySet::OffscreenBitmapCache(capset) => capset.size(),
            CapabilitySet::VirtualChannel(capset) => capset.size(),
            CapabilitySet::Font(capset) => capset.size(),
            CapabilitySet::MultiFragmentUpdate(capset) => capset.size(),
            CapabilitySet::LargePointer(capset) => capset.size(),
            CapabilitySet::Unknown { data, .. } => data.len(),
        }
    }
}

impl Encode for CapabilitySet {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u16(self.set_type());
        dst.write_u16(cast_length!("lengthCapability", self.body_size() + CAPABILITY_SET_HEADER_SIZE)?);

        match self {
            CapabilitySet::General(capset) => capset.encode(dst),
            CapabilitySet::Bitmap(capset) => capset.encode(dst),
            CapabilitySet::Order(capset) => capset.encode(dst),
            CapabilitySet::BitmapCache(capset) => capset.encode(dst),
            CapabilitySet::Pointer(capset) => capset.encode(dst),
            CapabilitySet::Sound(capset) => capset.encode(dst),
            CapabilitySet::Input(capset) => capset.encode(dst),
            CapabilitySet::Brush(capset) => capset.encode(dst),
            CapabilitySet::GlyphCache(capset) => capset.encode(dst),
            CapabilitySet::OffscreenBitmapCache(capset) => capset.encode(dst),
            CapabilitySet::VirtualChannel(capset) => capset.encode(dst),
            CapabilitySet::Font(capset) => capset.encode(dst),
            CapabilitySet::MultiFragmentUpdate(capset) => capset.encode(dst),
            CapabilitySet::LargePointer(capset) => capset.encode(dst),
            CapabilitySet::Unknown { data, .. } => {
                dst.write_slice(data);
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        CAPABILITY_SET_HEADER_SIZE + self.body_size()
    }
}

impl<'de> Decode<'de> for CapabilitySet {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let set_type = src.read_u16();
        let length = usize::from(src.read_u16());

        if length < CAPABILITY_SET_HEADER_SIZE {
            return Err(invalid_field_err!("lengthCapability", "invalid capability set length"));
        }

        let buffer_length = length - CAPABILITY_SET_HEADER_SIZE;
        ensure_size!(in: src, size: buffer_length);
        let buffer = src.read_slice(buffer_length);

        match CapabilitySetType::from_u16(set_type) {
            Some(CapabilitySetType::General) => Ok(CapabilitySet::General(decode(buffer)?)),
            Some(CapabilitySetType::Bitmap) => Ok(CapabilitySet::Bitmap(decode(buffer)?)),
            Some(CapabilitySetType::Order) => Ok(CapabilitySet::Order(decode(buffer)?)),
            Some(CapabilitySetType::BitmapCache) => Ok(CapabilitySet::BitmapCache(decode(buffer)?)),
            Some(CapabilitySetType::Pointer) => Ok(CapabilitySet::Pointer(decode(buffer)?)),
            Some(CapabilitySetType::Sound) => Ok(CapabilitySet::Sound(decode(buffer)?)),
            Some(CapabilitySetType::Input) => Ok(CapabilitySet::Input(decode(buffer)?)),
            Some(CapabilitySetType::Brush) => Ok(CapabilitySet::Brush(decode(buffer)?)),
            Some(CapabilitySetType::GlyphCache) => Ok(CapabilitySet::GlyphCache(decode(buffer)?)),
            Some(CapabilitySetType::OffscreenBitmapCache) => Ok(CapabilitySet::OffscreenBitmapCache(decode(buffer)?)),
            Some(CapabilitySetType::VirtualChannel) => Ok(CapabilitySet::VirtualChannel(decode(buffer)?)),
            Some(CapabilitySetType::Font) => Ok(CapabilitySet::Font(decode(buffer)?)),
            Some(CapabilitySetType::MultiFragmentUpdate) => Ok(CapabilitySet::MultiFragmentUpdate(decode(buffer)?)),
            Some(CapabilitySetType::LargePointer) => Ok(CapabilitySet::LargePointer(decode(buffer)?)),
            None => Ok(CapabilitySet::Unknown {
                set_type,
                data: buffer.to_vec(),
            }),
        }
    }
}

#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
enum CapabilitySetType {
    General = 0x01,
    Bitmap = 0x02,
    Order = 0x03,
    BitmapCache = 0x04,
    Pointer = 0x08,
    Sound = 0x0C,
    Input = 0x0D,
    Font = 0x0E,
    Brush = 0x0F,
    GlyphCache = 0x10,
    OffscreenBitmapCache = 0x11,
    VirtualChannel = 0x14,
    MultiFragmentUpdate = 0x1A,
    LargePointer = 0x1B,
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;

    fn client_capability_sets() -> Vec<CapabilitySet> {
        vec![
            CapabilitySet::General(General {
                major_platform_type: MajorPlatformType::UNIX,
                minor_platform_type: MinorPlatformType::UNSPECIFIED,
                extra_flags: GeneralExtraFlags::FASTPATH_OUTPUT_SUPPORTED | GeneralExtraFlags::NO_BITMAP_COMPRESSION_HDR,
                refresh_rect_support: false,
                suppress_output_support: false,
            }),
            CapabilitySet::Bitmap(Bitmap {
                pref_bits_per_pix: 24,
                desktop_width: 1920,
                desktop_height: 1080,
                desktop_resize_flag: false,
                drawing_flags: BitmapDrawingFlags::ALLOW_SKIP_ALPHA,
            }),
            CapabilitySet::Order(Order::new(
                OrderFlags::NEGOTIATE_ORDER_SUPPORT | OrderFlags::ZERO_BOUNDS_DELTAS_SUPPORT,
                OrderSupportExFlags::empty(),
                0,
                0,
            )),
            CapabilitySet::BitmapCache(BitmapCache {
                caches: [CacheEntry {
                    entries: 0,
                    max_cell_size: 0,
                }; BITMAP_CACHE_ENTRIES_NUM],
            }),
            CapabilitySet::Pointer(Pointer {
                color_pointer_cache_size: 25,
                pointer_cache_size: 25,
            }),
            CapabilitySet::Input(Input {
                input_flags: InputFlags::SCANCODES | InputFlags::UNICODE | InputFlags::FASTPATH_INPUT_2,
                keyboard_layout: 0,
                keyboard_type: 4,
                keyboard_subtype: 0,
                keyboard_function_key: 12,
                keyboard_ime_filename: String::new(),
            }),
            CapabilitySet::Brush(Brush {
                support_level: BrushSupportLevel::Default,
            }),
            CapabilitySet::GlyphCache(GlyphCache {
                glyph_cache: [CacheDefinition {
                    entries: 0,
                    max_cell_size: 0,
                }; GLYPH_CACHE_NUM],
                frag_cache: CacheDefinition {
                    entries: 0,
                    max_cell_size: 0,
                },
                glyph_support_level: GlyphSupportLevel::None,
            }),
            CapabilitySet::OffscreenBitmapCache(OffscreenBitmapCache {
                is_supported: false,
                cache_size: 0,
                cache_entries: 0,
            }),
            CapabilitySet::VirtualChannel(VirtualChannel {
                flags: VirtualChannelFlags::NO_COMPRESSION,
                chunk_size: Some(0),
            }),
            CapabilitySet::Sound(Sound {
                flags: SoundFlags::empty(),
            }),
            CapabilitySet::Font(Font {
                flags: FontSupportFlags::FONTSUPPORT_FONTLIST,
            }),
            CapabilitySet::LargePointer(LargePointer {
                flags: LargePointerSupportFlags::UP_TO_384X384_PIXELS,
            }),
            CapabilitySet::MultiFragmentUpdate(MultifragmentUpdate { max_request_size: 1024 }),
        ]
    }

    #[test]
    fn confirm_active_round_trip() {
        let pdu = ClientConfirmActive {
            originator_id: SERVER_CHANNEL_ID,
            pdu: DemandActive {
                source_descriptor: String::from("MSTSC"),
                capability_sets: client_capability_sets(),
            },
        };

        let encoded = encode_vec(&pdu).unwrap();
        assert_eq!(encoded.len(), pdu.size());

        let decoded: ClientConfirmActive = decode(&encoded).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn unknown_capability_set_survives_round_trip() {
        let set = CapabilitySet::Unknown {
            set_type: 0x1D,
            data: vec![0x01, 0x02, 0x03],
        };

        let encoded = encode_vec(&set).unwrap();
        assert_eq!(encoded[..4], [0x1D, 0x00, 0x07, 0x00]);

        let decoded: CapabilitySet = decode(&encoded).unwrap();
        assert_eq!(decoded, set);
    }
}
