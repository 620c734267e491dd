//! Connection finalization PDUs ([MS-RDPBCGR] 2.2.1.14 – 2.2.1.22).

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use autordp_core::{
    ensure_fixed_part_size, ensure_size, invalid_field_err, read_padding, write_padding, Decode, DecodeResult, Encode,
    EncodeResult, ReadCursor, WriteCursor,
};

const SYNC_MESSAGE_TYPE: u16 = 1;

/// TS_SYNCHRONIZE_PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchronizePdu {
    pub target_user_id: u16,
}

impl SynchronizePdu {
    const NAME: &'static str = "SynchronizePdu";

    const FIXED_PART_SIZE: usize = 2 /* messageType */ + 2 /* targetUser */;
}

impl Encode for SynchronizePdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(SYNC_MESSAGE_TYPE);
        dst.write_u16(self.target_user_id);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for SynchronizePdu {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let message_type = src.read_u16();
        if message_type != SYNC_MESSAGE_TYPE {
            return Err(invalid_field_err!("messageType", "invalid synchronize message type"));
        }

        let target_user_id = src.read_u16();

        Ok(Self { target_user_id })
    }
}

/// TS_CONTROL_PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPdu {
    pub action: ControlAction,
    pub grant_id: u16,
    pub control_id: u32,
}

impl ControlPdu {
    const NAME: &'static str = "ControlPdu";

    const FIXED_PART_SIZE: usize = 2 /* action */ + 2 /* grantId */ + 4 /* controlId */;
}

impl Encode for ControlPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.action.to_u16().unwrap());
        dst.write_u16(self.grant_id);
        dst.write_u32(self.control_id);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for ControlPdu {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let action = ControlAction::from_u16(src.read_u16())
            .ok_or_else(|| invalid_field_err!("action", "invalid control action"))?;
        let grant_id = src.read_u16();
        let control_id = src.read_u32();

        Ok(Self {
            action,
            grant_id,
            control_id,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ControlAction {
    RequestControl = 1,
    GrantedControl = 2,
    Detach = 3,
    Cooperate = 4,
}

/// TS_FONT_LIST_PDU / TS_FONT_MAP_PDU (same layout)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontPdu {
    pub number: u16,
    pub total_number: u16,
    pub flags: SequenceFlags,
    pub entry_size: u16,
}

impl FontPdu {
    const NAME: &'static str = "FontPdu";

    const FIXED_PART_SIZE: usize = 2 * 4;
}

impl Encode for FontPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.number);
        dst.write_u16(self.total_number);
        dst.write_u16(self.flags.bits());
        dst.write_u16(self.entry_size);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for FontPdu {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let number = src.read_u16();
        let total_number = src.read_u16();
        let flags = SequenceFlags::from_bits_truncate(src.read_u16());
        let entry_size = src.read_u16();

        Ok(Self {
            number,
            total_number,
            flags,
            entry_size,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct SequenceFlags: u16 {
        const FIRST = 0x0001;
        const LAST = 0x0002;
    }
}

const PERSISTENT_KEY_LIST_CACHES: usize = 5;

/// TS_BITMAPCACHE_PERSISTENT_LIST_PDU
///
/// Only the empty form is ever sent: the bitmap cache is advertised with
/// zero entries, so there are no keys to restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentKeyListPdu {
    pub flags: PersistentKeyListFlags,
}

impl PersistentKeyListPdu {
    const NAME: &'static str = "PersistentKeyListPdu";

    const FIXED_PART_SIZE: usize = 2 * PERSISTENT_KEY_LIST_CACHES * 2 + 1 /* bBitMask */ + 1 /* pad2 */ + 2 /* pad3 */;

    pub fn empty() -> Self {
        Self {
            flags: PersistentKeyListFlags::FIRST | PersistentKeyListFlags::LAST,
        }
    }
}

impl Encode for PersistentKeyListPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        for _ in 0..PERSISTENT_KEY_LIST_CACHES {
            dst.write_u16(0); // numEntriesCacheN
        }
        for _ in 0..PERSISTENT_KEY_LIST_CACHES {
            dst.write_u16(0); // totalEntriesCacheN
        }
        dst.write_u8(self.flags.bits());
        write_padding!(dst, 1);
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

impl<'de> Decode<'de> for PersistentKeyListPdu {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let mut entries_in_pdu = 0usize;
        for _ in 0..PERSISTENT_KEY_LIST_CACHES {
            entries_in_pdu += usize::from(src.read_u16());
        }
        read_padding!(src, 2 * PERSISTENT_KEY_LIST_CACHES); // totalEntriesCacheN
        let flags = PersistentKeyListFlags::from_bits_truncate(src.read_u8());
        read_padding!(src, 3);

        // Eight bytes per persisted key follow; skipped since the keys are
        // never inspected on this side.
        ensure_size!(in: src, size: entries_in_pdu * 8);
        src.advance(entries_in_pdu * 8);

        Ok(Self { flags })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct PersistentKeyListFlags: u8 {
        const FIRST = 0x01;
        const LAST = 0x02;
    }
}
