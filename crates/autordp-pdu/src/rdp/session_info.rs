//! Save Session Info PDU ([MS-RDPBCGR] 2.2.10.1). The payload is logged by
//! the session layer; only the info type is interpreted.

use autordp_core::{ensure_fixed_part_size, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InfoType(pub u32);

impl InfoType {
    pub const LOGON: Self = Self(0x0000_0000);
    pub const LOGON_LONG: Self = Self(0x0000_0001);
    pub const PLAIN_NOTIFY: Self = Self(0x0000_0002);
    pub const LOGON_EXTENDED: Self = Self(0x0000_0003);

    pub fn description(self) -> &'static str {
        match self {
            Self::LOGON => "logon info (version 1)",
            Self::LOGON_LONG => "logon info (version 2)",
            Self::PLAIN_NOTIFY => "plain notify",
            Self::LOGON_EXTENDED => "logon info (extended)",
            _ => "unknown session info",
        }
    }
}

/// TS_SAVE_SESSION_INFO_PDU_DATA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSessionInfoPdu {
    pub info_type: InfoType,
    pub info_data: Vec<u8>,
}

impl SaveSessionInfoPdu {
    const NAME: &'static str = "SaveSessionInfoPdu";

    const FIXED_PART_SIZE: usize = 4;
}

impl Encode for SaveSessionInfoPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        autordp_core::ensure_size!(in: dst, size: self.size());

        dst.write_u32(self.info_type.0);
        dst.write_slice(&self.info_data);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.info_data.len()
    }
}

impl<'de> Decode<'de> for SaveSessionInfoPdu {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let info_type = InfoType(src.read_u32());
        let info_data = src.read_remaining().to_vec();

        Ok(Self { info_type, info_data })
    }
}
