pub mod capability_sets;
pub mod client_info;
pub mod finalization;
pub mod headers;
pub mod server_error_info;
pub mod server_license;
pub mod session_info;

use autordp_core::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

use self::client_info::ClientInfo;
use self::headers::{BasicSecurityHeader, BasicSecurityHeaderFlags};
use autordp_core::invalid_field_err;

/// 2.2.1.11 Client Info PDU: a basic security header followed by the info packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfoPdu {
    pub security_header: BasicSecurityHeader,
    pub client_info: ClientInfo,
}

impl ClientInfoPdu {
    const NAME: &'static str = "ClientInfoPdu";
}

impl Encode for ClientInfoPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        self.security_header.encode(dst)?;
        self.client_info.encode(dst)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        self.security_header.size() + self.client_info.size()
    }
}

impl<'de> Decode<'de> for ClientInfoPdu {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let security_header = BasicSecurityHeader::decode(src)?;

        if !security_header.flags.contains(BasicSecurityHeaderFlags::INFO_PKT) {
            return Err(invalid_field_err(
                Self::NAME,
                "securityHeader",
                "expected INFO_PKT flag",
            ));
        }

        let client_info = ClientInfo::decode(src)?;

        Ok(Self {
            security_header,
            client_info,
        })
    }
}
