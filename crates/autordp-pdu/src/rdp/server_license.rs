//! The licensing PDUs exchanged on the I/O channel right after the Client
//! Info PDU ([MS-RDPBCGR] 2.2.1.12, [MS-RDPELE]).
//!
//! With network level authentication the server terminates the sequence
//! immediately with a licensing error message carrying `STATUS_VALID_CLIENT`;
//! the full MS-RDPELE license upgrade machinery has no counterpart here, so
//! other message types are surfaced with their type byte for the caller to
//! reject.

use autordp_core::{
    cast_length, ensure_size, invalid_field_err, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor,
};

use crate::rdp::headers::{BasicSecurityHeader, BasicSecurityHeaderFlags};

const PREAMBLE_SIZE: usize = 4;
const PREAMBLE_VERSION_3: u8 = 0x03;

const ERROR_ALERT_MSG_TYPE: u8 = 0xFF;

const BLOB_TYPE_ERROR: u16 = 0x0004;

/// wErrorCode of a licensing error message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LicenseErrorCode(pub u32);

impl LicenseErrorCode {
    pub const INVALID_SERVER_CERTIFICATE: Self = Self(0x0000_0001);
    pub const NO_LICENSE: Self = Self(0x0000_0002);
    pub const INVALID_MAC: Self = Self(0x0000_0003);
    pub const INVALID_SCOPE: Self = Self(0x0000_0004);
    pub const NO_LICENSE_SERVER: Self = Self(0x0000_0006);
    pub const STATUS_VALID_CLIENT: Self = Self(0x0000_0007);
    pub const INVALID_CLIENT: Self = Self(0x0000_0008);
    pub const INVALID_PRODUCT_ID: Self = Self(0x0000_000B);
    pub const INVALID_MESSAGE_LEN: Self = Self(0x0000_000C);

    pub fn description(self) -> &'static str {
        match self {
            Self::INVALID_SERVER_CERTIFICATE => "invalid server certificate",
            Self::NO_LICENSE => "no license available",
            Self::INVALID_MAC => "invalid message authentication code",
            Self::INVALID_SCOPE => "invalid scope",
            Self::NO_LICENSE_SERVER => "no license server available",
            Self::STATUS_VALID_CLIENT => "valid client",
            Self::INVALID_CLIENT => "invalid client",
            Self::INVALID_PRODUCT_ID => "invalid product id",
            Self::INVALID_MESSAGE_LEN => "invalid message length",
            _ => "unknown license error",
        }
    }
}

impl core::fmt::Display for LicenseErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (0x{:08X})", self.description(), self.0)
    }
}

/// wStateTransition of a licensing error message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StateTransition(pub u32);

impl StateTransition {
    pub const TOTAL_ABORT: Self = Self(0x0000_0001);
    pub const NO_TRANSITION: Self = Self(0x0000_0002);
    pub const RESET_PHASE_TO_START: Self = Self(0x0000_0003);
    pub const RESEND_LAST_MESSAGE: Self = Self(0x0000_0004);
}

/// GENERAL_LICENSE_ERROR_MESSAGE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicensingErrorMessage {
    pub error_code: LicenseErrorCode,
    pub state_transition: StateTransition,
    pub error_info: Vec<u8>,
}

impl LicensingErrorMessage {
    const NAME: &'static str = "LicensingErrorMessage";

    const FIXED_PART_SIZE: usize = 4 /* dwErrorCode */ + 4 /* dwStateTransition */ + 2 /* blobType */ + 2 /* blobLen */;
}

/// A licensing PDU received from the server: security header + preamble + body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicensePdu {
    LicensingErrorMessage(LicensingErrorMessage),
    /// Any other licensing message (license request, platform challenge, …),
    /// identified by its preamble type.
    Other { msg_type: u8 },
}

impl LicensePdu {
    const NAME: &'static str = "LicensePdu";
}

impl Encode for LicensePdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        let Self::LicensingErrorMessage(message) = self else {
            return Err(invalid_field_err(Self::NAME, "msgType", "cannot encode this message type"));
        };

        ensure_size!(in: dst, size: self.size());

        BasicSecurityHeader {
            flags: BasicSecurityHeaderFlags::LICENSE_PKT,
        }
        .encode(dst)?;

        let message_size = LicensingErrorMessage::FIXED_PART_SIZE + message.error_info.len() + PREAMBLE_SIZE;

        dst.write_u8(ERROR_ALERT_MSG_TYPE);
        dst.write_u8(PREAMBLE_VERSION_3);
        dst.write_u16(cast_length!("wMsgSize", message_size)?);

        dst.write_u32(message.error_code.0);
        dst.write_u32(message.state_transition.0);
        dst.write_u16(BLOB_TYPE_ERROR);
        dst.write_u16(cast_length!("blobLen", message.error_info.len())?);
        dst.write_slice(&message.error_info);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        match self {
            Self::LicensingErrorMessage(message) => {
                BasicSecurityHeader::FIXED_PART_SIZE
                    + PREAMBLE_SIZE
                    + LicensingErrorMessage::FIXED_PART_SIZE
                    + message.error_info.len()
            }
            Self::Other { .. } => BasicSecurityHeader::FIXED_PART_SIZE + PREAMBLE_SIZE,
        }
    }
}

impl<'de> Decode<'de> for LicensePdu {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let security_header = BasicSecurityHeader::decode(src)?;

        if !security_header.flags.contains(BasicSecurityHeaderFlags::LICENSE_PKT) {
            return Err(invalid_field_err(
                Self::NAME,
                "securityHeader",
                "expected LICENSE_PKT flag",
            ));
        }

        ensure_size!(in: src, size: PREAMBLE_SIZE);
        let msg_type = src.read_u8();
        let _version = src.read_u8();
        let _msg_size = src.read_u16();

        if msg_type != ERROR_ALERT_MSG_TYPE {
            return Ok(Self::Other { msg_type });
        }

        ensure_size!(ctx: LicensingErrorMessage::NAME, in: src, size: LicensingErrorMessage::FIXED_PART_SIZE);

        let error_code = LicenseErrorCode(src.read_u32());
        let state_transition = StateTransition(src.read_u32());
        let _blob_type = src.read_u16();
        let blob_len = usize::from(src.read_u16());

        ensure_size!(ctx: LicensingErrorMessage::NAME, in: src, size: blob_len);
        let error_info = src.read_slice(blob_len).to_vec();

        Ok(Self::LicensingErrorMessage(LicensingErrorMessage {
            error_code,
            state_transition,
            error_info,
        }))
    }
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;

    #[test]
    fn valid_client_error_round_trip() {
        let pdu = LicensePdu::LicensingErrorMessage(LicensingErrorMessage {
            error_code: LicenseErrorCode::STATUS_VALID_CLIENT,
            state_transition: StateTransition::NO_TRANSITION,
            error_info: Vec::new(),
        });

        let encoded = encode_vec(&pdu).unwrap();
        assert_eq!(encoded.len(), pdu.size());
        assert_eq!(
            encoded,
            [
                0x80, 0x00, 0x00, 0x00, // security header: LICENSE_PKT
                0xFF, 0x03, 0x10, 0x00, // preamble: ERROR_ALERT, v3, 16 bytes
                0x07, 0x00, 0x00, 0x00, // STATUS_VALID_CLIENT
                0x02, 0x00, 0x00, 0x00, // ST_NO_TRANSITION
                0x04, 0x00, 0x00, 0x00, // BB_ERROR_BLOB, empty
            ]
        );

        let decoded: LicensePdu = decode(&encoded).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn other_message_type_is_surfaced() {
        let bytes = [
            0x80, 0x00, 0x00, 0x00, // security header: LICENSE_PKT
            0x01, 0x03, 0x04, 0x00, // preamble: LICENSE_REQUEST
        ];

        let decoded: LicensePdu = decode(&bytes).unwrap();
        assert_eq!(decoded, LicensePdu::Other { msg_type: 0x01 });
    }
}
