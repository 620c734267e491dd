//! Server Set Error Info PDU ([MS-RDPBCGR] 2.2.5.1.1).

use autordp_core::{ensure_fixed_part_size, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

/// errorInfo codes surfaced by the server while a session is active.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ErrorInfo(pub u32);

impl ErrorInfo {
    pub const NONE: Self = Self(0x0000_0000);
    pub const RPC_INITIATED_DISCONNECT: Self = Self(0x0000_0001);
    pub const RPC_INITIATED_LOGOFF: Self = Self(0x0000_0002);
    pub const IDLE_TIMEOUT: Self = Self(0x0000_0003);
    pub const LOGON_TIMEOUT: Self = Self(0x0000_0004);
    pub const DISCONNECTED_BY_OTHER_CONNECTION: Self = Self(0x0000_0005);
    pub const OUT_OF_MEMORY: Self = Self(0x0000_0006);
    pub const SERVER_DENIED_CONNECTION: Self = Self(0x0000_0007);
    pub const SERVER_INSUFFICIENT_PRIVILEGES: Self = Self(0x0000_0009);
    pub const SERVER_FRESH_CREDENTIALS_REQUIRED: Self = Self(0x0000_000A);
    pub const RPC_INITIATED_DISCONNECT_BY_USER: Self = Self(0x0000_000B);
    pub const LOGOFF_BY_USER: Self = Self(0x0000_000C);
    pub const LICENSE_INTERNAL: Self = Self(0x0000_0100);
    pub const LICENSE_NO_LICENSE_SERVER: Self = Self(0x0000_0101);
    pub const LICENSE_NO_LICENSE: Self = Self(0x0000_0102);
    pub const LICENSE_BAD_CLIENT_MSG: Self = Self(0x0000_0103);
    pub const LICENSE_HWID_DOESNT_MATCH_LICENSE: Self = Self(0x0000_0104);
    pub const LICENSE_BAD_CLIENT_LICENSE: Self = Self(0x0000_0105);
    pub const LICENSE_CANT_FINISH_PROTOCOL: Self = Self(0x0000_0106);
    pub const LICENSE_CLIENT_ENDED_PROTOCOL: Self = Self(0x0000_0107);
    pub const LICENSE_BAD_CLIENT_ENCRYPTION: Self = Self(0x0000_0108);
    pub const LICENSE_CANT_UPGRADE_LICENSE: Self = Self(0x0000_0109);
    pub const LICENSE_NO_REMOTE_CONNECTIONS: Self = Self(0x0000_010A);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NONE => "no error",
            Self::RPC_INITIATED_DISCONNECT => "the disconnection was initiated by an administrative tool",
            Self::RPC_INITIATED_LOGOFF => "the disconnection was due to a forced logoff",
            Self::IDLE_TIMEOUT => "the idle session limit timer expired",
            Self::LOGON_TIMEOUT => "the active session limit timer expired",
            Self::DISCONNECTED_BY_OTHER_CONNECTION => "another user connected to the session",
            Self::OUT_OF_MEMORY => "the server ran out of available memory resources",
            Self::SERVER_DENIED_CONNECTION => "the server denied the connection",
            Self::SERVER_INSUFFICIENT_PRIVILEGES => "the user cannot connect to the server due to insufficient access privileges",
            Self::SERVER_FRESH_CREDENTIALS_REQUIRED => "the server does not accept saved user credentials",
            Self::RPC_INITIATED_DISCONNECT_BY_USER => "the disconnection was initiated by the user disconnecting their own session",
            Self::LOGOFF_BY_USER => "the disconnection was initiated by the user logging off their session",
            Self::LICENSE_INTERNAL => "an internal error has occurred in the Terminal Services licensing component",
            Self::LICENSE_NO_LICENSE_SERVER => "a Remote Desktop License Server could not be found",
            Self::LICENSE_NO_LICENSE => "there are no Client Access Licenses available",
            Self::LICENSE_BAD_CLIENT_MSG => "the remote computer received an invalid licensing message",
            Self::LICENSE_HWID_DOESNT_MATCH_LICENSE => "the Client Access License does not match the client hardware",
            Self::LICENSE_BAD_CLIENT_LICENSE => "the Client Access License is in an invalid format",
            Self::LICENSE_CANT_FINISH_PROTOCOL => "network problems prevented the licensing protocol from completing",
            Self::LICENSE_CLIENT_ENDED_PROTOCOL => "the client ended the licensing protocol prematurely",
            Self::LICENSE_BAD_CLIENT_ENCRYPTION => "a licensing message was incorrectly encrypted",
            Self::LICENSE_CANT_UPGRADE_LICENSE => "the Client Access License could not be upgraded or renewed",
            Self::LICENSE_NO_REMOTE_CONNECTIONS => "the remote computer is not licensed to accept remote connections",
            _ => "unknown error code",
        }
    }
}

impl core::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (0x{:08X})", self.description(), self.0)
    }
}

/// TS_SET_ERROR_INFO_PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSetErrorInfoPdu(pub ErrorInfo);

impl ServerSetErrorInfoPdu {
    const NAME: &'static str = "ServerSetErrorInfoPdu";

    const FIXED_PART_SIZE: usize = 4;
}

impl Encode for ServerSetErrorInfoPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u32(self.0 .0);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for ServerSetErrorInfoPdu {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        Ok(Self(ErrorInfo(src.read_u32())))
    }
}
