//! GCC conference create PDUs and the client/server settings blocks they carry.
//!
//! The conference create envelope is PER-encoded (T.124); the settings blocks
//! inside are plain little-endian structures prefixed with a 4-byte
//! `{blockType, blockLen}` user data header.

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};
use tap::Pipe as _;

use autordp_core::{
    cast_length, decode, ensure_fixed_part_size, ensure_size, invalid_field_err, invalid_field_err_with_source, Decode,
    DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor,
};

use crate::nego::SecurityProtocol;
use crate::utf16;
use crate::{mcs, per};

const USER_DATA_HEADER_SIZE: usize = 4;

const CONFERENCE_REQUEST_OBJECT_ID: [u8; 6] = [0, 0, 20, 124, 0, 1];
const CONFERENCE_REQUEST_CLIENT_TO_SERVER_H221_NON_STANDARD: &[u8; 4] = b"Duca";
const CONFERENCE_REQUEST_SERVER_TO_CLIENT_H221_NON_STANDARD: &[u8; 4] = b"McDn";
const CONFERENCE_REQUEST_U16_MIN: u16 = 1001;

const CONFERENCE_REQUEST_CONNECT_PDU_SIZE: u16 = 12;
const CONFERENCE_RESPONSE_CONNECT_PDU_SIZE: u16 = 13;
const OBJECT_IDENTIFIER_KEY: u8 = 0;
const CONNECT_GCC_PDU_CONFERENCE_REQUEST_CHOICE: u8 = 0;
const CONNECT_GCC_PDU_CONFERENCE_RESPONSE_CHOICE: u8 = 0x14;
const CONFERENCE_REQUEST_USER_DATA_SELECTION: u8 = 8;
const USER_DATA_NUMBER_OF_SETS: u8 = 1;
const USER_DATA_H221_NON_STANDARD_CHOICE: u8 = 0xC0;
const CONFERENCE_RESPONSE_TAG: u32 = 1;
const CONFERENCE_RESPONSE_RESULT: u8 = 0;
const H221_NON_STANDARD_MIN_LENGTH: usize = 4;
const CONFERENCE_NAME: &[u8] = b"1";

const CLIENT_NAME_SIZE: usize = 32;
const IME_FILE_NAME_SIZE: usize = 64;
const DIG_PRODUCT_ID_SIZE: usize = 64;

const CHANNELS_MAX: usize = 31;

macro_rules! per_err {
    ($ctx:expr, $field:expr) => {{
        |error| invalid_field_err_with_source($ctx, $field, "PER", error)
    }};
}

/// RDP version advertised in the core settings blocks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RdpVersion(pub u32);

impl RdpVersion {
    pub const V4: Self = Self(0x0008_0001);
    pub const V5_PLUS: Self = Self(0x0008_0004);
    pub const V10: Self = Self(0x0008_0005);
}

/// 2.2.1.3 Client MCS Connect Initial PDU user data (TS_UD_CS_*)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientGccBlocks {
    pub core: ClientCoreData,
    pub security: ClientSecurityData,
    /// Absent when the client has no static channels to join.
    pub network: Option<ClientNetworkData>,
}

impl ClientGccBlocks {
    const NAME: &'static str = "ClientGccBlocks";

    pub fn channel_names(&self) -> Vec<ChannelName> {
        self.network
            .as_ref()
            .map(|network| network.channels.iter().map(|def| def.name.clone()).collect())
            .unwrap_or_default()
    }
}

impl Encode for ClientGccBlocks {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        UserDataHeader::encode(dst, ClientGccType::CoreData as u16, &self.core)?;
        UserDataHeader::encode(dst, ClientGccType::SecurityData as u16, &self.security)?;

        if let Some(ref network) = self.network {
            UserDataHeader::encode(dst, ClientGccType::NetworkData as u16, network)?;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        let mut size = self.core.size() + self.security.size() + USER_DATA_HEADER_SIZE * 2;

        if let Some(ref network) = self.network {
            size += network.size() + USER_DATA_HEADER_SIZE;
        }

        size
    }
}

impl<'de> Decode<'de> for ClientGccBlocks {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let mut core = None;
        let mut security = None;
        let mut network = None;

        while src.len() >= USER_DATA_HEADER_SIZE {
            let (ty, block) = UserDataHeader::decode(src)?;

            match ClientGccType::from_u16(ty) {
                Some(ClientGccType::CoreData) => core = Some(decode(block)?),
                Some(ClientGccType::SecurityData) => security = Some(decode(block)?),
                Some(ClientGccType::NetworkData) => network = Some(decode(block)?),
                // Cluster / monitor / message channel blocks are not consumed here.
                _ => {}
            }
        }

        Ok(Self {
            core: core.ok_or_else(|| invalid_field_err!("core", "required GCC core block is absent"))?,
            security: security.ok_or_else(|| invalid_field_err!("security", "required GCC security block is absent"))?,
            network,
        })
    }
}

/// 2.2.1.4 Server MCS Connect Response PDU user data (TS_UD_SC_*)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerGccBlocks {
    pub core: ServerCoreData,
    pub network: ServerNetworkData,
    pub security: ServerSecurityData,
}

impl ServerGccBlocks {
    const NAME: &'static str = "ServerGccBlocks";

    pub fn channel_ids(&self) -> Vec<u16> {
        self.network.channel_ids.clone()
    }

    pub fn io_channel_id(&self) -> u16 {
        self.network.io_channel
    }
}

impl Encode for ServerGccBlocks {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        UserDataHeader::encode(dst, ServerGccType::CoreData as u16, &self.core)?;
        UserDataHeader::encode(dst, ServerGccType::NetworkData as u16, &self.network)?;
        UserDataHeader::encode(dst, ServerGccType::SecurityData as u16, &self.security)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        self.core.size() + self.network.size() + self.security.size() + USER_DATA_HEADER_SIZE * 3
    }
}

impl<'de> Decode<'de> for ServerGccBlocks {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let mut core = None;
        let mut network = None;
        let mut security = None;

        while src.len() >= USER_DATA_HEADER_SIZE {
            let (ty, block) = UserDataHeader::decode(src)?;

            match ServerGccType::from_u16(ty) {
                Some(ServerGccType::CoreData) => core = Some(decode(block)?),
                Some(ServerGccType::NetworkData) => network = Some(decode(block)?),
                Some(ServerGccType::SecurityData) => security = Some(decode(block)?),
                // Message channel / multi-transport blocks are not consumed here.
                _ => {}
            }
        }

        Ok(Self {
            core: core.ok_or_else(|| invalid_field_err!("core", "required GCC core block is absent"))?,
            network: network.ok_or_else(|| invalid_field_err!("network", "required GCC network block is absent"))?,
            security: security.ok_or_else(|| invalid_field_err!("security", "required GCC security block is absent"))?,
        })
    }
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, FromPrimitive)]
enum ClientGccType {
    CoreData = 0xC001,
    SecurityData = 0xC002,
    NetworkData = 0xC003,
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, FromPrimitive)]
enum ServerGccType {
    CoreData = 0x0C01,
    SecurityData = 0x0C02,
    NetworkData = 0x0C03,
}

#[derive(Debug)]
struct UserDataHeader;

impl UserDataHeader {
    const FIXED_PART_SIZE: usize = 2 /* blockType */ + 2 /* blockLen */;

    fn encode<B: Encode>(dst: &mut WriteCursor<'_>, block_type: u16, block: &B) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(block_type);
        dst.write_u16(cast_length!("blockLen", block.size() + USER_DATA_HEADER_SIZE)?);
        block.encode(dst)?;

        Ok(())
    }

    fn decode<'de>(src: &mut ReadCursor<'de>) -> DecodeResult<(u16, &'de [u8])> {
        ensure_fixed_part_size!(in: src);

        let block_type = src.read_u16();
        let block_length: usize = cast_length!("blockLen", src.read_u16())?;

        if block_length <= USER_DATA_HEADER_SIZE {
            return Err(invalid_field_err!("blockLen", "invalid user data header length"));
        }

        let len = block_length - USER_DATA_HEADER_SIZE;
        ensure_size!(in: src, size: len);

        Ok((block_type, src.read_slice(len)))
    }
}

/// 2.2.1.3.2 Client Core Data (TS_UD_CS_CORE)
///
/// The optional tail is emitted up to and including `server_selected_protocol`;
/// the fields after it carry physical-monitor hints this client has no use for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCoreData {
    pub version: RdpVersion,
    pub desktop_width: u16,
    pub desktop_height: u16,
    pub keyboard_layout: u32,
    pub client_build: u32,
    /// Truncated to the first 15 characters.
    pub client_name: String,
    pub keyboard_type: KeyboardType,
    pub keyboard_subtype: u32,
    pub keyboard_functional_keys_count: u32,
    pub ime_file_name: String,
    pub high_color_depth: HighColorDepth,
    pub supported_color_depths: SupportedColorDepths,
    pub early_capability_flags: ClientEarlyCapabilityFlags,
    pub dig_product_id: String,
    pub connection_type: ConnectionType,
    pub server_selected_protocol: SecurityProtocol,
}

impl ClientCoreData {
    const NAME: &'static str = "ClientCoreData";

    const FIXED_PART_SIZE: usize = 4 /* version */ + 2 /* width */ + 2 /* height */
        + 2 /* colorDepth */ + 2 /* SASSequence */ + 4 /* keyboardLayout */ + 4 /* clientBuild */
        + CLIENT_NAME_SIZE + 4 /* keyboardType */ + 4 /* keyboardSubType */ + 4 /* keyboardFunctionKey */
        + IME_FILE_NAME_SIZE;

    const OPTIONAL_PART_SIZE: usize = 2 /* postBeta2ColorDepth */ + 2 /* clientProductId */
        + 4 /* serialNumber */ + 2 /* highColorDepth */ + 2 /* supportedColorDepths */
        + 2 /* earlyCapabilityFlags */ + DIG_PRODUCT_ID_SIZE + 1 /* connectionType */ + 1 /* pad1octet */
        + 4 /* serverSelectedProtocol */;

    const COLOR_DEPTH_8BPP: u16 = 0xCA01;
    const SAS_DEL: u16 = 0xAA03;
}

impl Encode for ClientCoreData {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u32(self.version.0);
        dst.write_u16(self.desktop_width);
        dst.write_u16(self.desktop_height);
        // Ignored by servers once the optional high color depth is present.
        dst.write_u16(Self::COLOR_DEPTH_8BPP);
        dst.write_u16(Self::SAS_DEL);
        dst.write_u32(self.keyboard_layout);
        dst.write_u32(self.client_build);
        utf16::write_fixed_utf16_string(dst, &self.client_name, CLIENT_NAME_SIZE);
        dst.write_u32(self.keyboard_type.to_u32().unwrap());
        dst.write_u32(self.keyboard_subtype);
        dst.write_u32(self.keyboard_functional_keys_count);
        utf16::write_fixed_utf16_string(dst, &self.ime_file_name, IME_FILE_NAME_SIZE);

        dst.write_u16(Self::COLOR_DEPTH_8BPP); // postBeta2ColorDepth, superseded below
        dst.write_u16(1); // clientProductId
        dst.write_u32(0); // serialNumber
        dst.write_u16(self.high_color_depth.to_u16().unwrap());
        dst.write_u16(self.supported_color_depths.bits());
        dst.write_u16(self.early_capability_flags.bits());
        utf16::write_fixed_utf16_string(dst, &self.dig_product_id, DIG_PRODUCT_ID_SIZE);
        dst.write_u8(self.connection_type.to_u8().unwrap());
        dst.write_u8(0); // pad1octet
        dst.write_u32(self.server_selected_protocol.bits());

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + Self::OPTIONAL_PART_SIZE
    }
}

impl<'de> Decode<'de> for ClientCoreData {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let version = src.read_u32().pipe(RdpVersion);
        let desktop_width = src.read_u16();
        let desktop_height = src.read_u16();
        let _color_depth = src.read_u16();
        let _sas_sequence = src.read_u16();
        let keyboard_layout = src.read_u32();
        let client_build = src.read_u32();
        let client_name = utf16::read_fixed_utf16_string(src, CLIENT_NAME_SIZE);
        let keyboard_type = src
            .read_u32()
            .pipe(KeyboardType::from_u32)
            .ok_or_else(|| invalid_field_err!("keyboardType", "invalid keyboard type"))?;
        let keyboard_subtype = src.read_u32();
        let keyboard_functional_keys_count = src.read_u32();
        let ime_file_name = utf16::read_fixed_utf16_string(src, IME_FILE_NAME_SIZE);

        ensure_size!(in: src, size: Self::OPTIONAL_PART_SIZE);

        let _post_beta2_color_depth = src.read_u16();
        let _client_product_id = src.read_u16();
        let _serial_number = src.read_u32();
        let high_color_depth = src
            .read_u16()
            .pipe(HighColorDepth::from_u16)
            .ok_or_else(|| invalid_field_err!("highColorDepth", "invalid color depth"))?;
        let supported_color_depths = SupportedColorDepths::from_bits_truncate(src.read_u16());
        let early_capability_flags = ClientEarlyCapabilityFlags::from_bits_truncate(src.read_u16());
        let dig_product_id = utf16::read_fixed_utf16_string(src, DIG_PRODUCT_ID_SIZE);
        let connection_type = src
            .read_u8()
            .pipe(ConnectionType::from_u8)
            .ok_or_else(|| invalid_field_err!("connectionType", "invalid connection type"))?;
        let _pad = src.read_u8();
        let server_selected_protocol = SecurityProtocol::from_bits_truncate(src.read_u32());

        Ok(Self {
            version,
            desktop_width,
            desktop_height,
            keyboard_layout,
            client_build,
            client_name,
            keyboard_type,
            keyboard_subtype,
            keyboard_functional_keys_count,
            ime_file_name,
            high_color_depth,
            supported_color_depths,
            early_capability_flags,
            dig_product_id,
            connection_type,
            server_selected_protocol,
        })
    }
}

/// 2.2.1.4.2 Server Core Data (TS_UD_SC_CORE)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCoreData {
    pub version: RdpVersion,
    pub client_requested_protocols: Option<SecurityProtocol>,
    pub early_capability_flags: Option<ServerEarlyCapabilityFlags>,
}

impl ServerCoreData {
    const NAME: &'static str = "ServerCoreData";

    const FIXED_PART_SIZE: usize = 4;
}

impl Encode for ServerCoreData {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u32(self.version.0);

        if let Some(protocols) = self.client_requested_protocols {
            dst.write_u32(protocols.bits());
        }
        if let Some(flags) = self.early_capability_flags {
            dst.write_u32(flags.bits());
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
            + self.client_requested_protocols.map_or(0, |_| 4)
            + self.early_capability_flags.map_or(0, |_| 4)
    }
}

impl<'de> Decode<'de> for ServerCoreData {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let version = src.read_u32().pipe(RdpVersion);

        let client_requested_protocols = src.try_read_u32().ok().map(SecurityProtocol::from_bits_truncate);
        let early_capability_flags = src.try_read_u32().ok().map(ServerEarlyCapabilityFlags::from_bits_truncate);

        Ok(Self {
            version,
            client_requested_protocols,
            early_capability_flags,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ServerEarlyCapabilityFlags: u32 {
        const EDGE_ACTIONS_SUPPORTED_V1 = 0x0000_0001;
        const DYNAMIC_DST_SUPPORTED = 0x0000_0002;
        const EDGE_ACTIONS_SUPPORTED_V2 = 0x0000_0004;
        const SKIP_CHANNELJOIN_SUPPORTED = 0x0000_0008;
    }
}

/// 2.2.1.3.3 Client Security Data (TS_UD_CS_SEC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecurityData {
    pub encryption_methods: EncryptionMethod,
    pub ext_encryption_methods: u32,
}

impl ClientSecurityData {
    const NAME: &'static str = "ClientSecurityData";

    const FIXED_PART_SIZE: usize = 4 + 4;

    /// Security data for connections where encryption is handled below RDP
    /// (TLS or CredSSP).
    pub fn no_security() -> Self {
        Self {
            encryption_methods: EncryptionMethod::empty(),
            ext_encryption_methods: 0,
        }
    }
}

impl Encode for ClientSecurityData {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u32(self.encryption_methods.bits());
        dst.write_u32(self.ext_encryption_methods);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for ClientSecurityData {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let encryption_methods = EncryptionMethod::from_bits_truncate(src.read_u32());
        let ext_encryption_methods = src.read_u32();

        Ok(Self {
            encryption_methods,
            ext_encryption_methods,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct EncryptionMethod: u32 {
        const BIT_40 = 0x0000_0001;
        const BIT_128 = 0x0000_0002;
        const BIT_56 = 0x0000_0008;
        const FIPS = 0x0000_0010;
    }
}

/// 2.2.1.4.3 Server Security Data (TS_UD_SC_SEC1)
///
/// The server random and certificate that follow the fixed part are only
/// present with standard RDP security, which this client refuses; they are
/// skipped on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSecurityData {
    pub encryption_method: EncryptionMethod,
    pub encryption_level: EncryptionLevel,
}

impl ServerSecurityData {
    const NAME: &'static str = "ServerSecurityData";

    const FIXED_PART_SIZE: usize = 4 + 4;

    pub fn no_security() -> Self {
        Self {
            encryption_method: EncryptionMethod::empty(),
            encryption_level: EncryptionLevel::None,
        }
    }
}

impl Encode for ServerSecurityData {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u32(self.encryption_method.bits());
        dst.write_u32(self.encryption_level.to_u32().unwrap());

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for ServerSecurityData {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let encryption_method = EncryptionMethod::from_bits_truncate(src.read_u32());
        let encryption_level = EncryptionLevel::from_u32(src.read_u32())
            .ok_or_else(|| invalid_field_err!("encryptionLevel", "invalid encryption level"))?;

        // serverRandomLen, serverCertLen and their payloads, when present
        src.advance(src.len());

        Ok(Self {
            encryption_method,
            encryption_level,
        })
    }
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum EncryptionLevel {
    None = 0,
    Low = 1,
    ClientCompatible = 2,
    High = 3,
    Fips = 4,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum KeyboardType {
    IbmPcXt = 1,
    OlivettiIco = 2,
    IbmPcAt = 3,
    IbmEnhanced = 4,
    Nokia1050 = 5,
    Nokia9140 = 6,
    Japanese = 7,
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, FromPrimitive, ToPrimitive, Eq, Ord, PartialEq, PartialOrd)]
pub enum HighColorDepth {
    Bpp4 = 0x0004,
    Bpp8 = 0x0008,
    Rgb555Bpp16 = 0x000F,
    Rgb565Bpp16 = 0x0010,
    Bpp24 = 0x0018,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ConnectionType {
    NotUsed = 0,
    Modem = 1,
    BroadbandLow = 2,
    Satellite = 3,
    BroadbandHigh = 4,
    Wan = 5,
    Lan = 6,
    Autodetect = 7,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct SupportedColorDepths: u16 {
        const BPP24 = 1;
        const BPP16 = 2;
        const BPP15 = 4;
        const BPP32 = 8;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ClientEarlyCapabilityFlags: u16 {
        const SUPPORT_ERR_INFO_PDU = 0x0001;
        const WANT_32_BPP_SESSION = 0x0002;
        const SUPPORT_STATUS_INFO_PDU = 0x0004;
        const STRONG_ASYMMETRIC_KEYS = 0x0008;
        const VALID_CONNECTION_TYPE = 0x0020;
        const SUPPORT_MONITOR_LAYOUT_PDU = 0x0040;
        const SUPPORT_NET_CHAR_AUTODETECT = 0x0080;
        const SUPPORT_DYN_VC_GFX_PROTOCOL = 0x0100;
        const SUPPORT_DYNAMIC_TIME_ZONE = 0x0200;
        const SUPPORT_HEART_BEAT_PDU = 0x0400;
        const SUPPORT_SKIP_CHANNELJOIN = 0x0800;
        const _ = !0;
    }
}

/// An 8-byte array containing a null-terminated collection of seven ANSI
/// characters uniquely identifying a static channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName {
    inner: [u8; Self::SIZE],
}

impl ChannelName {
    pub const SIZE: usize = 8;

    /// Creates a channel name, forcing the last byte to the null terminator.
    pub const fn new(mut value: [u8; Self::SIZE]) -> Self {
        value[Self::SIZE - 1] = 0;

        Self { inner: value }
    }

    /// Converts a UTF-8 string into a channel name by copying up to 7 ASCII bytes.
    pub fn from_utf8(value: &str) -> Option<Self> {
        let mut inner = [0; Self::SIZE];

        value
            .chars()
            .take(Self::SIZE - 1)
            .zip(inner.iter_mut())
            .try_for_each(|(src, dst)| {
                let c = u8::try_from(src).ok()?;
                c.is_ascii().then(|| *dst = c)
            })?;

        Some(Self { inner })
    }

    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.inner
    }

    /// Returns a `&str` if this channel name is valid ASCII.
    pub fn as_str(&self) -> Option<&str> {
        if self.inner.iter().all(u8::is_ascii) {
            let terminator_idx = self.inner.iter().position(|c| *c == 0)?;
            core::str::from_utf8(&self.inner[..terminator_idx]).ok()
        } else {
            None
        }
    }
}

/// Channel Definition Structure (CHANNEL_DEF)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDef {
    pub name: ChannelName,
    pub options: ChannelOptions,
}

impl ChannelDef {
    const NAME: &'static str = "ChannelDef";

    const FIXED_PART_SIZE: usize = ChannelName::SIZE + 4;
}

impl Encode for ChannelDef {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_slice(self.name.as_bytes());
        dst.write_u32(self.options.bits());

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for ChannelDef {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let name = ChannelName::new(src.read_array());
        let options = ChannelOptions::from_bits_truncate(src.read_u32());

        Ok(Self { name, options })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ChannelOptions: u32 {
        const INITIALIZED = 0x8000_0000;
        const ENCRYPT_RDP = 0x4000_0000;
        const ENCRYPT_SC = 0x2000_0000;
        const ENCRYPT_CS = 0x1000_0000;
        const PRI_HIGH = 0x0800_0000;
        const PRI_MED = 0x0400_0000;
        const PRI_LOW = 0x0200_0000;
        const COMPRESS_RDP = 0x0080_0000;
        const COMPRESS = 0x0040_0000;
        const SHOW_PROTOCOL = 0x0020_0000;
        const REMOTE_CONTROL_PERSISTENT = 0x0010_0000;
    }
}

/// 2.2.1.3.4 Client Network Data (TS_UD_CS_NET)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientNetworkData {
    pub channels: Vec<ChannelDef>,
}

impl ClientNetworkData {
    const NAME: &'static str = "ClientNetworkData";

    const FIXED_PART_SIZE: usize = 4;
}

impl Encode for ClientNetworkData {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u32(cast_length!("channelCount", self.channels.len())?);

        for channel in self.channels.iter().take(CHANNELS_MAX) {
            channel.encode(dst)?;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.channels.len() * (ChannelName::SIZE + 4)
    }
}

impl<'de> Decode<'de> for ClientNetworkData {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let channel_count = src.read_u32() as usize;

        if channel_count > CHANNELS_MAX {
            return Err(invalid_field_err!("channelCount", "too many static channels"));
        }

        let mut channels = Vec::with_capacity(channel_count);
        for _ in 0..channel_count {
            channels.push(ChannelDef::decode(src)?);
        }

        Ok(Self { channels })
    }
}

/// 2.2.1.4.4 Server Network Data (TS_UD_SC_NET)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNetworkData {
    pub io_channel: u16,
    pub channel_ids: Vec<u16>,
}

impl ServerNetworkData {
    const NAME: &'static str = "ServerNetworkData";

    const FIXED_PART_SIZE: usize = 2 + 2;

    fn has_padding(&self) -> bool {
        // The structure size must be a multiple of 4.
        self.channel_ids.len() % 2 != 0
    }
}

impl Encode for ServerNetworkData {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u16(self.io_channel);
        dst.write_u16(cast_length!("channelCount", self.channel_ids.len())?);

        for channel_id in self.channel_ids.iter() {
            dst.write_u16(*channel_id);
        }

        if self.has_padding() {
            dst.write_u16(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.channel_ids.len() * 2 + if self.has_padding() { 2 } else { 0 }
    }
}

impl<'de> Decode<'de> for ServerNetworkData {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let io_channel = src.read_u16();
        let channel_count = src.read_u16() as usize;

        ensure_size!(in: src, size: channel_count * 2);

        let mut channel_ids = Vec::with_capacity(channel_count);
        for _ in 0..channel_count {
            channel_ids.push(src.read_u16());
        }

        // Optional trailing pad when the channel count is odd.
        if src.len() >= 2 {
            src.advance(2);
        }

        Ok(Self {
            io_channel,
            channel_ids,
        })
    }
}

/// GCC Conference Create Request wrapping the client settings blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConferenceCreateRequest {
    pub gcc_blocks: ClientGccBlocks,
}

impl ConferenceCreateRequest {
    const NAME: &'static str = "ConferenceCreateRequest";
}

impl Encode for ConferenceCreateRequest {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        let gcc_blocks_buffer_length = self.gcc_blocks.size();

        // ConnectData::Key: select object (0) of type OBJECT_IDENTIFIER
        per::write_choice(dst, OBJECT_IDENTIFIER_KEY);
        per::write_object_id(dst, CONFERENCE_REQUEST_OBJECT_ID);

        // ConnectData::connectPDU: length
        per::write_length(
            dst,
            cast_length!("connectPduLen", gcc_blocks_buffer_length + usize::from(CONFERENCE_REQUEST_CONNECT_PDU_SIZE))?,
        );
        // ConnectGCCPDU (CHOICE): select conferenceCreateRequest (0)
        per::write_choice(dst, CONNECT_GCC_PDU_CONFERENCE_REQUEST_CHOICE);
        // ConferenceCreateRequest::Selection: select optional userData
        per::write_selection(dst, CONFERENCE_REQUEST_USER_DATA_SELECTION);
        per::write_numeric_string(dst, CONFERENCE_NAME, 1).map_err(per_err!(Self::NAME, "conferenceName"))?;
        per::write_padding(dst, 1);
        // UserData (SET OF SEQUENCE), one set, select h221NonStandard
        per::write_number_of_sets(dst, USER_DATA_NUMBER_OF_SETS);
        per::write_choice(dst, USER_DATA_H221_NON_STANDARD_CHOICE);
        per::write_octet_string(dst, CONFERENCE_REQUEST_CLIENT_TO_SERVER_H221_NON_STANDARD, H221_NON_STANDARD_MIN_LENGTH)
            .map_err(per_err!(Self::NAME, "h221NonStandardKey"))?;
        per::write_length(dst, cast_length!("gccBlocksLen", gcc_blocks_buffer_length)?);
        self.gcc_blocks.encode(dst)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        let gcc_blocks_buffer_length = self.gcc_blocks.size() as u16;
        per::CHOICE_SIZE
            + per::OBJECT_ID_SIZE
            + per::sizeof_length(CONFERENCE_REQUEST_CONNECT_PDU_SIZE + gcc_blocks_buffer_length)
            + usize::from(CONFERENCE_REQUEST_CONNECT_PDU_SIZE)
            + per::sizeof_length(gcc_blocks_buffer_length)
            + usize::from(gcc_blocks_buffer_length)
    }
}

impl<'de> Decode<'de> for ConferenceCreateRequest {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let ctx = Self::NAME;

        if per::read_choice(src).map_err(per_err!(ctx, "connectDataKey"))? != OBJECT_IDENTIFIER_KEY {
            return Err(invalid_field_err(ctx, "connectDataKey", "unexpected ConnectData key"));
        }
        if per::read_object_id(src).map_err(per_err!(ctx, "objectId"))? != CONFERENCE_REQUEST_OBJECT_ID {
            return Err(invalid_field_err(ctx, "objectId", "unexpected ConnectData key value"));
        }

        let _length = per::read_length(src).map_err(per_err!(ctx, "connectPduLen"))?;
        if per::read_choice(src).map_err(per_err!(ctx, "connectGccPdu"))? != CONNECT_GCC_PDU_CONFERENCE_REQUEST_CHOICE {
            return Err(invalid_field_err(ctx, "connectGccPdu", "expected ConferenceCreateRequest"));
        }
        if per::read_selection(src).map_err(per_err!(ctx, "selection"))? != CONFERENCE_REQUEST_USER_DATA_SELECTION {
            return Err(invalid_field_err(ctx, "selection", "expected userData selection"));
        }
        per::read_numeric_string(src, 1).map_err(per_err!(ctx, "conferenceName"))?;
        per::read_padding(src, 1).map_err(per_err!(ctx, "padding"))?;

        if per::read_number_of_sets(src).map_err(per_err!(ctx, "numberOfSets"))? != USER_DATA_NUMBER_OF_SETS {
            return Err(invalid_field_err(ctx, "numberOfSets", "expected a single user data set"));
        }
        if per::read_choice(src).map_err(per_err!(ctx, "userDataChoice"))? != USER_DATA_H221_NON_STANDARD_CHOICE {
            return Err(invalid_field_err(ctx, "userDataChoice", "expected h221NonStandard"));
        }
        if per::read_octet_string(src, H221_NON_STANDARD_MIN_LENGTH).map_err(per_err!(ctx, "h221NonStandardKey"))?
            != CONFERENCE_REQUEST_CLIENT_TO_SERVER_H221_NON_STANDARD
        {
            return Err(invalid_field_err(ctx, "h221NonStandardKey", "invalid client-to-server key"));
        }

        let _gcc_blocks_length = per::read_length(src).map_err(per_err!(ctx, "gccBlocksLen"))?;
        let gcc_blocks = ClientGccBlocks::decode(src)?;

        Ok(Self { gcc_blocks })
    }
}

/// GCC Conference Create Response wrapping the server settings blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConferenceCreateResponse {
    pub user_id: u16,
    pub gcc_blocks: ServerGccBlocks,
}

impl ConferenceCreateResponse {
    const NAME: &'static str = "ConferenceCreateResponse";
}

impl Encode for ConferenceCreateResponse {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        let gcc_blocks_buffer_length = self.gcc_blocks.size();

        per::write_choice(dst, OBJECT_IDENTIFIER_KEY);
        per::write_object_id(dst, CONFERENCE_REQUEST_OBJECT_ID);

        per::write_length(
            dst,
            cast_length!(
                "connectPduLen",
                gcc_blocks_buffer_length + usize::from(CONFERENCE_RESPONSE_CONNECT_PDU_SIZE)
            )?,
        );
        per::write_choice(dst, CONNECT_GCC_PDU_CONFERENCE_RESPONSE_CHOICE);
        per::write_u16(dst, self.user_id, CONFERENCE_REQUEST_U16_MIN).map_err(per_err!(Self::NAME, "nodeId"))?;
        per::write_u32(dst, CONFERENCE_RESPONSE_TAG);
        per::write_enum(dst, CONFERENCE_RESPONSE_RESULT);
        per::write_number_of_sets(dst, USER_DATA_NUMBER_OF_SETS);
        per::write_choice(dst, USER_DATA_H221_NON_STANDARD_CHOICE);
        per::write_octet_string(dst, CONFERENCE_REQUEST_SERVER_TO_CLIENT_H221_NON_STANDARD, H221_NON_STANDARD_MIN_LENGTH)
            .map_err(per_err!(Self::NAME, "h221NonStandardKey"))?;
        per::write_length(dst, cast_length!("gccBlocksLen", gcc_blocks_buffer_length)?);
        self.gcc_blocks.encode(dst)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        let gcc_blocks_buffer_length = self.gcc_blocks.size() as u16;
        per::CHOICE_SIZE
            + per::OBJECT_ID_SIZE
            + per::sizeof_length(CONFERENCE_RESPONSE_CONNECT_PDU_SIZE + gcc_blocks_buffer_length)
            + usize::from(CONFERENCE_RESPONSE_CONNECT_PDU_SIZE)
            + per::sizeof_length(gcc_blocks_buffer_length)
            + usize::from(gcc_blocks_buffer_length)
    }
}

impl<'de> Decode<'de> for ConferenceCreateResponse {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let ctx = Self::NAME;

        if per::read_choice(src).map_err(per_err!(ctx, "connectDataKey"))? != OBJECT_IDENTIFIER_KEY {
            return Err(invalid_field_err(ctx, "connectDataKey", "unexpected ConnectData key"));
        }
        if per::read_object_id(src).map_err(per_err!(ctx, "objectId"))? != CONFERENCE_REQUEST_OBJECT_ID {
            return Err(invalid_field_err(ctx, "objectId", "unexpected ConnectData key value"));
        }

        // Length must be ignored by the client.
        let _length = per::read_length(src).map_err(per_err!(ctx, "connectPduLen"))?;
        if per::read_choice(src).map_err(per_err!(ctx, "connectGccPdu"))? != CONNECT_GCC_PDU_CONFERENCE_RESPONSE_CHOICE {
            return Err(invalid_field_err(ctx, "connectGccPdu", "expected ConferenceCreateResponse"));
        }
        let user_id = per::read_u16(src, CONFERENCE_REQUEST_U16_MIN).map_err(per_err!(ctx, "nodeId"))?;
        if per::read_u32(src).map_err(per_err!(ctx, "tag"))? != CONFERENCE_RESPONSE_TAG {
            return Err(invalid_field_err(ctx, "tag", "unexpected conference create response tag"));
        }
        if per::read_enum(src, mcs::RESULT_ENUM_LENGTH).map_err(per_err!(ctx, "result"))? != CONFERENCE_RESPONSE_RESULT {
            return Err(invalid_field_err(ctx, "result", "conference create request was rejected"));
        }
        if per::read_number_of_sets(src).map_err(per_err!(ctx, "numberOfSets"))? != USER_DATA_NUMBER_OF_SETS {
            return Err(invalid_field_err(ctx, "numberOfSets", "expected a single user data set"));
        }
        if per::read_choice(src).map_err(per_err!(ctx, "userDataChoice"))? != USER_DATA_H221_NON_STANDARD_CHOICE {
            return Err(invalid_field_err(ctx, "userDataChoice", "expected h221NonStandard"));
        }
        if per::read_octet_string(src, H221_NON_STANDARD_MIN_LENGTH).map_err(per_err!(ctx, "h221NonStandardKey"))?
            != CONFERENCE_REQUEST_SERVER_TO_CLIENT_H221_NON_STANDARD
        {
            return Err(invalid_field_err(ctx, "h221NonStandardKey", "invalid server-to-client key"));
        }

        let _gcc_blocks_length = per::read_length(src).map_err(per_err!(ctx, "gccBlocksLen"))?;
        let gcc_blocks = ServerGccBlocks::decode(src)?;

        Ok(Self { user_id, gcc_blocks })
    }
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;

    fn client_blocks() -> ClientGccBlocks {
        ClientGccBlocks {
            core: ClientCoreData {
                version: RdpVersion::V5_PLUS,
                desktop_width: 1920,
                desktop_height: 1080,
                keyboard_layout: 0,
                client_build: 18363,
                client_name: String::from("workstation"),
                keyboard_type: KeyboardType::IbmEnhanced,
                keyboard_subtype: 0,
                keyboard_functional_keys_count: 12,
                ime_file_name: String::new(),
                high_color_depth: HighColorDepth::Bpp24,
                supported_color_depths: SupportedColorDepths::BPP24 | SupportedColorDepths::BPP16,
                early_capability_flags: ClientEarlyCapabilityFlags::VALID_CONNECTION_TYPE
                    | ClientEarlyCapabilityFlags::SUPPORT_ERR_INFO_PDU,
                dig_product_id: String::new(),
                connection_type: ConnectionType::Lan,
                server_selected_protocol: SecurityProtocol::HYBRID,
            },
            security: ClientSecurityData::no_security(),
            network: Some(ClientNetworkData {
                channels: vec![ChannelDef {
                    name: ChannelName::from_utf8("rdpsnd").unwrap(),
                    options: ChannelOptions::INITIALIZED,
                }],
            }),
        }
    }

    #[test]
    fn client_blocks_round_trip() {
        let blocks = client_blocks();
        let encoded = encode_vec(&blocks).unwrap();
        assert_eq!(encoded.len(), blocks.size());

        let decoded: ClientGccBlocks = decode(&encoded).unwrap();
        assert_eq!(decoded, blocks);
    }

    #[test]
    fn conference_create_request_round_trip() {
        let request = ConferenceCreateRequest {
            gcc_blocks: client_blocks(),
        };

        let encoded = encode_vec(&request).unwrap();
        assert_eq!(encoded.len(), request.size());

        let decoded: ConferenceCreateRequest = decode(&encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn conference_create_response_round_trip() {
        let response = ConferenceCreateResponse {
            user_id: 1002,
            gcc_blocks: ServerGccBlocks {
                core: ServerCoreData {
                    version: RdpVersion::V10,
                    client_requested_protocols: Some(SecurityProtocol::HYBRID),
                    early_capability_flags: None,
                },
                network: ServerNetworkData {
                    io_channel: 1003,
                    channel_ids: vec![1004],
                },
                security: ServerSecurityData::no_security(),
            },
        };

        let encoded = encode_vec(&response).unwrap();
        assert_eq!(encoded.len(), response.size());

        let decoded: ConferenceCreateResponse = decode(&encoded).unwrap();
        assert_eq!(decoded, response);
    }
}
