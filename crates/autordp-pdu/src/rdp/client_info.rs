//! 2.2.1.11.1.1 Info Packet (TS_INFO_PACKET) and its extended part.

use core::fmt;

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use autordp_core::{
    cast_length, ensure_size, invalid_field_err, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor,
};

use crate::utf16;

const COMPRESSION_TYPE_MASK: u32 = 0x0000_1E00;
const TIMEZONE_INFO_NAME_SIZE: usize = 64;
const SYSTEM_TIME_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub credentials: Credentials,
    /// Ignored when the keyboard layout in the core data is zero.
    pub code_page: u32,
    pub flags: ClientInfoFlags,
    /// Ignored unless `ClientInfoFlags::COMPRESSION` is set.
    pub compression_type: CompressionType,
    pub alternate_shell: String,
    pub work_dir: String,
    pub extra_info: ExtendedClientInfo,
}

impl ClientInfo {
    const NAME: &'static str = "ClientInfo";

    const FIXED_PART_SIZE: usize = 4 /* codePage */ + 4 /* flags */ + 2 * 5 /* cb fields */;
}

impl Encode for ClientInfo {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u32(self.code_page);

        let flags_with_compression_type =
            self.flags.bits() | (self.compression_type.to_u32().unwrap() << 9);
        dst.write_u32(flags_with_compression_type);

        let domain = self.credentials.domain.as_deref().unwrap_or_default();

        // The cb fields exclude the mandatory null terminator.
        dst.write_u16(cast_length!("cbDomain", utf16::utf16_len(domain))?);
        dst.write_u16(cast_length!("cbUserName", utf16::utf16_len(&self.credentials.username))?);
        dst.write_u16(cast_length!("cbPassword", utf16::utf16_len(&self.credentials.password))?);
        dst.write_u16(cast_length!("cbAlternateShell", utf16::utf16_len(&self.alternate_shell))?);
        dst.write_u16(cast_length!("cbWorkingDir", utf16::utf16_len(&self.work_dir))?);

        write_unicode_with_terminator(dst, domain);
        write_unicode_with_terminator(dst, &self.credentials.username);
        write_unicode_with_terminator(dst, &self.credentials.password);
        write_unicode_with_terminator(dst, &self.alternate_shell);
        write_unicode_with_terminator(dst, &self.work_dir);

        self.extra_info.encode(dst)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        let domain = self.credentials.domain.as_deref().unwrap_or_default();

        Self::FIXED_PART_SIZE
            + utf16::utf16_len(domain)
            + utf16::utf16_len(&self.credentials.username)
            + utf16::utf16_len(&self.credentials.password)
            + utf16::utf16_len(&self.alternate_shell)
            + utf16::utf16_len(&self.work_dir)
            + 2 * 5 // null terminators
            + self.extra_info.size()
    }
}

impl<'de> Decode<'de> for ClientInfo {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_size!(in: src, size: Self::FIXED_PART_SIZE);

        let code_page = src.read_u32();
        let flags_with_compression_type = src.read_u32();

        let flags = ClientInfoFlags::from_bits_truncate(flags_with_compression_type & !COMPRESSION_TYPE_MASK);
        let compression_type =
            CompressionType::from_u32((flags_with_compression_type & COMPRESSION_TYPE_MASK) >> 9)
                .ok_or_else(|| invalid_field_err!("compressionType", "invalid compression type"))?;

        if !flags.contains(ClientInfoFlags::UNICODE) {
            return Err(invalid_field_err!("flags", "ANSI info packets are not supported"));
        }

        let domain_size = usize::from(src.read_u16());
        let user_name_size = usize::from(src.read_u16());
        let password_size = usize::from(src.read_u16());
        let alternate_shell_size = usize::from(src.read_u16());
        let work_dir_size = usize::from(src.read_u16());

        let domain = read_unicode_with_terminator(src, domain_size)?;
        let username = read_unicode_with_terminator(src, user_name_size)?;
        let password = read_unicode_with_terminator(src, password_size)?;
        let alternate_shell = read_unicode_with_terminator(src, alternate_shell_size)?;
        let work_dir = read_unicode_with_terminator(src, work_dir_size)?;

        let domain = if domain.is_empty() { None } else { Some(domain) };

        let extra_info = ExtendedClientInfo::decode(src)?;

        Ok(Self {
            credentials: Credentials {
                username,
                password,
                domain,
            },
            code_page,
            flags,
            compression_type,
            alternate_shell,
            work_dir,
            extra_info,
        })
    }
}

fn write_unicode_with_terminator(dst: &mut WriteCursor<'_>, value: &str) {
    dst.write_slice(&utf16::to_utf16_bytes(value));
    dst.write_u16(0);
}

fn read_unicode_with_terminator(src: &mut ReadCursor<'_>, size_without_terminator: usize) -> DecodeResult<String> {
    ensure_size!(in: src, size: size_without_terminator + 2);

    let value = utf16::from_utf16_bytes(src.read_slice(size_without_terminator));
    src.advance(2);

    Ok(value)
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The password must never reach the logs.
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedClientInfo {
    pub address_family: AddressFamily,
    pub address: String,
    pub dir: String,
    pub optional_data: ExtendedClientOptionalInfo,
}

impl ExtendedClientInfo {
    const NAME: &'static str = "ExtendedClientInfo";

    const FIXED_PART_SIZE: usize = 2 /* addressFamily */ + 2 /* cbAddress */;
}

impl Encode for ExtendedClientInfo {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u16(self.address_family.to_u16().unwrap());

        // These cb fields include the null terminator.
        dst.write_u16(cast_length!("cbAddress", utf16::utf16_len(&self.address) + 2)?);
        write_unicode_with_terminator(dst, &self.address);

        dst.write_u16(cast_length!("cbDir", utf16::utf16_len(&self.dir) + 2)?);
        write_unicode_with_terminator(dst, &self.dir);

        self.optional_data.encode(dst)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
            + utf16::utf16_len(&self.address) + 2
            + 2 /* cbDir */ + utf16::utf16_len(&self.dir) + 2
            + self.optional_data.size()
    }
}

impl<'de> Decode<'de> for ExtendedClientInfo {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_size!(in: src, size: Self::FIXED_PART_SIZE);

        let address_family = AddressFamily::from_u16(src.read_u16())
            .ok_or_else(|| invalid_field_err!("addressFamily", "invalid address family"))?;

        let address_size = usize::from(src.read_u16());
        ensure_size!(in: src, size: address_size);
        let address = utf16::from_utf16_bytes(src.read_slice(address_size))
            .trim_end_matches('\u{0}')
            .to_owned();

        ensure_size!(in: src, size: 2);
        let dir_size = usize::from(src.read_u16());
        ensure_size!(in: src, size: dir_size);
        let dir = utf16::from_utf16_bytes(src.read_slice(dir_size))
            .trim_end_matches('\u{0}')
            .to_owned();

        let optional_data = ExtendedClientOptionalInfo::decode(src)?;

        Ok(Self {
            address_family,
            address,
            dir,
            optional_data,
        })
    }
}

/// Optional tail of the extended info packet.
///
/// Each field requires every previous one to be present; the session-id and
/// performance-flags fields are only emitted when a timezone was.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedClientOptionalInfo {
    pub timezone: Option<TimezoneInfo>,
    pub session_id: Option<u32>,
    pub performance_flags: Option<PerformanceFlags>,
}

impl ExtendedClientOptionalInfo {
    const NAME: &'static str = "ExtendedClientOptionalInfo";
}

impl Encode for ExtendedClientOptionalInfo {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        let Some(ref timezone) = self.timezone else {
            return Ok(());
        };
        timezone.encode(dst)?;

        let Some(session_id) = self.session_id else {
            return Ok(());
        };
        dst.write_u32(session_id);

        let Some(performance_flags) = self.performance_flags else {
            return Ok(());
        };
        dst.write_u32(performance_flags.bits());

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        let mut size = 0;

        if let Some(ref timezone) = self.timezone {
            size += timezone.size();
        } else {
            return size;
        }
        if self.session_id.is_some() {
            size += 4;
        } else {
            return size;
        }
        if self.performance_flags.is_some() {
            size += 4;
        }

        size
    }
}

impl<'de> Decode<'de> for ExtendedClientOptionalInfo {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let mut optional_data = Self::default();

        if src.len() < TimezoneInfo::FIXED_PART_SIZE {
            return Ok(optional_data);
        }
        optional_data.timezone = Some(TimezoneInfo::decode(src)?);

        match src.try_read_u32() {
            Ok(session_id) => optional_data.session_id = Some(session_id),
            Err(_) => return Ok(optional_data),
        }

        match src.try_read_u32() {
            Ok(flags) => optional_data.performance_flags = Some(PerformanceFlags::from_bits_truncate(flags)),
            Err(_) => return Ok(optional_data),
        }

        Ok(optional_data)
    }
}

/// TS_TIME_ZONE_INFORMATION
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneInfo {
    pub bias: u32,
    pub standard_name: String,
    pub standard_date: Option<SystemTime>,
    pub standard_bias: u32,
    pub daylight_name: String,
    pub daylight_date: Option<SystemTime>,
    pub daylight_bias: u32,
}

impl TimezoneInfo {
    const NAME: &'static str = "TimezoneInfo";

    const FIXED_PART_SIZE: usize =
        4 + TIMEZONE_INFO_NAME_SIZE + SYSTEM_TIME_SIZE + 4 + TIMEZONE_INFO_NAME_SIZE + SYSTEM_TIME_SIZE + 4;

    /// A UTC timezone block, good enough for unattended sessions.
    pub fn utc() -> Self {
        Self {
            bias: 0,
            standard_name: String::from("UTC"),
            standard_date: None,
            standard_bias: 0,
            daylight_name: String::from("UTC"),
            daylight_date: None,
            daylight_bias: 0,
        }
    }
}

impl Encode for TimezoneInfo {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u32(self.bias);

        let mut standard_name = utf16::to_utf16_bytes(&self.standard_name);
        standard_name.resize(TIMEZONE_INFO_NAME_SIZE, 0);
        dst.write_slice(&standard_name);

        write_system_time(dst, self.standard_date.as_ref());
        dst.write_u32(self.standard_bias);

        let mut daylight_name = utf16::to_utf16_bytes(&self.daylight_name);
        daylight_name.resize(TIMEZONE_INFO_NAME_SIZE, 0);
        dst.write_slice(&daylight_name);

        write_system_time(dst, self.daylight_date.as_ref());
        dst.write_u32(self.daylight_bias);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for TimezoneInfo {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_size!(in: src, size: Self::FIXED_PART_SIZE);

        let bias = src.read_u32();
        let standard_name = utf16::read_fixed_utf16_string(src, TIMEZONE_INFO_NAME_SIZE);
        let standard_date = read_system_time(src);
        let standard_bias = src.read_u32();
        let daylight_name = utf16::read_fixed_utf16_string(src, TIMEZONE_INFO_NAME_SIZE);
        let daylight_date = read_system_time(src);
        let daylight_bias = src.read_u32();

        Ok(Self {
            bias,
            standard_name,
            standard_date,
            standard_bias,
            daylight_name,
            daylight_date,
            daylight_bias,
        })
    }
}

/// TS_SYSTEMTIME, with the year field always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTime {
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub milliseconds: u16,
}

fn write_system_time(dst: &mut WriteCursor<'_>, time: Option<&SystemTime>) {
    dst.write_u16(0); // wYear
    match time {
        Some(time) => {
            dst.write_u16(time.month);
            dst.write_u16(time.day_of_week);
            dst.write_u16(time.day);
            dst.write_u16(time.hour);
            dst.write_u16(time.minute);
            dst.write_u16(time.second);
            dst.write_u16(time.milliseconds);
        }
        None => {
            for _ in 0..7 {
                dst.write_u16(0);
            }
        }
    }
}

fn read_system_time(src: &mut ReadCursor<'_>) -> Option<SystemTime> {
    let _year = src.read_u16();
    let month = src.read_u16();
    let day_of_week = src.read_u16();
    let day = src.read_u16();
    let hour = src.read_u16();
    let minute = src.read_u16();
    let second = src.read_u16();
    let milliseconds = src.read_u16();

    // All-zero transition dates mean "no transition".
    (month != 0).then_some(SystemTime {
        month,
        day_of_week,
        day,
        hour,
        minute,
        second,
        milliseconds,
    })
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct PerformanceFlags: u32 {
        const DISABLE_WALLPAPER = 0x0000_0001;
        const DISABLE_FULLWINDOWDRAG = 0x0000_0002;
        const DISABLE_MENUANIMATIONS = 0x0000_0004;
        const DISABLE_THEMING = 0x0000_0008;
        const DISABLE_CURSOR_SHADOW = 0x0000_0020;
        const DISABLE_CURSORSETTINGS = 0x0000_0040;
        const ENABLE_FONT_SMOOTHING = 0x0000_0080;
        const ENABLE_DESKTOP_COMPOSITION = 0x0000_0100;
    }
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum AddressFamily {
    INet = 0x0002,
    INet6 = 0x0017,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ClientInfoFlags: u32 {
        const MOUSE = 0x0000_0001;
        const DISABLE_CTRL_ALT_DEL = 0x0000_0002;
        const AUTOLOGON = 0x0000_0008;
        const UNICODE = 0x0000_0010;
        const MAXIMIZE_SHELL = 0x0000_0020;
        const LOGON_NOTIFY = 0x0000_0040;
        const COMPRESSION = 0x0000_0080;
        const ENABLE_WINDOWS_KEY = 0x0000_0100;
        const REMOTE_CONSOLE_AUDIO = 0x0000_2000;
        const FORCE_ENCRYPTED_CS_PDU = 0x0000_4000;
        const RAIL = 0x0000_8000;
        const LOGON_ERRORS = 0x0001_0000;
        const MOUSE_HAS_WHEEL = 0x0002_0000;
        const PASSWORD_IS_SC_PIN = 0x0004_0000;
        const NO_AUDIO_PLAYBACK = 0x0008_0000;
        const USING_SAVED_CREDS = 0x0010_0000;
        const AUDIO_CAPTURE = 0x0020_0000;
        const VIDEO_DISABLE = 0x0040_0000;
        const HIDEF_RAIL_SUPPORTED = 0x0200_0000;
    }
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum CompressionType {
    K8 = 0,
    K64 = 1,
    Rdp6 = 2,
    Rdp61 = 3,
}

#[cfg(test)]
mod tests {
    use autordp_core::{decode, encode_vec};

    use super::*;

    fn client_info() -> ClientInfo {
        ClientInfo {
            credentials: Credentials {
                username: String::from("Administrator"),
                password: String::from("hunter2"),
                domain: Some(String::from("CONTOSO")),
            },
            code_page: 0,
            flags: ClientInfoFlags::UNICODE
                | ClientInfoFlags::MOUSE
                | ClientInfoFlags::AUTOLOGON
                | ClientInfoFlags::DISABLE_CTRL_ALT_DEL,
            compression_type: CompressionType::K8,
            alternate_shell: String::new(),
            work_dir: String::new(),
            extra_info: ExtendedClientInfo {
                address_family: AddressFamily::INet,
                address: String::from("192.0.2.10"),
                dir: String::from("C:\\"),
                optional_data: ExtendedClientOptionalInfo {
                    timezone: Some(TimezoneInfo::utc()),
                    session_id: Some(0),
                    performance_flags: Some(PerformanceFlags::DISABLE_WALLPAPER),
                },
            },
        }
    }

    #[test]
    fn round_trip() {
        let info = client_info();

        let encoded = encode_vec(&info).unwrap();
        assert_eq!(encoded.len(), info.size());

        let decoded: ClientInfo = decode(&encoded).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn debug_does_not_leak_password() {
        let info = client_info();
        let formatted = format!("{:?}", info.credentials);
        assert!(!formatted.contains("hunter2"));
    }
}
