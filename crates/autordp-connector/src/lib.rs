#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

#[macro_use]
mod macros;

mod channel_connection;
mod connection;
mod connection_finalization;
mod credssp;
mod io_channel;
mod license_exchange;
mod server_name;

use core::any::Any;
use core::fmt;

use autordp_pdu::gcc::KeyboardType;
use autordp_pdu::rdp::capability_sets::MajorPlatformType;
use autordp_pdu::PduHint;

pub use autordp_core::WriteBuf;
pub use channel_connection::{ChannelConnectionSequence, ChannelConnectionState};
pub use connection::{ClientConnector, ClientConnectorState, ConnectionResult, DEFAULT_POINTER_CACHE_SIZE};
pub use connection_finalization::{ConnectionFinalizationSequence, ConnectionFinalizationState};
pub use credssp::CredSspSequence;
pub use io_channel::{
    decode_send_data_indication, decode_share_control, decode_share_data, encode_send_data_request,
    encode_share_control, encode_share_data, encode_x224_packet, SendDataIndicationCtx, ShareControlCtx, ShareDataCtx,
};
pub use license_exchange::{LicenseExchangeSequence, LicenseExchangeState};
pub use server_name::ServerName;
pub use sspi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopSize {
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Everything the connection sequence needs to know up front.
#[derive(Debug, Clone)]
pub struct Config {
    pub desktop_size: DesktopSize,
    /// One of 16, 24 or 32.
    pub color_depth: u32,
    pub credentials: Credentials,
    pub autologon: bool,
    /// Desktop wallpaper is rendered by the server when enabled; automation
    /// sessions usually keep it off to cut bitmap traffic.
    pub enable_wallpaper: bool,
    pub enable_fast_path_input: bool,
    /// Names of static virtual channels to request at MCS level.
    pub static_channels: Vec<String>,
    /// The build number of the client.
    pub client_build: u32,
    /// Name of the client computer, truncated to 15 characters.
    pub client_name: String,
    pub keyboard_type: KeyboardType,
    pub keyboard_subtype: u32,
    pub keyboard_functional_keys_count: u32,
    pub ime_file_name: String,
    pub dig_product_id: String,
    pub client_dir: String,
    pub platform: MajorPlatformType,
}

/// One state of a [`Sequence`].
pub trait State: Send + core::fmt::Debug {
    fn name(&self) -> &'static str;
    fn is_terminal(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

autordp_core::assert_obj_safe!(State);

impl State for () {
    fn name(&self) -> &'static str {
        "()"
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Bytes written into the output buffer by a single [`Sequence::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Written {
    Nothing,
    Size(core::num::NonZeroUsize),
}

impl Written {
    #[inline]
    pub fn from_size(value: usize) -> ConnectorResult<Self> {
        core::num::NonZeroUsize::new(value)
            .map(Self::Size)
            .ok_or_else(|| ConnectorError::general("invalid written length (can’t be zero)"))
    }

    #[inline]
    pub fn is_nothing(self) -> bool {
        matches!(self, Self::Nothing)
    }

    #[inline]
    pub fn size(self) -> Option<usize> {
        if let Self::Size(size) = self {
            Some(size.get())
        } else {
            None
        }
    }
}

/// A sans-I/O sub-sequence of the connection procedure, driven by a transport
/// reader which provides the next PDU sized by `next_pdu_hint()`.
pub trait Sequence: Send {
    fn next_pdu_hint(&self) -> Option<&dyn PduHint>;

    fn state(&self) -> &dyn State;

    fn step(&mut self, input: &[u8], output: &mut WriteBuf) -> ConnectorResult<Written>;

    fn step_no_input(&mut self, output: &mut WriteBuf) -> ConnectorResult<Written> {
        self.step(&[], output)
    }
}

autordp_core::assert_obj_safe!(Sequence);

pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[non_exhaustive]
#[derive(Debug)]
pub enum ConnectorErrorKind {
    Encode(autordp_core::EncodeError),
    Decode(autordp_core::DecodeError),
    Credssp(sspi::Error),
    License { code: u32, description: &'static str },
    Capability,
    AccessDenied,
    Reason(String),
    General,
    Custom,
}

impl fmt::Display for ConnectorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            ConnectorErrorKind::Encode(_) => write!(f, "encode error"),
            ConnectorErrorKind::Decode(_) => write!(f, "decode error"),
            ConnectorErrorKind::Credssp(_) => write!(f, "CredSSP"),
            ConnectorErrorKind::License { code, description } => {
                write!(f, "license error: {description} (0x{code:08X})")
            }
            ConnectorErrorKind::Capability => write!(f, "capability negotiation"),
            ConnectorErrorKind::AccessDenied => write!(f, "access denied"),
            ConnectorErrorKind::Reason(description) => write!(f, "reason: {description}"),
            ConnectorErrorKind::General => write!(f, "general"),
            ConnectorErrorKind::Custom => write!(f, "custom"),
        }
    }
}

impl std::error::Error for ConnectorErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self {
            ConnectorErrorKind::Encode(e) => Some(e),
            ConnectorErrorKind::Decode(e) => Some(e),
            ConnectorErrorKind::Credssp(e) => Some(e),
            _ => None,
        }
    }
}

pub type ConnectorError = autordp_core::Error<ConnectorErrorKind>;

pub trait ConnectorErrorExt {
    fn encode(error: autordp_core::EncodeError) -> Self;
    fn decode(error: autordp_core::DecodeError) -> Self;
    fn general(context: &'static str) -> Self;
    fn reason(context: &'static str, reason: impl Into<String>) -> Self;
    fn custom<E>(context: &'static str, e: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static;
}

impl ConnectorErrorExt for ConnectorError {
    fn encode(error: autordp_core::EncodeError) -> Self {
        Self::new("invalid payload", ConnectorErrorKind::Encode(error))
    }

    fn decode(error: autordp_core::DecodeError) -> Self {
        Self::new("invalid payload", ConnectorErrorKind::Decode(error))
    }

    fn general(context: &'static str) -> Self {
        Self::new(context, ConnectorErrorKind::General)
    }

    fn reason(context: &'static str, reason: impl Into<String>) -> Self {
        Self::new(context, ConnectorErrorKind::Reason(reason.into()))
    }

    fn custom<E>(context: &'static str, e: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static,
    {
        Self::new(context, ConnectorErrorKind::Custom).with_source(e)
    }
}

pub trait ConnectorResultExt {
    #[must_use]
    fn with_context(self, context: &'static str) -> Self;
}

impl<T> ConnectorResultExt for ConnectorResult<T> {
    fn with_context(self, context: &'static str) -> Self {
        self.map_err(|mut e| {
            e.context = context;
            e
        })
    }
}
