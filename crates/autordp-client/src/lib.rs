#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

mod config;
mod input;
mod screen;
mod session;

use core::fmt;

use autordp_connector::{ConnectorError, ConnectorErrorKind};
use autordp_session::SessionError;

pub use autordp_session::GracefulDisconnectReason;
pub use config::{ColorDepth, ConnectionConfig};
pub use input::MouseButton;
pub use screen::{PointerSnapshot, Snapshot};
pub use session::{connect, ActiveSession, SessionPhase};

pub type RdpResult<T> = Result<T, RdpError>;

/// The failure categories surfaced by this client.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdpErrorKind {
    /// Malformed or unexpected PDU, illegal state transition, codec failure.
    Protocol,
    /// CredSSP/NTLM rejection or mismatch.
    Authentication,
    /// A licensing outcome other than the valid-client response.
    Licensing,
    /// TCP/TLS failure, unexpected EOF or a missed deadline.
    Transport,
    /// The API was used before the session was active or after termination.
    /// The caller may retry once a session is active again.
    NotConnected,
    /// The server required a capability this client does not implement.
    Capability,
}

impl fmt::Display for RdpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdpErrorKind::Protocol => write!(f, "protocol error"),
            RdpErrorKind::Authentication => write!(f, "authentication error"),
            RdpErrorKind::Licensing => write!(f, "licensing error"),
            RdpErrorKind::Transport => write!(f, "transport error"),
            RdpErrorKind::NotConnected => write!(f, "not connected"),
            RdpErrorKind::Capability => write!(f, "capability error"),
        }
    }
}

impl std::error::Error for RdpErrorKind {}

pub type RdpError = autordp_core::Error<RdpErrorKind>;

pub(crate) fn connector_error(error: ConnectorError) -> RdpError {
    let kind = match error.kind() {
        ConnectorErrorKind::Credssp(_) | ConnectorErrorKind::AccessDenied => RdpErrorKind::Authentication,
        ConnectorErrorKind::License { .. } => RdpErrorKind::Licensing,
        ConnectorErrorKind::Capability => RdpErrorKind::Capability,
        // The transport driver funnels I/O and deadline failures through
        // custom errors.
        ConnectorErrorKind::Custom => RdpErrorKind::Transport,
        _ => RdpErrorKind::Protocol,
    };

    RdpError::new("connection", kind).with_source(error)
}

pub(crate) fn session_error(error: SessionError) -> RdpError {
    RdpError::new("session", RdpErrorKind::Protocol).with_source(error)
}

pub(crate) fn transport_error(context: &'static str, error: std::io::Error) -> RdpError {
    RdpError::new(context, RdpErrorKind::Transport).with_source(error)
}

pub(crate) fn not_connected(context: &'static str) -> RdpError {
    RdpError::new(context, RdpErrorKind::NotConnected)
}
