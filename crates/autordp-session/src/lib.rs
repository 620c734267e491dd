#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

#[macro_use]
mod macros;

pub mod apply;
pub mod fast_path;
pub mod image;
pub mod pointer;
pub mod x224;

mod active_stage;

use core::fmt;

use autordp_pdu::geometry::InclusiveRectangle;

pub use active_stage::{ActiveStage, ActiveStageOutput, GracefulDisconnectReason};

/// What applying a single decoded update changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    None,
    Region(InclusiveRectangle),
    PointerHidden,
    PointerDefault,
    PointerPosition { x: u16, y: u16 },
    PointerBitmap,
}

pub type SessionResult<T> = Result<T, SessionError>;

#[non_exhaustive]
#[derive(Debug)]
pub enum SessionErrorKind {
    Encode(autordp_core::EncodeError),
    Decode(autordp_core::DecodeError),
    Reason(String),
    General,
    Custom,
}

impl fmt::Display for SessionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SessionErrorKind::Encode(_) => write!(f, "encode error"),
            SessionErrorKind::Decode(_) => write!(f, "decode error"),
            SessionErrorKind::Reason(description) => write!(f, "reason: {description}"),
            SessionErrorKind::General => write!(f, "general error"),
            SessionErrorKind::Custom => write!(f, "custom error"),
        }
    }
}

impl std::error::Error for SessionErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self {
            SessionErrorKind::Encode(e) => Some(e),
            SessionErrorKind::Decode(e) => Some(e),
            _ => None,
        }
    }
}

pub type SessionError = autordp_core::Error<SessionErrorKind>;

pub trait SessionErrorExt {
    fn encode(error: autordp_core::EncodeError) -> Self;
    fn decode(error: autordp_core::DecodeError) -> Self;
    fn general(context: &'static str) -> Self;
    fn reason(context: &'static str, reason: impl Into<String>) -> Self;
    fn custom<E>(context: &'static str, e: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static;
    fn connector(error: autordp_connector::ConnectorError) -> Self;
}

impl SessionErrorExt for SessionError {
    fn encode(error: autordp_core::EncodeError) -> Self {
        Self::new("encode error", SessionErrorKind::Encode(error))
    }

    fn decode(error: autordp_core::DecodeError) -> Self {
        Self::new("decode error", SessionErrorKind::Decode(error))
    }

    fn general(context: &'static str) -> Self {
        Self::new(context, SessionErrorKind::General)
    }

    fn reason(context: &'static str, reason: impl Into<String>) -> Self {
        Self::new(context, SessionErrorKind::Reason(reason.into()))
    }

    fn custom<E>(context: &'static str, e: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static,
    {
        Self::new(context, SessionErrorKind::Custom).with_source(e)
    }

    fn connector(error: autordp_connector::ConnectorError) -> Self {
        Self::new("connector", SessionErrorKind::Custom).with_source(error)
    }
}
