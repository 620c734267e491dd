#![doc = include_str!("../README.md")]

#[macro_use]
mod macros;

mod cursor;
mod decode;
mod encode;
mod error;
mod padding;
mod write_buf;

pub use cursor::{NotEnoughBytesError, ReadCursor, WriteCursor};
pub use decode::{decode, decode_cursor, Decode, DecodeError, DecodeErrorKind, DecodeOwned, DecodeResult};
pub use encode::{
    encode, encode_buf, encode_cursor, encode_vec, name, size, Encode, EncodeError, EncodeErrorKind, EncodeResult,
};
pub use error::{Error, ErrorReport, Source};
pub use padding::{read_padding, write_padding};
pub use write_buf::WriteBuf;

/// Error able to represent a "not enough bytes" condition.
pub trait NotEnoughBytesErr {
    fn not_enough_bytes(context: &'static str, received: usize, expected: usize) -> Self;
}

/// Error able to represent an invalid field.
pub trait InvalidFieldErr {
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self;
    fn invalid_field_with_source<E: Source>(
        context: &'static str,
        field: &'static str,
        reason: &'static str,
        source: E,
    ) -> Self;
}

/// Error able to represent an unexpected message type.
pub trait UnexpectedMessageTypeErr {
    fn unexpected_message_type(context: &'static str, got: u8) -> Self;
}

/// Error able to represent an unsupported protocol version.
pub trait UnsupportedVersionErr {
    fn unsupported_version(context: &'static str, got: u8) -> Self;
}

/// Error able to represent an unsupported value for a named field.
pub trait UnsupportedValueErr {
    fn unsupported_value(context: &'static str, name: &'static str, value: String) -> Self;
}

/// Catch-all error constructor.
pub trait OtherErr {
    fn other(context: &'static str, description: &'static str) -> Self;
    fn other_with_source<E: Source>(context: &'static str, description: &'static str, source: E) -> Self;
}

pub fn not_enough_bytes_err<E: NotEnoughBytesErr>(context: &'static str, received: usize, expected: usize) -> E {
    E::not_enough_bytes(context, received, expected)
}

pub fn invalid_field_err<E: InvalidFieldErr>(context: &'static str, field: &'static str, reason: &'static str) -> E {
    E::invalid_field(context, field, reason)
}

pub fn invalid_field_err_with_source<E: InvalidFieldErr, S: Source>(
    context: &'static str,
    field: &'static str,
    reason: &'static str,
    source: S,
) -> E {
    E::invalid_field_with_source(context, field, reason, source)
}

pub fn unexpected_message_type_err<E: UnexpectedMessageTypeErr>(context: &'static str, got: u8) -> E {
    E::unexpected_message_type(context, got)
}

pub fn unsupported_version_err<E: UnsupportedVersionErr>(context: &'static str, got: u8) -> E {
    E::unsupported_version(context, got)
}

pub fn unsupported_value_err<E: UnsupportedValueErr>(context: &'static str, name: &'static str, value: String) -> E {
    E::unsupported_value(context, name, value)
}

pub fn other_err<E: OtherErr>(context: &'static str, description: &'static str) -> E {
    E::other(context, description)
}

pub fn other_err_with_source<E: OtherErr, S: Source>(
    context: &'static str,
    description: &'static str,
    source: S,
) -> E {
    E::other_with_source(context, description, source)
}
