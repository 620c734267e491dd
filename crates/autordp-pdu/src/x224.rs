use autordp_core::{ensure_size, invalid_field_err, DecodeResult, EncodeResult, ReadCursor, WriteCursor};

use crate::tpdu::{TpduCode, TpduHeader};
use crate::tpkt::TpktHeader;

/// A PDU carried inside the TPKT + X.224 envelope.
///
/// Implementors describe their body only; the envelope (TPKT header, TPDU
/// header) is written and checked by the [`X224`] wrapper.
pub trait X224Pdu<'de>: Sized {
    const X224_NAME: &'static str;

    const TPDU_CODE: TpduCode;

    fn x224_body_encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()>;

    fn x224_body_decode(src: &mut ReadCursor<'de>, tpkt: &TpktHeader, tpdu: &TpduHeader) -> DecodeResult<Self>;

    fn tpdu_header_variable_part_size(&self) -> usize;

    fn tpdu_user_data_size(&self) -> usize;
}

/// Wrapper adding the TPKT + X.224 envelope around an [`X224Pdu`].
///
/// `X224(pdu)` implements `Encode`/`Decode` for every concrete PDU type in
/// this crate (see `impl_x224_pdu_pod!` / `impl_x224_pdu_borrowing!`).
pub struct X224<T>(pub T);

pub(crate) fn x224_encode<'de, T: X224Pdu<'de>>(pdu: &T, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
    let packet_length = x224_size(pdu);

    ensure_size!(ctx: T::X224_NAME, in: dst, size: packet_length);

    TpktHeader {
        packet_length: autordp_core::cast_length!(T::X224_NAME, "packetLength", packet_length)?,
    }
    .write(dst)?;

    TpduHeader {
        li: autordp_core::cast_length!(
            T::X224_NAME,
            "li",
            T::TPDU_CODE.header_fixed_part_size() + pdu.tpdu_header_variable_part_size() - 1
        )?,
        code: T::TPDU_CODE,
    }
    .write(dst)?;

    pdu.x224_body_encode(dst)
}

pub(crate) fn x224_size<'de, T: X224Pdu<'de>>(pdu: &T) -> usize {
    TpktHeader::SIZE
        + T::TPDU_CODE.header_fixed_part_size()
        + pdu.tpdu_header_variable_part_size()
        + pdu.tpdu_user_data_size()
}

pub(crate) fn x224_name<'de, T: X224Pdu<'de>>(_: &T) -> &'static str {
    T::X224_NAME
}

pub(crate) fn x224_decode<'de, T: X224Pdu<'de>>(src: &mut ReadCursor<'de>) -> DecodeResult<T> {
    let tpkt = TpktHeader::read(src)?;

    ensure_size!(ctx: T::X224_NAME, in: src, size: tpkt.packet_length().saturating_sub(TpktHeader::SIZE));

    let tpdu = TpduHeader::read(src, &tpkt)?;
    tpdu.code.check_expected(T::TPDU_CODE)?;

    if tpdu.size() < tpdu.fixed_part_size() {
        return Err(invalid_field_err(
            TpduHeader::NAME,
            "li",
            "fixed part bigger than total header size",
        ));
    }

    T::x224_body_decode(src, &tpkt, &tpdu)
}

/// Size of the user data following the TPDU header.
pub fn user_data_size(tpkt: &TpktHeader, tpdu: &TpduHeader) -> usize {
    tpkt.packet_length() - TpktHeader::SIZE - tpdu.size()
}

macro_rules! impl_x224_pdu_pod {
    ($ty:ty) => {
        impl autordp_core::Encode for $crate::x224::X224<$ty> {
            fn encode(&self, dst: &mut autordp_core::WriteCursor<'_>) -> autordp_core::EncodeResult<()> {
                $crate::x224::x224_encode(&self.0, dst)
            }

            fn name(&self) -> &'static str {
                $crate::x224::x224_name(&self.0)
            }

            fn size(&self) -> usize {
                $crate::x224::x224_size(&self.0)
            }
        }

        impl<'de> autordp_core::Decode<'de> for $crate::x224::X224<$ty> {
            fn decode(src: &mut autordp_core::ReadCursor<'de>) -> autordp_core::DecodeResult<Self> {
                $crate::x224::x224_decode(src).map($crate::x224::X224)
            }
        }
    };
}

macro_rules! impl_x224_pdu_borrowing {
    ($ty:ident) => {
        impl<'a> autordp_core::Encode for $crate::x224::X224<$ty<'a>> {
            fn encode(&self, dst: &mut autordp_core::WriteCursor<'_>) -> autordp_core::EncodeResult<()> {
                $crate::x224::x224_encode(&self.0, dst)
            }

            fn name(&self) -> &'static str {
                $crate::x224::x224_name(&self.0)
            }

            fn size(&self) -> usize {
                $crate::x224::x224_size(&self.0)
            }
        }

        impl<'de> autordp_core::Decode<'de> for $crate::x224::X224<$ty<'de>> {
            fn decode(src: &mut autordp_core::ReadCursor<'de>) -> autordp_core::DecodeResult<Self> {
                $crate::x224::x224_decode(src).map($crate::x224::X224)
            }
        }
    };
}

pub(crate) use {impl_x224_pdu_borrowing, impl_x224_pdu_pod};
