//! Encode/decode helpers for the PDUs travelling on the MCS I/O channel.

use std::borrow::Cow;

use autordp_core::{decode, encode_buf, encode_vec, Decode, Encode, WriteBuf, WriteCursor};
use autordp_pdu::mcs::{McsMessage, SendDataRequest};
use autordp_pdu::rdp::headers::{
    CompressionFlags, ShareControlHeader, ShareControlPdu, ShareDataHeader, ShareDataPdu, StreamPriority,
};
use autordp_pdu::rdp::client_info::CompressionType;
use autordp_pdu::tpdu::{TpduCode, TpduHeader};
use autordp_pdu::tpkt::TpktHeader;
use autordp_pdu::x224::X224;

use crate::{ConnectorError, ConnectorErrorExt as _, ConnectorResult};

/// Wraps an already-encodable message into TPKT + X.224 Data framing.
///
/// Used for the MCS connect PDUs, which are not regular domain PDUs.
pub fn encode_x224_packet<T: Encode>(msg: &T, buf: &mut WriteBuf) -> ConnectorResult<usize> {
    let msg_size = msg.size();
    let packet_size = TpktHeader::SIZE + TpduHeader::DATA_FIXED_PART_SIZE + msg_size;

    let dst = buf.unfilled_to(packet_size);
    let mut cursor = WriteCursor::new(dst);

    TpktHeader {
        packet_length: u16::try_from(packet_size).map_err(|e| custom_err!("packetLength", e))?,
    }
    .write(&mut cursor)
    .map_err(ConnectorError::encode)?;

    TpduHeader {
        li: (TpduHeader::DATA_FIXED_PART_SIZE - 1) as u8,
        code: TpduCode::DATA,
    }
    .write(&mut cursor)
    .map_err(ConnectorError::encode)?;

    msg.encode(&mut cursor).map_err(ConnectorError::encode)?;

    buf.advance(packet_size);

    Ok(packet_size)
}

/// Unwraps TPKT + X.224 Data framing and decodes the payload.
pub fn decode_x224_packet<'de, T: Decode<'de>>(input: &'de [u8]) -> ConnectorResult<T> {
    let mut cursor = autordp_core::ReadCursor::new(input);

    let tpkt = TpktHeader::read(&mut cursor).map_err(ConnectorError::decode)?;
    let tpdu = TpduHeader::read(&mut cursor, &tpkt).map_err(ConnectorError::decode)?;
    tpdu.code.check_expected(TpduCode::DATA).map_err(ConnectorError::decode)?;

    T::decode(&mut cursor).map_err(ConnectorError::decode)
}

/// Encodes `user_msg` into an MCS `SendDataRequest` on the given channel.
pub fn encode_send_data_request<T>(
    initiator_id: u16,
    channel_id: u16,
    user_msg: &T,
    buf: &mut WriteBuf,
) -> ConnectorResult<usize>
where
    T: Encode,
{
    let user_data = encode_vec(user_msg).map_err(ConnectorError::encode)?;

    let pdu = SendDataRequest {
        initiator_id,
        channel_id,
        user_data: Cow::Owned(user_data),
    };

    let written = encode_buf(&X224(pdu), buf).map_err(ConnectorError::encode)?;

    Ok(written)
}

#[derive(Debug, Clone, Copy)]
pub struct SendDataIndicationCtx<'a> {
    pub initiator_id: u16,
    pub channel_id: u16,
    pub user_data: &'a [u8],
}

impl<'a> SendDataIndicationCtx<'a> {
    pub fn decode_user_data<'de, T>(&self) -> ConnectorResult<T>
    where
        T: Decode<'de>,
        'a: 'de,
    {
        decode::<T>(self.user_data).map_err(ConnectorError::decode)
    }
}

/// Decodes an MCS `SendDataIndication`, rejecting every other domain PDU.
pub fn decode_send_data_indication(src: &[u8]) -> ConnectorResult<SendDataIndicationCtx<'_>> {
    let mcs_msg = decode::<X224<McsMessage<'_>>>(src).map_err(ConnectorError::decode)?;

    match mcs_msg.0 {
        McsMessage::SendDataIndication(msg) => {
            let Cow::Borrowed(user_data) = msg.user_data else {
                unreachable!("user data is borrowed from the input buffer")
            };

            Ok(SendDataIndicationCtx {
                initiator_id: msg.initiator_id,
                channel_id: msg.channel_id,
                user_data,
            })
        }
        McsMessage::DisconnectProviderUltimatum(msg) => Err(reason_err!(
            "SendDataIndication",
            "received disconnect provider ultimatum: {}",
            msg.reason
        )),
        other => Err(reason_err!("SendDataIndication", "unexpected MCS message: {}", {
            use autordp_pdu::mcs::McsPdu as _;
            other.name()
        })),
    }
}

pub fn encode_share_control(
    initiator_id: u16,
    channel_id: u16,
    share_id: u32,
    pdu: ShareControlPdu,
    buf: &mut WriteBuf,
) -> ConnectorResult<usize> {
    let share_control_header = ShareControlHeader {
        share_control_pdu: pdu,
        pdu_source: initiator_id,
        share_id,
    };

    encode_send_data_request(initiator_id, channel_id, &share_control_header, buf)
}

#[derive(Debug, Clone)]
pub struct ShareControlCtx {
    pub initiator_id: u16,
    pub channel_id: u16,
    pub share_id: u32,
    pub pdu_source: u16,
    pub pdu: ShareControlPdu,
}

pub fn decode_share_control(ctx: SendDataIndicationCtx<'_>) -> ConnectorResult<ShareControlCtx> {
    let user_msg = ctx.decode_user_data::<ShareControlHeader>()?;

    Ok(ShareControlCtx {
        initiator_id: ctx.initiator_id,
        channel_id: ctx.channel_id,
        share_id: user_msg.share_id,
        pdu_source: user_msg.pdu_source,
        pdu: user_msg.share_control_pdu,
    })
}

pub fn encode_share_data(
    initiator_id: u16,
    channel_id: u16,
    share_id: u32,
    pdu: ShareDataPdu,
    buf: &mut WriteBuf,
) -> ConnectorResult<usize> {
    let share_data_header = ShareDataHeader {
        share_data_pdu: pdu,
        stream_priority: StreamPriority::Medium,
        compression_flags: CompressionFlags::empty(),
        compression_type: CompressionType::K8, // ignored with empty compression flags
    };

    encode_share_control(initiator_id, channel_id, share_id, ShareControlPdu::Data(share_data_header), buf)
}

#[derive(Debug, Clone)]
pub struct ShareDataCtx {
    pub initiator_id: u16,
    pub channel_id: u16,
    pub share_id: u32,
    pub pdu_source: u16,
    pub pdu: ShareDataPdu,
}

pub fn decode_share_data(ctx: SendDataIndicationCtx<'_>) -> ConnectorResult<ShareDataCtx> {
    let ctx = decode_share_control(ctx)?;

    let ShareControlPdu::Data(share_data_header) = ctx.pdu else {
        return Err(general_err!(
            "received unexpected Share Control PDU (expected Share Data Header)"
        ));
    };

    Ok(ShareDataCtx {
        initiator_id: ctx.initiator_id,
        channel_id: ctx.channel_id,
        share_id: ctx.share_id,
        pdu_source: ctx.pdu_source,
        pdu: share_data_header.share_data_pdu,
    })
}
