//! Slow-path (X.224 / MCS) dispatch while the session is active.

use autordp_core::decode;
use autordp_pdu::mcs::{DisconnectReason, McsMessage};
use autordp_pdu::pointer::decode_slow_path_pointer;
use autordp_pdu::rdp::headers::{ShareControlPdu, ShareDataPdu};
use autordp_pdu::rdp::server_error_info::ServerSetErrorInfoPdu;
use autordp_pdu::update::Update;
use autordp_pdu::x224::X224;

use crate::apply::UpdateApplier;
use crate::image::FrameBuffer;
use crate::pointer::PointerState;
use crate::{SessionError, SessionErrorExt as _, SessionResult, UpdateKind};

/// The result of one slow-path PDU.
#[derive(Debug, Clone, PartialEq)]
pub enum X224Outcome {
    Updates(Vec<UpdateKind>),
    Disconnect(DisconnectReason),
    Nothing,
}

/// Processor for inbound slow-path PDUs during the active stage.
pub struct Processor {
    io_channel_id: u16,
}

impl Processor {
    pub fn new(io_channel_id: u16) -> Self {
        Self { io_channel_id }
    }

    pub fn process(
        &mut self,
        applier: &mut UpdateApplier,
        image: &mut FrameBuffer,
        pointer: &mut PointerState,
        frame: &[u8],
    ) -> SessionResult<X224Outcome> {
        let mcs_msg: X224<McsMessage<'_>> = decode(frame).map_err(SessionError::decode)?;

        match mcs_msg.0 {
            McsMessage::SendDataIndication(indication) => {
                if indication.channel_id != self.io_channel_id {
                    debug!(
                        channel_id = indication.channel_id,
                        length = indication.user_data.len(),
                        "Dropping data received on a virtual channel"
                    );
                    return Ok(X224Outcome::Nothing);
                }

                self.process_io_channel(applier, image, pointer, &indication.user_data)
            }
            McsMessage::DisconnectProviderUltimatum(ultimatum) => {
                info!(reason = %ultimatum.reason, "Server disconnected the session");
                Ok(X224Outcome::Disconnect(ultimatum.reason))
            }
            other => {
                use autordp_pdu::mcs::McsPdu as _;
                Err(reason_err!("X224", "unexpected MCS message: {}", other.name()))
            }
        }
    }

    fn process_io_channel(
        &mut self,
        applier: &mut UpdateApplier,
        image: &mut FrameBuffer,
        pointer: &mut PointerState,
        user_data: &[u8],
    ) -> SessionResult<X224Outcome> {
        use autordp_pdu::rdp::headers::ShareControlHeader;

        let share_control: ShareControlHeader = decode(user_data).map_err(SessionError::decode)?;

        match share_control.share_control_pdu {
            ShareControlPdu::Data(share_data_header) => {
                self.process_share_data(applier, image, pointer, share_data_header.share_data_pdu)
            }
            ShareControlPdu::ServerDeactivateAll(_) => {
                // Capability re-negotiation (resolution change, reconnect) is
                // not part of this client's lifecycle; end the session
                // instead of presenting a buffer of a different size.
                warn!("Server deactivated the session; terminating");
                Ok(X224Outcome::Disconnect(DisconnectReason::ProviderInitiated))
            }
            other => Err(reason_err!("X224", "unexpected share control PDU: {}", other.as_short_name())),
        }
    }

    fn process_share_data(
        &mut self,
        applier: &mut UpdateApplier,
        image: &mut FrameBuffer,
        pointer: &mut PointerState,
        pdu: ShareDataPdu,
    ) -> SessionResult<X224Outcome> {
        match pdu {
            ShareDataPdu::Update(payload) => {
                let update: Update<'_> = decode(&payload).map_err(SessionError::decode)?;

                let kind = match update {
                    Update::Orders(data) => {
                        debug!(length = data.len(), "Ignoring a slow-path orders update");
                        UpdateKind::None
                    }
                    Update::Bitmap(bitmap_update) => applier
                        .apply_bitmap_update(image, &bitmap_update)?
                        .map(UpdateKind::Region)
                        .unwrap_or(UpdateKind::None),
                    Update::Palette(palette_update) => {
                        applier.apply_palette(&palette_update);
                        UpdateKind::None
                    }
                    Update::Synchronize => UpdateKind::None,
                };

                Ok(X224Outcome::Updates(vec![kind]))
            }
            ShareDataPdu::Pointer(payload) => {
                let mut src = autordp_core::ReadCursor::new(&payload);
                let pointer_update = decode_slow_path_pointer(&mut src).map_err(SessionError::decode)?;
                let kind = applier.apply_pointer_update(pointer, &pointer_update)?;

                Ok(X224Outcome::Updates(vec![kind]))
            }
            ShareDataPdu::SaveSessionInfo(info) => {
                info!(info_type = info.info_type.description(), "Session information saved");
                Ok(X224Outcome::Nothing)
            }
            ShareDataPdu::ServerSetErrorInfo(ServerSetErrorInfoPdu(error_info)) => {
                if error_info.is_none() {
                    Ok(X224Outcome::Nothing)
                } else {
                    error!(%error_info, "Server reported an error");
                    Err(reason_err!("ServerSetErrorInfo", "{error_info}"))
                }
            }
            ShareDataPdu::ShutdownDenied => {
                // The server wants the client to drive the disconnect.
                debug!("Server denied shutdown; disconnecting on our side");
                Ok(X224Outcome::Disconnect(DisconnectReason::UserRequested))
            }
            ShareDataPdu::Synchronize(_) | ShareDataPdu::Control(_) | ShareDataPdu::FontMap(_) => {
                Ok(X224Outcome::Nothing)
            }
            other => {
                debug!(name = other.as_short_name(), "Ignoring an unhandled share data PDU");
                Ok(X224Outcome::Nothing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use autordp_core::encode_vec;
    use autordp_pdu::mcs::SendDataIndication;
    use autordp_pdu::rdp::server_error_info::ErrorInfo;

    use super::*;

    fn wrap_share_data(pdu: ShareDataPdu) -> Vec<u8> {
        use autordp_pdu::rdp::client_info::CompressionType;
        use autordp_pdu::rdp::headers::{CompressionFlags, ShareControlHeader, ShareDataHeader, StreamPriority};

        let header = ShareControlHeader {
            share_control_pdu: ShareControlPdu::Data(ShareDataHeader {
                share_data_pdu: pdu,
                stream_priority: StreamPriority::Medium,
                compression_flags: CompressionFlags::empty(),
                compression_type: CompressionType::K8,
            }),
            pdu_source: 1002,
            share_id: 66538,
        };
        let user_data = encode_vec(&header).unwrap();

        encode_vec(&X224(SendDataIndication {
            initiator_id: 1002,
            channel_id: 1003,
            user_data: Cow::Owned(user_data),
        }))
        .unwrap()
    }

    fn processor_parts() -> (Processor, UpdateApplier, FrameBuffer, PointerState) {
        (
            Processor::new(1003),
            UpdateApplier::default(),
            FrameBuffer::new(4, 4),
            PointerState::new(25),
        )
    }

    #[test]
    fn disconnect_ultimatum_terminates() {
        let (mut processor, mut applier, mut image, mut pointer) = processor_parts();

        let frame = encode_vec(&X224(autordp_pdu::mcs::DisconnectProviderUltimatum::from_reason(
            DisconnectReason::ProviderInitiated,
        )))
        .unwrap();

        let outcome = processor.process(&mut applier, &mut image, &mut pointer, &frame).unwrap();
        assert_eq!(outcome, X224Outcome::Disconnect(DisconnectReason::ProviderInitiated));
    }

    #[test]
    fn virtual_channel_traffic_is_dropped() {
        let (mut processor, mut applier, mut image, mut pointer) = processor_parts();

        let frame = encode_vec(&X224(SendDataIndication {
            initiator_id: 1002,
            channel_id: 1005,
            user_data: Cow::Borrowed(&[0x01, 0x02, 0x03]),
        }))
        .unwrap();

        let outcome = processor.process(&mut applier, &mut image, &mut pointer, &frame).unwrap();
        assert_eq!(outcome, X224Outcome::Nothing);
    }

    #[test]
    fn error_info_none_is_ignored() {
        let (mut processor, mut applier, mut image, mut pointer) = processor_parts();

        let frame = wrap_share_data(ShareDataPdu::ServerSetErrorInfo(ServerSetErrorInfoPdu(ErrorInfo::NONE)));
        let outcome = processor.process(&mut applier, &mut image, &mut pointer, &frame).unwrap();
        assert_eq!(outcome, X224Outcome::Nothing);
    }

    #[test]
    fn error_info_code_is_fatal() {
        let (mut processor, mut applier, mut image, mut pointer) = processor_parts();

        let frame = wrap_share_data(ShareDataPdu::ServerSetErrorInfo(ServerSetErrorInfoPdu(
            ErrorInfo::RPC_INITIATED_DISCONNECT,
        )));
        assert!(processor.process(&mut applier, &mut image, &mut pointer, &frame).is_err());
    }

    #[test]
    fn slow_path_pointer_position_applies() {
        let (mut processor, mut applier, mut image, mut pointer) = processor_parts();

        let frame = wrap_share_data(ShareDataPdu::Pointer(vec![
            0x03, 0x00, 0x00, 0x00, // TS_PTRMSGTYPE_POSITION
            0x0A, 0x00, 0x14, 0x00, // x = 10, y = 20
        ]));

        let outcome = processor.process(&mut applier, &mut image, &mut pointer, &frame).unwrap();
        assert_eq!(outcome, X224Outcome::Updates(vec![UpdateKind::PointerPosition { x: 10, y: 20 }]));
        assert_eq!(pointer.position(), (10, 20));
    }
}
