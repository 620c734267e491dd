//! MCS channel connection: erect domain, attach user, then one join per
//! channel ([MS-RDPBCGR] 1.3.1.1 steps 5 – 9).

use std::mem;

use autordp_core::{encode_buf, WriteBuf};
use autordp_pdu::x224::X224;
use autordp_pdu::{mcs, PduHint};

use crate::{ConnectorError, ConnectorErrorExt as _, ConnectorResult, Sequence, State, Written};

#[derive(Default, Debug)]
#[non_exhaustive]
pub enum ChannelConnectionState {
    #[default]
    Consumed,

    SendErectDomainRequest,
    SendAttachUserRequest,
    WaitAttachUserConfirm,
    SendChannelJoinRequest {
        user_channel_id: u16,
        index: usize,
    },
    WaitChannelJoinConfirm {
        user_channel_id: u16,
        index: usize,
    },
    AllJoined {
        user_channel_id: u16,
    },
}

impl State for ChannelConnectionState {
    fn name(&self) -> &'static str {
        match self {
            Self::Consumed => "Consumed",
            Self::SendErectDomainRequest => "SendErectDomainRequest",
            Self::SendAttachUserRequest => "SendAttachUserRequest",
            Self::WaitAttachUserConfirm => "WaitAttachUserConfirm",
            Self::SendChannelJoinRequest { .. } => "SendChannelJoinRequest",
            Self::WaitChannelJoinConfirm { .. } => "WaitChannelJoinConfirm",
            Self::AllJoined { .. } => "AllJoined",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::AllJoined { .. })
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

#[derive(Debug)]
pub struct ChannelConnectionSequence {
    pub state: ChannelConnectionState,
    pub channel_ids: Vec<u16>,
}

impl ChannelConnectionSequence {
    pub fn new(io_channel_id: u16, mut channel_ids: Vec<u16>) -> Self {
        // The I/O channel must be joined as well.
        channel_ids.push(io_channel_id);

        Self {
            state: ChannelConnectionState::SendErectDomainRequest,
            channel_ids,
        }
    }
}

impl Sequence for ChannelConnectionSequence {
    fn next_pdu_hint(&self) -> Option<&dyn PduHint> {
        match self.state {
            ChannelConnectionState::Consumed => None,
            ChannelConnectionState::SendErectDomainRequest => None,
            ChannelConnectionState::SendAttachUserRequest => None,
            ChannelConnectionState::WaitAttachUserConfirm => Some(&autordp_pdu::X224_HINT),
            ChannelConnectionState::SendChannelJoinRequest { .. } => None,
            ChannelConnectionState::WaitChannelJoinConfirm { .. } => Some(&autordp_pdu::X224_HINT),
            ChannelConnectionState::AllJoined { .. } => None,
        }
    }

    fn state(&self) -> &dyn State {
        &self.state
    }

    fn step(&mut self, input: &[u8], output: &mut WriteBuf) -> ConnectorResult<Written> {
        let (written, next_state) = match mem::take(&mut self.state) {
            ChannelConnectionState::Consumed => {
                return Err(general_err!("channel connection sequence state is consumed (this is a bug)"))
            }

            ChannelConnectionState::SendErectDomainRequest => {
                let erect_domain_request = mcs::ErectDomainPdu {
                    sub_height: 0,
                    sub_interval: 0,
                };

                debug!(message = ?erect_domain_request, "Send");

                let written = encode_buf(&X224(erect_domain_request), output).map_err(ConnectorError::encode)?;

                (Written::from_size(written)?, ChannelConnectionState::SendAttachUserRequest)
            }

            ChannelConnectionState::SendAttachUserRequest => {
                let attach_user_request = mcs::AttachUserRequest;

                debug!(message = ?attach_user_request, "Send");

                let written = encode_buf(&X224(attach_user_request), output).map_err(ConnectorError::encode)?;

                (Written::from_size(written)?, ChannelConnectionState::WaitAttachUserConfirm)
            }

            ChannelConnectionState::WaitAttachUserConfirm => {
                let attach_user_confirm: X224<mcs::AttachUserConfirm> =
                    autordp_core::decode(input).map_err(ConnectorError::decode)?;
                let attach_user_confirm = attach_user_confirm.0;

                if attach_user_confirm.result != 0 {
                    return Err(reason_err!(
                        "AttachUserConfirm",
                        "server rejected the attach user request (result {})",
                        attach_user_confirm.result
                    ));
                }

                let user_channel_id = attach_user_confirm.initiator_id;

                debug!(message = ?attach_user_confirm, user_channel_id, "Received");

                debug_assert!(!self.channel_ids.is_empty());

                (
                    Written::Nothing,
                    ChannelConnectionState::SendChannelJoinRequest {
                        user_channel_id,
                        index: 0,
                    },
                )
            }

            // Join requests are sent one at a time: a batch join would be
            // faster, but older servers reject it.
            ChannelConnectionState::SendChannelJoinRequest { user_channel_id, index } => {
                let channel_id = self.channel_ids[index];

                let channel_join_request = mcs::ChannelJoinRequest {
                    initiator_id: user_channel_id,
                    channel_id,
                };

                debug!(message = ?channel_join_request, "Send");

                let written = encode_buf(&X224(channel_join_request), output).map_err(ConnectorError::encode)?;

                (
                    Written::from_size(written)?,
                    ChannelConnectionState::WaitChannelJoinConfirm { user_channel_id, index },
                )
            }

            ChannelConnectionState::WaitChannelJoinConfirm { user_channel_id, index } => {
                let channel_id = self.channel_ids[index];

                let channel_join_confirm: X224<mcs::ChannelJoinConfirm> =
                    autordp_core::decode(input).map_err(ConnectorError::decode)?;
                let channel_join_confirm = channel_join_confirm.0;

                debug!(message = ?channel_join_confirm, "Received");

                if channel_join_confirm.result != 0
                    || channel_join_confirm.initiator_id != user_channel_id
                    || channel_join_confirm.channel_id != channel_join_confirm.requested_channel_id
                    || channel_join_confirm.channel_id != channel_id
                {
                    return Err(general_err!("received bad MCS Channel Join Confirm"));
                }

                let next_index = index + 1;

                let next_state = if next_index == self.channel_ids.len() {
                    ChannelConnectionState::AllJoined { user_channel_id }
                } else {
                    ChannelConnectionState::SendChannelJoinRequest {
                        user_channel_id,
                        index: next_index,
                    }
                };

                (Written::Nothing, next_state)
            }

            ChannelConnectionState::AllJoined { .. } => return Err(general_err!("all channels are already joined")),
        };

        self.state = next_state;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use autordp_core::encode_vec;

    use super::*;

    fn run_until_wait(sequence: &mut ChannelConnectionSequence, output: &mut WriteBuf) {
        while sequence.next_pdu_hint().is_none() && !sequence.state.is_terminal() {
            output.clear();
            sequence.step_no_input(output).unwrap();
        }
    }

    #[test]
    fn joins_every_channel_in_order() {
        let mut sequence = ChannelConnectionSequence::new(1003, vec![1004, 1005]);
        let mut output = WriteBuf::new();

        run_until_wait(&mut sequence, &mut output);
        assert_eq!(sequence.state.name(), "WaitAttachUserConfirm");

        let confirm = encode_vec(&X224(mcs::AttachUserConfirm {
            result: 0,
            initiator_id: 1007,
        }))
        .unwrap();
        output.clear();
        sequence.step(&confirm, &mut output).unwrap();

        for &channel_id in &[1004u16, 1005, 1003] {
            run_until_wait(&mut sequence, &mut output);
            assert_eq!(sequence.state.name(), "WaitChannelJoinConfirm");

            let confirm = encode_vec(&X224(mcs::ChannelJoinConfirm {
                result: 0,
                initiator_id: 1007,
                requested_channel_id: channel_id,
                channel_id,
            }))
            .unwrap();
            output.clear();
            sequence.step(&confirm, &mut output).unwrap();
        }

        assert!(sequence.state.is_terminal());
        assert!(matches!(
            sequence.state,
            ChannelConnectionState::AllJoined { user_channel_id: 1007 }
        ));
    }

    #[test]
    fn mismatched_join_confirm_is_rejected() {
        let mut sequence = ChannelConnectionSequence::new(1003, vec![]);
        let mut output = WriteBuf::new();

        run_until_wait(&mut sequence, &mut output);
        let confirm = encode_vec(&X224(mcs::AttachUserConfirm {
            result: 0,
            initiator_id: 1007,
        }))
        .unwrap();
        output.clear();
        sequence.step(&confirm, &mut output).unwrap();

        run_until_wait(&mut sequence, &mut output);

        let confirm = encode_vec(&X224(mcs::ChannelJoinConfirm {
            result: 0,
            initiator_id: 1007,
            requested_channel_id: 1004,
            channel_id: 1004,
        }))
        .unwrap();
        output.clear();
        assert!(sequence.step(&confirm, &mut output).is_err());
    }
}
