//! Client licensing exchange.
//!
//! With network level authentication the server answers the Client Info PDU
//! with a licensing error message carrying `STATUS_VALID_CLIENT`, which ends
//! licensing successfully. Any other licensing outcome is surfaced as a
//! license error; the MS-RDPELE challenge/upgrade machinery is out of scope
//! for this client.

use std::mem;

use autordp_core::WriteBuf;
use autordp_pdu::rdp::server_license::{LicenseErrorCode, LicensePdu, StateTransition};
use autordp_pdu::PduHint;

use crate::{io_channel, ConnectorError, ConnectorErrorKind, ConnectorResult, Sequence, State, Written};

#[derive(Default, Debug)]
#[non_exhaustive]
pub enum LicenseExchangeState {
    #[default]
    Consumed,

    WaitLicenseMessage,
    LicenseExchanged,
}

impl State for LicenseExchangeState {
    fn name(&self) -> &'static str {
        match self {
            Self::Consumed => "Consumed",
            Self::WaitLicenseMessage => "WaitLicenseMessage",
            Self::LicenseExchanged => "LicenseExchanged",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::LicenseExchanged)
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

#[derive(Debug)]
pub struct LicenseExchangeSequence {
    pub state: LicenseExchangeState,
    pub io_channel_id: u16,
}

impl LicenseExchangeSequence {
    pub fn new(io_channel_id: u16) -> Self {
        Self {
            state: LicenseExchangeState::WaitLicenseMessage,
            io_channel_id,
        }
    }
}

impl Sequence for LicenseExchangeSequence {
    fn next_pdu_hint(&self) -> Option<&dyn PduHint> {
        match self.state {
            LicenseExchangeState::WaitLicenseMessage => Some(&autordp_pdu::X224_HINT),
            _ => None,
        }
    }

    fn state(&self) -> &dyn State {
        &self.state
    }

    fn step(&mut self, input: &[u8], _output: &mut WriteBuf) -> ConnectorResult<Written> {
        let next_state = match mem::take(&mut self.state) {
            LicenseExchangeState::Consumed => {
                return Err(general_err!("license exchange sequence state is consumed (this is a bug)"))
            }

            LicenseExchangeState::WaitLicenseMessage => {
                let ctx = io_channel::decode_send_data_indication(input)?;

                if ctx.channel_id != self.io_channel_id {
                    warn!(
                        io_channel_id = self.io_channel_id,
                        channel_id = ctx.channel_id,
                        "Unexpected channel ID for received license message"
                    );
                }

                let license_pdu = ctx.decode_user_data::<LicensePdu>()?;

                match license_pdu {
                    LicensePdu::LicensingErrorMessage(message) => {
                        if message.error_code == LicenseErrorCode::STATUS_VALID_CLIENT {
                            if message.state_transition != StateTransition::NO_TRANSITION {
                                debug!(?message.state_transition, "Unusual state transition for a valid client");
                            }
                            info!("Server granted a valid-client license");
                            LicenseExchangeState::LicenseExchanged
                        } else {
                            return Err(ConnectorError::new(
                                "LicenseExchange",
                                ConnectorErrorKind::License {
                                    code: message.error_code.0,
                                    description: message.error_code.description(),
                                },
                            ));
                        }
                    }
                    LicensePdu::Other { msg_type } => {
                        return Err(ConnectorError::new(
                            "LicenseExchange",
                            ConnectorErrorKind::License {
                                code: u32::from(msg_type),
                                description: "server requires a license exchange, which is not supported",
                            },
                        ));
                    }
                }
            }

            LicenseExchangeState::LicenseExchanged => return Err(general_err!("license already exchanged")),
        };

        self.state = next_state;

        Ok(Written::Nothing)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use autordp_core::{encode_vec, WriteBuf};
    use autordp_pdu::mcs::SendDataIndication;
    use autordp_pdu::rdp::server_license::LicensingErrorMessage;
    use autordp_pdu::x224::X224;

    use super::*;

    fn license_indication(error_code: LicenseErrorCode) -> Vec<u8> {
        let license = LicensePdu::LicensingErrorMessage(LicensingErrorMessage {
            error_code,
            state_transition: StateTransition::NO_TRANSITION,
            error_info: Vec::new(),
        });

        let user_data = encode_vec(&license).unwrap();

        encode_vec(&X224(SendDataIndication {
            initiator_id: 1002,
            channel_id: 1003,
            user_data: Cow::Owned(user_data),
        }))
        .unwrap()
    }

    #[test]
    fn valid_client_completes_licensing() {
        let mut sequence = LicenseExchangeSequence::new(1003);
        let mut output = WriteBuf::new();

        let input = license_indication(LicenseErrorCode::STATUS_VALID_CLIENT);
        sequence.step(&input, &mut output).unwrap();

        assert!(sequence.state.is_terminal());
    }

    #[test]
    fn other_error_codes_fail_licensing() {
        let mut sequence = LicenseExchangeSequence::new(1003);
        let mut output = WriteBuf::new();

        let input = license_indication(LicenseErrorCode::NO_LICENSE);
        let error = sequence.step(&input, &mut output).unwrap_err();

        assert!(matches!(error.kind(), ConnectorErrorKind::License { .. }));
    }
}
