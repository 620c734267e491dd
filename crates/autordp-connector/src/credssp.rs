//! CredSSP (network level authentication) over the TLS-upgraded transport.
//!
//! The TSRequest exchange, NTLM message generation, public key binding and
//! TSCredentials delegation are all handled by the `sspi` crate; this module
//! drives its client state machine and frames the DER messages.

use autordp_core::WriteBuf;
use autordp_pdu::PduHint;
use sspi::credssp::{self, ClientState, CredSspClient};
use sspi::generator::{Generator, NetworkRequest};
use sspi::negotiate::ProtocolConfig;
use sspi::Username;

use crate::{Config, ConnectorError, ConnectorErrorKind, ConnectorResult, ServerName, Written};

#[derive(Clone, Copy, Debug)]
struct CredsspTsRequestHint;

const CREDSSP_TS_REQUEST_HINT: CredsspTsRequestHint = CredsspTsRequestHint;

impl PduHint for CredsspTsRequestHint {
    fn find_size(&self, bytes: &[u8]) -> autordp_core::DecodeResult<Option<usize>> {
        match credssp::TsRequest::read_length(bytes) {
            Ok(length) => Ok(Some(length)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(autordp_core::other_err!("CredsspTsRequestHint", source: e)),
        }
    }
}

pub type CredsspProcessGenerator<'a> = Generator<'a, NetworkRequest, sspi::Result<Vec<u8>>, sspi::Result<ClientState>>;

/// The TSRequest ping-pong, driven like any other [`crate::Sequence`] except
/// that message generation goes through [`CredSspSequence::process`].
#[derive(Debug)]
pub struct CredSspSequence {
    client: CredSspClient,
    next_request: Option<credssp::TsRequest>,
    state: CredSspState,
}

#[derive(Debug, PartialEq)]
enum CredSspState {
    Initial,
    ReplyNeeded,
    Finished,
}

impl CredSspSequence {
    pub fn next_pdu_hint(&self) -> Option<&dyn PduHint> {
        match self.state {
            CredSspState::Initial => None,
            CredSspState::ReplyNeeded => Some(&CREDSSP_TS_REQUEST_HINT),
            CredSspState::Finished => None,
        }
    }

    pub fn new(config: &Config, server_name: ServerName, server_public_key: Vec<u8>) -> ConnectorResult<Self> {
        let username = if let Some(domain) = &config.credentials.domain {
            format!("{}\\{}", domain, config.credentials.username)
        } else {
            config.credentials.username.clone()
        };

        let credentials = sspi::AuthIdentity {
            username: Username::parse(&username).map_err(|e| custom_err!("parsing username", e))?,
            password: config.credentials.password.clone().into(),
        };

        let server_name = server_name.into_inner();
        let service_principal_name = format!("TERMSRV/{}", &server_name);

        // NTLM through the SPNEGO negotiator, per MS-CSSP.
        let credssp_config: Box<dyn ProtocolConfig> = Box::<sspi::ntlm::NtlmConfig>::default();

        let client = CredSspClient::new(
            server_public_key,
            credentials.into(),
            credssp::CredSspMode::WithCredentials,
            credssp::ClientMode::Negotiate(sspi::NegotiateConfig {
                protocol_config: credssp_config,
                package_list: None,
                client_computer_name: server_name,
            }),
            service_principal_name,
        )
        .map_err(|e| ConnectorError::new("CredSSP", ConnectorErrorKind::Credssp(e)))?;

        Ok(Self {
            client,
            next_request: Some(credssp::TsRequest::default()),
            state: CredSspState::Initial,
        })
    }

    pub fn is_done(&self) -> bool {
        self.state == CredSspState::Finished
    }

    pub fn wants_request_from_server(&self) -> bool {
        self.next_request.is_none()
    }

    pub fn read_request_from_server(&mut self, input: &[u8]) -> ConnectorResult<()> {
        match self.state {
            CredSspState::Initial | CredSspState::ReplyNeeded => {
                let message =
                    credssp::TsRequest::from_buffer(input).map_err(|e| reason_err!("CredSSP", "TsRequest decode: {e}"))?;
                debug!(?message, "Received");
                self.next_request = Some(message);
                Ok(())
            }
            CredSspState::Finished => Err(general_err!("CredSSP sequence is finished")),
        }
    }

    /// Produces the generator computing the next client state.
    ///
    /// NTLM resolves without network round trips, so the caller only has to
    /// poll the generator to completion.
    pub fn process(&mut self) -> CredsspProcessGenerator<'_> {
        let request = self.next_request.take().expect("next request");
        self.client.process(request)
    }

    pub fn handle_process_result(&mut self, result: ClientState, output: &mut WriteBuf) -> ConnectorResult<Written> {
        let (size, next_state) = match self.state {
            CredSspState::Initial | CredSspState::ReplyNeeded => {
                let (ts_request, next_state) = match result {
                    ClientState::ReplyNeeded(ts_request) => (ts_request, CredSspState::ReplyNeeded),
                    ClientState::FinalMessage(ts_request) => (ts_request, CredSspState::Finished),
                };

                debug!(message = ?ts_request, "Send");

                let written = write_credssp_request(ts_request, output)?;
                self.next_request = None;
                (Written::from_size(written)?, next_state)
            }
            CredSspState::Finished => return Err(general_err!("CredSSP sequence is finished")),
        };

        self.state = next_state;
        Ok(size)
    }
}

fn write_credssp_request(ts_request: credssp::TsRequest, output: &mut WriteBuf) -> ConnectorResult<usize> {
    let length = usize::from(ts_request.buffer_len());

    let unfilled_buffer = output.unfilled_to(length);

    ts_request
        .encode_ts_request(unfilled_buffer)
        .map_err(|e| reason_err!("CredSSP", "TsRequest encode: {e}"))?;

    output.advance(length);

    Ok(length)
}
