//! Async driver for the connection sequence.

use autordp_connector::sspi::generator::GeneratorState;
use autordp_connector::{
    ClientConnector, ClientConnectorState, ConnectionResult, ConnectorError, ConnectorErrorExt as _, ConnectorResult,
    CredSspSequence, Sequence as _, ServerName, State as _, WriteBuf,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::framed::Framed;
use crate::{SEND_TIMEOUT, SETUP_READ_TIMEOUT};

/// Proof that the connector reached the TLS upgrade point.
#[non_exhaustive]
pub struct ShouldUpgrade;

/// Runs the connection sequence until the transport must be upgraded to TLS.
pub async fn connect_begin<S>(framed: &mut Framed<S>, connector: &mut ClientConnector) -> ConnectorResult<ShouldUpgrade>
where
    S: Unpin + AsyncRead + AsyncWrite + Send,
{
    let mut buf = WriteBuf::new();

    info!("Begin connection procedure");

    while !connector.should_perform_security_upgrade() {
        single_connect_step(framed, connector, &mut buf).await?;
    }

    Ok(ShouldUpgrade)
}

/// Proof that the TLS upgrade was performed.
#[non_exhaustive]
pub struct Upgraded {
    server_public_key: Vec<u8>,
}

pub fn mark_as_upgraded(_: ShouldUpgrade, connector: &mut ClientConnector, server_public_key: Vec<u8>) -> Upgraded {
    trace!("Marked as upgraded");
    connector.mark_security_upgrade_as_done();
    Upgraded { server_public_key }
}

/// Runs CredSSP and the rest of the connection sequence over the upgraded
/// transport.
pub async fn connect_finalize<S>(
    upgraded: Upgraded,
    framed: &mut Framed<S>,
    server_name: ServerName,
    mut connector: ClientConnector,
) -> ConnectorResult<ConnectionResult>
where
    S: Unpin + AsyncRead + AsyncWrite + Send,
{
    let mut buf = WriteBuf::new();

    if connector.should_perform_credssp() {
        perform_credssp(framed, &connector, server_name, upgraded.server_public_key, &mut buf).await?;
        connector.mark_credssp_as_done();
    }

    let result = loop {
        single_connect_step(framed, &mut connector, &mut buf).await?;

        if let ClientConnectorState::Connected { result } = connector.state {
            break result;
        }
    };

    info!("Connected with success");

    Ok(result)
}

async fn perform_credssp<S>(
    framed: &mut Framed<S>,
    connector: &ClientConnector,
    server_name: ServerName,
    server_public_key: Vec<u8>,
    buf: &mut WriteBuf,
) -> ConnectorResult<()>
where
    S: Unpin + AsyncRead + AsyncWrite + Send,
{
    debug!("Begin CredSSP procedure");

    let mut sequence = CredSspSequence::new(&connector.config, server_name, server_public_key)?;

    while !sequence.is_done() {
        if sequence.wants_request_from_server() {
            let hint = sequence
                .next_pdu_hint()
                .ok_or_else(|| ConnectorError::general("CredSSP sequence is waiting for a PDU without a hint"))?;

            let pdu = tokio::time::timeout(SETUP_READ_TIMEOUT, framed.read_by_hint(hint))
                .await
                .map_err(|e| custom_err("CredSSP read deadline", e))?
                .map_err(|e| custom_err("read TSRequest", e))?;

            sequence.read_request_from_server(&pdu)?;
        }

        let client_state = {
            let mut generator = sequence.process();

            // NTLM never performs out-of-band requests, so the generator
            // resolves in one shot.
            match generator.start() {
                GeneratorState::Suspended(_) => {
                    return Err(ConnectorError::general(
                        "unexpected network request during the NTLM exchange",
                    ))
                }
                GeneratorState::Completed(client_state) => client_state.map_err(|e| {
                    ConnectorError::new("CredSSP", autordp_connector::ConnectorErrorKind::Credssp(e))
                })?,
            }
        };

        buf.clear();
        sequence.handle_process_result(client_state, buf)?;

        if buf.filled_len() > 0 {
            tokio::time::timeout(SEND_TIMEOUT, framed.write_all(buf.filled()))
                .await
                .map_err(|e| custom_err("CredSSP send deadline", e))?
                .map_err(|e| custom_err("write TSRequest", e))?;
        }
    }

    Ok(())
}

/// Runs a single step of any connector sequence: read a PDU when one is
/// expected, step the state machine, flush whatever it produced.
pub async fn single_connect_step<S>(
    framed: &mut Framed<S>,
    connector: &mut ClientConnector,
    buf: &mut WriteBuf,
) -> ConnectorResult<autordp_connector::Written>
where
    S: Unpin + AsyncRead + AsyncWrite + Send,
{
    buf.clear();

    let written = if let Some(next_pdu_hint) = connector.next_pdu_hint() {
        debug!(
            connector.state = connector.state().name(),
            hint = ?next_pdu_hint,
            "Wait for PDU"
        );

        let pdu = tokio::time::timeout(SETUP_READ_TIMEOUT, framed.read_by_hint(next_pdu_hint))
            .await
            .map_err(|e| custom_err("read deadline", e))?
            .map_err(|e| custom_err("read frame by hint", e))?;

        trace!(length = pdu.len(), "PDU received");

        connector.step(&pdu, buf)?
    } else {
        connector.step_no_input(buf)?
    };

    if let Some(response_len) = written.size() {
        debug_assert_eq!(buf.filled_len(), response_len);
        let response = buf.filled();
        trace!(response_len, "Send response");
        tokio::time::timeout(SEND_TIMEOUT, framed.write_all(response))
            .await
            .map_err(|e| custom_err("send deadline", e))?
            .map_err(|e| custom_err("write all", e))?;
    }

    Ok(written)
}

fn custom_err<E>(context: &'static str, e: E) -> ConnectorError
where
    E: std::error::Error + Sync + Send + 'static,
{
    ConnectorError::custom(context, e)
}
