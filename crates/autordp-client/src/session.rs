//! Session establishment and the per-connection task pair.
//!
//! One receive task reads PDUs and applies updates under a short-lived lock;
//! one send task drains the outbound input queue and owns the transport
//! write half. Consumers interact through cheap snapshot copies and the
//! bounded input queue, never touching the transport directly.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncWriteExt as _, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use autordp_connector::{ClientConnector, ConnectionResult, ServerName};
use autordp_core::{encode_vec, WriteBuf};
use autordp_pdu::input::fast_path::FastPathInput;
use autordp_pdu::input::InputEventPdu;
use autordp_pdu::mcs::{DisconnectProviderUltimatum, DisconnectReason};
use autordp_pdu::rdp::headers::ShareDataPdu;
use autordp_pdu::x224::X224;
use autordp_session::image::FrameBuffer;
use autordp_session::pointer::PointerState;
use autordp_session::{ActiveStage, ActiveStageOutput, GracefulDisconnectReason};
use autordp_tokio::{Framed, SEND_TIMEOUT, SETUP_READ_TIMEOUT};

use crate::config::ConnectionConfig;
use crate::input::{MouseButton, PendingInput};
use crate::screen::{PointerSnapshot, Snapshot};
use crate::{connector_error, not_connected, session_error, transport_error, RdpError, RdpResult};

type TlsStream = autordp_tls::TlsStream<TcpStream>;

/// How long pending outbound events may drain during a disconnect.
const SHUTDOWN_DRAIN_DEADLINE: Duration = Duration::from_millis(250);

/// Extra time allowed for the disconnect ultimatum and the TLS close.
const SHUTDOWN_CLOSE_GRACE: Duration = Duration::from_millis(250);

const INPUT_QUEUE_DEPTH: usize = 64;

/// Lifecycle of an established session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionPhase {
    /// Updates flow and input is accepted.
    Active = 0,
    /// Shutting down; no new input, final reads stay valid.
    Terminating = 1,
    /// Fully torn down; reader operations fail.
    Closed = 2,
}

impl SessionPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Terminating,
            _ => Self::Closed,
        }
    }
}

struct ScreenState {
    frame: FrameBuffer,
    version: u64,
    last_updated: SystemTime,
}

struct Shared {
    screen: Mutex<ScreenState>,
    pointer: Mutex<PointerState>,
    phase: AtomicU8,
    failure: Mutex<Option<Arc<RdpError>>>,
    disconnect_reason: Mutex<Option<GracefulDisconnectReason>>,
    // (latest version, session over)
    version_tx: watch::Sender<(u64, bool)>,
}

impl Shared {
    fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn record_failure(&self, error: RdpError) {
        error!(%error, "Session failure");

        let mut slot = self.failure.lock().unwrap();
        if slot.is_none() {
            *slot = Some(Arc::new(error));
        }
        drop(slot);

        self.set_phase(SessionPhase::Terminating);
        self.notify_end();
    }

    fn failure(&self) -> Option<RdpError> {
        self.failure
            .lock()
            .unwrap()
            .as_ref()
            .map(|error| RdpError::new("session", *error.kind()).with_source(Arc::clone(error)))
    }

    fn notify_end(&self) {
        self.version_tx.send_modify(|(_, over)| *over = true);
    }
}

/// Establishes a session: TCP, X.224 negotiation, TLS, CredSSP, MCS,
/// capability exchange, finalization, then the task pair.
pub async fn connect(config: &ConnectionConfig) -> RdpResult<ActiveSession> {
    let server_addr = resolve_addr(config).await?;

    info!(host = %config.host, %server_addr, "Connecting");

    let stream = tokio::time::timeout(SETUP_READ_TIMEOUT, TcpStream::connect(server_addr))
        .await
        .map_err(|e| transport_error("TCP connect deadline", e.into()))?
        .map_err(|e| transport_error("TCP connect", e))?;

    stream.set_nodelay(true).map_err(|e| transport_error("TCP_NODELAY", e))?;

    let mut framed = Framed::new(stream);

    let mut connector = ClientConnector::new(config.connector_config()).with_server_addr(server_addr);

    let should_upgrade = autordp_tokio::connect_begin(&mut framed, &mut connector)
        .await
        .map_err(connector_error)?;

    debug!("TLS upgrade");

    let initial_stream = framed.into_inner_no_leftover();

    let server_name = ServerName::new(&config.host);

    let (upgraded_stream, server_public_key) = autordp_tls::upgrade(initial_stream, server_name.as_str())
        .await
        .map_err(|e| transport_error("TLS upgrade", e))?;

    let upgraded = autordp_tokio::mark_as_upgraded(should_upgrade, &mut connector, server_public_key);

    let mut upgraded_framed = Framed::new(upgraded_stream);

    let connection_result = autordp_tokio::connect_finalize(upgraded, &mut upgraded_framed, server_name, connector)
        .await
        .map_err(connector_error)?;

    debug!(?connection_result, "Connection sequence finished");

    Ok(ActiveSession::spawn(config, connection_result, upgraded_framed))
}

async fn resolve_addr(config: &ConnectionConfig) -> RdpResult<SocketAddr> {
    tokio::net::lookup_host((config.host.as_str(), config.port))
        .await
        .map_err(|e| transport_error("name resolution", e))?
        .next()
        .ok_or_else(|| {
            transport_error(
                "name resolution",
                std::io::Error::new(std::io::ErrorKind::NotFound, "no address for host"),
            )
        })
}

enum OutboundItem {
    Input(PendingInput),
    Disconnect,
}

/// An established session. Dropping it aborts both tasks; prefer
/// [`ActiveSession::disconnect`] for a clean teardown.
pub struct ActiveSession {
    shared: Arc<Shared>,
    input_tx: mpsc::Sender<OutboundItem>,
    version_rx: watch::Receiver<(u64, bool)>,
    recv_task: Option<JoinHandle<()>>,
    send_task: Option<JoinHandle<()>>,
    fastpath_input: bool,
    desktop_width: u16,
    desktop_height: u16,
}

impl ActiveSession {
    fn spawn(config: &ConnectionConfig, connection_result: ConnectionResult, framed: Framed<TlsStream>) -> Self {
        let fastpath_input = config.fast_path_input && connection_result.fastpath_input;

        if config.fast_path_input && !connection_result.fastpath_input {
            info!("Server does not accept fast-path input; falling back to slow-path encoding");
        }

        let desktop_width = connection_result.desktop_size.width;
        let desktop_height = connection_result.desktop_size.height;

        let (version_tx, version_rx) = watch::channel((0u64, false));

        let shared = Arc::new(Shared {
            screen: Mutex::new(ScreenState {
                frame: FrameBuffer::new(desktop_width, desktop_height),
                version: 0,
                last_updated: SystemTime::now(),
            }),
            pointer: Mutex::new(PointerState::new(connection_result.pointer_cache_size)),
            phase: AtomicU8::new(SessionPhase::Active as u8),
            failure: Mutex::new(None),
            disconnect_reason: Mutex::new(None),
            version_tx,
        });

        let (stream, leftover) = framed.into_inner();
        let (read_half, write_half) = tokio::io::split(stream);
        let read_framed = Framed::new_with_leftover(read_half, leftover);

        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);

        let active_stage = ActiveStage::new(&connection_result);

        let recv_task = tokio::spawn(receive_loop(Arc::clone(&shared), read_framed, active_stage));
        let send_task = tokio::spawn(send_loop(
            Arc::clone(&shared),
            input_rx,
            write_half,
            SendContext {
                fastpath_input,
                io_channel_id: connection_result.io_channel_id,
                user_channel_id: connection_result.user_channel_id,
                share_id: connection_result.share_id,
            },
        ));

        Self {
            shared,
            input_tx,
            version_rx,
            recv_task: Some(recv_task),
            send_task: Some(send_task),
            fastpath_input,
            desktop_width,
            desktop_height,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.shared.phase()
    }

    /// Why the server ended the session, when it did.
    pub fn server_disconnect_reason(&self) -> Option<GracefulDisconnectReason> {
        *self.shared.disconnect_reason.lock().unwrap()
    }

    /// Whether outgoing input uses the fast-path encoding.
    pub fn uses_fast_path_input(&self) -> bool {
        self.fastpath_input
    }

    pub fn desktop_size(&self) -> (u16, u16) {
        (self.desktop_width, self.desktop_height)
    }

    /// A copy of the current screen contents.
    pub fn snapshot(&self) -> RdpResult<Snapshot> {
        if let Some(failure) = self.shared.failure() {
            return Err(failure);
        }
        if self.shared.phase() == SessionPhase::Closed {
            return Err(not_connected("snapshot"));
        }

        let screen = self.shared.screen.lock().unwrap();

        Ok(Snapshot {
            width: screen.frame.width(),
            height: screen.frame.height(),
            version: screen.version,
            last_updated: screen.last_updated,
            rgb_data: screen.frame.data().to_vec(),
        })
    }

    /// A copy of the current pointer presentation.
    pub fn pointer(&self) -> RdpResult<PointerSnapshot> {
        if let Some(failure) = self.shared.failure() {
            return Err(failure);
        }
        if self.shared.phase() == SessionPhase::Closed {
            return Err(not_connected("pointer"));
        }

        let pointer = self.shared.pointer.lock().unwrap();

        Ok(PointerSnapshot {
            position: pointer.position(),
            visible: pointer.visible(),
            cache_index: pointer.current_index(),
            image: pointer.current_pointer(),
        })
    }

    /// Waits until the buffer version exceeds `since_version` and returns the
    /// new version.
    pub async fn next_update(&self, since_version: u64) -> RdpResult<u64> {
        let mut version_rx = self.version_rx.clone();

        loop {
            let (version, over) = *version_rx.borrow_and_update();

            if version > since_version {
                return Ok(version);
            }

            if over {
                return Err(self.shared.failure().unwrap_or_else(|| not_connected("next_update")));
            }

            if version_rx.changed().await.is_err() {
                return Err(not_connected("next_update"));
            }
        }
    }

    pub async fn mouse_move(&self, x: u16, y: u16) -> RdpResult<()> {
        self.send_input(PendingInput::mouse_move(x, y), "mouse_move").await
    }

    pub async fn mouse_button(&self, x: u16, y: u16, button: MouseButton, pressed: bool) -> RdpResult<()> {
        self.send_input(PendingInput::mouse_button(x, y, button, pressed), "mouse_button")
            .await
    }

    /// `delta` is in wheel units: multiples of ±120.
    pub async fn mouse_wheel(&self, x: u16, y: u16, delta: i32) -> RdpResult<()> {
        self.send_input(PendingInput::mouse_wheel(x, y, delta), "mouse_wheel").await
    }

    pub async fn key_scancode(&self, code: u16, pressed: bool, extended: bool) -> RdpResult<()> {
        self.send_input(PendingInput::key_scancode(code, pressed, extended), "key_scancode")
            .await
    }

    pub async fn key_unicode(&self, character: char, pressed: bool) -> RdpResult<()> {
        self.send_input(PendingInput::key_unicode(character, pressed), "key_unicode")
            .await
    }

    async fn send_input(&self, pending: PendingInput, context: &'static str) -> RdpResult<()> {
        if let Some(failure) = self.shared.failure() {
            return Err(failure);
        }
        if self.shared.phase() != SessionPhase::Active {
            return Err(not_connected(context));
        }

        self.input_tx
            .send(OutboundItem::Input(pending))
            .await
            .map_err(|_| not_connected(context))
    }

    /// Cleanly terminates the session: stops accepting input, drains pending
    /// outbound events, sends the disconnect ultimatum and closes TLS.
    pub async fn disconnect(mut self) -> RdpResult<()> {
        self.shared.set_phase(SessionPhase::Terminating);
        self.shared.notify_end();

        // The marker queues behind any pending input, so the drain happens
        // first; the send task then writes the ultimatum and closes TLS.
        let _ = self.input_tx.send(OutboundItem::Disconnect).await;

        if let Some(send_task) = self.send_task.take() {
            let abort_handle = send_task.abort_handle();
            let deadline = SHUTDOWN_DRAIN_DEADLINE + SHUTDOWN_CLOSE_GRACE;
            if tokio::time::timeout(deadline, send_task).await.is_err() {
                warn!("Forcibly closing the transport after the drain deadline");
                abort_handle.abort();
            }
        }

        if let Some(recv_task) = self.recv_task.take() {
            recv_task.abort();
            let _ = recv_task.await;
        }

        self.shared.set_phase(SessionPhase::Closed);

        Ok(())
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        if let Some(recv_task) = &self.recv_task {
            recv_task.abort();
        }
        if let Some(send_task) = &self.send_task {
            send_task.abort();
        }
    }
}

async fn receive_loop(shared: Arc<Shared>, mut framed: Framed<ReadHalf<TlsStream>>, mut active_stage: ActiveStage) {
    loop {
        if shared.phase() != SessionPhase::Active {
            break;
        }

        // Reads are unbounded while active: absence of server data is not an
        // error.
        let (action, frame) = match framed.read_pdu().await {
            Ok(read) => read,
            Err(error) => {
                if shared.phase() == SessionPhase::Active {
                    shared.record_failure(transport_error("receive", error));
                }
                break;
            }
        };

        trace!(?action, frame_length = frame.len(), "Frame received");

        let outputs = {
            let mut screen = shared.screen.lock().unwrap();
            let mut pointer = shared.pointer.lock().unwrap();

            match active_stage.process(&mut screen.frame, &mut pointer, action, &frame) {
                Ok(outputs) => {
                    let mut frame_painted = false;

                    for output in &outputs {
                        if matches!(output, ActiveStageOutput::GraphicsUpdate(_)) {
                            frame_painted = true;
                        }
                    }

                    if frame_painted {
                        screen.version += 1;
                        screen.last_updated = SystemTime::now();
                        let version = screen.version;
                        shared.version_tx.send_modify(|(v, _)| *v = version);
                    }

                    outputs
                }
                Err(error) => {
                    drop(pointer);
                    drop(screen);
                    shared.record_failure(session_error(error));
                    break;
                }
            }
        };

        for output in outputs {
            match output {
                ActiveStageOutput::Terminate(reason) => {
                    info!(%reason, "Session terminated by the server");
                    *shared.disconnect_reason.lock().unwrap() = Some(reason);
                    shared.set_phase(SessionPhase::Terminating);
                    shared.notify_end();
                    return;
                }
                ActiveStageOutput::GraphicsUpdate(region) => {
                    trace!(?region, "Screen updated");
                }
                ActiveStageOutput::PointerPosition { x, y } => {
                    trace!(x, y, "Pointer moved");
                }
                ActiveStageOutput::PointerHidden
                | ActiveStageOutput::PointerDefault
                | ActiveStageOutput::PointerBitmap => {}
            }
        }
    }
}

struct SendContext {
    fastpath_input: bool,
    io_channel_id: u16,
    user_channel_id: u16,
    share_id: u32,
}

async fn send_loop(
    shared: Arc<Shared>,
    mut input_rx: mpsc::Receiver<OutboundItem>,
    mut write_half: WriteHalf<TlsStream>,
    ctx: SendContext,
) {
    while let Some(item) = input_rx.recv().await {
        let (bytes, disconnect) = match encode_outbound(&ctx, item) {
            Ok(encoded) => encoded,
            Err(error) => {
                shared.record_failure(error);
                break;
            }
        };

        let write = async {
            write_half.write_all(&bytes).await?;
            write_half.flush().await
        };

        match tokio::time::timeout(SEND_TIMEOUT, write).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                if shared.phase() == SessionPhase::Active {
                    shared.record_failure(transport_error("send", error));
                }
                break;
            }
            Err(elapsed) => {
                shared.record_failure(transport_error("send deadline", elapsed.into()));
                break;
            }
        }

        if disconnect {
            // TLS close-notify, then the kernel tears the TCP stream down.
            let _ = write_half.shutdown().await;
            break;
        }
    }
}

fn encode_outbound(ctx: &SendContext, item: OutboundItem) -> RdpResult<(Vec<u8>, bool)> {
    match item {
        OutboundItem::Input(pending) => {
            let bytes = if ctx.fastpath_input {
                encode_vec(&FastPathInput(pending.into_fast_path_events()))
                    .map_err(|e| RdpError::new("input encode", crate::RdpErrorKind::Protocol).with_source(e))?
            } else {
                let mut buf = WriteBuf::new();
                autordp_connector::encode_share_data(
                    ctx.user_channel_id,
                    ctx.io_channel_id,
                    ctx.share_id,
                    ShareDataPdu::Input(InputEventPdu(pending.into_slow_path_events())),
                    &mut buf,
                )
                .map_err(connector_error)?;
                buf.filled().to_vec()
            };

            Ok((bytes, false))
        }
        OutboundItem::Disconnect => {
            let bytes = encode_vec(&X224(DisconnectProviderUltimatum::from_reason(
                DisconnectReason::UserRequested,
            )))
            .map_err(|e| RdpError::new("disconnect encode", crate::RdpErrorKind::Protocol).with_source(e))?;

            Ok((bytes, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_input_preserves_call_order_in_the_byte_stream() {
        let ctx = SendContext {
            fastpath_input: true,
            io_channel_id: 1003,
            user_channel_id: 1007,
            share_id: 66538,
        };

        let calls = [
            PendingInput::mouse_move(1, 1),
            PendingInput::mouse_button(2, 2, MouseButton::Left, true),
            PendingInput::mouse_button(2, 2, MouseButton::Left, false),
            PendingInput::key_scancode(0x1E, true, false),
        ];

        let mut stream = Vec::new();
        for call in calls {
            let (bytes, disconnect) = encode_outbound(&ctx, OutboundItem::Input(call)).unwrap();
            assert!(!disconnect);
            stream.extend_from_slice(&bytes);
        }

        // Re-framing the concatenated stream yields the PDUs back in call
        // order, with no interleaving inside any PDU.
        let mut offset = 0;
        let mut x_positions = Vec::new();
        let mut scancodes = Vec::new();
        while offset < stream.len() {
            let info = autordp_pdu::find_size(&stream[offset..]).unwrap().unwrap();
            let frame = &stream[offset..offset + info.length];
            let decoded: FastPathInput = autordp_core::decode(frame).unwrap();
            for event in decoded.0 {
                match event {
                    autordp_pdu::input::fast_path::FastPathInputEvent::MouseEvent(pdu) => {
                        x_positions.push(pdu.x_position)
                    }
                    autordp_pdu::input::fast_path::FastPathInputEvent::KeyboardEvent(_, code) => {
                        scancodes.push(code)
                    }
                    _ => {}
                }
            }
            offset += info.length;
        }

        assert_eq!(x_positions, [1, 2, 2]);
        assert_eq!(scancodes, [0x1E]);
    }

    #[test]
    fn slow_path_input_wraps_share_data() {
        let ctx = SendContext {
            fastpath_input: false,
            io_channel_id: 1003,
            user_channel_id: 1007,
            share_id: 66538,
        };

        let (bytes, _) = encode_outbound(&ctx, OutboundItem::Input(PendingInput::mouse_move(100, 200))).unwrap();

        // Slow-path input travels inside TPKT framing.
        assert_eq!(bytes[0], 0x03);

        let info = autordp_pdu::find_size(&bytes).unwrap().unwrap();
        assert_eq!(info.length, bytes.len());
    }

    #[test]
    fn disconnect_item_encodes_an_ultimatum() {
        let ctx = SendContext {
            fastpath_input: true,
            io_channel_id: 1003,
            user_channel_id: 1007,
            share_id: 66538,
        };

        let (bytes, disconnect) = encode_outbound(&ctx, OutboundItem::Disconnect).unwrap();
        assert!(disconnect);
        assert_eq!(bytes, [0x03, 0x00, 0x00, 0x09, 0x02, 0xF0, 0x80, 0x21, 0x80]);
    }
}
