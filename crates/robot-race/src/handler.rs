//! Per-connection handler: handshake, then action routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive the handshake → create, join, or resume a session
//!   2. Attach to the hub, reply `joined`
//!   3. Spawn the write task: hub frames out, keepalive pings when idle
//!   4. Loop: receive frames → decode actions → hub
//!   5. Detach when either side goes away

use std::sync::Arc;
use std::time::Duration;

use robot_race_hub::{Connection as Attachment, HubError};
use robot_race_protocol::{
    ClientMessage, Codec, InboundFrame, JsonCodec, ParticipantId, PlayerAction, ProtocolError,
    ServerMessage, SessionId,
};
use robot_race_transport::{Connection, WebSocketConnection};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::RaceError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    socket: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), RaceError> {
    let peer = socket.id();
    debug!(%peer, peer_addr = %socket.peer_addr(), "handling new connection");

    // --- Step 1-2: Handshake ---
    let attachment = match admit(&socket, &state).await {
        Ok(attachment) => attachment,
        Err(e) => {
            debug!(%peer, error = %e, "handshake rejected");
            // Best effort: the peer may already be gone.
            let _ = send_message(&socket, &state.codec, &error_message(&e)).await;
            let _ = socket.close().await;
            return Err(e);
        }
    };

    let session_id = attachment.session_id();
    let participant_id = attachment.participant_id();
    let conn_id = attachment.id();

    // --- Step 3: Write task ---
    let socket = Arc::new(socket);
    let writer = tokio::spawn(write_loop(
        Arc::clone(&socket),
        attachment,
        state.config.keepalive_interval,
    ));

    // --- Step 4: Read loop ---
    let result = read_loop(&socket, &state, session_id, participant_id).await;

    // --- Step 5: Cleanup ---
    state.hub.detach(session_id, conn_id).await;
    writer.abort();
    let _ = socket.close().await;
    info!(%session_id, %participant_id, %peer, "connection finished");

    result
}

/// Reads the handshake, resolves it to a participant, attaches, and
/// sends `joined`. The attachment already holds the first snapshot.
async fn admit(
    socket: &WebSocketConnection,
    state: &ServerState,
) -> Result<Attachment, RaceError> {
    let data = match tokio::time::timeout(state.config.handshake_timeout, socket.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let frame: InboundFrame = state.codec.decode(&data)?;
    let hub = &state.hub;

    let (session_id, participant_id, privileged) = match ClientMessage::from_frame(frame)? {
        ClientMessage::CreateSession(request) => {
            let config = state.config.session.with_overrides(&request.config);
            let session_id = hub.create_session(config).await;
            let participant = hub.join_session(session_id, request.name).await?;
            (session_id, participant.id(), participant.is_privileged())
        }
        ClientMessage::JoinSession(request) => {
            let participant = hub.join_session(request.session_id, request.name).await?;
            (request.session_id, participant.id(), participant.is_privileged())
        }
        ClientMessage::ResumeSession(request) => {
            let snapshot = hub.get_session(request.session_id).await?;
            let participant = snapshot
                .participants
                .iter()
                .find(|p| p.id() == request.participant_id)
                .ok_or(HubError::ParticipantNotFound {
                    session_id: request.session_id,
                    participant_id: request.participant_id,
                })?;
            (request.session_id, participant.id(), participant.is_privileged())
        }
        ClientMessage::Action(action) => {
            return Err(ProtocolError::InvalidMessage(format!(
                "`{action}` sent before joining a session"
            ))
            .into());
        }
    };

    let attachment = hub.attach(session_id, participant_id).await?;
    let joined: ServerMessage<()> = ServerMessage::Joined {
        session_id,
        participant_id,
        privileged,
    };
    if let Err(e) = send_message(socket, &state.codec, &joined).await {
        hub.detach(session_id, attachment.id()).await;
        return Err(e);
    }

    info!(%session_id, %participant_id, privileged, peer = %socket.id(), "participant connected");
    Ok(attachment)
}

/// Receives frames until the peer leaves or goes quiet for longer than
/// the idle timeout. Malformed frames are dropped.
async fn read_loop(
    socket: &WebSocketConnection,
    state: &Arc<ServerState>,
    session_id: SessionId,
    participant_id: ParticipantId,
) -> Result<(), RaceError> {
    let idle_timeout = state.config.idle_timeout;

    loop {
        let received = loop {
            let deadline = socket.last_activity() + idle_timeout;
            match tokio::time::timeout_at(deadline, socket.recv()).await {
                Ok(received) => break received,
                // Only pongs arrived meanwhile; the peer is still there.
                Err(_) if socket.last_activity() + idle_timeout > Instant::now() => continue,
                Err(_) => {
                    info!(%session_id, %participant_id, "connection idle, closing");
                    return Ok(());
                }
            }
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!(%session_id, %participant_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                debug!(%session_id, %participant_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let action = match decode_action(&state.codec, &data) {
            Ok(action) => action,
            Err(e) => {
                debug!(%session_id, %participant_id, error = %e, "dropping inbound frame");
                continue;
            }
        };

        match state.hub.handle_action(session_id, participant_id, action).await {
            Ok(()) => {}
            Err(e @ HubError::SessionNotFound(_)) => {
                info!(%session_id, %participant_id, "session removed, closing");
                return Err(e.into());
            }
            Err(e) => {
                warn!(%session_id, %participant_id, %action, error = %e, "action failed");
            }
        }
    }
}

/// Forwards hub frames to the socket and pings when nothing was sent for
/// a keepalive interval. Ends when the hub closes the buffer (detach,
/// slow consumer) or a send fails, and closes the socket so the reader
/// ends too.
async fn write_loop(socket: Arc<WebSocketConnection>, mut attachment: Attachment, keepalive: Duration) {
    let conn_id = attachment.id();
    let mut ping = tokio::time::interval_at(Instant::now() + keepalive, keepalive);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = attachment.next_frame() => {
                let Some(frame) = frame else {
                    debug!(%conn_id, "outbound buffer closed");
                    break;
                };
                if let Err(e) = socket.send(&frame).await {
                    debug!(%conn_id, error = %e, "send failed");
                    break;
                }
                ping.reset();
            }
            _ = ping.tick() => {
                if let Err(e) = socket.ping().await {
                    debug!(%conn_id, error = %e, "keepalive failed");
                    break;
                }
            }
        }
    }

    let _ = socket.close().await;
}

/// Decodes an in-session frame. Only actions are valid here.
fn decode_action(codec: &JsonCodec, data: &[u8]) -> Result<PlayerAction, ProtocolError> {
    let frame: InboundFrame = codec.decode(data)?;
    match ClientMessage::from_frame(frame)? {
        ClientMessage::Action(action) => Ok(action),
        _ => Err(ProtocolError::InvalidMessage(
            "already joined a session".into(),
        )),
    }
}

fn error_message(error: &RaceError) -> ServerMessage<()> {
    ServerMessage::Error {
        message: error.to_string(),
    }
}

async fn send_message(
    socket: &WebSocketConnection,
    codec: &JsonCodec,
    message: &ServerMessage<()>,
) -> Result<(), RaceError> {
    let bytes = codec.encode(message)?;
    socket.send(&bytes).await?;
    Ok(())
}
