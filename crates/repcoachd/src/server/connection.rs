//! Connection handler for individual client connections.
//!
//! Each connection gets its own `ConnectionHandler` that:
//! - Performs protocol version negotiation
//! - Registers an outbox with the room manager and starts a writer task
//!   that drains it onto the socket
//! - Routes joins, leaves and frames
//! - Unregisters the subscriber when the connection ends
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Request errors are answered with an `error` message and the
//!   connection is kept; only I/O and protocol errors close it

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use repcoach_core::{CoreError, ExerciseKind};
use repcoach_protocol::{ClientMessage, MessageType, ProtocolVersion, RawFrame, ServerMessage};

use crate::registry::{RegistryError, RegistryHandle};
use crate::rooms::{Outbox, RoomError, RoomManager, SubscriberId};
use crate::worker::{FeedError, FeedRouter};

/// Maximum message size (1 MB)
const MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Time allowed for the first message
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Write timeout (10 seconds)
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period for the writer to flush queued replies on close
const FLUSH_GRACE: Duration = Duration::from_secs(1);

/// Shared services a connection needs.
#[derive(Clone)]
pub struct ConnectionContext {
    pub registry: RegistryHandle,
    pub rooms: RoomManager,
    pub feeds: FeedRouter,
    pub subscriber_buffer: usize,
    pub cancel_token: CancellationToken,
}

/// Connection handler for a single client.
pub struct ConnectionHandler {
    reader: BufReader<OwnedReadHalf>,

    /// Socket writer, until it is handed to the writer task
    writer: Option<BufWriter<OwnedWriteHalf>>,

    ctx: ConnectionContext,

    /// Assigned after handshake
    client_id: Option<SubscriberId>,

    /// Sender side of this client's own outbox
    outbox: Option<Outbox>,

    connection_number: u64,
}

impl ConnectionHandler {
    pub fn new(
        reader: OwnedReadHalf,
        writer: OwnedWriteHalf,
        ctx: ConnectionContext,
        connection_number: u64,
    ) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer: Some(BufWriter::new(writer)),
            ctx,
            client_id: None,
            outbox: None,
            connection_number,
        }
    }

    /// Performs the handshake, then processes messages until the
    /// connection closes. Returns the client ID if the handshake succeeded;
    /// by then the subscriber has already been unregistered.
    pub async fn run(mut self) -> Option<SubscriberId> {
        debug!(connection = self.connection_number, "New client connected");

        let writer_task = match self.handle_handshake().await {
            Ok(task) => {
                info!(client_id = ?self.client_id, "Client handshake completed");
                task
            }
            Err(e) => {
                warn!(
                    connection = self.connection_number,
                    error = %e,
                    "Handshake failed"
                );
                return None;
            }
        };

        if let Err(e) = self.process_messages().await {
            debug!(client_id = ?self.client_id, error = %e, "Connection closed");
        }

        // Let the writer flush queued replies once every sender is gone.
        if let Some(id) = &self.client_id {
            self.ctx.rooms.forget(id).await;
        }
        self.outbox = None;
        let _ = timeout(FLUSH_GRACE, writer_task).await;

        info!(client_id = ?self.client_id, "Client disconnected");
        self.client_id
    }

    /// Expects `Connect`, checks the version and registers the outbox.
    async fn handle_handshake(&mut self) -> Result<JoinHandle<()>, ConnectionError> {
        let msg = match timeout(HANDSHAKE_TIMEOUT, self.read_message()).await {
            Ok(result) => result?,
            Err(_) => return Err(ConnectionError::Timeout),
        };

        let client_version = msg.protocol_version;
        if ProtocolVersion::check_peer(&client_version).is_err() {
            warn!(
                client_version = %client_version,
                server_version = %ProtocolVersion::CURRENT,
                "Protocol version mismatch"
            );
            self.write_direct(&ServerMessage::rejected(&format!(
                "Protocol version {} not compatible with server version {}",
                client_version,
                ProtocolVersion::CURRENT
            )))
            .await?;
            return Err(ConnectionError::VersionMismatch {
                client: client_version,
                server: ProtocolVersion::CURRENT,
            });
        }

        let MessageType::Connect { client_id } = msg.message else {
            self.write_direct(&ServerMessage::error("Expected Connect message for handshake"))
                .await?;
            return Err(ConnectionError::UnexpectedMessage(format!("{:?}", msg.message)));
        };

        let assigned_id = client_id.unwrap_or_else(|| format!("client-{}", self.connection_number));
        let (tx, rx) = mpsc::channel(self.ctx.subscriber_buffer.max(1));

        if let Err(e) = self.ctx.rooms.register(&assigned_id, tx.clone()).await {
            self.write_direct(&ServerMessage::rejected(&e.to_string())).await?;
            return Err(ConnectionError::Room(e));
        }

        if let Err(e) = self
            .write_direct(&ServerMessage::connected(assigned_id.clone()))
            .await
        {
            self.ctx.rooms.forget(&assigned_id).await;
            return Err(e);
        }

        let writer = self
            .writer
            .take()
            .ok_or_else(|| ConnectionError::Io("writer already taken".to_string()))?;
        let task = tokio::spawn(write_outbox(
            writer,
            rx,
            assigned_id.clone(),
            self.ctx.cancel_token.clone(),
        ));

        self.client_id = Some(assigned_id);
        self.outbox = Some(tx);
        Ok(task)
    }

    async fn process_messages(&mut self) -> Result<(), ConnectionError> {
        let cancel_token = self.ctx.cancel_token.clone();

        loop {
            let result = tokio::select! {
                _ = cancel_token.cancelled() => return Ok(()),
                result = self.read_message() => result,
            };

            let msg = match result {
                Ok(msg) => msg,
                Err(ConnectionError::Eof) => {
                    debug!(client_id = ?self.client_id, "Client sent EOF");
                    return Ok(());
                }
                Err(e @ ConnectionError::ParseError(_)) => {
                    self.reply(ServerMessage::error_with_code(&e.to_string(), e.code()))
                        .await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.handle_message(msg).await {
                Ok(()) => {}
                Err(ConnectionError::Eof) => return Ok(()),
                Err(e) if e.is_request_error() => {
                    self.reply(ServerMessage::error_with_code(&e.to_string(), e.code()))
                        .await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn handle_message(&mut self, msg: ClientMessage) -> Result<(), ConnectionError> {
        let client_id = self.client_id.clone().unwrap_or_default();

        match msg.message {
            MessageType::Connect { .. } => {
                self.reply(ServerMessage::error("Already connected")).await?;
            }

            MessageType::Join { exercise } => {
                let (kind, newly_joined) = self.ctx.rooms.join(&client_id, &exercise).await?;
                self.reply(ServerMessage::Joined {
                    exercise: kind.to_string(),
                })
                .await?;
                if !newly_joined {
                    return Ok(());
                }

                // Initial state, so the joiner does not wait for the next tick.
                let snap = self.ctx.registry.get(kind).await?;
                self.ctx
                    .rooms
                    .send_to(&client_id, &ServerMessage::count(kind.as_str(), snap.reps))
                    .await;
                self.ctx
                    .rooms
                    .send_to(&client_id, &ServerMessage::status(kind.as_str(), &snap.status))
                    .await;
            }

            MessageType::Leave => {
                let rooms = self
                    .ctx
                    .rooms
                    .leave(&client_id)
                    .await
                    .into_iter()
                    .map(|room| room.to_string())
                    .collect();
                self.reply(ServerMessage::Left { rooms }).await?;
            }

            MessageType::Frame { exercise, frame } => {
                self.handle_frame(&exercise, frame)?;
            }

            MessageType::Snapshot => {
                let exercises = self.ctx.registry.get_all().await;
                self.reply(ServerMessage::Snapshot { exercises }).await?;
            }

            MessageType::Ping { seq } => {
                self.reply(ServerMessage::Pong { seq }).await?;
            }

            MessageType::Disconnect => {
                debug!(client_id = %client_id, "Client requested disconnect");
                return Err(ConnectionError::Eof);
            }
        }

        Ok(())
    }

    /// Validates a feed frame and hands it to the exercise's worker.
    fn handle_frame(&self, exercise: &str, frame: Option<RawFrame>) -> Result<(), ConnectionError> {
        let kind: ExerciseKind = exercise.parse()?;
        let frame = frame.map(|raw| raw.into_frame(Utc::now())).transpose()?;

        match self.ctx.feeds.route(kind, frame) {
            Ok(()) => Ok(()),
            // Frames arrive at camera rate; a busy worker just skips some.
            Err(FeedError::Busy(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_message(&mut self) -> Result<ClientMessage, ConnectionError> {
        let mut line = String::new();

        let bytes_read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;

        if bytes_read == 0 {
            return Err(ConnectionError::Eof);
        }

        if line.len() > MAX_MESSAGE_SIZE {
            return Err(ConnectionError::MessageTooLarge {
                size: line.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let msg: ClientMessage =
            serde_json::from_str(&line).map_err(|e| ConnectionError::ParseError(e.to_string()))?;

        debug!(
            client_id = ?self.client_id,
            message_type = ?std::mem::discriminant(&msg.message),
            "Received message"
        );

        Ok(msg)
    }

    /// Queues a direct reply on this client's outbox.
    async fn reply(&self, msg: ServerMessage) -> Result<(), ConnectionError> {
        let outbox = self
            .outbox
            .as_ref()
            .ok_or_else(|| ConnectionError::Io("outbox closed".to_string()))?;
        let json =
            serde_json::to_string(&msg).map_err(|e| ConnectionError::ParseError(e.to_string()))?;

        match timeout(WRITE_TIMEOUT, outbox.send(Arc::from(json))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ConnectionError::Io("outbox closed".to_string())),
            Err(_) => Err(ConnectionError::WriteTimeout),
        }
    }

    /// Writes straight to the socket; only used before the writer task exists.
    async fn write_direct(&mut self, msg: &ServerMessage) -> Result<(), ConnectionError> {
        let json =
            serde_json::to_string(msg).map_err(|e| ConnectionError::ParseError(e.to_string()))?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ConnectionError::Io("writer already taken".to_string()))?;
        write_line(writer, &json).await
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}

async fn write_line(
    writer: &mut BufWriter<OwnedWriteHalf>,
    line: &str,
) -> Result<(), ConnectionError> {
    match timeout(WRITE_TIMEOUT, async {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok::<(), std::io::Error>(())
    })
    .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConnectionError::Io(e.to_string())),
        Err(_) => Err(ConnectionError::WriteTimeout),
    }
}

/// Drains a subscriber's outbox onto its socket until every sender is
/// dropped, a write fails, or shutdown is requested.
async fn write_outbox(
    mut writer: BufWriter<OwnedWriteHalf>,
    mut outbox: mpsc::Receiver<Arc<str>>,
    client_id: SubscriberId,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,

            line = outbox.recv() => {
                let Some(line) = line else { break };
                if let Err(e) = write_line(&mut writer, &line).await {
                    debug!(client_id = %client_id, error = %e, "Failed to write to subscriber");
                    break;
                }
            }
        }
    }
    let _ = writer.shutdown().await;
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Protocol version mismatch: client {client}, server {server}")]
    VersionMismatch {
        client: ProtocolVersion,
        server: ProtocolVersion,
    },

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Eof,

    #[error("Handshake timeout")]
    Timeout,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Frame(#[from] CoreError),
}

impl ConnectionError {
    /// Errors caused by one bad request; the connection stays open.
    fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::Room(_) | Self::Registry(_) | Self::Feed(_) | Self::Frame(_)
        )
    }

    /// Machine-readable code sent with `error` replies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Room(RoomError::UnknownRoom(_)) => "unknown_room",
            Self::Room(_) => "room_error",
            Self::Frame(CoreError::UnknownExercise(_)) => "unknown_exercise",
            Self::Frame(_) => "invalid_frame",
            Self::Feed(_) => "feed_unavailable",
            Self::Registry(_) => "registry_unavailable",
            Self::ParseError(_) => "parse_error",
            Self::MessageTooLarge { .. } => "message_too_large",
            _ => "connection_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::VersionMismatch {
            client: ProtocolVersion::new(2, 0),
            server: ProtocolVersion::new(1, 0),
        };
        assert_eq!(
            err.to_string(),
            "Protocol version mismatch: client 2.0, server 1.0"
        );
    }

    #[test]
    fn test_error_codes() {
        let err: ConnectionError = RoomError::UnknownRoom("burpees".to_string()).into();
        assert_eq!(err.code(), "unknown_room");
        assert!(err.is_request_error());
        assert_eq!(err.to_string(), "Unknown room: burpees");

        let err: ConnectionError = CoreError::UnknownExercise("x".to_string()).into();
        assert_eq!(err.code(), "unknown_exercise");

        let err = ConnectionError::Io("broken pipe".to_string());
        assert!(!err.is_request_error());
    }
}
