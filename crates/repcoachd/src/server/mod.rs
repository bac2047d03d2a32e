//! Unix socket server for the repcoach daemon.
//!
//! The server:
//! - Listens on a Unix socket for client connections
//! - Spawns a ConnectionHandler for each client
//! - Supports graceful shutdown via CancellationToken
//!
//! Broadcasting is not done here; the `BroadcastDispatcher` publishes to
//! rooms and every connection's writer task drains its own outbox.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   DaemonServer  │
//! │  UnixListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐  frames   ┌─────────────────┐
//! │ConnectionHandler│──────────▶│   FeedRouter    │
//! │   (per client)  │           └─────────────────┘
//! │                 │  join     ┌─────────────────┐
//! │                 │──────────▶│   RoomManager   │
//! └───────┬─────────┘           └────────┬────────┘
//!         │ writer task                  │ outbox
//!         ◀──────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Server errors are logged and allow continued operation

mod connection;

pub use connection::{ConnectionContext, ConnectionError, ConnectionHandler};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::registry::RegistryHandle;
use crate::rooms::RoomManager;
use crate::worker::FeedRouter;

/// Unix socket server for the daemon.
pub struct DaemonServer {
    /// Path to the Unix socket
    socket_path: PathBuf,

    /// Services handed to every connection
    ctx: ConnectionContext,

    /// Connection counter for generating client IDs
    connection_counter: AtomicU64,
}

impl DaemonServer {
    /// Creates a new daemon server.
    ///
    /// # Arguments
    ///
    /// * `socket_path` - Path where the Unix socket will be created
    /// * `registry` - Handle to the exercise registry
    /// * `rooms` - Room table shared with the broadcast dispatcher
    /// * `feeds` - Router to the exercise workers
    /// * `subscriber_buffer` - Outbox capacity per connection
    /// * `cancel_token` - Token for graceful shutdown
    pub fn new(
        socket_path: impl Into<PathBuf>,
        registry: RegistryHandle,
        rooms: RoomManager,
        feeds: FeedRouter,
        subscriber_buffer: usize,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            ctx: ConnectionContext {
                registry,
                rooms,
                feeds,
                subscriber_buffer,
                cancel_token,
            },
            connection_counter: AtomicU64::new(0),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Runs the server.
    ///
    /// Listens for connections until the cancellation token is triggered.
    pub async fn run(&self) -> Result<(), ServerError> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| self.setup_error(e))?;
        }

        if let Some(parent) = self.socket_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| self.setup_error(e))?;
            }
        }

        let listener = UnixListener::bind(&self.socket_path).map_err(|e| self.setup_error(e))?;

        info!(
            socket = %self.socket_path.display(),
            "Daemon server listening"
        );

        loop {
            tokio::select! {
                _ = self.ctx.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            self.handle_connection(stream, conn_num);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        self.cleanup();
        Ok(())
    }

    /// Spawns a handler task for a new client connection.
    fn handle_connection(&self, stream: tokio::net::UnixStream, connection_number: u64) {
        let (reader, writer) = stream.into_split();
        let ctx = self.ctx.clone();

        tokio::spawn(async move {
            let handler = ConnectionHandler::new(reader, writer, ctx, connection_number);

            // The handler unregisters its own subscriber before returning.
            if let Some(id) = handler.run().await {
                debug!(client_id = %id, "Connection task finished");
            }
        });
    }

    fn setup_error(&self, error: std::io::Error) -> ServerError {
        ServerError::SocketSetup {
            path: self.socket_path.clone(),
            error: error.to_string(),
        }
    }

    /// Removes the socket file on shutdown.
    fn cleanup(&self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(
                    socket = %self.socket_path.display(),
                    error = %e,
                    "Failed to remove socket file"
                );
            }
        }

        info!("Server cleanup complete");
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to setup socket at {path}: {error}")]
    SocketSetup { path: PathBuf, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::spawn_registry;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::SocketSetup {
            path: PathBuf::from("/tmp/test.sock"),
            error: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to setup socket at /tmp/test.sock: permission denied"
        );
    }

    #[tokio::test]
    async fn test_run_removes_socket_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("nested").join("repcoach.sock");
        let cancel = CancellationToken::new();

        let server = DaemonServer::new(
            socket.clone(),
            spawn_registry(),
            RoomManager::new(4),
            FeedRouter::new(),
            8,
            cancel.clone(),
        );
        assert_eq!(server.socket_path(), socket.as_path());

        let task = tokio::spawn(async move { server.run().await });
        for _ in 0..100 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(socket.exists());

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert!(!socket.exists());
    }
}
