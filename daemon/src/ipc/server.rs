//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications for
//! hotkey changes to subscribed windows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::events::Notification;
use crate::sync::{ChannelSink, SyncHub, WindowId};

use super::handlers::Handlers;
use super::protocol::{Request, Response, MAX_FRAME_LEN};

/// IPC Server handling window connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    handlers: Arc<Handlers>,
    hub: Arc<SyncHub>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Outcome of reading one frame
enum Frame {
    Message(Vec<u8>),
    TooLarge(usize),
    Closed,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, handlers: Arc<Handlers>, hub: Arc<SyncHub>) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            handlers,
            hub,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let handlers = Arc::clone(&self.handlers);
                    let hub = Arc::clone(&self.hub);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, handlers, hub) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection.
    ///
    /// Reading stays on this task; a writer task owns the write half and
    /// interleaves responses with pushed notifications.
    async fn handle_client(
        stream: UnixStream,
        handlers: Arc<Handlers>,
        hub: Arc<SyncHub>,
    ) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<Response>();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel::<Notification>();
        let writer_task = tokio::spawn(Self::write_loop(writer, response_rx, notify_rx));

        let mut window: Option<WindowId> = None;
        let result = Self::read_loop(&mut reader, &handlers, &hub, &response_tx, &notify_tx, &mut window).await;

        if let Some(id) = window {
            hub.unsubscribe(id);
        }
        drop(response_tx);
        drop(notify_tx);
        match writer_task.await {
            Ok(Err(e)) => debug!(?e, "writer stopped with error"),
            Err(e) => warn!(?e, "writer task failed"),
            Ok(Ok(())) => {}
        }

        result
    }

    async fn read_loop<R: AsyncRead + Unpin>(
        reader: &mut R,
        handlers: &Handlers,
        hub: &SyncHub,
        responses: &mpsc::UnboundedSender<Response>,
        notify_tx: &mpsc::UnboundedSender<Notification>,
        window: &mut Option<WindowId>,
    ) -> Result<()> {
        loop {
            let msg_buf = match read_frame(reader).await? {
                Frame::Message(buf) => buf,
                Frame::TooLarge(len) => {
                    warn!(len, "message too large, disconnecting");
                    return Ok(());
                }
                Frame::Closed => {
                    debug!("client disconnected");
                    return Ok(());
                }
            };

            let response = match serde_json::from_slice::<Request>(&msg_buf) {
                Ok(Request::Subscribe { label }) => {
                    let id = match *window {
                        Some(id) => id,
                        None => {
                            let label = label.unwrap_or_else(|| "window".to_string());
                            let id = hub.subscribe(Box::new(ChannelSink::new(label, notify_tx.clone())));
                            *window = Some(id);
                            debug!(window = id, windows = hub.window_count(), "client subscribed to notifications");
                            id
                        }
                    };
                    Response::Subscribed { window: id }
                }
                Ok(request) => {
                    debug!(?request, "received request");
                    handlers.handle(request).await
                }
                Err(e) => {
                    warn!(%e, "failed to parse request");
                    Response::Error {
                        code: "bad_request".to_string(),
                        message: e.to_string(),
                    }
                }
            };

            if responses.send(response).is_err() {
                debug!("writer gone, closing connection");
                return Ok(());
            }
        }
    }

    async fn write_loop<W: AsyncWrite + Unpin>(
        mut writer: W,
        mut responses: mpsc::UnboundedReceiver<Response>,
        mut notifications: mpsc::UnboundedReceiver<Notification>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                Some(notification) = notifications.recv() => {
                    send_message(&mut writer, &notification).await?;
                }
                response = responses.recv() => match response {
                    Some(response) => send_message(&mut writer, &response).await?,
                    None => return Ok(()),
                },
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Read one length-prefixed frame
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(Frame::Closed),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Ok(Frame::TooLarge(len));
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Frame::Message(msg_buf))
}

/// Send a length-prefixed JSON message
async fn send_message<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, msg: &T) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}
