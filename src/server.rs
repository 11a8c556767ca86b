//! TCP front end: one reader task and one writer task per connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::lobby::{ClientHandle, ConnectionId, Lobby, SharedLobby};
use crate::protocol::{ErrorCode, ServerMessage};
use crate::visualize::MessageSink;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// State shared by every connection worker.
pub struct ServerContext {
    config: ServerConfig,
    lobby: SharedLobby,
    next_connection: AtomicU64,
}

impl ServerContext {
    pub fn new(config: ServerConfig, sink: Arc<dyn MessageSink>) -> Self {
        let lobby = Lobby::shared(config.game_options(), sink);
        Self {
            config,
            lobby,
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn lobby(&self) -> &SharedLobby {
        &self.lobby
    }

    fn next_connection_id(&self) -> ConnectionId {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }
}

/// Handle returned by [`start`] to stop the running server.
pub struct ServerHandle {
    context: Arc<ServerContext>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    /// Stops accepting, closes every connection and waits for the accept
    /// loop to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "accept loop did not exit cleanly");
        }
    }
}

/// Binds the listener and starts accepting in the background. Returns the
/// bound address, which matters when the configured port is `0`.
pub async fn start(
    config: ServerConfig,
    sink: Arc<dyn MessageSink>,
) -> Result<(ServerHandle, SocketAddr), ServerError> {
    config.validate().map_err(ServerError::Config)?;
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "listening");

    let context = Arc::new(ServerContext::new(config, sink));
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(accept_loop(
        listener,
        Arc::clone(&context),
        shutdown.clone(),
    ));
    Ok((
        ServerHandle {
            context,
            shutdown,
            task,
        },
        local_addr,
    ))
}

async fn accept_loop(
    listener: TcpListener,
    context: Arc<ServerContext>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("server shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let context = Arc::clone(&context);
                    let token = shutdown.child_token();
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(stream, peer, context, token).await {
                            warn!(%peer, error = %err, "connection ended with error");
                        }
                    });
                }
                Err(err) => warn!(error = %err, "accept failed"),
            },
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: Arc<ServerContext>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let id = context.next_connection_id();
    let (read_half, write_half) = stream.into_split();
    let mut lines = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(context.config().max_line_length),
    );
    let mut writer = FramedWrite::new(write_half, LinesCodec::new());

    let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerMessage>();
    tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            if let Err(err) = writer.send(message.to_string()).await {
                debug!(connection = id, error = %err, "write failed");
                break;
            }
        }
    });

    let mut dispatcher =
        Dispatcher::new(Arc::clone(context.lobby()), ClientHandle::new(id, outbox));
    info!(connection = id, %peer, "connection accepted");

    // The framed reader yields a single `None` right after a decode error
    // and resumes on the next poll.
    let mut after_decode_error = false;
    let result = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    after_decode_error = false;
                    if let Err(err) = dispatcher.handle_line(&line) {
                        break Err(ServerError::from(err));
                    }
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    after_decode_error = true;
                    dispatcher.reject(ErrorCode::InvalidCommand);
                }
                Some(Err(LinesCodecError::Io(err))) => break Err(ServerError::Io(err)),
                None if after_decode_error => after_decode_error = false,
                None => break Ok(()),
            },
        }
    };

    let name = dispatcher.name().map(str::to_string);
    dispatcher.disconnect();
    info!(
        connection = id,
        player = name.as_deref().unwrap_or("-"),
        "connection closed"
    );
    result
}
