//! Auto-reconnecting subscription to the user's notification queue.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use slotswap_types::Notification;

use crate::identity;
use crate::stomp::{Command, Frame};

/// Destination the server publishes per-user notifications on.
pub const NOTIFICATIONS_DESTINATION: &str = "/user/queue/notifications";

/// Client-chosen id for the single subscription held per connection.
const SUBSCRIPTION_ID: &str = "sub-0";

/// Wait between the end of one session and the next connection attempt.
/// Fixed delay, no backoff.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection lifecycle, observable through [`PushChannel::watch_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

/// Settings for the push connection.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:8080/ws`.
    pub endpoint: Url,
    pub reconnect_delay: Duration,
}

impl ChannelConfig {
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint, reconnect_delay: RECONNECT_DELAY }
    }
}

/// Reasons a push session ended. Each one leads to a delayed retry.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("websocket transport failed: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("server closed the connection")]
    ConnectionClosed,

    #[error("broker rejected the session: {0}")]
    Broker(String),

    #[error("unreadable frame: {0}")]
    Frame(#[from] crate::stomp::FrameError),

    #[error("credential cannot be sent as a header")]
    Credential,
}

/// Handle to the background push task.
///
/// [`shutdown`](PushChannel::shutdown) stops the task in an orderly fashion
/// and waits for it; after it returns the consumer is never called again and
/// no reconnection timer is left pending. Dropping the handle without calling
/// it aborts the task outright.
pub struct PushChannel {
    state_tx: watch::Sender<ChannelState>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PushChannel {
    /// Open the channel. `credential` is the stored bearer token, if any.
    ///
    /// A missing credential, or one without a readable subject, means there
    /// is no identity to subscribe as: the channel stays `Disconnected` and
    /// never attempts a connection.
    pub fn open<F>(config: ChannelConfig, credential: Option<String>, consumer: F) -> Self
    where
        F: FnMut(Notification) + Send + 'static,
    {
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let subject = credential.as_deref().and_then(identity::subject_of);
        let task = match (credential, subject) {
            (Some(credential), Some(subject)) => {
                info!("Opening push channel for {}", subject);
                let states = state_tx.clone();
                Some(tokio::spawn(run_channel(
                    config, credential, consumer, states, shutdown_rx,
                )))
            }
            _ => {
                info!("No usable credential, skipping push connection");
                None
            }
        };

        Self { state_tx, shutdown_tx, task }
    }

    pub fn state(&self) -> ChannelState {
        *self.state_tx.borrow()
    }

    /// Receiver that tracks state transitions. Stays readable after the
    /// channel shuts down, reporting the final `Disconnected`.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// Stop the channel and wait for the background task to finish. An open
    /// session says goodbye with DISCONNECT before the socket closes.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.shutdown_tx.send(true);
            let _ = task.await;
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum SessionEnd {
    Shutdown,
}

enum SessionItem {
    Frame(Frame),
    Shutdown,
}

async fn run_channel<F>(
    config: ChannelConfig,
    credential: String,
    mut consumer: F,
    states: watch::Sender<ChannelState>,
    mut shutdown: watch::Receiver<bool>,
) where
    F: FnMut(Notification) + Send + 'static,
{
    loop {
        states.send_replace(ChannelState::Connecting);
        match run_session(&config, &credential, &mut consumer, &states, &mut shutdown).await {
            Ok(SessionEnd::Shutdown) => break,
            Err(err) => {
                warn!(
                    "Push session ended: {}; retrying in {:?}",
                    err, config.reconnect_delay
                );
                states.send_replace(ChannelState::Errored);
            }
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
        if *shutdown.borrow() {
            break;
        }
    }
    states.send_replace(ChannelState::Disconnected);
}

async fn run_session<F>(
    config: &ChannelConfig,
    credential: &str,
    consumer: &mut F,
    states: &watch::Sender<ChannelState>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<SessionEnd, ChannelError>
where
    F: FnMut(Notification) + Send,
{
    let mut request = config.endpoint.as_str().into_client_request()?;
    let bearer = HeaderValue::from_str(&format!("Bearer {credential}"))
        .map_err(|_| ChannelError::Credential)?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    let mut socket = tokio::select! {
        _ = shutdown.changed() => return Ok(SessionEnd::Shutdown),
        connected = connect_async(request) => connected?.0,
    };

    // STOMP handshake: CONNECT, then wait for CONNECTED before subscribing.
    let host = config.endpoint.host_str().unwrap_or_default().to_string();
    send_frame(&mut socket, &Frame::connect(&host, credential)).await?;

    loop {
        match next_item(&mut socket, shutdown).await? {
            SessionItem::Shutdown => return disconnect(socket).await,
            SessionItem::Frame(frame) => match frame.command {
                Command::Connected => break,
                Command::Error => return Err(broker_error(&frame)),
                other => debug!("Ignoring {} frame before CONNECTED", other.as_str()),
            },
        }
    }

    states.send_replace(ChannelState::Connected);
    info!("Push channel connected to {}", config.endpoint);

    send_frame(
        &mut socket,
        &Frame::subscribe(SUBSCRIPTION_ID, NOTIFICATIONS_DESTINATION, credential),
    )
    .await?;

    loop {
        match next_item(&mut socket, shutdown).await? {
            SessionItem::Shutdown => return disconnect(socket).await,
            SessionItem::Frame(frame) => match frame.command {
                Command::Message => {
                    let notification = Notification::classify(&frame.body);
                    debug!("Notification received: {}", notification);
                    consumer(notification);
                }
                Command::Error => return Err(broker_error(&frame)),
                other => debug!("Ignoring {} frame", other.as_str()),
            },
        }
    }
}

/// Orderly goodbye. Failures here are moot, the session is over either way.
async fn disconnect(mut socket: Socket) -> Result<SessionEnd, ChannelError> {
    let _ = send_frame(&mut socket, &Frame::disconnect()).await;
    let _ = socket.close(None).await;
    Ok(SessionEnd::Shutdown)
}

async fn next_item(
    socket: &mut Socket,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<SessionItem, ChannelError> {
    loop {
        let message = tokio::select! {
            _ = shutdown.changed() => return Ok(SessionItem::Shutdown),
            message = socket.next() => message.ok_or(ChannelError::ConnectionClosed)??,
        };
        match message {
            Message::Text(text) => {
                // A bare EOL is a STOMP heart-beat, not a frame.
                if text.chars().all(|c| c == '\n' || c == '\r') {
                    continue;
                }
                return Ok(SessionItem::Frame(Frame::parse(text.as_str())?));
            }
            Message::Close(_) => return Err(ChannelError::ConnectionClosed),
            _ => {}
        }
    }
}

async fn send_frame(socket: &mut Socket, frame: &Frame) -> Result<(), ChannelError> {
    socket.send(Message::text(frame.encode())).await?;
    Ok(())
}

fn broker_error(frame: &Frame) -> ChannelError {
    let reason = frame
        .header("message")
        .map(str::to_owned)
        .unwrap_or_else(|| frame.body.trim().to_string());
    ChannelError::Broker(reason)
}
