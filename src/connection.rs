//! Websocket connection to the backend's state API.
//!
//! [`ConnectionManager::open`] spawns a tokio task that owns the socket.
//! The task reports lifecycle events on an unbounded channel in the order
//! they happen and writes queued outbound text frames. It never retries:
//! once the socket closes or fails, the task exits.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;

use crate::endpoint::Endpoint;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Interval between keep-alive pings on an open socket.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Lifecycle event produced by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Open,
    Close,
    Error(String),
    Message(String),
}

/// Result of handing a message to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    /// The connection was closed or never opened; nothing was sent.
    Dropped,
}

/// Owner of one live connection.
///
/// Closing is idempotent and also happens on drop, so the socket never
/// outlives its owner.
pub struct ConnectionManager {
    endpoint: Endpoint,
    events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    outbound_tx: mpsc::UnboundedSender<String>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Start connecting to `endpoint`. Must be called inside a tokio runtime.
    pub fn open(endpoint: Endpoint) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tracing::debug!(endpoint = %endpoint, "opening connection");
        let task = tokio::spawn(connection_task(
            endpoint.clone(),
            events_tx,
            outbound_rx,
            shutdown_rx,
        ));

        Self {
            endpoint,
            events_rx,
            outbound_tx,
            shutdown_tx,
            task: Some(task),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Queue a text frame. Never blocks.
    pub fn send(&self, text: String) -> SendOutcome {
        if self.is_closed() {
            return SendOutcome::Dropped;
        }
        match self.outbound_tx.send(text) {
            Ok(()) => SendOutcome::Queued,
            Err(_) => SendOutcome::Dropped,
        }
    }

    /// Next lifecycle event, or `None` once the task has exited and every
    /// event it produced has been received.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.events_rx.recv().await
    }

    /// Signal the task to send a close frame and exit. Safe to call repeatedly.
    pub fn close(&self) {
        if !self.is_closed() {
            tracing::debug!(endpoint = %self.endpoint, "closing connection");
        }
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Close and wait for the task to finish. Consumes the manager.
    pub async fn join(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

async fn connection_task(
    endpoint: Endpoint,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    if *shutdown_rx.borrow() {
        return;
    }

    let connect_result = tokio::select! {
        result = tokio_tungstenite::connect_async(endpoint.as_str()) => result,
        _ = shutdown_rx.changed() => return,
    };

    let ws_stream = match connect_result {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            tracing::debug!(endpoint = %endpoint, error = %e, "connection failed");
            let _ = events_tx.send(ConnectionEvent::Error(e.to_string()));
            return;
        }
    };

    tracing::info!(endpoint = %endpoint, "connected");
    if events_tx.send(ConnectionEvent::Open).is_err() {
        return;
    }

    if let Some(event) = run_connection(ws_stream, &events_tx, &mut outbound_rx, &mut shutdown_rx).await {
        tracing::warn!(endpoint = %endpoint, ?event, "connection lost");
        let _ = events_tx.send(event);
    }
}

/// Pump the socket until it ends. Returns the terminal event to report, or
/// `None` when the local side asked to close.
async fn run_connection(
    ws_stream: WsStream,
    events_tx: &mpsc::UnboundedSender<ConnectionEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Option<ConnectionEvent> {
    let (mut sink, mut stream) = ws_stream.split();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // Skip the first immediate tick.

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if events_tx.send(ConnectionEvent::Message(text.as_str().to_owned())).is_err() {
                            let _ = sink.send(Message::Close(None)).await;
                            return None;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            return Some(ConnectionEvent::Error(e.to_string()));
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!(len = data.len(), "ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => return Some(ConnectionEvent::Close),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Some(ConnectionEvent::Error(e.to_string())),
                }
            }
            Some(text) = outbound_rx.recv() => {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    return Some(ConnectionEvent::Error(e.to_string()));
                }
            }
            _ = ping_interval.tick() => {
                if let Err(e) = sink.send(Message::Ping(vec![].into())).await {
                    return Some(ConnectionEvent::Error(e.to_string()));
                }
            }
            _ = shutdown_rx.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return None;
            }
        }
    }
}
