#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use turtle_console::config::FleetConfig;
use turtle_console::endpoint::Endpoint;
use turtle_console::roster::RobotRecord;
use turtle_console::session::SessionController;

/// Frames the test asks the backend to send.
pub enum ServerFrame {
    Text(String),
    Binary(Vec<u8>),
    /// Close the current socket and wait for the next client.
    Hangup,
}

/// A fake backend serving websocket clients one at a time.
pub struct MockBackend {
    pub addr: SocketAddr,
    /// Text frames received from the console, in order, across connections.
    pub received: mpsc::UnboundedReceiver<String>,
    /// Frames to push to the console. Dropping it closes the socket and
    /// stops the server.
    pub outbound: Option<mpsc::UnboundedSender<ServerFrame>>,
}

impl MockBackend {
    /// Bind on an ephemeral port and serve connections until closed.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerFrame>();

        tokio::spawn(async move {
            'accept: loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                let (mut tx, mut rx) = ws.split();
                loop {
                    tokio::select! {
                        msg = rx.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                let _ = received_tx.send(text.as_str().to_owned());
                            }
                            Some(Ok(_)) => {}
                            _ => continue 'accept,
                        },
                        out = outbound_rx.recv() => {
                            let frame = match out {
                                Some(ServerFrame::Text(text)) => Message::Text(text.into()),
                                Some(ServerFrame::Binary(data)) => Message::Binary(data.into()),
                                Some(ServerFrame::Hangup) => {
                                    let _ = tx.send(Message::Close(None)).await;
                                    continue 'accept;
                                }
                                None => {
                                    let _ = tx.send(Message::Close(None)).await;
                                    return;
                                }
                            };
                            if tx.send(frame).await.is_err() {
                                continue 'accept;
                            }
                        }
                    }
                }
            }
        });

        Self {
            addr,
            received,
            outbound: Some(outbound_tx),
        }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn send_frame(&self, frame: ServerFrame) {
        self.outbound
            .as_ref()
            .expect("backend already closed")
            .send(frame)
            .unwrap();
    }

    pub fn push(&self, value: serde_json::Value) {
        self.send_frame(ServerFrame::Text(value.to_string()));
    }

    pub fn push_binary(&self, data: &[u8]) {
        self.send_frame(ServerFrame::Binary(data.to_vec()));
    }

    /// Close the current socket but keep accepting new clients.
    pub fn hangup(&self) {
        self.send_frame(ServerFrame::Hangup);
    }

    /// Close the socket from the server side and stop serving.
    pub fn close(&mut self) {
        self.outbound = None;
    }

    /// Next frame the console sent, parsed as JSON.
    pub async fn recv_json(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .expect("timeout waiting for console message")
            .expect("backend stopped");
        serde_json::from_str(&text).expect("console sent invalid JSON")
    }
}

pub fn robot(id: u32) -> RobotRecord {
    RobotRecord {
        id,
        enabled: false,
        battery: 50,
        home: "Yellow home".into(),
        role: "INACTIVE".into(),
        team: "Magenta".into(),
    }
}

pub fn controller_for(origin: &str, robots: u32) -> SessionController {
    let config = FleetConfig {
        origin: None,
        turtles: (1..=robots).map(robot).collect(),
        notifications: vec![],
    };
    SessionController::new(config, Endpoint::from_page_origin(origin).unwrap()).unwrap()
}

/// Pump transport events until `done` holds, failing after 5 seconds.
pub async fn pump_until(
    session: &mut SessionController,
    mut done: impl FnMut(&SessionController) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(session) {
            session.pump().await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}
