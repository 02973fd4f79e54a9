//! Session controller: the single owner of console state.
//!
//! A [`SessionController`] holds the connection, the roster and the
//! notification queue. Every mutation goes through `&mut self`, so there is
//! exactly one mutator and no locking. After each mutation the controller
//! publishes a fresh [`SessionSnapshot`] on a `watch` channel before
//! returning; observers never see a state that is half-way through a change.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use ulid::Ulid;

use crate::config::FleetConfig;
use crate::connection::{ConnectionEvent, ConnectionManager, SendOutcome};
use crate::endpoint::Endpoint;
use crate::error::{ParseError, SessionError};
use crate::notification::{Notification, NotificationQueue};
use crate::protocol::{Command, Envelope, MessageType, ProtocolError};
use crate::roster::Roster;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Color class the connection bar uses for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Success,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Text shown in the connection bar.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting...",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Connecting => Severity::Warning,
            Self::Connected => Severity::Success,
            Self::Disconnected => Severity::Error,
        }
    }
}

impl FromStr for ConnectionState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(Self::Disconnected),
            "connecting" => Ok(Self::Connecting),
            "connected" => Ok(Self::Connected),
            other => Err(ParseError::UnknownConnectionState(other.to_string())),
        }
    }
}

/// Page shown by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivePage {
    #[default]
    Settings,
    Refbox,
}

impl ActivePage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Refbox => "refbox",
        }
    }
}

impl fmt::Display for ActivePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivePage {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "settings" => Ok(Self::Settings),
            "refbox" => Ok(Self::Refbox),
            other => Err(ParseError::UnknownPage(other.to_string())),
        }
    }
}

/// Immutable point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Incremented once per published mutation.
    pub revision: u64,
    pub active_page: ActivePage,
    pub connection: ConnectionState,
    /// Copy of the roster; widgets read it through its projections.
    pub roster: Roster,
    pub notification: Option<Notification>,
    pub pending_notifications: usize,
}

/// Composition root for one console session.
pub struct SessionController {
    endpoint: Endpoint,
    connection: Option<ConnectionManager>,
    connection_state: ConnectionState,
    active_page: ActivePage,
    roster: Roster,
    notifications: NotificationQueue,
    /// Commands sent and not yet acknowledged, keyed by message id.
    pending_commands: HashMap<Ulid, Command>,
    revision: u64,
    snapshot_tx: watch::Sender<Arc<SessionSnapshot>>,
}

impl SessionController {
    /// Seed a session from the fleet configuration. Nothing connects until
    /// [`start`](Self::start).
    pub fn new(config: FleetConfig, endpoint: Endpoint) -> Result<Self, SessionError> {
        let roster = Roster::new(config.turtles)?;
        let notifications: NotificationQueue = config.notifications.into_iter().collect();
        let active_page = ActivePage::default();
        let connection_state = ConnectionState::default();

        let initial = SessionSnapshot {
            revision: 0,
            active_page,
            connection: connection_state,
            roster: roster.clone(),
            notification: notifications.peek_head().cloned(),
            pending_notifications: notifications.len(),
        };
        let (snapshot_tx, _) = watch::channel(Arc::new(initial));

        Ok(Self {
            endpoint,
            connection: None,
            connection_state,
            active_page,
            roster,
            notifications,
            pending_commands: HashMap::new(),
            revision: 0,
            snapshot_tx,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn active_page(&self) -> ActivePage {
        self.active_page
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Open the connection and move to `Connecting` immediately.
    ///
    /// A connection still held from an earlier `start` is closed first, and
    /// its pending events are discarded with it.
    pub fn start(&mut self) {
        if let Some(previous) = self.connection.take() {
            tracing::debug!("replacing existing connection");
            previous.close();
        }
        self.pending_commands.clear();
        let connection = ConnectionManager::open(self.endpoint.clone());
        tracing::info!(endpoint = %connection.endpoint(), "connecting");
        self.connection = Some(connection);
        self.set_connection_state(ConnectionState::Connecting);
        self.publish();
    }

    /// Close the connection. Idempotent; always ends `Disconnected`.
    pub fn stop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.pending_commands.clear();
        self.set_connection_state(ConnectionState::Disconnected);
        self.publish();
    }

    /// Wait for the next transport event.
    ///
    /// Pending forever while no connection is held, so it can sit in a
    /// `select!` next to other input sources. When the transport task exits
    /// the connection handle is released and this goes back to pending.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        loop {
            let Some(connection) = self.connection.as_mut() else {
                return std::future::pending().await;
            };
            match connection.recv().await {
                Some(event) => return event,
                None => {
                    self.connection = None;
                }
            }
        }
    }

    /// Apply one transport event to completion.
    pub fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Open => {
                self.set_connection_state(ConnectionState::Connected);
            }
            ConnectionEvent::Close => {
                self.set_connection_state(ConnectionState::Disconnected);
                self.pending_commands.clear();
            }
            ConnectionEvent::Error(error) => {
                tracing::warn!(%error, "connection error");
                self.set_connection_state(ConnectionState::Disconnected);
                self.pending_commands.clear();
            }
            ConnectionEvent::Message(payload) => {
                self.handle_incoming(&payload);
            }
        }
        self.publish();
    }

    /// Wait for one transport event and apply it.
    pub async fn pump(&mut self) {
        let event = self.next_event().await;
        self.handle_event(event);
    }

    fn handle_incoming(&mut self, payload: &str) {
        let envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, len = payload.len(), "discarding undecodable message");
                return;
            }
        };

        match envelope.message_type {
            MessageType::State => {
                if let Err(e) = self.apply_state(&envelope) {
                    tracing::warn!(error = %e, message_id = %envelope.message_id, "discarding state message");
                }
            }
            MessageType::Ping => {
                // Replies to our own pings carry a parent id; only answer requests.
                if envelope.parent_id.is_none() {
                    self.reply(Envelope::pong(envelope.message_id));
                }
            }
            MessageType::Handshake => {
                tracing::debug!(message_id = %envelope.message_id, "ignoring handshake message");
            }
        }
    }

    fn apply_state(&mut self, envelope: &Envelope) -> Result<(), ProtocolError> {
        let state = envelope.state()?;

        if let Some(turtles) = state.turtles {
            for (key, turtle) in turtles {
                let Some(turtle) = turtle else {
                    continue;
                };
                let Ok(id) = key.parse::<u32>() else {
                    tracing::debug!(turtle = %key, "ignoring turtle with non-numeric id");
                    continue;
                };
                if !self.roster.apply_telemetry(id, turtle.to_telemetry()) {
                    tracing::debug!(turtle = id, "ignoring telemetry for robot outside roster");
                }
            }
        }

        if let Some(command) = envelope
            .parent_id
            .and_then(|parent| self.pending_commands.remove(&parent))
        {
            tracing::info!(%command, "command acknowledged");
            self.notifications
                .enqueue(Notification::success(format!("Command {} acknowledged", command)));
        }
        Ok(())
    }

    fn reply(&mut self, envelope: Envelope) {
        let Some(connection) = self.connection.as_ref() else {
            return;
        };
        match envelope.encode() {
            Ok(text) => {
                connection.send(text);
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode reply"),
        }
    }

    /// Flip the enabled flag of the robot at `position`. Local only.
    pub fn toggle_robot(&mut self, position: usize) -> Result<bool, SessionError> {
        let enabled = self.roster.toggle_enabled(position)?;
        if let Some(robot) = self.roster.get(position) {
            tracing::debug!(robot = robot.id, enabled, "robot toggled");
        }
        self.publish();
        Ok(enabled)
    }

    /// Drop the notification currently shown. Does nothing when none is.
    pub fn dismiss_notification(&mut self) {
        self.notifications.dismiss_head();
        self.publish();
    }

    /// Queue a notification for the operator.
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.enqueue(notification);
        self.publish();
    }

    pub fn change_active_page(&mut self, page: ActivePage) {
        self.active_page = page;
        self.publish();
    }

    /// Send a referee command to the backend.
    ///
    /// Only sent while `Connected`. Otherwise nothing goes on the wire, an
    /// error notification is queued and `Dropped` is returned.
    pub fn send_command(&mut self, command: Command) -> Result<SendOutcome, ProtocolError> {
        let outcome = match (self.connection_state, self.connection.as_ref()) {
            (ConnectionState::Connected, Some(connection)) => {
                let envelope = Envelope::command(command);
                let outcome = connection.send(envelope.encode()?);
                if outcome == SendOutcome::Queued {
                    tracing::info!(%command, message_id = %envelope.message_id, "command sent");
                    self.pending_commands.insert(envelope.message_id, command);
                }
                outcome
            }
            _ => SendOutcome::Dropped,
        };

        if outcome == SendOutcome::Dropped {
            tracing::warn!(%command, state = self.connection_state.as_str(), "command not sent");
            self.notifications
                .enqueue(Notification::error(format!("Not connected: {} was not sent", command)));
        }
        self.publish();
        Ok(outcome)
    }

    fn set_connection_state(&mut self, state: ConnectionState) {
        if self.connection_state != state {
            tracing::debug!(
                from = self.connection_state.as_str(),
                to = state.as_str(),
                "connection state changed"
            );
            self.connection_state = state;
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = SessionSnapshot {
            revision: self.revision,
            active_page: self.active_page,
            connection: self.connection_state,
            roster: self.roster.clone(),
            notification: self.notifications.peek_head().cloned(),
            pending_notifications: self.notifications.len(),
        };
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }
}
