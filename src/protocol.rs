//! JSON wire protocol spoken over the backend's state socket.
//!
//! Every text frame carries one [`Envelope`]:
//!
//! ```json
//! {"type": "state", "message_id": "<ulid>", "parent_id": "<ulid>", "payload": {...}}
//! ```
//!
//! Ids are ULIDs in their 26-character text form. `parent_id` is set on
//! replies and names the request being answered.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

use crate::error::ParseError;
use crate::roster::Telemetry;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Envelope type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    State,
    Ping,
    Handshake,
}

/// A single message exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub message_id: Ulid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Ulid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Envelope {
    pub fn new(message_type: MessageType, payload: Option<serde_json::Value>, parent_id: Option<Ulid>) -> Self {
        Self {
            message_type,
            message_id: Ulid::new(),
            parent_id,
            payload,
        }
    }

    /// A `state` request asking the backend to execute `command`.
    pub fn command(command: Command) -> Self {
        let payload = serde_json::json!({ "command": command });
        Self::new(MessageType::State, Some(payload), None)
    }

    /// Reply to a ping request.
    pub fn pong(request_id: Ulid) -> Self {
        Self::new(MessageType::Ping, None, Some(request_id))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Decode the payload of a `state` message. A missing payload is an
    /// empty state.
    pub fn state(&self) -> Result<StatePayload, ProtocolError> {
        match &self.payload {
            Some(value) => {
                StatePayload::deserialize(value).map_err(ProtocolError::Decode)
            }
            None => Ok(StatePayload::default()),
        }
    }
}

/// Payload of a `state` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    /// Keyed by turtle id. The backend may report `null` for a turtle it
    /// has no state for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turtles: Option<HashMap<String, Option<TurtleState>>>,
}

/// Reported state of one turtle. Fields the console does not display are
/// accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurtleState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batteryvoltage: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homegoal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teamcolor: Option<String>,
}

impl TurtleState {
    /// Convert to roster telemetry, formatting labels the way the console
    /// displays them (`"yellow"` becomes `"Yellow home"`, `"magenta"`
    /// becomes `"Magenta"`).
    pub fn to_telemetry(&self) -> Telemetry {
        Telemetry {
            battery: self.batteryvoltage,
            role: self.role.as_ref().map(|r| r.to_ascii_uppercase()),
            home: self
                .homegoal
                .as_deref()
                .map(|h| format!("{} home", capitalize(h))),
            team: self.teamcolor.as_deref().map(capitalize),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Referee and demo commands understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    DroppedBall,
    Start,
    Stop,
    GoIn,
    GoOut,
    KickOffMagenta,
    KickOffCyan,
    FreeKickMagenta,
    FreeKickCyan,
    GoalKickMagenta,
    GoalKickCyan,
    ThrowInMagenta,
    ThrowInCyan,
    CornerMagenta,
    CornerCyan,
    PenaltyMagenta,
    PenaltyCyan,
    RoleAssignerOn,
    RoleAssignerOff,
    PassDemo,
    #[serde(rename = "penalty_demo")]
    PenaltyMode,
    BallHandlingDemo,
}

impl Command {
    pub const ALL: [Command; 22] = [
        Command::DroppedBall,
        Command::Start,
        Command::Stop,
        Command::GoIn,
        Command::GoOut,
        Command::KickOffMagenta,
        Command::KickOffCyan,
        Command::FreeKickMagenta,
        Command::FreeKickCyan,
        Command::GoalKickMagenta,
        Command::GoalKickCyan,
        Command::ThrowInMagenta,
        Command::ThrowInCyan,
        Command::CornerMagenta,
        Command::CornerCyan,
        Command::PenaltyMagenta,
        Command::PenaltyCyan,
        Command::RoleAssignerOn,
        Command::RoleAssignerOff,
        Command::PassDemo,
        Command::PenaltyMode,
        Command::BallHandlingDemo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::DroppedBall => "dropped_ball",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::GoIn => "go_in",
            Command::GoOut => "go_out",
            Command::KickOffMagenta => "kick_off_magenta",
            Command::KickOffCyan => "kick_off_cyan",
            Command::FreeKickMagenta => "free_kick_magenta",
            Command::FreeKickCyan => "free_kick_cyan",
            Command::GoalKickMagenta => "goal_kick_magenta",
            Command::GoalKickCyan => "goal_kick_cyan",
            Command::ThrowInMagenta => "throw_in_magenta",
            Command::ThrowInCyan => "throw_in_cyan",
            Command::CornerMagenta => "corner_magenta",
            Command::CornerCyan => "corner_cyan",
            Command::PenaltyMagenta => "penalty_magenta",
            Command::PenaltyCyan => "penalty_cyan",
            Command::RoleAssignerOn => "role_assigner_on",
            Command::RoleAssignerOff => "role_assigner_off",
            Command::PassDemo => "pass_demo",
            Command::PenaltyMode => "penalty_demo",
            Command::BallHandlingDemo => "ball_handling_demo",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseError::UnknownCommand(s.to_string()))
    }
}
