//! turtle-console: operator console for a robot fleet.
//!
//! The [`session::SessionController`] owns the backend connection, the robot
//! roster and the notification queue, and publishes an immutable snapshot of
//! all three after every change.

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod notification;
pub mod protocol;
pub mod render;
pub mod roster;
pub mod session;
