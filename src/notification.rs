use std::collections::VecDeque;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Kind of a user-facing notification. Drives the banner color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Error,
    Success,
    Warning,
    Info,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl FromStr for NotificationType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Self::Error),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(ParseError::UnknownNotificationType(other.to_string())),
        }
    }
}

/// A discrete event shown to the operator. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    notification_type: NotificationType,
    message: String,
}

impl Notification {
    pub fn new(notification_type: NotificationType, message: impl Into<String>) -> Self {
        Self {
            notification_type,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationType::Error, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationType::Success, message)
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// FIFO queue of notifications. Only the head is ever shown.
///
/// Growth is unbounded: there is no eviction policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.
    pub fn enqueue(&mut self, notification: Notification) {
        self.items.push_back(notification);
    }

    pub fn peek_head(&self) -> Option<&Notification> {
        self.items.front()
    }

    /// Remove the head. Calling this on an empty queue does nothing.
    pub fn dismiss_head(&mut self) -> Option<Notification> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Notification> for NotificationQueue {
    fn from_iter<I: IntoIterator<Item = Notification>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_returns_first_enqueued() {
        let mut queue = NotificationQueue::new();
        queue.enqueue(Notification::error("first"));
        queue.enqueue(Notification::success("second"));
        assert_eq!(queue.peek_head().unwrap().message(), "first");
    }

    #[test]
    fn peek_on_empty_queue_is_none() {
        let queue = NotificationQueue::new();
        assert!(queue.peek_head().is_none());
    }

    #[test]
    fn peek_has_no_side_effect() {
        let mut queue = NotificationQueue::new();
        queue.enqueue(Notification::error("a"));
        let _ = queue.peek_head();
        let _ = queue.peek_head();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn error_then_success_scenario() {
        let mut queue: NotificationQueue =
            [Notification::error("A"), Notification::success("B")].into_iter().collect();

        let head = queue.peek_head().unwrap();
        assert_eq!(head.notification_type(), NotificationType::Error);
        assert_eq!(head.message(), "A");

        queue.dismiss_head();

        let head = queue.peek_head().unwrap();
        assert_eq!(head.notification_type(), NotificationType::Success);
        assert_eq!(head.message(), "B");
    }

    #[test]
    fn dismiss_on_empty_is_idempotent() {
        let mut queue = NotificationQueue::new();
        for _ in 0..3 {
            assert!(queue.dismiss_head().is_none());
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn dismiss_removes_exactly_one_and_keeps_order() {
        let mut queue: NotificationQueue = ["a", "b", "c", "d"]
            .into_iter()
            .map(Notification::error)
            .collect();

        let removed = queue.dismiss_head().unwrap();
        assert_eq!(removed.message(), "a");
        assert_eq!(queue.len(), 3);
        let rest: Vec<String> = std::iter::from_fn(|| queue.dismiss_head())
            .map(|n| n.message().to_string())
            .collect();
        assert_eq!(rest, vec!["b", "c", "d"]);
    }

    #[test]
    fn notification_serializes_with_type_key() {
        let json = serde_json::to_string(&Notification::success("ok")).unwrap();
        assert_eq!(json, r#"{"type":"success","message":"ok"}"#);
    }

    #[test]
    fn notification_type_from_str_rejects_unknown() {
        assert_eq!("info".parse::<NotificationType>(), Ok(NotificationType::Info));
        assert!("fatal".parse::<NotificationType>().is_err());
    }
}
