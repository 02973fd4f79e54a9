use thiserror::Error;

/// Errors raised by session state operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// An operator addressed a roster position that does not exist.
    #[error("robot position {position} is out of range (roster has {len} robots)")]
    IndexOutOfRange { position: usize, len: usize },

    /// The fleet configuration violates a roster invariant.
    #[error("invalid roster: {0}")]
    InvalidRoster(String),
}

/// Errors raised when text does not name a known value.
///
/// These indicate a broken invariant upstream (a presentation layer handing
/// back a value it was never given), so callers surface them loudly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown connection state: {0:?}")]
    UnknownConnectionState(String),

    #[error("unknown page: {0:?}")]
    UnknownPage(String),

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("unknown notification type: {0:?}")]
    UnknownNotificationType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_out_of_range_message_names_position_and_len() {
        let err = SessionError::IndexOutOfRange { position: 7, len: 6 };
        assert_eq!(
            err.to_string(),
            "robot position 7 is out of range (roster has 6 robots)"
        );
    }

    #[test]
    fn parse_error_quotes_input() {
        let err = ParseError::UnknownPage("dashboard".into());
        assert_eq!(err.to_string(), "unknown page: \"dashboard\"");
    }
}
