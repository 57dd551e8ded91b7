//! Board errors

use thiserror::Error;

use crate::sender::SendError;

/// Label used in errors and logs for a board without an id
pub const ANONYMOUS: &str = "<anonymous>";

/// Errors returned by board construction and lifecycle operations
#[derive(Debug, Error)]
pub enum BoardError {
    /// The configuration is invalid
    #[error("invalid board configuration: {0}")]
    Config(String),

    /// Another board already holds this id
    #[error("a board with id '{id}' is already registered")]
    DuplicateId {
        /// The contested id
        id: String,
    },

    /// The board was closed
    #[error("board {board} is closed")]
    Closed {
        /// Board id or [`ANONYMOUS`]
        board: String,
    },

    /// `start` was called on a running board
    #[error("board {board} is already running")]
    AlreadyRunning {
        /// Board id or [`ANONYMOUS`]
        board: String,
    },

    /// `start` found no tokio runtime to schedule on
    #[error("board {board} has no tokio runtime to run on")]
    NoRuntime {
        /// Board id or [`ANONYMOUS`]
        board: String,
    },

    /// The sender failed to deliver a render
    #[error("board {board} failed to deliver: {source}")]
    Send {
        /// Board id or [`ANONYMOUS`]
        board: String,
        /// Sender failure
        #[source]
        source: SendError,
    },

    /// The sender panicked while delivering
    #[error("board {board} sender panicked: {message}")]
    Panicked {
        /// Board id or [`ANONYMOUS`]
        board: String,
        /// Panic message
        message: String,
    },
}

/// Display label for an optional board id
pub(crate) fn board_label(id: Option<&str>) -> String {
    id.unwrap_or(ANONYMOUS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_board() {
        let err = BoardError::Send {
            board: board_label(Some("lobby")),
            source: SendError::Delivery("socket gone".to_string()),
        };
        assert_eq!(err.to_string(), "board lobby failed to deliver: delivery failed: socket gone");

        let err = BoardError::Closed {
            board: board_label(None),
        };
        assert_eq!(err.to_string(), "board <anonymous> is closed");
    }
}
