//! Unified error handling for the console.

use crate::remote::RemoteError;
use serde_json::Value;

/// Shown in place of transport error details.
pub const CONNECTIVITY_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";

/// Console error type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsoleError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Engine error: {0}")]
    Engine(#[from] practice_engine::Error),

    #[error("Server accepted a record without identifying it")]
    Unidentified,
}

impl ConsoleError {
    /// Whether input was rejected before any request was made.
    pub fn is_validation(&self) -> bool {
        matches!(self, ConsoleError::Engine(e) if e.is_validation())
    }

    /// The message shown in a form or page banner.
    ///
    /// Server messages are shown verbatim: the `message` or `error` property
    /// of a JSON body if there is one, otherwise the body itself.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Remote(RemoteError::Transport(_)) => CONNECTIVITY_MESSAGE.to_string(),
            ConsoleError::Remote(RemoteError::Server { status, body }) => {
                server_message(body).unwrap_or_else(|| format!("Request failed with status {status}"))
            }
            ConsoleError::Remote(RemoteError::Malformed(_)) => {
                "The server sent a response that could not be read.".to_string()
            }
            ConsoleError::Engine(e) => e.to_string(),
            ConsoleError::Unidentified => {
                "The record was saved, but the server did not return it. Refresh to see it."
                    .to_string()
            }
        }
    }
}

fn server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(Value::String(message)) = obj.get(key) {
                return Some(message.clone());
            }
        }
    }

    Some(body.to_string())
}

/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;
