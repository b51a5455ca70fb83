use std::time::Duration;

use serde_json::Value;
use tictactoe::{MalformedResponse, ParseError, RpcErrorObject};

/// Failure to get a response across the channel.
#[derive(Debug)]
pub enum TransportError {
    /// The peer ended the stream before a response arrived.
    Closed,
    /// No response arrived within the deadline.
    Timeout(Duration),
    /// Shutdown was requested while waiting.
    Interrupted,
    Io(std::io::Error),
    Http(reqwest::Error),
    HttpStatus { status: u16, body: String },
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(err) => Some(err),
            TransportError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Closed => write!(f, "The server closed the connection"),
            TransportError::Timeout(timeout) => {
                write!(f, "No response from the server within {:?}", timeout)
            }
            TransportError::Interrupted => write!(f, "Interrupted while waiting for the server"),
            TransportError::Io(_) => write!(f, "I/O error while talking to the server"),
            TransportError::Http(_) => write!(f, "HTTP request to the server failed"),
            TransportError::HttpStatus { status, body } => {
                write!(f, "The server answered with HTTP status {}: {}", status, body)
            }
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::UnexpectedEof => {
                TransportError::Closed
            }
            _ => TransportError::Io(err),
        }
    }
}

/// Error type for one RPC call.
#[derive(Debug)]
pub enum CallError {
    Transport(TransportError),
    Serialize(serde_json::Error),
    MalformedResponse(MalformedResponse),
    /// The server answered with a JSON-RPC error object.
    Rpc(RpcErrorObject),
    IdMismatch { expected: u64, found: Value },
    /// The result does not have the shape the method promises.
    UnexpectedResult(ParseError),
}

impl CallError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, CallError::Transport(TransportError::Interrupted))
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CallError::Transport(err) => Some(err),
            CallError::Serialize(err) => Some(err),
            CallError::MalformedResponse(err) => Some(err),
            CallError::UnexpectedResult(err) => Some(err),
            CallError::Rpc(_) | CallError::IdMismatch { .. } => None,
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Transport(_) => write!(f, "Transport failure"),
            CallError::Serialize(_) => write!(f, "Could not serialize the request"),
            CallError::MalformedResponse(_) => write!(f, "Malformed response"),
            CallError::Rpc(err) => write!(f, "RPC error: {}", err),
            CallError::IdMismatch { expected, found } => write!(
                f,
                "Response id {} does not match request id {}",
                found, expected
            ),
            CallError::UnexpectedResult(_) => write!(f, "Unexpected result"),
        }
    }
}

impl From<TransportError> for CallError {
    fn from(err: TransportError) -> Self {
        CallError::Transport(err)
    }
}

impl From<MalformedResponse> for CallError {
    fn from(err: MalformedResponse) -> Self {
        CallError::MalformedResponse(err)
    }
}

impl From<ParseError> for CallError {
    fn from(err: ParseError) -> Self {
        CallError::UnexpectedResult(err)
    }
}

/// Renders an error together with its chain of sources on one line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut current = err.source();
    while let Some(src) = current {
        text += ": ";
        text += &src.to_string();
        current = src.source();
    }
    text
}
