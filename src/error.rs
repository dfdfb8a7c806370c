//! Error types for the event hub
//!
//! Defines application-level errors, transport send errors and the
//! errors produced while dispatching an inbound frame.
//! Uses thiserror for ergonomic error definitions.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Application-level errors
///
/// These are fatal for the operation that produced them (server startup
/// or a single connection), never for the process.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal for the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Listen address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddr(#[from] std::net::AddrParseError),

    /// A configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The hub actor has stopped (internal channel broken)
    #[error("Server closed")]
    ServerClosed,
}

/// Message send errors
///
/// Returned wherever a frame or command is handed to a channel. Callers
/// log these and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The receiving end of the connection's channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The connection's outbound buffer is full
    #[error("Channel full")]
    ChannelFull,

    /// The hub actor is no longer running
    #[error("Server closed")]
    ServerClosed,

    /// The frame could not be serialized
    #[error("Serialization failed: {0}")]
    Serialize(String),
}

/// Failure signalled by a middleware
///
/// Serialized as the `error` object of a reply:
/// `{"name": ..., "message": ..., "data"?: ...}`.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{name}: {message}")]
pub struct MiddlewareError {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl MiddlewareError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Attach extra data to the error reply
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<SendError> for MiddlewareError {
    fn from(err: SendError) -> Self {
        MiddlewareError::new("SendError", err.to_string())
    }
}

/// Reasons a single inbound frame did not complete
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Frame was not a valid `{e, c?, d?}` object
    #[error("Message parsing failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// No middleware registered for the event
    #[error("Event does not exist: {0}")]
    UnknownEvent(String),

    /// A middleware aborted the stack
    #[error("Middleware failed: {0}")]
    Middleware(#[from] MiddlewareError),
}
