//! Message protocol definitions
//!
//! One JSON object per text frame, with single-letter keys:
//! - inbound: `{"e": event, "c": callback?, "d": data?}`
//! - reply: `{"c": callback, "d": result}` or `{"c": callback, "d": {"error": {...}}}`
//! - broadcast: `{"e": event, "d": data}`

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MiddlewareError;

/// Client → Server message
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    /// Event name used to pick the middleware stack
    #[serde(rename = "e")]
    pub event: String,
    /// Client-chosen token echoed back in the reply; `null` means no reply
    #[serde(rename = "c", default)]
    pub callback: Option<Value>,
    /// Request payload
    #[serde(rename = "d", default)]
    pub data: Option<Value>,
}

/// Body of a reply: either the response object or a wrapped error
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReplyData<'a> {
    Ok(&'a Value),
    Error { error: &'a MiddlewareError },
}

/// Server → Client message
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage<'a> {
    /// Answer to a request that carried a callback id
    Reply {
        #[serde(rename = "c")]
        callback: &'a Value,
        #[serde(rename = "d")]
        data: ReplyData<'a>,
    },
    /// Server-pushed event (broadcast or emit)
    Event {
        #[serde(rename = "e")]
        event: &'a str,
        #[serde(rename = "d")]
        data: &'a Value,
    },
}

impl OutboundMessage<'_> {
    /// Serialize into a shareable text payload
    pub fn to_payload(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

/// Instruction for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A serialized message; shared so a broadcast serializes only once
    Text(Arc<str>),
    /// Heartbeat probe
    Ping,
}
