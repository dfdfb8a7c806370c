//! Per-connection capabilities handed to middleware

use serde_json::Value;
use tracing::warn;

use crate::connection::Outbox;
use crate::error::SendError;
use crate::message::{OutboundMessage, ReplyData};
use crate::server::ServerHandle;
use crate::types::ClientId;

/// One client's view of the server
///
/// Room operations go through the hub and are acknowledged, so their
/// effect is visible once the call returns.
#[derive(Debug, Clone)]
pub struct Socket {
    id: ClientId,
    server: ServerHandle,
    outbox: Outbox,
}

impl Socket {
    pub fn new(id: ClientId, server: ServerHandle, outbox: Outbox) -> Self {
        Self { id, server, outbox }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Join a room. Joining a room twice is a no-op.
    pub async fn join(&self, room: &str) -> Result<bool, SendError> {
        self.server.join(self.id, room).await
    }

    /// Leave a single room
    pub async fn leave(&self, room: &str) -> Result<bool, SendError> {
        Ok(self.server.leave(self.id, Some(room)).await? > 0)
    }

    /// Leave every room this connection is in
    pub async fn leave_all(&self) -> Result<usize, SendError> {
        self.server.leave(self.id, None).await
    }

    /// Send an event to everyone else in `room`
    pub async fn broadcast(&self, room: &str, event: &str, data: Value) -> Result<usize, SendError> {
        self.server
            .broadcast_except(room, event, data, Some(self.id))
            .await
    }

    /// Send an event to this connection only
    pub fn emit(&self, event: &str, data: &Value) -> Result<(), SendError> {
        let payload = (OutboundMessage::Event { event, data })
            .to_payload()
            .map_err(|e| SendError::Serialize(e.to_string()))?;
        self.outbox.send_text(payload)
    }

    /// Send a reply frame; failures are logged, never returned
    pub(crate) fn reply(&self, callback: &Value, data: ReplyData<'_>) {
        let message = OutboundMessage::Reply { callback, data };
        let payload = match message.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize reply for {}: {}", self.id, e);
                return;
            }
        };
        if let Err(e) = self.outbox.send_text(payload) {
            warn!("Failed to send reply to {}: {}", self.id, e);
        }
    }
}
