//! Connection struct definition
//!
//! A registered connection: its id, the handle used to reach its writer
//! task, a liveness flag for the heartbeat, and the rooms it belongs to.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::SendError;
use crate::message::Frame;
use crate::types::ClientId;

/// Cloneable sender for a connection's outbound frames
///
/// Sends never wait: a full buffer is reported as `ChannelFull` and the
/// frame is dropped (delivery is best-effort).
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<Frame>,
}

impl Outbox {
    pub fn new(sender: mpsc::Sender<Frame>) -> Self {
        Self { sender }
    }

    pub fn send(&self, frame: Frame) -> Result<(), SendError> {
        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    pub fn send_text(&self, payload: Arc<str>) -> Result<(), SendError> {
        self.send(Frame::Text(payload))
    }
}

/// The core's view of a transport: send frames, or kill it outright
#[derive(Debug)]
pub struct Transport {
    outbox: Outbox,
    terminate: Option<oneshot::Sender<()>>,
}

/// Receiving side of a [`Transport`], owned by the connection's writer task
#[derive(Debug)]
pub struct TransportEnd {
    /// Frames to write to the socket
    pub frames: mpsc::Receiver<Frame>,
    /// Resolves with `Ok` on forced termination, `Err` when the transport is dropped
    pub terminate: oneshot::Receiver<()>,
}

impl Transport {
    /// Create a transport and its receiving end; a zero buffer is raised to one
    pub fn channel(buffer: usize) -> (Self, TransportEnd) {
        let (frame_tx, frame_rx) = mpsc::channel(buffer.max(1));
        let (kill_tx, kill_rx) = oneshot::channel();
        let transport = Self {
            outbox: Outbox::new(frame_tx),
            terminate: Some(kill_tx),
        };
        let end = TransportEnd {
            frames: frame_rx,
            terminate: kill_rx,
        };
        (transport, end)
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Force-close, bypassing the close handshake. Only the first call has effect.
    pub fn terminate(&mut self) {
        if let Some(kill) = self.terminate.take() {
            let _ = kill.send(());
        }
    }
}

/// Connected client information
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ClientId,
    transport: Transport,
    /// Cleared by each heartbeat probe, set again by a pong
    pub is_alive: bool,
    rooms: HashSet<String>,
}

impl Connection {
    /// Create a new, live connection with no rooms
    pub fn new(id: ClientId, transport: Transport) -> Self {
        Self {
            id,
            transport,
            is_alive: true,
            rooms: HashSet::new(),
        }
    }

    pub fn send_text(&self, payload: Arc<str>) -> Result<(), SendError> {
        self.transport.outbox().send_text(payload)
    }

    /// Send a heartbeat probe
    pub fn ping(&self) -> Result<(), SendError> {
        self.transport.outbox().send(Frame::Ping)
    }

    pub fn terminate(&mut self) {
        self.transport.terminate();
    }

    pub fn mark_alive(&mut self) {
        self.is_alive = true;
    }

    /// Rooms this connection currently belongs to
    pub fn rooms(&self) -> &HashSet<String> {
        &self.rooms
    }

    // Only RoomDirectory touches this, keeping both membership sides in step.
    pub(crate) fn rooms_mut(&mut self) -> &mut HashSet<String> {
        &mut self.rooms
    }
}
