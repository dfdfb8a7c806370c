//! Hub actor implementation
//!
//! The central actor that owns the connection registry and room directory,
//! and runs the heartbeat timer. Connection handlers and middleware talk to
//! it through `ServerCommand`s, so every state change happens on this one
//! task and needs no locks.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcast::broadcast;
use crate::connection::Transport;
use crate::error::SendError;
use crate::heartbeat::HeartbeatMonitor;
#[cfg(test)]
use crate::heartbeat::SweepReport;
use crate::registry::ConnectionRegistry;
use crate::room::RoomDirectory;
use crate::types::ClientId;

/// Commands sent to the Hub actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection accepted; replies with its allocated id
    Connect {
        transport: Transport,
        reply: oneshot::Sender<ClientId>,
    },
    /// Connection closed
    Disconnect { client_id: ClientId },
    /// Pong received from a connection
    Pong { client_id: ClientId },
    /// Join a room; replies true if newly joined
    Join {
        client_id: ClientId,
        room: String,
        ack: oneshot::Sender<bool>,
    },
    /// Leave one room, or all of them; replies with memberships removed
    Leave {
        client_id: ClientId,
        room: Option<String>,
        ack: oneshot::Sender<usize>,
    },
    /// Multicast an event to a room; replies with recipients reached
    Broadcast {
        room: String,
        event: String,
        data: Value,
        exclude: Option<ClientId>,
        ack: oneshot::Sender<usize>,
    },
}

/// The Hub actor
///
/// Processes commands until all `ServerHandle`s are dropped.
pub struct Hub {
    registry: ConnectionRegistry,
    rooms: RoomDirectory,
    heartbeat: HeartbeatMonitor,
    receiver: mpsc::Receiver<ServerCommand>,
}

impl Hub {
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, heartbeat: HeartbeatMonitor) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomDirectory::new(),
            heartbeat,
            receiver,
        }
    }

    /// Run the Hub event loop
    pub async fn run(mut self) {
        info!(
            "Hub started (heartbeat every {:?})",
            self.heartbeat.interval()
        );
        let mut ticker = self.heartbeat.ticker();

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.heartbeat.sweep(&mut self.registry, &mut self.rooms);
                }
            }
        }

        info!("Hub shutting down");
    }

    /// Process a single command
    pub fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { transport, reply } => {
                let client_id = self.registry.register(transport);
                info!("Client {} registered", client_id);
                debug!(
                    "Total clients: {}, Total rooms: {}",
                    self.registry.len(),
                    self.rooms.room_count()
                );
                if reply.send(client_id).is_err() {
                    // Handler gave up before learning its id
                    self.registry.unregister(client_id);
                }
            }
            ServerCommand::Disconnect { client_id } => {
                if self.registry.purge(client_id, &mut self.rooms) {
                    info!("Client {} disconnected", client_id);
                }
            }
            ServerCommand::Pong { client_id } => {
                if let Some(conn) = self.registry.get_mut(&client_id) {
                    conn.mark_alive();
                }
            }
            ServerCommand::Join {
                client_id,
                room,
                ack,
            } => {
                let joined = match self.registry.get_mut(&client_id) {
                    Some(conn) => self.rooms.join(conn, &room),
                    None => false,
                };
                let _ = ack.send(joined);
            }
            ServerCommand::Leave {
                client_id,
                room,
                ack,
            } => {
                let left = match self.registry.get_mut(&client_id) {
                    Some(conn) => self.rooms.leave(conn, room.as_deref()),
                    None => 0,
                };
                let _ = ack.send(left);
            }
            ServerCommand::Broadcast {
                room,
                event,
                data,
                exclude,
                ack,
            } => {
                let sent = broadcast(&self.registry, &self.rooms, &room, &event, &data, exclude);
                let _ = ack.send(sent);
            }
        }
    }

    #[cfg(test)]
    fn sweep(&mut self) -> SweepReport {
        self.heartbeat.sweep(&mut self.registry, &mut self.rooms)
    }

    #[cfg(test)]
    fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    #[cfg(test)]
    fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }
}

/// Cloneable handle for sending commands to the Hub
#[derive(Debug, Clone)]
pub struct ServerHandle {
    cmd_tx: mpsc::Sender<ServerCommand>,
}

impl ServerHandle {
    pub fn new(cmd_tx: mpsc::Sender<ServerCommand>) -> Self {
        Self { cmd_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ServerCommand,
    ) -> Result<T, SendError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(build(tx))
            .await
            .map_err(|_| SendError::ServerClosed)?;
        rx.await.map_err(|_| SendError::ServerClosed)
    }

    async fn notify(&self, cmd: ServerCommand) -> Result<(), SendError> {
        self.cmd_tx.send(cmd).await.map_err(|_| SendError::ServerClosed)
    }

    /// Register a transport and get its connection id
    pub async fn connect(&self, transport: Transport) -> Result<ClientId, SendError> {
        self.request(|reply| ServerCommand::Connect { transport, reply })
            .await
    }

    pub async fn disconnect(&self, client_id: ClientId) -> Result<(), SendError> {
        self.notify(ServerCommand::Disconnect { client_id }).await
    }

    pub async fn pong(&self, client_id: ClientId) -> Result<(), SendError> {
        self.notify(ServerCommand::Pong { client_id }).await
    }

    pub async fn join(&self, client_id: ClientId, room: &str) -> Result<bool, SendError> {
        let room = room.to_string();
        self.request(|ack| ServerCommand::Join {
            client_id,
            room,
            ack,
        })
        .await
    }

    pub async fn leave(&self, client_id: ClientId, room: Option<&str>) -> Result<usize, SendError> {
        let room = room.map(str::to_string);
        self.request(|ack| ServerCommand::Leave {
            client_id,
            room,
            ack,
        })
        .await
    }

    /// Server-initiated broadcast to every member of `room`
    pub async fn broadcast(&self, room: &str, event: &str, data: Value) -> Result<usize, SendError> {
        self.broadcast_except(room, event, data, None).await
    }

    pub async fn broadcast_except(
        &self,
        room: &str,
        event: &str,
        data: Value,
        exclude: Option<ClientId>,
    ) -> Result<usize, SendError> {
        let room = room.to_string();
        let event = event.to_string();
        self.request(|ack| ServerCommand::Broadcast {
            room,
            event,
            data,
            exclude,
            ack,
        })
        .await
    }
}

/// Spawn a Hub and return a handle to it
pub fn spawn_hub(heartbeat: HeartbeatMonitor, buffer: usize) -> ServerHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer);
    tokio::spawn(Hub::new(cmd_rx, heartbeat).run());
    ServerHandle::new(cmd_tx)
}
