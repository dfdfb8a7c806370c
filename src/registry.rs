//! Connection registry
//!
//! Owns every live `Connection`, keyed by `ClientId`.

use std::collections::HashMap;

use tracing::debug;

use crate::connection::{Connection, Transport};
use crate::room::RoomDirectory;
use crate::types::ClientId;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ClientId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new connection and return its freshly allocated id
    pub fn register(&mut self, transport: Transport) -> ClientId {
        let id = loop {
            let id = ClientId::new();
            if !self.connections.contains_key(&id) {
                break id;
            }
        };
        self.connections.insert(id, Connection::new(id, transport));
        id
    }

    /// Remove a connection; a no-op for unknown ids
    pub fn unregister(&mut self, id: ClientId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Unregister and drop every room membership. Returns false if the
    /// connection was already gone.
    pub fn purge(&mut self, id: ClientId, rooms: &mut RoomDirectory) -> bool {
        let Some(mut conn) = self.unregister(id) else {
            return false;
        };
        let left = rooms.leave(&mut conn, None);
        debug!("Purged {} from registry and {} room(s)", id, left);
        true
    }

    pub fn get(&self, id: &ClientId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn get_mut(&mut self, id: &ClientId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.connections.contains_key(id)
    }

    /// Snapshot of all ids, safe to iterate while removing
    pub fn ids(&self) -> Vec<ClientId> {
        self.connections.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
