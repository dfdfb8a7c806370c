//! Room directory
//!
//! Maps room names to member ids. Each `Connection` mirrors the set of
//! rooms it is in, and both sides are only changed here so they always agree.
//! Rooms are created on first join and kept once empty.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::connection::Connection;
use crate::types::ClientId;

#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, HashSet<ClientId>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the connection to a room. Returns false if it was already a member.
    pub fn join(&mut self, conn: &mut Connection, room: &str) -> bool {
        let added = self
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn.id);
        conn.rooms_mut().insert(room.to_string());

        if added {
            debug!("Client {} joined room {}", conn.id, room);
        }
        added
    }

    /// Leave one room, or every room when `room` is `None`.
    ///
    /// Returns the number of memberships removed.
    pub fn leave(&mut self, conn: &mut Connection, room: Option<&str>) -> usize {
        match room {
            Some(room) => usize::from(self.leave_one(conn, room)),
            None => {
                let joined: Vec<String> = conn.rooms_mut().drain().collect();
                for room in &joined {
                    if let Some(members) = self.rooms.get_mut(room) {
                        members.remove(&conn.id);
                    }
                }
                joined.len()
            }
        }
    }

    fn leave_one(&mut self, conn: &mut Connection, room: &str) -> bool {
        let was_member = conn.rooms_mut().remove(room);
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&conn.id);
        }

        if was_member {
            debug!("Client {} left room {}", conn.id, room);
        }
        was_member
    }

    /// Member ids of a room, if it has ever been joined
    pub fn members(&self, room: &str) -> Option<&HashSet<ClientId>> {
        self.rooms.get(room)
    }

    pub fn contains(&self, room: &str, id: &ClientId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains(id))
    }

    /// Number of known rooms, empty ones included
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
