//! Room multicast
//!
//! Serializes an event once and hands the shared payload to every member.
//! A failed send only affects its own recipient.

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::message::OutboundMessage;
use crate::registry::ConnectionRegistry;
use crate::room::RoomDirectory;
use crate::types::ClientId;

/// Send `{"e": event, "d": data}` to every member of `room` except `exclude`.
///
/// Returns the number of members the frame was handed to.
pub fn broadcast(
    registry: &ConnectionRegistry,
    rooms: &RoomDirectory,
    room: &str,
    event: &str,
    data: &Value,
    exclude: Option<ClientId>,
) -> usize {
    let Some(members) = rooms.members(room) else {
        debug!("Broadcast to unknown room {} dropped", room);
        return 0;
    };

    let payload = match (OutboundMessage::Event { event, data }).to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to serialize event {}: {}", event, e);
            return 0;
        }
    };

    let mut delivered = 0;
    for member in members {
        if exclude == Some(*member) {
            continue;
        }
        let Some(conn) = registry.get(member) else {
            continue;
        };
        match conn.send_text(payload.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => warn!("Broadcast of {} to {} failed: {}", event, member, e),
        }
    }

    debug!("Broadcast {} to room {}: {} recipient(s)", event, room, delivered);
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Transport, TransportEnd};
    use crate::message::Frame;
    use serde_json::json;

    fn join(
        registry: &mut ConnectionRegistry,
        rooms: &mut RoomDirectory,
        room: &str,
    ) -> (ClientId, TransportEnd) {
        let (transport, end) = Transport::channel(8);
        let id = registry.register(transport);
        rooms.join(registry.get_mut(&id).unwrap(), room);
        (id, end)
    }

    fn expect_text(end: &mut TransportEnd) -> Value {
        match end.frames.try_recv() {
            Ok(Frame::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let mut registry = ConnectionRegistry::new();
        let mut rooms = RoomDirectory::new();
        let (a, mut a_end) = join(&mut registry, &mut rooms, "lobby");
        let (_b, mut b_end) = join(&mut registry, &mut rooms, "lobby");
        let (_c, mut c_end) = join(&mut registry, &mut rooms, "lobby");

        let sent = broadcast(&registry, &rooms, "lobby", "chat", &json!({"text": "hi"}), Some(a));

        assert_eq!(sent, 2);
        assert_eq!(expect_text(&mut b_end), json!({"e": "chat", "d": {"text": "hi"}}));
        assert_eq!(expect_text(&mut c_end), json!({"e": "chat", "d": {"text": "hi"}}));
        assert!(a_end.frames.try_recv().is_err());
        assert!(b_end.frames.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_without_exclusion_reaches_everyone() {
        let mut registry = ConnectionRegistry::new();
        let mut rooms = RoomDirectory::new();
        let (_a, mut a_end) = join(&mut registry, &mut rooms, "news");
        let (_b, mut b_end) = join(&mut registry, &mut rooms, "news");
        let (_c, mut c_end) = join(&mut registry, &mut rooms, "other");

        let sent = broadcast(&registry, &rooms, "news", "notice", &json!("up"), None);

        assert_eq!(sent, 2);
        assert_eq!(expect_text(&mut a_end)["d"], json!("up"));
        assert_eq!(expect_text(&mut b_end)["d"], json!("up"));
        assert!(c_end.frames.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_skips_missing_connection() {
        let mut registry = ConnectionRegistry::new();
        let mut rooms = RoomDirectory::new();
        let (gone, _gone_end) = join(&mut registry, &mut rooms, "lobby");
        let (_b, mut b_end) = join(&mut registry, &mut rooms, "lobby");

        // Left in the room's member set but no longer registered
        registry.unregister(gone);

        let sent = broadcast(&registry, &rooms, "lobby", "chat", &json!({}), None);

        assert_eq!(sent, 1);
        assert_eq!(expect_text(&mut b_end)["e"], json!("chat"));
    }

    #[test]
    fn test_broadcast_failure_is_isolated() {
        let mut registry = ConnectionRegistry::new();
        let mut rooms = RoomDirectory::new();
        let (sender, mut sender_end) = join(&mut registry, &mut rooms, "lobby");
        let (broken, broken_end) = join(&mut registry, &mut rooms, "lobby");
        let (_ok, mut ok_end) = join(&mut registry, &mut rooms, "lobby");

        drop(broken_end);

        let sent = broadcast(&registry, &rooms, "lobby", "chat", &json!(1), Some(sender));

        assert_eq!(sent, 1);
        assert_eq!(expect_text(&mut ok_end)["d"], json!(1));
        // Nobody is removed or terminated as a side effect
        assert!(registry.contains(&sender));
        assert!(registry.contains(&broken));
        assert!(sender_end.terminate.try_recv().is_err());
        assert!(sender_end.frames.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_unknown_room() {
        let registry = ConnectionRegistry::new();
        let rooms = RoomDirectory::new();
        assert_eq!(broadcast(&registry, &rooms, "void", "chat", &json!({}), None), 0);
    }
}
