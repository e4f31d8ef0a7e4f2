use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::room::{Command, Room, RoomEvent, TimerSettings};

type SharedRoom = Arc<Mutex<Room>>;

/// All live rooms, keyed by room id.
///
/// Locks are always taken map first, then room. Code holding a room guard must
/// not touch the map again. A room leaves the map only while both its entry
/// (map write lock) and the room itself are locked, so an operation that got a
/// guard through the map never works on a deleted room unknowingly.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, SharedRoom>>,
    settings: TimerSettings,
}

impl RoomRegistry {
    pub fn new(settings: TimerSettings) -> Self {
        RoomRegistry {
            rooms: RwLock::new(HashMap::new()),
            settings,
        }
    }

    /// Returns the locked room, creating it with `creator` as host when absent.
    pub async fn get_or_create(&self, room_id: &str, creator: &str) -> OwnedMutexGuard<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_string()).or_insert_with(|| {
            info!("Creating room {} for {}", room_id, creator);
            Arc::new(Mutex::new(Room::new(
                room_id.to_string(),
                creator.to_string(),
                self.settings,
            )))
        });
        Arc::clone(room).lock_owned().await
    }

    pub async fn get(&self, room_id: &str) -> Option<OwnedMutexGuard<Room>> {
        let rooms = self.rooms.read().await;
        let room = Arc::clone(rooms.get(room_id)?);
        Some(room.lock_owned().await)
    }

    /// Removes `connection_id` from the room and drops the room once it is empty.
    ///
    /// The guard is handed back so the caller can broadcast under the same lock.
    pub async fn leave(
        &self,
        room_id: &str,
        connection_id: &str,
    ) -> Option<(OwnedMutexGuard<Room>, Vec<RoomEvent>)> {
        let mut rooms = self.rooms.write().await;
        let mut room = Arc::clone(rooms.get(room_id)?).lock_owned().await;
        let events = room.apply(connection_id, Command::Leave);
        if room.is_empty() {
            rooms.remove(room_id);
            info!("Room {} is empty, removed", room_id);
        }
        Some((room, events))
    }

    /// Handles to every room present right now, in no particular order.
    pub async fn handles(&self) -> Vec<SharedRoom> {
        self.rooms.read().await.values().cloned().collect()
    }

    pub async fn contains(&self, room_id: &str) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Phase;

    fn join(name: &str) -> Command {
        Command::Join {
            username: name.to_string(),
            peer_id: None,
        }
    }

    #[tokio::test]
    async fn test_get_or_create_uses_defaults() {
        let registry = RoomRegistry::new(TimerSettings::default());
        let room = registry.get_or_create("r1", "u1").await;
        assert_eq!(room.id, "r1");
        assert_eq!(room.host, "u1");
        assert_eq!(room.phase, Phase::Work);
        assert_eq!(room.timer, 1500);
        assert!(!room.running);
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing_room() {
        let registry = RoomRegistry::new(TimerSettings::default());
        registry.get_or_create("r1", "u1").await.apply("u1", join("a"));
        let room = registry.get_or_create("r1", "u2").await;
        assert_eq!(room.host, "u1");
        assert_eq!(room.users.len(), 1);
        drop(room);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_room() {
        let registry = RoomRegistry::new(TimerSettings::default());
        assert!(registry.get("nope").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_leave_removes_empty_room() {
        let registry = RoomRegistry::new(TimerSettings::default());
        registry.get_or_create("r3", "u1").await.apply("u1", join("a"));

        let (room, events) = registry.leave("r3", "u1").await.unwrap();
        assert!(room.is_empty());
        assert!(events.is_empty());
        drop(room);

        assert!(!registry.contains("r3").await);
        assert!(registry.get("r3").await.is_none());
    }

    #[tokio::test]
    async fn test_leave_keeps_populated_room() {
        let registry = RoomRegistry::new(TimerSettings::default());
        {
            let mut room = registry.get_or_create("r2", "u1").await;
            room.apply("u1", join("a"));
            room.apply("u2", join("b"));
        }
        let (room, events) = registry.leave("r2", "u1").await.unwrap();
        assert_eq!(events, vec![RoomEvent::Changed]);
        assert_eq!(room.host, "u2");
        drop(room);
        assert!(registry.contains("r2").await);
    }

    #[tokio::test]
    async fn test_leave_unknown_room() {
        let registry = RoomRegistry::new(TimerSettings::default());
        assert!(registry.leave("ghost", "u1").await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_share_one_room() {
        let registry = Arc::new(RoomRegistry::new(TimerSettings::default()));
        let mut tasks = Vec::new();
        for i in 0..16 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let id = format!("u{i}");
                registry.get_or_create("busy", &id).await.apply(&id, join(&id));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let room = registry.get("busy").await.unwrap();
        assert_eq!(room.users.len(), 16);
        assert!(room.member(&room.host).is_some());
    }
}
