//! Room-scoped subscriber membership and delivery.
//!
//! Every registered subscriber owns a bounded outbox (drained by its
//! connection's writer task) and is a member of its own identity room.
//! Exercise rooms are created on first join and kept for the life of the
//! process, even when empty.
//!
//! Publishing serializes a message once and offers the line to each
//! member with `try_send`, so one slow subscriber can never hold up the
//! dispatcher or other members. A full outbox drops the line.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Closed outboxes are pruned instead of reported as errors

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, warn};

use repcoach_core::ExerciseKind;
use repcoach_protocol::ServerMessage;

/// Connection identity assigned during the handshake.
pub type SubscriberId = String;

/// Serialized, newline-free JSON lines waiting to be written to a client.
pub type Outbox = mpsc::Sender<Arc<str>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomKey {
    /// Everyone following one exercise
    Exercise(ExerciseKind),
    /// A single subscriber's private room
    Client(SubscriberId),
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::Exercise(kind) => write!(f, "{kind}"),
            RoomKey::Client(id) => write!(f, "client:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Unknown room: {0}")]
    UnknownRoom(String),

    #[error("Too many subscribers (max: {max})")]
    TooManySubscribers { max: usize },

    #[error("Subscriber not registered: {0}")]
    NotRegistered(SubscriberId),

    #[error("Subscriber already registered: {0}")]
    AlreadyRegistered(SubscriberId),
}

/// Result of one publish call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    /// Members whose outbox was full
    pub dropped: usize,
}

#[derive(Default)]
struct RoomTable {
    outboxes: HashMap<SubscriberId, Outbox>,
    rooms: HashMap<RoomKey, BTreeSet<SubscriberId>>,
}

impl RoomTable {
    fn remove_member(&mut self, id: &str) {
        for members in self.rooms.values_mut() {
            members.remove(id);
        }
    }
}

/// Shared membership table. Clones share state.
#[derive(Clone)]
pub struct RoomManager {
    table: Arc<RwLock<RoomTable>>,
    max_subscribers: usize,
}

impl RoomManager {
    pub fn new(max_subscribers: usize) -> Self {
        Self {
            table: Arc::new(RwLock::new(RoomTable::default())),
            max_subscribers,
        }
    }

    /// Registers a subscriber's outbox and puts it in its identity room.
    pub async fn register(&self, id: &str, outbox: Outbox) -> Result<(), RoomError> {
        let mut table = self.table.write().await;

        if table.outboxes.contains_key(id) {
            return Err(RoomError::AlreadyRegistered(id.to_string()));
        }
        if table.outboxes.len() >= self.max_subscribers {
            return Err(RoomError::TooManySubscribers {
                max: self.max_subscribers,
            });
        }

        table.outboxes.insert(id.to_string(), outbox);
        table
            .rooms
            .entry(RoomKey::Client(id.to_string()))
            .or_default()
            .insert(id.to_string());

        debug!(subscriber = %id, "Registered subscriber");
        Ok(())
    }

    /// Adds `id` to the room named `room`.
    ///
    /// Joining a room twice is a no-op. Returns the exercise joined and
    /// whether `id` was newly added to it.
    pub async fn join(&self, id: &str, room: &str) -> Result<(ExerciseKind, bool), RoomError> {
        let Ok(kind) = room.parse::<ExerciseKind>() else {
            warn!(subscriber = %id, room = %room, "Join for unknown room");
            return Err(RoomError::UnknownRoom(room.to_string()));
        };

        let mut table = self.table.write().await;
        if !table.outboxes.contains_key(id) {
            return Err(RoomError::NotRegistered(id.to_string()));
        }

        let inserted = table
            .rooms
            .entry(RoomKey::Exercise(kind))
            .or_default()
            .insert(id.to_string());

        if inserted {
            debug!(subscriber = %id, exercise = %kind, "Joined room");
        } else {
            debug!(subscriber = %id, exercise = %kind, "Already in room");
        }
        Ok((kind, inserted))
    }

    /// Removes `id` from every room except its identity room.
    ///
    /// Returns the rooms it left, in stable order.
    pub async fn leave(&self, id: &str) -> Vec<RoomKey> {
        let own = RoomKey::Client(id.to_string());
        let mut table = self.table.write().await;

        let mut left: Vec<RoomKey> = table
            .rooms
            .iter_mut()
            .filter(|(key, _)| **key != own)
            .filter_map(|(key, members)| members.remove(id).then(|| key.clone()))
            .collect();
        left.sort();

        debug!(subscriber = %id, rooms = left.len(), "Left rooms");
        left
    }

    /// Drops a subscriber entirely: outbox, identity room and every membership.
    pub async fn forget(&self, id: &str) {
        let mut table = self.table.write().await;
        if table.outboxes.remove(id).is_some() {
            table.rooms.remove(&RoomKey::Client(id.to_string()));
            table.remove_member(id);
            debug!(subscriber = %id, "Removed subscriber");
        }
    }

    /// Sends `msg` to every member of `room`.
    ///
    /// Publishing to an empty or never-created room delivers nothing.
    pub async fn publish(&self, room: &RoomKey, msg: &ServerMessage) -> Delivery {
        let line: Arc<str> = match serde_json::to_string(msg) {
            Ok(json) => json.into(),
            Err(e) => {
                error!(error = %e, kind = msg.kind(), "Failed to serialize message");
                return Delivery::default();
            }
        };

        let mut delivery = Delivery::default();
        let mut closed = Vec::new();
        {
            let table = self.table.read().await;
            let Some(members) = table.rooms.get(room) else {
                return delivery;
            };

            for id in members {
                let Some(outbox) = table.outboxes.get(id) else {
                    continue;
                };
                match outbox.try_send(Arc::clone(&line)) {
                    Ok(()) => delivery.delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(
                            subscriber = %id,
                            room = %room,
                            kind = msg.kind(),
                            "Subscriber outbox full, dropping message"
                        );
                        delivery.dropped += 1;
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id.clone()),
                }
            }
        }

        for id in closed {
            self.forget(&id).await;
        }
        delivery
    }

    /// Sends `msg` to one subscriber through its identity room.
    pub async fn send_to(&self, id: &str, msg: &ServerMessage) -> Delivery {
        self.publish(&RoomKey::Client(id.to_string()), msg).await
    }

    /// Number of members in `room` (0 if it was never created).
    pub async fn member_count(&self, room: &RoomKey) -> usize {
        self.table
            .read()
            .await
            .rooms
            .get(room)
            .map_or(0, BTreeSet::len)
    }

    pub async fn subscriber_count(&self) -> usize {
        self.table.read().await.outboxes.len()
    }

    /// Whether `room` has been created (it may be empty).
    pub async fn room_exists(&self, room: &RoomKey) -> bool {
        self.table.read().await.rooms.contains_key(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RoomManager {
        RoomManager::new(4)
    }

    async fn subscriber(rooms: &RoomManager, id: &str, buffer: usize) -> mpsc::Receiver<Arc<str>> {
        let (tx, rx) = mpsc::channel(buffer);
        rooms.register(id, tx).await.unwrap();
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<str>>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line.to_string());
        }
        lines
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let rooms = manager();
        let mut rx = subscriber(&rooms, "a", 8).await;

        assert_eq!(
            rooms.join("a", "squat").await,
            Ok((ExerciseKind::Squat, true))
        );
        assert_eq!(
            rooms.join("a", "squat").await,
            Ok((ExerciseKind::Squat, false))
        );
        assert_eq!(
            rooms.member_count(&RoomKey::Exercise(ExerciseKind::Squat)).await,
            1
        );

        let delivery = rooms
            .publish(
                &RoomKey::Exercise(ExerciseKind::Squat),
                &ServerMessage::count("squat", 2),
            )
            .await;
        assert_eq!(delivery.delivered, 1);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let rooms = manager();
        let _rx = subscriber(&rooms, "a", 8).await;
        assert_eq!(
            rooms.join("a", "burpees").await,
            Err(RoomError::UnknownRoom("burpees".to_string()))
        );
    }

    #[tokio::test]
    async fn test_join_requires_registration() {
        let rooms = manager();
        assert_eq!(
            rooms.join("ghost", "squat").await,
            Err(RoomError::NotRegistered("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_leave_keeps_identity_room() {
        let rooms = manager();
        let mut rx = subscriber(&rooms, "a", 8).await;
        rooms.join("a", "squat").await.unwrap();
        rooms.join("a", "pushup").await.unwrap();

        let left = rooms.leave("a").await;
        assert_eq!(
            left,
            vec![
                RoomKey::Exercise(ExerciseKind::Pushup),
                RoomKey::Exercise(ExerciseKind::Squat),
            ]
        );

        // Rooms stay around even when empty.
        assert!(rooms.room_exists(&RoomKey::Exercise(ExerciseKind::Squat)).await);
        assert_eq!(
            rooms.member_count(&RoomKey::Exercise(ExerciseKind::Squat)).await,
            0
        );

        let delivery = rooms.send_to("a", &ServerMessage::error("still here")).await;
        assert_eq!(delivery.delivered, 1);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_publish_to_empty_room_is_noop() {
        let rooms = manager();
        let delivery = rooms
            .publish(
                &RoomKey::Exercise(ExerciseKind::YogaBlocks),
                &ServerMessage::count("yoga-blocks", 0),
            )
            .await;
        assert_eq!(delivery, Delivery::default());
    }

    #[tokio::test]
    async fn test_full_outbox_drops_without_blocking() {
        let rooms = manager();
        let mut slow = subscriber(&rooms, "slow", 1).await;
        let mut fast = subscriber(&rooms, "fast", 8).await;
        rooms.join("slow", "squat").await.unwrap();
        rooms.join("fast", "squat").await.unwrap();

        let room = RoomKey::Exercise(ExerciseKind::Squat);
        for value in 0..3 {
            rooms
                .publish(&room, &ServerMessage::count("squat", value))
                .await;
        }

        assert_eq!(drain(&mut slow).len(), 1);
        assert_eq!(drain(&mut fast).len(), 3);
    }

    #[tokio::test]
    async fn test_capacity_and_forget() {
        let rooms = RoomManager::new(1);
        let _a = subscriber(&rooms, "a", 1).await;
        let (tx, _rx) = mpsc::channel(1);
        assert_eq!(
            rooms.register("b", tx.clone()).await,
            Err(RoomError::TooManySubscribers { max: 1 })
        );

        rooms.forget("a").await;
        assert_eq!(rooms.subscriber_count().await, 0);
        assert_eq!(
            rooms.member_count(&RoomKey::Client("a".to_string())).await,
            0
        );
        rooms.register("b", tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_forget_drops_identity_room() {
        let rooms = RoomManager::new(1);
        for i in 0..100 {
            let id = format!("client-{i}");
            let (tx, _rx) = mpsc::channel(1);
            rooms.register(&id, tx).await.unwrap();
            rooms.join(&id, "squat").await.unwrap();
            rooms.forget(&id).await;
            assert!(!rooms.room_exists(&RoomKey::Client(id)).await);
        }

        let table = rooms.table.read().await;
        assert!(table.outboxes.is_empty());
        assert_eq!(table.rooms.len(), 1);
        assert!(table.rooms.contains_key(&RoomKey::Exercise(ExerciseKind::Squat)));
    }

    #[tokio::test]
    async fn test_closed_outbox_is_pruned() {
        let rooms = manager();
        let rx = subscriber(&rooms, "gone", 4).await;
        rooms.join("gone", "pushup").await.unwrap();
        drop(rx);

        rooms
            .publish(
                &RoomKey::Exercise(ExerciseKind::Pushup),
                &ServerMessage::count("pushup", 1),
            )
            .await;
        assert_eq!(rooms.subscriber_count().await, 0);
    }
}
