use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use ts_rs::TS;
use uuid::Uuid;

pub type ConnectionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct UserPresence {
    pub user_id: Uuid,
    pub user_name: String,
}

/// Relayed client payloads are forwarded verbatim; only `project_id` is
/// interpreted (it picks the room).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RelayPayload {
    pub project_id: Uuid,
    #[serde(flatten)]
    #[ts(skip)]
    pub data: Value,
}

/// Messages a client may send over the room socket.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEvent {
    #[serde(rename = "join:project")]
    JoinProject {
        project_id: Uuid,
        user_id: Uuid,
        user_name: String,
    },
    #[serde(rename = "card:move")]
    CardMove {
        project_id: Uuid,
        card_id: Uuid,
        source_list_id: Uuid,
        destination_list_id: Uuid,
        position: i32,
    },
    #[serde(rename = "card:update")]
    CardUpdate(RelayPayload),
    #[serde(rename = "list:update")]
    ListUpdate(RelayPayload),
    #[serde(rename = "checklist:update")]
    ChecklistUpdate(RelayPayload),
    #[serde(rename = "presence:update")]
    PresenceUpdate(RelayPayload),
}

/// Messages the server fans out to room members. At-most-once, best-effort:
/// these are cache-invalidation hints, the board read model is the source of
/// truth a client reconciles against.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "room:users")]
    RoomUsers {
        project_id: Uuid,
        users: Vec<UserPresence>,
    },
    #[serde(rename = "user:joined")]
    UserJoined {
        project_id: Uuid,
        user: UserPresence,
    },
    #[serde(rename = "user:left")]
    UserLeft {
        project_id: Uuid,
        user: UserPresence,
    },
    #[serde(rename = "user:presence")]
    UserPresenceUpdate {
        project_id: Uuid,
        user: UserPresence,
        #[ts(type = "Record<string, unknown>")]
        data: Value,
    },
    #[serde(rename = "card:moved")]
    CardMoved {
        project_id: Uuid,
        card_id: Uuid,
        source_list_id: Uuid,
        destination_list_id: Uuid,
        position: i32,
        moved_by: Option<UserPresence>,
    },
    #[serde(rename = "card:updated")]
    CardUpdated {
        project_id: Uuid,
        #[ts(type = "Record<string, unknown>")]
        data: Value,
        updated_by: Option<UserPresence>,
    },
    #[serde(rename = "list:updated")]
    ListUpdated {
        project_id: Uuid,
        #[ts(type = "Record<string, unknown>")]
        data: Value,
        updated_by: Option<UserPresence>,
    },
    #[serde(rename = "checklist:updated")]
    ChecklistUpdated {
        project_id: Uuid,
        #[ts(type = "Record<string, unknown>")]
        data: Value,
        updated_by: Option<UserPresence>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

struct RoomMember {
    user: UserPresence,
    tx: mpsc::UnboundedSender<ServerEvent>,
    last_seen: Instant,
}

type Room = HashMap<ConnectionId, RoomMember>;

/// Room membership and presence for every live realtime connection, keyed by
/// project id. Process-local and advisory: it is built at startup, injected
/// through the deployment, cleared at shutdown, and rebuilt from reconnects
/// after a restart.
#[derive(Clone)]
pub struct PresenceStore {
    rooms: Arc<RwLock<HashMap<Uuid, Room>>>,
    idle_timeout: Duration,
}

impl PresenceStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Registers a connection in the project's room, announces it to the
    /// other members and hands the joiner the current member list.
    pub fn join(
        &self,
        project_id: Uuid,
        connection_id: ConnectionId,
        user: UserPresence,
        tx: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let (users, peers) = {
            let mut rooms = self.rooms.write().unwrap();
            let room = rooms.entry(project_id).or_default();
            room.insert(
                connection_id,
                RoomMember {
                    user: user.clone(),
                    tx: tx.clone(),
                    last_seen: Instant::now(),
                },
            );
            (
                room.values().map(|m| m.user.clone()).collect::<Vec<_>>(),
                peer_senders(room, Some(connection_id)),
            )
        };

        let _ = tx.send(ServerEvent::RoomUsers { project_id, users });
        send_to_all(
            peers,
            ServerEvent::UserJoined {
                project_id,
                user,
            },
        );
    }

    /// Drops the connection from its room, telling the remaining members.
    /// Empty rooms are discarded.
    pub fn leave(&self, project_id: Uuid, connection_id: ConnectionId) -> Option<UserPresence> {
        let (left, peers) = {
            let mut rooms = self.rooms.write().unwrap();
            let room = rooms.get_mut(&project_id)?;
            let removed = room.remove(&connection_id)?;
            let peers = peer_senders(room, None);
            if room.is_empty() {
                rooms.remove(&project_id);
            }
            (removed.user, peers)
        };

        send_to_all(
            peers,
            ServerEvent::UserLeft {
                project_id,
                user: left.clone(),
            },
        );
        Some(left)
    }

    /// Marks the connection as alive; any inbound frame counts.
    pub fn touch(&self, project_id: Uuid, connection_id: ConnectionId) {
        let mut rooms = self.rooms.write().unwrap();
        if let Some(member) = rooms
            .get_mut(&project_id)
            .and_then(|room| room.get_mut(&connection_id))
        {
            member.last_seen = Instant::now();
        }
    }

    /// Fans an event out to the room, optionally skipping the originating
    /// connection. Fire-and-forget: dead receivers are ignored here and
    /// reaped by the sweep.
    pub fn broadcast(&self, project_id: Uuid, event: ServerEvent, except: Option<ConnectionId>) {
        let peers = {
            let rooms = self.rooms.read().unwrap();
            match rooms.get(&project_id) {
                Some(room) => room
                    .iter()
                    .filter(|(id, _)| Some(**id) != except)
                    .map(|(_, m)| m.tx.clone())
                    .collect::<Vec<_>>(),
                None => return,
            }
        };
        send_to_all(peers, event);
    }

    pub fn room_users(&self, project_id: Uuid) -> Vec<UserPresence> {
        let rooms = self.rooms.read().unwrap();
        rooms
            .get(&project_id)
            .map(|room| room.values().map(|m| m.user.clone()).collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().unwrap().len()
    }

    pub fn connection_count(&self) -> usize {
        self.rooms.read().unwrap().values().map(Room::len).sum()
    }

    /// Evicts connections idle longer than the configured timeout and
    /// notifies their former rooms. Returns the number of evictions.
    pub fn sweep_idle(&self) -> usize {
        let mut notifications: Vec<(Uuid, UserPresence, Vec<mpsc::UnboundedSender<ServerEvent>>)> =
            Vec::new();

        {
            let mut rooms = self.rooms.write().unwrap();
            for (project_id, room) in rooms.iter_mut() {
                let expired: Vec<ConnectionId> = room
                    .iter()
                    .filter(|(_, m)| m.last_seen.elapsed() > self.idle_timeout)
                    .map(|(id, _)| *id)
                    .collect();
                for connection_id in expired {
                    if let Some(removed) = room.remove(&connection_id) {
                        notifications.push((*project_id, removed.user, peer_senders(room, None)));
                    }
                }
            }
            rooms.retain(|_, room| !room.is_empty());
        }

        let evicted = notifications.len();
        for (project_id, user, peers) in notifications {
            send_to_all(peers, ServerEvent::UserLeft { project_id, user });
        }
        evicted
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let evicted = store.sweep_idle();
                if evicted > 0 {
                    tracing::debug!(evicted, "presence sweep evicted idle connections");
                }
            }
        })
    }

    /// Shutdown lifecycle hook: forget every room.
    pub fn clear(&self) {
        self.rooms.write().unwrap().clear();
    }
}

fn peer_senders(
    room: &Room,
    except: Option<ConnectionId>,
) -> Vec<mpsc::UnboundedSender<ServerEvent>> {
    room.iter()
        .filter(|(id, _)| Some(**id) != except)
        .map(|(_, m)| m.tx.clone())
        .collect()
}

fn send_to_all(peers: Vec<mpsc::UnboundedSender<ServerEvent>>, event: ServerEvent) {
    for tx in peers {
        let _ = tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> UserPresence {
        UserPresence {
            user_id: Uuid::new_v4(),
            user_name: name.to_string(),
        }
    }

    fn join_new(
        store: &PresenceStore,
        project_id: Uuid,
        name: &str,
    ) -> (
        ConnectionId,
        UserPresence,
        mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();
        let presence = user(name);
        store.join(project_id, connection_id, presence.clone(), tx);
        (connection_id, presence, rx)
    }

    #[tokio::test]
    async fn joiner_gets_room_users_and_peers_get_user_joined() {
        let store = PresenceStore::new(Duration::from_secs(300));
        let project_id = Uuid::new_v4();

        let (_, first_user, mut first_rx) = join_new(&store, project_id, "first");
        let event = first_rx.try_recv().unwrap();
        match event {
            ServerEvent::RoomUsers { users, .. } => {
                assert_eq!(users, vec![first_user.clone()]);
            }
            other => panic!("expected room:users, got {other:?}"),
        }

        let (_, second_user, mut second_rx) = join_new(&store, project_id, "second");
        match second_rx.try_recv().unwrap() {
            ServerEvent::RoomUsers { users, .. } => assert_eq!(users.len(), 2),
            other => panic!("expected room:users, got {other:?}"),
        }

        match first_rx.try_recv().unwrap() {
            ServerEvent::UserJoined { user, .. } => assert_eq!(user, second_user),
            other => panic!("expected user:joined, got {other:?}"),
        }
        // The joiner never sees their own join announcement.
        assert!(second_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_skips_the_originating_connection() {
        let store = PresenceStore::new(Duration::from_secs(300));
        let project_id = Uuid::new_v4();

        let (origin_id, origin_user, mut origin_rx) = join_new(&store, project_id, "origin");
        let (_, _, mut peer_rx) = join_new(&store, project_id, "peer");

        // Drain the join chatter.
        while origin_rx.try_recv().is_ok() {}
        while peer_rx.try_recv().is_ok() {}

        store.broadcast(
            project_id,
            ServerEvent::CardMoved {
                project_id,
                card_id: Uuid::new_v4(),
                source_list_id: Uuid::new_v4(),
                destination_list_id: Uuid::new_v4(),
                position: 1,
                moved_by: Some(origin_user.clone()),
            },
            Some(origin_id),
        );

        match peer_rx.try_recv().unwrap() {
            ServerEvent::CardMoved { moved_by, .. } => {
                assert_eq!(moved_by, Some(origin_user));
            }
            other => panic!("expected card:moved, got {other:?}"),
        }
        assert!(origin_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_notifies_remaining_members_and_drops_empty_rooms() {
        let store = PresenceStore::new(Duration::from_secs(300));
        let project_id = Uuid::new_v4();

        let (first_id, first_user, _first_rx) = join_new(&store, project_id, "first");
        let (second_id, _, mut second_rx) = join_new(&store, project_id, "second");
        while second_rx.try_recv().is_ok() {}

        let left = store.leave(project_id, first_id).unwrap();
        assert_eq!(left, first_user);
        match second_rx.try_recv().unwrap() {
            ServerEvent::UserLeft { user, .. } => assert_eq!(user, first_user),
            other => panic!("expected user:left, got {other:?}"),
        }

        let _ = store.leave(project_id, second_id);
        assert_eq!(store.room_count(), 0);
        assert!(store.leave(project_id, second_id).is_none());
    }

    #[tokio::test]
    async fn sweep_evicts_idle_connections() {
        let store = PresenceStore::new(Duration::ZERO);
        let project_id = Uuid::new_v4();

        let (_, _, _idle_rx) = join_new(&store, project_id, "idle");
        tokio::time::sleep(Duration::from_millis(5)).await;

        let evicted = store.sweep_idle();
        assert_eq!(evicted, 1);
        assert_eq!(store.room_count(), 0);
        assert_eq!(store.connection_count(), 0);
    }

    #[tokio::test]
    async fn touch_keeps_a_connection_alive() {
        let store = PresenceStore::new(Duration::from_millis(50));
        let project_id = Uuid::new_v4();

        let (connection_id, _, _rx) = join_new(&store, project_id, "busy");
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.touch(project_id, connection_id);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.sweep_idle(), 0);
        assert_eq!(store.connection_count(), 1);
    }

    #[test]
    fn client_events_use_colon_separated_names() {
        let raw = serde_json::json!({
            "type": "card:move",
            "payload": {
                "project_id": Uuid::new_v4(),
                "card_id": Uuid::new_v4(),
                "source_list_id": Uuid::new_v4(),
                "destination_list_id": Uuid::new_v4(),
                "position": 2
            }
        });
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        assert!(matches!(event, ClientEvent::CardMove { position: 2, .. }));

        let relay: ClientEvent = serde_json::from_value(serde_json::json!({
            "type": "presence:update",
            "payload": { "project_id": Uuid::new_v4(), "focused_card": "abc" }
        }))
        .unwrap();
        match relay {
            ClientEvent::PresenceUpdate(payload) => {
                assert_eq!(
                    payload.data.get("focused_card").and_then(|v| v.as_str()),
                    Some("abc")
                );
            }
            other => panic!("expected presence:update, got {other:?}"),
        }
    }

    #[test]
    fn server_events_serialize_with_wire_names() {
        let event = ServerEvent::Error {
            message: "nope".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some("error"));
        assert_eq!(
            json.pointer("/payload/message").and_then(|v| v.as_str()),
            Some("nope")
        );
    }
}
