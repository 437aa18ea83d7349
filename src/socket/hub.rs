use std::{collections::HashMap, sync::Arc};

use tokio::sync::{mpsc::{self, error::TrySendError}, RwLock};
use uuid::Uuid;

use super::events::ServerEvent;

pub type ConnId = Uuid;

/// Outbound events a connection may have queued before new ones are dropped.
pub const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug)]
struct Peer {
    tx: mpsc::Sender<ServerEvent>,
    room: Option<String>,
    user_id: Option<String>,
}

impl Peer {
    /// Queues without waiting; a reader that has fallen behind loses the event.
    fn offer(&self, id: ConnId, event: ServerEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(conn = %id, event = event.name(), "outbound queue full, dropping event");
            }
            // receiver gone means the socket is closing
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Open socket connections and the room each one is listening to.
///
/// A connection is in at most one room. Dropping a connection through
/// [`Hub::disconnect`] releases its membership.
#[derive(Debug, Clone, Default)]
pub struct Hub {
    peers: Arc<RwLock<HashMap<ConnId, Peer>>>,
}

impl Hub {
    pub async fn connect(&self) -> (ConnId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let id = Uuid::now_v7();
        self.peers.write().await.insert(id, Peer { tx, room: None, user_id: None });
        (id, rx)
    }

    pub async fn disconnect(&self, id: ConnId) {
        if let Some(peer) = self.peers.write().await.remove(&id) {
            tracing::debug!(conn = %id, room = ?peer.room, "released connection");
        }
    }

    /// Moves `id` into `new_room`, leaving whatever room it was in.
    ///
    /// `previous_room` is what the client believes it was in; membership is
    /// tracked here so a stale or empty value changes nothing.
    pub async fn join(&self, id: ConnId, new_room: &str, previous_room: Option<&str>) -> bool {
        let mut peers = self.peers.write().await;
        let Some(peer) = peers.get_mut(&id) else {
            return false;
        };

        if previous_room.is_some() && peer.room.as_deref() != previous_room {
            tracing::debug!(conn = %id, claimed = ?previous_room, actual = ?peer.room, "previous room mismatch");
        }
        peer.room = Some(new_room.to_owned());
        true
    }

    pub async fn room_of(&self, id: ConnId) -> Option<String> {
        self.peers.read().await.get(&id)?.room.clone()
    }

    pub async fn members_of(&self, room: &str) -> Vec<ConnId> {
        self.peers
            .read()
            .await
            .iter()
            .filter(|(_, peer)| peer.room.as_deref() == Some(room))
            .map(|(id, _)| *id)
            .collect()
    }

    pub async fn bind_user(&self, id: ConnId, user_id: &str) {
        if let Some(peer) = self.peers.write().await.get_mut(&id) {
            peer.user_id = Some(user_id.to_owned());
        }
    }

    pub async fn emit(&self, id: ConnId, event: ServerEvent) {
        if let Some(peer) = self.peers.read().await.get(&id) {
            peer.offer(id, event);
        }
    }

    pub async fn emit_all(&self, event: ServerEvent) {
        self.emit_where(event, |_, _| true).await;
    }

    pub async fn emit_room(&self, room: &str, event: ServerEvent) {
        self.emit_where(event, |_, peer| peer.room.as_deref() == Some(room)).await;
    }

    pub async fn emit_others(&self, except: ConnId, event: ServerEvent) {
        self.emit_where(event, |id, _| id != except).await;
    }

    /// Every connection not bound to `user_id`, unbound ones included.
    pub async fn emit_except_user(&self, user_id: &str, event: ServerEvent) {
        self.emit_where(event, |_, peer| peer.user_id.as_deref() != Some(user_id)).await;
    }

    async fn emit_where<F>(&self, event: ServerEvent, mut keep: F)
    where
        F: FnMut(ConnId, &Peer) -> bool,
    {
        for (id, peer) in self.peers.read().await.iter() {
            if keep(*id, peer) {
                peer.offer(*id, event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(room: &str) -> ServerEvent {
        ServerEvent::Notifications(room.to_owned())
    }

    #[tokio::test]
    async fn joining_a_new_room_leaves_the_old_one() {
        let hub = Hub::default();
        let (a, _rx) = hub.connect().await;

        assert!(hub.join(a, "World", None).await);
        assert!(hub.join(a, "Goa", Some("World")).await);

        assert_eq!(hub.room_of(a).await.as_deref(), Some("Goa"));
        assert!(hub.members_of("World").await.is_empty());
        assert_eq!(hub.members_of("Goa").await, vec![a]);
    }

    #[tokio::test]
    async fn rejoining_the_current_room_keeps_membership() {
        let hub = Hub::default();
        let (a, _rx) = hub.connect().await;
        hub.join(a, "World", None).await;
        hub.join(a, "World", Some("World")).await;
        assert_eq!(hub.members_of("World").await, vec![a]);
    }

    #[tokio::test]
    async fn disconnect_releases_membership() {
        let hub = Hub::default();
        let (a, _rx) = hub.connect().await;
        hub.join(a, "World", None).await;
        hub.disconnect(a).await;

        assert!(hub.members_of("World").await.is_empty());
        assert_eq!(hub.room_of(a).await, None);
        assert!(!hub.join(a, "Goa", None).await);
    }

    #[tokio::test]
    async fn targeted_emits_reach_the_right_peers() {
        let hub = Hub::default();
        let (a, mut rx_a) = hub.connect().await;
        let (b, mut rx_b) = hub.connect().await;
        let (_c, mut rx_c) = hub.connect().await;
        hub.join(a, "World", None).await;
        hub.join(b, "World", None).await;

        hub.emit_room("World", note("room")).await;
        hub.emit_others(a, note("others")).await;
        hub.emit(b, note("direct")).await;

        assert_eq!(rx_a.try_recv().unwrap(), note("room"));
        assert!(rx_a.try_recv().is_err());

        assert_eq!(rx_b.try_recv().unwrap(), note("room"));
        assert_eq!(rx_b.try_recv().unwrap(), note("others"));
        assert_eq!(rx_b.try_recv().unwrap(), note("direct"));

        assert_eq!(rx_c.try_recv().unwrap(), note("others"));
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_except_user_skips_bound_connections() {
        let hub = Hub::default();
        let (a, mut rx_a) = hub.connect().await;
        let (_b, mut rx_b) = hub.connect().await;
        hub.bind_user(a, "u1").await;

        hub.emit_except_user("u1", note("World")).await;

        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), note("World"));
    }

    #[tokio::test]
    async fn sends_to_dropped_receivers_are_ignored() {
        let hub = Hub::default();
        let (_a, rx_a) = hub.connect().await;
        let (_b, mut rx_b) = hub.connect().await;
        drop(rx_a);

        hub.emit_all(note("World")).await;
        assert_eq!(rx_b.try_recv().unwrap(), note("World"));
    }

    #[tokio::test]
    async fn slow_reader_drops_events_once_its_queue_is_full() {
        let hub = Hub::default();
        let (a, mut rx_a) = hub.connect().await;
        let (_b, mut rx_b) = hub.connect().await;

        for i in 0..OUTBOUND_CAPACITY + 10 {
            hub.emit(a, note(&format!("room-{i}"))).await;
        }
        hub.emit_all(note("after")).await;

        let queued: Vec<ServerEvent> = std::iter::from_fn(|| rx_a.try_recv().ok()).collect();
        assert_eq!(queued.len(), OUTBOUND_CAPACITY);
        assert_eq!(queued.first(), Some(&note("room-0")));
        assert_eq!(queued.last(), Some(&note(&format!("room-{}", OUTBOUND_CAPACITY - 1))));

        // other peers are unaffected
        assert_eq!(rx_b.try_recv().unwrap(), note("after"));

        // once drained, the connection receives again
        hub.emit(a, note("fresh")).await;
        assert_eq!(rx_a.try_recv().unwrap(), note("fresh"));
    }
}
