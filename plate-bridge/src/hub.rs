/**
 * HUB DE DIFFUSION - Push des snapshots vers les viewers connectés
 *
 * RÔLE : Tient l'ensemble des sessions WebSocket ouvertes et leur pousse
 * le snapshot complet du registre à chaque événement (status ou sweep).
 *
 * FONCTIONNEMENT : Chaque session possède un channel mpsc non borné drainé
 * par sa task socket. Le broadcast sérialise une fois puis pousse partout,
 * best-effort : pas d'ack, pas de garantie de livraison.
 */

use crate::models::DeviceUpdate;
use crate::state::{new_state, Shared};
use axum::extract::ws::Message;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub type SessionSender = UnboundedSender<Message>;

#[derive(Clone)]
pub struct BroadcastHub {
    sessions: Shared<HashMap<Uuid, SessionSender>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self { sessions: new_state(HashMap::new()) }
    }

    /// Enregistre une nouvelle session après lui avoir envoyé exactement
    /// un snapshot initial (pas de replay d'historique).
    pub fn on_connect(&self, tx: SessionSender, snapshot: &DeviceUpdate) -> Uuid {
        let session_id = Uuid::new_v4();
        if let Ok(payload) = serde_json::to_string(snapshot) {
            let _ = tx.send(Message::Text(payload.into()));
        }
        let mut sessions = self.sessions.lock();
        sessions.insert(session_id, tx);
        println!("[hub] viewer connected ({} active)", sessions.len());
        session_id
    }

    pub fn on_disconnect(&self, session_id: &Uuid) {
        let mut sessions = self.sessions.lock();
        if sessions.remove(session_id).is_some() {
            println!("[hub] viewer disconnected ({} active)", sessions.len());
        }
    }

    /// Sérialise une fois, pousse vers toutes les sessions ouvertes.
    /// Une session fermée côté socket est ignorée silencieusement :
    /// son retrait passe par on_disconnect quand sa task se termine.
    pub fn broadcast(&self, update: &DeviceUpdate) {
        let payload = match serde_json::to_string(update) {
            Ok(payload) => payload,
            Err(e) => {
                eprintln!("[hub] failed to serialize update: {e}");
                return;
            }
        };
        for tx in self.sessions.lock().values() {
            let _ = tx.send(Message::Text(payload.clone().into()));
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device_update;
    use tokio::sync::mpsc;

    fn recv_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        match rx.try_recv().expect("message attendu") {
            Message::Text(txt) => serde_json::from_str(&txt).unwrap(),
            other => panic!("frame inattendue: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_sends_exactly_one_snapshot() {
        let hub = BroadcastHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        hub.on_connect(tx, &device_update(Vec::new()));

        let json = recv_json(&mut rx);
        assert_eq!(json["type"], "device_update");
        assert!(rx.try_recv().is_err()); // rien d'autre
        assert_eq!(hub.session_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_open_sessions() {
        let hub = BroadcastHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.on_connect(tx1, &device_update(Vec::new()));
        hub.on_connect(tx2, &device_update(Vec::new()));
        recv_json(&mut rx1);
        recv_json(&mut rx2);

        hub.broadcast(&device_update(Vec::new()));
        assert_eq!(recv_json(&mut rx1)["type"], "device_update");
        assert_eq!(recv_json(&mut rx2)["type"], "device_update");
    }

    #[tokio::test]
    async fn test_closed_session_skipped_silently() {
        let hub = BroadcastHub::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.on_connect(tx1, &device_update(Vec::new()));
        hub.on_connect(tx2, &device_update(Vec::new()));
        drop(rx1); // session morte côté socket
        recv_json(&mut rx2);

        hub.broadcast(&device_update(Vec::new()));
        assert_eq!(recv_json(&mut rx2)["type"], "device_update");
        // la session morte reste comptée jusqu'à on_disconnect
        assert_eq!(hub.session_count(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_removes_session() {
        let hub = BroadcastHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session_id = hub.on_connect(tx, &device_update(Vec::new()));

        hub.on_disconnect(&session_id);
        assert_eq!(hub.session_count(), 0);
        hub.on_disconnect(&session_id); // idempotent
    }
}
