// Per-user websocket fan-out.
//
// A user may have several tabs open; each socket gets its own outbound
// channel and all of them are registered under the user's subject.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::spots::SpotsView;

/// Close code sent when the upgrade request carries no valid session.
pub const CLOSE_UNAUTHORIZED: u16 = 4401;

/// Messages pushed from the server to the browser.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    /// Full collection and ordered selection after a change.
    Spots(&'a SpotsView),
}

impl ServerMessage<'_> {
    pub fn to_frame(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text)),
            Err(e) => {
                warn!("failed to encode websocket message: {}", e);
                None
            }
        }
    }
}

/// A registered socket that has not started serving yet.
pub struct Connection {
    pub id: Uuid,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Connection {
    /// Queue a frame for this socket only.
    pub fn send(&self, message: Message) {
        let _ = self.tx.send(message);
    }

    #[cfg(test)]
    pub(crate) fn drain(&mut self) -> Vec<Message> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }
}

type Clients = HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<Message>>>;

#[derive(Clone, Default)]
pub struct WsRegistry {
    clients: Arc<RwLock<Clients>>,
}

impl WsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a socket slot for `sub`. Frames sent to `sub` from now on are
    /// queued for it, even before `serve` picks them up.
    pub async fn register(&self, sub: &str) -> Connection {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.clients
            .write()
            .await
            .entry(sub.to_string())
            .or_default()
            .insert(id, tx.clone());
        info!(sub, %id, "websocket registered");
        Connection { id, tx, rx }
    }

    /// Pump queued frames into `socket` until either side closes, then unregister.
    pub async fn serve(&self, sub: &str, connection: Connection, socket: WebSocket) {
        let Connection { id, tx, mut rx } = connection;
        // the registry holds the other sender; dropping ours lets `rx` end on removal
        drop(tx);
        let (mut sink, mut stream) = socket.split();

        let outbound = async {
            while let Some(message) = rx.recv().await {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        };

        let inbound = async {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => debug!(sub, %id, "ignoring client frame"),
                }
            }
        };

        tokio::select! {
            _ = outbound => {},
            _ = inbound => {},
        }

        self.remove(sub, id).await;
    }

    /// Queue `message` on every socket of `sub`. Returns how many sockets got it.
    pub async fn send_to(&self, sub: &str, message: Message) -> usize {
        let clients = self.clients.read().await;
        let Some(sockets) = clients.get(sub) else {
            return 0;
        };
        sockets
            .values()
            .filter(|tx| tx.send(message.clone()).is_ok())
            .count()
    }

    pub async fn connection_count(&self, sub: &str) -> usize {
        self.clients.read().await.get(sub).map_or(0, HashMap::len)
    }

    async fn remove(&self, sub: &str, id: Uuid) {
        let mut clients = self.clients.write().await;
        if let Some(sockets) = clients.get_mut(sub) {
            sockets.remove(&id);
            if sockets.is_empty() {
                clients.remove(sub);
            }
        }
        info!(sub, %id, "websocket closed");
    }
}
